use anyhow::Result;
use attendo::cli::{self, Command};
use attendo::config::Config;
use attendo::context::StandardContext;
use attendo::notify::{DesktopNotifier, Notifier};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::env;
use std::io;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let cli = match cli::parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            eprintln!();
            cli::print_help("attendo");
            std::process::exit(2);
        }
    };

    if cli.command == Command::Help {
        cli::print_help("attendo");
        return Ok(());
    }

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        level,
        ConfigBuilder::new().set_time_level(LevelFilter::Off).build(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    let ctx = StandardContext::new(cli.root.clone());
    // `--notify` forces desktop alerts, otherwise the config decides.
    let wants_notify = cli.notify || Config::load_or_default(&ctx)?.notifications;
    let desktop = DesktopNotifier::default();
    let notifier: Option<&dyn Notifier> = wants_notify.then_some(&desktop as &dyn Notifier);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    cli::run(&cli.command, &ctx, &mut out, notifier)
}
