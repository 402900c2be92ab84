// File: ./src/notify.rs
use anyhow::Result;
use notify_rust::Notification;
use std::sync::Mutex;

/// Sink for alert messages (desktop popup, test recorder, ...).
pub trait Notifier: Send + Sync {
    fn send(&self, title: &str, body: &str) -> Result<()>;
}

/// OS notification through the desktop notification daemon.
pub struct DesktopNotifier {
    app_name: String,
}

impl DesktopNotifier {
    pub fn new(app_name: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
        }
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new("Attendo")
    }
}

impl Notifier for DesktopNotifier {
    fn send(&self, title: &str, body: &str) -> Result<()> {
        Notification::new()
            .summary(title)
            .body(body)
            .appname(&self.app_name)
            .show()?;
        Ok(())
    }
}

/// Records every message instead of displaying it.
#[derive(Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Notifier for MemoryNotifier {
    fn send(&self, title: &str, body: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}

/// Sends `lines` as one notification. Returns false when there was nothing to send.
pub fn send_alerts(notifier: &dyn Notifier, title: &str, lines: &[String]) -> Result<bool> {
    if lines.is_empty() {
        return Ok(false);
    }
    notifier.send(title, &lines.join("\n"))?;
    log::debug!("Sent '{}' with {} lines", title, lines.len());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_alerts_are_not_sent() {
        let n = MemoryNotifier::new();
        assert!(!send_alerts(&n, "t", &[]).unwrap());
        assert!(send_alerts(&n, "t", &["a".into(), "b".into()]).unwrap());
        assert_eq!(n.messages(), vec![("t".to_string(), "a\nb".to_string())]);
    }
}
