// Crate root library declaration and module exports.
pub mod analysis;
pub mod cache;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod context;
pub mod grouper;
pub mod holidays;
pub mod ingest;
pub mod model;
pub mod notify;
pub mod storage;

pub use calendar::HolidayCalendar;
pub use grouper::{EpisodeGrouper, GroupReport, SkipReason, group_events};
pub use model::{AttendanceEvent, Episode};
