// File: ./src/model/mod.rs
pub mod category;
pub mod event;

pub use category::MarkKind;
pub use event::{AttendanceEvent, Episode, Roster, StudentKey};
