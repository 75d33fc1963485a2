//! Refresh scheduling
//!
//! Sources that declare a poll interval are reloaded on an independent timer
//! after their first successful load, until the session ends.

mod refresh;

pub use refresh::{RefreshScheduler, ScheduleEntry, ScheduledTask};
