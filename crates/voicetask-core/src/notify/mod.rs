//! Notify module: per-task reminder / due timers.

mod scheduler;

pub use scheduler::{DEFAULT_REMINDER_LEAD_MINUTES, NotificationScheduler};
