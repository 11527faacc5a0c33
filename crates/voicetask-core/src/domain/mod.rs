//! Domain model (ids, task records, notifications, resolutions, errors).

pub mod errors;
pub mod ids;
pub mod notification;
pub mod resolution;
pub mod task;

pub use self::errors::{ErrorKind, Result, TaskerError};
pub use self::ids::{ParseIdError, TaskId};
pub use self::notification::{Notification, NotificationKey, NotificationKind};
pub use self::resolution::{
    CompletionMatch, EditResolution, ExtractedTime, IntentResolution, PrioritySuggestion,
    ProposedTask, SuggestedTask, TaskEdit,
};
pub use self::task::{Task, TaskBrief, TaskPatch};
