//! Notification model: keys for scheduled timers and the payload handed to a `Notifier`.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Task, TaskId};

/// Which of the two per-task alerts a timer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Fires `lead` before the due time.
    Reminder,
    /// Fires at the due time.
    Due,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reminder => "reminder",
            Self::Due => "due",
        }
    }
}

/// Key of one scheduled timer: `reminder:<taskId>` or `due:<taskId>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationKey {
    pub kind: NotificationKind,
    pub task_id: TaskId,
}

impl NotificationKey {
    pub fn reminder(task_id: TaskId) -> Self {
        Self {
            kind: NotificationKind::Reminder,
            task_id,
        }
    }

    pub fn due(task_id: TaskId) -> Self {
        Self {
            kind: NotificationKind::Due,
            task_id,
        }
    }

    /// Both keys a task can own.
    pub fn pair(task_id: TaskId) -> [Self; 2] {
        [Self::reminder(task_id), Self::due(task_id)]
    }
}

impl fmt::Display for NotificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.task_id)
    }
}

/// What gets shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Replaces an earlier notification with the same tag.
    pub tag: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            tag: tag.into(),
        }
    }

    /// Pre-due reminder for `task`, fired `lead_minutes` before the due time.
    pub fn reminder_for(task: &Task, lead_minutes: i64) -> Self {
        Self::new(
            format!("Reminder: {}", task.text()),
            format!(
                "Due in {lead_minutes} minutes. ({})",
                task.time_description().unwrap_or_default()
            ),
            NotificationKey::reminder(task.id()).to_string(),
        )
    }

    /// Alert fired at the due time of `task`.
    pub fn due_for(task: &Task) -> Self {
        Self::new(
            format!("Task Due: {}", task.text()),
            format!(
                "It's time for your task! ({})",
                task.time_description().unwrap_or_default()
            ),
            NotificationKey::due(task.id()).to_string(),
        )
    }

    /// Informational notice shown after completing an undated task.
    pub fn more_tasks_remaining() -> Self {
        Self::new(
            "VoiceTasker",
            "There are more tasks remaining.",
            "more-tasks-reminder",
        )
    }
}
