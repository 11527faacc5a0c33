//! Task record and its ordering.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TaskId;

/// A user-visible to-do item.
///
/// Design:
/// - Fields are read through accessors; all mutation goes through
///   `TaskStore` so ordering and notification invariants hold.
/// - Timestamps serialize as milliseconds since the Unix epoch.
/// - `time_description` is never set while `due_at` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    id: TaskId,
    text: String,
    completed: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    due_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "extractedTimeDescription")]
    time_description: Option<String>,
}

impl Task {
    pub(crate) fn new(
        id: TaskId,
        text: String,
        created_at: DateTime<Utc>,
        due_at: Option<DateTime<Utc>>,
        time_description: Option<String>,
    ) -> Self {
        let mut task = Self {
            id,
            text,
            completed: false,
            created_at,
            updated_at: None,
            due_at,
            time_description,
        };
        task.normalize();
        task
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        self.due_at
    }

    pub fn time_description(&self) -> Option<&str> {
        self.time_description.as_deref()
    }

    /// `due_at` if present, otherwise `created_at`.
    pub fn sort_instant(&self) -> DateTime<Utc> {
        self.due_at.unwrap_or(self.created_at)
    }

    /// True when the task is incomplete and due strictly after `now`.
    pub fn is_pending_at(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_at.is_some_and(|due| due > now)
    }

    /// Store ordering: incomplete first, then by due time (or creation time).
    ///
    /// Ties fall back to `created_at` and then `id`, so the order is total.
    pub fn store_order(&self, other: &Self) -> Ordering {
        self.completed
            .cmp(&other.completed)
            .then_with(|| self.sort_instant().cmp(&other.sort_instant()))
            .then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.id.cmp(&other.id))
    }

    pub fn brief(&self) -> TaskBrief {
        TaskBrief {
            id: self.id,
            text: self.text.clone(),
            due_at: self.due_at,
            time_description: self.time_description.clone(),
        }
    }

    pub(crate) fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        self.completed = completed;
        self.updated_at = Some(now);
    }

    /// Merge a patch. Returns which notification-relevant fields moved.
    pub(crate) fn apply(&mut self, patch: TaskPatch, now: DateTime<Utc>) -> PatchEffect {
        let before_due = self.due_at;
        let before_completed = self.completed;

        if let Some(text) = patch.text {
            self.text = text;
        }
        if let Some(due_at) = patch.due_at {
            self.due_at = due_at;
        }
        if let Some(description) = patch.time_description {
            self.time_description = description;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        self.updated_at = Some(now);
        self.normalize();

        PatchEffect {
            due_changed: patch_touched_due(before_due, self.due_at, patch.due_at.is_some()),
            became_completed: !before_completed && self.completed,
            became_incomplete: before_completed && !self.completed,
        }
    }

    /// Restores the description invariant after deserialization or mutation.
    pub(crate) fn normalize(&mut self) {
        if self.due_at.is_none() {
            self.time_description = None;
        }
    }
}

fn patch_touched_due(
    before: Option<DateTime<Utc>>,
    after: Option<DateTime<Utc>>,
    explicitly_set: bool,
) -> bool {
    explicitly_set || before != after
}

/// What a patch did to the fields the notification scheduler cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PatchEffect {
    pub due_changed: bool,
    pub became_completed: bool,
    pub became_incomplete: bool,
}

/// Partial update for `TaskStore::edit`.
///
/// `due_at` / `time_description` are double options:
/// `None` leaves the field alone, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub text: Option<String>,
    pub due_at: Option<Option<DateTime<Utc>>>,
    pub time_description: Option<Option<String>>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set (or clear, with `None`) the due time together with its description.
    pub fn due(mut self, due_at: Option<DateTime<Utc>>, description: Option<String>) -> Self {
        self.due_at = Some(due_at);
        self.time_description = Some(description);
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }
}

/// The slice of a task that is shown to the language model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskBrief {
    pub id: TaskId,
    pub text: String,
    #[serde(rename = "dueAtISO")]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(rename = "extractedTimeDescription")]
    pub time_description: Option<String>,
}
