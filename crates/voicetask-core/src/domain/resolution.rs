//! Resolution model: what the resolvers hand back to the calling layer.
//!
//! Every resolver returns a tagged result instead of an error:
//! - `Resolved`: the model answered and the answer passed validation.
//! - `Fallback`: something failed; the payload is a safe default and `cause`
//!   says what went wrong.
//!
//! Either way the payload is complete, so the caller can always render it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TaskId;

/// Create-or-edit proposal produced by the intent resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedTask {
    pub is_edit: bool,
    /// Always `Some` when `is_edit` is true, always `None` otherwise.
    pub matched_task_id: Option<TaskId>,
    pub text: String,
    pub due_at: Option<DateTime<Utc>>,
    pub time_description: Option<String>,
    pub reason: String,
}

impl ProposedTask {
    /// A brand-new task.
    pub fn create(
        text: impl Into<String>,
        due_at: Option<DateTime<Utc>>,
        time_description: Option<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            is_edit: false,
            matched_task_id: None,
            text: text.into(),
            time_description: due_at.and(time_description),
            due_at,
            reason: reason.into(),
        }
    }

    /// An update to `task_id`.
    pub fn edit(
        task_id: TaskId,
        text: impl Into<String>,
        due_at: Option<DateTime<Utc>>,
        time_description: Option<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            is_edit: true,
            matched_task_id: Some(task_id),
            text: text.into(),
            time_description: due_at.and(time_description),
            due_at,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IntentResolution {
    Resolved(ProposedTask),
    Fallback { proposal: ProposedTask, cause: String },
}

impl IntentResolution {
    pub fn proposal(&self) -> &ProposedTask {
        match self {
            Self::Resolved(proposal) | Self::Fallback { proposal, .. } => proposal,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Full post-edit state of one task, as decided by the edit resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEdit {
    pub updated_text: String,
    pub new_due_at: Option<DateTime<Utc>>,
    pub new_time_description: Option<String>,
    pub change_summary: String,
    pub no_changes_made: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EditResolution {
    Resolved(TaskEdit),
    Fallback { edit: TaskEdit, cause: String },
}

impl EditResolution {
    pub fn edit(&self) -> &TaskEdit {
        match self {
            Self::Resolved(edit) | Self::Fallback { edit, .. } => edit,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Due time pulled out of free text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedTime {
    pub due_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

/// Answer of the priority advisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrioritySuggestion {
    pub suggested: Option<SuggestedTask>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedTask {
    pub id: TaskId,
    pub text: String,
}

impl PrioritySuggestion {
    pub fn none(reason: impl Into<String>) -> Self {
        Self {
            suggested: None,
            reason: reason.into(),
        }
    }

    pub fn no_specific_suggestion(&self) -> bool {
        self.suggested.is_none()
    }
}

/// Answer of the completion matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionMatch {
    pub task_id: Option<TaskId>,
    pub reason: String,
}

impl CompletionMatch {
    pub fn none(reason: impl Into<String>) -> Self {
        Self {
            task_id: None,
            reason: reason.into(),
        }
    }
}
