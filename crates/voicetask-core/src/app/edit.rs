//! Edit resolver: how does a command change one specific task?
//!
//! The model reports the due-time change as a tagged value so that "not
//! mentioned" and "remove it" can never be confused:
//! - `keep`: the current due time and description stay as they are.
//! - `set`: a new absolute time (ms since epoch) and description.
//! - `clear`: both become `None`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::time_extraction::{from_millis, iso};
use crate::domain::{EditResolution, Result, TaskBrief, TaskEdit, TaskerError};
use crate::typed::{Prompt, TypedGenerator};

#[derive(Debug, Clone)]
pub struct EditRequest {
    pub command_text: String,
    pub current: TaskBrief,
    pub reference_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditTaskInput {
    pub voice_command: String,
    pub current_task_text: String,
    #[serde(rename = "currentTaskDueAtISO")]
    pub current_task_due_at_iso: Option<String>,
    pub current_task_extracted_time_description: Option<String>,
    #[serde(rename = "referenceTimeISO")]
    pub reference_time_iso: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DueChange {
    #[default]
    Keep,
    Set {
        #[serde(rename = "dueAtTimestamp")]
        due_at_ms: i64,
        #[serde(default)]
        description: Option<String>,
    },
    Clear,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditTaskOutput {
    pub updated_task_text: String,
    #[serde(default)]
    pub due_change: DueChange,
    pub change_summary: String,
    pub no_changes_made: bool,
}

pub struct EditTask;

impl Prompt for EditTask {
    const NAME: &'static str = "voicetask.task.edit.v1";
    type Input = EditTaskInput;
    type Output = EditTaskOutput;

    fn instructions(input: &Self::Input) -> String {
        format!(
            "You are an intelligent task editing assistant. The user wants to edit an existing \
             task with a voice command. Decide whether the command changes the task text, the \
             due date/time, both, or neither.\n\
             Current reference time (ISO 8601 UTC): {reference}\n\
             updatedTaskText: the complete new text, or the current text if unchanged.\n\
             dueChange: {{\"kind\": \"keep\"}} if the command does not mention the due time; \
             {{\"kind\": \"set\", \"dueAtTimestamp\": <Unix ms UTC>, \"description\": \
             \"Tomorrow at 3:00 PM\"}} for a new time; {{\"kind\": \"clear\"}} if the command \
             asks to remove the due date.\n\
             changeSummary: a short summary such as \"Task text updated.\" or \"Due date \
             removed.\".\n\
             noChangesMade: true if the command is vague or does not ask for any change.",
            reference = input.reference_time_iso,
        )
    }

    fn output_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "updatedTaskText": {"type": "string"},
                "dueChange": {
                    "anyOf": [
                        {
                            "type": "object",
                            "properties": {"kind": {"const": "keep"}},
                            "required": ["kind"]
                        },
                        {
                            "type": "object",
                            "properties": {
                                "kind": {"const": "set"},
                                "dueAtTimestamp": {"type": "integer"},
                                "description": {"type": ["string", "null"]}
                            },
                            "required": ["kind", "dueAtTimestamp", "description"]
                        },
                        {
                            "type": "object",
                            "properties": {"kind": {"const": "clear"}},
                            "required": ["kind"]
                        }
                    ]
                },
                "changeSummary": {"type": "string"},
                "noChangesMade": {"type": "boolean"}
            },
            "required": ["updatedTaskText", "dueChange", "changeSummary", "noChangesMade"]
        })
    }
}

#[derive(Debug, Clone)]
pub struct EditResolver {
    generator: TypedGenerator,
}

impl EditResolver {
    pub fn new(generator: TypedGenerator) -> Self {
        Self { generator }
    }

    /// Never fails; errors come back as a no-change `EditResolution::Fallback`.
    pub async fn resolve(&self, request: &EditRequest) -> EditResolution {
        let input = EditTaskInput {
            voice_command: request.command_text.clone(),
            current_task_text: request.current.text.clone(),
            current_task_due_at_iso: request.current.due_at.map(iso),
            current_task_extracted_time_description: request.current.time_description.clone(),
            reference_time_iso: iso(request.reference_time),
        };
        let result = match self.generator.run::<EditTask>(&input).await {
            Ok(output) => apply_output(output, &request.current),
            Err(err) => Err(err),
        };

        match result {
            Ok(edit) => {
                debug!(task_id = %request.current.id, no_changes = edit.no_changes_made, "edit resolved");
                EditResolution::Resolved(edit)
            }
            Err(err) => {
                warn!(task_id = %request.current.id, error = %err, "edit resolution failed, leaving task unchanged");
                EditResolution::Fallback {
                    edit: unchanged(
                        &request.current,
                        format!("Error processing edit: {err}"),
                    ),
                    cause: err.to_string(),
                }
            }
        }
    }
}

fn unchanged(current: &TaskBrief, summary: String) -> TaskEdit {
    TaskEdit {
        updated_text: current.text.clone(),
        new_due_at: current.due_at,
        new_time_description: current.time_description.clone(),
        change_summary: summary,
        no_changes_made: true,
    }
}

fn apply_output(output: EditTaskOutput, current: &TaskBrief) -> Result<TaskEdit> {
    if output.no_changes_made {
        return Ok(unchanged(current, output.change_summary));
    }

    let text = output.updated_task_text.trim();
    if text.is_empty() {
        return Err(TaskerError::schema_violation(
            EditTask::NAME,
            "updatedTaskText is empty",
        ));
    }

    let (new_due_at, new_time_description) = match output.due_change {
        DueChange::Keep => (current.due_at, current.time_description.clone()),
        DueChange::Clear => (None, None),
        DueChange::Set {
            due_at_ms,
            description,
        } => {
            let due_at = from_millis(due_at_ms).ok_or_else(|| {
                TaskerError::schema_violation(
                    EditTask::NAME,
                    format!("dueAtTimestamp {due_at_ms} is out of range"),
                )
            })?;
            (Some(due_at), description)
        }
    };

    Ok(TaskEdit {
        updated_text: text.to_string(),
        new_due_at,
        new_time_description,
        change_summary: output.change_summary,
        no_changes_made: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskId;
    use crate::impls::ScriptedGenerator;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;
    use ulid::Ulid;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 29, 10, 0, 0).unwrap()
    }

    fn current() -> TaskBrief {
        TaskBrief {
            id: TaskId::from_ulid(Ulid::new()),
            text: "Project update".into(),
            due_at: Some(t0() + Duration::days(7)),
            time_description: Some("Next Monday at 10:00 AM".into()),
        }
    }

    async fn resolve(answer: Result<serde_json::Value>, command: &str) -> EditResolution {
        let generator = ScriptedGenerator::new();
        generator.push(EditTask::NAME, answer);
        EditResolver::new(TypedGenerator::new(Arc::new(generator)))
            .resolve(&EditRequest {
                command_text: command.into(),
                current: current(),
                reference_time: t0(),
            })
            .await
    }

    #[tokio::test]
    async fn text_change_keeps_due_time() {
        let resolution = resolve(
            Ok(json!({
                "updatedTaskText": "Project update for the board",
                "dueChange": {"kind": "keep"},
                "changeSummary": "Task text updated.",
                "noChangesMade": false
            })),
            "make it project update for the board",
        )
        .await;
        let edit = resolution.edit();
        assert!(!resolution.is_fallback());
        assert_eq!(edit.updated_text, "Project update for the board");
        assert_eq!(edit.new_due_at, current().due_at);
        assert_eq!(edit.new_time_description, current().time_description);
    }

    #[tokio::test]
    async fn missing_due_change_means_keep() {
        let resolution = resolve(
            Ok(json!({
                "updatedTaskText": "Project update v2",
                "changeSummary": "Task text updated.",
                "noChangesMade": false
            })),
            "call it v2",
        )
        .await;
        assert_eq!(resolution.edit().new_due_at, current().due_at);
    }

    #[tokio::test]
    async fn remove_the_due_date_clears_both_fields() {
        let resolution = resolve(
            Ok(json!({
                "updatedTaskText": "Project update",
                "dueChange": {"kind": "clear"},
                "changeSummary": "Due date removed.",
                "noChangesMade": false
            })),
            "remove the due date",
        )
        .await;
        let edit = resolution.edit();
        assert_eq!(edit.new_due_at, None);
        assert_eq!(edit.new_time_description, None);
        assert!(!edit.no_changes_made);
    }

    #[tokio::test]
    async fn reschedule_sets_new_time() {
        let new_due = t0() + Duration::days(1) + Duration::hours(5);
        let resolution = resolve(
            Ok(json!({
                "updatedTaskText": "Project update",
                "dueChange": {"kind": "set", "dueAtTimestamp": new_due.timestamp_millis(), "description": "Tomorrow at 3:00 PM"},
                "changeSummary": "Due time changed to tomorrow at 3:00 PM.",
                "noChangesMade": false
            })),
            "reschedule to tomorrow at 3pm",
        )
        .await;
        assert_eq!(resolution.edit().new_due_at, Some(new_due));
        assert_eq!(
            resolution.edit().new_time_description.as_deref(),
            Some("Tomorrow at 3:00 PM")
        );
    }

    #[tokio::test]
    async fn no_changes_returns_current_fields() {
        let resolution = resolve(
            Ok(json!({
                "updatedTaskText": "whatever",
                "dueChange": {"kind": "clear"},
                "changeSummary": "No changes detected for this task.",
                "noChangesMade": true
            })),
            "never mind",
        )
        .await;
        let edit = resolution.edit();
        assert!(edit.no_changes_made);
        assert_eq!(edit.updated_text, "Project update");
        assert_eq!(edit.new_due_at, current().due_at);
    }

    #[tokio::test]
    async fn failure_never_raises_and_keeps_task() {
        let resolution = resolve(
            Err(TaskerError::Generation("connection reset".into())),
            "move it to Friday",
        )
        .await;
        let EditResolution::Fallback { edit, cause } = resolution else {
            panic!("expected fallback");
        };
        assert!(edit.no_changes_made);
        assert_eq!(edit.updated_text, "Project update");
        assert_eq!(edit.new_due_at, current().due_at);
        assert_eq!(
            edit.change_summary,
            "Error processing edit: generation error: connection reset"
        );
        assert!(cause.contains("connection reset"));
    }

    #[tokio::test]
    async fn unknown_due_change_kind_is_fallback() {
        let resolution = resolve(
            Ok(json!({
                "updatedTaskText": "Project update",
                "dueChange": {"kind": "postpone"},
                "changeSummary": "?",
                "noChangesMade": false
            })),
            "postpone",
        )
        .await;
        assert!(resolution.is_fallback());
    }
}
