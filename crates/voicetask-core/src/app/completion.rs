//! Completion matcher: which incomplete task does "I finished X" refer to?

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::domain::{CompletionMatch, TaskBrief, TaskId};
use crate::typed::{Prompt, TypedGenerator};

pub const NO_PENDING_TASKS: &str = "No pending tasks to complete.";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionTask {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkCompleteInput {
    pub voice_command: String,
    pub task_list: Vec<CompletionTask>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkCompleteOutput {
    pub completed_task_id: Option<String>,
    #[serde(default)]
    pub reason: String,
}

pub struct MarkComplete;

impl Prompt for MarkComplete {
    const NAME: &'static str = "voicetask.task.complete.v1";
    type Input = MarkCompleteInput;
    type Output = MarkCompleteOutput;

    fn instructions(_input: &Self::Input) -> String {
        "You are a task management assistant. Decide whether the voice command says that \
         one of the tasks in taskList has been completed. If it does, return that task's id \
         in completedTaskId. If the command does not clearly indicate a completion, or you \
         cannot tell which task, return null. Explain briefly in reason."
            .to_string()
    }

    fn output_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "completedTaskId": {"type": ["string", "null"]},
                "reason": {"type": "string"}
            },
            "required": ["completedTaskId", "reason"],
            "additionalProperties": false
        })
    }
}

#[derive(Debug, Clone)]
pub struct CompletionMatcher {
    generator: TypedGenerator,
}

impl CompletionMatcher {
    pub fn new(generator: TypedGenerator) -> Self {
        Self { generator }
    }

    /// Match `command` to one of `incomplete`. Never fails.
    pub async fn match_completion(&self, command: &str, incomplete: &[TaskBrief]) -> CompletionMatch {
        if incomplete.is_empty() {
            return CompletionMatch::none(NO_PENDING_TASKS);
        }

        let input = MarkCompleteInput {
            voice_command: command.to_string(),
            task_list: incomplete
                .iter()
                .map(|t| CompletionTask {
                    id: t.id.to_string(),
                    text: t.text.clone(),
                })
                .collect(),
        };
        let output = match self.generator.run::<MarkComplete>(&input).await {
            Ok(output) => output,
            Err(err) => {
                warn!(error = %err, "completion matching failed");
                return CompletionMatch::none(format!("Error matching completion: {err}"));
            }
        };

        let Some(raw_id) = output.completed_task_id else {
            return CompletionMatch::none(if output.reason.is_empty() {
                "No specific task was identified for completion.".to_string()
            } else {
                output.reason
            });
        };
        let raw_id = raw_id.trim();
        match incomplete
            .iter()
            .find(|t| raw_id.parse::<TaskId>().is_ok_and(|id| t.id == id))
        {
            Some(task) => CompletionMatch {
                task_id: Some(task.id),
                reason: output.reason,
            },
            None => {
                warn!(matched = raw_id, "completed task id is not in the list");
                CompletionMatch::none("No specific task was identified for completion.")
            }
        }
    }
}
