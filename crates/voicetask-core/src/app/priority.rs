//! Priority advisor: suggests the one incomplete task to do next.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use super::time_extraction::iso;
use crate::domain::{PrioritySuggestion, SuggestedTask, Task, TaskId};
use crate::typed::{Prompt, TypedGenerator};

pub const NO_PENDING_TASKS: &str = "You have no pending tasks!";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityTask {
    pub id: String,
    pub text: String,
    #[serde(rename = "createdAtISO")]
    pub created_at_iso: String,
    #[serde(rename = "dueAtISO")]
    pub due_at_iso: Option<String>,
    pub extracted_time_description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrioritizeInput {
    pub task_list: Vec<PriorityTask>,
    #[serde(rename = "referenceTimeISO")]
    pub reference_time_iso: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrioritizeOutput {
    pub suggested_task_id: Option<String>,
    pub reason: String,
    #[serde(default)]
    pub no_specific_suggestion: bool,
}

pub struct Prioritize;

impl Prompt for Prioritize {
    const NAME: &'static str = "voicetask.priority.suggest.v1";
    type Input = PrioritizeInput;
    type Output = PrioritizeOutput;

    fn instructions(input: &Self::Input) -> String {
        format!(
            "You are an expert task prioritization assistant. Given the incomplete tasks in \
             taskList, suggest the single most important or urgent task to focus on next.\n\
             Current reference time (ISO 8601 UTC): {reference}\n\
             Criteria, most important first: urgency by due date; keywords such as \
             \"urgent\", \"important\", \"deadline\"; task age; implicit urgency.\n\
             Return the chosen id in suggestedTaskId and explain the choice in reason. If no \
             task stands out, set noSpecificSuggestion to true and suggestedTaskId to null.",
            reference = input.reference_time_iso,
        )
    }

    fn output_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "suggestedTaskId": {"type": ["string", "null"]},
                "reason": {"type": "string"},
                "noSpecificSuggestion": {"type": "boolean"}
            },
            "required": ["suggestedTaskId", "reason", "noSpecificSuggestion"],
            "additionalProperties": false
        })
    }
}

#[derive(Debug, Clone)]
pub struct PriorityAdvisor {
    generator: TypedGenerator,
}

impl PriorityAdvisor {
    pub fn new(generator: TypedGenerator) -> Self {
        Self { generator }
    }

    /// Suggest one of `incomplete`. Never fails.
    pub async fn suggest(&self, reference_time: DateTime<Utc>, incomplete: &[Task]) -> PrioritySuggestion {
        if incomplete.is_empty() {
            return PrioritySuggestion::none(NO_PENDING_TASKS);
        }

        let input = PrioritizeInput {
            task_list: incomplete
                .iter()
                .map(|t| PriorityTask {
                    id: t.id().to_string(),
                    text: t.text().to_string(),
                    created_at_iso: iso(t.created_at()),
                    due_at_iso: t.due_at().map(iso),
                    extracted_time_description: t.time_description().map(str::to_string),
                })
                .collect(),
            reference_time_iso: iso(reference_time),
        };

        let output = match self.generator.run::<Prioritize>(&input).await {
            Ok(output) => output,
            Err(err) => {
                warn!(error = %err, "prioritization failed");
                return PrioritySuggestion::none(format!("Error during prioritization: {err}"));
            }
        };

        let raw_id = match output.suggested_task_id {
            Some(id) if !output.no_specific_suggestion => id,
            _ => return PrioritySuggestion::none(output.reason),
        };
        let raw_id = raw_id.trim();
        let matched = incomplete
            .iter()
            .find(|t| raw_id.parse::<TaskId>().is_ok_and(|id| t.id() == id));
        match matched {
            Some(task) => PrioritySuggestion {
                suggested: Some(SuggestedTask {
                    id: task.id(),
                    text: task.text().to_string(),
                }),
                reason: output.reason,
            },
            None => {
                warn!(suggested = raw_id, "suggested task id is not in the list");
                PrioritySuggestion::none("Suggested a task that was not found in the list.")
            }
        }
    }
}
