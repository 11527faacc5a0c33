//! Intent resolver: does a command create a new task or extend an existing one?
//!
//! # Flow
//! 1. No existing tasks: always create. Only the time extractor is called.
//! 2. Otherwise the disambiguation prompt sees the whole list and may name
//!    one task id.
//! 3. The answer is validated (non-empty text, known id for edits).
//! 4. Any failure in 1-3 becomes a create-intent `Fallback` with the raw
//!    command as text and a best-effort second time extraction.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::time_extraction::{TimeExtractor, from_millis, iso};
use crate::domain::{IntentResolution, ProposedTask, Result, TaskBrief, TaskId, TaskerError};
use crate::typed::{Prompt, TypedGenerator};

pub const NO_EXISTING_TASKS_REASON: &str = "No existing tasks; treated as new.";
pub const FALLBACK_REASON: &str = "Error in advanced processing; treated as a new task.";

/// One command to interpret against the current incomplete tasks.
#[derive(Debug, Clone)]
pub struct IntentRequest {
    pub command_text: String,
    pub reference_time: DateTime<Utc>,
    pub existing: Vec<TaskBrief>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisambiguateInput {
    pub voice_command_text: String,
    pub existing_tasks: Vec<TaskBrief>,
    #[serde(rename = "referenceTimeISO")]
    pub reference_time_iso: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisambiguateOutput {
    pub is_potential_edit: bool,
    pub matched_task_id: Option<String>,
    pub proposed_task_text: String,
    pub proposed_due_at_timestamp: Option<i64>,
    pub proposed_extracted_time_description: Option<String>,
    pub reason_for_suggestion: String,
}

pub struct Disambiguate;

impl Prompt for Disambiguate {
    const NAME: &'static str = "voicetask.intent.disambiguate.v1";
    type Input = DisambiguateInput;
    type Output = DisambiguateOutput;

    fn instructions(input: &Self::Input) -> String {
        format!(
            "You are an intelligent task assistant. Decide whether a new voice command is a \
             brand new task or an update to exactly one of the existing incomplete tasks \
             listed in existingTasks.\n\
             Current reference time (ISO 8601 UTC): {reference}\n\
             If the command clearly modifies or adds details to ONE existing task: set \
             isPotentialEdit to true, matchedTaskId to that task's id, and proposedTaskText \
             to the complete updated text combining the existing task and the command. If the \
             command changes text but mentions no new time, keep the existing due time. If it \
             asks to remove the due time, set the time fields to null.\n\
             Otherwise: set isPotentialEdit to false, matchedTaskId to null, and \
             proposedTaskText to the command (lightly refined if appropriate).\n\
             In both cases, extract any due time relative to the reference time as a Unix \
             timestamp in milliseconds (UTC) in proposedDueAtTimestamp with a human-friendly \
             proposedExtractedTimeDescription such as \"Tomorrow at 3 PM\", and explain the \
             decision briefly in reasonForSuggestion.",
            reference = input.reference_time_iso,
        )
    }

    fn output_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "isPotentialEdit": {"type": "boolean"},
                "matchedTaskId": {"type": ["string", "null"]},
                "proposedTaskText": {"type": "string"},
                "proposedDueAtTimestamp": {"type": ["integer", "null"]},
                "proposedExtractedTimeDescription": {"type": ["string", "null"]},
                "reasonForSuggestion": {"type": "string"}
            },
            "required": [
                "isPotentialEdit",
                "matchedTaskId",
                "proposedTaskText",
                "proposedDueAtTimestamp",
                "proposedExtractedTimeDescription",
                "reasonForSuggestion"
            ],
            "additionalProperties": false
        })
    }
}

#[derive(Debug, Clone)]
pub struct IntentResolver {
    generator: TypedGenerator,
    time: TimeExtractor,
}

impl IntentResolver {
    pub fn new(generator: TypedGenerator) -> Self {
        Self {
            time: TimeExtractor::new(generator.clone()),
            generator,
        }
    }

    /// Never fails; errors come back as `IntentResolution::Fallback`.
    pub async fn resolve(&self, request: &IntentRequest) -> IntentResolution {
        match self.try_resolve(request).await {
            Ok(proposal) => {
                debug!(is_edit = proposal.is_edit, matched = ?proposal.matched_task_id, "intent resolved");
                IntentResolution::Resolved(proposal)
            }
            Err(err) => {
                warn!(error = %err, "intent resolution failed, treating command as a new task");
                self.fallback(request, err).await
            }
        }
    }

    async fn try_resolve(&self, request: &IntentRequest) -> Result<ProposedTask> {
        if request.existing.is_empty() {
            let extracted = self
                .time
                .extract(&request.command_text, request.reference_time)
                .await?;
            return Ok(ProposedTask::create(
                request.command_text.trim(),
                extracted.due_at,
                extracted.description,
                NO_EXISTING_TASKS_REASON,
            ));
        }

        let input = DisambiguateInput {
            voice_command_text: request.command_text.clone(),
            existing_tasks: request.existing.clone(),
            reference_time_iso: iso(request.reference_time),
        };
        let output = self.generator.run::<Disambiguate>(&input).await?;
        validate(output, &request.existing)
    }

    async fn fallback(&self, request: &IntentRequest, cause: TaskerError) -> IntentResolution {
        let extracted = self
            .time
            .extract_or_default(&request.command_text, request.reference_time)
            .await;
        IntentResolution::Fallback {
            proposal: ProposedTask::create(
                request.command_text.trim(),
                extracted.due_at,
                extracted.description,
                FALLBACK_REASON,
            ),
            cause: cause.to_string(),
        }
    }
}

fn validate(output: DisambiguateOutput, existing: &[TaskBrief]) -> Result<ProposedTask> {
    let text = output.proposed_task_text.trim();
    if text.is_empty() {
        return Err(TaskerError::schema_violation(
            Disambiguate::NAME,
            "proposedTaskText is empty",
        ));
    }
    let due_at = output.proposed_due_at_timestamp.and_then(from_millis);
    let description = output.proposed_extracted_time_description;
    let reason = output.reason_for_suggestion;

    if !output.is_potential_edit {
        return Ok(ProposedTask::create(text, due_at, description, reason));
    }

    let raw_id = output.matched_task_id.ok_or_else(|| {
        TaskerError::schema_violation(Disambiguate::NAME, "edit intent without matchedTaskId")
    })?;
    let task_id = TaskId::from_str(raw_id.trim())
        .ok()
        .filter(|id| existing.iter().any(|t| t.id == *id))
        .ok_or_else(|| {
            TaskerError::schema_violation(
                Disambiguate::NAME,
                format!("matchedTaskId '{raw_id}' is not one of the existing tasks"),
            )
        })?;
    Ok(ProposedTask::edit(task_id, text, due_at, description, reason))
}
