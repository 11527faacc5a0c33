//! Time extraction: pull a due time out of free text.
//!
//! Used by the intent resolver's no-existing-tasks path and by its fallback.
//! Date parsing itself is left to the model.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::domain::{ExtractedTime, Result};
use crate::typed::{Prompt, TypedGenerator};

/// ISO 8601 UTC with milliseconds, e.g. `2024-08-01T10:00:00.000Z`.
pub(crate) fn iso(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractTimeInput {
    pub task_text: String,
    #[serde(rename = "referenceTimeISO")]
    pub reference_time_iso: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractTimeOutput {
    pub parsed_due_at_timestamp: Option<i64>,
    pub extracted_time_description: Option<String>,
}

pub struct ExtractTime;

impl Prompt for ExtractTime {
    const NAME: &'static str = "voicetask.time.extract.v1";
    type Input = ExtractTimeInput;
    type Output = ExtractTimeOutput;

    fn instructions(input: &Self::Input) -> String {
        format!(
            "You are a task parsing assistant. Given a task description and the current \
             reference time (UTC), extract any specific due date and time.\n\
             Current reference time (ISO 8601 UTC): {reference}\n\
             Consider phrases like \"today\", \"tomorrow\", \"next week\", \"in X hours\", \
             specific dates and times like \"at 5pm\".\n\
             If a date and time is found, return it as a Unix timestamp in milliseconds (UTC) \
             in parsedDueAtTimestamp and a human-friendly description such as \
             \"Tomorrow at 2:00 PM\" in extractedTimeDescription.\n\
             If no specific due time is found, or it is too vague, return null for both.",
            reference = input.reference_time_iso,
        )
    }

    fn output_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "parsedDueAtTimestamp": {"type": ["integer", "null"]},
                "extractedTimeDescription": {"type": ["string", "null"]}
            },
            "required": ["parsedDueAtTimestamp", "extractedTimeDescription"],
            "additionalProperties": false
        })
    }
}

/// Milliseconds to a timestamp; out-of-range values become `None`.
pub(crate) fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}

#[derive(Debug, Clone)]
pub struct TimeExtractor {
    generator: TypedGenerator,
}

impl TimeExtractor {
    pub fn new(generator: TypedGenerator) -> Self {
        Self { generator }
    }

    pub async fn extract(&self, text: &str, reference_time: DateTime<Utc>) -> Result<ExtractedTime> {
        let input = ExtractTimeInput {
            task_text: text.to_string(),
            reference_time_iso: iso(reference_time),
        };
        let output = self.generator.run::<ExtractTime>(&input).await?;
        let due_at = output.parsed_due_at_timestamp.and_then(from_millis);
        Ok(ExtractedTime {
            due_at,
            description: due_at.and(output.extracted_time_description),
        })
    }

    /// Like `extract`, but any failure yields "no due time".
    pub async fn extract_or_default(&self, text: &str, reference_time: DateTime<Utc>) -> ExtractedTime {
        match self.extract(text, reference_time).await {
            Ok(extracted) => extracted,
            Err(err) => {
                warn!(error = %err, "time extraction failed");
                ExtractedTime::default()
            }
        }
    }
}
