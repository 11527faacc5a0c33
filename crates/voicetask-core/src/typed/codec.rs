//! PayloadCodec - Prompt の入力 / 出力と JSON の相互変換
//!
//! # デシリアライズフロー
//! 1. generator から `serde_json::Value` を受け取る
//! 2. serde_json で `P::Output` にデシリアライズ
//! 3. 失敗時は `TaskerError::SchemaViolation`（resolver が fallback に回す）

use super::prompt::Prompt;
use crate::domain::{Result, TaskerError};
use crate::ports::GenerationRequest;

pub struct PayloadCodec;

impl PayloadCodec {
    /// Build the request for one call of `P`.
    pub fn encode<P: Prompt>(input: &P::Input) -> Result<GenerationRequest> {
        let payload = serde_json::to_value(input).map_err(|e| {
            TaskerError::Generation(format!("failed to encode input for '{}': {e}", P::NAME))
        })?;
        Ok(GenerationRequest {
            prompt_name: P::NAME,
            instructions: P::instructions(input),
            input: payload,
            output_schema: P::output_schema(),
        })
    }

    /// Decode a model answer into `P::Output`.
    pub fn decode<P: Prompt>(value: serde_json::Value) -> Result<P::Output> {
        if value.is_null() {
            return Err(TaskerError::schema_violation(P::NAME, "model returned no output"));
        }
        serde_json::from_value(value).map_err(|e| TaskerError::schema_violation(P::NAME, e.to_string()))
    }
}
