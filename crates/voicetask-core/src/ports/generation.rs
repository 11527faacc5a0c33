//! StructuredGenerator port - LLM の抽象化
//!
//! プロンプトと入力 JSON と出力スキーマを渡し、構造化された JSON を受け取る。
//! Provider（OpenAI など）の詳細はここに出さない。
//!
//! # エラー
//! - `TaskerError::Generation`: provider の失敗（HTTP, timeout など）
//! - `TaskerError::SchemaViolation`: 返ってきたものが JSON / スキーマとして不正

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::Result;

/// One structured-generation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    /// Stable prompt identifier (e.g. `voicetask.intent.disambiguate.v1`).
    pub prompt_name: &'static str,
    /// Rendered instructions for the model.
    pub instructions: String,
    /// Input payload, serialized from the prompt's input type.
    pub input: serde_json::Value,
    /// JSON Schema the answer must conform to.
    pub output_schema: serde_json::Value,
}

/// StructuredGenerator は構造化出力を返す LLM capability
#[async_trait]
pub trait StructuredGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<serde_json::Value>;
}
