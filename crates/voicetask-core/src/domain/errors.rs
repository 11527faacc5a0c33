//! Errors - エラー型と分類
//!
//! Store 系のエラー（Validation / NotFound）だけが呼び出し側に出ていく。
//! Resolver 系（Transcription / SchemaViolation / Generation）は resolver の境界で
//! fallback 結果に変換され、Notification 系はログに落とされる。

use super::ids::TaskId;

/// ErrorKind は運用上の分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 入力が悪い（ユーザーに見せるメッセージ向け）
    Input,
    /// 外部 capability（文字起こし・LLM・通知）の失敗
    External,
    /// 永続化・設定・I/O の障害
    Infrastructure,
}

/// Error type shared by every layer of the crate.
#[derive(Debug, thiserror::Error)]
pub enum TaskerError {
    /// Bad input to the task store (e.g. empty text).
    #[error("validation error: {0}")]
    Validation(String),

    /// Operation on an unknown task id.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// Speech-to-text failed or produced nothing usable.
    #[error("transcription error: {0}")]
    Transcription(String),

    /// The model answered, but the payload does not match the output contract.
    #[error("schema violation in '{prompt}': {detail}")]
    SchemaViolation { prompt: String, detail: String },

    /// The generation provider failed (transport, HTTP status, timeout).
    #[error("generation error: {0}")]
    Generation(String),

    /// Notifications cannot be shown (e.g. permission not granted).
    #[error("notifications unavailable: {0}")]
    NotificationUnavailable(String),

    /// Loading or saving the task list failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Configuration file or value is invalid.
    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TaskerError {
    pub fn schema_violation(prompt: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::SchemaViolation {
            prompt: prompt.into(),
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::NotFound(_) => ErrorKind::Input,
            Self::Transcription(_)
            | Self::SchemaViolation { .. }
            | Self::Generation(_)
            | Self::NotificationUnavailable(_) => ErrorKind::External,
            Self::Persistence(_) | Self::Config(_) | Self::Io(_) => ErrorKind::Infrastructure,
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, TaskerError>;
