//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **OpenAiGenerator / OpenAiTranscriber**: 本番用の LLM・文字起こし
//! - **TimeoutGenerator**: generator に制限時間をかける decorator
//! - **ScriptedGenerator**: 台本どおりに答える generator（テスト・オフライン用）
//! - **JsonFileRepository / InMemoryRepository**: タスク一覧の永続化
//! - **TracingNotifier / RecordingNotifier / UnavailableNotifier**: 通知

pub mod inmem_repository;
pub mod json_repository;
pub mod notifiers;
pub mod openai;
pub mod scripted;
pub mod timeout;

// 主要な型を再エクスポート
pub use self::inmem_repository::InMemoryRepository;
pub use self::json_repository::JsonFileRepository;
pub use self::notifiers::{RecordingNotifier, TracingNotifier, UnavailableNotifier};
pub use self::openai::{OpenAiConfig, OpenAiGenerator, OpenAiTranscriber};
pub use self::scripted::ScriptedGenerator;
pub use self::timeout::TimeoutGenerator;
