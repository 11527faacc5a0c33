//! voicetask-core
//!
//! Core building blocks for a voice-driven to-do list.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task, notification, resolution, errors）
//! - **ports**: 抽象化レイヤー（StructuredGenerator, Transcriber, Notifier, TaskRepository, Clock, IdGenerator）
//! - **store**: タスク一覧（CRUD と並び順の不変条件）
//! - **notify**: リマインダー / 期限通知のタイマー
//! - **typed**: 型付き Prompt API（Prompt trait, PayloadCodec, TypedGenerator）
//! - **app**: resolver と呼び出し層（VoiceTasker, VoiceTaskerBuilder）
//! - **impls**: ports の実装（OpenAI, JSON ファイル, インメモリ, 通知）
//! - **config**: `config.toml` の読み書き

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod notify;
pub mod ports;
pub mod store;
pub mod typed;

pub use app::{ProcessedCommand, VoiceTasker, VoiceTaskerBuilder};
pub use config::TaskerConfig;
pub use domain::{Result, Task, TaskId, TaskerError};
pub use store::TaskStore;
