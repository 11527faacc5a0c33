//! App - アプリケーション層
//!
//! ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **VoiceTaskerBuilder**: 構築とワイヤリング（fail-fast 検証）
//! - **VoiceTasker**: 文字起こし → resolver → TaskStore の呼び出し層
//! - **IntentResolver**: 新規作成か既存タスクの編集かの判定
//! - **EditResolver**: 1 件のタスクに対する編集内容の判定
//! - **TimeExtractor / PriorityAdvisor / CompletionMatcher**: 補助の resolver

pub mod builder;
pub mod completion;
pub mod edit;
pub mod intent;
pub mod priority;
pub mod tasker;
pub mod time_extraction;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, DEFAULT_GENERATION_TIMEOUT, VoiceTaskerBuilder};
pub use self::completion::CompletionMatcher;
pub use self::edit::{DueChange, EditRequest, EditResolver};
pub use self::intent::{IntentRequest, IntentResolver};
pub use self::priority::PriorityAdvisor;
pub use self::tasker::{ProcessedCommand, VoiceTasker};
pub use self::time_extraction::TimeExtractor;
