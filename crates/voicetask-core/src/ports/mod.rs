//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部 capability（LLM, 文字起こし, 通知, 永続化, 時刻, ID）への
//! インターフェースで、実装は `impls` に置きます。

pub mod clock;
pub mod generation;
pub mod id_generator;
pub mod notifier;
pub mod task_repository;
pub mod transcription;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::generation::{GenerationRequest, StructuredGenerator};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::notifier::Notifier;
pub use self::task_repository::TaskRepository;
pub use self::transcription::{AudioClip, Transcriber};
