//! Store module: the task collection.
//!
//! # 責務
//! - Task の CRUD と並び順の不変条件
//! - 変更のたびに NotificationScheduler を再同期
//! - TaskRepository への保存（best effort）

mod memory;

pub use memory::TaskStore;
