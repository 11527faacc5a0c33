//! TaskRepository port - タスク一覧の永続化
//!
//! トランザクショナルなストアではなく、一覧全体を 1 つの blob として
//! 読み書きする（localStorage 相当）。

use crate::domain::{Result, Task};

/// TaskRepository は task 一覧をまとめて load / save する
pub trait TaskRepository: Send + Sync {
    fn load_all(&self) -> Result<Vec<Task>>;

    fn save_all(&self, tasks: &[Task]) -> Result<()>;
}
