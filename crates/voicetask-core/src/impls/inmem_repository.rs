//! InMemoryRepository - プロセス内だけの TaskRepository（テスト・開発用）

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::domain::{Result, Task};
use crate::ports::TaskRepository;

/// InMemoryRepository は最後に保存された一覧を保持する
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    tasks: Mutex<Vec<Task>>,
    saves: AtomicUsize,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `tasks` already "on disk".
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            saves: AtomicUsize::new(0),
        }
    }

    /// Last saved list.
    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of `save_all` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }
}

impl TaskRepository for InMemoryRepository {
    fn load_all(&self) -> Result<Vec<Task>> {
        Ok(self.snapshot())
    }

    fn save_all(&self, tasks: &[Task]) -> Result<()> {
        *self.tasks.lock().unwrap_or_else(PoisonError::into_inner) = tasks.to_vec();
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
