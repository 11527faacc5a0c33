//! JsonFileRepository - タスク一覧を 1 つの JSON ファイルに保存する
//!
//! ファイルの中身は Task オブジェクトの配列。
//! 読めないレコード（ULID でない id など）は warn を出して読み飛ばす。
//! 書き込みは一時ファイル → rename で行い、途中で落ちても壊れた JSON を残さない。

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::domain::{Result, Task, TaskerError};
use crate::ports::TaskRepository;

#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "tasks.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl TaskRepository for JsonFileRepository {
    /// A missing file is an empty list.
    fn load_all(&self) -> Result<Vec<Task>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let records: Vec<serde_json::Value> = serde_json::from_str(&raw).map_err(|e| {
            TaskerError::Persistence(format!("invalid task file {}: {e}", self.path.display()))
        })?;
        let total = records.len();
        let tasks: Vec<Task> = records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match serde_json::from_value(record) {
                Ok(task) => Some(task),
                Err(e) => {
                    warn!(path = %self.path.display(), index, error = %e, "skipping unreadable task record");
                    None
                }
            })
            .collect();
        debug!(path = %self.path.display(), loaded = tasks.len(), total, "task list read");
        Ok(tasks)
    }

    fn save_all(&self, tasks: &[Task]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(tasks)
            .map_err(|e| TaskerError::Persistence(format!("failed to encode tasks: {e}")))?;
        let temp = self.temp_path();
        fs::write(&temp, json)?;
        fs::rename(&temp, &self.path)?;
        debug!(path = %self.path.display(), count = tasks.len(), "task list saved");
        Ok(())
    }
}
