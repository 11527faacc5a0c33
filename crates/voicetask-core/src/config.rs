//! Configuration loaded from `config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{Result, TaskerError};
use crate::impls::OpenAiConfig;
use crate::impls::openai::DEFAULT_BASE_URL;
use crate::notify::DEFAULT_REMINDER_LEAD_MINUTES;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskerConfig {
    pub llm: LlmConfig,
    pub notifications: NotificationConfig,
    pub storage: StorageConfig,
}

/// Language-model and transcription settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API origin, e.g. `https://api.openai.com`.
    pub api_url: String,
    /// Model used for structured generation.
    pub api_model: String,
    /// Model used for speech-to-text.
    pub transcription_model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Limit for one generation call, in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_BASE_URL.into(),
            api_model: "gpt-4o-mini".into(),
            transcription_model: "whisper-1".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            timeout_secs: 30,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                TaskerError::Config(format!(
                    "environment variable {} is not set",
                    self.api_key_env
                ))
            })
    }

    pub fn generation_config(&self, api_key: &str) -> OpenAiConfig {
        OpenAiConfig::new(api_key, &self.api_model).with_base_url(&self.api_url)
    }

    pub fn transcription_config(&self, api_key: &str) -> OpenAiConfig {
        OpenAiConfig::new(api_key, &self.transcription_model).with_base_url(&self.api_url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// How long before the due time the reminder fires.
    pub reminder_lead_minutes: i64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            reminder_lead_minutes: DEFAULT_REMINDER_LEAD_MINUTES,
        }
    }
}

impl NotificationConfig {
    pub fn reminder_lead(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.reminder_lead_minutes)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Task file. Defaults to `default_tasks_path()`.
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn tasks_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_tasks_path)
    }
}

impl TaskerConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| TaskerError::Config(e.to_string()))
    }

    /// Like `from_file`, but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| TaskerError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/voicetask/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("voicetask").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("voicetask")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/voicetask-config/config.toml")
        }
    }
}

/// `~/.local/share/voicetask/tasks.json` (or under `$XDG_DATA_HOME`).
pub fn default_tasks_path() -> PathBuf {
    if let Some(data) = std::env::var_os("XDG_DATA_HOME") {
        PathBuf::from(data).join("voicetask").join("tasks.json")
    } else if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("voicetask")
            .join("tasks.json")
    } else {
        PathBuf::from("/tmp/voicetask-data/tasks.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = TaskerConfig::default();
        assert_eq!(config.notifications.reminder_lead_minutes, 15);
        assert_eq!(config.llm.timeout(), Duration::from_secs(30));
        assert_eq!(config.llm.api_url, "https://api.openai.com");
        assert!(config.storage.tasks_path().ends_with("tasks.json"));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voicetask").join("config.toml");

        let mut config = TaskerConfig::default();
        config.llm.api_model = "gpt-4o".into();
        config.notifications.reminder_lead_minutes = 5;
        config.storage.path = Some(dir.path().join("tasks.json"));

        config.save_to_file(&path).unwrap();
        assert_eq!(TaskerConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[notifications]\nreminder_lead_minutes = 10\n").unwrap();

        let config = TaskerConfig::from_file(&path).unwrap();
        assert_eq!(config.notifications.reminder_lead(), chrono::Duration::minutes(10));
        assert_eq!(config.llm, LlmConfig::default());
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();
        assert!(matches!(
            TaskerConfig::from_file(&path),
            Err(TaskerError::Config(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error_but_load_or_default_succeeds() {
        let path = Path::new("/nonexistent/voicetask/config.toml");
        assert!(matches!(TaskerConfig::from_file(path), Err(TaskerError::Io(_))));
        assert_eq!(TaskerConfig::load_or_default(path).unwrap(), TaskerConfig::default());
    }

    #[test]
    fn default_config_path_ends_with_config_toml() {
        let path = TaskerConfig::default_config_path();
        let path_str = path.to_string_lossy();
        assert!(path_str.ends_with("config.toml"));
        assert!(path_str.contains("voicetask"));
    }
}
