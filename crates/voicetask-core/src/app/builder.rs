//! VoiceTaskerBuilder - VoiceTasker の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 開発体験の改善（明確なエラーメッセージ）

use std::sync::Arc;
use std::time::Duration;

use super::completion::CompletionMatcher;
use super::edit::EditResolver;
use super::intent::IntentResolver;
use super::priority::PriorityAdvisor;
use super::tasker::VoiceTasker;
use crate::domain::TaskerError;
use crate::impls::{TimeoutGenerator, TracingNotifier};
use crate::notify::{DEFAULT_REMINDER_LEAD_MINUTES, NotificationScheduler};
use crate::ports::{
    Clock, IdGenerator, Notifier, StructuredGenerator, SystemClock, TaskRepository, Transcriber,
    UlidGenerator,
};
use crate::store::TaskStore;
use crate::typed::TypedGenerator;

/// Default limit for one structured-generation call.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// VoiceTaskerBuilder は VoiceTasker を構築
///
/// # 使用例
/// ```ignore
/// let tasker = VoiceTaskerBuilder::new()
///     .generator(Arc::new(OpenAiGenerator::new(config.clone())))
///     .transcriber(Arc::new(OpenAiTranscriber::new(config)))
///     .repository(Arc::new(JsonFileRepository::new(path)))
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - generator / transcriber は必須。なければ build() が BuildError を返す
/// - 制限時間・リマインダーの前倒し時間は 0 以下を拒否
/// - repository があれば build() 時に読み込む（タイマーを張るので Tokio runtime 内で呼ぶこと）
pub struct VoiceTaskerBuilder {
    generator: Option<Arc<dyn StructuredGenerator>>,
    transcriber: Option<Arc<dyn Transcriber>>,
    notifier: Arc<dyn Notifier>,
    fallback_notifier: Option<Arc<dyn Notifier>>,
    clock: Arc<dyn Clock>,
    ids: Option<Arc<dyn IdGenerator>>,
    repository: Option<Arc<dyn TaskRepository>>,
    generation_timeout: Duration,
    reminder_lead: chrono::Duration,
}

/// BuildError は VoiceTasker 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("No structured generator configured. Call .generator(...) before build().")]
    MissingGenerator,

    #[error("No transcriber configured. Call .transcriber(...) before build().")]
    MissingTranscriber,

    #[error("Generation timeout must be greater than zero.")]
    InvalidTimeout,

    #[error("Reminder lead must be greater than zero, got {0} minutes.")]
    InvalidReminderLead(i64),

    #[error("Failed to load tasks: {0}")]
    Load(#[source] TaskerError),
}

impl VoiceTaskerBuilder {
    pub fn new() -> Self {
        Self {
            generator: None,
            transcriber: None,
            notifier: Arc::new(TracingNotifier),
            fallback_notifier: None,
            clock: Arc::new(SystemClock),
            ids: None,
            repository: None,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            reminder_lead: chrono::Duration::minutes(DEFAULT_REMINDER_LEAD_MINUTES),
        }
    }

    pub fn generator(mut self, generator: Arc<dyn StructuredGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// In-app notifier used when the primary one is unavailable.
    pub fn fallback_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.fallback_notifier = Some(notifier);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Defaults to a `UlidGenerator` over the configured clock.
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn repository(mut self, repository: Arc<dyn TaskRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    pub fn reminder_lead(mut self, lead: chrono::Duration) -> Self {
        self.reminder_lead = lead;
        self
    }

    /// Validate and wire everything.
    pub fn build(self) -> Result<VoiceTasker, BuildError> {
        let generator = self.generator.ok_or(BuildError::MissingGenerator)?;
        let transcriber = self.transcriber.ok_or(BuildError::MissingTranscriber)?;
        if self.generation_timeout.is_zero() {
            return Err(BuildError::InvalidTimeout);
        }
        if self.reminder_lead <= chrono::Duration::zero() {
            return Err(BuildError::InvalidReminderLead(self.reminder_lead.num_minutes()));
        }

        let generator = TypedGenerator::new(Arc::new(TimeoutGenerator::new(
            generator,
            self.generation_timeout,
        )));

        let mut scheduler = NotificationScheduler::new(self.notifier, Arc::clone(&self.clock))
            .with_reminder_lead(self.reminder_lead);
        if let Some(fallback) = self.fallback_notifier {
            scheduler = scheduler.with_fallback(fallback);
        }
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&self.clock))));

        let mut store = TaskStore::new(scheduler, self.clock, ids);
        if let Some(repository) = self.repository {
            store.load(repository).map_err(BuildError::Load)?;
        }

        Ok(VoiceTasker::new(
            store,
            transcriber,
            IntentResolver::new(generator.clone()),
            EditResolver::new(generator.clone()),
            PriorityAdvisor::new(generator.clone()),
            CompletionMatcher::new(generator),
        ))
    }
}

impl Default for VoiceTaskerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
