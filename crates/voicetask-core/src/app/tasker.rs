//! VoiceTasker - 音声コマンドから TaskStore までをつなぐ呼び出し層
//!
//! # 責務
//! - 音声の文字起こし（Transcriber）
//! - resolver の呼び出し（generator 側で制限時間つき）
//! - resolver の結果を TaskStore に反映
//!
//! resolver は失敗しない（fallback を返す）。ここから `Err` で出ていくのは
//! TaskStore のエラー（Validation / NotFound）だけ。

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::completion::CompletionMatcher;
use super::edit::{EditRequest, EditResolver};
use super::intent::{IntentRequest, IntentResolver};
use super::priority::PriorityAdvisor;
use crate::domain::{
    CompletionMatch, EditResolution, IntentResolution, PrioritySuggestion, ProposedTask, Result,
    Task, TaskEdit, TaskId, TaskPatch, TaskerError,
};
use crate::ports::{AudioClip, Transcriber};
use crate::store::TaskStore;

pub const TRANSCRIPTION_FAILED: &str = "Transcription failed or returned empty.";

/// Outcome of one spoken or typed create/edit command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessedCommand {
    /// The command was understood well enough to propose a task.
    Interpreted {
        transcript: String,
        resolution: IntentResolution,
    },
    /// Nothing to propose (e.g. transcription failed).
    NotUnderstood { error: String },
}

impl ProcessedCommand {
    pub fn proposal(&self) -> Option<&ProposedTask> {
        match self {
            Self::Interpreted { resolution, .. } => Some(resolution.proposal()),
            Self::NotUnderstood { .. } => None,
        }
    }
}

/// The calling layer built by `VoiceTaskerBuilder`.
pub struct VoiceTasker {
    store: TaskStore,
    transcriber: Arc<dyn Transcriber>,
    intent: IntentResolver,
    edit: EditResolver,
    priority: PriorityAdvisor,
    completion: CompletionMatcher,
}

impl VoiceTasker {
    pub(crate) fn new(
        store: TaskStore,
        transcriber: Arc<dyn Transcriber>,
        intent: IntentResolver,
        edit: EditResolver,
        priority: PriorityAdvisor,
        completion: CompletionMatcher,
    ) -> Self {
        Self {
            store,
            transcriber,
            intent,
            edit,
            priority,
            completion,
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Direct access for manual add / toggle / remove.
    pub fn store_mut(&mut self) -> &mut TaskStore {
        &mut self.store
    }

    /// Transcribe `audio`, then interpret it like `process_text_command`.
    pub async fn process_voice_command(&self, audio: &AudioClip) -> ProcessedCommand {
        match self.transcribe(audio).await {
            Ok(transcript) => self.process_text_command(&transcript).await,
            Err(err) => ProcessedCommand::NotUnderstood {
                error: err.to_string(),
            },
        }
    }

    /// Decide create vs. edit for `text` against the current incomplete tasks.
    pub async fn process_text_command(&self, text: &str) -> ProcessedCommand {
        let transcript = text.trim();
        if transcript.is_empty() {
            return ProcessedCommand::NotUnderstood {
                error: TRANSCRIPTION_FAILED.into(),
            };
        }
        let request = IntentRequest {
            command_text: transcript.to_string(),
            reference_time: self.store.clock().now(),
            existing: self.store.incomplete_briefs(),
        };
        let resolution = self.intent.resolve(&request).await;
        ProcessedCommand::Interpreted {
            transcript: transcript.to_string(),
            resolution,
        }
    }

    /// Apply a proposal: edit the matched task if it still exists, otherwise
    /// add a new one.
    pub fn apply_proposal(&mut self, proposal: &ProposedTask) -> Result<Task> {
        let target = proposal
            .matched_task_id
            .filter(|id| proposal.is_edit && self.store.get(*id).is_some());

        match target {
            Some(id) => {
                let patch = TaskPatch::new()
                    .text(proposal.text.clone())
                    .due(proposal.due_at, proposal.time_description.clone());
                let task = self.store.edit(id, patch)?;
                info!(task_id = %id, "proposal applied as edit");
                Ok(task)
            }
            None => {
                if proposal.is_edit {
                    warn!(matched = ?proposal.matched_task_id, "matched task is gone, adding as new");
                }
                let task = self.store.add(
                    &proposal.text,
                    proposal.due_at,
                    proposal.time_description.clone(),
                )?;
                info!(task_id = %task.id(), "proposal applied as new task");
                Ok(task)
            }
        }
    }

    /// Transcribe `audio` and resolve it as an edit of `id`.
    ///
    /// Fails only with `NotFound`. A failed transcription comes back as a
    /// no-change fallback.
    pub async fn edit_by_voice(&self, id: TaskId, audio: &AudioClip) -> Result<EditResolution> {
        let current = self.store.get(id).ok_or(TaskerError::NotFound(id))?.brief();
        match self.transcribe(audio).await {
            Ok(transcript) => self.edit_by_text(id, &transcript).await,
            Err(err) => Ok(EditResolution::Fallback {
                edit: TaskEdit {
                    updated_text: current.text,
                    new_due_at: current.due_at,
                    new_time_description: current.time_description,
                    change_summary: format!("Error processing edit: {err}"),
                    no_changes_made: true,
                },
                cause: err.to_string(),
            }),
        }
    }

    pub async fn edit_by_text(&self, id: TaskId, text: &str) -> Result<EditResolution> {
        let current = self.store.get(id).ok_or(TaskerError::NotFound(id))?.brief();
        let request = EditRequest {
            command_text: text.trim().to_string(),
            current,
            reference_time: self.store.clock().now(),
        };
        Ok(self.edit.resolve(&request).await)
    }

    /// Write an edit into the store. A no-change edit returns the task as is.
    pub fn apply_edit(&mut self, id: TaskId, edit: &TaskEdit) -> Result<Task> {
        if edit.no_changes_made {
            return self.store.get(id).cloned().ok_or(TaskerError::NotFound(id));
        }
        let patch = TaskPatch::new()
            .text(edit.updated_text.clone())
            .due(edit.new_due_at, edit.new_time_description.clone());
        self.store.edit(id, patch)
    }

    /// Transcribe `audio` and complete the task it names, if any.
    pub async fn complete_by_voice(&mut self, audio: &AudioClip) -> Result<CompletionMatch> {
        match self.transcribe(audio).await {
            Ok(transcript) => self.complete_by_text(&transcript).await,
            Err(err) => {
                warn!(error = %err, "completion command not understood");
                Ok(CompletionMatch::none(
                    "Could not understand voice command for completion.",
                ))
            }
        }
    }

    /// Match `text` to an incomplete task and mark it complete.
    pub async fn complete_by_text(&mut self, text: &str) -> Result<CompletionMatch> {
        let incomplete = self.store.incomplete_briefs();
        let matched = self.completion.match_completion(text.trim(), &incomplete).await;
        if let Some(id) = matched.task_id {
            let still_open = self.store.get(id).is_some_and(|t| !t.is_completed());
            if still_open {
                self.store.toggle(id)?;
                info!(task_id = %id, "task completed by command");
            }
        }
        Ok(matched)
    }

    pub async fn suggest_priority(&self) -> PrioritySuggestion {
        let incomplete: Vec<Task> = self.store.incomplete().into_iter().cloned().collect();
        self.priority
            .suggest(self.store.clock().now(), &incomplete)
            .await
    }

    async fn transcribe(&self, audio: &AudioClip) -> Result<String> {
        let text = self.transcriber.transcribe(audio).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(TaskerError::Transcription(TRANSCRIPTION_FAILED.into()));
        }
        Ok(text.to_string())
    }
}

impl std::fmt::Debug for VoiceTasker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceTasker")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
