//! Notifier 実装
//!
//! - **TracingNotifier**: ログに出すだけ（アプリ内 fallback の既定）
//! - **RecordingNotifier**: 配送されたものを記録（テスト用）
//! - **UnavailableNotifier**: 常に `NotificationUnavailable` を返す（権限なしの再現）

use std::sync::{Mutex, PoisonError};

use tracing::warn;

use crate::domain::{Notification, Result, TaskerError};
use crate::ports::Notifier;

/// Emits each notification as a `warn` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn deliver(&self, notification: &Notification) -> Result<()> {
        warn!(
            tag = %notification.tag,
            title = %notification.title,
            body = %notification.body,
            "notification"
        );
        Ok(())
    }
}

/// RecordingNotifier は配送された通知を順番に保持する
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<Notification> {
        self.lock().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.lock().iter().map(|n| n.title.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Notification>> {
        self.delivered.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Notifier for RecordingNotifier {
    fn deliver(&self, notification: &Notification) -> Result<()> {
        self.lock().push(notification.clone());
        Ok(())
    }
}

/// Always refuses, as a notifier without permission would.
#[derive(Debug, Clone)]
pub struct UnavailableNotifier {
    reason: String,
}

impl UnavailableNotifier {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Notifier for UnavailableNotifier {
    fn deliver(&self, _notification: &Notification) -> Result<()> {
        Err(TaskerError::NotificationUnavailable(self.reason.clone()))
    }
}
