//! Notifier port - 通知の配送
//!
//! Best effort: 呼び出し側を失敗させない。
//! 権限がない等で出せないときは `TaskerError::NotificationUnavailable` を返し、
//! scheduler がアプリ内の fallback に回す。

use crate::domain::{Notification, Result};

/// Notifier は通知を 1 件配送する
///
/// timer task の中から同期的に呼ばれるので、ブロックしないこと。
pub trait Notifier: Send + Sync {
    fn deliver(&self, notification: &Notification) -> Result<()>;
}
