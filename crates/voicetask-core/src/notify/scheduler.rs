//! Notification scheduler: two fire-once timers per task (reminder + due).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::{Notification, NotificationKey, Task, TaskId, TaskerError};
use crate::impls::TracingNotifier;
use crate::ports::{Clock, Notifier};

/// Default gap between the reminder and the due time.
pub const DEFAULT_REMINDER_LEAD_MINUTES: i64 = 15;

/// One armed timer.
///
/// `generation` lets a firing timer tell whether the entry under its key is
/// still its own or has been replaced by a reschedule.
#[derive(Debug)]
struct ArmedTimer {
    generation: u64,
    fire_at: DateTime<Utc>,
    handle: AbortHandle,
}

type TimerMap = HashMap<NotificationKey, ArmedTimer>;

/// Primary notifier plus the in-app fallback used when it is unavailable.
struct Delivery {
    primary: Arc<dyn Notifier>,
    fallback: Arc<dyn Notifier>,
}

impl Delivery {
    fn send(&self, notification: &Notification) {
        let Err(err) = self.primary.deliver(notification) else {
            return;
        };
        match err {
            TaskerError::NotificationUnavailable(reason) => {
                info!(tag = %notification.tag, %reason, "notifications unavailable, using in-app fallback");
            }
            other => {
                warn!(tag = %notification.tag, error = %other, "notification delivery failed, using in-app fallback");
            }
        }
        if let Err(err) = self.fallback.deliver(notification) {
            warn!(tag = %notification.tag, error = %err, "fallback notification failed");
        }
    }
}

/// Schedules and cancels the reminder / due timers of tasks.
///
/// Design:
/// - The timer map is owned by this instance; dropping the scheduler aborts
///   every outstanding timer.
/// - Timers are Tokio tasks, so `schedule_for` must run inside a runtime.
/// - Firing removes the timer's own entry, then delivers. Delivery is
///   synchronous, so an abort can never interrupt it halfway.
pub struct NotificationScheduler {
    timers: Arc<Mutex<TimerMap>>,
    delivery: Arc<Delivery>,
    clock: Arc<dyn Clock>,
    reminder_lead: Duration,
    next_generation: AtomicU64,
}

impl NotificationScheduler {
    pub fn new(notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>) -> Self {
        Self {
            timers: Arc::new(Mutex::new(HashMap::new())),
            delivery: Arc::new(Delivery {
                primary: notifier,
                fallback: Arc::new(TracingNotifier),
            }),
            clock,
            reminder_lead: Duration::minutes(DEFAULT_REMINDER_LEAD_MINUTES),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Replace the in-app fallback notifier.
    pub fn with_fallback(mut self, fallback: Arc<dyn Notifier>) -> Self {
        let primary = Arc::clone(&self.delivery.primary);
        self.delivery = Arc::new(Delivery { primary, fallback });
        self
    }

    /// Override how long before the due time the reminder fires.
    pub fn with_reminder_lead(mut self, lead: Duration) -> Self {
        self.reminder_lead = lead;
        self
    }

    pub fn reminder_lead(&self) -> Duration {
        self.reminder_lead
    }

    /// (Re)arm both timers for `task`.
    ///
    /// Existing timers under the task's keys are cancelled first, so calling
    /// this twice leaves exactly one reminder and one due timer. Times that
    /// are not strictly in the future are skipped. Completed or undated tasks
    /// only get their timers cancelled.
    pub fn schedule_for(&self, task: &Task) {
        let Some(due_at) = task.due_at().filter(|_| !task.is_completed()) else {
            self.cancel_for(task.id());
            return;
        };

        let now = self.clock.now();
        let plan = [
            (
                NotificationKey::reminder(task.id()),
                due_at.checked_sub_signed(self.reminder_lead),
                Notification::reminder_for(task, self.reminder_lead.num_minutes()),
            ),
            (
                NotificationKey::due(task.id()),
                Some(due_at),
                Notification::due_for(task),
            ),
        ];

        let mut timers = self.lock_timers();
        for (key, fire_at, notification) in plan {
            if let Some(old) = timers.remove(&key) {
                old.handle.abort();
            }
            match fire_at {
                Some(fire_at) if fire_at > now => {
                    self.arm(&mut timers, key, fire_at, now, notification);
                }
                Some(fire_at) => debug!(%key, %fire_at, "fire time already passed, not arming"),
                None => debug!(%key, %due_at, "fire time out of range, not arming"),
            }
        }
    }

    /// Cancel both timers of `task_id`. Idempotent.
    pub fn cancel_for(&self, task_id: TaskId) {
        let mut timers = self.lock_timers();
        for key in NotificationKey::pair(task_id) {
            if let Some(timer) = timers.remove(&key) {
                timer.handle.abort();
                debug!(%key, "cancelled notification timer");
            }
        }
    }

    /// Abort every outstanding timer.
    pub fn cancel_all(&self) {
        let mut timers = self.lock_timers();
        for (_, timer) in timers.drain() {
            timer.handle.abort();
        }
    }

    /// Deliver immediately through the same notifier / fallback path.
    pub fn notify_now(&self, notification: &Notification) {
        self.delivery.send(notification);
    }

    pub fn is_armed(&self, key: &NotificationKey) -> bool {
        self.lock_timers().contains_key(key)
    }

    pub fn armed_count(&self) -> usize {
        self.lock_timers().len()
    }

    /// Armed keys, sorted.
    pub fn armed_keys(&self) -> Vec<NotificationKey> {
        let mut keys: Vec<_> = self.lock_timers().keys().copied().collect();
        keys.sort();
        keys
    }

    pub fn fire_time(&self, key: &NotificationKey) -> Option<DateTime<Utc>> {
        self.lock_timers().get(key).map(|timer| timer.fire_at)
    }

    /// Spawn the timer while holding the map lock, so the timer can never
    /// look for its entry before it has been inserted.
    fn arm(
        &self,
        timers: &mut TimerMap,
        key: NotificationKey,
        fire_at: DateTime<Utc>,
        now: DateTime<Utc>,
        notification: Notification,
    ) {
        let delay = (fire_at - now).to_std().unwrap_or_default();
        // The deadline is fixed here, not at the task's first poll.
        let Some(deadline) = Instant::now().checked_add(delay) else {
            debug!(%key, %fire_at, "fire time too far ahead, not arming");
            return;
        };
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let map = Arc::clone(&self.timers);
        let delivery = Arc::clone(&self.delivery);

        let join = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let still_ours = {
                let mut timers = map.lock().unwrap_or_else(PoisonError::into_inner);
                match timers.get(&key) {
                    Some(timer) if timer.generation == generation => {
                        timers.remove(&key);
                        true
                    }
                    _ => false,
                }
            };
            if still_ours {
                debug!(%key, "notification timer fired");
                delivery.send(&notification);
            }
        });

        debug!(%key, %fire_at, "armed notification timer");
        timers.insert(
            key,
            ArmedTimer {
                generation,
                fire_at,
                handle: join.abort_handle(),
            },
        );
    }

    fn lock_timers(&self) -> MutexGuard<'_, TimerMap> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for NotificationScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

impl std::fmt::Debug for NotificationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationScheduler")
            .field("armed", &self.armed_count())
            .field("reminder_lead", &self.reminder_lead)
            .finish()
    }
}
