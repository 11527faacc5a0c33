//! In-memory task collection.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::domain::{Notification, Result, Task, TaskBrief, TaskId, TaskPatch, TaskerError};
use crate::notify::NotificationScheduler;
use crate::ports::{Clock, IdGenerator, TaskRepository};

/// The task list plus the notification timers derived from it.
///
/// Design:
/// - Single owner: every mutation takes `&mut self`, so there is no lock
///   around the collection.
/// - `tasks` is kept sorted by `Task::store_order` after every mutation.
/// - Store errors (`Validation`, `NotFound`) leave the store untouched.
/// - With a repository attached, every successful mutation saves the whole
///   list. Save failures are logged and never fail the mutation.
pub struct TaskStore {
    tasks: Vec<Task>,
    scheduler: NotificationScheduler,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    repository: Option<Arc<dyn TaskRepository>>,
}

impl TaskStore {
    pub fn new(
        scheduler: NotificationScheduler,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            tasks: Vec::new(),
            scheduler,
            clock,
            ids,
            repository: None,
        }
    }

    /// Restore the list from `repository` and keep saving into it.
    ///
    /// Replaces the current contents. Duplicate ids keep their first
    /// occurrence; records with empty text are dropped. Incomplete tasks with
    /// a future due time get their timers armed. Returns the number of tasks
    /// loaded.
    pub fn load(&mut self, repository: Arc<dyn TaskRepository>) -> Result<usize> {
        let loaded = repository.load_all()?;
        let total = loaded.len();

        let mut seen = HashSet::new();
        let mut tasks = Vec::with_capacity(total);
        for mut task in loaded {
            if task.text().trim().is_empty() {
                warn!(task_id = %task.id(), "dropping stored task with empty text");
                continue;
            }
            if !seen.insert(task.id()) {
                warn!(task_id = %task.id(), "dropping stored task with duplicate id");
                continue;
            }
            task.normalize();
            tasks.push(task);
        }

        self.scheduler.cancel_all();
        self.tasks = tasks;
        self.sort();
        let now = self.clock.now();
        for task in self.tasks.iter().filter(|t| t.is_pending_at(now)) {
            self.scheduler.schedule_for(task);
        }
        self.repository = Some(repository);

        info!(
            loaded = self.tasks.len(),
            skipped = total - self.tasks.len(),
            armed = self.scheduler.armed_count(),
            "task list restored"
        );
        Ok(self.tasks.len())
    }

    /// Save into `repository` from now on, without loading from it.
    pub fn attach_repository(&mut self, repository: Arc<dyn TaskRepository>) {
        self.repository = Some(repository);
    }

    /// Create a task. Fails with `Validation` on empty or whitespace-only text.
    pub fn add(
        &mut self,
        text: &str,
        due_at: Option<chrono::DateTime<chrono::Utc>>,
        time_description: Option<String>,
    ) -> Result<Task> {
        let text = non_empty_text(text)?;
        let task = Task::new(
            self.ids.generate_task_id(),
            text,
            self.clock.now(),
            due_at,
            time_description,
        );
        if task.due_at().is_some() {
            self.scheduler.schedule_for(&task);
        }
        debug!(task_id = %task.id(), due_at = ?task.due_at(), "task added");

        self.tasks.push(task.clone());
        self.sort();
        self.persist();
        Ok(task)
    }

    /// Flip `completed`.
    ///
    /// Completing cancels both timers. Completing an undated task while other
    /// incomplete tasks remain delivers a "more tasks remaining" notice.
    /// Un-completing re-arms the timers if the due time is still ahead.
    pub fn toggle(&mut self, id: TaskId) -> Result<Task> {
        let now = self.clock.now();
        let index = self.index_of(id)?;
        let task = &mut self.tasks[index];
        let completed = !task.is_completed();
        task.set_completed(completed, now);
        let task = task.clone();

        if completed {
            self.scheduler.cancel_for(id);
            let others_open = self.tasks.iter().any(|t| !t.is_completed());
            if task.due_at().is_none() && others_open {
                self.scheduler
                    .notify_now(&Notification::more_tasks_remaining());
            }
        } else {
            self.scheduler.schedule_for(&task);
        }
        debug!(task_id = %id, completed, "task toggled");

        self.sort();
        self.persist();
        Ok(task)
    }

    /// Delete a task and its timers. `None` if the id is unknown.
    pub fn remove(&mut self, id: TaskId) -> Option<Task> {
        let index = self.tasks.iter().position(|t| t.id() == id)?;
        let task = self.tasks.remove(index);
        self.scheduler.cancel_for(id);
        debug!(task_id = %id, "task removed");
        self.persist();
        Some(task)
    }

    /// Merge `patch` into the task.
    ///
    /// Timers are re-synced when the due time moves (including to `None`) or
    /// the task becomes incomplete, and cancelled when it becomes complete.
    pub fn edit(&mut self, id: TaskId, mut patch: TaskPatch) -> Result<Task> {
        if let Some(text) = patch.text.take() {
            patch.text = Some(non_empty_text(&text)?);
        }
        let now = self.clock.now();
        let index = self.index_of(id)?;
        let task = &mut self.tasks[index];
        let effect = task.apply(patch, now);
        let task = task.clone();

        if effect.became_completed {
            self.scheduler.cancel_for(id);
        } else if effect.due_changed || effect.became_incomplete {
            self.scheduler.schedule_for(&task);
        }
        debug!(task_id = %id, ?effect, "task edited");

        self.sort();
        self.persist();
        Ok(task)
    }

    /// Snapshot in store order.
    pub fn list(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id() == id)
    }

    /// Incomplete tasks, in store order.
    pub fn incomplete(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|t| !t.is_completed()).collect()
    }

    pub fn incomplete_briefs(&self) -> Vec<TaskBrief> {
        self.incomplete().into_iter().map(Task::brief).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn scheduler(&self) -> &NotificationScheduler {
        &self.scheduler
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn index_of(&self, id: TaskId) -> Result<usize> {
        self.tasks
            .iter()
            .position(|t| t.id() == id)
            .ok_or(TaskerError::NotFound(id))
    }

    fn sort(&mut self) {
        self.tasks.sort_by(Task::store_order);
    }

    fn persist(&self) {
        let Some(repository) = &self.repository else {
            return;
        };
        if let Err(err) = repository.save_all(&self.tasks) {
            error!(error = %err, "failed to save task list");
        }
    }
}

impl std::fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStore")
            .field("tasks", &self.tasks.len())
            .field("scheduler", &self.scheduler)
            .field("persistent", &self.repository.is_some())
            .finish()
    }
}

fn non_empty_text(text: &str) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TaskerError::Validation("task text must not be empty".into()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NotificationKey;
    use crate::impls::{InMemoryRepository, RecordingNotifier};
    use crate::ports::{FixedClock, UlidGenerator};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rstest::rstest;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 1, 10, 0, 0).unwrap()
    }

    struct Fixture {
        store: TaskStore,
        notifier: Arc<RecordingNotifier>,
        clock: Arc<FixedClock>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(FixedClock::new(t0()));
        let notifier = Arc::new(RecordingNotifier::new());
        let scheduler = NotificationScheduler::new(
            Arc::clone(&notifier) as Arc<dyn crate::ports::Notifier>,
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        let store = TaskStore::new(
            scheduler,
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::new(UlidGenerator::new(Arc::clone(&clock))),
        );
        Fixture {
            store,
            notifier,
            clock,
        }
    }

    fn hours(h: i64) -> Option<DateTime<Utc>> {
        Some(t0() + Duration::hours(h))
    }

    #[test]
    fn ids_are_unique() {
        let mut f = fixture();
        for i in 0..50 {
            f.store.add(&format!("task {i}"), None, None).unwrap();
        }
        let ids: HashSet<_> = f.store.tasks().iter().map(Task::id).collect();
        assert_eq!(ids.len(), 50);
    }

    #[rstest]
    #[case::incomplete_before_completed(&[(None, false), (None, true), (None, false)])]
    #[case::due_ascending(&[(Some(5), false), (Some(1), false), (Some(3), false)])]
    #[case::mixed(&[(Some(48), true), (Some(2), false), (None, false), (Some(1), true)])]
    #[tokio::test(start_paused = true)]
    async fn list_is_always_sorted(#[case] entries: &[(Option<i64>, bool)]) {
        let mut f = fixture();
        for (i, (due, done)) in entries.iter().enumerate() {
            f.clock.advance(Duration::minutes(1));
            let task = f
                .store
                .add(&format!("task {i}"), due.and_then(hours), None)
                .unwrap();
            if *done {
                f.store.toggle(task.id()).unwrap();
            }
        }
        let list = f.store.list();
        assert!(list.windows(2).all(|w| w[0].store_order(&w[1]).is_le()));
    }

    /// Edit the middle task of three (due in 2h, 4h, 6h) and check the order.
    #[rstest]
    #[case::due_moved_earlier(TaskPatch::new().due(hours(1), None), 0)]
    #[case::due_moved_later(TaskPatch::new().due(hours(8), None), 2)]
    #[case::due_cleared_sorts_by_creation(TaskPatch::new().due(None, None), 0)]
    #[case::completed_moves_to_end(TaskPatch::new().completed(true), 2)]
    #[tokio::test(start_paused = true)]
    async fn edit_keeps_list_sorted(#[case] patch: TaskPatch, #[case] expected_index: usize) {
        let mut f = fixture();
        let mut ids = Vec::new();
        for h in [2, 4, 6] {
            ids.push(f.store.add(&format!("due in {h}h"), hours(h), None).unwrap().id());
        }

        f.store.edit(ids[1], patch).unwrap();

        let list = f.store.list();
        assert!(list.windows(2).all(|w| w[0].store_order(&w[1]).is_le()));
        assert_eq!(list[expected_index].id(), ids[1]);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\n\t")]
    fn empty_text_is_rejected(#[case] text: &str) {
        let mut f = fixture();
        let err = f.store.add(text, None, None).unwrap_err();
        assert!(matches!(err, TaskerError::Validation(_)));
        assert!(f.store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn add_with_due_arms_both_timers() {
        let mut f = fixture();
        let task = f
            .store
            .add("Buy groceries", hours(24), Some("Tomorrow".into()))
            .unwrap();
        assert_eq!(
            f.store.scheduler().armed_keys(),
            vec![NotificationKey::reminder(task.id()), NotificationKey::due(task.id())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_cancels_and_restores_timers() {
        let mut f = fixture();
        let task = f.store.add("Call mom", hours(2), Some("Soon".into())).unwrap();

        let done = f.store.toggle(task.id()).unwrap();
        assert!(done.is_completed());
        assert_eq!(f.store.scheduler().armed_count(), 0);

        let open = f.store.toggle(task.id()).unwrap();
        assert!(!open.is_completed());
        assert_eq!(f.store.scheduler().armed_count(), 2);
    }

    #[test]
    fn toggle_unknown_id_is_not_found() {
        let mut f = fixture();
        let ghost = UlidGenerator::new(Arc::clone(&f.clock)).generate_task_id();
        assert!(matches!(
            f.store.toggle(ghost),
            Err(TaskerError::NotFound(id)) if id == ghost
        ));
    }

    #[test]
    fn completing_undated_task_with_others_open_notifies() {
        let mut f = fixture();
        let a = f.store.add("Water plants", None, None).unwrap();
        f.store.add("Read a book", None, None).unwrap();

        f.store.toggle(a.id()).unwrap();
        assert_eq!(f.notifier.titles(), vec!["VoiceTasker"]);
        assert_eq!(f.notifier.delivered()[0].tag, "more-tasks-reminder");
    }

    #[test]
    fn completing_last_open_task_stays_quiet() {
        let mut f = fixture();
        let a = f.store.add("Water plants", None, None).unwrap();
        f.store.toggle(a.id()).unwrap();
        assert!(f.notifier.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn remove_cancels_timers_and_is_noop_when_absent() {
        let mut f = fixture();
        let task = f.store.add("Dentist", hours(3), Some("3 PM".into())).unwrap();

        assert_eq!(f.store.remove(task.id()).map(|t| t.id()), Some(task.id()));
        assert_eq!(f.store.scheduler().armed_count(), 0);
        assert!(f.store.remove(task.id()).is_none());
        assert!(f.store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_due_cancels_timers() {
        let mut f = fixture();
        let task = f.store.add("Dentist", hours(3), Some("3 PM".into())).unwrap();

        let edited = f.store.edit(task.id(), TaskPatch::new().due(None, None)).unwrap();
        assert_eq!(edited.due_at(), None);
        assert_eq!(edited.time_description(), None);
        assert_eq!(f.store.scheduler().armed_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn moving_due_rearms_at_new_time() {
        let mut f = fixture();
        let task = f.store.add("Dentist", hours(3), Some("3 PM".into())).unwrap();

        f.store
            .edit(task.id(), TaskPatch::new().due(hours(5), Some("5 PM".into())))
            .unwrap();
        assert_eq!(
            f.store.scheduler().fire_time(&NotificationKey::due(task.id())),
            hours(5)
        );
    }

    #[test]
    fn edit_validates_text_and_id() {
        let mut f = fixture();
        let task = f.store.add("Dentist", None, None).unwrap();

        assert!(matches!(
            f.store.edit(task.id(), TaskPatch::new().text("  ")),
            Err(TaskerError::Validation(_))
        ));
        assert_eq!(f.store.get(task.id()).map(Task::text), Some("Dentist"));

        f.store.remove(task.id());
        assert!(matches!(
            f.store.edit(task.id(), TaskPatch::new().text("x")),
            Err(TaskerError::NotFound(_))
        ));
    }

    #[test]
    fn edit_sets_updated_at() {
        let mut f = fixture();
        let task = f.store.add("Dentist", None, None).unwrap();
        f.clock.advance(Duration::minutes(5));
        let edited = f.store.edit(task.id(), TaskPatch::new().text("Dentist at 3")).unwrap();
        assert_eq!(edited.created_at(), t0());
        assert_eq!(edited.updated_at(), Some(t0() + Duration::minutes(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn mutations_are_saved_and_load_rearms() {
        let repository = Arc::new(InMemoryRepository::new());
        let mut f = fixture();
        f.store.attach_repository(Arc::clone(&repository) as Arc<dyn TaskRepository>);
        let dated = f.store.add("Dentist", hours(3), Some("3 PM".into())).unwrap();
        f.store.add("Laundry", None, None).unwrap();
        assert_eq!(repository.snapshot().len(), 2);

        let mut restored = fixture();
        let loaded = restored
            .store
            .load(Arc::clone(&repository) as Arc<dyn TaskRepository>)
            .unwrap();
        assert_eq!(loaded, 2);
        assert_eq!(restored.store.list(), f.store.list());
        assert!(restored
            .store
            .scheduler()
            .is_armed(&NotificationKey::due(dated.id())));
    }

    #[test]
    fn load_drops_duplicate_ids() {
        let mut f = fixture();
        let task = f.store.add("Dentist", None, None).unwrap();
        let repository = Arc::new(InMemoryRepository::with_tasks(vec![task.clone(), task]));

        let mut restored = fixture();
        assert_eq!(restored.store.load(repository).unwrap(), 1);
    }
}
