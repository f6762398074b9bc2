use crate::error::AppError;
use crate::model::{Clock, Task, TaskStatus};
use crate::storage::{SkippedLine, TaskStorage};
use tracing::warn;

/// Ordered task list backed by a [`TaskStorage`].
///
/// Tasks are addressed by their 1-based position; removing a task shifts every
/// later position down by one. Every mutation rewrites the whole storage.
pub struct TaskStore<S: TaskStorage> {
    tasks: Vec<Task>,
    storage: S,
    clock: Clock,
}

/// Result of opening a store. The store is always usable; a failed load leaves
/// it empty and the failure in `error`.
pub struct StoreLoad<S: TaskStorage> {
    pub store: TaskStore<S>,
    pub skipped: Vec<SkippedLine>,
    pub error: Option<AppError>,
}

/// A mutation that was applied in memory. `save_error` is set when the
/// rewrite failed and the change only lives in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persisted<T> {
    pub value: T,
    pub save_error: Option<AppError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusChange {
    Updated(Persisted<Task>),
    Unchanged(Task),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearOutcome {
    NothingToClear,
    Cleared(Persisted<usize>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskView<'a> {
    NoTasks,
    NoMatches(TaskStatus),
    Rows(Vec<ViewRow<'a>>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRow<'a> {
    /// Position in the full list, also when the view is filtered.
    pub position: usize,
    pub task: &'a Task,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statistics {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

impl Statistics {
    pub fn completion_rate(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.completed as f64 / self.total as f64 * 100.0)
        }
    }
}

impl<S: TaskStorage> TaskStore<S> {
    pub fn open(storage: S, clock: Clock) -> StoreLoad<S> {
        let mut store = Self {
            tasks: Vec::new(),
            storage,
            clock,
        };
        let (skipped, error) = match store.load() {
            Ok(skipped) => (skipped, None),
            Err(err) => (Vec::new(), Some(err)),
        };

        StoreLoad {
            store,
            skipped,
            error,
        }
    }

    /// Replaces the in-memory list with the storage contents. On failure the
    /// list is left empty.
    pub fn load(&mut self) -> Result<Vec<SkippedLine>, AppError> {
        self.tasks.clear();
        let fallback_timestamp = self.clock.timestamp()?;
        match self.storage.load(&fallback_timestamp) {
            Ok(report) => {
                self.tasks = report.tasks;
                Ok(report.skipped)
            }
            Err(err) => {
                warn!(error = %err, "failed to load tasks");
                Err(err)
            }
        }
    }

    pub fn save(&self) -> Result<(), AppError> {
        self.storage.save(&self.tasks).inspect_err(|err| {
            warn!(error = %err, "failed to save tasks");
        })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn add(&mut self, description: &str) -> Result<Persisted<Task>, AppError> {
        let text = description.trim();
        if text.is_empty() {
            return Err(AppError::invalid_input("task description cannot be empty"));
        }

        let task = Task::pending(text, self.clock.timestamp()?);
        self.tasks.push(task.clone());
        Ok(self.persist(task))
    }

    pub fn remove(&mut self, index: &str) -> Result<Persisted<Task>, AppError> {
        let position = self.parse_position(index)?;
        let removed = self.tasks.remove(position - 1);
        Ok(self.persist(removed))
    }

    pub fn mark_completed(&mut self, index: &str) -> Result<StatusChange, AppError> {
        self.set_status(index, TaskStatus::Completed)
    }

    pub fn mark_pending(&mut self, index: &str) -> Result<StatusChange, AppError> {
        self.set_status(index, TaskStatus::Pending)
    }

    pub fn view(&self, filter: Option<TaskStatus>) -> TaskView<'_> {
        if self.tasks.is_empty() {
            return TaskView::NoTasks;
        }

        let rows: Vec<ViewRow<'_>> = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| filter.is_none_or(|status| task.status == status))
            .map(|(index, task)| ViewRow {
                position: index + 1,
                task,
            })
            .collect();

        match filter {
            Some(status) if rows.is_empty() => TaskView::NoMatches(status),
            _ => TaskView::Rows(rows),
        }
    }

    pub fn clear_completed(&mut self) -> ClearOutcome {
        let before = self.tasks.len();
        self.tasks.retain(|task| !task.is_completed());
        let cleared = before - self.tasks.len();

        if cleared == 0 {
            ClearOutcome::NothingToClear
        } else {
            ClearOutcome::Cleared(self.persist(cleared))
        }
    }

    pub fn statistics(&self) -> Statistics {
        let total = self.tasks.len();
        let completed = self.tasks.iter().filter(|task| task.is_completed()).count();
        Statistics {
            total,
            completed,
            pending: total - completed,
        }
    }

    fn set_status(&mut self, index: &str, status: TaskStatus) -> Result<StatusChange, AppError> {
        let position = self.parse_position(index)?;
        let task = &mut self.tasks[position - 1];
        if task.status == status {
            return Ok(StatusChange::Unchanged(task.clone()));
        }

        task.status = status;
        let updated = task.clone();
        Ok(StatusChange::Updated(self.persist(updated)))
    }

    fn parse_position(&self, raw: &str) -> Result<usize, AppError> {
        let position: i64 = raw
            .trim()
            .parse()
            .map_err(|_| AppError::invalid_input("please enter a valid number"))?;

        let count = self.tasks.len();
        if count == 0 {
            return Err(AppError::invalid_input("there are no tasks"));
        }
        if position < 1 || position as u64 > count as u64 {
            return Err(AppError::invalid_input(format!(
                "invalid task number, enter a number between 1 and {count}"
            )));
        }

        Ok(position as usize)
    }

    fn persist<T>(&self, value: T) -> Persisted<T> {
        Persisted {
            value,
            save_error: self.save().err(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ClearOutcome, Persisted, StatusChange, TaskStore, TaskView};
    use crate::error::AppError;
    use crate::model::{Clock, Task, TaskStatus};
    use crate::storage::{LoadReport, TaskStorage, line_format};
    use std::cell::{Cell, RefCell};

    const NOW: &str = "2030-06-01 12:00";

    #[derive(Default)]
    struct RecordingStorage {
        initial: Vec<Task>,
        saved: RefCell<Vec<Vec<Task>>>,
        fail_load: bool,
        fail_save: Cell<bool>,
    }

    impl RecordingStorage {
        fn with_tasks(tasks: Vec<Task>) -> Self {
            Self {
                initial: tasks,
                ..Self::default()
            }
        }

        fn save_count(&self) -> usize {
            self.saved.borrow().len()
        }

        fn last_saved(&self) -> Vec<Task> {
            self.saved.borrow().last().cloned().unwrap_or_default()
        }
    }

    impl TaskStorage for RecordingStorage {
        fn load(&self, _fallback_timestamp: &str) -> Result<LoadReport, AppError> {
            if self.fail_load {
                return Err(AppError::io("disk unavailable"));
            }
            Ok(LoadReport {
                tasks: self.initial.clone(),
                skipped: Vec::new(),
            })
        }

        fn save(&self, tasks: &[Task]) -> Result<(), AppError> {
            if self.fail_save.get() {
                return Err(AppError::io("disk full"));
            }
            self.saved.borrow_mut().push(tasks.to_vec());
            Ok(())
        }

        fn location(&self) -> String {
            "memory".to_string()
        }
    }

    fn task(text: &str, status: TaskStatus) -> Task {
        Task {
            text: text.to_string(),
            status,
            timestamp: "2024-01-01 10:00".to_string(),
        }
    }

    fn open(tasks: Vec<Task>) -> TaskStore<RecordingStorage> {
        let loaded = TaskStore::open(RecordingStorage::with_tasks(tasks), Clock::fixed(NOW));
        assert!(loaded.error.is_none());
        loaded.store
    }

    fn texts(store: &TaskStore<RecordingStorage>) -> Vec<&str> {
        store.tasks().iter().map(|task| task.text.as_str()).collect()
    }

    #[test]
    fn failed_load_starts_empty_and_reports_error() {
        let storage = RecordingStorage {
            initial: vec![task("hidden", TaskStatus::Pending)],
            fail_load: true,
            ..RecordingStorage::default()
        };

        let loaded = TaskStore::open(storage, Clock::fixed(NOW));

        assert!(loaded.store.is_empty());
        assert_eq!(loaded.error.map(|err| err.code()), Some("io_error"));
    }

    #[test]
    fn add_appends_pending_task_and_saves() {
        let mut store = open(Vec::new());

        let added = store.add("  Buy milk  ").unwrap();

        assert_eq!(added.value, Task::pending("Buy milk", NOW));
        assert!(added.save_error.is_none());
        assert_eq!(store.storage().save_count(), 1);
        assert_eq!(store.storage().last_saved(), vec![Task::pending("Buy milk", NOW)]);
    }

    #[test]
    fn add_rejects_blank_description() {
        let mut store = open(vec![task("existing", TaskStatus::Pending)]);

        for blank in ["", "   ", "\t\n"] {
            let err = store.add(blank).unwrap_err();
            assert_eq!(err.code(), "invalid_input");
        }

        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.storage().save_count(), 0);
    }

    #[test]
    fn remove_shifts_later_positions() {
        let mut store = open(vec![
            task("a", TaskStatus::Pending),
            task("b", TaskStatus::Completed),
            task("c", TaskStatus::Pending),
        ]);

        let removed = store.remove(" 2 ").unwrap();

        assert_eq!(removed.value.text, "b");
        assert_eq!(texts(&store), vec!["a", "c"]);
        assert_eq!(store.storage().save_count(), 1);
        match store.view(None) {
            TaskView::Rows(rows) => {
                assert_eq!(rows[1].position, 2);
                assert_eq!(rows[1].task.text, "c");
            }
            other => panic!("unexpected view: {other:?}"),
        }
    }

    #[test]
    fn remove_rejects_bad_positions() {
        let mut store = open(vec![task("a", TaskStatus::Pending)]);

        for raw in ["", "abc", "1.5", "0", "2", "-1", "99999999999999999999"] {
            let err = store.remove(raw).unwrap_err();
            assert_eq!(err.code(), "invalid_input", "input {raw:?}");
        }

        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.storage().save_count(), 0);
    }

    #[test]
    fn out_of_range_message_names_bounds() {
        let mut store = open(vec![
            task("a", TaskStatus::Pending),
            task("b", TaskStatus::Pending),
        ]);

        let err = store.mark_completed("3").unwrap_err();

        assert!(err.message().contains("between 1 and 2"));
    }

    #[test]
    fn positions_on_empty_store_are_rejected() {
        let mut store = open(Vec::new());

        let err = store.remove("1").unwrap_err();

        assert_eq!(err.message(), "there are no tasks");
    }

    #[test]
    fn mark_completed_twice_saves_once() {
        let mut store = open(vec![task("Buy milk", TaskStatus::Pending)]);

        let first = store.mark_completed("1").unwrap();
        let second = store.mark_completed("1").unwrap();

        assert!(matches!(first, StatusChange::Updated(Persisted { ref value, .. }) if value.status == TaskStatus::Completed));
        assert!(matches!(second, StatusChange::Unchanged(_)));
        assert_eq!(store.tasks()[0].status, TaskStatus::Completed);
        assert_eq!(store.storage().save_count(), 1);
    }

    #[test]
    fn mark_pending_reverts_completed_task() {
        let mut store = open(vec![task("Buy milk", TaskStatus::Completed)]);

        let change = store.mark_pending("1").unwrap();

        assert!(matches!(change, StatusChange::Updated(_)));
        assert_eq!(store.tasks()[0].status, TaskStatus::Pending);
        assert_eq!(store.storage().last_saved()[0].status, TaskStatus::Pending);

        let again = store.mark_pending("1").unwrap();
        assert!(matches!(again, StatusChange::Unchanged(_)));
        assert_eq!(store.storage().save_count(), 1);
    }

    #[test]
    fn view_keeps_original_positions_when_filtered() {
        let store = open(vec![
            task("a", TaskStatus::Completed),
            task("b", TaskStatus::Pending),
            task("c", TaskStatus::Completed),
        ]);

        match store.view(Some(TaskStatus::Completed)) {
            TaskView::Rows(rows) => {
                let positions: Vec<usize> = rows.iter().map(|row| row.position).collect();
                assert_eq!(positions, vec![1, 3]);
            }
            other => panic!("unexpected view: {other:?}"),
        }
    }

    #[test]
    fn view_reports_empty_and_unmatched() {
        let empty = open(Vec::new());
        assert_eq!(empty.view(None), TaskView::NoTasks);
        assert_eq!(empty.view(Some(TaskStatus::Pending)), TaskView::NoTasks);

        let store = open(vec![task("a", TaskStatus::Pending)]);
        assert_eq!(
            store.view(Some(TaskStatus::Completed)),
            TaskView::NoMatches(TaskStatus::Completed)
        );
    }

    #[test]
    fn view_filter_accepts_any_case() {
        let store = open(vec![task("a", TaskStatus::Pending)]);
        let filter: TaskStatus = "pEnDiNg".parse().unwrap();

        assert!(matches!(store.view(Some(filter)), TaskView::Rows(rows) if rows.len() == 1));
    }

    #[test]
    fn clear_completed_preserves_order_of_the_rest() {
        let mut store = open(vec![
            task("a", TaskStatus::Pending),
            task("b", TaskStatus::Completed),
            task("c", TaskStatus::Pending),
            task("d", TaskStatus::Completed),
            task("e", TaskStatus::Pending),
        ]);

        let outcome = store.clear_completed();

        assert_eq!(
            outcome,
            ClearOutcome::Cleared(Persisted {
                value: 2,
                save_error: None
            })
        );
        assert_eq!(texts(&store), vec!["a", "c", "e"]);
        assert_eq!(store.storage().save_count(), 1);
    }

    #[test]
    fn clear_completed_without_completed_is_noop() {
        let mut store = open(vec![task("a", TaskStatus::Pending)]);

        assert_eq!(store.clear_completed(), ClearOutcome::NothingToClear);
        assert_eq!(store.storage().save_count(), 0);
    }

    #[test]
    fn statistics_counts_and_rate() {
        let store = open(vec![
            task("a", TaskStatus::Completed),
            task("b", TaskStatus::Pending),
            task("c", TaskStatus::Pending),
        ]);

        let stats = store.statistics();

        assert_eq!((stats.total, stats.completed, stats.pending), (3, 1, 2));
        assert_eq!(format!("{:.1}", stats.completion_rate().unwrap()), "33.3");
    }

    #[test]
    fn statistics_rate_is_absent_when_empty() {
        let stats = open(Vec::new()).statistics();

        assert_eq!(stats.total, 0);
        assert_eq!(stats.completion_rate(), None);
    }

    #[test]
    fn save_failure_keeps_change_in_memory() {
        let mut store = open(Vec::new());
        store.storage().fail_save.set(true);

        let added = store.add("Buy milk").unwrap();

        assert_eq!(added.save_error.map(|err| err.code()), Some("io_error"));
        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.storage().save_count(), 0);
    }

    #[test]
    fn buy_milk_walkthrough() {
        let mut store = open(Vec::new());

        store.add("Buy milk").unwrap();
        store.mark_completed("1").unwrap();

        assert_eq!(
            store.view(Some(TaskStatus::Pending)),
            TaskView::NoMatches(TaskStatus::Pending)
        );
        let stats = store.statistics();
        assert_eq!((stats.total, stats.completed, stats.pending), (1, 1, 0));
        assert_eq!(format!("{:.1}%", stats.completion_rate().unwrap()), "100.0%");
        assert_eq!(
            line_format::format_document(&store.storage().last_saved()),
            format!("[COMPLETED] Buy milk - {NOW}\n")
        );
    }
}
