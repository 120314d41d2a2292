use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use rustc_hash::FxHashMap;

use crate::key::DataKey;
use crate::task::{ComputationTask, TaskId};

/// A shared handle to a task.
pub(crate) type TaskHandle<R> = Arc<ComputationTask<R>>;

/// Deduplicates concurrent requests for the same kind of derived data.
///
/// The registry lock is distinct from the store lock. When both are needed,
/// the registry lock is taken first.
pub(crate) struct TaskRegistry<R> {
    tasks: Mutex<Tasks<R>>,
}

impl<R> TaskRegistry<R> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(Tasks {
                in_flight: FxHashMap::default(),
                finished: Vec::new(),
            }),
        }
    }

    /// Lock the registry for a sequence of operations.
    pub fn lock(&self) -> MutexGuard<'_, Tasks<R>> {
        self.tasks.lock()
    }
}

/// The registry's bookkeeping, accessible through [`TaskRegistry::lock`].
pub(crate) struct Tasks<R> {
    /// At most one running task per key.
    in_flight: FxHashMap<DataKey, TaskHandle<R>>,
    /// Tasks whose result was harvested, kept until their threads exit.
    finished: Vec<TaskHandle<R>>,
}

impl<R> Tasks<R> {
    /// The in-flight task for the key, if any.
    pub fn find_in_flight(&self, key: DataKey) -> Option<TaskHandle<R>> {
        self.in_flight.get(&key).cloned()
    }

    /// Track a started task as in flight.
    ///
    /// Panics if another task for the same key is in flight.
    pub fn register_started(&mut self, task: TaskHandle<R>) {
        let key = task.key();
        if self.in_flight.contains_key(&key) {
            panic!("volcache: a computation of {key} is already in flight");
        }
        self.in_flight.insert(key, task);
    }

    /// Move the task with the given ID from in-flight to finished
    /// bookkeeping.
    ///
    /// Returns `false` if that task is no longer in flight, e.g. because it
    /// was already moved.
    pub fn move_to_finished(&mut self, key: DataKey, id: TaskId) -> bool {
        match self.in_flight.get(&key) {
            Some(task) if task.id() == id => {}
            _ => return false,
        }

        if let Some(task) = self.in_flight.remove(&key) {
            self.finished.push(task);
        }
        true
    }

    /// Drop finished tasks whose computation is over.
    pub fn reap(&mut self) {
        self.finished.retain(|task| !task.state().is_finished());
    }

    /// Remove every task, in flight or finished.
    pub fn drain(&mut self) -> Vec<TaskHandle<R>> {
        let mut tasks: Vec<_> = self.in_flight.drain().map(|(_, task)| task).collect();
        tasks.append(&mut self.finished);
        tasks
    }

    /// How many tasks are in flight.
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// How many finished tasks are still tracked.
    #[cfg(test)]
    pub fn finished_len(&self) -> usize {
        self.finished.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::DerivedData;
    use crate::strategy::{ComputationStrategy, Interrupt};

    struct Len(usize);

    impl DerivedData for Len {
        const KEY: DataKey = DataKey::new("len");
    }

    struct LenStrategy;

    impl ComputationStrategy<String> for LenStrategy {
        type Output = Len;

        fn create_from(&self, volume: &String, _: &Interrupt) -> Option<Len> {
            Some(Len(volume.len()))
        }
    }

    #[test]
    fn test_lifecycle() {
        let registry = TaskRegistry::<String>::new();
        let task = Arc::new(ComputationTask::new(LenStrategy));
        let id = task.id();

        let mut tasks = registry.lock();
        assert!(tasks.find_in_flight(Len::KEY).is_none());

        tasks.register_started(task);
        assert_eq!(tasks.find_in_flight(Len::KEY).map(|t| t.id()), Some(id));
        assert_eq!(tasks.in_flight_len(), 1);

        assert!(tasks.move_to_finished(Len::KEY, id));
        assert!(!tasks.move_to_finished(Len::KEY, id));
        assert!(tasks.find_in_flight(Len::KEY).is_none());
        assert_eq!(tasks.finished_len(), 1);

        // Never started, so it is not past its computation.
        tasks.reap();
        assert_eq!(tasks.finished_len(), 1);

        assert_eq!(tasks.drain().len(), 1);
        assert_eq!(tasks.finished_len(), 0);
    }

    #[test]
    fn test_move_other_task() {
        let registry = TaskRegistry::<String>::new();
        let first = Arc::new(ComputationTask::new(LenStrategy));
        let second = Arc::new(ComputationTask::new(LenStrategy));

        let mut tasks = registry.lock();
        tasks.register_started(first.clone());
        assert!(!tasks.move_to_finished(Len::KEY, second.id()));
        assert_eq!(tasks.in_flight_len(), 1);
    }

    #[test]
    #[should_panic(expected = "volcache: a computation of len is already in flight")]
    fn test_duplicate_registration() {
        let registry = TaskRegistry::<String>::new();
        let mut tasks = registry.lock();
        tasks.register_started(Arc::new(ComputationTask::new(LenStrategy)));
        tasks.register_started(Arc::new(ComputationTask::new(LenStrategy)));
    }
}
