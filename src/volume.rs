use std::fmt::{self, Debug, Formatter};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, mpsc};

use crate::config::TaskConfig;
use crate::error::Result;
use crate::key::{DataKey, DerivedData, Item};
use crate::observer::{DerivedDataEvent, ObserverId, Observers};
use crate::registry::{TaskHandle, TaskRegistry, Tasks};
use crate::store::DerivedDataStore;
use crate::strategy::{ComputationStrategy, Derive};
use crate::task::{ComputationTask, Host, TaskShared};

/// The next volume ID.
static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Identifies a volume in observer events.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VolumeId(u64);

impl VolumeId {
    pub(crate) fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A volumetric dataset with its cache of derived data.
///
/// The volume owns a read-only representation of type `R` and computes
/// derived data from it on demand, either blocking the caller or on a
/// background thread. At most one computation per kind of derived data runs
/// at any time.
///
/// Dropping the volume interrupts and joins all running computations before
/// any of its data is released.
pub struct Volume<R: Send + Sync + 'static> {
    shared: Arc<Shared<R>>,
}

/// The state computations reach through their weak back-reference.
struct Shared<R> {
    id: VolumeId,
    representation: R,
    store: DerivedDataStore,
    registry: TaskRegistry<R>,
    observers: Observers,
    config: TaskConfig,
    /// Set as soon as teardown begins.
    closing: AtomicBool,
}

impl<R: Send + Sync + 'static> Volume<R> {
    /// Wrap a representation with the default task configuration.
    pub fn new(representation: R) -> Self {
        Self::with_config(representation, TaskConfig::default())
    }

    /// Wrap a representation.
    pub fn with_config(representation: R, config: TaskConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: VolumeId::next(),
                representation,
                store: DerivedDataStore::new(),
                registry: TaskRegistry::new(),
                observers: Observers::default(),
                config,
                closing: AtomicBool::new(false),
            }),
        }
    }

    /// The volume's ID.
    pub fn id(&self) -> VolumeId {
        self.shared.id
    }

    /// The read-only representation.
    pub fn representation(&self) -> &R {
        &self.shared.representation
    }

    /// The task configuration.
    pub fn config(&self) -> &TaskConfig {
        &self.shared.config
    }

    /// The underlying store of completed derived data.
    pub fn store(&self) -> &DerivedDataStore {
        &self.shared.store
    }

    /// The keys of all cached derived data, sorted by name.
    pub fn derived_keys(&self) -> Vec<DataKey> {
        self.shared.store.keys()
    }

    /// Whether `T` is cached.
    pub fn has_derived_data<T: DerivedData>(&self) -> bool {
        self.shared.store.has(T::KEY)
    }

    /// The cached `T`, without computing anything.
    pub fn cached_derived_data<T: DerivedData>(&self) -> Option<Arc<T>> {
        self.shared.store.get_typed::<T>()
    }

    /// Whether a computation of `T` is in flight.
    pub fn is_computing<T: DerivedData>(&self) -> bool {
        self.shared.registry.lock().find_in_flight(T::KEY).is_some()
    }

    /// Get `T`, computing it with its default strategy if needed.
    ///
    /// Blocks until the value is available. Returns `None` if the strategy
    /// does not apply to this volume.
    pub fn get_blocking<T: Derive<R>>(&self) -> Option<Arc<T>> {
        self.get_blocking_with(T::Strategy::default())
    }

    /// Get the strategy's output, computing it with `strategy` if needed.
    ///
    /// If a computation of the same kind is already in flight, this waits for
    /// it instead and `strategy` is not used.
    pub fn get_blocking_with<S>(&self, strategy: S) -> Option<Arc<S::Output>>
    where
        S: ComputationStrategy<R>,
    {
        let store = &self.shared.store;
        if let Some(value) = store.get_typed::<S::Output>() {
            return Some(value);
        }

        let spawned = {
            let mut tasks = self.shared.registry.lock();

            // A computation may have been harvested since the first lookup.
            if let Some(value) = store.get_typed::<S::Output>() {
                return Some(value);
            }

            match tasks.find_in_flight(S::Output::KEY) {
                Some(task) => Ok(task),
                None => self.spawn(&mut tasks, strategy),
            }
        };

        let Ok(task) = spawned else {
            self.spawn_failed(S::Output::KEY);
            return None;
        };

        task.join();
        self.shared.harvest(task.shared());
        store.get_typed::<S::Output>()
    }

    /// Get `T` if it is cached, otherwise start computing it in the
    /// background with its default strategy.
    ///
    /// Never blocks. Observers are notified when the computation finishes.
    pub fn get_non_blocking<T: Derive<R>>(&self) -> Option<Arc<T>> {
        self.get_non_blocking_with(T::Strategy::default())
    }

    /// Get the strategy's output if it is cached, otherwise start computing
    /// it in the background with `strategy`.
    ///
    /// Does nothing but return `None` if a computation of the same kind is
    /// already in flight.
    pub fn get_non_blocking_with<S>(&self, strategy: S) -> Option<Arc<S::Output>>
    where
        S: ComputationStrategy<R>,
    {
        let store = &self.shared.store;
        if let Some(value) = store.get_typed::<S::Output>() {
            return Some(value);
        }

        let mut tasks = self.shared.registry.lock();
        if let Some(value) = store.get_typed::<S::Output>() {
            return Some(value);
        }

        if tasks.find_in_flight(S::Output::KEY).is_some() {
            return None;
        }

        let spawned = self.spawn(&mut tasks, strategy);
        drop(tasks);

        if spawned.is_err() {
            self.spawn_failed(S::Output::KEY);
        }

        None
    }

    /// Store a value that was computed elsewhere, replacing and disposing
    /// any cached value of the same kind.
    pub fn add_derived_data<T: DerivedData>(&self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.shared.store.insert(Item::new(Arc::clone(&value)));
        value
    }

    /// Dispose of the cached `T`. Returns whether there was one.
    pub fn remove_derived_data<T: DerivedData>(&self) -> bool {
        self.shared.store.remove(T::KEY)
    }

    /// Dispose of all cached derived data.
    ///
    /// Computations in flight are not affected and store their results when
    /// they finish.
    pub fn clear_derived_data(&self) {
        self.shared.store.clear();
    }

    /// Register a callback for finished computations.
    ///
    /// The callback runs on the computation's thread. It must not block for
    /// long and must not assume exclusive access to the volume.
    pub fn observe<F>(&self, f: F) -> ObserverId
    where
        F: Fn(&DerivedDataEvent) + Send + Sync + 'static,
    {
        self.shared.observers.add(f)
    }

    /// Receive events for finished computations through a channel.
    ///
    /// The registration is removed by the first notification after the
    /// receiver was dropped.
    pub fn subscribe(&self) -> (ObserverId, mpsc::Receiver<DerivedDataEvent>) {
        let (tx, rx) = mpsc::channel();
        (self.shared.observers.add_sender(tx), rx)
    }

    /// Remove an observer. Returns whether it was registered.
    pub fn unobserve(&self, id: ObserverId) -> bool {
        self.shared.observers.remove(id)
    }

    /// How many observers are registered.
    pub fn observer_count(&self) -> usize {
        self.shared.observers.len()
    }

    /// Create, start and register a task.
    ///
    /// Must be called with the registry locked and no task for the key in
    /// flight. On failure, the caller reports it through
    /// [`spawn_failed`](Self::spawn_failed) once the registry is unlocked.
    fn spawn<S>(&self, tasks: &mut Tasks<R>, strategy: S) -> Result<TaskHandle<R>>
    where
        S: ComputationStrategy<R>,
    {
        tasks.reap();

        let task = Arc::new(ComputationTask::new(strategy));
        if let Err(err) = task.start(Arc::downgrade(&self.shared), &self.shared.config) {
            tracing::error!(key = %task.key(), volume = ?self.id(), %err, "could not start computation");
            return Err(err);
        }

        tasks.register_started(Arc::clone(&task));
        Ok(task)
    }

    /// Tell observers that a computation of `key` produced nothing because
    /// it never started.
    ///
    /// Must be called without the registry locked.
    fn spawn_failed(&self, key: DataKey) {
        self.shared.observers.notify(&DerivedDataEvent { volume: self.id(), key, item: None });
    }
}

impl<R> Shared<R> {
    /// Move a finished task's result into the store.
    ///
    /// Only the task currently in flight for its key is harvested, and only
    /// once. Returns whether this call harvested it.
    fn harvest(&self, task: &TaskShared) -> bool {
        let mut tasks = self.registry.lock();
        let key = task.key();
        if !tasks.find_in_flight(key).is_some_and(|t| t.id() == task.id()) {
            return false;
        }

        if let Some(item) = task.result() {
            self.store.insert(item);
        }

        tasks.move_to_finished(key, task.id());
        tracing::debug!(%key, task = ?task.id(), volume = ?self.id, "harvested computation");
        true
    }
}

impl<R: Send + Sync + 'static> Host<R> for Shared<R> {
    fn representation(&self) -> &R {
        &self.representation
    }

    fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    fn finished(&self, task: &TaskShared) {
        let item = if task.is_interrupted() || self.is_closing() {
            None
        } else {
            self.harvest(task);
            task.result()
        };

        self.observers.notify(&DerivedDataEvent { volume: self.id, key: task.key(), item });
    }
}

impl<R: Send + Sync + 'static> Drop for Volume<R> {
    fn drop(&mut self) {
        self.shared.closing.store(true, Ordering::Release);

        // Release the registry before joining, finishing tasks lock it.
        let tasks = self.shared.registry.lock().drain();

        for task in &tasks {
            task.interrupt();
        }

        for task in &tasks {
            task.join();
        }

        tracing::debug!(volume = ?self.id(), tasks = tasks.len(), "volume torn down");
    }
}

impl<R: Send + Sync + 'static> Debug for Volume<R> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Volume")
            .field("id", &self.shared.id)
            .field("derived", &self.shared.store.keys())
            .field("computing", &self.shared.registry.lock().in_flight_len())
            .finish_non_exhaustive()
    }
}
