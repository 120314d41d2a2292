use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use crate::config::TaskConfig;
use crate::error::Result;
use crate::key::{DataKey, DerivedData, Item};
use crate::strategy::{ComputationStrategy, ErasedStrategy, Interrupt};

/// The next task ID.
static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// What a running task needs from the volume it computes for.
///
/// Tasks only ever hold a weak reference to their host.
pub(crate) trait Host<R>: Send + Sync + 'static {
    /// The read-only representation to compute from.
    fn representation(&self) -> &R;

    /// Whether the host is being torn down.
    fn is_closing(&self) -> bool;

    /// Called on the task's thread once the computation is over, whether it
    /// produced a value, nothing, or was interrupted.
    fn finished(&self, task: &TaskShared);
}

/// Identifies a task across its lifetime.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub(crate) struct TaskId(u64);

/// Lifecycle stage of a task.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub(crate) enum TaskState {
    /// Not started yet.
    Created,
    /// The background thread is executing.
    Running,
    /// The computation ran to the end, with or without a value.
    Completed,
    /// Termination was requested before the result was harvested.
    Interrupted,
}

impl TaskState {
    /// Whether the task is past its computation.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Interrupted)
    }
}

/// The part of a task that its thread shares.
pub(crate) struct TaskShared {
    id: TaskId,
    key: DataKey,
    state: Mutex<TaskState>,
    /// Signalled once `state` leaves `Running`.
    done: Condvar,
    result: Mutex<Option<Item>>,
    interrupt: Interrupt,
}

impl TaskShared {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn key(&self) -> DataKey {
        self.key
    }

    /// A snapshot of the result slot.
    pub fn result(&self) -> Option<Item> {
        self.result.lock().clone()
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt.is_requested()
    }

    /// Move to a final state and wake up joiners.
    fn finish(&self) {
        let mut state = self.state.lock();
        if !state.is_finished() {
            *state = if self.interrupt.is_requested() {
                self.result.lock().take();
                TaskState::Interrupted
            } else {
                TaskState::Completed
            };
        }
        self.done.notify_all();
    }
}

/// Finishes the task even if the thread unwinds.
struct FinishGuard<'a>(&'a TaskShared);

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// One strategy invocation on a background thread.
pub(crate) struct ComputationTask<R> {
    shared: Arc<TaskShared>,
    /// Taken when the task starts.
    strategy: Mutex<Option<Box<dyn ErasedStrategy<R>>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl<R: Send + Sync + 'static> ComputationTask<R> {
    /// Create a task that will run `strategy` once started.
    pub fn new<S: ComputationStrategy<R>>(strategy: S) -> Self {
        Self {
            shared: Arc::new(TaskShared {
                id: TaskId(NEXT_ID.fetch_add(1, Ordering::Relaxed)),
                key: <S::Output as DerivedData>::KEY,
                state: Mutex::new(TaskState::Created),
                done: Condvar::new(),
                result: Mutex::new(None),
                interrupt: Interrupt::new(),
            }),
            strategy: Mutex::new(Some(Box::new(strategy))),
            handle: Mutex::new(None),
        }
    }

    /// Spawn the background thread computing for `host`.
    ///
    /// Panics if the task was already started.
    pub(crate) fn start<H: Host<R>>(&self, host: Weak<H>, config: &TaskConfig) -> Result<()> {
        let key = self.key();
        let Some(strategy) = self.strategy.lock().take() else {
            panic!("volcache: computation of {key} was already started");
        };

        *self.shared.state.lock() = TaskState::Running;

        let mut builder = thread::Builder::new().name(format!("{}-{key}", config.thread_name));
        if let Some(size) = config.stack_size {
            builder = builder.stack_size(size);
        }

        let shared = Arc::clone(&self.shared);
        match builder.spawn(move || run(shared, strategy, host)) {
            Ok(handle) => {
                *self.handle.lock() = Some(handle);
                tracing::debug!(%key, task = ?self.id(), "started computation");

                #[cfg(feature = "testing")]
                crate::testing::register_start();

                Ok(())
            }
            Err(err) => {
                self.shared.finish();
                Err(err.into())
            }
        }
    }
}

impl<R> ComputationTask<R> {
    /// The task's ID.
    pub fn id(&self) -> TaskId {
        self.shared.id
    }

    /// The key of the derived data being computed.
    pub fn key(&self) -> DataKey {
        self.shared.key
    }

    /// The current lifecycle stage.
    pub fn state(&self) -> TaskState {
        *self.shared.state.lock()
    }

    /// Whether the background thread is still executing.
    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.state() == TaskState::Running
    }

    /// Block until the background execution is over.
    ///
    /// Returns immediately for tasks that are finished or were never
    /// started.
    pub fn join(&self) {
        if let Some(handle) = &*self.handle.lock() {
            if handle.thread().id() == thread::current().id() {
                panic!("volcache: computation of {} cannot wait for itself", self.key());
            }
        }

        let mut state = self.shared.state.lock();
        while *state == TaskState::Running {
            self.shared.done.wait(&mut state);
        }
        drop(state);

        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!(key = %self.key(), "computation thread panicked");
            }
        }
    }

    /// Request early termination.
    ///
    /// The result slot stays empty and nothing is harvested.
    pub fn interrupt(&self) {
        self.shared.interrupt.request();
    }

    /// A snapshot of the result slot.
    #[cfg(test)]
    pub fn result(&self) -> Option<Item> {
        self.shared.result()
    }

    pub(crate) fn shared(&self) -> &TaskShared {
        &self.shared
    }
}

impl<R> Drop for ComputationTask<R> {
    fn drop(&mut self) {
        let Some(handle) = self.handle.get_mut().take() else { return };
        if !handle.is_finished() {
            self.interrupt();
        }

        // Dropped from its own thread: nothing to wait for.
        if handle.thread().id() == thread::current().id() {
            return;
        }

        if handle.join().is_err() {
            tracing::error!(key = %self.key(), "computation thread panicked");
        }
    }
}

/// The body of a task's thread.
fn run<R, H: Host<R>>(
    shared: Arc<TaskShared>,
    strategy: Box<dyn ErasedStrategy<R>>,
    host: Weak<H>,
) {
    let _finish = FinishGuard(&shared);
    let Some(host) = host.upgrade() else { return };

    if host.is_closing() {
        shared.interrupt.request();
    }

    let item = if shared.interrupt.is_requested() {
        None
    } else {
        let compute = || strategy.compute(host.representation(), &shared.interrupt);
        match panic::catch_unwind(AssertUnwindSafe(compute)) {
            Ok(item) => item,
            Err(_) => {
                tracing::error!(key = %shared.key, "strategy panicked, discarding result");
                None
            }
        }
    };
    drop(strategy);

    if shared.interrupt.is_requested() {
        tracing::debug!(key = %shared.key, task = ?shared.id, "computation interrupted");
    } else {
        *shared.result.lock() = item;
    }

    host.finished(&shared);
}
