use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, mpsc};

use parking_lot::Mutex;
use slab::Slab;

use crate::key::{DataKey, DerivedData, Item};
use crate::volume::VolumeId;

/// Sent once for every finished computation.
#[derive(Debug, Clone)]
pub struct DerivedDataEvent {
    /// The volume the computation ran for.
    pub volume: VolumeId,
    /// The kind of derived data that was computed.
    pub key: DataKey,
    /// The result, or `None` if the strategy did not apply or the
    /// computation was interrupted.
    pub item: Option<Item>,
}

impl DerivedDataEvent {
    /// Whether the event is about `T`.
    pub fn is<T: DerivedData>(&self) -> bool {
        self.key == T::KEY
    }

    /// The typed result, if the event is about `T` and carries a value.
    pub fn get<T: DerivedData>(&self) -> Option<Arc<T>> {
        self.item.as_ref()?.downcast::<T>()
    }
}

/// Identifies a registered observer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ObserverId(usize);

/// Returns whether it wants to stay registered.
type Callback = Arc<dyn Fn(&DerivedDataEvent) -> bool + Send + Sync>;

/// The observers registered with one volume.
#[derive(Default)]
pub(crate) struct Observers {
    callbacks: Mutex<Slab<Callback>>,
}

impl Observers {
    pub fn add<F>(&self, f: F) -> ObserverId
    where
        F: Fn(&DerivedDataEvent) + Send + Sync + 'static,
    {
        self.insert(Arc::new(move |event: &DerivedDataEvent| {
            f(event);
            true
        }))
    }

    /// Forward events to a channel until its receiver is dropped.
    pub fn add_sender(&self, tx: mpsc::Sender<DerivedDataEvent>) -> ObserverId {
        self.insert(Arc::new(move |event: &DerivedDataEvent| tx.send(event.clone()).is_ok()))
    }

    fn insert(&self, callback: Callback) -> ObserverId {
        ObserverId(self.callbacks.lock().insert(callback))
    }

    pub fn remove(&self, id: ObserverId) -> bool {
        self.callbacks.lock().try_remove(id.0).is_some()
    }

    pub fn len(&self) -> usize {
        self.callbacks.lock().len()
    }

    /// Deliver an event to every observer.
    ///
    /// Callbacks run without the lock held, so they may register or remove
    /// observers themselves. Callbacks that decline further events are
    /// removed afterwards.
    pub fn notify(&self, event: &DerivedDataEvent) {
        let callbacks: Vec<(usize, Callback)> =
            self.callbacks.lock().iter().map(|(i, f)| (i, Arc::clone(f))).collect();

        let mut stale = Vec::new();
        for (index, callback) in callbacks {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(true) => {}
                Ok(false) => stale.push((index, callback)),
                Err(_) => {
                    tracing::warn!(key = %event.key, volume = ?event.volume, "observer panicked");
                }
            }
        }

        if stale.is_empty() {
            return;
        }

        let mut callbacks = self.callbacks.lock();
        for (index, callback) in stale {
            // The slot may have been freed and reused in the meantime.
            if callbacks.get(index).is_some_and(|f| Arc::ptr_eq(f, &callback)) {
                callbacks.remove(index);
            }
        }
        tracing::debug!(volume = ?event.volume, "removed disconnected observers");
    }
}
