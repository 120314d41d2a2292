use std::sync::atomic::{AtomicUsize, Ordering};

/// How many computations were started since the last reset.
static STARTED: AtomicUsize = AtomicUsize::new(0);

/// How many computations were started, across all volumes and threads.
pub fn computations_started() -> usize {
    STARTED.load(Ordering::SeqCst)
}

/// Reset the counter.
pub fn reset() {
    STARTED.store(0, Ordering::SeqCst);
}

/// Records that a computation was started.
pub(crate) fn register_start() {
    STARTED.fetch_add(1, Ordering::SeqCst);
}
