use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::key::{DerivedData, Item};

/// Produces one kind of derived data from a volume's representation.
///
/// Implementations must be pure: they read the representation and nothing
/// else. Returning `None` signals that the strategy does not apply to this
/// volume, which is an ordinary outcome and not an error.
pub trait ComputationStrategy<R>: Send + 'static {
    /// The derived data this strategy produces.
    type Output: DerivedData;

    /// Compute the derived data.
    ///
    /// Long-running strategies should poll `interrupt` and bail out with
    /// `None` once it is requested. The volume requests it when it is torn
    /// down while the computation is still running.
    fn create_from(&self, volume: &R, interrupt: &Interrupt) -> Option<Self::Output>;
}

/// Derived data with a default strategy for representation `R`.
///
/// This is what makes `Volume::get_blocking::<T>()` work without passing a
/// strategy explicitly.
pub trait Derive<R>: DerivedData + Sized {
    /// The strategy used to compute `Self`.
    type Strategy: ComputationStrategy<R, Output = Self> + Default;
}

/// A cooperative cancellation flag shared between a task and its strategy.
#[derive(Debug, Default, Clone)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    /// Create a flag that is not yet requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether termination was requested.
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Returns `None` once termination was requested.
    ///
    /// Meant for `?` inside `create_from`.
    pub fn check(&self) -> Option<()> {
        (!self.is_requested()).then_some(())
    }

    /// Request termination.
    pub(crate) fn request(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Object-safe view of a strategy, as stored by a task.
pub(crate) trait ErasedStrategy<R>: Send {
    fn compute(&self, volume: &R, interrupt: &Interrupt) -> Option<Item>;
}

impl<R, S> ErasedStrategy<R> for S
where
    S: ComputationStrategy<R>,
{
    fn compute(&self, volume: &R, interrupt: &Interrupt) -> Option<Item> {
        self.create_from(volume, interrupt).map(|value| Item::new(Arc::new(value)))
    }
}
