use std::any::Any;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;

/// Identifies one kind of derived data.
///
/// Each volume keeps at most one stored result and at most one running
/// computation per key.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DataKey(&'static str);

impl DataKey {
    /// Create a key from its name.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The key's name.
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl Debug for DataKey {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "DataKey({:?})", self.0)
    }
}

impl Display for DataKey {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.pad(self.0)
    }
}

/// An expensive, cacheable result attached to a volume.
///
/// Usually implemented through `#[derive(DerivedData)]`.
pub trait DerivedData: Send + Sync + 'static {
    /// The slot this type occupies in a volume's store.
    const KEY: DataKey;
}

/// A type-erased derived-data item, as held by the store and handed to
/// observers.
#[derive(Clone)]
pub struct Item {
    key: DataKey,
    value: Arc<dyn Any + Send + Sync>,
}

impl Item {
    /// Erase a typed value.
    pub fn new<T: DerivedData>(value: Arc<T>) -> Self {
        Self { key: T::KEY, value }
    }

    /// The key this item is stored under.
    pub fn key(&self) -> DataKey {
        self.key
    }

    /// Recover the typed value.
    ///
    /// Returns `None` if the item belongs to a different key. Panics if the
    /// key matches but the stored type does not, since two types then claim
    /// the same slot.
    pub fn downcast<T: DerivedData>(&self) -> Option<Arc<T>> {
        if self.key != T::KEY {
            return None;
        }

        match Arc::clone(&self.value).downcast::<T>() {
            Ok(value) => Some(value),
            Err(_) => panic!(
                "volcache: key {} is shared by `{}` and another type",
                T::KEY,
                std::any::type_name::<T>(),
            ),
        }
    }

    /// Whether two items are the very same allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl Debug for Item {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Item").field("key", &self.key).finish_non_exhaustive()
    }
}
