//! Lazily computed derived data for volumetric datasets.
//!
//! A [`Volume`] wraps a read-only representation and caches expensive
//! auxiliary results computed from it, such as histograms or value ranges.
//! Each kind of result is a type implementing [`DerivedData`] and occupies
//! one slot, named by its [`DataKey`]. Results are produced by a
//! [`ComputationStrategy`], either on the caller's thread of control
//! ([`Volume::get_blocking`]) or in the background
//! ([`Volume::get_non_blocking`]), with at most one computation per kind in
//! flight.
//!
//! ```
//! use volcache::Volume;
//! use volcache::derived::{Histogram, MinMax};
//! use volcache::ram::{VolumeRam, VoxelData};
//!
//! let ram = VolumeRam::new([2, 2, 1], VoxelData::U8(vec![0, 64, 128, 255])).unwrap();
//! let volume = Volume::new(ram);
//!
//! let minmax = volume.get_blocking::<MinMax>().unwrap();
//! assert_eq!(minmax.max(), 255.0);
//!
//! // Starts a background computation, observers are told when it is done.
//! let (_, events) = volume.subscribe();
//! if volume.get_non_blocking::<Histogram>().is_none() {
//!     let event = events.recv().unwrap();
//!     assert_eq!(event.get::<Histogram>().unwrap().total(), 4);
//! }
//! assert!(volume.has_derived_data::<Histogram>());
//! ```

mod config;
mod error;
mod key;
mod observer;
mod registry;
mod store;
mod strategy;
mod task;
mod volume;

pub mod derived;
pub mod ram;
#[cfg(feature = "testing")]
pub mod testing;

pub use crate::config::TaskConfig;
pub use crate::error::{Error, Result};
pub use crate::key::{DataKey, DerivedData, Item};
pub use crate::observer::{DerivedDataEvent, ObserverId};
pub use crate::store::DerivedDataStore;
pub use crate::strategy::{ComputationStrategy, Derive, Interrupt};
pub use crate::volume::{Volume, VolumeId};

#[cfg(feature = "macros")]
pub use volcache_macros::DerivedData;
