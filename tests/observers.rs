use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use volcache::derived::{Histogram, MinMax, VolumeHash};
use volcache::ram::{VolumeRam, VoxelData};
use volcache::{DerivedData, TaskConfig, Volume};

const TIMEOUT: Duration = Duration::from_secs(10);

fn volume() -> Volume<VolumeRam> {
    let data = VoxelData::U16(vec![0, 100, 200, 65535]);
    Volume::new(VolumeRam::new([2, 2, 1], data).unwrap())
}

#[test]
fn test_one_event_per_computation() {
    let volume = volume();
    let (_, events) = volume.subscribe();

    volume.get_blocking::<MinMax>().unwrap();
    volume.get_blocking::<MinMax>().unwrap();
    volume.get_blocking::<Histogram>().unwrap();

    let first = events.recv_timeout(TIMEOUT).unwrap();
    let second = events.recv_timeout(TIMEOUT).unwrap();
    assert!(events.try_recv().is_err());

    let mut keys = [first.key, second.key];
    keys.sort();
    assert_eq!(keys, [Histogram::KEY, MinMax::KEY]);
    assert!(first.volume == volume.id() && second.volume == volume.id());
}

#[test]
fn test_event_carries_stored_value() {
    let volume = volume();
    let (_, events) = volume.subscribe();

    volume.get_non_blocking::<VolumeHash>();
    let event = events.recv_timeout(TIMEOUT).unwrap();
    let hash = event.get::<VolumeHash>().unwrap();
    assert!(Arc::ptr_eq(&hash, &volume.cached_derived_data::<VolumeHash>().unwrap()));
    assert!(event.get::<MinMax>().is_none());
}

#[test]
fn test_unobserve() {
    let volume = volume();
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = calls.clone();
    let id = volume.observe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    volume.get_blocking::<MinMax>();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert_eq!(volume.observer_count(), 1);
    assert!(volume.unobserve(id));
    assert!(!volume.unobserve(id));
    assert_eq!(volume.observer_count(), 0);

    volume.get_blocking::<Histogram>();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_observer_sees_cached_value() {
    let volume = Arc::new(volume());
    let seen = Arc::new(Mutex::new(Vec::new()));

    // Observers hold no reference to the volume, only to what they need.
    let sink = seen.clone();
    volume.observe(move |event| {
        sink.lock().unwrap().push(event.get::<MinMax>().map(|m| m.max_normalized()));
    });

    let minmax = volume.get_blocking::<MinMax>().unwrap();
    assert_eq!(minmax.max(), 65535.0);
    assert_eq!(*seen.lock().unwrap(), [Some(1.0)]);
}

/// A computation that cannot start still produces an empty event.
#[test]
#[cfg(target_pointer_width = "64")]
fn test_spawn_failure_notifies() {
    let ram = VolumeRam::zeroed([2, 2, 2]).unwrap();
    let volume = Arc::new(Volume::with_config(ram, TaskConfig::default().stack_size(1 << 46)));
    let (_, events) = volume.subscribe();

    // The registry must be unlocked while observers run.
    let weak = Arc::downgrade(&volume);
    let computing = Arc::new(Mutex::new(Vec::new()));
    let sink = computing.clone();
    volume.observe(move |_| {
        if let Some(volume) = weak.upgrade() {
            sink.lock().unwrap().push(volume.is_computing::<MinMax>());
        }
    });

    assert!(volume.get_non_blocking::<MinMax>().is_none());
    let event = events.recv_timeout(TIMEOUT).unwrap();
    assert!(event.is::<MinMax>());
    assert!(event.item.is_none());

    assert!(volume.get_blocking::<Histogram>().is_none());
    let event = events.recv_timeout(TIMEOUT).unwrap();
    assert!(event.is::<Histogram>());
    assert!(event.item.is_none());

    assert!(!volume.has_derived_data::<MinMax>());
    assert_eq!(*computing.lock().unwrap(), [false, false]);
}

/// Dropped receivers unregister themselves on the next event.
#[test]
fn test_dropped_receivers_unregister() {
    let volume = volume();
    for _ in 0..100 {
        drop(volume.subscribe());
    }
    let (_, events) = volume.subscribe();
    assert_eq!(volume.observer_count(), 101);

    volume.get_blocking::<MinMax>().unwrap();
    assert!(events.recv_timeout(TIMEOUT).unwrap().is::<MinMax>());
    assert_eq!(volume.observer_count(), 1);
}
