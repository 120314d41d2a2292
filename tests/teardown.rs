use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use volcache::derived::{MinMax, MinMaxStrategy};
use volcache::ram::VolumeRam;
use volcache::{ComputationStrategy, DerivedData, Interrupt, TaskConfig, Volume};

/// Spins until interrupted and records what it saw.
struct Spin {
    started: Arc<AtomicBool>,
    exited: Arc<AtomicBool>,
}

impl ComputationStrategy<VolumeRam> for Spin {
    type Output = MinMax;

    fn create_from(&self, volume: &VolumeRam, interrupt: &Interrupt) -> Option<MinMax> {
        self.started.store(true, Ordering::SeqCst);
        while !interrupt.is_requested() {
            // Keep reading the representation while spinning.
            assert_eq!(volume.dimensions(), [8, 8, 8]);
            thread::sleep(Duration::from_millis(1));
        }
        self.exited.store(true, Ordering::SeqCst);
        MinMaxStrategy.create_from(volume, interrupt)
    }
}

fn wait_for(flag: &AtomicBool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !flag.load(Ordering::SeqCst) {
        assert!(Instant::now() < deadline, "timed out");
        thread::sleep(Duration::from_millis(1));
    }
}

fn spin() -> (Spin, Arc<AtomicBool>, Arc<AtomicBool>) {
    let started = Arc::new(AtomicBool::new(false));
    let exited = Arc::new(AtomicBool::new(false));
    (Spin { started: started.clone(), exited: exited.clone() }, started, exited)
}

#[test]
fn test_drop_while_computing() {
    let volume = Volume::new(VolumeRam::zeroed([8, 8, 8]).unwrap());
    let (events_tx, events) = mpsc::channel();
    volume.observe(move |event| {
        let _ = events_tx.send((event.key, event.item.is_some()));
    });

    let (strategy, started, exited) = spin();
    assert!(volume.get_non_blocking_with(strategy).is_none());
    wait_for(&started);
    assert!(!exited.load(Ordering::SeqCst));

    drop(volume);

    // The computation was over before the volume was gone.
    assert!(exited.load(Ordering::SeqCst));
    assert_eq!(events.try_recv(), Ok((MinMax::KEY, false)));
    assert!(events.try_recv().is_err());
}

#[test]
fn test_drop_with_many_computations() {
    struct Other;

    impl DerivedData for Other {
        const KEY: volcache::DataKey = volcache::DataKey::new("other");
    }

    struct SpinOther(Spin);

    impl ComputationStrategy<VolumeRam> for SpinOther {
        type Output = Other;

        fn create_from(&self, volume: &VolumeRam, interrupt: &Interrupt) -> Option<Other> {
            self.0.create_from(volume, interrupt).map(|_| Other)
        }
    }

    let config = TaskConfig::default().thread_name("teardown").stack_size(256 * 1024);
    let volume = Volume::with_config(VolumeRam::zeroed([8, 8, 8]).unwrap(), config);

    let (first, first_started, first_exited) = spin();
    let (second, second_started, second_exited) = spin();
    volume.get_non_blocking_with(first);
    volume.get_non_blocking_with(SpinOther(second));
    wait_for(&first_started);
    wait_for(&second_started);

    assert!(volume.is_computing::<MinMax>());
    assert!(volume.is_computing::<Other>());

    drop(volume);
    assert!(first_exited.load(Ordering::SeqCst));
    assert!(second_exited.load(Ordering::SeqCst));
}

#[test]
fn test_drop_idle_volume() {
    let volume = Volume::new(VolumeRam::zeroed([2, 2, 2]).unwrap());
    assert!(volume.get_blocking::<MinMax>().is_some());
    drop(volume);
}

#[test]
fn test_snapshot_outlives_volume() {
    let volume = Volume::new(VolumeRam::zeroed([2, 2, 2]).unwrap());
    let minmax = volume.get_blocking::<MinMax>().unwrap();
    drop(volume);
    assert_eq!(minmax.max(), 0.0);
}
