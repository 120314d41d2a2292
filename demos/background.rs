//! Computes derived data for a synthetic volume in the background.
//!
//! Run with `RUST_LOG=volcache=debug cargo run --example background`.

use std::time::Duration;

use tracing_subscriber::EnvFilter;
use volcache::Volume;
use volcache::derived::{Histogram, MinMax, VolumeHash};
use volcache::ram::{VolumeRam, VoxelData};

fn main() -> volcache::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let dims = [64, 64, 64];
    let data = (0..dims.iter().product::<usize>())
        .map(|i| ((i * 31) % 4096) as u16)
        .collect();
    let volume = Volume::new(VolumeRam::new(dims, VoxelData::U16(data))?);

    let (_, events) = volume.subscribe();
    volume.observe(|event| {
        println!("{:?} finished {} (value: {})", event.volume, event.key, event.item.is_some());
    });

    // Both start in the background and report through the observers.
    volume.get_non_blocking::<MinMax>();
    volume.get_non_blocking::<Histogram>();
    for _ in 0..2 {
        if events.recv_timeout(Duration::from_secs(30)).is_err() {
            break;
        }
    }

    if let Some(minmax) = volume.get_non_blocking::<MinMax>() {
        println!("range: {} ..= {}", minmax.min(), minmax.max());
    }

    if let Some(histogram) = volume.get_non_blocking::<Histogram>() {
        println!("fullest bucket: {} voxels", histogram.max_count());
    }

    // Blocks until the hash is there.
    if let Some(hash) = volume.get_blocking::<VolumeHash>() {
        println!("hash: {}", hash.to_hex());
    }

    println!("cached: {:?}", volume.derived_keys());
    Ok(())
}
