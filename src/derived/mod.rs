//! Reference derived data over [`VolumeRam`](crate::ram::VolumeRam).

mod hash;
mod histogram;
mod minmax;

pub use self::hash::{VolumeHash, VolumeHashStrategy};
pub use self::histogram::{Histogram, HistogramStrategy};
pub use self::minmax::{MinMax, MinMaxStrategy};

/// How many voxels are scanned between two interrupt checks.
const CHUNK: usize = 1 << 16;

/// Visit every voxel index, checking for interruption once per chunk.
///
/// Returns `None` if interrupted.
fn scan(
    len: usize,
    interrupt: &crate::Interrupt,
    mut f: impl FnMut(usize),
) -> Option<()> {
    for start in (0..len).step_by(CHUNK) {
        interrupt.check()?;
        (start..len.min(start + CHUNK)).for_each(&mut f);
    }
    interrupt.check()
}
