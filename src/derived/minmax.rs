use crate::ram::VolumeRam;
use crate::{ComputationStrategy, DataKey, Derive, DerivedData, Interrupt};

/// The smallest and largest voxel value of a volume.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MinMax {
    min: f32,
    max: f32,
    min_normalized: f32,
    max_normalized: f32,
}

impl MinMax {
    /// Create from raw and normalized extrema.
    pub fn new(min: f32, max: f32, min_normalized: f32, max_normalized: f32) -> Self {
        Self { min, max, min_normalized, max_normalized }
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn min_normalized(&self) -> f32 {
        self.min_normalized
    }

    pub fn max_normalized(&self) -> f32 {
        self.max_normalized
    }
}

impl DerivedData for MinMax {
    const KEY: DataKey = DataKey::new("min-max");
}

impl Derive<VolumeRam> for MinMax {
    type Strategy = MinMaxStrategy;
}

/// Scans all voxels. Does not apply to volumes without any non-NaN voxel.
#[derive(Debug, Default, Copy, Clone)]
pub struct MinMaxStrategy;

impl ComputationStrategy<VolumeRam> for MinMaxStrategy {
    type Output = MinMax;

    fn create_from(&self, volume: &VolumeRam, interrupt: &Interrupt) -> Option<MinMax> {
        let data = volume.data();
        let mut extrema: Option<(usize, usize)> = None;

        super::scan(data.len(), interrupt, |i| {
            let v = data.raw(i);
            if v.is_nan() {
                return;
            }
            extrema = Some(match extrema {
                None => (i, i),
                Some((lo, hi)) => (
                    if v < data.raw(lo) { i } else { lo },
                    if v > data.raw(hi) { i } else { hi },
                ),
            });
        })?;

        let (lo, hi) = extrema?;
        Some(MinMax::new(data.raw(lo), data.raw(hi), data.normalized(lo), data.normalized(hi)))
    }
}
