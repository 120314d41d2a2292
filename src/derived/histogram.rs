use crate::ram::VolumeRam;
use crate::{ComputationStrategy, DataKey, Derive, DerivedData, Interrupt};

/// Voxel counts over normalized intensity.
///
/// Bucket `i` of `n` covers `[i / n, (i + 1) / n)`; the last bucket also
/// contains `1.0`. Values outside `[0, 1]` are clamped into the outer
/// buckets, NaNs are skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    buckets: Vec<u64>,
}

impl Histogram {
    /// The number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// The count of bucket `i`.
    pub fn get(&self, i: usize) -> u64 {
        self.buckets[i]
    }

    /// All bucket counts.
    pub fn buckets(&self) -> &[u64] {
        &self.buckets
    }

    /// The number of counted voxels.
    pub fn total(&self) -> u64 {
        self.buckets.iter().sum()
    }

    /// The largest bucket count.
    pub fn max_count(&self) -> u64 {
        self.buckets.iter().copied().max().unwrap_or(0)
    }

    fn bucket(&self, v: f32) -> usize {
        let n = self.buckets.len();
        ((v.clamp(0.0, 1.0) * n as f32) as usize).min(n - 1)
    }
}

impl DerivedData for Histogram {
    const KEY: DataKey = DataKey::new("histogram");
}

impl Derive<VolumeRam> for Histogram {
    type Strategy = HistogramStrategy;
}

/// Bins normalized voxel intensities. Zero buckets do not apply.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HistogramStrategy {
    pub buckets: usize,
}

impl HistogramStrategy {
    pub fn new(buckets: usize) -> Self {
        Self { buckets }
    }
}

impl Default for HistogramStrategy {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ComputationStrategy<VolumeRam> for HistogramStrategy {
    type Output = Histogram;

    fn create_from(&self, volume: &VolumeRam, interrupt: &Interrupt) -> Option<Histogram> {
        if self.buckets == 0 {
            return None;
        }

        let data = volume.data();
        let mut histogram = Histogram { buckets: vec![0; self.buckets] };
        super::scan(data.len(), interrupt, |i| {
            let v = data.normalized(i);
            if !v.is_nan() {
                let b = histogram.bucket(v);
                histogram.buckets[b] += 1;
            }
        })?;

        Some(histogram)
    }
}
