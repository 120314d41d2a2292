use std::hash::Hasher;

use siphasher::sip128::{Hasher128, SipHasher13};

use crate::ram::{VolumeRam, VoxelData};
use crate::{ComputationStrategy, DataKey, Derive, DerivedData, Interrupt};

/// A 128-bit fingerprint of a volume's dimensions, format and voxels.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VolumeHash(u128);

impl VolumeHash {
    pub fn new(hash: u128) -> Self {
        Self(hash)
    }

    pub fn get(&self) -> u128 {
        self.0
    }

    /// The hash as 32 lowercase hex digits.
    pub fn to_hex(&self) -> String {
        format!("{:032x}", self.0)
    }
}

impl DerivedData for VolumeHash {
    const KEY: DataKey = DataKey::new("hash");
}

impl Derive<VolumeRam> for VolumeHash {
    type Strategy = VolumeHashStrategy;
}

/// Hashes the raw voxel bytes with SipHash-1-3.
#[derive(Debug, Default, Copy, Clone)]
pub struct VolumeHashStrategy;

impl ComputationStrategy<VolumeRam> for VolumeHashStrategy {
    type Output = VolumeHash;

    fn create_from(&self, volume: &VolumeRam, interrupt: &Interrupt) -> Option<VolumeHash> {
        let mut state = SipHasher13::new();
        for extent in volume.dimensions() {
            state.write_u64(extent as u64);
        }

        let data = volume.data();
        state.write(data.format().as_bytes());
        match data {
            VoxelData::U8(v) => super::scan(v.len(), interrupt, |i| state.write_u8(v[i]))?,
            VoxelData::U16(v) => super::scan(v.len(), interrupt, |i| {
                state.write(&v[i].to_le_bytes())
            })?,
            VoxelData::F32(v) => super::scan(v.len(), interrupt, |i| {
                state.write(&v[i].to_bits().to_le_bytes())
            })?,
        }

        Some(VolumeHash(state.finish128().as_u128()))
    }
}
