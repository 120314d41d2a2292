//! An in-memory voxel representation.

use crate::error::{Error, Result};

/// Voxel values in one of the supported formats.
#[derive(Debug, Clone, PartialEq)]
pub enum VoxelData {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32(Vec<f32>),
}

impl VoxelData {
    /// The number of voxels.
    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::F32(v) => v.len(),
        }
    }

    /// Whether there are no voxels.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The format name.
    pub fn format(&self) -> &'static str {
        match self {
            Self::U8(_) => "uint8",
            Self::U16(_) => "uint16",
            Self::F32(_) => "float",
        }
    }

    /// The raw value of voxel `i`.
    pub fn raw(&self, i: usize) -> f32 {
        match self {
            Self::U8(v) => v[i] as f32,
            Self::U16(v) => v[i] as f32,
            Self::F32(v) => v[i],
        }
    }

    /// The value of voxel `i` mapped to `[0, 1]` for integer formats.
    /// Floats are passed through.
    pub fn normalized(&self, i: usize) -> f32 {
        match self {
            Self::U8(v) => v[i] as f32 / u8::MAX as f32,
            Self::U16(v) => v[i] as f32 / u16::MAX as f32,
            Self::F32(v) => v[i],
        }
    }
}

/// A dense volume held in main memory.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeRam {
    dimensions: [usize; 3],
    data: VoxelData,
}

impl VolumeRam {
    /// Create a volume, checking that the buffer matches the dimensions.
    pub fn new(dimensions: [usize; 3], data: VoxelData) -> Result<Self> {
        let expected = voxel_count(dimensions)?;
        if data.len() != expected {
            return Err(Error::Dimensions { dimensions, expected, actual: data.len() });
        }
        Ok(Self { dimensions, data })
    }

    /// A zero-filled 8-bit volume.
    pub fn zeroed(dimensions: [usize; 3]) -> Result<Self> {
        let len = voxel_count(dimensions)?;
        Ok(Self { dimensions, data: VoxelData::U8(vec![0; len]) })
    }

    /// The extent along x, y and z.
    pub fn dimensions(&self) -> [usize; 3] {
        self.dimensions
    }

    /// The voxel values.
    pub fn data(&self) -> &VoxelData {
        &self.data
    }

    /// The number of voxels.
    pub fn num_voxels(&self) -> usize {
        self.data.len()
    }
}

fn voxel_count(dimensions: [usize; 3]) -> Result<usize> {
    let [x, y, z] = dimensions;
    x.checked_mul(y)
        .and_then(|xy| xy.checked_mul(z))
        .ok_or(Error::Overflow(dimensions))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch() {
        let err = VolumeRam::new([2, 2, 2], VoxelData::U8(vec![0; 7])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "voxel buffer holds 7 values, but dimensions [2, 2, 2] need 8",
        );
    }

    #[test]
    fn test_overflow() {
        let err = VolumeRam::zeroed([usize::MAX, 2, 1]).unwrap_err();
        assert!(matches!(err, Error::Overflow(_)));
    }

    #[test]
    fn test_normalized() {
        let volume = VolumeRam::new([3, 1, 1], VoxelData::U16(vec![0, 65535, 13107])).unwrap();
        assert_eq!(volume.data().format(), "uint16");
        assert_eq!(volume.data().normalized(0), 0.0);
        assert_eq!(volume.data().normalized(1), 1.0);
        assert!((volume.data().normalized(2) - 0.2).abs() < 1e-6);
        assert_eq!(volume.data().raw(2), 13107.0);
    }

    #[test]
    fn test_empty() {
        let volume = VolumeRam::zeroed([4, 0, 3]).unwrap();
        assert_eq!(volume.num_voxels(), 0);
        assert!(volume.data().is_empty());
    }
}
