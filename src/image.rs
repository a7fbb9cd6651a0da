use crate::error::{Error, Result};
use crate::volume::PhysicalVolume;

use glam::DVec3;

/// A decoded scan image: a dense buffer in the source's *native* index
/// order (slowest-varying axis first, world x fastest) plus its affine
/// description.
///
/// File decoding/encoding lives in [`crate::io`]; this type is only the
/// in-memory boundary between an image library and the pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanImage {
    /// Native-order dimensions; rank 1 to 3.
    pub dims: Vec<usize>,
    pub origin: DVec3,
    pub spacing: DVec3,
    /// C-order values over `dims`, already cast to `f32`.
    pub data: Vec<f32>,
}

/// Converts a decoded image to a canonical-order [`PhysicalVolume`].
///
/// Rank-3 images have their first and last axes swapped into canonical
/// order and are copied to a fresh buffer, so later in-place edits can
/// never corrupt a shared source view. Lower ranks carry no depth axis to
/// reconcile and are only padded. More than 3 dimensions is an error.
pub fn decode_physical_volume(image: &ScanImage) -> Result<PhysicalVolume> {
    if image.dims.len() > 3 {
        return Err(Error::UnsupportedRank {
            rank: image.dims.len(),
        });
    }
    let volume = PhysicalVolume::new(
        image.data.clone(),
        &image.dims,
        image.origin,
        image.spacing,
    )?;
    if image.dims.len() == 3 {
        Ok(volume.swapped_axes())
    } else {
        Ok(volume)
    }
}

/// Inverse of [`decode_physical_volume`]: swaps the canonical volume back
/// to native order and carries the affine description onto the image.
pub fn encode_physical_volume(volume: &PhysicalVolume) -> ScanImage {
    let native = volume.swapped_axes();
    ScanImage {
        dims: native.shape().to_vec(),
        origin: native.origin,
        spacing: native.spacing,
        data: native.values().to_vec(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use approx::assert_relative_eq;

    fn test_image() -> ScanImage {
        // Native order (z, y, x): 2 slices of 3x4.
        ScanImage {
            dims: vec![2, 3, 4],
            origin: DVec3::new(-10.0, -20.0, -30.0),
            spacing: DVec3::new(0.5, 0.5, 2.0),
            data: (0..24).map(|i| i as f32).collect(),
        }
    }

    #[test]
    fn decode_swaps_into_canonical_order() {
        let volume = decode_physical_volume(&test_image()).unwrap();
        assert_eq!(volume.shape(), [4, 3, 2]);
        // Native (z=1, y=2, x=3) lands at canonical (x=3, y=2, z=1).
        assert_eq!(volume.get([3, 2, 1]), 23.0);
        assert_eq!(volume.get([0, 0, 1]), 12.0);
        assert_eq!(volume.origin, DVec3::new(-10.0, -20.0, -30.0));
    }

    #[test]
    fn low_rank_images_are_padded_not_swapped() {
        let image = ScanImage {
            dims: vec![5],
            origin: DVec3::ZERO,
            spacing: DVec3::ONE,
            data: (0..5).map(|i| i as f32).collect(),
        };
        let volume = decode_physical_volume(&image).unwrap();
        assert_eq!(volume.shape(), [5, 1, 1]);
        assert_eq!(volume.get([3, 0, 0]), 3.0);
    }

    #[test]
    fn rank_4_fails() {
        let image = ScanImage {
            dims: vec![2, 2, 2, 2],
            origin: DVec3::ZERO,
            spacing: DVec3::ONE,
            data: vec![0.0; 16],
        };
        assert!(matches!(
            decode_physical_volume(&image),
            Err(Error::UnsupportedRank { rank: 4 })
        ));
    }

    #[test]
    fn encode_then_decode_is_identity() {
        let volume = decode_physical_volume(&test_image()).unwrap();
        let round_tripped = decode_physical_volume(&encode_physical_volume(&volume)).unwrap();
        assert_eq!(round_tripped.shape(), volume.shape());
        assert_eq!(round_tripped.origin, volume.origin);
        assert_eq!(round_tripped.spacing, volume.spacing);
        for (a, b) in round_tripped.values().iter().zip(volume.values()) {
            assert_relative_eq!(a, b);
        }
    }
}
