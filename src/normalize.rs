use crate::error::{Error, Result};
use crate::volume::PhysicalVolume;

use serde::{Deserialize, Serialize};

/// Clamp bounds for intensity normalization, in raw value units.
///
/// The defaults are the no-clamp sentinels: with both bounds unset the
/// effective range degenerates to the data's own observed range, which is
/// only an error when the data itself is constant.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub struct Thresholds {
    pub min: f64,
    pub max: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }
}

impl Thresholds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Rescales raw intensities into a clamped unit-interval density field.
///
/// The effective range is the caller's thresholds intersected with the
/// observed value range; each value maps through
/// `(v - min) / (max - min)` and is then clamped into `[0, 1]`. An
/// effective range of zero width fails with
/// [`Error::DegenerateRange`] instead of silently producing non-finite
/// values.
pub fn normalize(volume: &PhysicalVolume, thresholds: Thresholds) -> Result<PhysicalVolume> {
    let (observed_min, observed_max) = volume.value_range();
    let min = thresholds.min.max(observed_min);
    let max = thresholds.max.min(observed_max);
    let width = max - min;
    if !(width > 0.0) {
        return Err(Error::DegenerateRange { min, max });
    }

    let mut normalized = volume.clone();
    for value in normalized.values_mut() {
        let v = ((*value as f64 - min) / width).clamp(0.0, 1.0);
        *value = v as f32;
    }

    log::debug!(
        "normalized {} values over effective range [{}, {}]",
        normalized.len(),
        min,
        max
    );

    Ok(normalized)
}

/// Rescales an isovalue expressed in raw units through the identical
/// `(iso - min) / (max - min)` transform, without clamping.
///
/// Must be called with the same thresholds that [`normalize`] was given
/// for the run, or surfaces extracted later will not correspond to the
/// physically intended level. Requires finite bounds.
pub fn rescale_isovalue(iso_value: f64, thresholds: Thresholds) -> Result<f64> {
    let width = thresholds.max - thresholds.min;
    if !width.is_finite() || !(width > 0.0) {
        return Err(Error::DegenerateRange {
            min: thresholds.min,
            max: thresholds.max,
        });
    }
    Ok((iso_value - thresholds.min) / width)
}
