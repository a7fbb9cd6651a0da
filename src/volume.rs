use crate::error::{Error, Result};

use float_ord::FloatOrd;
use glam::DVec3;

/// A dense scalar field in canonical axis order, positioned in physical
/// space by an affine description.
///
/// The shape always has exactly rank 3: lower-rank sources are padded by
/// appending size-1 axes on the right, and rank > 3 is rejected. The
/// canonical order is the reverse of a grid's native index order, so
/// conversions in either direction swap the first and last axes (see
/// [`swapped_axes`](Self::swapped_axes)).
#[derive(Clone, Debug, PartialEq)]
pub struct PhysicalVolume {
    values: Vec<f32>,
    shape: [usize; 3],
    /// Physical-space position of index `(0, 0, 0)`.
    pub origin: DVec3,
    /// Physical distance per unit index step, per world axis.
    pub spacing: DVec3,
}

impl PhysicalVolume {
    /// Builds a volume from a C-order buffer of any rank up to 3.
    pub fn new(values: Vec<f32>, shape: &[usize], origin: DVec3, spacing: DVec3) -> Result<Self> {
        if shape.len() > 3 {
            return Err(Error::UnsupportedRank { rank: shape.len() });
        }
        let mut padded = [1usize; 3];
        padded[..shape.len()].copy_from_slice(shape);

        let expected = padded.iter().product::<usize>();
        if values.len() != expected {
            return Err(Error::ShapeMismatch {
                len: values.len(),
                shape: padded,
                expected,
            });
        }

        Ok(Self {
            values,
            shape: padded,
            origin,
            spacing,
        })
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: [usize; 3]) -> f32 {
        let [_, s1, s2] = self.shape;
        self.values[(index[0] * s1 + index[1]) * s2 + index[2]]
    }

    /// The observed `(min, max)` of the stored values.
    pub fn value_range(&self) -> (f64, f64) {
        let min = self.values.iter().copied().map(FloatOrd).min();
        let max = self.values.iter().copied().map(FloatOrd).max();
        match (min, max) {
            (Some(FloatOrd(min)), Some(FloatOrd(max))) => (min as f64, max as f64),
            _ => (f64::INFINITY, f64::NEG_INFINITY),
        }
    }

    /// A fresh, contiguous copy with the first and last axes exchanged.
    ///
    /// The result never aliases `self`, so in-place edits downstream
    /// cannot corrupt the source buffer. Origin and spacing keep their
    /// world-axis component order.
    pub fn swapped_axes(&self) -> Self {
        let [s0, s1, s2] = self.shape;
        let mut swapped = vec![0.0f32; self.values.len()];
        for i0 in 0..s0 {
            for i1 in 0..s1 {
                for i2 in 0..s2 {
                    swapped[(i2 * s1 + i1) * s0 + i0] = self.values[(i0 * s1 + i1) * s2 + i2];
                }
            }
        }
        Self {
            values: swapped,
            shape: [s2, s1, s0],
            origin: self.origin,
            spacing: self.spacing,
        }
    }
}
