use crate::error::GridError;

use ahash::AHashMap;
use glam::{DVec3, IVec3};
use ndshape::{ConstPow2Shape3u32, ConstShape};
use scanvox_core::{encode_dvec3, GridClass};
use static_assertions::const_assert_eq;

use std::collections::BTreeMap;

/// The 3D array shape of one chunk of storage.
pub type ChunkShape = ConstPow2Shape3u32<3, 3, 3>;
pub const CHUNK_EDGE: i32 = 8;
pub const CHUNK_SIZE: usize = ChunkShape::SIZE as usize;
const_assert_eq!(CHUNK_SIZE, 8 * 8 * 8);

type ChunkValues = Box<[f32; CHUNK_SIZE]>;

/// A sparse scalar field over a bounded index box.
///
/// Voxels live in 8³ chunks keyed by chunk coordinates; chunks whose values
/// all equal the grid's background are not allocated, and reads there
/// return the background. Index axes are image-ordered: the *last* index
/// axis maps to world x, so a voxel's world position is
/// `origin + spacing ∘ (i2, i1, i0)`.
///
/// Grids carry a semantic [`GridClass`], free-form `name`/`creator` tags,
/// and a string-typed metadata map. `origin`, `spacing`, and `shape` are
/// mirrored into the metadata at construction so they survive any
/// container format that only round-trips strings.
pub struct SparseGrid {
    shape: [u32; 3],
    origin: DVec3,
    spacing: DVec3,
    background: f32,
    class: GridClass,
    name: String,
    creator: String,
    metadata: BTreeMap<String, String>,
    chunks: AHashMap<IVec3, ChunkValues>,
}

impl SparseGrid {
    /// Builds a grid from a dense C-order buffer (last index axis fastest).
    ///
    /// Values within `tolerance` of `background` collapse to the
    /// background and are not stored.
    pub fn from_dense(
        values: &[f32],
        shape: [u32; 3],
        origin: DVec3,
        spacing: DVec3,
        background: f32,
        tolerance: f32,
    ) -> Result<Self, GridError> {
        let expected = shape.iter().map(|&d| d as usize).product::<usize>();
        if values.len() != expected {
            return Err(GridError::ShapeMismatch {
                len: values.len(),
                shape,
                expected,
            });
        }
        if expected == 0 {
            return Err(GridError::EmptyGrid);
        }

        let mut grid = Self {
            shape,
            origin,
            spacing,
            background,
            class: GridClass::Unknown,
            name: String::new(),
            creator: String::new(),
            metadata: BTreeMap::new(),
            chunks: AHashMap::new(),
        };
        grid.insert_metadata("origin", &encode_dvec3(origin));
        grid.insert_metadata("spacing", &encode_dvec3(spacing));
        grid.insert_metadata("shape", &format!("({}, {}, {})", shape[0], shape[1], shape[2]));

        let [_, s1, s2] = shape;
        let mut linear = 0;
        for i0 in 0..shape[0] as i32 {
            for i1 in 0..s1 as i32 {
                for i2 in 0..s2 as i32 {
                    let value = values[linear];
                    linear += 1;
                    if (value - background).abs() > tolerance {
                        grid.insert_value([i0, i1, i2], value);
                    }
                }
            }
        }

        log::debug!(
            "built {:?} grid, {} active voxels of {}",
            shape,
            grid.active_voxel_count(),
            expected
        );

        Ok(grid)
    }

    /// Extracts the grid into a dense C-order buffer over its index box.
    pub fn to_dense(&self) -> Vec<f32> {
        let [s0, s1, s2] = self.shape.map(|d| d as usize);
        let mut dense = vec![self.background; s0 * s1 * s2];
        for (&chunk_coords, chunk) in self.chunks.iter() {
            let min = chunk_coords * CHUNK_EDGE;
            for local in 0..CHUNK_SIZE as u32 {
                let [l0, l1, l2] = ChunkShape::delinearize(local);
                let i0 = min.x as usize + l0 as usize;
                let i1 = min.y as usize + l1 as usize;
                let i2 = min.z as usize + l2 as usize;
                if i0 < s0 && i1 < s1 && i2 < s2 {
                    dense[(i0 * s1 + i1) * s2 + i2] = chunk[local as usize];
                }
            }
        }
        dense
    }

    /// Point lookup by index. Out-of-box and unallocated positions read as
    /// the background value.
    pub fn get(&self, index: [i32; 3]) -> f32 {
        let [i0, i1, i2] = index;
        if i0 < 0
            || i1 < 0
            || i2 < 0
            || i0 >= self.shape[0] as i32
            || i1 >= self.shape[1] as i32
            || i2 >= self.shape[2] as i32
        {
            return self.background;
        }
        let chunk_coords = IVec3::new(i0, i1, i2).div_euclid(IVec3::splat(CHUNK_EDGE));
        match self.chunks.get(&chunk_coords) {
            Some(chunk) => {
                let local = [
                    (i0 % CHUNK_EDGE) as u32,
                    (i1 % CHUNK_EDGE) as u32,
                    (i2 % CHUNK_EDGE) as u32,
                ];
                chunk[ChunkShape::linearize(local) as usize]
            }
            None => self.background,
        }
    }

    pub(crate) fn insert_value(&mut self, index: [i32; 3], value: f32) {
        let [i0, i1, i2] = index;
        let chunk_coords = IVec3::new(i0, i1, i2).div_euclid(IVec3::splat(CHUNK_EDGE));
        let background = self.background;
        let chunk = self
            .chunks
            .entry(chunk_coords)
            .or_insert_with(|| Box::new([background; CHUNK_SIZE]));
        let local = [
            (i0 % CHUNK_EDGE) as u32,
            (i1 % CHUNK_EDGE) as u32,
            (i2 % CHUNK_EDGE) as u32,
        ];
        chunk[ChunkShape::linearize(local) as usize] = value;
    }

    /// Maps (possibly fractional) index-space coordinates to world space.
    pub fn index_to_world(&self, index: DVec3) -> DVec3 {
        self.origin + self.spacing * DVec3::new(index.z, index.y, index.x)
    }

    pub fn shape(&self) -> [u32; 3] {
        self.shape
    }

    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    pub fn spacing(&self) -> DVec3 {
        self.spacing
    }

    pub fn background(&self) -> f32 {
        self.background
    }

    pub fn grid_class(&self) -> GridClass {
        self.class
    }

    pub fn set_grid_class(&mut self, class: GridClass) {
        self.class = class;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_owned();
    }

    pub fn creator(&self) -> &str {
        &self.creator
    }

    pub fn set_creator(&mut self, creator: &str) {
        self.creator = creator.to_owned();
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn insert_metadata(&mut self, key: &str, value: &str) {
        self.metadata.insert(key.to_owned(), value.to_owned());
    }

    /// The number of stored voxels that differ from the background.
    pub fn active_voxel_count(&self) -> usize {
        self.chunks
            .values()
            .flat_map(|chunk| chunk.iter())
            .filter(|&&v| v != self.background)
            .count()
    }

    pub(crate) fn chunks(&self) -> &AHashMap<IVec3, ChunkValues> {
        &self.chunks
    }

    pub(crate) fn from_parts(
        shape: [u32; 3],
        origin: DVec3,
        spacing: DVec3,
        background: f32,
        class: GridClass,
        name: String,
        creator: String,
        metadata: BTreeMap<String, String>,
        chunks: AHashMap<IVec3, ChunkValues>,
    ) -> Self {
        Self {
            shape,
            origin,
            spacing,
            background,
            class,
            name,
            creator,
            metadata,
            chunks,
        }
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝

#[cfg(test)]
mod test {
    use super::*;

    fn dense_ramp(shape: [u32; 3]) -> Vec<f32> {
        let len = shape.iter().map(|&d| d as usize).product();
        (0..len).map(|i| i as f32).collect()
    }

    #[test]
    fn dense_round_trip() {
        let shape = [9, 5, 17];
        let dense = dense_ramp(shape);
        let grid = SparseGrid::from_dense(
            &dense,
            shape,
            DVec3::ZERO,
            DVec3::ONE,
            -1.0,
            0.0,
        )
        .unwrap();
        assert_eq!(grid.to_dense(), dense);
    }

    #[test]
    fn get_matches_dense_layout() {
        let shape = [4, 3, 2];
        let dense = dense_ramp(shape);
        let grid =
            SparseGrid::from_dense(&dense, shape, DVec3::ZERO, DVec3::ONE, -1.0, 0.0).unwrap();
        // Last index axis is fastest.
        assert_eq!(grid.get([0, 0, 1]), 1.0);
        assert_eq!(grid.get([0, 1, 0]), 2.0);
        assert_eq!(grid.get([1, 0, 0]), 6.0);
    }

    #[test]
    fn out_of_box_reads_background() {
        let grid = SparseGrid::from_dense(
            &[1.0; 8],
            [2, 2, 2],
            DVec3::ZERO,
            DVec3::ONE,
            0.5,
            0.0,
        )
        .unwrap();
        assert_eq!(grid.get([-1, 0, 0]), 0.5);
        assert_eq!(grid.get([0, 0, 2]), 0.5);
        assert_eq!(grid.get([100, 100, 100]), 0.5);
    }

    #[test]
    fn tolerance_prunes_near_background_values() {
        let mut dense = vec![0.0f32; 16 * 16 * 16];
        dense[0] = 0.005;
        dense[100] = 0.8;
        let grid = SparseGrid::from_dense(
            &dense,
            [16, 16, 16],
            DVec3::ZERO,
            DVec3::ONE,
            0.0,
            0.01,
        )
        .unwrap();
        assert_eq!(grid.active_voxel_count(), 1);
        assert_eq!(grid.get([0, 0, 0]), 0.0);
        // Only one chunk holds a surviving value; the rest are unallocated.
        assert_eq!(grid.chunks().len(), 1);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let result =
            SparseGrid::from_dense(&[0.0; 7], [2, 2, 2], DVec3::ZERO, DVec3::ONE, 0.0, 0.0);
        assert!(matches!(result, Err(GridError::ShapeMismatch { .. })));
    }

    #[test]
    fn construction_records_transform_metadata() {
        let origin = DVec3::new(1.0, 2.0, 3.0);
        let spacing = DVec3::new(0.5, 0.5, 2.0);
        let grid =
            SparseGrid::from_dense(&[1.0; 8], [2, 2, 2], origin, spacing, 0.0, 0.0).unwrap();
        assert_eq!(grid.metadata()["origin"], "(1, 2, 3)");
        assert_eq!(grid.metadata()["spacing"], "(0.5, 0.5, 2)");
        assert_eq!(grid.metadata()["shape"], "(2, 2, 2)");
    }

    #[test]
    fn world_mapping_reverses_index_axes() {
        let grid = SparseGrid::from_dense(
            &[1.0; 8],
            [2, 2, 2],
            DVec3::new(10.0, 20.0, 30.0),
            DVec3::new(1.0, 2.0, 4.0),
            0.0,
            0.0,
        )
        .unwrap();
        // Index axis 2 advances world x.
        let p = grid.index_to_world(DVec3::new(0.0, 0.0, 1.0));
        assert_eq!(p, DVec3::new(11.0, 20.0, 30.0));
        let p = grid.index_to_world(DVec3::new(1.0, 0.0, 0.0));
        assert_eq!(p, DVec3::new(10.0, 20.0, 34.0));
    }
}
