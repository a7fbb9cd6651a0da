use crate::engine::GridEngine;
use crate::error::{Error, Result};
use crate::volume::PhysicalVolume;

use glam::DVec3;
use scanvox_core::{GridClass, MetaValue, QuadMesh, TriangleMesh};

use std::path::Path;

/// Bridges canonical-order [`PhysicalVolume`]s and an engine's grids.
///
/// The engine stores fields in image order (last index axis = world x)
/// while arrays on this side are canonical (first axis = world x), so
/// every crossing in either direction swaps the first and last axes into
/// a fresh buffer. Engine failures come back wrapped in
/// [`Error::Engine`].
pub struct GridAdapter<E> {
    engine: E,
}

impl<E: GridEngine> GridAdapter<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    /// Builds a tagged sparse grid from a canonical-order volume.
    pub fn from_array(
        &self,
        volume: &PhysicalVolume,
        class: GridClass,
        name: &str,
        creator: &str,
        background: f32,
        tolerance: f32,
    ) -> Result<E::Grid> {
        let native = volume.swapped_axes();
        let shape = native.shape().map(|d| d as u32);
        let mut grid = self
            .engine
            .grid_from_dense(
                native.values(),
                shape,
                native.origin,
                native.spacing,
                background,
                tolerance,
            )
            .map_err(Error::engine)?;
        self.engine.set_grid_class(&mut grid, class);
        self.engine.set_name(&mut grid, name);
        self.engine.set_creator(&mut grid, creator);
        Ok(grid)
    }

    /// Builds a fog-volume grid: zero background, values pruned within
    /// `tolerance` of it.
    pub fn fog_volume_from_array(
        &self,
        volume: &PhysicalVolume,
        name: &str,
        creator: &str,
        tolerance: f32,
    ) -> Result<E::Grid> {
        self.from_array(volume, GridClass::FogVolume, name, creator, 0.0, tolerance)
    }

    /// Builds a level-set grid from an array of signed distances.
    /// `background` is the positive far-field distance.
    pub fn level_set_from_array(
        &self,
        volume: &PhysicalVolume,
        name: &str,
        creator: &str,
        background: f32,
    ) -> Result<E::Grid> {
        self.from_array(volume, GridClass::LevelSet, name, creator, background, 0.0)
    }

    /// Extracts a grid back into a canonical-order volume.
    ///
    /// The index-box shape and affine description come from the grid's
    /// metadata; entries that fail to decode fall back to the engine's own
    /// answer (shape) or an identity transform (origin/spacing) with a
    /// warning rather than aborting the extraction. A decodable `shape`
    /// entry that disagrees with the stored voxel count is an error.
    pub fn to_array(&self, grid: &E::Grid) -> Result<PhysicalVolume> {
        let (dense, engine_shape) = self.engine.grid_to_dense(grid);
        let metadata = self.engine.metadata(grid);

        let shape = decode_vector(metadata.get("shape").map(String::as_str), "shape")
            .map(|v| [v.x as usize, v.y as usize, v.z as usize])
            .unwrap_or_else(|| engine_shape.map(|d| d as usize));
        let origin = decode_vector(metadata.get("origin").map(String::as_str), "origin")
            .unwrap_or(DVec3::ZERO);
        let spacing = decode_vector(metadata.get("spacing").map(String::as_str), "spacing")
            .unwrap_or(DVec3::ONE);

        let native = PhysicalVolume::new(dense, &shape, origin, spacing)?;
        Ok(native.swapped_axes())
    }

    /// Derives the level-set grid of the `iso_value` surface of a fog
    /// volume. Requires a fog-volume grid; the result is tagged as a level
    /// set.
    pub fn fog_to_sdf(&self, grid: &E::Grid, iso_value: f32) -> Result<E::Grid> {
        let actual = self.engine.grid_class(grid);
        if actual != GridClass::FogVolume {
            return Err(Error::IllegalGridState {
                operation: "fog_to_sdf",
                expected: GridClass::FogVolume,
                actual,
            });
        }
        let mut sdf = self.engine.fog_to_sdf(grid, iso_value).map_err(Error::engine)?;
        self.engine.set_grid_class(&mut sdf, GridClass::LevelSet);
        Ok(sdf)
    }

    /// Point lookup by canonical-order index.
    pub fn probe(&self, grid: &E::Grid, index: [i32; 3]) -> f32 {
        self.engine
            .value_at(grid, [index[2], index[1], index[0]])
    }

    pub fn grid_class(&self, grid: &E::Grid) -> GridClass {
        self.engine.grid_class(grid)
    }

    pub fn grid_name(&self, grid: &E::Grid) -> String {
        self.engine.name(grid)
    }

    pub fn set_grid_name(&self, grid: &mut E::Grid, name: &str) {
        self.engine.set_name(grid, name);
    }

    pub fn insert_metadata(&self, grid: &mut E::Grid, key: &str, value: &str) {
        self.engine.insert_metadata(grid, key, value);
    }

    /// The grid's metadata decoded into typed values.
    pub fn metadata(&self, grid: &E::Grid) -> std::collections::BTreeMap<String, MetaValue> {
        scanvox_core::decode_metadata(&self.engine.metadata(grid))
    }

    /// Extracts the `iso_value` isosurface as a triangle mesh.
    pub fn volume_to_mesh(
        &self,
        grid: &E::Grid,
        iso_value: f32,
        adaptivity: f64,
    ) -> Result<TriangleMesh> {
        self.engine
            .mesh(grid, iso_value, adaptivity)
            .map_err(Error::engine)
    }

    /// Extracts the `iso_value` isosurface as a quad mesh.
    pub fn volume_to_quad_mesh(&self, grid: &E::Grid, iso_value: f32) -> Result<QuadMesh> {
        self.engine.quad_mesh(grid, iso_value).map_err(Error::engine)
    }

    /// Writes one or more grids into a single container file.
    pub fn write(&self, grids: &[&E::Grid], path: &Path) -> Result<()> {
        self.engine.write_grids(grids, path).map_err(Error::engine)
    }

    /// Single-grid convenience over [`write`](Self::write); produces a
    /// file identical to writing a one-element slice.
    pub fn write_grid(&self, grid: &E::Grid, path: &Path) -> Result<()> {
        self.write(&[grid], path)
    }

    /// Reads every grid from a container file, in stored order.
    pub fn read(&self, path: &Path) -> Result<Vec<E::Grid>> {
        self.engine.read_grids(path).map_err(Error::engine)
    }
}

impl<E: GridEngine + Default> Default for GridAdapter<E> {
    fn default() -> Self {
        Self::new(E::default())
    }
}

fn decode_vector(raw: Option<&str>, key: &str) -> Option<DVec3> {
    let decoded = raw.map(MetaValue::decode)?;
    match decoded.as_dvec3() {
        Some(v) => Some(v),
        None => {
            log::warn!("grid metadata `{key}` is not a 3-vector, using the default");
            None
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
    use crate::engine::SparseEngine;

    fn adapter() -> GridAdapter<SparseEngine> {
        GridAdapter::default()
    }

    fn ramp_volume(shape: [usize; 3]) -> PhysicalVolume {
        let len = shape.iter().product();
        PhysicalVolume::new(
            (0..len).map(|i| i as f32 / len as f32).collect(),
            &shape,
            DVec3::new(-4.0, 0.0, 4.0),
            DVec3::new(0.5, 1.0, 2.0),
        )
        .unwrap()
    }

    #[test]
    fn probe_matches_the_source_array() {
        let a = adapter();
        let volume = ramp_volume([4, 3, 2]);
        let grid = a
            .fog_volume_from_array(&volume, "fog_volume", "scanvox", 0.0)
            .unwrap();
        for i0 in 0..4 {
            for i1 in 0..3 {
                for i2 in 0..2 {
                    assert_eq!(
                        a.probe(&grid, [i0 as i32, i1 as i32, i2 as i32]),
                        volume.get([i0, i1, i2])
                    );
                }
            }
        }
    }

    #[test]
    fn to_array_inverts_from_array() {
        let a = adapter();
        let volume = ramp_volume([5, 4, 3]);
        let grid = a
            .fog_volume_from_array(&volume, "fog_volume", "scanvox", 0.0)
            .unwrap();
        let restored = a.to_array(&grid).unwrap();
        assert_eq!(restored.shape(), volume.shape());
        assert_eq!(restored.values(), volume.values());
        // The affine description survives through the metadata strings.
        assert_eq!(restored.origin, volume.origin);
        assert_eq!(restored.spacing, volume.spacing);
    }

    #[test]
    fn from_array_tags_the_grid() {
        let a = adapter();
        let grid = a
            .fog_volume_from_array(&ramp_volume([2, 2, 2]), "lungs", "scanvox", 0.0)
            .unwrap();
        assert_eq!(a.grid_class(&grid), GridClass::FogVolume);
        assert_eq!(a.grid_name(&grid), "lungs");
    }

    #[test]
    fn fog_to_sdf_requires_a_fog_volume() {
        let a = adapter();
        let volume = ramp_volume([4, 4, 4]);
        let level_set = a
            .level_set_from_array(&volume, "level_set", "scanvox", 3.0)
            .unwrap();
        let result = a.fog_to_sdf(&level_set, 0.5);
        assert!(matches!(
            result,
            Err(Error::IllegalGridState {
                operation: "fog_to_sdf",
                expected: GridClass::FogVolume,
                actual: GridClass::LevelSet,
            })
        ));
    }

    #[test]
    fn fog_to_sdf_tags_the_result_as_a_level_set() {
        let a = adapter();
        let shape = [16usize, 16, 16];
        let mut values = vec![0.0f32; 16 * 16 * 16];
        for i0 in 0..16 {
            for i1 in 0..16 {
                for i2 in 0..16 {
                    let d = ((i0 as f64 - 8.0).powi(2)
                        + (i1 as f64 - 8.0).powi(2)
                        + (i2 as f64 - 8.0).powi(2))
                    .sqrt();
                    if d < 5.0 {
                        values[(i0 * 16 + i1) * 16 + i2] = 1.0;
                    }
                }
            }
        }
        let volume = PhysicalVolume::new(values, &shape, DVec3::ZERO, DVec3::ONE).unwrap();
        let a2 = adapter();
        let fog = a2
            .fog_volume_from_array(&volume, "fog_volume", "scanvox", 0.0)
            .unwrap();
        let sdf = a.fog_to_sdf(&fog, 0.5).unwrap();
        assert_eq!(a.grid_class(&sdf), GridClass::LevelSet);
        // Inside is negative, outside positive.
        assert!(a.probe(&sdf, [8, 8, 8]) < 0.0);
        assert!(a.probe(&sdf, [0, 0, 0]) > 0.0);
    }

    #[test]
    fn garbage_transform_metadata_falls_back_to_identity() {
        let a = adapter();
        let volume = ramp_volume([3, 3, 3]);
        let mut grid = a
            .fog_volume_from_array(&volume, "fog_volume", "scanvox", 0.0)
            .unwrap();
        a.insert_metadata(&mut grid, "origin", "somewhere in the scanner");
        let restored = a.to_array(&grid).unwrap();
        assert_eq!(restored.origin, DVec3::ZERO);
        assert_eq!(restored.spacing, volume.spacing);
    }

    #[test]
    fn extraction_shape_comes_from_the_metadata() {
        let a = adapter();
        let volume = ramp_volume([3, 3, 3]);
        let mut grid = a
            .fog_volume_from_array(&volume, "fog_volume", "scanvox", 0.0)
            .unwrap();
        // A decodable shape that contradicts the stored voxel count must
        // surface, not be papered over by the engine's own answer.
        a.insert_metadata(&mut grid, "shape", "(8, 8, 8)");
        assert!(matches!(
            a.to_array(&grid),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn garbage_shape_metadata_falls_back_to_the_engine() {
        let a = adapter();
        let volume = ramp_volume([4, 3, 2]);
        let mut grid = a
            .fog_volume_from_array(&volume, "fog_volume", "scanvox", 0.0)
            .unwrap();
        a.insert_metadata(&mut grid, "shape", "unknown");
        let restored = a.to_array(&grid).unwrap();
        assert_eq!(restored.shape(), volume.shape());
        assert_eq!(restored.values(), volume.values());
    }

    #[test]
    fn typed_metadata_decodes_vectors_and_numbers() {
        let a = adapter();
        let mut grid = a
            .fog_volume_from_array(&ramp_volume([2, 2, 2]), "fog_volume", "scanvox", 0.0)
            .unwrap();
        a.insert_metadata(&mut grid, "iso_value", "1500");
        let meta = a.metadata(&grid);
        assert_eq!(meta["iso_value"].as_number(), Some(1500.0));
        assert_eq!(
            meta["origin"].as_dvec3(),
            Some(DVec3::new(-4.0, 0.0, 4.0))
        );
    }
}
