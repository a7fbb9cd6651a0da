use glam::DVec3;
use scanvox_core::{GridClass, QuadMesh, TriangleMesh};

use std::collections::BTreeMap;
use std::path::Path;

/// The capabilities the pipeline needs from a sparse grid backend.
///
/// Grids are opaque to the caller; everything the pipeline knows about
/// them flows through this trait, so a different engine can be swapped in
/// without touching the conversion logic. Engine failures surface as the
/// engine's own error type and are wrapped opaquely by the caller.
pub trait GridEngine {
    type Grid;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Builds a sparse grid from a dense C-order buffer in the engine's
    /// native index order (last index axis fastest). Values within
    /// `tolerance` of `background` are not stored.
    #[allow(clippy::too_many_arguments)]
    fn grid_from_dense(
        &self,
        values: &[f32],
        shape: [u32; 3],
        origin: DVec3,
        spacing: DVec3,
        background: f32,
        tolerance: f32,
    ) -> Result<Self::Grid, Self::Error>;

    /// Extracts a grid into a dense C-order buffer over its index box,
    /// returning the buffer and its native-order shape.
    fn grid_to_dense(&self, grid: &Self::Grid) -> (Vec<f32>, [u32; 3]);

    /// Point lookup by native-order index; out-of-box positions read as
    /// the grid's background.
    fn value_at(&self, grid: &Self::Grid, index: [i32; 3]) -> f32;

    fn grid_class(&self, grid: &Self::Grid) -> GridClass;

    fn set_grid_class(&self, grid: &mut Self::Grid, class: GridClass);

    fn name(&self, grid: &Self::Grid) -> String;

    fn set_name(&self, grid: &mut Self::Grid, name: &str);

    fn set_creator(&self, grid: &mut Self::Grid, creator: &str);

    fn metadata(&self, grid: &Self::Grid) -> BTreeMap<String, String>;

    fn insert_metadata(&self, grid: &mut Self::Grid, key: &str, value: &str);

    /// Derives a signed-distance grid from a density grid at `iso_value`.
    /// Class tagging is the caller's job.
    fn fog_to_sdf(&self, grid: &Self::Grid, iso_value: f32) -> Result<Self::Grid, Self::Error>;

    /// Extracts the `iso_value` isosurface as a quad mesh in world space.
    fn quad_mesh(&self, grid: &Self::Grid, iso_value: f32) -> Result<QuadMesh, Self::Error>;

    /// Extracts the `iso_value` isosurface as a triangle mesh, optionally
    /// simplified by `adaptivity` in `[0, 1]`.
    fn mesh(
        &self,
        grid: &Self::Grid,
        iso_value: f32,
        adaptivity: f64,
    ) -> Result<TriangleMesh, Self::Error>;

    /// Writes any number of grids into one container file.
    fn write_grids(&self, grids: &[&Self::Grid], path: &Path) -> Result<(), Self::Error>;

    /// Reads every grid from a container file, in stored order.
    fn read_grids(&self, path: &Path) -> Result<Vec<Self::Grid>, Self::Error>;
}

/// The in-tree chunked-grid backend.
#[derive(Clone, Copy, Debug, Default)]
pub struct SparseEngine;

impl GridEngine for SparseEngine {
    type Grid = scanvox_grid::SparseGrid;
    type Error = scanvox_grid::GridError;

    fn grid_from_dense(
        &self,
        values: &[f32],
        shape: [u32; 3],
        origin: DVec3,
        spacing: DVec3,
        background: f32,
        tolerance: f32,
    ) -> Result<Self::Grid, Self::Error> {
        scanvox_grid::SparseGrid::from_dense(values, shape, origin, spacing, background, tolerance)
    }

    fn grid_to_dense(&self, grid: &Self::Grid) -> (Vec<f32>, [u32; 3]) {
        (grid.to_dense(), grid.shape())
    }

    fn value_at(&self, grid: &Self::Grid, index: [i32; 3]) -> f32 {
        grid.get(index)
    }

    fn grid_class(&self, grid: &Self::Grid) -> GridClass {
        grid.grid_class()
    }

    fn set_grid_class(&self, grid: &mut Self::Grid, class: GridClass) {
        grid.set_grid_class(class);
    }

    fn name(&self, grid: &Self::Grid) -> String {
        grid.name().to_owned()
    }

    fn set_name(&self, grid: &mut Self::Grid, name: &str) {
        grid.set_name(name);
    }

    fn set_creator(&self, grid: &mut Self::Grid, creator: &str) {
        grid.set_creator(creator);
    }

    fn metadata(&self, grid: &Self::Grid) -> BTreeMap<String, String> {
        grid.metadata().clone()
    }

    fn insert_metadata(&self, grid: &mut Self::Grid, key: &str, value: &str) {
        grid.insert_metadata(key, value);
    }

    fn fog_to_sdf(&self, grid: &Self::Grid, iso_value: f32) -> Result<Self::Grid, Self::Error> {
        scanvox_grid::fog_to_sdf(grid, iso_value)
    }

    fn quad_mesh(&self, grid: &Self::Grid, iso_value: f32) -> Result<QuadMesh, Self::Error> {
        scanvox_grid::volume_to_quad_mesh(grid, iso_value)
    }

    fn mesh(
        &self,
        grid: &Self::Grid,
        iso_value: f32,
        adaptivity: f64,
    ) -> Result<TriangleMesh, Self::Error> {
        scanvox_grid::volume_to_mesh(grid, iso_value, adaptivity as f32)
    }

    fn write_grids(&self, grids: &[&Self::Grid], path: &Path) -> Result<(), Self::Error> {
        scanvox_grid::write_grids(grids, path)
    }

    fn read_grids(&self, path: &Path) -> Result<Vec<Self::Grid>, Self::Error> {
        scanvox_grid::read_grids(path)
    }
}
