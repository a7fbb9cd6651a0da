use crate::error::Result;
use crate::normalize::Thresholds;

use serde::{Deserialize, Serialize};

use std::path::PathBuf;

/// Everything the conversion pipeline needs besides the input image.
///
/// All values are in *raw* image units; the pipeline handles rescaling
/// them alongside the data. Defaults are neutral (no clamping, no
/// pruning, no simplification); domain presets such as CT bone thresholds
/// belong to the caller.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Surface level in raw units, e.g. a Hounsfield value for CT.
    pub iso_value: f64,
    /// Clamp bounds applied during normalization.
    pub thresholds: Thresholds,
    /// Values within this distance of the background are not stored.
    pub prune_tolerance: f32,
    /// Mesh simplification amount in `[0, 1]`; 0 keeps every vertex.
    pub adaptivity: f64,
    /// Recorded as the `creator` tag on every produced grid.
    pub creator: String,
    pub fog_volume: ProductConfig,
    pub level_set: ProductConfig,
}

/// Output selection for one produced grid. Unset paths skip that
/// emission.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProductConfig {
    /// Grid name recorded in the container.
    pub name: String,
    /// Container file for the sparse grid.
    pub grid_path: Option<PathBuf>,
    /// Image file for the densified grid.
    pub image_path: Option<PathBuf>,
    /// Mesh file for the extracted isosurface (`.stl` or `.obj`).
    pub mesh_path: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn read_file(path: &str) -> Result<Self> {
        let reader = std::fs::File::open(path)?;

        Ok(ron::de::from_reader(reader)?)
    }
}
