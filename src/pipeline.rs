use crate::adapter::GridAdapter;
use crate::config::{PipelineConfig, ProductConfig};
use crate::engine::{GridEngine, SparseEngine};
use crate::error::{Error, Result};
use crate::image::{decode_physical_volume, encode_physical_volume, ScanImage};
use crate::io::{write_obj, write_scan_image, write_stl};
use crate::normalize::{normalize, rescale_isovalue, Thresholds};

use scanvox_core::GridClass;

use std::path::Path;

/// Orchestrates the two conversion flows and their file emissions.
///
/// The fog-volume flow normalizes a scan image into a unit-interval
/// density grid. The level-set flow then derives a signed-distance grid
/// from that fog volume at the configured isovalue, rescaled with the
/// *same* effective range the normalization used, so surfaces extracted
/// from either grid coincide. Products (grid containers, densified
/// images, meshes) are written as the stage that owns them completes.
pub struct Pipeline<E: GridEngine = SparseEngine> {
    adapter: GridAdapter<E>,
    config: PipelineConfig,
    effective: Option<Thresholds>,
    fog_volume: Option<E::Grid>,
    level_set: Option<E::Grid>,
}

impl<E: GridEngine> Pipeline<E> {
    pub fn new(engine: E, config: PipelineConfig) -> Self {
        Self {
            adapter: GridAdapter::new(engine),
            config,
            effective: None,
            fog_volume: None,
            level_set: None,
        }
    }

    /// Runs both flows back to back.
    pub fn run(&mut self, image: &ScanImage) -> Result<()> {
        self.run_fog_volume(image)?;
        self.run_level_set()
    }

    /// Normalizes `image` into a fog-volume grid and emits its products.
    pub fn run_fog_volume(&mut self, image: &ScanImage) -> Result<()> {
        let volume = decode_physical_volume(image)?;

        // The clamp bounds intersected with the data's own range; the
        // isovalue later rescales through this same window.
        let (observed_min, observed_max) = volume.value_range();
        let effective = Thresholds::new(
            self.config.thresholds.min.max(observed_min),
            self.config.thresholds.max.min(observed_max),
        );
        let density = normalize(&volume, effective)?;
        self.effective = Some(effective);

        let grid = self.adapter.fog_volume_from_array(
            &density,
            &self.config.fog_volume.name,
            &self.config.creator,
            self.config.prune_tolerance,
        )?;
        log::info!(
            "built fog volume \"{}\" from a {:?} image",
            self.config.fog_volume.name,
            image.dims
        );

        let mesh_iso = self.rescaled_iso_value()? as f32;
        let product = self.config.fog_volume.clone();
        self.emit_products(&grid, &product, mesh_iso)?;
        self.fog_volume = Some(grid);
        Ok(())
    }

    /// Derives the level-set grid from the fog volume built by
    /// [`run_fog_volume`](Self::run_fog_volume) and emits its products.
    pub fn run_level_set(&mut self) -> Result<()> {
        let fog = self.fog_volume.as_ref().ok_or(Error::IllegalGridState {
            operation: "run_level_set",
            expected: GridClass::FogVolume,
            actual: GridClass::Unknown,
        })?;

        let iso = self.rescaled_iso_value()? as f32;
        let mut grid = self.adapter.fog_to_sdf(fog, iso)?;
        self.adapter
            .set_grid_name(&mut grid, &self.config.level_set.name);
        log::info!(
            "derived level set \"{}\" at density {}",
            self.config.level_set.name,
            iso
        );

        // A level set's surface sits at distance zero by definition.
        let product = self.config.level_set.clone();
        self.emit_products(&grid, &product, 0.0)?;
        self.level_set = Some(grid);
        Ok(())
    }

    /// The configured isovalue mapped into normalized density units.
    pub fn rescaled_iso_value(&self) -> Result<f64> {
        let thresholds = self.effective.unwrap_or(self.config.thresholds);
        rescale_isovalue(self.config.iso_value, thresholds)
    }

    pub fn fog_volume(&self) -> Option<&E::Grid> {
        self.fog_volume.as_ref()
    }

    pub fn level_set(&self) -> Option<&E::Grid> {
        self.level_set.as_ref()
    }

    pub fn adapter(&self) -> &GridAdapter<E> {
        &self.adapter
    }

    fn emit_products(&self, grid: &E::Grid, product: &ProductConfig, mesh_iso: f32) -> Result<()> {
        if let Some(path) = &product.grid_path {
            self.adapter.write_grid(grid, path)?;
            log::info!("wrote grid container {}", path.display());
        }
        if let Some(path) = &product.image_path {
            let volume = self.adapter.to_array(grid)?;
            write_scan_image(path, &encode_physical_volume(&volume))?;
            log::info!("wrote dense image {}", path.display());
        }
        if let Some(path) = &product.mesh_path {
            self.emit_mesh(grid, path, mesh_iso)?;
        }
        Ok(())
    }

    fn emit_mesh(&self, grid: &E::Grid, path: &Path, iso_value: f32) -> Result<()> {
        let is_obj = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("obj"));
        if is_obj {
            let quads = self.adapter.volume_to_quad_mesh(grid, iso_value)?;
            write_obj(path, &quads)?;
            log::info!(
                "wrote {} quads to {}",
                quads.quads.len(),
                path.display()
            );
        } else {
            let mesh = self
                .adapter
                .volume_to_mesh(grid, iso_value, self.config.adaptivity)?;
            write_stl(path, &mesh)?;
            log::info!(
                "wrote {} triangles to {}",
                mesh.triangles.len(),
                path.display()
            );
        }
        Ok(())
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
