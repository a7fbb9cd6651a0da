//! Conversion pipeline between scalar scan volumes and sparse voxel fields.
//!
//! # Representations
//!
//! The same physical field moves between three forms:
//!
//! - a dense array with a physical-space affine description
//!   ([`PhysicalVolume`]: origin + spacing),
//! - a sparse grid tagged with a semantic class (fog volume or level set)
//!   and free-form metadata, owned by a grid engine behind the
//!   [`GridEngine`] capability trait,
//! - an explicit surface mesh extracted at an isovalue.
//!
//! # Flows
//!
//! The fog-volume flow decodes a scan image, rescales raw intensities into
//! a clamped unit-interval density field, and builds a tagged sparse grid.
//! The level-set flow derives a signed-distance grid from that fog volume
//! at an isovalue rescaled with the *same* thresholds, so that surfaces
//! extracted from either representation coincide. [`Pipeline`]
//! orchestrates both, including optional grid/image/mesh file emission.

mod adapter;
mod config;
mod engine;
mod error;
mod image;
mod io;
mod normalize;
mod pipeline;
mod volume;

pub use adapter::GridAdapter;
pub use config::{PipelineConfig, ProductConfig};
pub use engine::{GridEngine, SparseEngine};
pub use error::{Error, Result};
pub use image::{decode_physical_volume, encode_physical_volume, ScanImage};
pub use io::{read_scan_image, write_obj, write_scan_image, write_stl};
pub use normalize::{normalize, rescale_isovalue, Thresholds};
pub use pipeline::Pipeline;
pub use volume::PhysicalVolume;

pub use scanvox_core::{GridClass, MetaValue, QuadMesh, TriangleMesh};
