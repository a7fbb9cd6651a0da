//! A sparse volumetric grid engine for scalar fields.
//!
//! # Grids
//!
//! A [`SparseGrid`] stores a scalar field over a bounded index box as 8³
//! chunks of `f32` values. Chunks whose values all match the grid's
//! background are not allocated; reads outside any allocated chunk return
//! the background value. Construction from a dense buffer prunes values
//! within a caller-supplied tolerance of the background.
//!
//! # Transforms
//!
//! [`fog_to_sdf`] derives a narrow-band signed-distance field from a fog
//! (density) grid by seeding sub-voxel distances at the isosurface and
//! propagating them with a chamfer sweep. [`volume_to_mesh`] and
//! [`volume_to_quad_mesh`] extract an explicit surface at an isovalue by
//! dual contouring.
//!
//! # Containers
//!
//! [`write_grids`] serializes any number of grids into a single lz4-framed
//! container file; [`read_grids`] restores them with every tag and
//! metadata entry intact.

mod container;
mod error;
mod grid;
mod mesh;
mod sdf;

pub use container::*;
pub use error::*;
pub use grid::*;
pub use mesh::*;
pub use sdf::*;
