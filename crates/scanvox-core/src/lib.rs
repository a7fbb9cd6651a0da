//! Shared vocabulary types for the scanvox conversion pipeline.
//!
//! This crate holds the types that cross the boundary between the pipeline
//! and a sparse grid backend: the semantic [`GridClass`] tag, extracted
//! surface meshes, and the string-typed grid metadata values with their
//! best-effort literal decoding.

mod class;
mod mesh;
mod meta;

pub use class::*;
pub use mesh::*;
pub use meta::*;
