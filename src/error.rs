use scanvox_core::GridClass;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("input array has {rank} > 3 dimensions")]
    UnsupportedRank { rank: usize },

    #[error("normalization range [{min}, {max}] collapses to zero width")]
    DegenerateRange { min: f64, max: f64 },

    #[error("`{operation}` requires a \"{}\" grid, got \"{}\"", expected.as_str(), actual.as_str())]
    IllegalGridState {
        operation: &'static str,
        expected: GridClass,
        actual: GridClass,
    },

    #[error("dense buffer has {len} values but shape {shape:?} requires {expected}")]
    ShapeMismatch {
        len: usize,
        shape: [usize; 3],
        expected: usize,
    },

    #[error("malformed scan image: {0}")]
    MalformedImage(String),

    #[error("failed to parse config: {0}")]
    Config(#[from] ron::error::SpannedError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// An opaque failure inside the external grid engine, propagated
    /// unmodified.
    #[error("grid engine failure: {0}")]
    Engine(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub(crate) fn engine(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Engine(Box::new(e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
