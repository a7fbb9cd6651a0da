use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("dense buffer has {len} values but shape {shape:?} requires {expected}")]
    ShapeMismatch {
        len: usize,
        shape: [u32; 3],
        expected: usize,
    },
    #[error("grid has an empty index box")]
    EmptyGrid,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("container serialization failed: {0}")]
    Serialize(String),
    #[error("container deserialization failed: {0}")]
    Deserialize(String),
    #[error("not a grid container file (bad magic bytes)")]
    BadMagic,
}
