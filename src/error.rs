use std::io;

/// All error types for meshkit.
#[derive(thiserror::Error, Debug)]
pub enum MeshError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Out of range: {kind} id {id} (count {count})")]
    OutOfRange {
        kind: &'static str,
        id: u32,
        count: usize,
    },
    #[error("Input error: {0}")]
    Input(String),
    #[error("Output error: {0}")]
    Output(String),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl MeshError {
    pub(crate) fn out_of_range(kind: &'static str, id: u32, count: usize) -> Self {
        MeshError::OutOfRange { kind, id, count }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MeshError>;
