//! Error taxonomy for LEF parsing, writing, and loading.

#[derive(Debug, thiserror::Error)]
pub enum LefError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("invalid LEF format: {0}")]
    InvalidFormat(String),

    #[error("checksum mismatch for layer {layer_id}: expected {expected:#010x}, found {found:#010x}")]
    ChecksumMismatch { layer_id: u16, expected: u32, found: u32 },

    #[error("unsupported LEF version {major}.{minor}")]
    VersionIncompatible { major: u16, minor: u16 },

    #[error("layer {0} not found in the layer index")]
    LayerNotFound(u16),

    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("duplicate layer id {0}")]
    DuplicateLayerId(u16),

    #[error("compression failed: {0}")]
    CompressionFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type LefResult<T> = Result<T, LefError>;
