//! Error taxonomy for LEFX parsing, writing, and application against a
//! base model.

#[derive(Debug, thiserror::Error)]
pub enum LefxError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("invalid LEFX format: {0}")]
    InvalidFormat(String),

    #[error("checksum mismatch for layer {layer_id}: expected {expected:#010x}, found {found:#010x}")]
    ChecksumMismatch { layer_id: u16, expected: u32, found: u32 },

    #[error("unsupported LEFX version {major}.{minor}")]
    VersionIncompatible { major: u16, minor: u16 },

    #[error("layer {0} not found in the layer index")]
    LayerNotFound(u16),

    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("duplicate layer id {0}")]
    DuplicateLayerId(u16),

    #[error("compression failed: {0}")]
    CompressionFailed(String),

    #[error("extension is not compatible with this base model: base hash {base_hash:#010x}, extension expects {expected_hash:#010x}")]
    IncompatibleBase { base_hash: u32, expected_hash: u32 },

    #[error("base model version {base_major}.{base_minor} outside extension's declared range {min_major}.{min_minor}-{max_major}.{max_minor}")]
    BaseVersionOutOfRange {
        base_major: u16,
        base_minor: u16,
        min_major: u16,
        min_minor: u16,
        max_major: u16,
        max_minor: u16,
    },

    #[error("base layer {0} referenced by a differential layer is absent")]
    BaseLayerNotFound(u16),

    #[error("dependency unsatisfied: {0}")]
    DependencyUnsatisfied(String),

    #[error(transparent)]
    Tensor(#[from] libetude_tensor::TensorError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type LefxResult<T> = Result<T, LefxError>;
