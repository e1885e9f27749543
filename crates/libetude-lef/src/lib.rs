//! LEF: the binary model container format. A fixed header, a
//! fixed-size model meta, a per-layer index, and CRC32-checked
//! (optionally zlib-compressed) layer payloads, loadable whole,
//! memory-mapped, or streamed under an LRU byte budget.

mod container;
mod error;
mod header;
mod layer;
mod loader;
mod meta;
mod writer;

pub use error::{LefError, LefResult};
pub use header::{LEF_CURRENT_VERSION, LEF_HEADER_SIZE, LEF_MAGIC, LefFlags, LefHeader};
pub use layer::{LayerHeader, LayerIndexEntry, LayerKind};
pub use loader::{CacheInfo, FullModel, LefModel, MappedModel, StreamingModel};
pub use meta::{ArchitectureInfo, AudioConfig, ModelMeta, QuantizationType};
pub use writer::{LayerDataDescriptor, LefWriter};
