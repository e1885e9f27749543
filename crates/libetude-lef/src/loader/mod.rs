//! The three loading strategies spec'd for LEF containers: read the
//! whole file up front, memory-map it, or stream layers on demand under
//! an LRU budget.

mod full;
mod mmap;
mod streaming;

pub use full::FullModel;
pub use mmap::MappedModel;
pub use streaming::{CacheInfo, StreamingModel};

use crate::error::LefResult;
use crate::header::LefHeader;
use crate::meta::ModelMeta;

/// Common read surface every loading strategy implements. `&mut self` on
/// the read path because the streaming loader's cache state mutates on
/// every access; the other two loaders simply don't need the mutability.
pub trait LefModel {
    fn header(&self) -> &LefHeader;
    fn meta(&self) -> &ModelMeta;
    fn get_layer_data(&mut self, layer_id: u16) -> LefResult<Vec<u8>>;
    fn verify_file_integrity(&mut self) -> LefResult<()>;
}
