//! Memory-mapped loader: the file is mapped read-only and layer payloads
//! are views into that mapping, decoded on demand.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::container;
use crate::error::LefResult;
use crate::header::LefHeader;
use crate::layer::LayerIndexEntry;
use crate::meta::ModelMeta;

use super::LefModel;

pub struct MappedModel {
    header: LefHeader,
    meta: ModelMeta,
    index: Vec<LayerIndexEntry>,
    map: Mmap,
}

impl MappedModel {
    pub fn open(path: impl AsRef<Path>) -> LefResult<Self> {
        let file = File::open(path)?;
        // Safety: the mapping is read-only and this loader's contract
        // (like the streaming loader's) is that callers don't mutate
        // the backing file concurrently — see spec's concurrency model.
        let map = unsafe { Mmap::map(&file)? };
        let (header, meta, index) = container::parse_prefix(&map)?;
        Ok(Self { header, meta, index, map })
    }
}

impl LefModel for MappedModel {
    fn header(&self) -> &LefHeader {
        &self.header
    }

    fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    fn get_layer_data(&mut self, layer_id: u16) -> LefResult<Vec<u8>> {
        let entry = container::find_entry(&self.index, layer_id)?;
        let (_, data) = container::read_layer(&self.map, entry)?;
        Ok(data)
    }

    fn verify_file_integrity(&mut self) -> LefResult<()> {
        self.header.check_version_compatible()?;
        let entries = self.index.clone();
        for entry in &entries {
            container::read_layer(&self.map, entry)?;
        }
        Ok(())
    }
}
