//! Streaming loader: only the header, meta, and index stay resident.
//! Layer payloads are read through from the file handle on demand and
//! cached under a byte budget with LRU eviction.
//!
//! `lru::LruCache` tracks *entry* recency but not byte-weighted
//! capacity, so entries are paired with a running `used_bytes`
//! accountant here — the crate's own size-limited variant assumes a
//! fixed per-entry cost, which doesn't fit layers of wildly different
//! sizes.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::num::NonZeroUsize;
use std::path::Path;

use lru::LruCache;

use crate::container;
use crate::error::LefResult;
use crate::header::{LEF_HEADER_SIZE, LefHeader};
use crate::layer::LayerIndexEntry;
use crate::meta::ModelMeta;

use super::LefModel;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheInfo {
    pub resident_layers: Vec<u16>,
    pub used_bytes: usize,
    pub budget_bytes: usize,
}

pub struct StreamingModel {
    header: LefHeader,
    meta: ModelMeta,
    index: Vec<LayerIndexEntry>,
    file: File,
    cache: LruCache<u16, Vec<u8>>,
    used_bytes: usize,
    budget_bytes: usize,
}

impl StreamingModel {
    pub fn open(path: impl AsRef<Path>, budget_bytes: usize) -> LefResult<Self> {
        let mut file = File::open(path)?;
        // Read just enough of the prefix to learn the index bounds,
        // then (re-)read exactly that much — the index is usually a
        // small fraction of the file, so a second short read beats
        // guessing a generous-enough initial window.
        let mut probe = vec![0u8; LEF_HEADER_SIZE + ModelMeta::SIZE];
        file.read_exact(&mut probe)?;
        let header = LefHeader::parse(&probe)?;

        let prefix_len = header.layer_data_offset as usize;
        let mut prefix = vec![0u8; prefix_len];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut prefix)?;
        let (header, meta, index) = container::parse_prefix(&prefix)?;

        let capacity = NonZeroUsize::new(index.len().max(1)).unwrap();
        Ok(Self { header, meta, index, file, cache: LruCache::new(capacity), used_bytes: 0, budget_bytes })
    }

    pub fn cache_info(&self) -> CacheInfo {
        CacheInfo { resident_layers: self.cache.iter().map(|(&id, _)| id).collect(), used_bytes: self.used_bytes, budget_bytes: self.budget_bytes }
    }

    /// Evicts least-recently-used layers until `used_bytes <= target`.
    pub fn cleanup_cache(&mut self, target: usize) {
        while self.used_bytes > target {
            match self.cache.pop_lru() {
                Some((_, data)) => self.used_bytes -= data.len(),
                None => break,
            }
        }
    }

    pub fn unload_layer(&mut self, layer_id: u16) {
        if let Some(data) = self.cache.pop(&layer_id) {
            self.used_bytes -= data.len();
        }
    }

    fn read_layer_from_disk(&mut self, entry: &LayerIndexEntry) -> LefResult<Vec<u8>> {
        // The entry only carries the decoded `data_size`; the on-disk
        // span may be shorter if compressed, so read generously: from
        // the layer header through to the next layer (or EOF).
        let span_end = self.next_layer_start(entry.header_offset).expect("falls back to file_size, never None");
        let span_start = entry.header_offset;
        let mut buf = vec![0u8; (span_end - span_start) as usize];
        self.file.seek(SeekFrom::Start(span_start as u64))?;
        self.file.read_exact(&mut buf)?;

        // Re-anchor the entry against this span-local buffer.
        let local_entry = LayerIndexEntry { layer_id: entry.layer_id, header_offset: 0, data_offset: entry.data_offset - span_start, data_size: entry.data_size };
        let (_, data) = container::read_layer(&buf, &local_entry)?;
        Ok(data)
    }

    fn next_layer_start(&self, header_offset: u32) -> Option<u32> {
        self.index.iter().map(|e| e.header_offset).filter(|&o| o > header_offset).min().or(Some(self.header.file_size))
    }

    fn load_layer_on_demand(&mut self, layer_id: u16) -> LefResult<Vec<u8>> {
        if let Some(data) = self.cache.get(&layer_id) {
            return Ok(data.clone());
        }
        let entry = *container::find_entry(&self.index, layer_id)?;
        let data = self.read_layer_from_disk(&entry)?;

        if let Some((_, evicted)) = self.cache.push(layer_id, data.clone()) {
            self.used_bytes -= evicted.len();
        }
        self.used_bytes += data.len();
        if self.used_bytes > self.budget_bytes {
            let target = self.budget_bytes;
            self.cleanup_cache(target);
        }
        Ok(data)
    }
}

impl LefModel for StreamingModel {
    fn header(&self) -> &LefHeader {
        &self.header
    }

    fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    fn get_layer_data(&mut self, layer_id: u16) -> LefResult<Vec<u8>> {
        self.load_layer_on_demand(layer_id)
    }

    fn verify_file_integrity(&mut self) -> LefResult<()> {
        self.header.check_version_compatible()?;
        let ids: Vec<u16> = self.index.iter().map(|e| e.layer_id).collect();
        for id in ids {
            self.load_layer_on_demand(id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{LayerKind, QuantizationType};
    use crate::writer::{LayerDataDescriptor, LefWriter};
    use std::io::Write as _;

    fn write_n_layer_file(path: &Path, n: u16) {
        let mut writer = LefWriter::new(ModelMeta::new("Streamed", "1.0.0"));
        for id in 1..=n {
            writer
                .add_layer(LayerDataDescriptor {
                    layer_id: id,
                    layer_kind: LayerKind::Linear,
                    quantization_type: QuantizationType::None,
                    meta: vec![],
                    weights: vec![id as u8; 64],
                })
                .unwrap();
        }
        let mut buf = Vec::new();
        writer.finish(&mut buf).unwrap();
        let mut file = File::create(path).unwrap();
        file.write_all(&buf).unwrap();
    }

    #[test]
    fn s7_streaming_cache_keeps_only_the_most_recently_used_layers() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("libetude_lef_test_{}.lef", std::process::id()));
        write_n_layer_file(&path, 10);

        // Each layer is 64 bytes; a budget of 192 fits exactly 3.
        let mut model = StreamingModel::open(&path, 192).unwrap();
        for id in 1..=10u16 {
            model.get_layer_data(id).unwrap();
        }

        let info = model.cache_info();
        assert!(info.used_bytes <= info.budget_bytes);
        let mut resident = info.resident_layers.clone();
        resident.sort_unstable();
        assert_eq!(resident, vec![8, 9, 10]);

        let _ = std::fs::remove_file(&path);
    }
}
