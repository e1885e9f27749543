//! Shared parsing logic: header -> meta -> dependencies -> layer index ->
//! layer data, the same prefix-then-index shape as `libetude_lef`'s
//! container module, extended with a dependency block the base format
//! doesn't have.

use flate2::read::ZlibDecoder;
use std::io::Read;

use crate::dependency::LefxDependency;
use crate::error::{LefxError, LefxResult};
use crate::header::{LEFX_HEADER_SIZE, LefxHeader};
use crate::layer::{LayerIndexEntry, LefxLayerHeader};
use crate::meta::LefxMeta;

pub(crate) struct Prefix {
    pub header: LefxHeader,
    pub meta: LefxMeta,
    pub dependencies: Vec<LefxDependency>,
    pub index: Vec<LayerIndexEntry>,
}

pub(crate) fn parse_prefix(data: &[u8]) -> LefxResult<Prefix> {
    let header = LefxHeader::parse(data)?;
    header.check_version_compatible()?;

    let meta_start = header.meta_offset as usize;
    let meta_end = meta_start + LefxMeta::SIZE;
    if meta_start < LEFX_HEADER_SIZE || meta_end > data.len() {
        return Err(LefxError::InvalidFormat("meta range out of bounds".to_string()));
    }
    let meta = LefxMeta::parse(&data[meta_start..meta_end])?;

    let dep_start = header.dependencies_offset as usize;
    let dep_end = header.layer_index_offset as usize;
    if dep_end < dep_start || dep_end > data.len() {
        return Err(LefxError::InvalidFormat("dependency range out of bounds".to_string()));
    }
    let dep_count = if dep_end > dep_start { (dep_end - dep_start) / LefxDependency::SIZE } else { 0 };
    let mut dependencies = Vec::with_capacity(dep_count);
    for i in 0..dep_count {
        let start = dep_start + i * LefxDependency::SIZE;
        dependencies.push(LefxDependency::parse(&data[start..])?);
    }

    let index_start = header.layer_index_offset as usize;
    let index_end = header.layer_data_offset as usize;
    if index_end < index_start || index_end > data.len() {
        return Err(LefxError::InvalidFormat("layer index range out of bounds".to_string()));
    }
    let entry_count = (index_end - index_start) / LayerIndexEntry::SIZE;
    let mut index = Vec::with_capacity(entry_count);
    for i in 0..entry_count {
        let start = index_start + i * LayerIndexEntry::SIZE;
        index.push(LayerIndexEntry::parse(&data[start..])?);
    }

    Ok(Prefix { header, meta, dependencies, index })
}

/// Reads one differential layer's header + decoded diff payload,
/// verifying its CRC32. Decompression follows the same
/// `compressed_size < data_size` heuristic as the base format.
pub(crate) fn read_layer(data: &[u8], entry: &LayerIndexEntry) -> LefxResult<(LefxLayerHeader, Vec<u8>)> {
    let header_start = entry.header_offset as usize;
    let header_end = header_start + LefxLayerHeader::SIZE;
    if header_end > data.len() {
        return Err(LefxError::BufferTooSmall { needed: header_end, available: data.len() });
    }
    let header = LefxLayerHeader::parse(&data[header_start..header_end])?;

    let payload_start = entry.data_offset as usize;
    let payload_end = payload_start + header.compressed_size as usize;
    if payload_end > data.len() {
        return Err(LefxError::BufferTooSmall { needed: payload_end, available: data.len() });
    }
    let raw = &data[payload_start..payload_end];

    let decoded = if header.compressed_size < header.data_size {
        let mut decoder = ZlibDecoder::new(raw);
        let mut out = Vec::with_capacity(header.data_size as usize);
        decoder.read_to_end(&mut out).map_err(|e| LefxError::CompressionFailed(e.to_string()))?;
        out
    } else {
        raw.to_vec()
    };

    let checksum = crc32fast::hash(&decoded);
    if checksum != header.checksum {
        return Err(LefxError::ChecksumMismatch { layer_id: header.extension_layer_id, expected: header.checksum, found: checksum });
    }
    Ok((header, decoded))
}

pub(crate) fn find_entry(index: &[LayerIndexEntry], layer_id: u16) -> LefxResult<&LayerIndexEntry> {
    index.iter().find(|e| e.layer_id == layer_id).ok_or(LefxError::LayerNotFound(layer_id))
}
