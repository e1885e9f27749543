//! Shared parsing/decoding logic used by all three loader strategies.

use flate2::read::ZlibDecoder;
use std::io::Read;

use crate::error::{LefError, LefResult};
use crate::header::{LEF_HEADER_SIZE, LefHeader};
use crate::layer::{LayerHeader, LayerIndexEntry};
use crate::meta::ModelMeta;

/// Parses the header, the meta that immediately follows it, and the
/// layer index, from a buffer holding (at least) that prefix of the
/// file.
pub(crate) fn parse_prefix(data: &[u8]) -> LefResult<(LefHeader, ModelMeta, Vec<LayerIndexEntry>)> {
    let header = LefHeader::parse(data)?;
    header.check_version_compatible()?;

    let meta_start = LEF_HEADER_SIZE;
    let meta_end = meta_start + ModelMeta::SIZE;
    if data.len() < meta_end {
        return Err(LefError::BufferTooSmall { needed: meta_end, available: data.len() });
    }
    let meta = ModelMeta::parse(&data[meta_start..meta_end])?;

    let index_start = header.layer_index_offset as usize;
    let index_end = header.layer_data_offset as usize;
    if index_end > data.len() || index_start > index_end {
        return Err(LefError::InvalidFormat("layer index range out of bounds".to_string()));
    }
    let entry_count = (index_end - index_start) / LayerIndexEntry::SIZE;
    let mut index = Vec::with_capacity(entry_count);
    for i in 0..entry_count {
        let start = index_start + i * LayerIndexEntry::SIZE;
        index.push(LayerIndexEntry::parse(&data[start..])?);
    }
    Ok((header, meta, index))
}

/// Reads one layer's header + decoded payload out of `data`, given its
/// index entry. Decompresses iff `compressed_size < data_size` (see
/// `writer.rs`'s compression-failure fallback: a layer stored
/// uncompressed after a failed compression attempt has
/// `compressed_size == data_size`, so this check is robust to that case
/// regardless of the file-level `COMPRESSED` flag).
pub(crate) fn read_layer(data: &[u8], entry: &LayerIndexEntry) -> LefResult<(LayerHeader, Vec<u8>)> {
    let header_start = entry.header_offset as usize;
    let header_end = header_start + LayerHeader::SIZE;
    if header_end > data.len() {
        return Err(LefError::BufferTooSmall { needed: header_end, available: data.len() });
    }
    let header = LayerHeader::parse(&data[header_start..header_end])?;

    let payload_start = entry.data_offset as usize;
    let payload_end = payload_start + header.compressed_size as usize;
    if payload_end > data.len() {
        return Err(LefError::BufferTooSmall { needed: payload_end, available: data.len() });
    }
    let raw = &data[payload_start..payload_end];

    let decoded = if header.compressed_size < header.data_size {
        let mut decoder = ZlibDecoder::new(raw);
        let mut out = Vec::with_capacity(header.data_size as usize);
        decoder.read_to_end(&mut out).map_err(|e| LefError::CompressionFailed(e.to_string()))?;
        out
    } else {
        raw.to_vec()
    };

    let checksum = crc32fast::hash(&decoded);
    if checksum != header.checksum {
        return Err(LefError::ChecksumMismatch { layer_id: header.layer_id, expected: header.checksum, found: checksum });
    }
    Ok((header, decoded))
}

pub(crate) fn find_entry(index: &[LayerIndexEntry], layer_id: u16) -> LefResult<&LayerIndexEntry> {
    index.iter().find(|e| e.layer_id == layer_id).ok_or(LefError::LayerNotFound(layer_id))
}
