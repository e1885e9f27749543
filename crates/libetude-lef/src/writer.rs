//! The serialization pipeline: accumulate layers in memory, then emit a
//! complete LEF file in one pass.
//!
//! The spec's writer description ends in a "patch the header prefix"
//! step, suggesting a seek-back-and-rewrite file handle. This writer
//! instead buffers every layer's encoded bytes before `finish` is
//! called, so the header's `file_size`/`model_hash` are known before a
//! single byte reaches the output — a plain `Write` sink suffices, no
//! `Seek` required. Noted in DESIGN.md as a deliberate simplification.

use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use flate2::Compression;
use flate2::write::ZlibEncoder;

use crate::error::{LefError, LefResult};
use crate::header::{LEF_HEADER_SIZE, LEF_MAGIC, LefFlags, LefHeader};
use crate::layer::{LayerHeader, LayerIndexEntry, LayerKind, QuantizationType};
use crate::meta::ModelMeta;

/// One layer handed to [`LefWriter::add_layer`].
pub struct LayerDataDescriptor {
    pub layer_id: u16,
    pub layer_kind: LayerKind,
    pub quantization_type: QuantizationType,
    pub meta: Vec<u8>,
    pub weights: Vec<u8>,
}

struct PendingLayer {
    header: LayerHeader,
    meta: Vec<u8>,
    payload: Vec<u8>,
}

pub struct LefWriter {
    meta: ModelMeta,
    compression_level: Option<u32>,
    timestamp: u32,
    layers: Vec<PendingLayer>,
}

impl LefWriter {
    pub fn new(meta: ModelMeta) -> Self {
        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as u32).unwrap_or(0);
        Self { meta, compression_level: None, timestamp, layers: Vec::new() }
    }

    /// Overrides the wall-clock timestamp (tests want determinism).
    pub fn with_timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_compression(mut self, level: u32) -> Self {
        self.compression_level = Some(level.min(9));
        self
    }

    /// Computes the layer's CRC32, optionally compresses the payload,
    /// and queues it for `finish`. Fails on a duplicate `layer_id`.
    pub fn add_layer(&mut self, desc: LayerDataDescriptor) -> LefResult<()> {
        if self.layers.iter().any(|l| l.header.layer_id == desc.layer_id) {
            return Err(LefError::DuplicateLayerId(desc.layer_id));
        }

        let checksum = crc32fast::hash(&desc.weights);
        let data_size = desc.weights.len() as u32;

        let (payload, compressed_size) = match self.compression_level {
            Some(level) => match compress(&desc.weights, level) {
                Ok(compressed) => {
                    let size = compressed.len() as u32;
                    (compressed, size)
                }
                // CompressionFailed: fall back to storing uncompressed.
                Err(_) => (desc.weights.clone(), data_size),
            },
            None => (desc.weights.clone(), data_size),
        };

        let header = LayerHeader {
            layer_id: desc.layer_id,
            layer_kind: desc.layer_kind,
            quantization_type: desc.quantization_type,
            meta_size: desc.meta.len() as u32,
            data_size,
            compressed_size,
            data_offset: 0, // patched once absolute offsets are known, in `finish`
            checksum,
        };
        self.layers.push(PendingLayer { header, meta: desc.meta, payload });
        Ok(())
    }

    /// Lays out header, meta, layer index, and layer data at their final
    /// offsets and writes the whole file to `out`.
    pub fn finish<W: Write>(mut self, out: &mut W) -> LefResult<()> {
        let meta_bytes = self.meta.to_bytes();
        let layer_index_offset = (LEF_HEADER_SIZE + meta_bytes.len()) as u32;
        let index_bytes_len = self.layers.len() * LayerIndexEntry::SIZE;
        let layer_data_offset = layer_index_offset + index_bytes_len as u32;

        let mut cursor = layer_data_offset;
        let mut index = Vec::with_capacity(self.layers.len());
        for layer in &mut self.layers {
            let header_offset = cursor;
            layer.header.data_offset = header_offset + LayerHeader::SIZE as u32 + layer.meta.len() as u32;
            let entry_size = LayerHeader::SIZE as u32 + layer.meta.len() as u32 + layer.header.compressed_size;
            index.push(LayerIndexEntry {
                layer_id: layer.header.layer_id,
                header_offset,
                data_offset: layer.header.data_offset,
                data_size: layer.header.data_size,
            });
            cursor += entry_size;
        }
        let file_size = cursor;

        let mut flags = LefFlags::default();
        if self.compression_level.is_some() {
            flags.0 |= LefFlags::COMPRESSED;
        }
        if self.layers.iter().any(|l| !matches!(l.header.quantization_type, QuantizationType::None)) {
            flags.0 |= LefFlags::QUANTIZED;
        }

        let header = LefHeader {
            magic: LEF_MAGIC,
            version_major: 1,
            version_minor: 0,
            flags,
            file_size,
            model_hash: self.meta.hash(),
            timestamp: self.timestamp,
            compression_dict_offset: 0,
            layer_index_offset,
            layer_data_offset,
        };

        out.write_all(&header.to_bytes())?;
        out.write_all(&meta_bytes)?;
        for entry in &index {
            out.write_all(&entry.to_bytes())?;
        }
        for layer in &self.layers {
            out.write_all(&layer.header.to_bytes())?;
            out.write_all(&layer.meta)?;
            out.write_all(&layer.payload)?;
        }
        Ok(())
    }
}

fn compress(data: &[u8], level: u32) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(data)?;
    encoder.finish()
}
