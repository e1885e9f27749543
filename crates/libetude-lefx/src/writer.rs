//! Serialization pipeline for LEFX: buffer meta, dependencies, and
//! layers in memory, then lay out every offset analytically and write
//! the whole file in one `Write`-only pass — same deliberate
//! no-`Seek`-required simplification as `libetude_lef::writer`.

use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use flate2::Compression;
use flate2::write::ZlibEncoder;

use crate::dependency::LefxDependency;
use crate::error::{LefxError, LefxResult};
use crate::header::{LEFX_HEADER_SIZE, LEFX_MAGIC, LefxExtensionType, LefxFlags, LefxHeader};
use crate::layer::{BlendMode, DiffEncoding, LayerActivation, LayerIndexEntry, LefxLayerHeader, QuantizationType};
use crate::meta::LefxMeta;

/// One differential layer handed to [`LefxWriter::add_layer`].
pub struct LefxLayerDescriptor {
    pub extension_layer_id: u16,
    pub base_layer_id: u16,
    pub blend_mode: BlendMode,
    pub diff_encoding: DiffEncoding,
    pub activation: LayerActivation,
    pub quantization_type: QuantizationType,
    pub similarity_threshold: f32,
    pub blend_weight: f32,
    pub blend_weight_secondary: f32,
    pub meta: Vec<u8>,
    pub diff_bytes: Vec<u8>,
}

struct PendingLayer {
    header: LefxLayerHeader,
    meta: Vec<u8>,
    payload: Vec<u8>,
}

pub struct LefxWriter {
    meta: LefxMeta,
    extension_type: LefxExtensionType,
    extension_id: u32,
    base_model_hash: u32,
    base_version_min: (u16, u16),
    base_version_max: (u16, u16),
    required_base_size: u32,
    compression_level: Option<u32>,
    timestamp: u32,
    dependencies: Vec<LefxDependency>,
    layers: Vec<PendingLayer>,
}

impl LefxWriter {
    pub fn new(meta: LefxMeta, extension_type: LefxExtensionType, extension_id: u32, base_model_hash: u32) -> Self {
        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as u32).unwrap_or(0);
        Self {
            meta,
            extension_type,
            extension_id,
            base_model_hash,
            base_version_min: (1, 0),
            base_version_max: (u16::MAX, u16::MAX),
            required_base_size: 0,
            compression_level: None,
            timestamp,
            dependencies: Vec::new(),
            layers: Vec::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_compression(mut self, level: u32) -> Self {
        self.compression_level = Some(level.min(9));
        self
    }

    pub fn with_base_version_range(mut self, min: (u16, u16), max: (u16, u16)) -> Self {
        self.base_version_min = min;
        self.base_version_max = max;
        self
    }

    pub fn add_dependency(&mut self, dep: LefxDependency) {
        self.dependencies.push(dep);
    }

    pub fn add_layer(&mut self, desc: LefxLayerDescriptor) -> LefxResult<()> {
        if self.layers.iter().any(|l| l.header.extension_layer_id == desc.extension_layer_id) {
            return Err(LefxError::DuplicateLayerId(desc.extension_layer_id));
        }

        let checksum = crc32fast::hash(&desc.diff_bytes);
        let data_size = desc.diff_bytes.len() as u32;

        let (payload, compressed_size) = match self.compression_level {
            Some(level) => match compress(&desc.diff_bytes, level) {
                Ok(compressed) => {
                    let size = compressed.len() as u32;
                    (compressed, size)
                }
                Err(_) => (desc.diff_bytes.clone(), data_size),
            },
            None => (desc.diff_bytes.clone(), data_size),
        };

        let header = LefxLayerHeader {
            extension_layer_id: desc.extension_layer_id,
            base_layer_id: desc.base_layer_id,
            blend_mode: desc.blend_mode,
            diff_encoding: desc.diff_encoding,
            activation: desc.activation,
            quantization_type: desc.quantization_type,
            similarity_threshold: desc.similarity_threshold,
            blend_weight: desc.blend_weight,
            blend_weight_secondary: desc.blend_weight_secondary,
            dependency_count: self.dependencies.len() as u16,
            meta_size: desc.meta.len() as u32,
            data_size,
            compressed_size,
            data_offset: 0, // patched in `finish`
            checksum,
        };
        self.layers.push(PendingLayer { header, meta: desc.meta, payload });
        Ok(())
    }

    pub fn finish<W: Write>(mut self, out: &mut W) -> LefxResult<()> {
        let meta_bytes = self.meta.to_bytes();
        let meta_offset = LEFX_HEADER_SIZE as u32;

        let dependencies_offset = meta_offset + meta_bytes.len() as u32;
        let dep_bytes_len = self.dependencies.len() * LefxDependency::SIZE;

        let layer_index_offset = dependencies_offset + dep_bytes_len as u32;
        let index_bytes_len = self.layers.len() * LayerIndexEntry::SIZE;

        let layer_data_offset = layer_index_offset + index_bytes_len as u32;

        let mut cursor = layer_data_offset;
        let mut index = Vec::with_capacity(self.layers.len());
        for layer in &mut self.layers {
            let header_offset = cursor;
            layer.header.data_offset = header_offset + LefxLayerHeader::SIZE as u32 + layer.meta.len() as u32;
            let entry_size = LefxLayerHeader::SIZE as u32 + layer.meta.len() as u32 + layer.header.compressed_size;
            index.push(LayerIndexEntry {
                layer_id: layer.header.extension_layer_id,
                header_offset,
                data_offset: layer.header.data_offset,
                data_size: layer.header.data_size,
            });
            cursor += entry_size;
        }
        let file_size = cursor;

        let mut flags = LefxFlags::default();
        if self.compression_level.is_some() {
            flags.0 |= LefxFlags::COMPRESSED;
        }

        let header = LefxHeader {
            magic: LEFX_MAGIC,
            version_major: 1,
            version_minor: 0,
            extension_type: self.extension_type,
            extension_id: self.extension_id,
            flags,
            file_size,
            timestamp: self.timestamp,
            base_model_hash: self.base_model_hash,
            base_version_min: self.base_version_min,
            base_version_max: self.base_version_max,
            required_base_size: self.required_base_size,
            meta_offset,
            dependencies_offset,
            layer_index_offset,
            layer_data_offset,
            plugin_data_offset: 0,
            reserved: [0u8; 16],
        };

        out.write_all(&header.to_bytes())?;
        out.write_all(&meta_bytes)?;
        for dep in &self.dependencies {
            out.write_all(&dep.to_bytes())?;
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::LefxHeader;

    fn sample_layer(id: u16) -> LefxLayerDescriptor {
        LefxLayerDescriptor {
            extension_layer_id: id,
            base_layer_id: id,
            blend_mode: BlendMode::Add,
            diff_encoding: DiffEncoding::WeightDelta,
            activation: LayerActivation::Always,
            quantization_type: QuantizationType::None,
            similarity_threshold: 0.0,
            blend_weight: 1.0,
            blend_weight_secondary: 0.0,
            meta: vec![],
            diff_bytes: vec![1.0f32, 2.0].iter().flat_map(|f| f.to_le_bytes()).collect(),
        }
    }

    #[test]
    fn rejects_duplicate_layer_ids() {
        let mut writer = LefxWriter::new(LefxMeta::new("pack", "1.0.0", "base"), LefxExtensionType::Speaker, 1, 0xdead_beef);
        writer.add_layer(sample_layer(1)).unwrap();
        assert!(matches!(writer.add_layer(sample_layer(1)), Err(LefxError::DuplicateLayerId(1))));
    }

    #[test]
    fn finish_produces_a_well_formed_header() {
        let mut writer = LefxWriter::new(LefxMeta::new("pack", "1.0.0", "base"), LefxExtensionType::Speaker, 7, 0xdead_beef).with_timestamp(42);
        writer.add_layer(sample_layer(1)).unwrap();
        writer.add_layer(sample_layer(2)).unwrap();

        let mut buf = Vec::new();
        writer.finish(&mut buf).unwrap();

        let header = LefxHeader::parse(&buf).unwrap();
        assert_eq!(header.magic, LEFX_MAGIC);
        assert_eq!(header.timestamp, 42);
        assert_eq!(header.extension_id, 7);
        assert_eq!(header.file_size as usize, buf.len());
        assert!((header.layer_index_offset as usize) < (header.layer_data_offset as usize));
    }
}
