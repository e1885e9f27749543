//! Loading a LEFX file. Extensions are a fraction of a base model's
//! size, so unlike `libetude_lef` (which offers full/mmap/streaming
//! strategies for a multi-gigabyte model), one full-read loader covers
//! the whole range of extension sizes this format targets.

use std::fs;
use std::path::Path;

use crate::container;
use crate::dependency::LefxDependency;
use crate::error::LefxResult;
use crate::header::LefxHeader;
use crate::layer::{LayerIndexEntry, LefxLayerHeader};
use crate::meta::LefxMeta;

pub struct LoadedExtension {
    header: LefxHeader,
    meta: LefxMeta,
    dependencies: Vec<LefxDependency>,
    index: Vec<LayerIndexEntry>,
    buffer: Vec<u8>,
}

impl LoadedExtension {
    pub fn open(path: impl AsRef<Path>) -> LefxResult<Self> {
        let buffer = fs::read(path)?;
        Self::from_bytes(buffer)
    }

    pub fn from_bytes(buffer: Vec<u8>) -> LefxResult<Self> {
        let prefix = container::parse_prefix(&buffer)?;
        Ok(Self { header: prefix.header, meta: prefix.meta, dependencies: prefix.dependencies, index: prefix.index, buffer })
    }

    pub fn header(&self) -> &LefxHeader {
        &self.header
    }

    pub fn meta(&self) -> &LefxMeta {
        &self.meta
    }

    pub fn dependencies(&self) -> &[LefxDependency] {
        &self.dependencies
    }

    pub fn layer_ids(&self) -> Vec<u16> {
        self.index.iter().map(|e| e.layer_id).collect()
    }

    /// Reads one differential layer's header and decoded diff payload.
    pub fn get_layer(&self, layer_id: u16) -> LefxResult<(LefxLayerHeader, Vec<u8>)> {
        let entry = container::find_entry(&self.index, layer_id)?;
        container::read_layer(&self.buffer, entry)
    }

    pub fn verify_file_integrity(&self) -> LefxResult<()> {
        self.header.check_version_compatible()?;
        for entry in &self.index {
            container::read_layer(&self.buffer, entry)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::LefxExtensionType;
    use crate::layer::{BlendMode, DiffEncoding, LayerActivation, QuantizationType};
    use crate::writer::{LefxLayerDescriptor, LefxWriter};

    fn sample_file() -> Vec<u8> {
        let mut writer = LefxWriter::new(LefxMeta::new("Korean pack", "1.0.0", "BaseTTS"), LefxExtensionType::Language, 3, 0xdead_beef);
        writer
            .add_layer(LefxLayerDescriptor {
                extension_layer_id: 1,
                base_layer_id: 1,
                blend_mode: BlendMode::Add,
                diff_encoding: DiffEncoding::WeightDelta,
                activation: LayerActivation::Always,
                quantization_type: QuantizationType::None,
                similarity_threshold: 0.0,
                blend_weight: 1.0,
                blend_weight_secondary: 0.0,
                meta: vec![],
                diff_bytes: [1.0f32, -1.0, 0.5].iter().flat_map(|f| f.to_le_bytes()).collect(),
            })
            .unwrap();
        let mut buf = Vec::new();
        writer.finish(&mut buf).unwrap();
        buf
    }

    #[test]
    fn round_trips_a_single_layer_extension() {
        let bytes = sample_file();
        let ext = LoadedExtension::from_bytes(bytes).unwrap();
        assert!(ext.verify_file_integrity().is_ok());
        assert_eq!(ext.meta().name, "Korean pack");

        let (header, payload) = ext.get_layer(1).unwrap();
        assert_eq!(header.base_layer_id, 1);
        let floats: Vec<f32> = payload.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect();
        assert_eq!(floats, vec![1.0, -1.0, 0.5]);
    }

    #[test]
    fn corrupting_a_layer_byte_fails_integrity_check() {
        let mut bytes = sample_file();
        let corrupt_at = bytes.len() - 4;
        bytes[corrupt_at] ^= 0xFF;
        let ext = LoadedExtension::from_bytes(bytes).unwrap();
        assert!(ext.verify_file_integrity().is_err());
    }

    #[test]
    fn missing_layer_id_is_reported() {
        let bytes = sample_file();
        let ext = LoadedExtension::from_bytes(bytes).unwrap();
        assert!(matches!(ext.get_layer(99), Err(crate::error::LefxError::LayerNotFound(99))));
    }
}
