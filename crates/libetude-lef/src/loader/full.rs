//! Full-read loader: the entire file lives in one owned buffer.

use std::fs;
use std::path::Path;

use crate::container;
use crate::error::LefResult;
use crate::header::LefHeader;
use crate::layer::LayerIndexEntry;
use crate::meta::ModelMeta;

use super::LefModel;

pub struct FullModel {
    header: LefHeader,
    meta: ModelMeta,
    index: Vec<LayerIndexEntry>,
    buffer: Vec<u8>,
}

impl FullModel {
    pub fn open(path: impl AsRef<Path>) -> LefResult<Self> {
        let buffer = fs::read(path)?;
        Self::from_bytes(buffer)
    }

    pub fn from_bytes(buffer: Vec<u8>) -> LefResult<Self> {
        let (header, meta, index) = container::parse_prefix(&buffer)?;
        Ok(Self { header, meta, index, buffer })
    }

    pub fn layer_ids(&self) -> Vec<u16> {
        self.index.iter().map(|e| e.layer_id).collect()
    }
}

impl LefModel for FullModel {
    fn header(&self) -> &LefHeader {
        &self.header
    }

    fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    fn get_layer_data(&mut self, layer_id: u16) -> LefResult<Vec<u8>> {
        let entry = container::find_entry(&self.index, layer_id)?;
        let (_, data) = container::read_layer(&self.buffer, entry)?;
        Ok(data)
    }

    fn verify_file_integrity(&mut self) -> LefResult<()> {
        self.header.check_version_compatible()?;
        let entries = self.index.clone();
        for entry in &entries {
            container::read_layer(&self.buffer, entry)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{LayerKind, QuantizationType};
    use crate::writer::{LayerDataDescriptor, LefWriter};

    fn sample_file() -> Vec<u8> {
        let mut writer = LefWriter::new(ModelMeta::new("TestModel", "1.0.0"));
        writer
            .add_layer(LayerDataDescriptor {
                layer_id: 1,
                layer_kind: LayerKind::Linear,
                quantization_type: QuantizationType::None,
                meta: vec![],
                weights: [1.0f32, 2.0, 3.0, 4.0, 5.0].iter().flat_map(|f| f.to_le_bytes()).collect(),
            })
            .unwrap();
        writer
            .add_layer(LayerDataDescriptor {
                layer_id: 2,
                layer_kind: LayerKind::Attention,
                quantization_type: QuantizationType::None,
                meta: vec![],
                weights: (6..=11u32).flat_map(|v| (v as f32).to_le_bytes()).collect(),
            })
            .unwrap();
        let mut buf = Vec::new();
        writer.finish(&mut buf).unwrap();
        buf
    }

    #[test]
    fn s6_lef_round_trip() {
        let bytes = sample_file();
        let mut model = FullModel::from_bytes(bytes).unwrap();
        assert!(model.verify_file_integrity().is_ok());

        let layer1 = model.get_layer_data(1).unwrap();
        let floats: Vec<f32> = layer1.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect();
        assert_eq!(floats, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn corrupting_a_layer_byte_fails_integrity_check() {
        let mut bytes = sample_file();
        // Flip a byte inside layer 1's payload region.
        let corrupt_at = bytes.len() - 4;
        bytes[corrupt_at] ^= 0xFF;
        let mut model = FullModel::from_bytes(bytes).unwrap();
        assert!(model.verify_file_integrity().is_err());
    }

    #[test]
    fn missing_layer_id_is_reported() {
        let bytes = sample_file();
        let mut model = FullModel::from_bytes(bytes).unwrap();
        assert!(matches!(model.get_layer_data(99), Err(crate::error::LefError::LayerNotFound(99))));
    }
}
