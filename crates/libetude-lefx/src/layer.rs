//! Per-layer header for a differential extension layer.
//!
//! Reuses `libetude_lef::LayerIndexEntry` verbatim for the index array —
//! same `layer_id -> (header_offset, data_offset, data_size)` shape, no
//! reason to redefine it.

use crate::error::{LefxError, LefxResult};

pub use libetude_lef::{LayerIndexEntry, QuantizationType};

/// How an extension layer's values combine with the base layer's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Replace,
    Add,
    Multiply,
    Interpolate,
    WeightedSum,
    Unknown(u8),
}

impl From<u8> for BlendMode {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Replace,
            1 => Self::Add,
            2 => Self::Multiply,
            3 => Self::Interpolate,
            4 => Self::WeightedSum,
            other => Self::Unknown(other),
        }
    }
}

impl BlendMode {
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Replace => 0,
            Self::Add => 1,
            Self::Multiply => 2,
            Self::Interpolate => 3,
            Self::WeightedSum => 4,
            Self::Unknown(v) => v,
        }
    }
}

/// How a differential layer's payload encodes `ext - base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffEncoding {
    /// Raw `ext - base`, full shape. Cheapest to decode, largest on disk.
    WeightDelta,
    /// Index+value pairs for deltas whose magnitude exceeds a threshold.
    SparseMask,
    /// Delta with a per-tensor scale/zero-point.
    QuantizedDelta,
    Unknown(u8),
}

impl From<u8> for DiffEncoding {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::WeightDelta,
            1 => Self::SparseMask,
            2 => Self::QuantizedDelta,
            other => Self::Unknown(other),
        }
    }
}

impl DiffEncoding {
    pub fn to_u8(self) -> u8 {
        match self {
            Self::WeightDelta => 0,
            Self::SparseMask => 1,
            Self::QuantizedDelta => 2,
            Self::Unknown(v) => v,
        }
    }
}

/// Whether a layer blends unconditionally or only when its owning
/// extension's activation rules fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerActivation {
    Always,
    Conditional,
}

impl From<u8> for LayerActivation {
    fn from(value: u8) -> Self {
        if value == 0 { Self::Always } else { Self::Conditional }
    }
}

impl LayerActivation {
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Always => 0,
            Self::Conditional => 1,
        }
    }
}

/// 42-byte packed header preceding each differential layer's payload.
#[derive(Debug, Clone, Copy)]
pub struct LefxLayerHeader {
    pub extension_layer_id: u16,
    pub base_layer_id: u16,
    pub blend_mode: BlendMode,
    pub diff_encoding: DiffEncoding,
    pub activation: LayerActivation,
    pub quantization_type: QuantizationType,
    pub similarity_threshold: f32,
    pub blend_weight: f32,
    pub blend_weight_secondary: f32,
    pub dependency_count: u16,
    pub meta_size: u32,
    pub data_size: u32,
    pub compressed_size: u32,
    pub data_offset: u32,
    pub checksum: u32,
}

impl LefxLayerHeader {
    pub const SIZE: usize = 42;

    pub fn parse(data: &[u8]) -> LefxResult<Self> {
        if data.len() < Self::SIZE {
            return Err(LefxError::BufferTooSmall { needed: Self::SIZE, available: data.len() });
        }
        Ok(Self {
            extension_layer_id: u16::from_le_bytes([data[0], data[1]]),
            base_layer_id: u16::from_le_bytes([data[2], data[3]]),
            blend_mode: BlendMode::from(data[4]),
            diff_encoding: DiffEncoding::from(data[5]),
            activation: LayerActivation::from(data[6]),
            quantization_type: QuantizationType::from(data[7]),
            similarity_threshold: f32::from_le_bytes([data[8], data[9], data[10], data[11]]),
            blend_weight: f32::from_le_bytes([data[12], data[13], data[14], data[15]]),
            blend_weight_secondary: f32::from_le_bytes([data[16], data[17], data[18], data[19]]),
            dependency_count: u16::from_le_bytes([data[20], data[21]]),
            meta_size: u32::from_le_bytes([data[22], data[23], data[24], data[25]]),
            data_size: u32::from_le_bytes([data[26], data[27], data[28], data[29]]),
            compressed_size: u32::from_le_bytes([data[30], data[31], data[32], data[33]]),
            data_offset: u32::from_le_bytes([data[34], data[35], data[36], data[37]]),
            checksum: u32::from_le_bytes([data[38], data[39], data[40], data[41]]),
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..2].copy_from_slice(&self.extension_layer_id.to_le_bytes());
        buf[2..4].copy_from_slice(&self.base_layer_id.to_le_bytes());
        buf[4] = self.blend_mode.to_u8();
        buf[5] = self.diff_encoding.to_u8();
        buf[6] = self.activation.to_u8();
        buf[7] = self.quantization_type.to_u8();
        buf[8..12].copy_from_slice(&self.similarity_threshold.to_le_bytes());
        buf[12..16].copy_from_slice(&self.blend_weight.to_le_bytes());
        buf[16..20].copy_from_slice(&self.blend_weight_secondary.to_le_bytes());
        buf[20..22].copy_from_slice(&self.dependency_count.to_le_bytes());
        buf[22..26].copy_from_slice(&self.meta_size.to_le_bytes());
        buf[26..30].copy_from_slice(&self.data_size.to_le_bytes());
        buf[30..34].copy_from_slice(&self.compressed_size.to_le_bytes());
        buf[34..38].copy_from_slice(&self.data_offset.to_le_bytes());
        buf[38..42].copy_from_slice(&self.checksum.to_le_bytes());
        buf
    }
}
