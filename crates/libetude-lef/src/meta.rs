//! Model metadata: fixed-size strings plus architecture/audio config,
//! stored immediately after the header at a fixed offset.

use crate::error::LefResult;

pub const NAME_LEN: usize = 64;
pub const VERSION_LEN: usize = 16;
pub const AUTHOR_LEN: usize = 64;
pub const DESCRIPTION_LEN: usize = 256;

fn write_fixed(buf: &mut Vec<u8>, s: &str, len: usize) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(len);
    buf.extend_from_slice(&bytes[..n]);
    buf.resize(buf.len() + (len - n), 0);
}

fn read_fixed(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned()
}

/// Quantization scheme applied to a layer's (or the model's default)
/// weight storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantizationType {
    None,
    Int8,
    Int4,
    Float16,
    BFloat16,
    Unknown(u8),
}

impl From<u8> for QuantizationType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::None,
            1 => Self::Int8,
            2 => Self::Int4,
            3 => Self::Float16,
            4 => Self::BFloat16,
            other => Self::Unknown(other),
        }
    }
}

impl QuantizationType {
    pub fn to_u8(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Int8 => 1,
            Self::Int4 => 2,
            Self::Float16 => 3,
            Self::BFloat16 => 4,
            Self::Unknown(v) => v,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArchitectureInfo {
    pub input_dim: u32,
    pub output_dim: u32,
    pub hidden_dim: u32,
    pub num_layers: u32,
    pub num_heads: u32,
    pub vocab_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub mel_channels: u32,
    pub hop_length: u32,
    pub win_length: u32,
}

/// Model-level metadata, written once at offset [`crate::header::LEF_HEADER_SIZE`].
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMeta {
    pub name: String,
    pub version: String,
    pub author: String,
    pub description: String,
    pub architecture: ArchitectureInfo,
    pub audio: AudioConfig,
    pub default_quantization: QuantizationType,
    pub mixed_precision: bool,
}

impl ModelMeta {
    /// Fixed on-disk size: four fixed strings, six architecture u32s,
    /// four audio u32s, one quantization byte, one mixed-precision byte.
    pub const SIZE: usize = NAME_LEN + VERSION_LEN + AUTHOR_LEN + DESCRIPTION_LEN + 6 * 4 + 4 * 4 + 1 + 1;

    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            author: String::new(),
            description: String::new(),
            architecture: ArchitectureInfo::default(),
            audio: AudioConfig::default(),
            default_quantization: QuantizationType::None,
            mixed_precision: false,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        write_fixed(&mut buf, &self.name, NAME_LEN);
        write_fixed(&mut buf, &self.version, VERSION_LEN);
        write_fixed(&mut buf, &self.author, AUTHOR_LEN);
        write_fixed(&mut buf, &self.description, DESCRIPTION_LEN);
        let a = &self.architecture;
        for field in [a.input_dim, a.output_dim, a.hidden_dim, a.num_layers, a.num_heads, a.vocab_size] {
            buf.extend_from_slice(&field.to_le_bytes());
        }
        let c = &self.audio;
        for field in [c.sample_rate, c.mel_channels, c.hop_length, c.win_length] {
            buf.extend_from_slice(&field.to_le_bytes());
        }
        buf.push(self.default_quantization.to_u8());
        buf.push(self.mixed_precision as u8);
        debug_assert_eq!(buf.len(), Self::SIZE);
        buf
    }

    pub fn parse(data: &[u8]) -> LefResult<Self> {
        if data.len() < Self::SIZE {
            return Err(crate::error::LefError::BufferTooSmall { needed: Self::SIZE, available: data.len() });
        }
        let mut cursor = 0usize;
        let mut take = |len: usize| {
            let slice = &data[cursor..cursor + len];
            cursor += len;
            slice
        };

        let name = read_fixed(take(NAME_LEN));
        let version = read_fixed(take(VERSION_LEN));
        let author = read_fixed(take(AUTHOR_LEN));
        let description = read_fixed(take(DESCRIPTION_LEN));

        let mut read_u32 = || {
            let slice = take(4);
            u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]])
        };
        let architecture = ArchitectureInfo {
            input_dim: read_u32(),
            output_dim: read_u32(),
            hidden_dim: read_u32(),
            num_layers: read_u32(),
            num_heads: read_u32(),
            vocab_size: read_u32(),
        };
        let audio =
            AudioConfig { sample_rate: read_u32(), mel_channels: read_u32(), hop_length: read_u32(), win_length: read_u32() };

        let default_quantization = QuantizationType::from(take(1)[0]);
        let mixed_precision = take(1)[0] != 0;

        Ok(Self { name, version, author, description, architecture, audio, default_quantization, mixed_precision })
    }

    /// CRC32 (IEEE 802.3) over the encoded meta bytes — the header's
    /// `model_hash` field.
    pub fn hash(&self) -> u32 {
        crc32fast::hash(&self.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let mut meta = ModelMeta::new("TestModel", "1.0.0");
        meta.author = "libetude".to_string();
        meta.architecture = ArchitectureInfo { input_dim: 80, output_dim: 80, hidden_dim: 256, num_layers: 4, num_heads: 4, vocab_size: 256 };
        meta.audio = AudioConfig { sample_rate: 22050, mel_channels: 80, hop_length: 256, win_length: 1024 };
        meta.default_quantization = QuantizationType::Int8;
        meta.mixed_precision = true;

        let bytes = meta.to_bytes();
        assert_eq!(bytes.len(), ModelMeta::SIZE);
        let parsed = ModelMeta::parse(&bytes).unwrap();
        assert_eq!(parsed, meta);
    }

    #[test]
    fn truncates_overlong_strings_without_overrunning_fixed_width() {
        let long_name = "x".repeat(NAME_LEN + 50);
        let meta = ModelMeta::new(long_name, "1.0.0");
        let bytes = meta.to_bytes();
        assert_eq!(bytes.len(), ModelMeta::SIZE);
        let parsed = ModelMeta::parse(&bytes).unwrap();
        assert_eq!(parsed.name.len(), NAME_LEN);
    }

    #[test]
    fn hash_is_stable_for_identical_meta() {
        let a = ModelMeta::new("m", "1.0.0");
        let b = ModelMeta::new("m", "1.0.0");
        assert_eq!(a.hash(), b.hash());
    }
}
