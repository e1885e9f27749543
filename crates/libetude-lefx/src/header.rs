//! LEFX file header: parallel with [`libetude_lef`]'s LEF header — same
//! little-endian, packed, no-implicit-padding discipline, byte-slice
//! field extraction via `u32::from_le_bytes` — but carrying the
//! base-model identity an extension is bound against.

use libetude_lef::{LefHeader, ModelMeta};

use crate::error::{LefxError, LefxResult};

/// `'LEEX'` read as a little-endian u32.
pub const LEFX_MAGIC: u32 = 0x5845_454C;

pub const LEFX_CURRENT_VERSION: (u16, u16) = (1, 0);

pub const LEFX_HEADER_SIZE: usize = 78;

/// What an extension carries: determines how a host picks it out of a
/// bundle of extensions (one speaker pack, one effect, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LefxExtensionType {
    Speaker,
    Language,
    Effect,
    Voice,
    Plugin,
    Custom,
    Unknown(u8),
}

impl From<u8> for LefxExtensionType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Speaker,
            1 => Self::Language,
            2 => Self::Effect,
            3 => Self::Voice,
            4 => Self::Plugin,
            5 => Self::Custom,
            other => Self::Unknown(other),
        }
    }
}

impl LefxExtensionType {
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Speaker => 0,
            Self::Language => 1,
            Self::Effect => 2,
            Self::Voice => 3,
            Self::Plugin => 4,
            Self::Custom => 5,
            Self::Unknown(v) => v,
        }
    }
}

/// Bitset occupying the header's `flags` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LefxFlags(pub u32);

impl LefxFlags {
    pub const COMPRESSED: u32 = 0x1;
    pub const HAS_PLUGIN_DATA: u32 = 0x2;

    pub fn is_compressed(self) -> bool {
        self.0 & Self::COMPRESSED != 0
    }

    pub fn has_plugin_data(self) -> bool {
        self.0 & Self::HAS_PLUGIN_DATA != 0
    }
}

/// The fixed header at offset 0 of every LEFX file.
#[derive(Debug, Clone, Copy)]
pub struct LefxHeader {
    pub magic: u32,
    pub version_major: u16,
    pub version_minor: u16,
    pub extension_type: LefxExtensionType,
    pub extension_id: u32,
    pub flags: LefxFlags,
    pub file_size: u32,
    pub timestamp: u32,
    pub base_model_hash: u32,
    pub base_version_min: (u16, u16),
    pub base_version_max: (u16, u16),
    pub required_base_size: u32,
    pub meta_offset: u32,
    pub dependencies_offset: u32,
    pub layer_index_offset: u32,
    pub layer_data_offset: u32,
    pub plugin_data_offset: u32,
    pub reserved: [u8; 16],
}

impl LefxHeader {
    pub fn parse(data: &[u8]) -> LefxResult<Self> {
        if data.len() < LEFX_HEADER_SIZE {
            return Err(LefxError::BufferTooSmall { needed: LEFX_HEADER_SIZE, available: data.len() });
        }

        let magic = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        if magic != LEFX_MAGIC {
            return Err(LefxError::InvalidFormat(format!("bad magic {magic:#010x}")));
        }

        let version_major = u16::from_le_bytes([data[4], data[5]]);
        let version_minor = u16::from_le_bytes([data[6], data[7]]);
        let extension_type = LefxExtensionType::from(data[8]);
        // data[9] reserved padding byte.
        let extension_id = u32::from_le_bytes([data[10], data[11], data[12], data[13]]);
        let flags = LefxFlags(u32::from_le_bytes([data[14], data[15], data[16], data[17]]));
        let file_size = u32::from_le_bytes([data[18], data[19], data[20], data[21]]);
        let timestamp = u32::from_le_bytes([data[22], data[23], data[24], data[25]]);
        let base_model_hash = u32::from_le_bytes([data[26], data[27], data[28], data[29]]);
        let base_version_min = (u16::from_le_bytes([data[30], data[31]]), u16::from_le_bytes([data[32], data[33]]));
        let base_version_max = (u16::from_le_bytes([data[34], data[35]]), u16::from_le_bytes([data[36], data[37]]));
        let required_base_size = u32::from_le_bytes([data[38], data[39], data[40], data[41]]);
        let meta_offset = u32::from_le_bytes([data[42], data[43], data[44], data[45]]);
        let dependencies_offset = u32::from_le_bytes([data[46], data[47], data[48], data[49]]);
        let layer_index_offset = u32::from_le_bytes([data[50], data[51], data[52], data[53]]);
        let layer_data_offset = u32::from_le_bytes([data[54], data[55], data[56], data[57]]);
        let plugin_data_offset = u32::from_le_bytes([data[58], data[59], data[60], data[61]]);
        let mut reserved = [0u8; 16];
        reserved.copy_from_slice(&data[62..78]);

        if layer_index_offset > layer_data_offset {
            return Err(LefxError::InvalidFormat("layer_index_offset must not exceed layer_data_offset".to_string()));
        }

        Ok(Self {
            magic,
            version_major,
            version_minor,
            extension_type,
            extension_id,
            flags,
            file_size,
            timestamp,
            base_model_hash,
            base_version_min,
            base_version_max,
            required_base_size,
            meta_offset,
            dependencies_offset,
            layer_index_offset,
            layer_data_offset,
            plugin_data_offset,
            reserved,
        })
    }

    pub fn to_bytes(&self) -> [u8; LEFX_HEADER_SIZE] {
        let mut buf = [0u8; LEFX_HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic.to_le_bytes());
        buf[4..6].copy_from_slice(&self.version_major.to_le_bytes());
        buf[6..8].copy_from_slice(&self.version_minor.to_le_bytes());
        buf[8] = self.extension_type.to_u8();
        // buf[9] stays zero: reserved padding byte.
        buf[10..14].copy_from_slice(&self.extension_id.to_le_bytes());
        buf[14..18].copy_from_slice(&self.flags.0.to_le_bytes());
        buf[18..22].copy_from_slice(&self.file_size.to_le_bytes());
        buf[22..26].copy_from_slice(&self.timestamp.to_le_bytes());
        buf[26..30].copy_from_slice(&self.base_model_hash.to_le_bytes());
        buf[30..32].copy_from_slice(&self.base_version_min.0.to_le_bytes());
        buf[32..34].copy_from_slice(&self.base_version_min.1.to_le_bytes());
        buf[34..36].copy_from_slice(&self.base_version_max.0.to_le_bytes());
        buf[36..38].copy_from_slice(&self.base_version_max.1.to_le_bytes());
        buf[38..42].copy_from_slice(&self.required_base_size.to_le_bytes());
        buf[42..46].copy_from_slice(&self.meta_offset.to_le_bytes());
        buf[46..50].copy_from_slice(&self.dependencies_offset.to_le_bytes());
        buf[50..54].copy_from_slice(&self.layer_index_offset.to_le_bytes());
        buf[54..58].copy_from_slice(&self.layer_data_offset.to_le_bytes());
        buf[58..62].copy_from_slice(&self.plugin_data_offset.to_le_bytes());
        buf[62..78].copy_from_slice(&self.reserved);
        buf
    }

    pub fn check_version_compatible(&self) -> LefxResult<()> {
        let (cur_major, cur_minor) = LEFX_CURRENT_VERSION;
        if self.version_major != cur_major || self.version_minor > cur_minor {
            return Err(LefxError::VersionIncompatible { major: self.version_major, minor: self.version_minor });
        }
        Ok(())
    }

    /// An LEFX loads against a base iff its declared `base_model_hash`
    /// matches the base's actual hash and the base's on-disk version
    /// falls within this extension's declared `[min, max]` range.
    pub fn check_compatible_with_base(&self, base_header: &LefHeader, base_meta: &ModelMeta) -> LefxResult<()> {
        let _ = base_meta;
        if self.base_model_hash != base_header.model_hash {
            return Err(LefxError::IncompatibleBase { base_hash: base_header.model_hash, expected_hash: self.base_model_hash });
        }
        let base_version = (base_header.version_major, base_header.version_minor);
        if base_version < self.base_version_min || base_version > self.base_version_max {
            return Err(LefxError::BaseVersionOutOfRange {
                base_major: base_version.0,
                base_minor: base_version.1,
                min_major: self.base_version_min.0,
                min_minor: self.base_version_min.1,
                max_major: self.base_version_max.0,
                max_minor: self.base_version_max.1,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_valid_header() -> [u8; LEFX_HEADER_SIZE] {
        let header = LefxHeader {
            magic: LEFX_MAGIC,
            version_major: 1,
            version_minor: 0,
            extension_type: LefxExtensionType::Language,
            extension_id: 7,
            flags: LefxFlags::default(),
            file_size: 4096,
            timestamp: 1_700_000_000,
            base_model_hash: 0xdead_beef,
            base_version_min: (1, 0),
            base_version_max: (1, 9),
            required_base_size: 0,
            meta_offset: LEFX_HEADER_SIZE as u32,
            dependencies_offset: 400,
            layer_index_offset: 500,
            layer_data_offset: 600,
            plugin_data_offset: 0,
            reserved: [0u8; 16],
        };
        header.to_bytes()
    }

    #[test]
    fn round_trips_through_bytes() {
        let bytes = make_valid_header();
        let header = LefxHeader::parse(&bytes).unwrap();
        assert_eq!(header.magic, LEFX_MAGIC);
        assert!(matches!(header.extension_type, LefxExtensionType::Language));
        assert_eq!(header.extension_id, 7);
        assert_eq!(header.base_version_max, (1, 9));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = make_valid_header();
        bytes[0] = 0;
        assert!(matches!(LefxHeader::parse(&bytes), Err(LefxError::InvalidFormat(_))));
    }

    #[test]
    fn compatibility_rejects_hash_mismatch() {
        let header = LefxHeader::parse(&make_valid_header()).unwrap();
        let base = LefHeader {
            magic: libetude_lef::LEF_MAGIC,
            version_major: 1,
            version_minor: 0,
            flags: libetude_lef::LefFlags::default(),
            file_size: 0,
            model_hash: 0x1111_1111,
            timestamp: 0,
            compression_dict_offset: 0,
            layer_index_offset: 0,
            layer_data_offset: 0,
            reserved: [0u8; 16],
        };
        let meta = ModelMeta::new("base", "1.0.0");
        assert!(matches!(header.check_compatible_with_base(&base, &meta), Err(LefxError::IncompatibleBase { .. })));
    }

    #[test]
    fn compatibility_rejects_version_out_of_range() {
        let header = LefxHeader::parse(&make_valid_header()).unwrap();
        let base = LefHeader {
            magic: libetude_lef::LEF_MAGIC,
            version_major: 2,
            version_minor: 0,
            flags: libetude_lef::LefFlags::default(),
            file_size: 0,
            model_hash: 0xdead_beef,
            timestamp: 0,
            compression_dict_offset: 0,
            layer_index_offset: 0,
            layer_data_offset: 0,
            reserved: [0u8; 16],
        };
        let meta = ModelMeta::new("base", "2.0.0");
        assert!(matches!(header.check_compatible_with_base(&base, &meta), Err(LefxError::BaseVersionOutOfRange { .. })));
    }
}
