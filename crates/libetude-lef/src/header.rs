//! LEF file header: the first 56 bytes of any LEF container.
//!
//! Layout mirrors a packed C struct, little-endian, no implicit padding —
//! parsed the same way as an ELF64 header: fixed field slices through
//! `u32::from_le_bytes`, never a `#[repr(C)]` transmute.

use crate::error::{LefError, LefResult};

/// `'LEED'` read as a little-endian u32.
pub const LEF_MAGIC: u32 = 0x4445_454C;

/// The version this crate writes and fully supports.
pub const LEF_CURRENT_VERSION: (u16, u16) = (1, 0);

/// Fixed on-disk size of [`LefHeader`].
pub const LEF_HEADER_SIZE: usize = 56;

/// Bitset occupying the header's `flags` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LefFlags(pub u32);

impl LefFlags {
    pub const COMPRESSED: u32 = 0x1;
    pub const QUANTIZED: u32 = 0x2;
    pub const EXTENDED: u32 = 0x4;
    pub const STREAMING: u32 = 0x8;
    pub const ENCRYPTED: u32 = 0x10;
    pub const DIFFERENTIAL: u32 = 0x20;

    pub fn is_compressed(self) -> bool {
        self.0 & Self::COMPRESSED != 0
    }

    pub fn is_quantized(self) -> bool {
        self.0 & Self::QUANTIZED != 0
    }

    pub fn is_extended(self) -> bool {
        self.0 & Self::EXTENDED != 0
    }

    pub fn is_streaming(self) -> bool {
        self.0 & Self::STREAMING != 0
    }

    pub fn is_encrypted(self) -> bool {
        self.0 & Self::ENCRYPTED != 0
    }

    pub fn is_differential(self) -> bool {
        self.0 & Self::DIFFERENTIAL != 0
    }
}

/// The 56-byte fixed header at offset 0 of every LEF file.
///
/// [`crate::meta::ModelMeta`] immediately follows at offset
/// [`LEF_HEADER_SIZE`] — its size isn't carried in the header because a
/// fixed-layout `ModelMeta` has a size known at parse time.
#[derive(Debug, Clone, Copy)]
pub struct LefHeader {
    pub magic: u32,
    pub version_major: u16,
    pub version_minor: u16,
    pub flags: LefFlags,
    pub file_size: u32,
    pub model_hash: u32,
    pub timestamp: u32,
    pub compression_dict_offset: u32,
    pub layer_index_offset: u32,
    pub layer_data_offset: u32,
    pub reserved: [u8; 16],
}

impl LefHeader {
    pub fn parse(data: &[u8]) -> LefResult<Self> {
        if data.len() < LEF_HEADER_SIZE {
            return Err(LefError::BufferTooSmall { needed: LEF_HEADER_SIZE, available: data.len() });
        }

        let magic = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        if magic != LEF_MAGIC {
            return Err(LefError::InvalidFormat(format!("bad magic {magic:#010x}")));
        }

        let version_major = u16::from_le_bytes([data[4], data[5]]);
        let version_minor = u16::from_le_bytes([data[6], data[7]]);
        let flags = LefFlags(u32::from_le_bytes([data[8], data[9], data[10], data[11]]));
        let file_size = u32::from_le_bytes([data[12], data[13], data[14], data[15]]);
        let model_hash = u32::from_le_bytes([data[16], data[17], data[18], data[19]]);
        let timestamp = u32::from_le_bytes([data[20], data[21], data[22], data[23]]);
        let compression_dict_offset = u32::from_le_bytes([data[24], data[25], data[26], data[27]]);
        let layer_index_offset = u32::from_le_bytes([data[28], data[29], data[30], data[31]]);
        let layer_data_offset = u32::from_le_bytes([data[32], data[33], data[34], data[35]]);
        let mut reserved = [0u8; 16];
        reserved.copy_from_slice(&data[36..52]);

        if layer_index_offset > layer_data_offset {
            return Err(LefError::InvalidFormat("layer_index_offset must not exceed layer_data_offset".to_string()));
        }

        Ok(Self {
            magic,
            version_major,
            version_minor,
            flags,
            file_size,
            model_hash,
            timestamp,
            compression_dict_offset,
            layer_index_offset,
            layer_data_offset,
            reserved,
        })
    }

    pub fn to_bytes(&self) -> [u8; LEF_HEADER_SIZE] {
        let mut buf = [0u8; LEF_HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic.to_le_bytes());
        buf[4..6].copy_from_slice(&self.version_major.to_le_bytes());
        buf[6..8].copy_from_slice(&self.version_minor.to_le_bytes());
        buf[8..12].copy_from_slice(&self.flags.0.to_le_bytes());
        buf[12..16].copy_from_slice(&self.file_size.to_le_bytes());
        buf[16..20].copy_from_slice(&self.model_hash.to_le_bytes());
        buf[20..24].copy_from_slice(&self.timestamp.to_le_bytes());
        buf[24..28].copy_from_slice(&self.compression_dict_offset.to_le_bytes());
        buf[28..32].copy_from_slice(&self.layer_index_offset.to_le_bytes());
        buf[32..36].copy_from_slice(&self.layer_data_offset.to_le_bytes());
        buf[36..52].copy_from_slice(&self.reserved);
        // buf[52..56] stays zero: reserved tail, MUST be zero on write.
        buf
    }

    /// Major version must match exactly; a smaller minor on the reader's
    /// side than the file's is the only other rejected combination (the
    /// reader can't understand fields it predates).
    pub fn check_version_compatible(&self) -> LefResult<()> {
        let (cur_major, cur_minor) = LEF_CURRENT_VERSION;
        if self.version_major != cur_major || self.version_minor > cur_minor {
            return Err(LefError::VersionIncompatible { major: self.version_major, minor: self.version_minor });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_valid_header() -> [u8; LEF_HEADER_SIZE] {
        let header = LefHeader {
            magic: LEF_MAGIC,
            version_major: 1,
            version_minor: 0,
            flags: LefFlags(LefFlags::COMPRESSED),
            file_size: 1024,
            model_hash: 0xdead_beef,
            timestamp: 1_700_000_000,
            compression_dict_offset: 0,
            layer_index_offset: 500,
            layer_data_offset: 600,
            reserved: [0u8; 16],
        };
        header.to_bytes()
    }

    #[test]
    fn round_trips_through_bytes() {
        let bytes = make_valid_header();
        let header = LefHeader::parse(&bytes).unwrap();
        assert_eq!(header.magic, LEF_MAGIC);
        assert_eq!((header.version_major, header.version_minor), (1, 0));
        assert!(header.flags.is_compressed());
        assert!(!header.flags.is_encrypted());
        assert_eq!(header.layer_index_offset, 500);
        assert_eq!(header.layer_data_offset, 600);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = make_valid_header();
        bytes[0] = 0;
        assert!(matches!(LefHeader::parse(&bytes), Err(LefError::InvalidFormat(_))));
    }

    #[test]
    fn rejects_buffer_too_small() {
        let bytes = [0u8; 10];
        assert!(matches!(LefHeader::parse(&bytes), Err(LefError::BufferTooSmall { needed: LEF_HEADER_SIZE, available: 10 })));
    }

    #[test]
    fn version_check_rejects_major_mismatch() {
        let mut bytes = make_valid_header();
        bytes[4..6].copy_from_slice(&2u16.to_le_bytes());
        let header = LefHeader::parse(&bytes).unwrap();
        assert!(matches!(header.check_version_compatible(), Err(LefError::VersionIncompatible { .. })));
    }

    #[test]
    fn version_check_accepts_older_minor() {
        let bytes = make_valid_header();
        let header = LefHeader::parse(&bytes).unwrap();
        assert!(header.check_version_compatible().is_ok());
    }
}
