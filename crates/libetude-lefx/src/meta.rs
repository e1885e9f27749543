//! Extension metadata: fixed-size strings stored at `meta_offset`,
//! mirroring `libetude_lef::ModelMeta`'s layout discipline.

use crate::error::LefxResult;
use crate::util::{read_fixed, write_fixed};

pub const NAME_LEN: usize = 64;
pub const VERSION_LEN: usize = 16;
pub const AUTHOR_LEN: usize = 64;
pub const DESCRIPTION_LEN: usize = 128;
pub const BASE_MODEL_NAME_LEN: usize = 64;

/// Extension-level metadata: who wrote it, what it's for, and which
/// base model it names for diagnostics (the binding authority is
/// `LefxHeader::base_model_hash`, not this string).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LefxMeta {
    pub name: String,
    pub version: String,
    pub author: String,
    pub description: String,
    pub base_model_name: String,
}

impl LefxMeta {
    pub const SIZE: usize = NAME_LEN + VERSION_LEN + AUTHOR_LEN + DESCRIPTION_LEN + BASE_MODEL_NAME_LEN;

    pub fn new(name: impl Into<String>, version: impl Into<String>, base_model_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            author: String::new(),
            description: String::new(),
            base_model_name: base_model_name.into(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        write_fixed(&mut buf, &self.name, NAME_LEN);
        write_fixed(&mut buf, &self.version, VERSION_LEN);
        write_fixed(&mut buf, &self.author, AUTHOR_LEN);
        write_fixed(&mut buf, &self.description, DESCRIPTION_LEN);
        write_fixed(&mut buf, &self.base_model_name, BASE_MODEL_NAME_LEN);
        debug_assert_eq!(buf.len(), Self::SIZE);
        buf
    }

    pub fn parse(data: &[u8]) -> LefxResult<Self> {
        if data.len() < Self::SIZE {
            return Err(crate::error::LefxError::BufferTooSmall { needed: Self::SIZE, available: data.len() });
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
        let base_model_name = read_fixed(take(BASE_MODEL_NAME_LEN));
        Ok(Self { name, version, author, description, base_model_name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let mut meta = LefxMeta::new("Korean speaker pack", "1.2.0", "BaseTTS");
        meta.author = "libetude".to_string();
        let bytes = meta.to_bytes();
        assert_eq!(bytes.len(), LefxMeta::SIZE);
        let parsed = LefxMeta::parse(&bytes).unwrap();
        assert_eq!(parsed, meta);
    }

    #[test]
    fn truncates_overlong_strings_without_overrunning_fixed_width() {
        let long_name = "x".repeat(NAME_LEN + 50);
        let meta = LefxMeta::new(long_name, "1.0.0", "base");
        let bytes = meta.to_bytes();
        assert_eq!(bytes.len(), LefxMeta::SIZE);
    }
}
