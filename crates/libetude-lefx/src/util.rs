//! Fixed-width null-padded string helpers shared by `meta.rs` and
//! `dependency.rs` — same truncate-or-pad-on-write,
//! trim-at-first-null-on-read convention as `libetude_lef::meta`.

pub(crate) fn write_fixed(buf: &mut Vec<u8>, s: &str, len: usize) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(len);
    buf.extend_from_slice(&bytes[..n]);
    buf.resize(buf.len() + (len - n), 0);
}

pub(crate) fn read_fixed(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned()
}
