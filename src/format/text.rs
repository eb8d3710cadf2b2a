//! Fixed-width, NUL-padded text fields

/// Write `value` into `dest`, NUL padded.
///
/// At most `dest.len() - 1` bytes are copied so the field always ends with a NUL, and a
/// multi-byte character is never split. Returns `true` when the value was truncated.
pub fn write_fixed(dest: &mut [u8], value: &str) -> bool {
    let kept = truncate_fixed(value, dest.len());
    dest.fill(0);
    dest[..kept.len()].copy_from_slice(kept.as_bytes());
    kept.len() < value.len()
}

/// The part of `value` that `write_fixed` stores in a field of `field_len` bytes
pub fn truncate_fixed(value: &str, field_len: usize) -> &str {
    let mut end = value.len().min(field_len.saturating_sub(1));
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// Read a NUL-terminated field, replacing invalid UTF-8
pub fn read_fixed(src: &[u8]) -> String {
    let end = src.iter().position(|&b| b == 0).unwrap_or(src.len());
    String::from_utf8_lossy(&src[..end]).into_owned()
}

/// Whether `value` fits a field of `field_len` bytes without truncation
pub fn fits_fixed(value: &str, field_len: usize) -> bool {
    value.len() < field_len
}
