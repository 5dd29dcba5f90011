/// Decodes a fixed-width, null-terminated ASCII name field.
///
/// Both TXD (32-byte texture names) and COL (22-byte model names) store
/// names this way. Bytes after the first null are ignored; some tools
/// leave garbage there.
pub fn read_fixed_string(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    raw[..end]
        .iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' })
        .collect()
}

/// Encodes a name into a fixed-width, null-padded field.
/// Truncates to `N - 1` bytes so the terminator always fits.
pub fn write_fixed_string<const N: usize>(name: &str) -> [u8; N] {
    let mut out = [0u8; N];
    for (slot, byte) in out.iter_mut().zip(name.bytes().take(N - 1)) {
        *slot = byte;
    }
    out
}
