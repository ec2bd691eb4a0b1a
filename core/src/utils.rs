
/// `ceil(log2(n))`, with `ceil_log2(0) == ceil_log2(1) == 0`.
#[inline]
pub fn ceil_log2(n: u64) -> u32 {
    if n <= 1 {
        0
    } else {
        u64::BITS - (n - 1).leading_zeros()
    }
}

/// `floor(log2(n))`, with `floor_log2(0) == 0`.
#[inline]
pub fn floor_log2(n: u64) -> u32 {
    if n == 0 {
        0
    } else {
        u64::BITS - 1 - n.leading_zeros()
    }
}

/// Printable form of a short byte string: ASCII as-is, anything else as hex.
pub fn fmt_bytes(b: &[u8]) -> String {
    if b.iter().all(|&c| c.is_ascii_graphic() || c == b' ') {
        format!("b\"{}\"", String::from_utf8_lossy(b))
    } else {
        format!("0x{}", hex::encode(b))
    }
}

// Helper function to flatten segments into a single plaintext blob
pub fn concat_segments(segments: &[impl AsRef<[u8]>]) -> Vec<u8> {
    let total = segments.iter().map(|s| s.as_ref().len()).sum();
    let mut out = Vec::with_capacity(total);
    for segment in segments {
        out.extend_from_slice(segment.as_ref());
    }
    out
}
