
/// Magic marker at offset 0 of every container.
/// "MSC1" = Media Segmented Container v1
pub const MAGIC_MSC1: [u8; 4] = *b"MSC1";

/// Fixed prefix: magic + total_length + header_length + extra_length.
pub const FIXED_HEADER_LEN: usize = 16;

/// Byte offsets of the little-endian u32 fields in the fixed prefix.
pub mod offsets {
    pub const MAGIC: usize         = 0;
    pub const TOTAL_LENGTH: usize  = 4;
    pub const HEADER_LENGTH: usize = 8;
    pub const EXTRA_LENGTH: usize  = 12;
    pub const METADATA: usize      = 16;
}

/// Metadata dictionary keys consumed by the parser.
pub mod fields {
    pub const SEGMENTS: &str      = "segments";
    pub const DURATION_MS: &str   = "durationMs";
    pub const SEGMENT_COUNT: &str = "segmentCount";
    pub const BASE_KEY: &str      = "baseKey";
}

/// One segment table entry: (offset: u32, timestamp: u32), little-endian.
pub const SEGMENT_ENTRY_LEN: usize = 8;

/// Cipher block size (AES).
pub const BLOCK_LEN: usize = 16;

/// Raw key lengths accepted for tree positions and the container base key.
pub const KEY_LEN_16: usize = 16;
pub const KEY_LEN_32: usize = 32;

/// Deepest list/dict nesting the metadata decoder accepts.
pub const MAX_METADATA_DEPTH: usize = 64;

/// Pipeline defaults when `DecoderConfig` leaves them unset.
pub const DEFAULT_INFLIGHT_SEGMENTS: usize = 64;
pub const MAX_WORKERS: usize = 256;
