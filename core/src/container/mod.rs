//! container/mod.rs
//! Container header: fixed little-endian prefix, bencoded metadata, segment table.
//!
//! Layout notes:
//! - 16-byte fixed prefix: magic, total_length, header_length, extra_length (u32 LE each).
//! - Metadata occupies `[16, header_length)`; an opaque auxiliary region follows.
//! - Segment ciphertexts start at `header_length + extra_length`, boundaries come
//!   from the metadata segment table plus a synthetic end-of-stream sentinel.
//! - No integrity protection exists in the format; parsing validates structure only.

pub mod types;
pub mod encode;
pub mod decode;

pub use types::*;
pub use encode::*;
pub use decode::*;
