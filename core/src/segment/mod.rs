//! Segment-level decryption.
//!
//! A segment is one independently keyed chunk of the stream. Decrypting it:
//! - locates its leaf in the reserved segment subtree
//! - derives the leaf key (optionally through a shared cache)
//! - runs zero-IV CBC over the input-padded ciphertext
//!
//! Calls are:
//! - CPU-bound
//! - Stateless between segments
//! - Fully parallelizable

pub mod types;
pub mod decrypt;

pub use types::{SegmentRequest, SegmentResult};
pub use decrypt::{decrypt_segment, segment_ciphertext, SegmentDecryptor};
