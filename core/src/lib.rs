//! seglock-core
//!
//! Decoder for segmented, per-segment-keyed media containers.
//! Pure byte-buffer API: no file or network I/O.

#![forbid(unsafe_code)]

// Shared and top level
pub mod constants;
pub mod types;
pub mod utils;
pub mod config;

// Container format
pub mod metadata;
pub mod container;

// Keys and ciphers
pub mod crypto;
pub mod segment;

// Whole-container driver
pub mod pipeline;
pub mod telemetry;

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::config::{DecoderConfig, ParallelismProfile};
    pub use crate::container::{parse, CipherFamily, ContainerBuilder, ContainerHeader, ParseError, SegmentBoundary};
    pub use crate::crypto::{derive_key, derive_key_with_base, segment_leaf_index, DecryptError, KeyDerivationError, KeyStore};
    pub use crate::pipeline::{decrypt_container, ContainerReport};
    pub use crate::segment::{decrypt_segment, SegmentDecryptor, SegmentRequest, SegmentResult};
    pub use crate::telemetry::TelemetrySnapshot;
    pub use crate::types::UnlockError;
}
