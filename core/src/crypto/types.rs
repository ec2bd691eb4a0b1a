// ## 📂 File: `src/crypto/types.rs`

use thiserror::Error;

/// Tree position of the root (base) key.
pub const ROOT_POSITION: u64 = 1;

/// Key-tree failure. Fatal for the affected segment only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyDerivationError {
    /// Neither an ancestor of the leaf nor a root key is available.
    #[error("no applicable key for leaf {leaf_index}: no ancestor in the key store and no root key")]
    NoApplicableKey { leaf_index: u64 },

    /// Segment subtree position does not fit a u64.
    #[error("segment {segment_index} of {segment_count} has no tree leaf: position overflows u64")]
    LeafOverflow { segment_count: usize, segment_index: usize },

    /// Raw key material must be 16 or 32 bytes.
    #[error("invalid key material at tree position {position}: expected 16 or 32 bytes, got {len}")]
    InvalidKeyMaterial { position: u64, len: usize },

    /// Position 0 is not a tree node.
    #[error("invalid tree position {position}")]
    InvalidPosition { position: u64 },

    /// Caller-supplied hex string did not decode.
    #[error("invalid hex key material at tree position {position}: {reason}")]
    InvalidHex { position: u64, reason: String },
}

/// Segment decryption failure. Fatal for the affected segment only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecryptError {
    /// Negative or `>= segment_count`; raised before any key derivation.
    #[error("invalid segment index {index} (segment_count={segment_count})")]
    InvalidSegmentIndex { index: isize, segment_count: usize },

    #[error("key derivation failed: {0}")]
    KeyDerivation(#[from] KeyDerivationError),

    /// Block cipher rejected the key or buffer.
    #[error("cipher failure: {0}")]
    CipherFailure(String),

    /// Container buffer ends before the segment does.
    #[error("segment {index} truncated: buffer holds {have} bytes, segment ends at {need}")]
    Truncated { index: usize, have: usize, need: u64 },
}
