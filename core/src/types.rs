// ## 📂 File: `src/types.rs`

use thiserror::Error;

use crate::config::ConfigError;
use crate::container::ParseError;
use crate::crypto::{DecryptError, KeyDerivationError};

/// Unified decoder error covering config, parse (metadata included), key derivation and decryption.
/// - `From<T>` impls let `?` cross module boundaries.
/// - Per-segment failures normally stay inside `SegmentResult`; they only
///   surface here when a caller asks for the whole plaintext.
#[derive(Debug, Error)]
pub enum UnlockError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Malformed container. Fatal for the whole container.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("key derivation error: {0}")]
    KeyDerivation(#[from] KeyDerivationError),

    #[error("decrypt error: {0}")]
    Decrypt(#[from] DecryptError),

    /// Worker thread or channel failure.
    #[error("pipeline error: {0}")]
    Pipeline(&'static str),
}
