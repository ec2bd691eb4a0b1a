//! metadata/mod.rs
//! Structured-metadata blob embedded in the container header.
//!
//! Wire notes:
//! - Bencode: `i<int>e`, `<len>:<bytes>`, `l...e`, `d...e`.
//! - Dictionary keys are byte strings sorted in raw byte order, no duplicates.
//! - The decoder is strict: anything a canonical encoder would not emit is rejected.

pub mod types;
pub mod decode;
pub mod encode;

pub use types::*;
pub use decode::*;
pub use encode::*;
