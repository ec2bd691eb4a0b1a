// # 📂 `src/segment/decrypt.rs`

use bytes::Bytes;
use tracing::trace;

use crate::container::ContainerHeader;
use crate::crypto::{
    cipher_key, decrypt_unaligned, segment_leaf_offset, DecryptError, DerivedKeyCache, KeyDerivationError, KeyDeriver,
    KeyStore,
};
use crate::segment::types::{SegmentRequest, SegmentResult};

/// Decrypt one segment's ciphertext.
///
/// `segment_index` is signed so callers holding untrusted indices get
/// `InvalidSegmentIndex` for negatives instead of a wrapped value. The index
/// is checked before any key derivation.
///
/// Errors:
/// - `InvalidSegmentIndex` if `segment_index < 0` or `>= header.segment_count()`.
/// - `KeyDerivation` if no key covers the segment's leaf.
/// - `CipherFailure` if the cipher rejects the derived key.
pub fn decrypt_segment(
    store: &KeyStore,
    header: &ContainerHeader,
    segment_index: isize,
    ciphertext: &[u8],
) -> Result<Bytes, DecryptError> {
    let index = usize::try_from(segment_index)
        .ok()
        .filter(|&i| i < header.segment_count())
        .ok_or(DecryptError::InvalidSegmentIndex {
            index: segment_index,
            segment_count: header.segment_count(),
        })?;

    SegmentDecryptor::new(store, header).decrypt(index, ciphertext)
}

/// Slice segment `index` out of a full-container buffer.
pub fn segment_ciphertext<'a>(
    raw: &'a [u8],
    header: &ContainerHeader,
    index: usize,
) -> Result<&'a [u8], DecryptError> {
    let range = header
        .segment_range(index)
        .ok_or_else(|| invalid_index(index, header.segment_count()))?;

    if (raw.len() as u64) < range.end {
        return Err(DecryptError::Truncated { index, have: raw.len(), need: range.end });
    }
    // Offsets come from u32 wire fields.
    Ok(&raw[range.start as usize..range.end as usize])
}

/// Per-container decryption context: header, key store, root fallback and optional cache.
///
/// Cheap to copy into worker threads by reference; holds no mutable state of its own.
#[derive(Debug, Clone, Copy)]
pub struct SegmentDecryptor<'a> {
    header: &'a ContainerHeader,
    keys: KeyDeriver<'a>,
    leaf_offset: Option<u64>,
}

impl<'a> SegmentDecryptor<'a> {
    pub fn new(store: &'a KeyStore, header: &'a ContainerHeader) -> Self {
        Self {
            header,
            keys: KeyDeriver::new(store).with_base_key(&header.base_key),
            leaf_offset: segment_leaf_offset(header.segment_count()),
        }
    }

    pub fn with_cache(mut self, cache: &'a DerivedKeyCache) -> Self {
        self.keys = self.keys.with_cache(cache);
        self
    }

    pub fn header(&self) -> &'a ContainerHeader {
        self.header
    }

    /// Key-tree leaf of segment `index`, `None` if the position overflows u64.
    pub fn leaf_index(&self, index: usize) -> Option<u64> {
        self.leaf_offset?.checked_add(index as u64)
    }

    /// Derived key of segment `segment_index` (full hash width, not yet truncated).
    pub fn segment_key(&self, segment_index: usize) -> Result<Bytes, DecryptError> {
        if segment_index >= self.header.segment_count() {
            return Err(invalid_index(segment_index, self.header.segment_count()));
        }
        let leaf = self.leaf_index(segment_index).ok_or(KeyDerivationError::LeafOverflow {
            segment_count: self.header.segment_count(),
            segment_index,
        })?;
        Ok(self.keys.derive(leaf)?)
    }

    /// Decrypt with an already derived segment key.
    pub fn decrypt_with_key(&self, derived: &[u8], ciphertext: &[u8]) -> Result<Bytes, DecryptError> {
        let key = cipher_key(self.header.cipher, derived)?;
        let plaintext = decrypt_unaligned(self.header.cipher, key, ciphertext)?;
        Ok(Bytes::from(plaintext))
    }

    pub fn decrypt(&self, segment_index: usize, ciphertext: &[u8]) -> Result<Bytes, DecryptError> {
        let derived = self.segment_key(segment_index)?;
        let plaintext = self.decrypt_with_key(&derived, ciphertext)?;

        trace!(segment_index, leaf = ?self.leaf_index(segment_index), len = ciphertext.len(), "decrypted segment");
        Ok(plaintext)
    }

    /// Locate segment `index` in a full-container buffer, then decrypt it.
    pub fn decrypt_in(&self, raw: &[u8], segment_index: usize) -> Result<Bytes, DecryptError> {
        let ciphertext = segment_ciphertext(raw, self.header, segment_index)?;
        self.decrypt(segment_index, ciphertext)
    }

    pub fn decrypt_request(&self, request: &SegmentRequest) -> SegmentResult {
        SegmentResult {
            segment_index: request.segment_index,
            outcome: self.decrypt(request.segment_index, &request.ciphertext),
        }
    }
}

fn invalid_index(index: usize, segment_count: usize) -> DecryptError {
    DecryptError::InvalidSegmentIndex {
        index: isize::try_from(index).unwrap_or(isize::MAX),
        segment_count,
    }
}
