// ## 📂 File: `src/crypto/cbc_mode.rs`

//! crypto/cbc_mode.rs
//! AES-CBC with an all-zero IV over input-padded segment ciphertext.
//!
//! Design notes:
//! - Segment boundaries are not block aligned, so the ciphertext is padded
//!   PKCS#7-style *before* decryption and the same byte count is dropped after.
//! - Cipher unpadding is disabled (`NoPadding`); the caller owns the length.
//! - No authentication: output is not tamper-evident.

use aes::{Aes128, Aes256};
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, KeyIvInit};

use crate::constants::BLOCK_LEN;
use crate::container::CipherFamily;
use crate::crypto::types::DecryptError;

type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Bytes appended before decryption: `1..=16`, a full block when already aligned.
#[inline]
pub fn padding_len(len: usize) -> usize {
    BLOCK_LEN - (len % BLOCK_LEN)
}

/// Right-pad `ciphertext` to a block multiple with bytes equal to the pad length.
/// Returns the padded buffer and the pad length.
pub fn pad_block(ciphertext: &[u8]) -> (Vec<u8>, usize) {
    let pad = padding_len(ciphertext.len());
    let mut buf = Vec::with_capacity(ciphertext.len() + pad);
    buf.extend_from_slice(ciphertext);
    buf.resize(ciphertext.len() + pad, pad as u8);
    (buf, pad)
}

/// Cipher key for `cipher`: the leading `key_len()` bytes of a derived key.
pub fn cipher_key(cipher: CipherFamily, derived: &[u8]) -> Result<&[u8], DecryptError> {
    derived.get(..cipher.key_len()).ok_or_else(|| {
        DecryptError::CipherFailure(format!(
            "{:?} needs a {}-byte key, derived key has {} bytes",
            cipher,
            cipher.key_len(),
            derived.len()
        ))
    })
}

/// In-place CBC decryption with a zero IV. `buf` must be block aligned.
pub fn decrypt_cbc_zero_iv(cipher: CipherFamily, key: &[u8], buf: &mut [u8]) -> Result<(), DecryptError> {
    let iv = [0u8; BLOCK_LEN];
    let result = match cipher {
        CipherFamily::Aes128 => Aes128CbcDec::new_from_slices(key, &iv)
            .map_err(|_| invalid_key(cipher, key.len()))?
            .decrypt_padded_mut::<NoPadding>(buf)
            .map(|_| ()),
        CipherFamily::Aes256 => Aes256CbcDec::new_from_slices(key, &iv)
            .map_err(|_| invalid_key(cipher, key.len()))?
            .decrypt_padded_mut::<NoPadding>(buf)
            .map(|_| ()),
    };
    result.map_err(|_| DecryptError::CipherFailure(format!("buffer length {} is not block aligned", buf.len())))
}

/// Pad, decrypt, strip: returns exactly `ciphertext.len()` plaintext bytes.
pub fn decrypt_unaligned(cipher: CipherFamily, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, DecryptError> {
    let (mut buf, pad) = pad_block(ciphertext);
    decrypt_cbc_zero_iv(cipher, key, &mut buf)?;
    buf.truncate(buf.len() - pad);
    Ok(buf)
}

fn invalid_key(cipher: CipherFamily, len: usize) -> DecryptError {
    DecryptError::CipherFailure(format!("invalid {:?} key length {}", cipher, len))
}
