// ### `src/telemetry/counters.rs`

//! telemetry/counters.rs
//! Mutable counters collected while decrypting segments.
//!
//! Summary: one instance per worker, merged into the pipeline total at the end.
//! Converted into an immutable `TelemetrySnapshot` once the run finishes.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryCounters {
    pub segments_ok: u64,
    pub segments_failed: u64,
    pub bytes_ciphertext: u64,
    pub bytes_plaintext: u64,
    /// Bytes appended before decryption and dropped after.
    pub bytes_padding: u64,
    pub keys_derived: u64,
    pub cache_hits: u64,
}

impl TelemetryCounters {
    /// Record one decrypted segment.
    pub fn add_segment(&mut self, ct_len: usize, pt_len: usize, pad_len: usize) {
        self.segments_ok += 1;
        self.bytes_ciphertext += ct_len as u64;
        self.bytes_plaintext += pt_len as u64;
        self.bytes_padding += pad_len as u64;
    }

    /// Record one segment that failed derivation or decryption.
    pub fn add_failure(&mut self, ct_len: usize) {
        self.segments_failed += 1;
        self.bytes_ciphertext += ct_len as u64;
    }

    pub fn add_key_derived(&mut self) {
        self.keys_derived += 1;
    }

    pub fn segments_total(&self) -> u64 {
        self.segments_ok + self.segments_failed
    }

    pub fn merge(&mut self, other: &TelemetryCounters) {
        self.segments_ok += other.segments_ok;
        self.segments_failed += other.segments_failed;
        self.bytes_ciphertext += other.bytes_ciphertext;
        self.bytes_plaintext += other.bytes_plaintext;
        self.bytes_padding += other.bytes_padding;
        self.keys_derived += other.keys_derived;
        self.cache_hits += other.cache_hits;
    }
}

impl AddAssign for TelemetryCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(&rhs);
    }
}
