use bytes::Bytes;

use crate::crypto::DecryptError;

/// One unit of work: which segment, and its raw ciphertext.
#[derive(Debug, Clone)]
pub struct SegmentRequest {
    pub segment_index: usize,
    pub ciphertext: Bytes, // 🔥 shared, sliceable
}

/// Outcome for one segment. Failures stay per-segment.
#[derive(Debug, Clone)]
pub struct SegmentResult {
    pub segment_index: usize,
    pub outcome: Result<Bytes, DecryptError>,
}

impl SegmentResult {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn plaintext(&self) -> Option<&Bytes> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&DecryptError> {
        self.outcome.as_ref().err()
    }
}
