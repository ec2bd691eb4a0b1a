//! container/types.rs
//! Parsed container header and its typed views.

use std::ops::Range;

use bytes::Bytes;
use num_enum::TryFromPrimitive;
use thiserror::Error;

use crate::constants::MAGIC_MSC1;
use crate::metadata::{Metadata, MetadataError};
use crate::utils::fmt_bytes;

/// Block cipher family, selected by the length of the container base key.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, TryFromPrimitive)]
pub enum CipherFamily {
    Aes128 = 16,
    Aes256 = 32,
}

impl CipherFamily {
    pub fn from_key_len(len: usize) -> Option<Self> {
        u8::try_from(len)
            .ok()
            .and_then(|raw| Self::try_from_primitive(raw).ok())
    }

    /// Cipher key size in bytes.
    pub fn key_len(self) -> usize {
        self as usize
    }
}

/// One entry of the segment table.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SegmentBoundary {
    /// Absolute byte offset of the segment inside the container.
    pub offset: u64,
    /// Presentation timestamp of the segment start.
    pub timestamp_ms: u64,
}

/// Immutable result of [`parse`](crate::container::parse).
///
/// `segments` always ends with a sentinel whose offset is `total_length` and
/// whose timestamp is the declared total duration. It is not a real segment.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerHeader {
    pub total_length: u64,
    pub header_length: u64,
    pub extra_length: u64,
    pub metadata: Metadata,
    pub segments: Vec<SegmentBoundary>,
    pub base_key: Bytes,
    pub cipher: CipherFamily,
}

impl ContainerHeader {
    /// Number of real segments (sentinel excluded).
    pub fn segment_count(&self) -> usize {
        self.segments.len().saturating_sub(1)
    }

    /// Declared total duration, taken from the sentinel.
    pub fn duration_ms(&self) -> u64 {
        self.segments.last().map(|s| s.timestamp_ms).unwrap_or(0)
    }

    /// First byte after the auxiliary region.
    pub fn payload_offset(&self) -> u64 {
        self.header_length + self.extra_length
    }

    /// Absolute byte range of real segment `index`.
    pub fn segment_range(&self, index: usize) -> Option<Range<u64>> {
        if index >= self.segment_count() {
            return None;
        }
        Some(self.segments[index].offset..self.segments[index + 1].offset)
    }

    pub fn segment_len(&self, index: usize) -> Option<u64> {
        self.segment_range(index).map(|r| r.end - r.start)
    }

    /// Duration covered by real segment `index`. Saturates if timestamps go backwards.
    pub fn segment_duration_ms(&self, index: usize) -> Option<u64> {
        if index >= self.segment_count() {
            return None;
        }
        Some(self.segments[index + 1].timestamp_ms.saturating_sub(self.segments[index].timestamp_ms))
    }

    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        format!(
            "total_length={} header_length={} extra_length={} segments={} duration_ms={} cipher={:?}",
            self.total_length,
            self.header_length,
            self.extra_length,
            self.segment_count(),
            self.duration_ms(),
            self.cipher,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentTableError {
    /// Table byte string is not a whole number of 8-byte entries.
    #[error("segment table length {len} is not a multiple of 8")]
    Misaligned { len: usize },

    /// At least one real segment is required.
    #[error("segment table is empty")]
    Empty,

    /// Offsets (sentinel included) must be strictly increasing.
    #[error("segment {index} offset {offset} does not follow previous offset {previous}")]
    NotIncreasing { index: usize, previous: u64, offset: u64 },

    /// First segment starts inside the header or the auxiliary region.
    #[error("segment 0 offset {offset} is before the payload start {payload_offset}")]
    BeforePayload { offset: u64, payload_offset: u64 },

    /// `segmentCount` disagrees with the table.
    #[error("segmentCount field declares {declared} segments, table holds {actual}")]
    CountMismatch { declared: u32, actual: usize },
}

fn describe_base_key(found_len: &Option<usize>) -> String {
    match found_len {
        Some(len) => format!("unsupported length {}", len),
        None => "field absent or not a byte string".to_string(),
    }
}

/// Container-level failure. Fatal for the whole container.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Buffer shorter than the fixed prefix or the declared header.
    #[error("container buffer too short: {have} < {need}")]
    BufferTooShort { have: usize, need: usize },

    #[error("invalid magic: expected {}, got {}", fmt_bytes(&MAGIC_MSC1), fmt_bytes(have))]
    InvalidMagic { have: [u8; 4] },

    /// Length fields contradict each other.
    #[error("invalid container layout: {0}")]
    InvalidLayout(String),

    #[error("metadata decode error: {0}")]
    MetadataDecode(#[from] MetadataError),

    #[error("segment table error: {0}")]
    SegmentTable(#[from] SegmentTableError),

    /// Base key missing, mistyped, or neither 16 nor 32 bytes.
    #[error("missing base key: {}", describe_base_key(found_len))]
    MissingBaseKey { found_len: Option<usize> },
}
