//! container/encode.rs
//!
//! Container writer, the inverse of `decode.rs`.
//!
//! Design notes:
//! - The segment table is a fixed-width byte string, so the metadata length does not
//!   depend on the offset values. Layout is computed once, then offsets are filled in.
//! - All length fields are u32 on the wire; oversize output is rejected, never truncated.
//! - Segment payloads are written as given. Producing real ciphertext is the caller's job.

use byteorder::{ByteOrder, LittleEndian};

use crate::constants::{fields, offsets, FIXED_HEADER_LEN, MAGIC_MSC1, SEGMENT_ENTRY_LEN};
use crate::container::types::{CipherFamily, ParseError, SegmentTableError};
use crate::metadata::{encode_metadata, Dict, Metadata, Value};

/// Builds a container byte buffer segment by segment.
#[derive(Debug, Clone)]
pub struct ContainerBuilder {
    base_key: Vec<u8>,
    extra: Vec<u8>,
    segments: Vec<(u32, Vec<u8>)>,
    duration_ms: Option<u32>,
    extra_fields: Dict,
    declare_segment_count: bool,
}

impl ContainerBuilder {
    pub fn new(base_key: &[u8]) -> Self {
        Self {
            base_key: base_key.to_vec(),
            extra: Vec::new(),
            segments: Vec::new(),
            duration_ms: None,
            extra_fields: Dict::new(),
            declare_segment_count: true,
        }
    }

    /// Append one segment: its start timestamp and its payload bytes.
    pub fn segment(mut self, timestamp_ms: u32, payload: impl Into<Vec<u8>>) -> Self {
        self.segments.push((timestamp_ms, payload.into()));
        self
    }

    /// Total duration written to the metadata. Defaults to the last segment timestamp.
    pub fn duration_ms(mut self, duration_ms: u32) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Opaque auxiliary region between header and payload.
    pub fn extra(mut self, extra: impl Into<Vec<u8>>) -> Self {
        self.extra = extra.into();
        self
    }

    /// Additional metadata field. Reserved field names are overwritten by `build`.
    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.extra_fields.insert(key.to_string(), value);
        self
    }

    /// Leave out the optional `segmentCount` field.
    pub fn omit_segment_count(mut self) -> Self {
        self.declare_segment_count = false;
        self
    }

    /// Serialize the container.
    ///
    /// # Errors
    /// - `MissingBaseKey` if the base key is not 16 or 32 bytes.
    /// - `SegmentTable(Empty)` without segments.
    /// - `InvalidLayout` for an empty segment payload or a container exceeding u32 lengths.
    pub fn build(&self) -> Result<Vec<u8>, ParseError> {
        if CipherFamily::from_key_len(self.base_key.len()).is_none() {
            return Err(ParseError::MissingBaseKey { found_len: Some(self.base_key.len()) });
        }
        if self.segments.is_empty() {
            return Err(SegmentTableError::Empty.into());
        }
        if let Some(index) = self.segments.iter().position(|(_, p)| p.is_empty()) {
            return Err(ParseError::InvalidLayout(format!(
                "segment {} has an empty payload; offsets must be strictly increasing",
                index
            )));
        }

        // Pass 1: layout with a zeroed table of the final width.
        let table_len = self.segments.len() * SEGMENT_ENTRY_LEN;
        let blob_len = encode_metadata(&self.metadata(vec![0u8; table_len])).len();

        let header_length = FIXED_HEADER_LEN + blob_len;
        let payload_offset = header_length + self.extra.len();
        let payload_len: usize = self.segments.iter().map(|(_, p)| p.len()).sum();
        let total_length = payload_offset + payload_len;

        let total_u32 = u32::try_from(total_length).map_err(|_| {
            ParseError::InvalidLayout(format!("container length {} exceeds u32", total_length))
        })?;

        // Pass 2: real offsets. Every offset is below total_length, so it fits u32.
        let mut table = vec![0u8; table_len];
        let mut offset = payload_offset;
        for ((timestamp_ms, payload), entry) in self.segments.iter().zip(table.chunks_exact_mut(SEGMENT_ENTRY_LEN)) {
            LittleEndian::write_u32(&mut entry[0..4], offset as u32);
            LittleEndian::write_u32(&mut entry[4..8], *timestamp_ms);
            offset += payload.len();
        }
        let blob = encode_metadata(&self.metadata(table));
        debug_assert_eq!(blob.len(), blob_len, "metadata length changed between passes");

        let mut out = Vec::with_capacity(total_length);
        out.extend_from_slice(&MAGIC_MSC1);
        out.extend_from_slice(&total_u32.to_le_bytes());
        out.extend_from_slice(&(header_length as u32).to_le_bytes());
        out.extend_from_slice(&(self.extra.len() as u32).to_le_bytes());
        debug_assert_eq!(out.len(), offsets::METADATA);

        out.extend_from_slice(&blob);
        out.extend_from_slice(&self.extra);
        for (_, payload) in &self.segments {
            out.extend_from_slice(payload);
        }
        debug_assert_eq!(out.len(), total_length);

        Ok(out)
    }

    fn metadata(&self, table: Vec<u8>) -> Metadata {
        let mut dict = self.extra_fields.clone();
        let duration_ms = self
            .duration_ms
            .or_else(|| self.segments.last().map(|(ts, _)| *ts))
            .unwrap_or(0);

        dict.insert(fields::SEGMENTS.to_string(), Value::Bytes(table));
        dict.insert(fields::DURATION_MS.to_string(), Value::Int(i64::from(duration_ms)));
        dict.insert(fields::BASE_KEY.to_string(), Value::Bytes(self.base_key.clone()));
        if self.declare_segment_count {
            dict.insert(fields::SEGMENT_COUNT.to_string(), Value::Int(self.segments.len() as i64));
        } else {
            dict.remove(fields::SEGMENT_COUNT);
        }
        Metadata::new(dict)
    }
}
