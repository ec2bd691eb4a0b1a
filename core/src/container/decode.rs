//! container/decode.rs
//!
//! Container header parsing.
//!
//! Design notes:
//! - Pure function over the input buffer; the buffer may stop right after the header.
//! - Fixed prefix is read with `byteorder`, metadata with the strict bencode decoder.
//! - The segment table is closed with a sentinel so segment `i` always spans
//!   `segments[i].offset..segments[i + 1].offset`.

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;
use tracing::debug;

use crate::constants::{fields, offsets, FIXED_HEADER_LEN, MAGIC_MSC1, SEGMENT_ENTRY_LEN};
use crate::container::types::{CipherFamily, ContainerHeader, ParseError, SegmentBoundary, SegmentTableError};
use crate::metadata::{decode_metadata, Metadata, Value};

/// Parse a container header from `raw`.
///
/// # Errors
/// - `InvalidMagic` if the first four bytes are present and are not `MSC1`.
/// - `BufferTooShort` if `raw` ends before the fixed prefix or before `header_length`.
/// - `InvalidLayout` if the length fields contradict each other.
/// - `MetadataDecode` for malformed bencode or missing/mistyped required fields.
/// - `SegmentTable` for a misaligned, empty, unordered or miscounted table, or one
///   whose first segment starts before `header_length + extra_length`.
/// - `MissingBaseKey` if the base key is absent or not 16/32 bytes.
pub fn parse(raw: &[u8]) -> Result<ContainerHeader, ParseError> {
    // Magic first: a short foreign buffer is still InvalidMagic.
    if let Some(head) = raw.get(offsets::MAGIC..offsets::MAGIC + MAGIC_MSC1.len()) {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(head);
        if magic != MAGIC_MSC1 {
            return Err(ParseError::InvalidMagic { have: magic });
        }
    }
    if raw.len() < FIXED_HEADER_LEN {
        return Err(ParseError::BufferTooShort { have: raw.len(), need: FIXED_HEADER_LEN });
    }

    let total_length  = u64::from(LittleEndian::read_u32(&raw[offsets::TOTAL_LENGTH..]));
    let header_length = u64::from(LittleEndian::read_u32(&raw[offsets::HEADER_LENGTH..]));
    let extra_length  = u64::from(LittleEndian::read_u32(&raw[offsets::EXTRA_LENGTH..]));

    if header_length < FIXED_HEADER_LEN as u64 {
        return Err(ParseError::InvalidLayout(format!(
            "header_length {} is smaller than the fixed prefix ({})",
            header_length, FIXED_HEADER_LEN
        )));
    }
    if header_length + extra_length > total_length {
        return Err(ParseError::InvalidLayout(format!(
            "header_length {} + extra_length {} exceeds total_length {}",
            header_length, extra_length, total_length
        )));
    }

    // header_length came from a u32, so it fits usize on every supported target.
    let header_end = header_length as usize;
    if raw.len() < header_end {
        return Err(ParseError::BufferTooShort { have: raw.len(), need: header_end });
    }

    let metadata = decode_metadata(&raw[offsets::METADATA..header_end])?;

    let mut segments = decode_segment_table(metadata.require_bytes(fields::SEGMENTS)?)?;
    let duration_ms = metadata.require_u32(fields::DURATION_MS)?;

    if let Some(declared) = metadata.optional_u32(fields::SEGMENT_COUNT)? {
        if declared as usize != segments.len() {
            return Err(SegmentTableError::CountMismatch { declared, actual: segments.len() }.into());
        }
    }

    // Sentinel: end of stream.
    segments.push(SegmentBoundary {
        offset: total_length,
        timestamp_ms: u64::from(duration_ms),
    });
    check_offsets_increasing(&segments)?;
    check_payload_start(&segments, header_length + extra_length)?;

    let (base_key, cipher) = extract_base_key(&metadata)?;

    let header = ContainerHeader {
        total_length,
        header_length,
        extra_length,
        metadata,
        segments,
        base_key,
        cipher,
    };
    debug!(summary = %header.summary(), "parsed container header");
    Ok(header)
}

/// Decode the packed `(offset: u32, timestamp: u32)` table. The sentinel is not included.
pub fn decode_segment_table(table: &[u8]) -> Result<Vec<SegmentBoundary>, SegmentTableError> {
    if table.len() % SEGMENT_ENTRY_LEN != 0 {
        return Err(SegmentTableError::Misaligned { len: table.len() });
    }
    if table.is_empty() {
        return Err(SegmentTableError::Empty);
    }

    Ok(table
        .chunks_exact(SEGMENT_ENTRY_LEN)
        .map(|entry| SegmentBoundary {
            offset: u64::from(LittleEndian::read_u32(&entry[0..4])),
            timestamp_ms: u64::from(LittleEndian::read_u32(&entry[4..8])),
        })
        .collect())
}

fn check_offsets_increasing(segments: &[SegmentBoundary]) -> Result<(), SegmentTableError> {
    for (index, pair) in segments.windows(2).enumerate() {
        if pair[1].offset <= pair[0].offset {
            return Err(SegmentTableError::NotIncreasing {
                index: index + 1,
                previous: pair[0].offset,
                offset: pair[1].offset,
            });
        }
    }
    Ok(())
}

/// Offsets are increasing, so checking the first one covers the whole table.
fn check_payload_start(segments: &[SegmentBoundary], payload_offset: u64) -> Result<(), SegmentTableError> {
    match segments.first() {
        Some(first) if first.offset < payload_offset => Err(SegmentTableError::BeforePayload {
            offset: first.offset,
            payload_offset,
        }),
        _ => Ok(()),
    }
}

fn extract_base_key(metadata: &Metadata) -> Result<(Bytes, CipherFamily), ParseError> {
    match metadata.get(fields::BASE_KEY) {
        Some(Value::Bytes(key)) => match CipherFamily::from_key_len(key.len()) {
            Some(cipher) => Ok((Bytes::copy_from_slice(key), cipher)),
            None => Err(ParseError::MissingBaseKey { found_len: Some(key.len()) }),
        },
        _ => Err(ParseError::MissingBaseKey { found_len: None }),
    }
}
