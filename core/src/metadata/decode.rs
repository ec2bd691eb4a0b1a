//! metadata/decode.rs
//!
//! Strict bencode decoding for the header metadata blob.
//!
//! Design notes:
//! - Single forward cursor over the borrowed buffer, no backtracking.
//! - Nesting is bounded by `MAX_METADATA_DEPTH`, so recursion depth is bounded too.
//! - Every malformed input maps to a `MetadataError` carrying the failing offset.

use crate::constants::MAX_METADATA_DEPTH;
use crate::metadata::types::{Dict, Metadata, MetadataError, Value};

/// Decode a metadata blob: exactly one dictionary, no trailing bytes.
pub fn decode_metadata(buf: &[u8]) -> Result<Metadata, MetadataError> {
    match decode_value(buf)? {
        Value::Dict(dict) => Ok(Metadata::new(dict)),
        other => Err(MetadataError::NotADictionary { found: other.kind() }),
    }
}

/// Decode exactly one value spanning the whole buffer.
pub fn decode_value(buf: &[u8]) -> Result<Value, MetadataError> {
    let mut reader = Reader { buf, pos: 0 };
    let value = reader.value(0)?;

    if reader.pos != buf.len() {
        return Err(MetadataError::TrailingBytes {
            offset: reader.pos,
            trailing: buf.len() - reader.pos,
        });
    }
    Ok(value)
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    #[inline]
    fn peek(&self) -> Result<u8, MetadataError> {
        self.buf
            .get(self.pos)
            .copied()
            .ok_or(MetadataError::Truncated { offset: self.pos })
    }

    fn value(&mut self, depth: usize) -> Result<Value, MetadataError> {
        let start = self.pos;
        match self.peek()? {
            b'i' => self.int().map(Value::Int),
            b'0'..=b'9' => self.byte_string().map(|b| Value::Bytes(b.to_vec())),
            b'l' => {
                self.enter(depth)?;
                let mut items = Vec::new();
                while self.peek()? != b'e' {
                    items.push(self.value(depth + 1)?);
                }
                self.pos += 1;
                Ok(Value::List(items))
            }
            b'd' => {
                self.enter(depth)?;
                self.dict(depth).map(Value::Dict)
            }
            tag => Err(MetadataError::UnexpectedTag { tag, offset: start }),
        }
    }

    /// Consume an `l`/`d` opener, enforcing the nesting bound.
    fn enter(&mut self, depth: usize) -> Result<(), MetadataError> {
        if depth >= MAX_METADATA_DEPTH {
            return Err(MetadataError::TooDeep { max: MAX_METADATA_DEPTH, offset: self.pos });
        }
        self.pos += 1;
        Ok(())
    }

    fn dict(&mut self, depth: usize) -> Result<Dict, MetadataError> {
        let mut dict = Dict::new();
        let mut last_key: Option<String> = None;

        while self.peek()? != b'e' {
            let key_offset = self.pos;
            let tag = self.peek()?;
            if !tag.is_ascii_digit() {
                return Err(MetadataError::UnexpectedTag { tag, offset: key_offset });
            }

            let raw = self.byte_string()?;
            let key = std::str::from_utf8(raw)
                .map_err(|_| MetadataError::NonUtf8Key { offset: key_offset })?
                .to_owned();

            if let Some(prev) = &last_key {
                if key.as_str() <= prev.as_str() {
                    return Err(MetadataError::UnsortedKey { key, offset: key_offset });
                }
            }

            let value = self.value(depth + 1)?;
            dict.insert(key.clone(), value);
            last_key = Some(key);
        }

        self.pos += 1;
        Ok(dict)
    }

    /// `i<digits>e`, canonical only.
    fn int(&mut self) -> Result<i64, MetadataError> {
        let start = self.pos;
        let body_start = start + 1;
        let body_len = self.buf[body_start..]
            .iter()
            .position(|&b| b == b'e')
            .ok_or(MetadataError::Truncated { offset: self.buf.len() })?;
        let body = &self.buf[body_start..body_start + body_len];

        if !is_canonical_int(body) {
            return Err(MetadataError::InvalidInteger { offset: start });
        }

        // Canonical bodies are ASCII, so from_utf8 cannot fail here.
        let value = std::str::from_utf8(body)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(MetadataError::InvalidInteger { offset: start })?;

        self.pos = body_start + body_len + 1;
        Ok(value)
    }

    /// `<len>:<bytes>`, returned as a borrowed slice.
    fn byte_string(&mut self) -> Result<&'a [u8], MetadataError> {
        let buf = self.buf;
        let start = self.pos;
        let mut i = start;
        while i < buf.len() && buf[i].is_ascii_digit() {
            i += 1;
        }
        if i >= buf.len() {
            return Err(MetadataError::Truncated { offset: i });
        }
        if buf[i] != b':' {
            return Err(MetadataError::InvalidLength { offset: start });
        }

        let digits = &buf[start..i];
        if digits.len() > 1 && digits[0] == b'0' {
            return Err(MetadataError::InvalidLength { offset: start });
        }
        let len = std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or(MetadataError::InvalidLength { offset: start })?;

        let data_start = i + 1;
        let data_end = data_start
            .checked_add(len)
            .ok_or(MetadataError::InvalidLength { offset: start })?;
        if data_end > buf.len() {
            return Err(MetadataError::Truncated { offset: buf.len() });
        }

        self.pos = data_end;
        Ok(&buf[data_start..data_end])
    }
}

/// `0`, or an optional `-` followed by digits without a leading zero. `-0` is rejected.
fn is_canonical_int(body: &[u8]) -> bool {
    let digits = match body.split_first() {
        Some((b'-', rest)) => rest,
        Some(_) => body,
        None => return false,
    };
    match digits {
        [] => false,
        [b'0'] => body.len() == 1,
        [b'0', ..] => false,
        _ => digits.iter().all(u8::is_ascii_digit),
    }
}
