//! metadata/types.rs
//! Tagged value model for the metadata blob and fail-closed field accessors.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;

use thiserror::Error;

use crate::utils::fmt_bytes;

/// Dictionary payload. `String` ordering equals raw UTF-8 byte ordering,
/// which is the order bencode requires on the wire.
pub type Dict = BTreeMap<String, Value>;

/// One decoded metadata value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Dict(Dict),
}

/// Discriminant of [`Value`], used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Bytes,
    List,
    Dict,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Int   => "integer",
            ValueKind::Bytes => "byte string",
            ValueKind::List  => "list",
            ValueKind::Dict  => "dictionary",
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_)   => ValueKind::Int,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::List(_)  => ValueKind::List,
            Value::Dict(_)  => ValueKind::Dict,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Byte string interpreted as UTF-8 text. Bencode has no separate string type.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Bytes(s.as_bytes().to_vec())
    }
}

/// Top-level metadata dictionary with typed accessors.
///
/// Every `require_*` accessor fails with a [`MetadataError`] naming the field,
/// never with a panic or a silently defaulted value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata(Dict);

impl Metadata {
    pub fn new(dict: Dict) -> Self {
        Self(dict)
    }

    pub fn into_inner(self) -> Dict {
        self.0
    }

    pub fn require(&self, field: &'static str) -> Result<&Value, MetadataError> {
        self.0.get(field).ok_or(MetadataError::MissingField(field))
    }

    pub fn require_int(&self, field: &'static str) -> Result<i64, MetadataError> {
        let value = self.require(field)?;
        value.as_int().ok_or(MetadataError::TypeMismatch {
            field,
            expected: ValueKind::Int,
            found: value.kind(),
        })
    }

    /// Integer field that must fit a `u32` (wire-level table and duration widths).
    pub fn require_u32(&self, field: &'static str) -> Result<u32, MetadataError> {
        let value = self.require_int(field)?;
        u32::try_from(value).map_err(|_| MetadataError::OutOfRange { field, value })
    }

    pub fn require_bytes(&self, field: &'static str) -> Result<&[u8], MetadataError> {
        let value = self.require(field)?;
        value.as_bytes().ok_or(MetadataError::TypeMismatch {
            field,
            expected: ValueKind::Bytes,
            found: value.kind(),
        })
    }

    /// Absent is `Ok(None)`; present with the wrong type is still an error.
    pub fn optional_u32(&self, field: &'static str) -> Result<Option<u32>, MetadataError> {
        if self.0.contains_key(field) {
            self.require_u32(field).map(Some)
        } else {
            Ok(None)
        }
    }
}

impl Deref for Metadata {
    type Target = Dict;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn fmt_tag(tag: u8) -> String {
    fmt_bytes(&[tag])
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    /// Input ended inside a value.
    #[error("metadata truncated at offset {offset}")]
    Truncated { offset: usize },

    /// Byte at `offset` does not start any value.
    #[error("unexpected type tag {} at offset {offset}", fmt_tag(*tag))]
    UnexpectedTag { tag: u8, offset: usize },

    /// Non-canonical or overflowing integer (`i-0e`, `i03e`, `ie`, ...).
    #[error("malformed integer at offset {offset}")]
    InvalidInteger { offset: usize },

    /// Non-canonical or overflowing byte-string length prefix.
    #[error("malformed length prefix at offset {offset}")]
    InvalidLength { offset: usize },

    #[error("dictionary key at offset {offset} is not UTF-8")]
    NonUtf8Key { offset: usize },

    /// Keys must be strictly increasing.
    #[error("dictionary key {key:?} at offset {offset} is out of order or duplicated")]
    UnsortedKey { key: String, offset: usize },

    #[error("nesting deeper than {max} levels at offset {offset}")]
    TooDeep { max: usize, offset: usize },

    #[error("top-level metadata must be a dictionary, found {found}")]
    NotADictionary { found: ValueKind },

    #[error("{trailing} trailing bytes after metadata at offset {offset}")]
    TrailingBytes { offset: usize, trailing: usize },

    #[error("missing metadata field {0:?}")]
    MissingField(&'static str),

    #[error("metadata field {field:?}: expected {expected}, found {found}")]
    TypeMismatch { field: &'static str, expected: ValueKind, found: ValueKind },

    #[error("metadata field {field:?}: value {value} out of range")]
    OutOfRange { field: &'static str, value: i64 },
}
