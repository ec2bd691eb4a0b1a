//! metadata/encode.rs
//!
//! Canonical bencode writer, the inverse of `decode.rs`.
//! Dictionaries are emitted in `BTreeMap` order, which is raw key byte order.

use crate::metadata::types::{Metadata, Value};

/// Serialize a value into canonical bencode.
pub fn encode_value(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_value(&mut out, value);
    out
}

/// Serialize a metadata dictionary into a header blob.
pub fn encode_metadata(metadata: &Metadata) -> Vec<u8> {
    let mut out = Vec::new();
    write_dict(&mut out, metadata.iter());
    out
}

fn write_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Int(v) => {
            out.push(b'i');
            out.extend_from_slice(v.to_string().as_bytes());
            out.push(b'e');
        }
        Value::Bytes(b) => write_bytes(out, b),
        Value::List(items) => {
            out.push(b'l');
            for item in items {
                write_value(out, item);
            }
            out.push(b'e');
        }
        Value::Dict(dict) => write_dict(out, dict.iter()),
    }
}

fn write_dict<'a>(out: &mut Vec<u8>, entries: impl Iterator<Item = (&'a String, &'a Value)>) {
    out.push(b'd');
    for (key, value) in entries {
        write_bytes(out, key.as_bytes());
        write_value(out, value);
    }
    out.push(b'e');
}

fn write_bytes(out: &mut Vec<u8>, b: &[u8]) {
    out.extend_from_slice(b.len().to_string().as_bytes());
    out.push(b':');
    out.extend_from_slice(b);
}
