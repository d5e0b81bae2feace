//! Canonical and raw checksums for saved documents.
//!
//! The canonical checksum hashes the document with sorted keys and without
//! checksum fields, so it only changes when content changes. The raw
//! checksum hashes the exact saved text with the `checksumRaw` value blanked,
//! so it changes on any textual edit.

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

pub const CHECKSUM_KEY: &str = "checksum";
pub const CHECKSUM_RAW_KEY: &str = "checksumRaw";

fn is_checksum_key(key: &str) -> bool {
    key == CHECKSUM_KEY || key == CHECKSUM_RAW_KEY
}

/// Sorts object keys, drops checksum keys at every depth and keeps array order.
///
/// `serde_json::Value` cannot hold NaN or infinity. Model floats reach this
/// point already written as `"NaN"`/`"Infinity"`/`"-Infinity"` strings by
/// `doc_model::serde_util`, which is what makes them hash deterministically.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().filter(|key| !is_checksum_key(key)).collect();
            keys.sort();

            let mut out = Map::new();
            for key in keys {
                out.insert(key.clone(), canonicalize(&map[key.as_str()]));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

pub fn canonical_string(value: &Value) -> String {
    // Serializing a Value cannot fail.
    serde_json::to_string(&canonicalize(value)).unwrap_or_default()
}

pub fn sha256_hex(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(bytes.as_ref()))
}

pub fn compute_canonical_checksum<T: Serialize + ?Sized>(
    document: &T,
) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(document)?;
    Ok(canonical_checksum_of_value(&value))
}

pub fn canonical_checksum_of_value(value: &Value) -> String {
    sha256_hex(canonical_string(value))
}

/// Hash of the exact text, which must already carry a blank raw checksum.
pub fn compute_raw_checksum(text_with_blank_raw: &str) -> String {
    sha256_hex(text_with_blank_raw)
}

fn raw_field_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"("checksumRaw"\s*:\s*)"(?:[^"\\]|\\.)*""#).expect("raw checksum pattern")
    })
}

/// Replaces the first `"checksumRaw": "..."` value with `""`, leaving the
/// surrounding formatting untouched.
pub fn blank_raw_checksum(text: &str) -> String {
    raw_field_pattern().replace(text, r#"${1}"""#).into_owned()
}
