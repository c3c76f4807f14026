//! Normalization helpers and leaf types shared by the input schemas

use crate::error::InputsError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// The only accepted value for `expected_compose_hash_alg`
pub const HASH_ALG_SHA256: &str = "sha256";

static SHA256_HEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{64}$").expect("sha256 pattern is valid"));

/// Trim surrounding whitespace in place
pub fn normalize_string(s: &mut String) {
    let trimmed = s.trim();
    if trimmed.len() != s.len() {
        *s = trimmed.to_string();
    }
}

/// Trim every entry, then sort lexicographically
pub fn normalize_list(items: &mut [String]) {
    items.iter_mut().for_each(normalize_string);
    items.sort();
}

/// Normalize a relative path
///
/// Backslashes become forward slashes and repeated slashes collapse. The
/// path must be relative and must not contain `.` or `..` segments, except
/// for a bare `.` meaning the current directory.
pub fn normalize_path(raw: &str) -> Result<String, String> {
    let unified = raw.replace('\\', "/");
    let path = unified.trim();

    if path.is_empty() {
        return Err("path is empty".to_string());
    }
    if path.starts_with('/') || path.starts_with('~') || path.contains(":/") {
        return Err(format!("path must be relative: {path:?}"));
    }
    if path == "." {
        return Ok(".".to_string());
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.iter().any(|s| *s == "." || *s == "..") {
        return Err(format!("path must not contain '.' or '..' segments: {path:?}"));
    }
    Ok(segments.join("/"))
}

/// Normalize `value` in place, attributing failures to `field`
pub(crate) fn normalize_path_field(field: &str, value: &mut String) -> Result<(), InputsError> {
    *value = normalize_path(value).map_err(|reason| InputsError::invalid(field, reason))?;
    Ok(())
}

/// A 64 character lowercase hex digest
pub fn validate_sha256_hex(hash: &str) -> Result<(), String> {
    if SHA256_HEX.is_match(hash) {
        Ok(())
    } else {
        Err(format!("sha256 hash must be 64 lowercase hex chars: {hash:?}"))
    }
}

/// Both hash fields are optional, but setting either requires a valid pair
pub(crate) fn validate_expected_hash(alg: &str, hash: &str) -> Result<(), InputsError> {
    if alg.is_empty() && hash.is_empty() {
        return Ok(());
    }
    if alg != HASH_ALG_SHA256 {
        return Err(InputsError::invalid(
            "expected_compose_hash_alg",
            format!("must be {HASH_ALG_SHA256:?}"),
        ));
    }
    validate_sha256_hex(hash).map_err(|reason| InputsError::invalid("expected_compose_hash", reason))
}

pub(crate) fn require(field: &str, value: &str) -> Result<(), InputsError> {
    if value.is_empty() {
        Err(InputsError::invalid(field, "is required"))
    } else {
        Ok(())
    }
}

pub(crate) fn require_entries(field: &str, items: &[String]) -> Result<(), InputsError> {
    if items.iter().any(String::is_empty) {
        Err(InputsError::invalid(field, "contains empty value"))
    } else {
        Ok(())
    }
}

/// Zero counts as unset, matching producers that omit zero-valued fields
pub(crate) fn require_positive(field: &str, value: Option<i64>) -> Result<(), InputsError> {
    match value {
        Some(n) if n < 0 => Err(InputsError::invalid(field, "must be > 0 if present")),
        _ => Ok(()),
    }
}

/// A key/value pair (build args, labels, compose variables, HTTP headers)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Trim keys and values, then sort by key
pub fn normalize_pairs(pairs: &mut [KeyValue]) {
    for pair in pairs.iter_mut() {
        normalize_string(&mut pair.key);
        normalize_string(&mut pair.value);
    }
    pairs.sort_by(|a, b| a.key.cmp(&b.key));
}

pub(crate) fn require_keys(field: &str, pairs: &[KeyValue]) -> Result<(), InputsError> {
    if pairs.iter().any(|p| p.key.is_empty()) {
        Err(InputsError::invalid(format!("{field}.key"), "is required"))
    } else {
        Ok(())
    }
}
