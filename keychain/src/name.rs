//! Key name validation and the name <-> datastore-key mapping.
//!
//! `null`/`undefined` inputs from the source language have no counterpart
//! here: Rust's `&str` already excludes them, so the only rejected shapes
//! are the string-domain ones (empty, whitespace-only, path separators,
//! reserved device names, and the reserved name `self`).

pub const RESERVED_NAME: &str = "self";

const RESERVED_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

fn sanitize(trimmed: &str) -> String {
    trimmed
        .chars()
        .filter(|c| !matches!(c, '/' | '\\') && !c.is_control())
        .collect()
}

fn is_reserved_device_name(name: &str) -> bool {
    RESERVED_DEVICE_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
}

/// True iff `name` is byte-equal to the sanitized, trimmed form of itself
/// and isn't a reserved device name. Does not check the `self` reservation;
/// that is a separate, operation-specific policy (see `reject_reserved`).
pub fn validate_key_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let sanitized = sanitize(name.trim());
    if sanitized != name {
        return false;
    }
    !is_reserved_device_name(name)
}

pub fn to_ds_key(name: &str) -> String {
    format!("/{name}")
}

pub fn from_ds_key(key: &str) -> String {
    key.strip_prefix('/').unwrap_or(key).to_string()
}
