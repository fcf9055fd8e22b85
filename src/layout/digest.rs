//! # Schema Digest
//!
//! A store file records a 32-byte SHA-256 digest of its schema so that
//! `open` can reject a layout that no longer matches the bytes on disk.
//!
//! The digest covers `(name, kind, slot size)` per field, sorted by field
//! name before serialization. Sorting makes the hash independent of
//! declaration order: reordering fields relayouts the record but does not
//! change which schema it is. Renaming a field, changing its kind, or
//! changing its slot size (which for string/bytes means changing
//! `max_size`) all produce a different digest.

use sha2::{Digest, Sha256};

/// Canonical reduced form of a field used for schema hashing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: &'static str,
    pub size: u32,
}

/// Computes the SHA-256 schema digest over `descriptors`.
///
/// The input is copied and sorted by name, so the caller's slice is left
/// untouched and the result is declaration-order independent. Each
/// descriptor serializes as `name:kind:size`; descriptors are joined with
/// commas before digesting.
pub fn schema_hash(descriptors: &[FieldDescriptor]) -> [u8; 32] {
    let mut sorted: Vec<&FieldDescriptor> = descriptors.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let canonical = sorted
        .iter()
        .map(|d| format!("{}:{}:{}", d.name, d.kind, d.size))
        .collect::<Vec<_>>()
        .join(",");

    Sha256::digest(canonical.as_bytes()).into()
}

/// Formats a 32-byte digest as lowercase hex for error messages.
pub(crate) fn hex(digest: &[u8; 32]) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
