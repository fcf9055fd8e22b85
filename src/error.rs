//! # Error Types
//!
//! Every fallible mmforge operation returns [`StoreError`]. The variants are
//! deliberately fine-grained so callers can match on the failure kind
//! (schema mismatch vs. lock contention vs. a corrupted slot) instead of
//! parsing messages, and each variant carries the context needed to
//! diagnose the failure without a debugger: paths, offsets, indices, and
//! expected-vs-observed values.
//!
//! Layout validation, header decoding, and open-time schema checks all fail
//! synchronously at `create`/`open`; fast-path read/write errors leave the
//! store usable.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors returned by layout, region, and store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The file's schema hash does not match the layout the caller supplied.
    #[error("{path}: schema hash mismatch (expected {expected}, found {found})")]
    SchemaMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    /// Record index at or past the live record count.
    #[error("record {index} out of bounds (count {count})")]
    OutOfBounds { index: usize, count: u64 },

    /// On-disk data violates a format invariant.
    #[error("corrupted field at offset {offset}: {detail}")]
    Corrupted { offset: u32, detail: String },

    /// Field offset/size arguments that do not fit the record layout.
    #[error("invalid field range: {detail}")]
    FieldRange { detail: String },

    /// The file does not start with the `MMFG` signature.
    #[error("bad magic {found:?} (expected {expected:?})")]
    BadMagic { found: [u8; 4], expected: [u8; 4] },

    /// The file was written by an incompatible format version.
    #[error("unsupported format version {found} (supported {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Destination buffer cannot hold an encoded header.
    #[error("header buffer too small ({len} < {required} bytes)")]
    HeaderTooSmall { len: usize, required: usize },

    /// The file is smaller than the fixed header.
    #[error("{path}: file too small ({size} bytes, header needs {required})")]
    FileTooSmall {
        path: PathBuf,
        size: u64,
        required: u64,
    },

    /// A string value exceeds the field's declared `max_size`.
    #[error("string of {len} bytes exceeds max size {max_size} at offset {offset}")]
    StringTooLong {
        offset: u32,
        len: usize,
        max_size: u32,
    },

    /// A bytes value exceeds the field's declared `max_size`.
    #[error("{len} bytes exceed max size {max_size} at offset {offset}")]
    BytesTooLong {
        offset: u32,
        len: usize,
        max_size: u32,
    },

    /// Mutation attempted on a store opened read-only.
    #[error("{path}: store is read-only")]
    ReadOnly { path: PathBuf },

    /// Operation on a store or region that has been closed.
    #[error("store is closed")]
    Closed,

    /// Another process holds the sidecar writer lock.
    #[error("{path}: already locked by another writer")]
    Locked { path: PathBuf },

    /// Mutually exclusive options were both requested.
    #[error("conflicting store options: {detail}")]
    ConflictingOptions { detail: &'static str },

    /// A mapping or grow would exceed the reserved virtual address range.
    #[error("mapping of {requested} bytes exceeds the {reserved}-byte reservation")]
    ReservationExceeded { requested: usize, reserved: usize },

    /// A capacity or size computation overflowed.
    #[error("capacity overflow: {detail}")]
    CapacityOverflow { detail: String },

    /// A layout was built from an empty field list.
    #[error("layout requires at least one field")]
    EmptyLayout,

    /// Two fields share a canonical name.
    #[error("duplicate field name {name:?}")]
    DuplicateField { name: String },

    /// A variable-length field declared a missing, zero, or overflowing max size.
    #[error("field {field:?}: {detail}")]
    InvalidMaxSize { field: String, detail: String },

    /// An underlying syscall or file operation failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// A primary failure whose resource unwind also failed.
    #[error("{source}; cleanup also failed: {cleanup}")]
    Cleanup {
        source: Box<StoreError>,
        cleanup: Box<StoreError>,
    },
}

impl StoreError {
    /// Wraps an I/O error with a human-readable operation context.
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        StoreError::Io {
            context: context.into(),
            source,
        }
    }

    /// Joins `self` with the outcome of unwinding already-acquired
    /// resources, so a failed cleanup is reported rather than swallowed.
    pub(crate) fn join_cleanup(self, cleanup: Result<()>) -> Self {
        match cleanup {
            Ok(()) => self,
            Err(e) => StoreError::Cleanup {
                source: Box::new(self),
                cleanup: Box::new(e),
            },
        }
    }
}
