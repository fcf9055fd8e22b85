//! # mmforge - Memory-Mapped Fixed-Record Storage
//!
//! mmforge is an append-only storage engine for fixed-size records,
//! memory-mapped for near-zero-overhead random access. A record schema is
//! declared as a field list; the layout engine computes byte offsets and
//! a canonical schema hash; the store persists a flat array of records
//! behind a 64-byte header and lets one writer mutate fields in place
//! while concurrent readers validate their snapshots with a per-record
//! seqlock.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mmforge::{compute_layout, FieldDef, FieldKind, Store, StoreOptions};
//!
//! let layout = compute_layout(&[
//!     FieldDef::new("id", FieldKind::Uint64),
//!     FieldDef::new("value", FieldKind::Float64),
//! ])?;
//!
//! let store = Store::create("metrics.mmfg", &layout, 1, &StoreOptions::new())?;
//! let idx = store.append()?;
//!
//! let id = layout.field("id").unwrap().offset;
//! let value = layout.field("value").unwrap().offset;
//! store.begin_write(idx)?;
//! store.write_u64(idx, id, 42)?;
//! store.write_f64(idx, value, 1.5)?;
//! store.end_write(idx)?;
//!
//! assert_eq!(store.read_u64(idx, id)?, 42);
//! store.close()?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │   Generated accessors (out of scope)     │
//! ├─────────────────────────────────────────┤
//! │   Store (append / field r+w / seqlock)   │
//! ├──────────────────────┬──────────────────┤
//! │   Header codec       │   Writer lock     │
//! ├──────────────────────┴──────────────────┤
//! │   Region (stable-address growable mmap)  │
//! ├─────────────────────────────────────────┤
//! │   MmapOs syscall facade                  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! - [`layout`]: field placement and the order-insensitive schema digest
//! - [`storage`]: mapping, header codec, sidecar writer lock
//! - [`store`]: the record store and its read/write/seqlock primitives
//!
//! ## Concurrency
//!
//! Single writer (advisory, via the sidecar lock), many readers, across
//! threads and across processes mapping the same file. Appends serialize
//! on a process-local mutex; field writes are lock-free under the
//! seqlock discipline; growth happens in place, so reader-held slices
//! survive it.
//!
//! This crate targets Unix: the stable-address mapping is built on
//! `PROT_NONE` reservations and `MAP_FIXED` placement.

#[macro_use]
mod macros;

mod error;

pub mod layout;
pub mod storage;
pub mod store;

pub use error::{Result, StoreError};
pub use layout::{
    compute_layout, schema_hash, FieldDef, FieldDescriptor, FieldKind, FieldLayout, RecordLayout,
    SEQ_FIELD_SIZE,
};
pub use storage::os::AccessPattern;
pub use storage::region::Region;
pub use storage::{FORMAT_VERSION, HEADER_SIZE, MAGIC, STORE_RESERVE_VA};
pub use store::{Store, StoreOptions, INITIAL_CAPACITY};
