//! # Store Options
//!
//! Open/create configuration, builder style. The two modes are mutually
//! exclusive and validated before any file is touched:
//!
//! - `read_only`: map and open for reading only. No sidecar lock, no
//!   seqlock recovery, no header flush on close.
//! - `one_writer`: acquire the exclusive sidecar lock; a second writer
//!   fails with `Locked`.

use crate::error::{Result, StoreError};
use crate::storage::STORE_RESERVE_VA;

/// Configuration for [`Store::create`] and [`Store::open`].
///
/// [`Store::create`]: crate::store::Store::create
/// [`Store::open`]: crate::store::Store::open
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub(crate) read_only: bool,
    pub(crate) one_writer: bool,
    pub(crate) reserve_va: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            read_only: false,
            one_writer: false,
            reserve_va: STORE_RESERVE_VA,
        }
    }
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the store for reading only. Mutating operations return
    /// `ReadOnly`; the sidecar lock is never touched.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Acquires the exclusive sidecar writer lock on open, failing with
    /// `Locked` if another writer holds it.
    pub fn one_writer(mut self) -> Self {
        self.one_writer = true;
        self
    }

    /// Overrides the virtual address reservation for the mapping.
    ///
    /// The default (1 GiB) suits most stores; a store expected to grow
    /// past it must reserve more up front, because growing past the
    /// reservation is a hard failure.
    pub fn reserve_va(mut self, bytes: usize) -> Self {
        self.reserve_va = bytes;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.read_only && self.one_writer {
            return Err(StoreError::ConflictingOptions {
                detail: "read_only and one_writer are mutually exclusive",
            });
        }
        Ok(())
    }
}
