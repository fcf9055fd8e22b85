//! # Record Store
//!
//! [`Store`] is the persistent array of fixed-size records: a 64-byte
//! header followed by `capacity` record slots, memory-mapped through a
//! stable-address region so that reads and writes touch file bytes
//! directly, with no serialization layer.
//!
//! ## Access Model
//!
//! One process writes (advisorily enforced via the sidecar lock); any
//! number of threads and processes read. Appends serialize on a
//! process-local mutex; field writes are lock-free and bracketed by the
//! per-record seqlock (see [`seq`]); readers validate their snapshots
//! against the seqlock counter and retry on interference.
//!
//! The live `record_count` and `capacity` header words are read and
//! written as atomics directly through the mapping; they are the only
//! ordering between appends and outside observers. A reader that loads
//! `len()` may touch any index below it.
//!
//! ## Growth
//!
//! `append` doubles capacity when the store is full. Growth extends the
//! file and remaps in place, so concurrent readers keep valid pointers;
//! the new slots arrive kernel-zeroed. Capacity is published only after
//! the larger mapping is usable.
//!
//! ## Lifecycle
//!
//! `create` writes a fresh header and maps an empty 64-slot file;
//! `open` validates magic, format version, and schema hash before any
//! record access, and bumps stuck-odd seqlock counters left by a crashed
//! writer. `close` flushes the header, syncs, releases the writer lock,
//! and unmaps; a second close returns `Closed`, as does every operation
//! after the first.

mod options;
mod read;
mod seq;
mod write;


use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::layout::digest::hex;
use crate::layout::RecordLayout;
use crate::storage::header::{StoreHeader, CAPACITY_OFFSET, RECORD_COUNT_OFFSET};
use crate::storage::lock::WriterLock;
use crate::storage::os::AccessPattern;
use crate::storage::region::Region;
use crate::storage::HEADER_SIZE;

pub use options::StoreOptions;

/// Record capacity of a freshly created store.
pub const INITIAL_CAPACITY: u64 = 64;

/// A memory-mapped, append-only store of fixed-size records.
pub struct Store {
    region: Region,
    layout: RecordLayout,
    /// Snapshot of the immutable header fields; the live count/capacity
    /// words are read through the mapping, not from here.
    header: StoreHeader,
    path: PathBuf,
    record_size: usize,
    append_mu: Mutex<()>,
    lock: Mutex<Option<WriterLock>>,
    writable: bool,
    closed: AtomicBool,
}

impl Store {
    /// Creates a new store file at `path` with the given layout.
    ///
    /// Fails if the file already exists. The store starts empty with
    /// capacity [`INITIAL_CAPACITY`]; all slots are zero.
    pub fn create(
        path: impl AsRef<Path>,
        layout: &RecordLayout,
        schema_version: u32,
        opts: &StoreOptions,
    ) -> Result<Store> {
        let path = path.as_ref();
        opts.validate()?;
        if opts.read_only {
            return Err(StoreError::ConflictingOptions {
                detail: "create requires a writable store",
            });
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| StoreError::io(format!("create {}", path.display()), e))?;

        let record_size = layout.record_size() as u64;
        let file_size = file_size_for(record_size, INITIAL_CAPACITY)?;
        let region = Region::map(file, file_size, true, AccessPattern::Random, opts.reserve_va)?;

        let header = StoreHeader::new(
            layout.schema_hash(),
            schema_version,
            layout.record_size(),
            INITIAL_CAPACITY,
        );
        // SAFETY: freshly mapped writable region of at least HEADER_SIZE
        // bytes; no other thread can touch it yet.
        if let Err(e) = header.encode_into(unsafe { region.slice_mut(0, HEADER_SIZE) }) {
            return Err(e.join_cleanup(region.close()));
        }

        let store = Store {
            region,
            layout: layout.clone(),
            header,
            path: path.to_path_buf(),
            record_size: record_size as usize,
            append_mu: Mutex::new(()),
            lock: Mutex::new(None),
            writable: true,
            closed: AtomicBool::new(false),
        };

        if opts.one_writer {
            match WriterLock::acquire(path) {
                Ok(lock) => *store.lock.lock() = Some(lock),
                Err(e) => return Err(e.join_cleanup(store.region.close())),
            }
        }

        debug!(path = %path.display(), record_size, "created store");
        Ok(store)
    }

    /// Opens an existing store file and validates its schema hash against
    /// `layout`.
    ///
    /// Writable opens recover seqlock counters left odd by a crashed
    /// writer; `one_writer` opens additionally take the sidecar lock.
    pub fn open(
        path: impl AsRef<Path>,
        layout: &RecordLayout,
        opts: &StoreOptions,
    ) -> Result<Store> {
        let path = path.as_ref();
        opts.validate()?;
        let writable = !opts.read_only;

        let file = OpenOptions::new()
            .read(true)
            .write(writable)
            .open(path)
            .map_err(|e| StoreError::io(format!("open {}", path.display()), e))?;

        let size = file
            .metadata()
            .map_err(|e| StoreError::io(format!("stat {}", path.display()), e))?
            .len();
        if size < HEADER_SIZE as u64 {
            return Err(StoreError::FileTooSmall {
                path: path.to_path_buf(),
                size,
                required: HEADER_SIZE as u64,
            });
        }

        let region = Region::map(
            file,
            size as usize,
            writable,
            AccessPattern::Random,
            opts.reserve_va,
        )?;

        let header = match StoreHeader::decode(region.slice(0, HEADER_SIZE)) {
            Ok(h) => h,
            Err(e) => return Err(e.join_cleanup(region.close())),
        };

        let expected = layout.schema_hash();
        if header.schema_hash() != &expected {
            let err = StoreError::SchemaMismatch {
                path: path.to_path_buf(),
                expected: hex(&expected),
                found: hex(header.schema_hash()),
            };
            return Err(err.join_cleanup(region.close()));
        }
        if header.record_size() != layout.record_size() {
            // Same field set in a different declaration order hashes
            // identically but can lay out differently; addressing with
            // the wrong record size would corrupt every slot.
            let err = StoreError::Corrupted {
                offset: 44,
                detail: format!(
                    "record size {} does not match layout record size {}",
                    header.record_size(),
                    layout.record_size()
                ),
            };
            return Err(err.join_cleanup(region.close()));
        }

        let store = Store {
            region,
            layout: layout.clone(),
            header,
            path: path.to_path_buf(),
            record_size: header.record_size() as usize,
            append_mu: Mutex::new(()),
            lock: Mutex::new(None),
            writable,
            closed: AtomicBool::new(false),
        };

        if writable {
            store.recover_seqlocks();
        }

        if opts.one_writer {
            match WriterLock::acquire(path) {
                Ok(lock) => *store.lock.lock() = Some(lock),
                Err(e) => return Err(e.join_cleanup(store.region.close())),
            }
        }

        debug!(path = %path.display(), records = store.len(), "opened store");
        Ok(store)
    }

    /// Number of live records.
    ///
    /// # Panics
    ///
    /// Panics if the store has been closed, or if the on-disk count
    /// overflows `usize` (unreachable on 64-bit targets).
    pub fn len(&self) -> usize {
        assert!(!self.closed.load(Ordering::Acquire), "store is closed");
        let count = self.record_count().load(Ordering::Acquire);
        usize::try_from(count)
            .unwrap_or_else(|_| panic!("record count {count} overflows usize"))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of record slots the file currently provides.
    ///
    /// # Panics
    ///
    /// Panics if the store has been closed, or if the on-disk capacity
    /// overflows `usize`.
    pub fn cap(&self) -> usize {
        assert!(!self.closed.load(Ordering::Acquire), "store is closed");
        let capacity = self.capacity().load(Ordering::Acquire);
        usize::try_from(capacity)
            .unwrap_or_else(|_| panic!("capacity {capacity} overflows usize"))
    }

    /// Appends a zero-filled record, growing the file if full, and
    /// returns its index.
    ///
    /// Appends serialize on an internal mutex; the new index becomes
    /// visible to readers only once the count word is published.
    pub fn append(&self) -> Result<usize> {
        self.ensure_open()?;
        self.ensure_writable()?;

        let _guard = self.append_mu.lock();

        let count = self.record_count().load(Ordering::Acquire);
        if count >= self.capacity().load(Ordering::Acquire) {
            self.grow()?;
        }

        let idx = usize::try_from(count).map_err(|_| StoreError::CapacityOverflow {
            detail: format!("record index {count} overflows usize"),
        })?;
        self.record_count().store(count + 1, Ordering::Release);
        Ok(idx)
    }

    /// Flushes the header and all dirty record pages to stable storage.
    /// A no-op on read-only stores.
    pub fn sync(&self) -> Result<()> {
        self.ensure_open()?;
        if !self.writable {
            return Ok(());
        }
        self.flush_header()?;
        self.region.sync()
    }

    /// Flushes (writable stores), releases the writer lock, and unmaps.
    ///
    /// Not idempotent: a second close returns [`StoreError::Closed`], as
    /// does any other operation after the first close.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(StoreError::Closed);
        }

        if self.writable {
            if let Err(e) = self.flush_header() {
                return Err(e.join_cleanup(self.region.close()));
            }
            if let Err(e) = self.region.sync() {
                return Err(e.join_cleanup(self.region.close()));
            }
        }

        let mut release_result = Ok(());
        if let Some(lock) = self.lock.lock().take() {
            release_result = lock.release();
        }

        let close_result = self.region.close();
        match release_result {
            Ok(()) => close_result,
            Err(e) => Err(e.join_cleanup(close_result)),
        }
    }

    /// The store's file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The layout this store was opened with.
    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    /// Record size in bytes, including the 8-byte seqlock prefix.
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// User-supplied schema version recorded at create time.
    pub fn schema_version(&self) -> u32 {
        self.header.schema_version()
    }

    /// Whether mutating operations are permitted.
    pub fn writable(&self) -> bool {
        self.writable
    }

    /// Live record-count header word, viewed through the mapping.
    fn record_count(&self) -> &AtomicU64 {
        self.region.atomic_u64(RECORD_COUNT_OFFSET)
    }

    /// Live capacity header word, viewed through the mapping.
    fn capacity(&self) -> &AtomicU64 {
        self.region.atomic_u64(CAPACITY_OFFSET)
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    pub(crate) fn ensure_writable(&self) -> Result<()> {
        if !self.writable {
            return Err(StoreError::ReadOnly {
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    /// Doubles capacity (or seeds it from zero) and grows the mapping.
    /// Caller holds the append mutex.
    fn grow(&self) -> Result<()> {
        let capacity = self.capacity().load(Ordering::Acquire);
        let new_cap = if capacity == 0 {
            INITIAL_CAPACITY
        } else {
            capacity
                .checked_mul(2)
                .ok_or_else(|| StoreError::CapacityOverflow {
                    detail: format!("doubling capacity {capacity}"),
                })?
        };

        let new_size = file_size_for(self.record_size as u64, new_cap)?;
        self.region.grow(new_size)?;
        self.capacity().store(new_cap, Ordering::Release);
        debug!(path = %self.path.display(), capacity = new_cap, "grew store");
        Ok(())
    }

    /// Re-encodes the header with the live count and capacity.
    fn flush_header(&self) -> Result<()> {
        let mut header = self.header;
        header.set_record_count(self.record_count().load(Ordering::Acquire));
        header.set_capacity(self.capacity().load(Ordering::Acquire));
        // SAFETY: writable store (flush_header is only reached on the
        // writable paths) and the header range is always mapped.
        header.encode_into(unsafe { self.region.slice_mut(0, HEADER_SIZE) })
    }

    /// Byte offset of `(idx, field_offset)` after the shared bounds
    /// checks every field primitive goes through.
    pub(crate) fn field_start(&self, idx: usize, offset: u32, size: u32) -> Result<usize> {
        self.ensure_open()?;

        let count = self.record_count().load(Ordering::Acquire);
        if idx as u64 >= count {
            return Err(StoreError::OutOfBounds { index: idx, count });
        }

        let end = offset as u64 + size as u64;
        if end > self.record_size as u64 {
            return Err(StoreError::FieldRange {
                detail: format!(
                    "field range {offset}+{size} exceeds record size {}",
                    self.record_size
                ),
            });
        }

        Ok(HEADER_SIZE + idx * self.record_size + offset as usize)
    }

    pub(crate) fn field_slice(&self, idx: usize, offset: u32, size: u32) -> Result<&[u8]> {
        let start = self.field_start(idx, offset, size)?;
        Ok(self.region.slice(start, size as usize))
    }

    pub(crate) fn field_slice_mut(&self, idx: usize, offset: u32, size: u32) -> Result<&mut [u8]> {
        self.ensure_open()?;
        self.ensure_writable()?;
        let start = self.field_start(idx, offset, size)?;
        // SAFETY: bounds checked against the live record count and the
        // record size, the store is writable, and the caller serializes
        // writes to a record per the seqlock contract.
        Ok(unsafe { self.region.slice_mut(start, size as usize) })
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("record_size", &self.record_size)
            .field("writable", &self.writable)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

/// `HEADER_SIZE + capacity * record_size`, overflow-checked.
fn file_size_for(record_size: u64, capacity: u64) -> Result<usize> {
    let bytes = capacity
        .checked_mul(record_size)
        .and_then(|b| b.checked_add(HEADER_SIZE as u64))
        .ok_or_else(|| StoreError::CapacityOverflow {
            detail: format!("{capacity} records of {record_size} bytes"),
        })?;
    usize::try_from(bytes).map_err(|_| StoreError::CapacityOverflow {
        detail: format!("file size {bytes} overflows usize"),
    })
}
