//! # Stable-Address Growable Mapping
//!
//! [`Region`] is a memory-mapped view of a file whose base address never
//! changes, even across grow operations. Three guarantees hold for the
//! region's lifetime:
//!
//! 1. **Stable base**: the base virtual address is fixed at map time.
//! 2. **In-place growth**: `grow` extends the file and remaps a larger
//!    prefix over the same base, so slices obtained before the grow stay
//!    valid up to the pre-grow size.
//! 3. **Durability on request**: `sync` blocks until dirty pages reach
//!    stable storage.
//!
//! ## Mechanism
//!
//! Map time reserves a large contiguous virtual address range with
//! `PROT_NONE` (address space, not memory) and maps the file over the
//! head of the reservation with `MAP_FIXED | MAP_SHARED`. Growth
//! truncates the file up and re-issues the fixed-address mapping over a
//! larger prefix of the same reservation. The reservation size is the
//! hard ceiling: growing past it fails rather than moving the base.
//!
//! ## Safety Model
//!
//! The region hands out raw views into shared mutable memory:
//!
//! - [`Region::slice`] returns `&[u8]` views that the store bounds-checks
//!   against the record count before handing out.
//! - [`Region::atomic_u64`] returns an `&AtomicU64` bounded by the
//!   region's lifetime, the only sanctioned way to touch the live header
//!   words and seqlock counters.
//! - [`Region::slice_mut`] is crate-internal and `unsafe`; concurrent
//!   read/write overlap on record bytes is mediated by the seqlock
//!   protocol one layer up.
//!
//! Dropping a region without closing it logs a warning and unmaps as a
//! fallback; the explicit [`Region::close`] contract is what correctness
//! rests on.

use std::fs::File;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::error::{Result, StoreError};
use crate::storage::os::{page_align, AccessPattern, MmapOs, SysMmap};

/// Fallback virtual address reservation when the caller passes 0 (1 GiB).
///
/// Callers sizing a store should pass an explicit value instead; the
/// reservation is clamped to at least the page-aligned file size, so this
/// constant only controls headroom for future growth.
pub const DEFAULT_RESERVE_VA: usize = 1 << 30;

/// A page-aligned, memory-mapped view of a file with a stable base
/// address and in-place growth.
///
/// Owns the underlying [`File`]. Safe for concurrent use once mapped;
/// `grow` must be serialized externally with any other writer (the store
/// uses its append mutex).
pub struct Region {
    os: Arc<dyn MmapOs>,
    file: File,
    base: *mut u8,
    /// Total reserved virtual address range; the grow ceiling.
    reserved: usize,
    /// Currently mapped bytes. Monotonically non-decreasing until unmap.
    size: AtomicUsize,
    mapped: AtomicBool,
    access: AccessPattern,
    writable: bool,
}

// SAFETY: the base pointer refers to a MAP_SHARED region whose address is
// immutable for the region's lifetime. All mutation of region state goes
// through atomics, and all access to the mapped bytes is either read-only,
// atomic, or serialized by the store's seqlock/append contracts.
unsafe impl Send for Region {}
unsafe impl Sync for Region {}

impl Region {
    /// Maps the first `size` bytes of `file` with the production syscall
    /// backend. See [`Region::map_with`].
    pub fn map(
        file: File,
        size: usize,
        writable: bool,
        access: AccessPattern,
        reserve_va: usize,
    ) -> Result<Region> {
        Self::map_with(Arc::new(SysMmap), file, size, writable, access, reserve_va)
    }

    /// Maps the first `size` bytes of `file` over a fresh `reserve_va`-byte
    /// virtual address reservation.
    ///
    /// The reservation is raised to at least the page-aligned `size`;
    /// passing `reserve_va = 0` selects [`DEFAULT_RESERVE_VA`]. If the
    /// file is smaller than `size` it is extended first. The access
    /// pattern is advised to the kernel; a platform without the advice
    /// call is tolerated, any other advice failure unwinds the mapping.
    pub fn map_with(
        os: Arc<dyn MmapOs>,
        file: File,
        size: usize,
        writable: bool,
        access: AccessPattern,
        reserve_va: usize,
    ) -> Result<Region> {
        let aligned = page_align(size);

        let mut reserved = if reserve_va == 0 {
            DEFAULT_RESERVE_VA
        } else {
            reserve_va
        };
        reserved = page_align(reserved.max(aligned));

        let base = os
            .reserve(reserved)
            .map_err(|e| StoreError::io(format!("reserve {reserved} bytes of address space"), e))?;

        // Everything after this point must release the reservation on
        // failure, joining the cleanup outcome into the returned error.
        let unwind = |os: &Arc<dyn MmapOs>, primary: StoreError| -> StoreError {
            let cleanup = os
                .unmap(base, reserved)
                .map_err(|e| StoreError::io("unmap reservation", e));
            primary.join_cleanup(cleanup)
        };

        let file_len = match os.file_len(&file) {
            Ok(len) => len,
            Err(e) => return Err(unwind(&os, StoreError::io("stat mapped file", e))),
        };

        // A file shorter than the mapping would SIGBUS on first touch
        // beyond EOF.
        if file_len < size as u64 {
            if let Err(e) = os.truncate(&file, size as u64) {
                return Err(unwind(&os, StoreError::io(format!("extend file to {size} bytes"), e)));
            }
        }

        if let Err(e) = os.map_fixed(base, size, &file, writable) {
            return Err(unwind(&os, StoreError::io(format!("map {size} bytes at {base:p}"), e)));
        }

        if let Err(e) = os.advise(base, size, access) {
            return Err(unwind(&os, StoreError::io("advise access pattern", e)));
        }

        Ok(Region {
            os,
            file,
            base,
            reserved,
            size: AtomicUsize::new(size),
            mapped: AtomicBool::new(true),
            access,
            writable,
        })
    }

    /// Grows the mapping to at least `min_size` bytes in place.
    ///
    /// No-op when the region is already large enough. Fails with
    /// [`StoreError::ReservationExceeded`] when the page-aligned target
    /// does not fit the reservation. The base address is unchanged, so
    /// previously obtained slices remain valid.
    ///
    /// Callers must serialize grows with any concurrent writer.
    pub fn grow(&self, min_size: usize) -> Result<()> {
        let current = self.size.load(Ordering::Acquire);
        if min_size <= current {
            return Ok(());
        }

        let aligned = page_align(min_size);
        if aligned > self.reserved {
            return Err(StoreError::ReservationExceeded {
                requested: aligned,
                reserved: self.reserved,
            });
        }

        self.os
            .truncate(&self.file, aligned as u64)
            .map_err(|e| StoreError::io(format!("extend file to {aligned} bytes"), e))?;

        self.os
            .map_fixed(self.base, aligned, &self.file, self.writable)
            .map_err(|e| StoreError::io(format!("remap {aligned} bytes at {:p}", self.base), e))?;

        self.os
            .advise(self.base, aligned, self.access)
            .map_err(|e| StoreError::io("advise access pattern", e))?;

        // Publish the new size only after the mapping is fully usable.
        self.size.store(aligned, Ordering::Release);
        Ok(())
    }

    /// Synchronously flushes dirty pages to stable storage.
    pub fn sync(&self) -> Result<()> {
        if !self.mapped.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        let size = self.size.load(Ordering::Acquire);
        self.os
            .sync(self.base, size)
            .map_err(|e| StoreError::io(format!("msync {size} bytes"), e))
    }

    /// Releases the entire reservation. Idempotent.
    pub fn unmap(&self) -> Result<()> {
        if !self.mapped.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        self.size.store(0, Ordering::Release);
        self.os
            .unmap(self.base, self.reserved)
            .map_err(|e| StoreError::io("unmap region", e))
    }

    /// Unmaps the region. The file descriptor is released when the region
    /// drops; Rust offers no fallible close for [`File`].
    pub fn close(&self) -> Result<()> {
        self.unmap()
    }

    /// Currently mapped size in bytes. Zero once unmapped.
    pub fn mapped(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    /// Borrows `n` bytes starting at `offset`.
    ///
    /// The view is valid for the region's lifetime (the base address
    /// never moves). The caller keeps `offset + n` within the mapped
    /// size; the store's bounds checks are that guard.
    pub fn slice(&self, offset: usize, n: usize) -> &[u8] {
        debug_assert!(offset + n <= self.size.load(Ordering::Acquire));
        // SAFETY: the range lies inside the mapping (caller contract,
        // debug-asserted) and the base address is stable for &self's
        // lifetime.
        unsafe { std::slice::from_raw_parts(self.base.add(offset), n) }
    }

    /// Mutably borrows `n` bytes starting at `offset`.
    ///
    /// # Safety
    ///
    /// The caller must keep `offset + n` within the mapped size, must
    /// only call this on a writable region, and must serialize writes to
    /// the same record (the store's seqlock discipline). Concurrent
    /// readers of the same bytes observe torn values by design and
    /// discard them via seqlock validation.
    pub(crate) unsafe fn slice_mut(&self, offset: usize, n: usize) -> &mut [u8] {
        debug_assert!(self.writable);
        debug_assert!(offset + n <= self.size.load(Ordering::Acquire));
        std::slice::from_raw_parts_mut(self.base.add(offset), n)
    }

    /// Returns a typed atomic view of the 8 bytes at `offset`, bounded by
    /// the region's lifetime.
    ///
    /// This is how the live header words and seqlock counters are
    /// accessed; the raw interior pointer never escapes. `offset` must be
    /// 8-byte aligned and inside the mapping.
    pub fn atomic_u64(&self, offset: usize) -> &AtomicU64 {
        debug_assert_eq!(offset % 8, 0);
        debug_assert!(offset + 8 <= self.size.load(Ordering::Acquire));
        // SAFETY: the mapping outlives &self, mmap bases are page-aligned
        // so offset % 8 == 0 gives a properly aligned AtomicU64, and all
        // concurrent access to these 8 bytes goes through atomics.
        unsafe { AtomicU64::from_ptr(self.base.add(offset).cast()) }
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        if self.mapped.load(Ordering::Acquire) {
            warn!(
                reserved = self.reserved,
                "region dropped without close; unmapping"
            );
            let _ = self.unmap();
        }
    }
}

impl std::fmt::Debug for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Region")
            .field("base", &self.base)
            .field("size", &self.size.load(Ordering::Relaxed))
            .field("reserved", &self.reserved)
            .field("writable", &self.writable)
            .finish()
    }
}
