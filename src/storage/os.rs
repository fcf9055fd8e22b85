//! # OS Facade
//!
//! [`MmapOs`] abstracts the handful of syscalls the mapping layer needs:
//! reserving address space, fixed-address file mapping, unmapping, access
//! advice, synchronous flush, and file sizing. Production code uses
//! [`SysMmap`]; region unit tests substitute a recording fake to inject
//! failures at any step and to verify that partial failures unwind the
//! reservation.
//!
//! ## Why a trait
//!
//! `madvise`, `msync`, and `MAP_FIXED` failures are nearly impossible to
//! provoke from an integration test, but the region must unwind correctly
//! when they happen. Putting the syscalls behind a seam keeps the fault
//! paths testable without conditional compilation or global state.
//!
//! This crate targets Unix: the reservation trick relies on `PROT_NONE`
//! anonymous mappings and `MAP_FIXED` placement.

use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;
use std::ptr;
use std::sync::OnceLock;

/// Kernel read-ahead hint for a mapped region.
///
/// `Sequential` asks for aggressive prefetch; `Random` disables it so the
/// page cache keeps more resident pages instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPattern {
    Sequential,
    Random,
}

impl AccessPattern {
    fn advice(self) -> libc::c_int {
        match self {
            AccessPattern::Sequential => libc::MADV_SEQUENTIAL,
            AccessPattern::Random => libc::MADV_RANDOM,
        }
    }
}

/// Syscall facade used by the region.
///
/// All addresses passed to these methods come from a prior [`reserve`]
/// call on the same implementation; lengths are page-aligned by the
/// caller.
///
/// [`reserve`]: MmapOs::reserve
pub trait MmapOs: Send + Sync {
    /// Reserves `len` bytes of contiguous virtual address space with no
    /// access permission. Consumes address space only, not memory.
    fn reserve(&self, len: usize) -> io::Result<*mut u8>;

    /// Maps the first `len` bytes of `file` at exactly `addr` with
    /// shared-writeback semantics, read-only unless `writable`.
    fn map_fixed(&self, addr: *mut u8, len: usize, file: &File, writable: bool) -> io::Result<()>;

    /// Releases `len` bytes of mappings starting at `addr`.
    fn unmap(&self, addr: *mut u8, len: usize) -> io::Result<()>;

    /// Applies the access-pattern hint to `[addr, addr+len)`.
    ///
    /// Implementations must treat "the platform does not implement the
    /// advice call" as success; any other failure propagates.
    fn advise(&self, addr: *mut u8, len: usize, access: AccessPattern) -> io::Result<()>;

    /// Synchronously flushes dirty pages in `[addr, addr+len)` to stable
    /// storage.
    fn sync(&self, addr: *mut u8, len: usize) -> io::Result<()>;

    /// Extends or shrinks `file` to exactly `len` bytes.
    fn truncate(&self, file: &File, len: u64) -> io::Result<()>;

    /// Current size of `file` in bytes.
    fn file_len(&self, file: &File) -> io::Result<u64>;
}

/// Production [`MmapOs`] over raw syscalls.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysMmap;

impl MmapOs for SysMmap {
    fn reserve(&self, len: usize) -> io::Result<*mut u8> {
        // SAFETY: anonymous PROT_NONE mapping at a kernel-chosen address.
        // No file, no access permissions, no aliasing of existing memory.
        let addr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        Ok(addr.cast())
    }

    fn map_fixed(&self, addr: *mut u8, len: usize, file: &File, writable: bool) -> io::Result<()> {
        let mut prot = libc::PROT_READ;
        if writable {
            prot |= libc::PROT_WRITE;
        }
        // SAFETY: addr lies inside a reservation obtained from `reserve`,
        // so MAP_FIXED replaces pages this process owns and nothing else.
        // MAP_SHARED makes writes visible to other mappings of the file
        // and eligible for writeback.
        let mapped = unsafe {
            libc::mmap(
                addr.cast(),
                len,
                prot,
                libc::MAP_SHARED | libc::MAP_FIXED,
                file.as_raw_fd(),
                0,
            )
        };
        if mapped == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        if mapped != addr.cast() {
            // MAP_FIXED guarantees placement; a different address means the
            // kernel ignored the flag.
            return Err(io::Error::other(format!(
                "mmap returned {mapped:p}, requested {addr:p}"
            )));
        }
        Ok(())
    }

    fn unmap(&self, addr: *mut u8, len: usize) -> io::Result<()> {
        // SAFETY: releases a range this module previously mapped. The
        // caller guarantees no live references into the range remain.
        let rc = unsafe { libc::munmap(addr.cast(), len) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn advise(&self, addr: *mut u8, len: usize, access: AccessPattern) -> io::Result<()> {
        // SAFETY: hint over a mapped range; madvise never faults the range.
        let rc = unsafe { libc::madvise(addr.cast(), len, access.advice()) };
        if rc != 0 {
            let err = io::Error::last_os_error();
            // A kernel without madvise is fine; the hint is optional.
            if err.raw_os_error() == Some(libc::ENOSYS) {
                return Ok(());
            }
            return Err(err);
        }
        Ok(())
    }

    fn sync(&self, addr: *mut u8, len: usize) -> io::Result<()> {
        // SAFETY: flushes a mapped range; MS_SYNC blocks until the pages
        // reach stable storage.
        let rc = unsafe { libc::msync(addr.cast(), len, libc::MS_SYNC) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn truncate(&self, file: &File, len: u64) -> io::Result<()> {
        file.set_len(len)
    }

    fn file_len(&self, file: &File) -> io::Result<u64> {
        Ok(file.metadata()?.len())
    }
}

/// System page size, queried once.
pub fn page_size() -> usize {
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
    *PAGE_SIZE.get_or_init(|| {
        // SAFETY: sysconf is always callable; _SC_PAGESIZE cannot fail on
        // any supported platform.
        let sz = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if sz <= 0 {
            4096
        } else {
            sz as usize
        }
    })
}

/// Rounds `n` up to the next page boundary. Zero becomes one page: a
/// zero-length mapping is never useful and not always legal.
pub fn page_align(n: usize) -> usize {
    let page = page_size();
    if n == 0 {
        return page;
    }
    ((n - 1) / page + 1) * page
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_align_rounds_up_to_page_boundary() {
        let page = page_size();
        assert_eq!(page_align(0), page);
        assert_eq!(page_align(1), page);
        assert_eq!(page_align(page), page);
        assert_eq!(page_align(page + 1), 2 * page);
    }

    #[test]
    fn page_size_is_a_power_of_two() {
        let page = page_size();
        assert!(page >= 512);
        assert_eq!(page & (page - 1), 0);
    }
}
