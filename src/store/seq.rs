//! # Per-Record Seqlock
//!
//! The first 8 bytes of every record hold an atomic u64 sequence counter
//! that makes single-writer / many-reader field access safe without
//! locks:
//!
//! ```text
//! writer:  begin_write(i)   counter += 1  -> odd ("write in progress")
//!          ... field writes within record i ...
//!          end_write(i)     counter += 1  -> even, publishes the writes
//!
//! reader:  seq = read_begin(i)      (odd -> a write is in flight, spin)
//!          ... speculative field reads ...
//!          read_valid(i, seq)       (false -> discard values, retry)
//! ```
//!
//! Readers are wait-free while no writer is active, and under contention
//! a reader eventually lands on a quiescent interval: every successful
//! write advances the counter by exactly two, so an unchanged even value
//! brackets an interference-free read.
//!
//! ## Crash Recovery
//!
//! A writer dying between begin and end leaves the counter odd forever,
//! which would spin readers after reopen. Writable opens therefore scan
//! `[0, record_count)` and bump each odd counter once to the next even
//! value. Readers that sampled the stuck value still observe "counter
//! changed" and retry rather than accepting a torn snapshot.

use std::sync::atomic::{fence, AtomicU64, Ordering};

use tracing::info;

use crate::error::Result;
use crate::store::Store;
use crate::storage::HEADER_SIZE;

impl Store {
    /// Marks the start of a write to record `idx`; the counter becomes
    /// odd. Pair with [`end_write`]; the writer is expected to hold the
    /// record exclusively (single writer, or an external per-record
    /// mutex).
    ///
    /// [`end_write`]: Store::end_write
    pub fn begin_write(&self, idx: usize) -> Result<()> {
        self.ensure_open()?;
        self.ensure_writable()?;
        // The acquire half keeps the following field writes from
        // floating above the odd transition.
        self.seq_counter(idx)?.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Marks the end of a write to record `idx`; the counter becomes even
    /// again and the release publishes every field write in between to
    /// readers that observe the new value.
    pub fn end_write(&self, idx: usize) -> Result<()> {
        self.ensure_open()?;
        self.ensure_writable()?;
        self.seq_counter(idx)?.fetch_add(1, Ordering::Release);
        Ok(())
    }

    /// Loads record `idx`'s sequence counter. An odd value means a write
    /// is in progress; spin until even before reading fields.
    pub fn read_begin(&self, idx: usize) -> Result<u64> {
        Ok(self.seq_counter(idx)?.load(Ordering::Acquire))
    }

    /// Returns true iff `seq` was even and the counter still holds it,
    /// i.e. no write overlapped the reads since [`read_begin`].
    ///
    /// [`read_begin`]: Store::read_begin
    pub fn read_valid(&self, idx: usize, seq: u64) -> Result<bool> {
        let counter = self.seq_counter(idx)?;
        // Keep the speculative field reads from drifting past the
        // validating reload.
        fence(Ordering::Acquire);
        Ok(seq & 1 == 0 && counter.load(Ordering::Relaxed) == seq)
    }

    /// Bumps every odd counter in `[0, record_count)` to the next even
    /// value. Runs on writable open; counters left odd by a crashed
    /// writer would otherwise spin readers forever.
    pub(crate) fn recover_seqlocks(&self) {
        let count = self.len();
        let mut recovered = 0u64;
        for idx in 0..count {
            let counter = self
                .region
                .atomic_u64(HEADER_SIZE + idx * self.record_size);
            if counter.load(Ordering::Acquire) & 1 == 1 {
                counter.fetch_add(1, Ordering::AcqRel);
                recovered += 1;
            }
        }
        if recovered > 0 {
            info!(path = %self.path.display(), recovered, "recovered interrupted seqlock writes");
        }
    }

    /// The counter for record `idx`, after the closed and bounds checks.
    fn seq_counter(&self, idx: usize) -> Result<&AtomicU64> {
        // The counter is the record's first 8 bytes: offset 0, size 8.
        let start = self.field_start(idx, 0, 8)?;
        Ok(self.region.atomic_u64(start))
    }
}
