//! # Field Write Primitives
//!
//! Byte-typed writers paired with the readers in [`read`](super::read):
//! little-endian encode of exactly the kind's slot size, after the shared
//! closed/bounds/writable checks. An over-long string or bytes value is
//! rejected before the slot is touched, so a failed write never leaves a
//! half-mutated field.
//!
//! Writers racing concurrent readers must bracket their writes with
//! [`begin_write`]/[`end_write`] so readers can detect interference; the
//! store never does this implicitly, because one seqlock pair usually
//! covers several field writes.
//!
//! [`begin_write`]: crate::store::Store::begin_write
//! [`end_write`]: crate::store::Store::end_write

use crate::error::{Result, StoreError};
use crate::store::read::check_slot;
use crate::store::Store;

macro_rules! write_primitive {
    ($(#[$doc:meta])* $name:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $name(&self, idx: usize, offset: u32, value: $ty) -> Result<()> {
            const SIZE: usize = std::mem::size_of::<$ty>();
            let slot = self.field_slice_mut(idx, offset, SIZE as u32)?;
            slot.copy_from_slice(&value.to_le_bytes());
            Ok(())
        }
    };
}

impl Store {
    /// Writes a bool (one byte, 1 or 0) into record `idx`.
    pub fn write_bool(&self, idx: usize, offset: u32, value: bool) -> Result<()> {
        let slot = self.field_slice_mut(idx, offset, 1)?;
        slot[0] = value as u8;
        Ok(())
    }

    write_primitive!(
        /// Writes an i8 into record `idx` at `offset`.
        write_i8, i8
    );
    write_primitive!(
        /// Writes a u8 into record `idx` at `offset`.
        write_u8, u8
    );
    write_primitive!(
        /// Writes a little-endian i16 into record `idx` at `offset`.
        write_i16, i16
    );
    write_primitive!(
        /// Writes a little-endian u16 into record `idx` at `offset`.
        write_u16, u16
    );
    write_primitive!(
        /// Writes a little-endian i32 into record `idx` at `offset`.
        write_i32, i32
    );
    write_primitive!(
        /// Writes a little-endian u32 into record `idx` at `offset`.
        write_u32, u32
    );
    write_primitive!(
        /// Writes a little-endian i64 into record `idx` at `offset`.
        write_i64, i64
    );
    write_primitive!(
        /// Writes a little-endian u64 into record `idx` at `offset`.
        write_u64, u64
    );
    write_primitive!(
        /// Writes a little-endian f32 into record `idx` at `offset`.
        write_f32, f32
    );
    write_primitive!(
        /// Writes a little-endian f64 into record `idx` at `offset`.
        write_f64, f64
    );

    /// Writes a length-prefixed string into the field's slot, zeroing the
    /// unused tail so readers never see stale bytes.
    ///
    /// Fails with `StringTooLong` (and does not touch the slot) when the
    /// value exceeds `max_size`.
    pub fn write_string(
        &self,
        idx: usize,
        offset: u32,
        slot_size: u32,
        max_size: u32,
        value: &str,
    ) -> Result<()> {
        if value.len() > max_size as usize {
            return Err(StoreError::StringTooLong {
                offset,
                len: value.len(),
                max_size,
            });
        }
        self.write_var(idx, offset, slot_size, max_size, value.as_bytes())
    }

    /// Writes a length-prefixed byte slice into the field's slot, zeroing
    /// the unused tail.
    ///
    /// Fails with `BytesTooLong` (and does not touch the slot) when the
    /// value exceeds `max_size`.
    pub fn write_bytes(
        &self,
        idx: usize,
        offset: u32,
        slot_size: u32,
        max_size: u32,
        value: &[u8],
    ) -> Result<()> {
        if value.len() > max_size as usize {
            return Err(StoreError::BytesTooLong {
                offset,
                len: value.len(),
                max_size,
            });
        }
        self.write_var(idx, offset, slot_size, max_size, value)
    }

    fn write_var(
        &self,
        idx: usize,
        offset: u32,
        slot_size: u32,
        max_size: u32,
        value: &[u8],
    ) -> Result<()> {
        check_slot(offset, slot_size, max_size)?;
        let slot = self.field_slice_mut(idx, offset, slot_size)?;

        let len = value.len();
        slot[..4].copy_from_slice(&(len as u32).to_le_bytes());
        slot[4..4 + len].copy_from_slice(value);
        slot[4 + len..].fill(0);
        Ok(())
    }
}
