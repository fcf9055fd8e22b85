//! # Field Read Primitives
//!
//! Byte-typed readers that generated accessors wrap: each takes a record
//! index and a field byte offset and decodes exactly the kind's slot size
//! as little-endian. All of them share one bounds check against the live
//! record count; a failed read leaves the store usable.
//!
//! String and bytes reads are zero-copy: they return borrows into the
//! mapping, valid for the store's lifetime (the base address never
//! moves, even across growth). For a consistent snapshot under a
//! concurrent writer, bracket reads with [`read_begin`]/[`read_valid`].
//!
//! [`read_begin`]: crate::store::Store::read_begin
//! [`read_valid`]: crate::store::Store::read_valid

use crate::error::{Result, StoreError};
use crate::store::Store;

macro_rules! read_primitive {
    ($(#[$doc:meta])* $name:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $name(&self, idx: usize, offset: u32) -> Result<$ty> {
            const SIZE: usize = std::mem::size_of::<$ty>();
            let bytes = self.field_slice(idx, offset, SIZE as u32)?;
            let mut buf = [0u8; SIZE];
            buf.copy_from_slice(bytes);
            Ok(<$ty>::from_le_bytes(buf))
        }
    };
}

impl Store {
    /// Reads a bool (one byte; 1 is true) from record `idx`.
    pub fn read_bool(&self, idx: usize, offset: u32) -> Result<bool> {
        let bytes = self.field_slice(idx, offset, 1)?;
        Ok(bytes[0] == 1)
    }

    read_primitive!(
        /// Reads an i8 from record `idx` at `offset`.
        read_i8, i8
    );
    read_primitive!(
        /// Reads a u8 from record `idx` at `offset`.
        read_u8, u8
    );
    read_primitive!(
        /// Reads a little-endian i16 from record `idx` at `offset`.
        read_i16, i16
    );
    read_primitive!(
        /// Reads a little-endian u16 from record `idx` at `offset`.
        read_u16, u16
    );
    read_primitive!(
        /// Reads a little-endian i32 from record `idx` at `offset`.
        read_i32, i32
    );
    read_primitive!(
        /// Reads a little-endian u32 from record `idx` at `offset`.
        read_u32, u32
    );
    read_primitive!(
        /// Reads a little-endian i64 from record `idx` at `offset`.
        read_i64, i64
    );
    read_primitive!(
        /// Reads a little-endian u64 from record `idx` at `offset`.
        read_u64, u64
    );
    read_primitive!(
        /// Reads a little-endian f32 from record `idx` at `offset`.
        read_f32, f32
    );
    read_primitive!(
        /// Reads a little-endian f64 from record `idx` at `offset`.
        read_f64, f64
    );

    /// Reads a length-prefixed string field zero-copy.
    ///
    /// `slot_size` is the field's full slot (`4 + max_size`). The borrow
    /// is valid for the store's lifetime; callers wanting a consistent
    /// view under a concurrent writer must validate with the seqlock and
    /// copy out before retrying.
    ///
    /// Fails with `Corrupted` if the stored length prefix exceeds
    /// `max_size` or the payload is not valid UTF-8.
    pub fn read_string(
        &self,
        idx: usize,
        offset: u32,
        slot_size: u32,
        max_size: u32,
    ) -> Result<&str> {
        let payload = self.read_var(idx, offset, slot_size, max_size)?;
        std::str::from_utf8(payload).map_err(|e| StoreError::Corrupted {
            offset,
            detail: format!("invalid UTF-8 in string payload: {e}"),
        })
    }

    /// Reads a length-prefixed bytes field zero-copy.
    ///
    /// Same contract as [`read_string`] without the UTF-8 requirement.
    ///
    /// [`read_string`]: Store::read_string
    pub fn read_bytes(
        &self,
        idx: usize,
        offset: u32,
        slot_size: u32,
        max_size: u32,
    ) -> Result<&[u8]> {
        self.read_var(idx, offset, slot_size, max_size)
    }

    fn read_var(&self, idx: usize, offset: u32, slot_size: u32, max_size: u32) -> Result<&[u8]> {
        check_slot(offset, slot_size, max_size)?;
        let slot = self.field_slice(idx, offset, slot_size)?;

        let mut prefix = [0u8; 4];
        prefix.copy_from_slice(&slot[..4]);
        let len = u32::from_le_bytes(prefix);
        if len > max_size {
            return Err(StoreError::Corrupted {
                offset,
                detail: format!("length prefix {len} exceeds max size {max_size}"),
            });
        }
        Ok(&slot[4..4 + len as usize])
    }
}

/// Rejects `(slot_size, max_size)` pairs that do not describe a valid
/// variable-length slot before any slice math happens.
pub(crate) fn check_slot(offset: u32, slot_size: u32, max_size: u32) -> Result<()> {
    if slot_size < 4 || max_size > slot_size - 4 {
        return Err(StoreError::FieldRange {
            detail: format!(
                "slot size {slot_size} cannot hold max size {max_size} at offset {offset}"
            ),
        });
    }
    Ok(())
}
