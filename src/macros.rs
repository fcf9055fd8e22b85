//! # Internal Macros
//!
//! Boilerplate reduction for zerocopy header structs whose fields use the
//! little-endian wrapper types (`U32`, `U64`).
//!
//! ```ignore
//! impl StoreHeader {
//!     zerocopy_accessors! {
//!         format_version: u32,
//!         record_count: u64,
//!     }
//! }
//! // Generates `format_version()` / `set_format_version()` and
//! // `record_count()` / `set_record_count()`.
//! ```

/// Generates getter and setter methods for zerocopy little-endian fields.
#[macro_export]
macro_rules! zerocopy_accessors {
    (@impl $field:ident, u32) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u32 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u32) {
                self.$field = ::zerocopy::little_endian::U32::new(val);
            }
        }
    };
    (@impl $field:ident, u64) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u64 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u64) {
                self.$field = ::zerocopy::little_endian::U64::new(val);
            }
        }
    };
    ($($field:ident : $ty:tt),* $(,)?) => {
        $(
            $crate::zerocopy_accessors!(@impl $field, $ty);
        )*
    };
}
