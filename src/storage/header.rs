//! # File Header Codec
//!
//! Every store file begins with a fixed 64-byte header. All multi-byte
//! fields are little-endian; the struct is a zerocopy view so encode and
//! decode are plain byte copies with validation on top.
//!
//! ## Header Layout
//!
//! ```text
//! offset  size  field
//!      0     4  magic "MMFG"
//!      4     4  format_version (= 1)
//!      8    32  schema_hash (SHA-256 of the canonical descriptors)
//!     40     4  schema_version (user-supplied)
//!     44     4  record_size
//!     48     8  record_count   <- live, updated atomically in place
//!     56     8  capacity       <- live, updated atomically in place
//! ```
//!
//! `record_count` and `capacity` are the source of truth while a store is
//! open: the store reads and writes them as atomic u64s directly through
//! the mapping. The decoded header's copies are snapshots.
//!
//! Decoding validates magic and format version only; schema-hash
//! validation belongs to the store, which knows the expected layout.

use zerocopy::little_endian::{U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::{Result, StoreError};
use crate::storage::{FORMAT_VERSION, HEADER_SIZE, MAGIC};

/// The 64-byte store file header.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct StoreHeader {
    magic: [u8; 4],
    format_version: U32,
    schema_hash: [u8; 32],
    schema_version: U32,
    record_size: U32,
    record_count: U64,
    capacity: U64,
}

const _: () = assert!(std::mem::size_of::<StoreHeader>() == HEADER_SIZE);

/// Byte offset of the live `record_count` word.
pub const RECORD_COUNT_OFFSET: usize = std::mem::offset_of!(StoreHeader, record_count);
/// Byte offset of the live `capacity` word.
pub const CAPACITY_OFFSET: usize = std::mem::offset_of!(StoreHeader, capacity);

const _: () = assert!(RECORD_COUNT_OFFSET == 48);
const _: () = assert!(CAPACITY_OFFSET == 56);

impl StoreHeader {
    /// Builds the header for a freshly created store.
    pub fn new(schema_hash: [u8; 32], schema_version: u32, record_size: u32, capacity: u64) -> Self {
        Self {
            magic: MAGIC,
            format_version: U32::new(FORMAT_VERSION),
            schema_hash,
            schema_version: U32::new(schema_version),
            record_size: U32::new(record_size),
            record_count: U64::new(0),
            capacity: U64::new(capacity),
        }
    }

    /// Decodes and validates the first 64 bytes of `src`.
    pub fn decode(src: &[u8]) -> Result<StoreHeader> {
        if src.len() < HEADER_SIZE {
            return Err(StoreError::HeaderTooSmall {
                len: src.len(),
                required: HEADER_SIZE,
            });
        }
        let header =
            StoreHeader::read_from_bytes(&src[..HEADER_SIZE]).map_err(|_| {
                StoreError::HeaderTooSmall {
                    len: src.len(),
                    required: HEADER_SIZE,
                }
            })?;

        if header.magic != MAGIC {
            return Err(StoreError::BadMagic {
                found: header.magic,
                expected: MAGIC,
            });
        }
        if header.format_version() != FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: header.format_version(),
                supported: FORMAT_VERSION,
            });
        }
        Ok(header)
    }

    /// Encodes the header into the first 64 bytes of `dst`.
    pub fn encode_into(&self, dst: &mut [u8]) -> Result<()> {
        if dst.len() < HEADER_SIZE {
            return Err(StoreError::HeaderTooSmall {
                len: dst.len(),
                required: HEADER_SIZE,
            });
        }
        dst[..HEADER_SIZE].copy_from_slice(self.as_bytes());
        Ok(())
    }

    pub fn magic(&self) -> [u8; 4] {
        self.magic
    }

    pub fn schema_hash(&self) -> &[u8; 32] {
        &self.schema_hash
    }

    zerocopy_accessors! {
        format_version: u32,
        schema_version: u32,
        record_size: u32,
        record_count: u64,
        capacity: u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StoreHeader {
        let mut header = StoreHeader::new([0xab; 32], 7, 24, 64);
        header.set_record_count(5);
        header
    }

    #[test]
    fn header_round_trips_through_encode_and_decode() {
        let header = sample();
        let mut buf = [0u8; HEADER_SIZE];
        header.encode_into(&mut buf).unwrap();

        let decoded = StoreHeader::decode(&buf).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(decoded.schema_version(), 7);
        assert_eq!(decoded.record_size(), 24);
        assert_eq!(decoded.record_count(), 5);
        assert_eq!(decoded.capacity(), 64);
    }

    #[test]
    fn header_fields_land_at_documented_offsets() {
        let header = sample();
        let mut buf = [0u8; HEADER_SIZE];
        header.encode_into(&mut buf).unwrap();

        assert_eq!(&buf[0..4], b"MMFG");
        assert_eq!(u32::from_le_bytes(buf[4..8].try_into().unwrap()), 1);
        assert_eq!(&buf[8..40], &[0xab; 32]);
        assert_eq!(u32::from_le_bytes(buf[40..44].try_into().unwrap()), 7);
        assert_eq!(u32::from_le_bytes(buf[44..48].try_into().unwrap()), 24);
        assert_eq!(u64::from_le_bytes(buf[48..56].try_into().unwrap()), 5);
        assert_eq!(u64::from_le_bytes(buf[56..64].try_into().unwrap()), 64);
    }

    #[test]
    fn decode_rejects_bad_magic() {
        let mut buf = [0u8; HEADER_SIZE];
        sample().encode_into(&mut buf).unwrap();
        buf[0..4].copy_from_slice(b"NOPE");

        match StoreHeader::decode(&buf).unwrap_err() {
            StoreError::BadMagic { found, expected } => {
                assert_eq!(&found, b"NOPE");
                assert_eq!(&expected, b"MMFG");
            }
            other => panic!("expected BadMagic, got {other:?}"),
        }
    }

    #[test]
    fn decode_rejects_unsupported_format_version() {
        let mut buf = [0u8; HEADER_SIZE];
        sample().encode_into(&mut buf).unwrap();
        buf[4..8].copy_from_slice(&99u32.to_le_bytes());

        match StoreHeader::decode(&buf).unwrap_err() {
            StoreError::UnsupportedVersion { found, supported } => {
                assert_eq!(found, 99);
                assert_eq!(supported, 1);
            }
            other => panic!("expected UnsupportedVersion, got {other:?}"),
        }
    }

    #[test]
    fn decode_rejects_short_buffers() {
        let err = StoreHeader::decode(&[0u8; 32]).unwrap_err();
        assert!(matches!(err, StoreError::HeaderTooSmall { len: 32, .. }));
    }

    #[test]
    fn encode_rejects_short_buffers() {
        let mut buf = [0u8; 16];
        let err = sample().encode_into(&mut buf).unwrap_err();
        assert!(matches!(err, StoreError::HeaderTooSmall { len: 16, .. }));
    }
}
