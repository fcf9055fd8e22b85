//! # Record Layout Engine
//!
//! This module turns an ordered list of field declarations into the byte
//! layout of one fixed-size record: per-field offsets, slot sizes, and
//! alignments, plus the total record size.
//!
//! ## Record Binary Layout
//!
//! ```text
//! +------------------+----------+----------+-----+----------+---------+
//! | Seqlock counter  | field 0  | field 1  | ... | field N  | padding |
//! | (u64, offset 0)  |          |          |     |          | (to 8)  |
//! +------------------+----------+----------+-----+----------+---------+
//! ```
//!
//! The first 8 bytes of every record are reserved for the per-record
//! sequence counter; user fields start at offset 8. Fields are placed in
//! declaration order, each padded up to its natural alignment, and the
//! record size is rounded up to a multiple of 8 so the next record's
//! counter is 8-byte aligned.
//!
//! ## Slot Sizes
//!
//! | Kind | Slot size | Alignment |
//! |------|-----------|-----------|
//! | bool, int8, uint8 | 1 | 1 |
//! | int16, uint16 | 2 | 2 |
//! | int32, uint32, float32 | 4 | 4 |
//! | int64, uint64, float64 | 8 | 8 |
//! | string, bytes | 4 + max_size | 4 |
//!
//! Variable-length kinds store a 4-byte little-endian length prefix
//! followed by `max_size` payload bytes; the slot size is fixed, so
//! records never move.
//!
//! ## Schema Identity
//!
//! [`RecordLayout::descriptors`] reduces the layout to `(name, kind, size)`
//! triples; [`digest::schema_hash`] digests them order-insensitively. Two
//! layouts that differ only in field declaration order hash identically;
//! renaming, retyping, or resizing any field changes the hash.

pub mod digest;

#[cfg(test)]
mod tests;

use crate::error::{Result, StoreError};

pub use digest::{schema_hash, FieldDescriptor};

/// Bytes reserved at the start of every record for the seqlock counter.
pub const SEQ_FIELD_SIZE: u32 = 8;

/// Closed enumeration of the primitive storage kinds.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Bool = 0,
    Int8 = 1,
    Uint8 = 2,
    Int16 = 3,
    Uint16 = 4,
    Int32 = 5,
    Uint32 = 6,
    Int64 = 7,
    Uint64 = 8,
    Float32 = 9,
    Float64 = 10,
    String = 11,
    Bytes = 12,
}

impl FieldKind {
    /// Canonical kind name used in the schema digest.
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Bool => "bool",
            FieldKind::Int8 => "int8",
            FieldKind::Uint8 => "uint8",
            FieldKind::Int16 => "int16",
            FieldKind::Uint16 => "uint16",
            FieldKind::Int32 => "int32",
            FieldKind::Uint32 => "uint32",
            FieldKind::Int64 => "int64",
            FieldKind::Uint64 => "uint64",
            FieldKind::Float32 => "float32",
            FieldKind::Float64 => "float64",
            FieldKind::String => "string",
            FieldKind::Bytes => "bytes",
        }
    }

    /// True for kinds that carry a length-prefixed payload.
    pub fn is_variable(&self) -> bool {
        matches!(self, FieldKind::String | FieldKind::Bytes)
    }

    /// Returns `(slot_size, alignment)` for this kind, consulting
    /// `max_size` for the variable-length kinds.
    fn slot(&self, field: &FieldDef) -> Result<(u32, u32)> {
        match self {
            FieldKind::Bool | FieldKind::Int8 | FieldKind::Uint8 => Ok((1, 1)),
            FieldKind::Int16 | FieldKind::Uint16 => Ok((2, 2)),
            FieldKind::Int32 | FieldKind::Uint32 | FieldKind::Float32 => Ok((4, 4)),
            FieldKind::Int64 | FieldKind::Uint64 | FieldKind::Float64 => Ok((8, 8)),
            FieldKind::String | FieldKind::Bytes => {
                let max_size = field.max_size.ok_or_else(|| StoreError::InvalidMaxSize {
                    field: field.name.clone(),
                    detail: format!("max_size required for {}", self.name()),
                })?;
                if max_size == 0 {
                    return Err(StoreError::InvalidMaxSize {
                        field: field.name.clone(),
                        detail: format!("max_size must be non-zero for {}", self.name()),
                    });
                }
                let slot = max_size
                    .checked_add(4)
                    .ok_or_else(|| StoreError::InvalidMaxSize {
                        field: field.name.clone(),
                        detail: format!("max_size {max_size} overflows the 4-byte length prefix"),
                    })?;
                Ok((slot, 4))
            }
        }
    }
}

/// One declared field: the input to the layout engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Canonical name, used for schema hashing and uniqueness.
    pub name: String,
    /// Display name used by generated accessors. Defaults to `name`.
    pub display_name: String,
    pub kind: FieldKind,
    /// Maximum payload size for string/bytes fields. Ignored otherwise.
    pub max_size: Option<u32>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            kind,
            max_size: None,
        }
    }

    /// Sets the payload capacity of a string/bytes field.
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Overrides the accessor display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

/// A field placed inside a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    pub def: FieldDef,
    /// Byte offset from the start of the record.
    pub offset: u32,
    /// Slot size in bytes (including the length prefix for variable kinds).
    pub size: u32,
    pub align: u32,
}

/// The complete byte layout of one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    fields: Vec<FieldLayout>,
    record_size: u32,
}

impl RecordLayout {
    pub fn fields(&self) -> &[FieldLayout] {
        &self.fields
    }

    /// Total record size in bytes, always a multiple of 8.
    pub fn record_size(&self) -> u32 {
        self.record_size
    }

    /// Looks up a field layout by canonical name.
    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|f| f.def.name == name)
    }

    /// Reduces the layout to the `(name, kind, size)` triples that feed
    /// the schema digest.
    pub fn descriptors(&self) -> Vec<FieldDescriptor> {
        self.fields
            .iter()
            .map(|f| FieldDescriptor {
                name: f.def.name.clone(),
                kind: f.def.kind.name(),
                size: f.size,
            })
            .collect()
    }

    /// Schema hash of this layout's descriptors.
    pub fn schema_hash(&self) -> [u8; 32] {
        schema_hash(&self.descriptors())
    }
}

/// Computes the byte layout for `fields` in declaration order.
///
/// Offset 0 holds the seqlock counter, so the first user field lands at
/// offset 8 or later. Every field is padded up to its natural alignment
/// and the record size is rounded up to a multiple of 8.
pub fn compute_layout(fields: &[FieldDef]) -> Result<RecordLayout> {
    if fields.is_empty() {
        return Err(StoreError::EmptyLayout);
    }

    let mut seen = std::collections::HashSet::with_capacity(fields.len());
    let mut layouts = Vec::with_capacity(fields.len());
    let mut offset = SEQ_FIELD_SIZE;

    for field in fields {
        if !seen.insert(field.name.as_str()) {
            return Err(StoreError::DuplicateField {
                name: field.name.clone(),
            });
        }
        let (size, align) = field.kind.slot(field)?;

        let rem = offset % align;
        if rem != 0 {
            offset += align - rem;
        }

        layouts.push(FieldLayout {
            def: field.clone(),
            offset,
            size,
            align,
        });
        offset = offset
            .checked_add(size)
            .ok_or_else(|| StoreError::InvalidMaxSize {
                field: field.name.clone(),
                detail: format!("field at offset {offset} pushes the record past u32::MAX"),
            })?;
    }

    let rem = offset % 8;
    let record_size = if rem != 0 {
        offset
            .checked_add(8 - rem)
            .ok_or_else(|| StoreError::CapacityOverflow {
                detail: format!("record size {offset} cannot be padded to a multiple of 8"),
            })?
    } else {
        offset
    };

    Ok(RecordLayout {
        fields: layouts,
        record_size,
    })
}
