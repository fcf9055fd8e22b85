//! Fuzz testing for the layout engine.
//!
//! Arbitrary field declarations must either be rejected with a layout
//! error or produce a layout that upholds every placement invariant:
//! aligned offsets, no overlap, declaration order, 8-byte record
//! rounding, and an order-insensitive schema hash.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use mmforge::{compute_layout, FieldDef, FieldKind, SEQ_FIELD_SIZE};

#[derive(Debug, Arbitrary, Clone, Copy)]
enum FuzzKind {
    Bool,
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float32,
    Float64,
    String,
    Bytes,
}

impl From<FuzzKind> for FieldKind {
    fn from(kind: FuzzKind) -> FieldKind {
        match kind {
            FuzzKind::Bool => FieldKind::Bool,
            FuzzKind::Int8 => FieldKind::Int8,
            FuzzKind::Uint8 => FieldKind::Uint8,
            FuzzKind::Int16 => FieldKind::Int16,
            FuzzKind::Uint16 => FieldKind::Uint16,
            FuzzKind::Int32 => FieldKind::Int32,
            FuzzKind::Uint32 => FieldKind::Uint32,
            FuzzKind::Int64 => FieldKind::Int64,
            FuzzKind::Uint64 => FieldKind::Uint64,
            FuzzKind::Float32 => FieldKind::Float32,
            FuzzKind::Float64 => FieldKind::Float64,
            FuzzKind::String => FieldKind::String,
            FuzzKind::Bytes => FieldKind::Bytes,
        }
    }
}

#[derive(Debug, Arbitrary)]
struct FuzzField {
    name: String,
    kind: FuzzKind,
    max_size: Option<u32>,
}

fuzz_target!(|fields: Vec<FuzzField>| {
    let defs: Vec<FieldDef> = fields
        .iter()
        .map(|f| {
            let mut def = FieldDef::new(f.name.clone(), f.kind.into());
            if let Some(max_size) = f.max_size {
                def = def.with_max_size(max_size);
            }
            def
        })
        .collect();

    let Ok(layout) = compute_layout(&defs) else {
        return;
    };

    let mut prev_end = SEQ_FIELD_SIZE;
    for field in layout.fields() {
        assert_eq!(field.offset % field.align, 0);
        assert!(field.offset >= prev_end);
        prev_end = field.offset.checked_add(field.size).expect("field end fits u32");
    }
    assert_eq!(layout.record_size() % 8, 0);
    assert!(layout.record_size() >= prev_end);

    // The digest must not depend on declaration order.
    let mut reversed = defs;
    reversed.reverse();
    if let Ok(mirror) = compute_layout(&reversed) {
        assert_eq!(layout.schema_hash(), mirror.schema_hash());
    }
});
