//! Tests for the layout engine and schema digest

use super::*;

fn u64_field(name: &str) -> FieldDef {
    FieldDef::new(name, FieldKind::Uint64)
}

#[test]
fn layout_places_first_field_after_seqlock_prefix() {
    let layout = compute_layout(&[u64_field("id")]).unwrap();

    assert_eq!(layout.fields().len(), 1);
    assert_eq!(layout.fields()[0].offset, 8);
    assert_eq!(layout.fields()[0].size, 8);
    assert_eq!(layout.record_size(), 16);
}

#[test]
fn layout_pads_fields_to_natural_alignment() {
    let layout = compute_layout(&[
        FieldDef::new("flag", FieldKind::Bool),
        FieldDef::new("value", FieldKind::Int32),
        FieldDef::new("big", FieldKind::Int64),
    ])
    .unwrap();

    // bool at 8, int32 padded to 12, int64 padded to 16.
    assert_eq!(layout.field("flag").unwrap().offset, 8);
    assert_eq!(layout.field("value").unwrap().offset, 12);
    assert_eq!(layout.field("big").unwrap().offset, 16);
    assert_eq!(layout.record_size(), 24);
}

#[test]
fn layout_rounds_record_size_to_multiple_of_eight() {
    let layout = compute_layout(&[FieldDef::new("flag", FieldKind::Bool)]).unwrap();

    assert_eq!(layout.fields()[0].offset, 8);
    assert_eq!(layout.record_size(), 16);
}

#[test]
fn layout_keeps_declaration_order_without_overlap() {
    let layout = compute_layout(&[
        FieldDef::new("a", FieldKind::Uint8),
        FieldDef::new("b", FieldKind::Uint32),
        FieldDef::new("c", FieldKind::Uint16),
        FieldDef::new("d", FieldKind::Float64),
    ])
    .unwrap();

    let names: Vec<&str> = layout.fields().iter().map(|f| f.def.name.as_str()).collect();
    assert_eq!(names, ["a", "b", "c", "d"]);

    for pair in layout.fields().windows(2) {
        assert!(pair[0].offset + pair[0].size <= pair[1].offset);
    }
}

#[test]
fn layout_offsets_respect_alignment_invariant() {
    let layout = compute_layout(&[
        FieldDef::new("s", FieldKind::String).with_max_size(7),
        FieldDef::new("x", FieldKind::Int16),
        FieldDef::new("y", FieldKind::Float32),
        FieldDef::new("z", FieldKind::Bool),
        FieldDef::new("w", FieldKind::Uint64),
    ])
    .unwrap();

    for f in layout.fields() {
        assert_eq!(f.offset % f.align, 0, "field {} misaligned", f.def.name);
    }
    assert_eq!(layout.record_size() % 8, 0);

    let slot_sum: u32 = layout.fields().iter().map(|f| f.size).sum();
    assert!(layout.record_size() >= SEQ_FIELD_SIZE + slot_sum);
}

#[test]
fn layout_sizes_variable_fields_with_length_prefix() {
    let layout =
        compute_layout(&[FieldDef::new("name", FieldKind::String).with_max_size(32)]).unwrap();

    let field = layout.field("name").unwrap();
    assert_eq!(field.offset, 8);
    assert_eq!(field.size, 36);
    assert_eq!(field.align, 4);
    assert_eq!(layout.record_size(), 48);
}

#[test]
fn layout_rejects_empty_field_list() {
    let err = compute_layout(&[]).unwrap_err();
    assert!(matches!(err, StoreError::EmptyLayout));
}

#[test]
fn layout_rejects_duplicate_field_names() {
    let err = compute_layout(&[u64_field("id"), u64_field("id")]).unwrap_err();
    match err {
        StoreError::DuplicateField { name } => assert_eq!(name, "id"),
        other => panic!("expected DuplicateField, got {other:?}"),
    }
}

#[test]
fn layout_rejects_variable_field_without_max_size() {
    let err = compute_layout(&[FieldDef::new("name", FieldKind::String)]).unwrap_err();
    match err {
        StoreError::InvalidMaxSize { field, detail } => {
            assert_eq!(field, "name");
            assert!(detail.contains("max_size required"));
        }
        other => panic!("expected InvalidMaxSize, got {other:?}"),
    }
}

#[test]
fn layout_rejects_zero_max_size() {
    let err =
        compute_layout(&[FieldDef::new("blob", FieldKind::Bytes).with_max_size(0)]).unwrap_err();
    assert!(matches!(err, StoreError::InvalidMaxSize { .. }));
}

#[test]
fn layout_rejects_max_size_overflowing_the_prefix() {
    let err = compute_layout(&[
        FieldDef::new("blob", FieldKind::Bytes).with_max_size(u32::MAX - 3),
    ])
    .unwrap_err();
    assert!(matches!(err, StoreError::InvalidMaxSize { .. }));

    // A slot of u32::MAX bytes is representable but cannot be placed
    // after the seqlock prefix without overflowing the record size.
    let err = compute_layout(&[
        FieldDef::new("blob", FieldKind::Bytes).with_max_size(u32::MAX - 4),
    ])
    .unwrap_err();
    assert!(matches!(err, StoreError::InvalidMaxSize { .. }));

    // The largest slot that fits behind the prefix still lays out.
    let layout = compute_layout(&[
        FieldDef::new("blob", FieldKind::Bytes).with_max_size(u32::MAX - 20),
    ])
    .unwrap();
    assert_eq!(layout.fields()[0].size, u32::MAX - 16);
    assert_eq!(layout.record_size() % 8, 0);
}

#[test]
fn descriptors_reduce_to_name_kind_and_slot_size() {
    let layout = compute_layout(&[
        u64_field("id"),
        FieldDef::new("name", FieldKind::String).with_max_size(16),
    ])
    .unwrap();

    let descs = layout.descriptors();
    assert_eq!(descs.len(), 2);
    assert_eq!(descs[0].name, "id");
    assert_eq!(descs[0].kind, "uint64");
    assert_eq!(descs[0].size, 8);
    assert_eq!(descs[1].name, "name");
    assert_eq!(descs[1].kind, "string");
    assert_eq!(descs[1].size, 20);
}

#[test]
fn schema_hash_is_invariant_under_field_reordering() {
    let forward = compute_layout(&[
        u64_field("id"),
        FieldDef::new("score", FieldKind::Float64),
        FieldDef::new("name", FieldKind::String).with_max_size(32),
    ])
    .unwrap();
    let reversed = compute_layout(&[
        FieldDef::new("name", FieldKind::String).with_max_size(32),
        FieldDef::new("score", FieldKind::Float64),
        u64_field("id"),
    ])
    .unwrap();

    assert_eq!(forward.schema_hash(), reversed.schema_hash());
}

#[test]
fn schema_hash_changes_on_rename() {
    let a = compute_layout(&[u64_field("id")]).unwrap();
    let b = compute_layout(&[u64_field("ident")]).unwrap();
    assert_ne!(a.schema_hash(), b.schema_hash());
}

#[test]
fn schema_hash_changes_on_retype() {
    let a = compute_layout(&[FieldDef::new("value", FieldKind::Uint64)]).unwrap();
    let b = compute_layout(&[FieldDef::new("value", FieldKind::Int64)]).unwrap();
    assert_ne!(a.schema_hash(), b.schema_hash());
}

#[test]
fn schema_hash_changes_on_max_size_change() {
    let a = compute_layout(&[FieldDef::new("name", FieldKind::String).with_max_size(16)]).unwrap();
    let b = compute_layout(&[FieldDef::new("name", FieldKind::String).with_max_size(32)]).unwrap();
    assert_ne!(a.schema_hash(), b.schema_hash());
}

#[test]
fn schema_hash_does_not_reorder_the_input() {
    let descs = vec![
        FieldDescriptor {
            name: "z".into(),
            kind: "uint64",
            size: 8,
        },
        FieldDescriptor {
            name: "a".into(),
            kind: "bool",
            size: 1,
        },
    ];
    let before = descs.clone();
    let _ = schema_hash(&descs);
    assert_eq!(descs, before);
}

#[test]
fn schema_hash_is_stable_across_calls() {
    let layout = compute_layout(&[u64_field("id")]).unwrap();
    assert_eq!(layout.schema_hash(), layout.schema_hash());
}

#[test]
fn display_name_defaults_to_canonical_name() {
    let plain = FieldDef::new("row_id", FieldKind::Uint64);
    assert_eq!(plain.display_name, "row_id");

    let renamed = FieldDef::new("row_id", FieldKind::Uint64).with_display_name("RowId");
    assert_eq!(renamed.name, "row_id");
    assert_eq!(renamed.display_name, "RowId");
}
