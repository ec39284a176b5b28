use byteorder::{ByteOrder, LittleEndian};
use cesium_json::accessor::ComponentType;
use cesium_json::buffer::{Buffer, View};
use cesium_json::validation::USize64;
use cesium_json::{Index, Root};
use cesium_tiles::property_table::{
    ClassProperty, ClassSchema, MetadataModel, PropertyTable, PropertyTableProperty, PropertyTableView, PropertyType,
    Schema,
};
use std::collections::BTreeMap;

struct Fixture {
    root: Root,
    buffers: Vec<Vec<u8>>,
    schema: Schema,
    table: PropertyTable,
}

fn build_fixture() -> Fixture {
    let mut bytes = Vec::new();

    let id_offset = bytes.len();
    for id in [10u32, 20, 30] {
        let mut encoded = [0u8; 4];
        LittleEndian::write_u32(&mut encoded, id);
        bytes.extend_from_slice(&encoded);
    }
    let id_length = bytes.len() - id_offset;

    let position_offset = bytes.len();
    for position in [[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]] {
        for component in position {
            let mut encoded = [0u8; 4];
            LittleEndian::write_f32(&mut encoded, component);
            bytes.extend_from_slice(&encoded);
        }
    }
    let position_length = bytes.len() - position_offset;

    let tags_offset = bytes.len();
    for row in [[1u16, 2, 3], [4, 5, 6], [7, 8, 9]] {
        for tag in row {
            let mut encoded = [0u8; 2];
            LittleEndian::write_u16(&mut encoded, tag);
            bytes.extend_from_slice(&encoded);
        }
    }
    let tags_length = bytes.len() - tags_offset;

    let buffer_views = vec![
        View { buffer: Index::new(0), byte_length: USize64(id_length as u64), byte_offset: Some(USize64(id_offset as u64)), byte_stride: None, extras: None },
        View { buffer: Index::new(0), byte_length: USize64(position_length as u64), byte_offset: Some(USize64(position_offset as u64)), byte_stride: None, extras: None },
        View { buffer: Index::new(0), byte_length: USize64(tags_length as u64), byte_offset: Some(USize64(tags_offset as u64)), byte_stride: None, extras: None },
    ];

    let root = Root {
        accessors: Vec::new(),
        buffers: vec![Buffer { byte_length: USize64(bytes.len() as u64), extras: None }],
        buffer_views,
        meshes: Vec::new(),
    };

    let mut properties = BTreeMap::new();
    properties.insert(
        "id".to_string(),
        ClassProperty {
            ty: PropertyType::Scalar,
            component_type: Some(ComponentType::U32),
            array: false,
            count: None,
            normalized: false,
            offset_type: None,
            default: None,
            required: true,
            no_data: None,
            offset: None,
            scale: None,
        },
    );
    properties.insert(
        "position".to_string(),
        ClassProperty {
            ty: PropertyType::Vec3,
            component_type: Some(ComponentType::F32),
            array: false,
            count: None,
            normalized: false,
            offset_type: None,
            default: None,
            required: true,
            no_data: None,
            offset: None,
            scale: None,
        },
    );
    properties.insert(
        "tags".to_string(),
        ClassProperty {
            ty: PropertyType::Scalar,
            component_type: Some(ComponentType::U16),
            array: true,
            count: Some(3),
            normalized: false,
            offset_type: None,
            default: None,
            required: true,
            no_data: None,
            offset: None,
            scale: None,
        },
    );
    properties.insert(
        "elevation".to_string(),
        ClassProperty {
            ty: PropertyType::Scalar,
            component_type: Some(ComponentType::F32),
            array: false,
            count: None,
            normalized: false,
            offset_type: None,
            default: Some(serde_json::json!(1.5)),
            required: false,
            no_data: None,
            offset: None,
            scale: None,
        },
    );

    let mut classes = BTreeMap::new();
    classes.insert("Feature".to_string(), ClassSchema { properties });
    let schema = Schema { classes };

    let mut table_properties = BTreeMap::new();
    table_properties.insert(
        "id".to_string(),
        PropertyTableProperty { values: Index::new(0), array_offsets: None, string_offsets: None, string_offset_type: None },
    );
    table_properties.insert(
        "position".to_string(),
        PropertyTableProperty { values: Index::new(1), array_offsets: None, string_offsets: None, string_offset_type: None },
    );
    table_properties.insert(
        "tags".to_string(),
        PropertyTableProperty { values: Index::new(2), array_offsets: None, string_offsets: None, string_offset_type: None },
    );

    let table = PropertyTable {
        class: "Feature".to_string(),
        count: 3,
        properties: table_properties,
    };

    Fixture { root, buffers: vec![bytes], schema, table }
}

#[test]
fn scalar_vector_array_and_default_properties_all_round_trip() {
    let fixture = build_fixture();
    let model = MetadataModel {
        root: &fixture.root,
        buffers: &fixture.buffers,
        schema: Some(Some(&fixture.schema)),
    };
    let view = PropertyTableView::new(&model, &fixture.table);

    assert_eq!(view.class_name(), Some("Feature"));
    assert_eq!(view.size(), 3);

    let ids = view.get_property_view::<u32>("id").unwrap();
    assert_eq!(ids.get_raw(0), 10);
    assert_eq!(ids.get_raw(2), 30);
    assert_eq!(ids.get(0), Some(10.0));

    let positions = view.get_property_view::<[f32; 3]>("position").unwrap();
    assert_eq!(positions.get_raw(1), [4.0, 5.0, 6.0]);

    let tags = view.get_array_property_view::<u16>("tags").unwrap();
    assert_eq!(tags.len(), 3);
    assert_eq!(tags[2].size(), 3);
    assert_eq!(*tags[2].get(0).unwrap(), 7);

    let elevation = view.get_property_view::<f32>("elevation").unwrap();
    for row in 0..3 {
        assert_eq!(elevation.get_raw(row), 1.5);
        assert_eq!(elevation.get(row), Some(1.5));
    }
}

#[test]
fn mismatched_component_type_is_rejected() {
    let fixture = build_fixture();
    let model = MetadataModel {
        root: &fixture.root,
        buffers: &fixture.buffers,
        schema: Some(Some(&fixture.schema)),
    };
    let view = PropertyTableView::new(&model, &fixture.table);
    assert!(view.get_property_view::<i32>("id").is_err());
}

#[test]
fn boolean_property_decodes_bit_packed_values() {
    // values = [0b10101010], count 8: bit i%8 of byte i/8, bit 0 is the LSB.
    let bytes = vec![0b1010_1010u8];

    let buffer_views = vec![View {
        buffer: Index::new(0),
        byte_length: USize64(bytes.len() as u64),
        byte_offset: Some(USize64(0)),
        byte_stride: None,
        extras: None,
    }];
    let root = Root {
        accessors: Vec::new(),
        buffers: vec![Buffer { byte_length: USize64(bytes.len() as u64), extras: None }],
        buffer_views,
        meshes: Vec::new(),
    };

    let mut properties = BTreeMap::new();
    properties.insert(
        "flag".to_string(),
        ClassProperty {
            ty: PropertyType::Boolean,
            component_type: None,
            array: false,
            count: None,
            normalized: false,
            offset_type: None,
            default: None,
            required: true,
            no_data: None,
            offset: None,
            scale: None,
        },
    );
    let mut classes = BTreeMap::new();
    classes.insert("Flags".to_string(), ClassSchema { properties });
    let schema = Schema { classes };

    let mut table_properties = BTreeMap::new();
    table_properties.insert(
        "flag".to_string(),
        PropertyTableProperty { values: Index::new(0), array_offsets: None, string_offsets: None, string_offset_type: None },
    );
    let table = PropertyTable { class: "Flags".to_string(), count: 8, properties: table_properties };

    let model = MetadataModel { root: &root, buffers: &[bytes], schema: Some(Some(&schema)) };
    let view = PropertyTableView::new(&model, &table);
    let flags = view.get_boolean_property_view("flag").unwrap();

    let decoded: Vec<bool> = (0..8).map(|i| flags.get_raw(i)).collect();
    assert_eq!(decoded, vec![false, true, false, true, false, true, false, true]);
}

#[test]
fn string_property_decodes_utf8_rows() {
    let values = b"catdogfish".to_vec();
    let mut offset_bytes = Vec::new();
    for offset in [0u32, 3, 6, 10] {
        let mut encoded = [0u8; 4];
        LittleEndian::write_u32(&mut encoded, offset);
        offset_bytes.extend_from_slice(&encoded);
    }

    let buffer_views = vec![
        View { buffer: Index::new(0), byte_length: USize64(values.len() as u64), byte_offset: Some(USize64(0)), byte_stride: None, extras: None },
        View { buffer: Index::new(1), byte_length: USize64(offset_bytes.len() as u64), byte_offset: Some(USize64(0)), byte_stride: None, extras: None },
    ];
    let root = Root {
        accessors: Vec::new(),
        buffers: vec![
            Buffer { byte_length: USize64(values.len() as u64), extras: None },
            Buffer { byte_length: USize64(offset_bytes.len() as u64), extras: None },
        ],
        buffer_views,
        meshes: Vec::new(),
    };

    let mut properties = BTreeMap::new();
    properties.insert(
        "name".to_string(),
        ClassProperty {
            ty: PropertyType::String,
            component_type: None,
            array: false,
            count: None,
            normalized: false,
            offset_type: None,
            default: None,
            required: true,
            no_data: None,
            offset: None,
            scale: None,
        },
    );
    let mut classes = BTreeMap::new();
    classes.insert("Names".to_string(), ClassSchema { properties });
    let schema = Schema { classes };

    let mut table_properties = BTreeMap::new();
    table_properties.insert(
        "name".to_string(),
        PropertyTableProperty {
            values: Index::new(0),
            array_offsets: None,
            string_offsets: Some(Index::new(1)),
            string_offset_type: Some(ComponentType::U32),
        },
    );
    let table = PropertyTable { class: "Names".to_string(), count: 3, properties: table_properties };

    let model = MetadataModel { root: &root, buffers: &[values, offset_bytes], schema: Some(Some(&schema)) };
    let view = PropertyTableView::new(&model, &table);
    let names = view.get_string_property_view("name").unwrap();

    assert_eq!(names.size(), 3);
    assert_eq!(names.get_raw(0), "cat");
    assert_eq!(names.get_raw(1), "dog");
    assert_eq!(names.get_raw(2), "fish");
}

#[test]
fn normalized_offset_and_scale_resolve_to_expected_values() {
    let bytes = vec![0u8, 128, 255];

    let buffer_views = vec![View {
        buffer: Index::new(0),
        byte_length: USize64(bytes.len() as u64),
        byte_offset: Some(USize64(0)),
        byte_stride: None,
        extras: None,
    }];
    let root = Root {
        accessors: Vec::new(),
        buffers: vec![Buffer { byte_length: USize64(bytes.len() as u64), extras: None }],
        buffer_views,
        meshes: Vec::new(),
    };

    let mut properties = BTreeMap::new();
    properties.insert(
        "intensity".to_string(),
        ClassProperty {
            ty: PropertyType::Scalar,
            component_type: Some(ComponentType::U8),
            array: false,
            count: None,
            normalized: true,
            offset_type: None,
            default: None,
            required: true,
            no_data: None,
            offset: Some(serde_json::json!(1.0)),
            scale: Some(serde_json::json!(2.0)),
        },
    );
    let mut classes = BTreeMap::new();
    classes.insert("Samples".to_string(), ClassSchema { properties });
    let schema = Schema { classes };

    let mut table_properties = BTreeMap::new();
    table_properties.insert(
        "intensity".to_string(),
        PropertyTableProperty { values: Index::new(0), array_offsets: None, string_offsets: None, string_offset_type: None },
    );
    let table = PropertyTable { class: "Samples".to_string(), count: 3, properties: table_properties };

    let model = MetadataModel { root: &root, buffers: &[bytes], schema: Some(Some(&schema)) };
    let view = PropertyTableView::new(&model, &table);
    let intensity = view.get_property_view::<u8>("intensity").unwrap();

    // 0 / 255 = 0.0   -> 1.0 + 2.0 * 0.0 = 1.0
    assert_eq!(intensity.get(0), Some(1.0));
    // 255 / 255 = 1.0 -> 1.0 + 2.0 * 1.0 = 3.0
    assert_eq!(intensity.get(2), Some(3.0));
    let middle = intensity.get(1).unwrap();
    assert!((middle - (1.0 + 2.0 * (128.0 / 255.0))).abs() < 1e-9);
}

#[test]
fn no_data_row_resolves_to_none() {
    let bytes = vec![0u8, 0, 0, 0, 255, 255, 255, 255, 7, 0, 0, 0];

    let buffer_views = vec![View {
        buffer: Index::new(0),
        byte_length: USize64(bytes.len() as u64),
        byte_offset: Some(USize64(0)),
        byte_stride: None,
        extras: None,
    }];
    let root = Root {
        accessors: Vec::new(),
        buffers: vec![Buffer { byte_length: USize64(bytes.len() as u64), extras: None }],
        buffer_views,
        meshes: Vec::new(),
    };

    let mut properties = BTreeMap::new();
    properties.insert(
        "count".to_string(),
        ClassProperty {
            ty: PropertyType::Scalar,
            component_type: Some(ComponentType::U32),
            array: false,
            count: None,
            normalized: false,
            offset_type: None,
            default: None,
            required: true,
            no_data: Some(serde_json::json!(4294967295u32)),
            offset: None,
            scale: None,
        },
    );
    let mut classes = BTreeMap::new();
    classes.insert("Counts".to_string(), ClassSchema { properties });
    let schema = Schema { classes };

    let mut table_properties = BTreeMap::new();
    table_properties.insert(
        "count".to_string(),
        PropertyTableProperty { values: Index::new(0), array_offsets: None, string_offsets: None, string_offset_type: None },
    );
    let table = PropertyTable { class: "Counts".to_string(), count: 3, properties: table_properties };

    let model = MetadataModel { root: &root, buffers: &[bytes], schema: Some(Some(&schema)) };
    let view = PropertyTableView::new(&model, &table);
    let counts = view.get_property_view::<u32>("count").unwrap();

    assert_eq!(counts.get(0), Some(0.0));
    assert_eq!(counts.get(1), None);
    assert_eq!(counts.get(2), Some(7.0));
}
