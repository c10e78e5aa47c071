#[cfg(test)]
mod parser_tests {
    use std::env::current_dir;
    use std::fs::File;
    use std::io::Read;

    use chrono::{Datelike, Timelike};

    use crate::{
        error::nrbf::{DecodeError, NrbfError},
        util::nrbf::{
            layouts::{guid_from_members, LayoutField, LayoutRegistry, NameMatch},
            models::{Primitive, PrimitiveType, Record, RecordType, Value},
            objects::ObjectKind,
            options::ReaderOptions,
            parser::{decode, decode_with_options, NrbfReader},
            tests::builder::StreamBuilder,
        },
    };

    fn read_fixture(name: &str) -> Vec<u8> {
        let fixture_path = current_dir()
            .unwrap()
            .as_path()
            .join("test_data/nrbf")
            .join(name);
        let mut file = File::open(fixture_path).unwrap();
        let mut bytes = vec![];
        file.read_to_end(&mut bytes).unwrap();
        bytes
    }

    fn int32(value: &Value) -> Option<i64> {
        value.as_primitive().and_then(Primitive::as_i64)
    }

    #[test]
    fn can_decode_lone_string() {
        let bytes = StreamBuilder::new().object_string(1, "hi").build();

        let result = decode(&bytes).unwrap();

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].as_str(), Some("hi"));
        assert_eq!(result.objects.resolve(1).unwrap().kind, ObjectKind::String);
        assert!(result.objects.resolve(1).unwrap().is_complete());
    }

    #[test]
    fn can_decode_class_with_members_and_types() {
        let bytes = StreamBuilder::new()
            .u8(5)
            .class_info(1, "Point", &["X"])
            .u8(0)
            .u8(8)
            .i32(1)
            .i32(42)
            .build();

        let result = decode(&bytes).unwrap();
        let class = result.records[0].as_class().unwrap();

        assert_eq!(
            result.records[0].record_type(),
            RecordType::ClassWithMembersAndTypes
        );
        assert_eq!(class.class_info.name, "Point");
        assert_eq!(class.library_id, Some(1));
        assert_eq!(
            class.member("X"),
            Some(&Value::Primitive(Primitive::Int32(42)))
        );
        assert!(result.objects.resolve(1).unwrap().is_complete());
    }

    #[test]
    fn can_reuse_layout_with_class_with_id() {
        let mut layouts = LayoutRegistry::default();
        layouts
            .register_member(
                NameMatch::exact("X"),
                LayoutField::Primitive(PrimitiveType::Int32),
            )
            .register_member(
                NameMatch::exact("Y"),
                LayoutField::Primitive(PrimitiveType::Int32),
            );
        let bytes = StreamBuilder::new()
            .u8(3)
            .class_info(1, "Geometry.Point", &["X", "Y"])
            .i32(2)
            .i32(1)
            .i32(2)
            .u8(1)
            .i32(5)
            .i32(1)
            .i32(10)
            .i32(20)
            .build();

        let result = decode_with_options(&bytes, ReaderOptions::default().with_layouts(layouts))
            .unwrap();

        let Record::ClassWithId(instance) = &result.records[1] else {
            panic!("Expected a ClassWithId, got {:?}", result.records[1]);
        };
        assert_eq!(instance.object_id, 5);
        assert_eq!(instance.metadata_id, 1);
        assert_eq!(instance.class_name, "Geometry.Point");
        assert_eq!(instance.member("X").and_then(int32), Some(10));
        assert_eq!(instance.member("Y").and_then(int32), Some(20));
        assert_eq!(result.objects.resolve(5).unwrap().kind, ObjectKind::Instance(1));
    }

    #[test]
    fn can_decode_member_primitive_typed() {
        let bytes = StreamBuilder::new().u8(8).u8(8).i32(5).build();

        let result = decode(&bytes).unwrap();

        assert_eq!(
            result.records,
            vec![Record::MemberPrimitiveTyped(Primitive::Int32(5))]
        );
    }

    #[test]
    fn cant_decode_unknown_record_type() {
        let bytes = [0x12];

        let result = decode(&bytes).unwrap_err();

        assert!(result.records.is_empty());
        assert_eq!(
            result.error,
            DecodeError::new(0, NrbfError::UnknownRecordType(0x12))
        );
    }

    #[test]
    fn cant_decode_method_call() {
        let bytes = [21];

        let result = decode(&bytes).unwrap_err();

        assert_eq!(
            result.error,
            DecodeError::new(0, NrbfError::UnsupportedRecordType(RecordType::MethodCall))
        );
    }

    #[test]
    fn can_stop_cleanly_after_header() {
        let bytes = StreamBuilder::new().header(1).build();

        let result = decode(&bytes).unwrap();

        assert_eq!(result.records.len(), 1);
        assert!(result.root().is_none());
        assert!(result.objects.is_empty());
    }

    #[test]
    fn can_find_root() {
        let bytes = StreamBuilder::new()
            .header(1)
            .object_string(1, "hello")
            .message_end()
            .build();

        let result = decode(&bytes).unwrap();

        assert_eq!(result.root().and_then(Record::as_str), Some("hello"));
        assert_eq!(result.records.last(), Some(&Record::MessageEnd));
    }

    #[test]
    fn can_keep_records_before_truncation() {
        let bytes = StreamBuilder::new().header(1).raw(&[6, 1, 0]).build();

        let result = decode(&bytes).unwrap_err();

        assert_eq!(result.records.len(), 1);
        assert_eq!(
            result.records[0].record_type(),
            RecordType::SerializedStreamHeader
        );
        assert_eq!(
            result.error,
            DecodeError::new(18, NrbfError::UnexpectedEndOfStream)
        );
    }

    #[test]
    fn cant_reuse_missing_layout() {
        let bytes = StreamBuilder::new().u8(1).i32(2).i32(7).build();

        let result = decode(&bytes).unwrap_err();

        assert_eq!(
            result.error,
            DecodeError::new(0, NrbfError::UnresolvedReference(7))
        );
    }

    #[test]
    fn cant_reuse_string_as_layout() {
        let bytes = StreamBuilder::new()
            .object_string(1, "a")
            .u8(1)
            .i32(2)
            .i32(1)
            .build();

        let result = decode(&bytes).unwrap_err();

        assert_eq!(result.records.len(), 1);
        assert_eq!(
            result.error,
            DecodeError::new(7, NrbfError::NotAClassTemplate(1))
        );
    }

    #[test]
    fn cant_define_object_twice() {
        let bytes = StreamBuilder::new()
            .object_string(1, "a")
            .object_string(1, "b")
            .build();

        let result = decode(&bytes).unwrap_err();

        assert_eq!(
            result.error,
            DecodeError::new(7, NrbfError::DuplicateObjectId(1))
        );
    }

    #[test]
    fn can_decode_self_reference() {
        let bytes = StreamBuilder::new()
            .header(1)
            .library(2, "Graph")
            .u8(5)
            .class_info(1, "Node", &["Value", "Next"])
            .raw(&[0, 4])
            .u8(8)
            .string("Node")
            .i32(2)
            .i32(2)
            .i32(7)
            .reference(1)
            .message_end()
            .build();

        let result = decode(&bytes).unwrap();
        let root = result.root().unwrap().as_class().unwrap();

        assert_eq!(root.member("Value").and_then(int32), Some(7));
        assert_eq!(
            root.member("Next").and_then(Value::as_record),
            Some(&Record::MemberReference(1))
        );
        assert_eq!(result.libraries.name(2), Some("Graph"));
    }

    #[test]
    fn can_nest_instance_of_class_being_defined() {
        let bytes = StreamBuilder::new()
            .header(1)
            .u8(5)
            .class_info(1, "Node", &["Value", "Next"])
            .raw(&[0, 4])
            .u8(8)
            .string("Node")
            .i32(2)
            .i32(2)
            .i32(7)
            // Next: a second node reusing the outer layout
            .u8(1)
            .i32(2)
            .i32(1)
            .i32(8)
            .null()
            .message_end()
            .build();

        let result = decode(&bytes).unwrap();
        let index = result.index();

        let Some(Record::ClassWithId(next)) = index.get(&2) else {
            panic!("Expected object 2 to be a ClassWithId");
        };
        assert_eq!(next.class_name, "Node");
        assert_eq!(next.member("Value").and_then(int32), Some(8));
        assert!(next.member("Next").unwrap().is_null());
        assert!(result.objects.resolve(1).unwrap().is_complete());
        assert!(result.objects.resolve(2).unwrap().is_complete());
    }

    #[test]
    fn can_resolve_forward_reference() {
        let bytes = StreamBuilder::new()
            .u8(5)
            .class_info(1, "Holder", &["Item"])
            .u8(2)
            .i32(2)
            .reference(2)
            .object_string(2, "later")
            .message_end()
            .build();

        let result = decode(&bytes).unwrap();

        assert_eq!(result.records.len(), 3);
        assert_eq!(
            result.index().get(&2).and_then(|record| record.as_str()),
            Some("later")
        );
    }

    #[test]
    fn cant_decode_dangling_reference() {
        let bytes = StreamBuilder::new()
            .u8(5)
            .class_info(1, "Holder", &["Item"])
            .u8(2)
            .i32(2)
            .reference(99)
            .message_end()
            .build();

        let result = decode(&bytes).unwrap_err();

        assert_eq!(result.records.len(), 2);
        assert_eq!(
            result.error,
            DecodeError::new(26, NrbfError::UnresolvedReference(99))
        );
    }

    #[test]
    fn can_read_dangling_reference_record_by_record() {
        let bytes = StreamBuilder::new().reference(99).build();
        let mut reader = NrbfReader::new(&bytes);

        assert_eq!(
            reader.read_record().unwrap(),
            Some(Record::MemberReference(99))
        );
        assert_eq!(reader.read_record().unwrap(), None);
        assert_eq!(reader.position(), 5);
        assert_eq!(
            reader.verify_references(),
            Err(DecodeError::new(0, NrbfError::UnresolvedReference(99)))
        );
    }

    #[test]
    fn cant_nest_past_max_depth() {
        let bytes = StreamBuilder::new()
            .u8(16)
            .i32(1)
            .i32(1)
            .u8(16)
            .i32(2)
            .i32(1)
            .u8(16)
            .i32(3)
            .i32(1)
            .null()
            .build();
        let options = ReaderOptions::default().with_max_depth(3);

        let result = decode_with_options(&bytes, options).unwrap_err();

        assert_eq!(
            result.error,
            DecodeError::new(27, NrbfError::GraphTooDeep(3))
        );

        let result = decode_with_options(&bytes, ReaderOptions::default().with_max_depth(4));
        assert!(result.is_ok());
    }

    #[test]
    fn can_decode_system_guid() {
        let bytes = StreamBuilder::new()
            .u8(2)
            .class_info(
                1,
                "System.Guid",
                &["_a", "_b", "_c", "_d", "_e", "_f", "_g", "_h", "_i", "_j", "_k"],
            )
            .raw(&[
                0xff, 0x19, 0x96, 0x6f, 0x86, 0x8b, 0x11, 0xd0, 0xb4, 0x2d, 0x00, 0xc0, 0x4f, 0xc9,
                0x64, 0xff,
            ])
            .build();

        let result = decode(&bytes).unwrap();
        let class = result.records[0].as_class().unwrap();

        assert_eq!(class.library_id, None);
        assert_eq!(
            guid_from_members(&class.members).unwrap().to_string(),
            "6f9619ff-8b86-d011-b42d-00c04fc964ff"
        );
    }

    #[test]
    fn can_decode_enum_value() {
        let bytes = StreamBuilder::new()
            .u8(3)
            .class_info(1, "Forensics.Severity", &["value__"])
            .i32(2)
            .i32(3)
            .build();

        let result = decode(&bytes).unwrap();
        let class = result.records[0].as_class().unwrap();

        assert_eq!(class.member("value__").and_then(int32), Some(3));
    }

    #[test]
    fn cant_decode_unknown_member_layout() {
        let bytes = StreamBuilder::new()
            .u8(3)
            .class_info(1, "Forensics.Case", &["secret"])
            .i32(2)
            .i32(0)
            .build();

        let result = decode(&bytes).unwrap_err();

        assert_eq!(
            result.error,
            DecodeError::new(
                35,
                NrbfError::UnknownLayout("Forensics.Case.secret".to_string())
            )
        );
    }

    #[test]
    fn cant_decode_unknown_system_class() {
        let bytes = StreamBuilder::new()
            .u8(2)
            .class_info(1, "System.Drawing.Color", &["A"])
            .i32(0)
            .build();

        let result = decode(&bytes).unwrap_err();

        assert_eq!(
            result.error,
            DecodeError::new(
                32,
                NrbfError::UnknownLayout("System.Drawing.Color".to_string())
            )
        );
    }

    #[test]
    fn can_decode_same_ids_in_separate_sessions() {
        let bytes = StreamBuilder::new()
            .header(1)
            .object_string(1, "hello")
            .message_end()
            .build();

        let first = decode(&bytes).unwrap();
        let second = decode(&bytes).unwrap();

        assert_eq!(first.records, second.records);
        assert_eq!(second.objects.len(), 1);
    }

    #[test]
    fn can_continue_after_message_end() {
        let bytes = StreamBuilder::new()
            .message_end()
            .object_string(1, "trailing")
            .build();

        let result = decode(&bytes).unwrap();

        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[1].as_str(), Some("trailing"));
    }

    #[test]
    fn can_parse_generic_list() {
        let bytes = read_fixture("GenericList");

        let result = decode(&bytes).unwrap();
        let list = result.root().and_then(Record::as_class).unwrap();

        assert!(list
            .class_info
            .name
            .starts_with("System.Collections.Generic.List`1"));
        assert_eq!(list.member("_size").and_then(int32), Some(2));
        assert_eq!(list.member("_version").and_then(int32), Some(2));

        let Some(Record::ArraySingleString(items)) =
            list.member("_items").and_then(Value::as_record)
        else {
            panic!("Expected _items to be a string array");
        };
        assert_eq!(items.length, 4);
        assert_eq!(
            items
                .logical_elements()
                .iter()
                .map(|element| element.and_then(Record::as_str))
                .collect::<Vec<_>>(),
            vec![Some("alpha"), Some("beta"), None, None]
        );
    }

    #[test]
    fn can_parse_evidence() {
        let bytes = read_fixture("Evidence");

        let result = decode(&bytes).unwrap();
        let evidence = result.root().and_then(Record::as_class).unwrap();

        assert_eq!(evidence.class_info.name, "Forensics.Evidence");
        assert_eq!(
            result.libraries.name(2),
            Some("Forensics.Model, Version=1.0.0.0")
        );

        let guid = evidence
            .member("Id")
            .and_then(Value::as_record)
            .and_then(Record::as_class)
            .and_then(|class| guid_from_members(&class.members))
            .unwrap();
        assert_eq!(guid.to_string(), "6f9619ff-8b86-d011-b42d-00c04fc964ff");

        assert_eq!(
            evidence.member("Label").and_then(Value::as_str),
            Some("USB drive")
        );

        let collected = evidence
            .member("Collected")
            .and_then(Value::as_primitive)
            .and_then(Primitive::as_datetime)
            .unwrap();
        assert_eq!(collected.kind, 1);
        assert_eq!(
            (
                collected.value.year(),
                collected.value.month(),
                collected.value.day()
            ),
            (2000, 1, 1)
        );
        assert_eq!(collected.value.hour(), 0);

        let Some(Record::ArraySingleString(tags)) =
            evidence.member("Tags").and_then(Value::as_record)
        else {
            panic!("Expected Tags to be a string array");
        };
        let tags = tags.logical_elements();
        assert_eq!(tags[0].and_then(Record::as_str), Some("usb"));
        assert_eq!(tags[1], Some(&Record::MemberReference(4)));
        assert_eq!(result.index().get(&4).and_then(|record| record.as_str()), Some("USB drive"));
        assert_eq!(tags[2], None);

        let severity = evidence
            .member("Severity")
            .and_then(Value::as_record)
            .and_then(Record::as_class)
            .unwrap();
        assert_eq!(severity.member("value__").and_then(int32), Some(3));

        assert_eq!(result.objects.len(), 6);
        assert!(result.objects.iter().all(|(_, entry)| entry.is_complete()));
    }

    #[test]
    fn cant_parse_truncated_evidence() {
        let bytes = read_fixture("Truncated");

        let result = decode(&bytes).unwrap_err();

        assert_eq!(result.records.len(), 2);
        assert_eq!(
            result.error,
            DecodeError::new(79, NrbfError::UnexpectedEndOfStream)
        );
    }
}
