/// Failure handling across the conversion paths
///
/// Marshalling reports every failure. Unmarshalling through `from_xml` logs and
/// returns `None`, while `try_from_xml` surfaces the cause. Schema compilation
/// failures are errors on every path and are never cached.
use xml_marshal::{MarshalError, SchemaError, UnmarshalError, XmlError};

use crate::common::fixtures::{Clashing, Drifted, Message, Order, sample_order};
use crate::common::test_helpers::isolated_mapper;

#[test]
fn test_malformed_input_gives_none() {
    let mapper = isolated_mapper();

    let parsed: Option<Order> = mapper.from_xml("<not-valid-xml").unwrap();
    assert!(parsed.is_none());

    let parsed: Option<Order> = mapper.from_xml("").unwrap();
    assert!(parsed.is_none());
}

#[test]
fn test_schema_mismatches_give_none() {
    let mapper = isolated_mapper();
    let cases = [
        // wrong root
        r#"<invoice id="1" status="open"/>"#,
        // missing required element
        r#"<order id="1" status="open"><express>true</express></order>"#,
        // unknown element
        r#"<order id="1" status="open"><customer><name>x</name></customer><express>true</express><gift/></order>"#,
        // bad integer
        r#"<order id="one" status="open"><customer><name>x</name></customer><express>true</express></order>"#,
        // bad boolean
        r#"<order id="1" status="open"><customer><name>x</name></customer><express>maybe</express></order>"#,
    ];

    for xml in cases {
        let parsed: Option<Order> = mapper.from_xml(xml).unwrap();
        assert!(parsed.is_none(), "expected None for {}", xml);
    }
}

#[test]
fn test_try_from_xml_surfaces_cause() {
    let mapper = isolated_mapper();

    let err = mapper.try_from_xml::<Order>("<not-valid-xml").unwrap_err();
    assert!(matches!(
        err,
        XmlError::Unmarshal {
            source: UnmarshalError::Parse(_),
            ..
        }
    ));

    let err = mapper
        .try_from_xml::<Order>(r#"<order id="1" status="open"><express>1</express></order>"#)
        .unwrap_err();
    match err {
        XmlError::Unmarshal {
            type_name,
            source: UnmarshalError::Missing { node, name, .. },
        } => {
            assert!(type_name.ends_with("Order"));
            assert_eq!(node, "element");
            assert_eq!(name, "customer");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_reader_accepts_numeric_booleans() {
    let mapper = isolated_mapper();
    let xml = r#"<order id="3" status="held"><customer><name>x</name></customer><express>0</express></order>"#;

    let parsed: Order = mapper.try_from_xml(xml).unwrap();

    assert!(!parsed.express);
    assert!(parsed.lines.is_empty());
    assert_eq!(parsed.customer.email, None);
}

#[test]
fn test_marshal_unmapped_field_is_error() {
    let mapper = isolated_mapper();
    let value = Drifted {
        name: "n".to_string(),
        added_later: "x".to_string(),
    };

    let err = mapper.to_xml(&value).unwrap_err();

    assert!(matches!(
        err,
        XmlError::Marshal {
            source: MarshalError::UnmappedField { ref field, .. },
            ..
        } if field == "added_later"
    ));
}

#[test]
fn test_marshal_rejects_characters_xml_cannot_carry() {
    let mapper = isolated_mapper();

    for (from, body) in [("ok", "bell\u{7}"), ("nul\u{0}", "ok"), ("ok", "\u{FFFE}")] {
        let message = Message {
            from: from.to_string(),
            body: body.to_string(),
        };

        let err = mapper.to_xml(&message).unwrap_err();
        assert!(
            matches!(
                err,
                XmlError::Marshal {
                    source: MarshalError::InvalidCharacter { .. },
                    ..
                }
            ),
            "expected {:?} to be rejected",
            message
        );
    }

    let err = mapper
        .to_xml(&Message {
            from: "ok".to_string(),
            body: "bell\u{7}".to_string(),
        })
        .unwrap_err();
    assert!(err.to_string().contains("U+0007"));
    assert!(err.to_string().contains("message/body"));
}

#[test]
fn test_schema_compilation_error_on_both_paths() {
    let mapper = isolated_mapper();
    let value = Clashing {
        first: "a".to_string(),
        second: "b".to_string(),
    };

    let err = mapper.to_xml(&value).unwrap_err();
    assert!(matches!(
        err,
        XmlError::SchemaCompilation {
            source: SchemaError::DuplicateNode { .. },
            ..
        }
    ));

    // Not swallowed on the quiet path either
    let err = mapper
        .from_xml::<Clashing>("<clashing><value>a</value></clashing>")
        .unwrap_err();
    assert!(matches!(err, XmlError::SchemaCompilation { .. }));
    assert!(err.to_string().contains("Clashing"));

    assert!(!mapper.cache().contains::<Clashing>());
    assert_eq!(mapper.cache().stats().compilations, 2);
}

#[test]
fn test_failures_do_not_poison_later_calls() {
    let mapper = isolated_mapper();

    let parsed: Option<Order> = mapper.from_xml("<order").unwrap();
    assert!(parsed.is_none());

    let xml = mapper.to_xml(&sample_order()).unwrap();
    let parsed: Option<Order> = mapper.from_xml(&xml).unwrap();
    assert_eq!(parsed, Some(sample_order()));
}
