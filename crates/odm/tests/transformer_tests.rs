//! Transformation between fixture objects and document JSON.

mod common;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use serde_json::{Value as JsonValue, json};

use common::{Book, FakeObject, FakeObjectWithRelatedObject, metadata_factory, transformer};
use helios_odm::transformer::{ElasticsearchVisitor, ReverseElasticsearchVisitor, TypeConfig};
use helios_odm::{
    DataNavigator, DataTransformer, OdmError, TransformError, TypeTag, Value,
};

fn related(name: &str) -> FakeObjectWithRelatedObject {
    FakeObjectWithRelatedObject {
        name: name.to_string(),
        ..FakeObjectWithRelatedObject::default()
    }
}

fn forward(value: Value, type_tag: TypeTag) -> Result<JsonValue, OdmError> {
    DataNavigator::new(metadata_factory()).navigate(
        value,
        &ElasticsearchVisitor,
        Some(TypeConfig::new(type_tag)),
    )
}

fn reverse(value: JsonValue, type_tag: TypeTag) -> Result<Value, OdmError> {
    DataNavigator::new(metadata_factory()).navigate(
        value,
        &ReverseElasticsearchVisitor,
        Some(TypeConfig::new(type_tag)),
    )
}

#[test]
fn test_forward_navigates_children() {
    let mut object = related("bob");
    object.children = vec![FakeObject::named("bob junior")];

    let document = transformer().transform(&object).unwrap();
    assert_eq!(document["children"][0]["name"], "bob junior");
}

#[test]
fn test_forward_document_shape() {
    let mut object = related("Pat");
    object.wife_name = Some("Lucy".to_string());
    object.caught = true;
    object.child = Some(FakeObject {
        name: "Pat Junior".to_string(),
        wife_name: Some("ignored".to_string()),
        ..FakeObject::default()
    });

    let document = transformer().transform(&object).unwrap();
    assert_eq!(
        document,
        json!({
            "name": "Pat",
            "wifeName": "Lucy",
            "mistressName": "",
            "caught": true,
            "child": {"name": "Pat Junior"},
            "children": [],
            "unknownChildren": 20,
            "divorce_fee": 100,
            "id": 30
        })
    );
}

#[test]
fn test_forward_null_child() {
    let document = transformer().transform(&related("solo")).unwrap();
    assert_eq!(document["child"], JsonValue::Null);
    assert_eq!(document["children"], json!([]));
}

#[test]
fn test_reverse_navigates_related_objects() {
    let data = json!({
        "name": "Pat",
        "wifeName": "Lucy",
        "mistressName": "Jane",
        "child": {"name": "Pat Junior"},
        "children": [{"name": "Pat Junior 2"}, {"name": "Pat Junior 3"}]
    });

    let object = transformer()
        .reverse_transform_into(data, FakeObjectWithRelatedObject::default())
        .unwrap();

    assert_eq!(object.name, "Pat");
    assert_eq!(object.wife_name.as_deref(), Some("Lucy"));
    assert_eq!(object.mistress_name.as_deref(), Some("Jane"));
    assert_eq!(object.child, Some(FakeObject::named("Pat Junior")));
    assert_eq!(
        object.children,
        vec![FakeObject::named("Pat Junior 2"), FakeObject::named("Pat Junior 3")]
    );
}

#[test]
fn test_reverse_populates_target_in_place() {
    let mut target = related("old");
    target.caught = true;
    target.child = Some(FakeObject {
        name: "kid".to_string(),
        caught: true,
        ..FakeObject::default()
    });

    let object = transformer()
        .reverse_transform_into(json!({"name": "new", "child": {"name": "renamed"}}), target)
        .unwrap();

    assert_eq!(object.name, "new");
    assert!(object.caught);
    let child = object.child.unwrap();
    assert_eq!(child.name, "renamed");
    assert!(child.caught);
}

#[test]
fn test_reverse_skips_virtual_fields() {
    let object = transformer()
        .reverse_transform_into(
            json!({"name": "Pat", "id": 99, "unknownChildren": 1}),
            FakeObjectWithRelatedObject::default(),
        )
        .unwrap();
    assert_eq!(object.name, "Pat");
}

#[test]
fn test_reverse_requires_target() {
    let err = transformer()
        .reverse_transform(json!({"name": "Pat"}), None)
        .unwrap_err();
    assert!(matches!(err, OdmError::Transform(TransformError::Failed { .. })));
}

#[test]
fn test_date_travels_as_epoch_millis() {
    let published = Utc.with_ymd_and_hms(2018, 8, 15, 11, 31, 35).unwrap();
    let mut book = Book::new("b1", "Dune", 9.5, 3);
    book.published = Some(published);

    let document = transformer().transform(&book).unwrap();
    assert_eq!(document["published"], json!(1534332695000i64));
    assert_eq!(document["price"], json!(9.5));

    let restored = transformer()
        .reverse_transform_into(document, Book::default())
        .unwrap();
    assert_eq!(restored, book);
}

#[test]
fn test_date_string_is_parsed() {
    let millis = forward(Value::from("2018-08-15 11:31:35"), TypeTag::Date).unwrap();
    assert_eq!(millis, json!(1534332695000i64));
}

#[test]
fn test_unparseable_date_fails() {
    let err = forward(Value::from("not a date"), TypeTag::Date).unwrap_err();
    assert!(matches!(err, OdmError::Transform(_)));

    let err = reverse(json!("yesterday-ish"), TypeTag::Date).unwrap_err();
    assert!(err.to_string().contains("could not be converted"));

    let err = reverse(json!("not a date"), TypeTag::Date).unwrap_err();
    assert!(matches!(err, OdmError::Transform(TransformError::Failed { .. })));
    assert!(err.to_string().contains("could not be converted"));
}

#[test]
fn test_time_of_day_encoding() {
    assert_eq!(forward(Value::from("23:45:01"), TypeTag::Time).unwrap(), json!(85501));
    let value = reverse(json!(85501), TypeTag::Time).unwrap();
    assert_eq!(value.as_str(), Some("23:45:01"));
    let value = reverse(json!("08:00:00"), TypeTag::Time).unwrap();
    assert_eq!(value.as_str(), Some("08:00:00"));
}

#[test]
fn test_oversized_time_fails() {
    let err = forward(Value::from("9999999999999999:00:00"), TypeTag::Time).unwrap_err();
    assert!(matches!(err, OdmError::Transform(TransformError::Failed { .. })));
}

#[test]
fn test_null_time_reverses_to_midnight() {
    let value = reverse(JsonValue::Null, TypeTag::Time).unwrap();
    assert_eq!(value.as_str(), Some("00:00:00"));
}

#[test]
fn test_lenient_scalars() {
    assert_eq!(forward(Value::from("12abc"), TypeTag::Integer).unwrap(), json!(12));
    assert_eq!(forward(Value::from(true), TypeTag::String).unwrap(), json!("1"));
    assert_eq!(forward(Value::from("0"), TypeTag::Boolean).unwrap(), json!(false));
    assert_eq!(forward(Value::from(3), TypeTag::Double).unwrap(), json!(3.0));

    let value = reverse(json!("4.5 kg"), TypeTag::Double).unwrap();
    assert!(matches!(value, Value::Double(d) if d == 4.5));
}

#[test]
fn test_depth_limit() {
    let mut object = related("deep");
    object.children = vec![FakeObject::named("kid")];

    let transformer = helios_odm::ElasticsearchTransformer::new(
        DataNavigator::new(metadata_factory()).with_max_depth(2),
    );
    let err = transformer.transform(&object).unwrap_err();
    assert!(matches!(
        err,
        OdmError::Transform(TransformError::DepthExceeded { max_depth: 2 })
    ));
}

proptest! {
    #[test]
    fn time_of_day_round_trips(seconds in 0i64..86_400) {
        let text = reverse(json!(seconds), TypeTag::Time).unwrap();
        let back = forward(text, TypeTag::Time).unwrap();
        prop_assert_eq!(back, json!(seconds));
    }
}
