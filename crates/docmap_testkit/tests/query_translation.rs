//! Translating queries over nested embedded values.

use docmap_core::{Bindings, CoreError, Criteria, QuerySource, Record};
use docmap_document::Value;
use docmap_testkit::prelude::*;

fn shipment(id: i64, city: &str, parts: Vec<Record>) -> Record {
    Record::new("Shipment")
        .with("id", id)
        .with("carrier", "rail")
        .with_entity("destination", Record::new("Address").with("city", city))
        .with_list("parts", parts)
}

fn part(sku: &str, width: i64, components: &[&str]) -> Record {
    Record::new("Part")
        .with("sku", sku)
        .with("weight", 1.5)
        .with_entity("dimensions", Record::new("Dimensions").with("width", width))
        .with_list(
            "components",
            components
                .iter()
                .map(|name| Record::new("Component").with("name", *name))
                .collect(),
        )
}

fn seeded_shipments() -> TestMapper {
    let fixture = TestMapper::new();
    fixture
        .transaction(|session| {
            session.persist_record(&mut shipment(1, "Berlin", vec![part("ABC-001", 3, &["bolt"])]))?;
            session.persist_record(&mut shipment(2, "Hamburg", vec![part("XYZ-002", 5, &[])]))?;
            Ok(())
        })
        .unwrap();
    fixture
}

fn filter_of(fixture: &TestMapper, text: &str) -> String {
    fixture
        .compile(text)
        .unwrap()
        .to_filter(&Bindings::new())
        .unwrap()
        .to_string()
}

#[test]
fn path_two_levels_below_a_list_is_unsupported() {
    let fixture = TestMapper::new();
    let result = fixture.compile("SELECT s FROM Shipment s JOIN s.parts p WHERE p.dimensions.width = 3");
    assert!(matches!(
        result,
        Err(CoreError::UnsupportedPath { ref path, .. }) if path == "p.dimensions.width"
    ));
}

#[test]
fn list_inside_a_list_is_unsupported() {
    let fixture = TestMapper::new();
    let result = fixture
        .compile("SELECT s FROM Shipment s JOIN s.parts p JOIN p.components c WHERE c.name = 'bolt'");
    assert!(matches!(result, Err(CoreError::UnsupportedPath { .. })));

    let direct = fixture.compile("SELECT s FROM Shipment s WHERE s.parts.components.name = 'bolt'");
    assert!(matches!(direct, Err(CoreError::UnsupportedPath { .. })));
}

#[test]
fn criteria_hit_the_same_restriction() {
    let fixture = TestMapper::new();
    let criteria = Criteria::of("Shipment", "s")
        .join("s.parts", "p")
        .where_eq("p.dimensions.width", 3);
    assert!(matches!(
        fixture.compile_criteria(&criteria),
        Err(CoreError::UnsupportedPath { .. })
    ));
}

#[test]
fn unsupported_path_never_reaches_the_store() {
    let fixture = seeded_shipments();
    let mut session = fixture.session();
    let result = session.create_query::<Order>("SELECT s FROM Shipment s JOIN s.parts p WHERE p.dimensions.width = 3");
    assert!(matches!(result, Err(CoreError::UnsupportedPath { .. })));
    assert_eq!(session.managed_count(), 0);
}

#[test]
fn one_field_below_a_list_is_translated_and_executed() {
    let fixture = seeded_shipments();
    let text = "SELECT s FROM Shipment s JOIN s.parts p WHERE p.sku = 'ABC-001'";
    assert_eq!(filter_of(&fixture, text), r#"{ "PARTS.SKU": "ABC-001" }"#);

    let query = fixture.compile(text).unwrap();
    let bindings = Bindings::new();
    let found = fixture
        .executor()
        .single_result(QuerySource::Compiled { query: &query, bindings: &bindings }, "Shipment")
        .unwrap();
    assert_eq!(found.scalar("id"), Some(&Value::Integer(1)));
}

#[test]
fn embedded_entities_nest_without_limit() {
    let fixture = seeded_shipments();
    let text = "select s from Shipment s where s.destination.city = 'Hamburg'";
    assert_eq!(filter_of(&fixture, text), r#"{ "DESTINATION.CITY": "Hamburg" }"#);

    let found = fixture
        .executor()
        .execute(
            QuerySource::Compiled {
                query: &fixture.compile(text).unwrap(),
                bindings: &Bindings::new(),
            },
            "Shipment",
        )
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].scalar("id"), Some(&Value::Integer(2)));
}

#[test]
fn repeated_paths_are_all_kept() {
    let fixture = seeded_shipments();
    let text = "SELECT s FROM Shipment s WHERE s.carrier = 'rail' AND s.carrier = 'road'";
    assert_eq!(
        filter_of(&fixture, text),
        r#"{ "$and": [{ "CARRIER": "rail" }, { "CARRIER": "road" }] }"#
    );

    let query = fixture.compile(text).unwrap();
    assert_eq!(query.entity_type(), "Shipment");
    let results = fixture
        .executor()
        .execute(QuerySource::Compiled { query: &query, bindings: &Bindings::new() }, "Shipment")
        .unwrap()
        .count();
    assert_eq!(results, 0);
}

#[test]
fn comparing_an_embedded_value_is_invalid() {
    let fixture = TestMapper::new();
    for text in [
        "SELECT s FROM Shipment s WHERE s.destination = 'Berlin'",
        "SELECT o FROM Order o JOIN o.customer c",
        "SELECT o FROM Order o WHERE o.customer.name = 'x'",
        "SELECT i FROM Item i",
        "SELECT i FROM Order o JOIN o.items i",
        "SELECT o FROM Order o JOIN o.items o",
        "SELECT o FROM Order o WHERE x.customer = 'x'",
        "SELECT o FROM Order o JOIN o.items i WHERE i.quantity = 'two'",
    ] {
        let result = fixture.compile(text);
        assert!(
            matches!(result, Err(CoreError::InvalidQuery { .. })),
            "{text} gave {result:?}"
        );
    }
}

#[test]
fn unknown_names_are_reported() {
    let fixture = TestMapper::new();
    assert!(matches!(
        fixture.compile("SELECT o FROM Invoice o"),
        Err(CoreError::UnknownType { .. })
    ));
    assert!(matches!(
        fixture.compile("SELECT o FROM Order o JOIN o.items i WHERE i.colour = 'red'"),
        Err(CoreError::UnknownField { ref entity_type, ref field }) if entity_type == "Item" && field == "colour"
    ));
}

#[test]
fn syntax_errors_carry_the_offset() {
    let fixture = TestMapper::new();
    let result = fixture.compile("SELECT o FROM Order o WHERE o.customer == 'x'");
    assert!(matches!(result, Err(CoreError::InvalidQuery { offset: 40, .. })));
}

#[test]
fn conditions_on_one_join_alias_must_hold_for_the_same_item() {
    with_seeded_mapper(|fixture, id| {
        // The sample order has items (1, 47.11) and (2, 42.0).
        let split = "SELECT o FROM Order o JOIN o.items i WHERE i.quantity = 2 AND i.price = 47.11";
        assert_eq!(
            filter_of(fixture, split),
            r#"{ "ITEMS": { "$elemMatch": { "$and": [{ "QUANTITY": 2 }, { "PRICE": 47.11 }] } } }"#
        );

        let mut session = fixture.session();
        let result = session.create_query::<Order>(split).unwrap().single_result();
        assert!(matches!(result, Err(CoreError::NoResult { .. })));

        let same_item = Criteria::of("Order", "o")
            .join("o.items", "i")
            .where_eq("i.quantity", 2)
            .where_eq("i.price", 42.0);
        let order = session
            .create_criteria_query::<Order>(&same_item)
            .unwrap()
            .single_result()
            .unwrap();
        assert_eq!(order.id.as_deref(), Some(id));
    });
}

#[test]
fn separate_join_aliases_may_match_different_items() {
    with_seeded_mapper(|fixture, id| {
        let text = "SELECT o FROM Order o JOIN o.items a JOIN o.items b \
                    WHERE a.quantity = 2 AND b.price = 47.11";
        assert_eq!(
            filter_of(fixture, text),
            r#"{ "$and": [{ "ITEMS.QUANTITY": 2 }, { "ITEMS.PRICE": 47.11 }] }"#
        );

        let mut session = fixture.session();
        let order = session
            .create_query::<Order>(text)
            .unwrap()
            .single_result()
            .unwrap();
        assert_eq!(order.id.as_deref(), Some(id));
    });
}
