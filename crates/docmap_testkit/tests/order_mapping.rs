//! Mapping an order with embedded items, read back through every access path.

use docmap_core::{Bindings, CoreError, Criteria, Mapper};
use docmap_document::Value;
use docmap_testkit::prelude::*;
use std::sync::Arc;

fn assert_order(order: &Order, id: &str) {
    assert_eq!(order.id.as_deref(), Some(id));
    assert_eq!(order.customer, "Tobias Trelle");
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.items, sample_order().items);
}

#[test]
fn should_find_by_primary_key() {
    with_seeded_mapper(|fixture, id| {
        let mut session = fixture.session();
        let order: Order = session.find(id).unwrap().expect("order was persisted");
        assert_order(&order, id);
    });
}

#[test]
fn should_find_by_items_quantity() {
    with_seeded_mapper(|fixture, id| {
        let mut session = fixture.session();
        let order = session
            .create_query::<Order>(ITEMS_QUANTITY_QUERY)
            .unwrap()
            .single_result()
            .unwrap();
        assert_order(&order, id);
    });
}

#[test]
fn should_find_by_primary_key_with_native_query() {
    with_seeded_mapper(|fixture, id| {
        let mut session = fixture.session();
        let native = format!(r#"db.ORDER.findOne({{_id: "{id}"}})"#);
        let order = session
            .create_native_query::<Order>(&native)
            .unwrap()
            .single_result()
            .unwrap();
        assert_order(&order, id);
    });
}

#[test]
fn should_find_all_with_criteria() {
    with_seeded_mapper(|fixture, id| {
        let mut session = fixture.session();
        let order = session
            .create_criteria_query::<Order>(&Criteria::of("Order", "o"))
            .unwrap()
            .single_result()
            .unwrap();
        assert_order(&order, id);
    });
}

#[test]
fn should_find_by_items_quantity_with_native_query() {
    with_seeded_mapper(|fixture, id| {
        let mut session = fixture.session();
        let order = session
            .create_native_query::<Order>(r#"db.ORDER.findOne({"ITEMS.QUANTITY": 2})"#)
            .unwrap()
            .single_result()
            .unwrap();
        assert_order(&order, id);
    });
}

#[test]
fn every_access_path_returns_the_same_entity() {
    with_seeded_mapper(|fixture, id| {
        let mut session = fixture.session();
        let by_key: Order = session.find(id).unwrap().unwrap();
        let by_query = session
            .create_query::<Order>(ITEMS_QUANTITY_QUERY)
            .unwrap()
            .single_result()
            .unwrap();
        let by_native = session
            .create_native_query::<Order>(&format!(r#"db.ORDER.find({{_id: '{id}'}})"#))
            .unwrap()
            .single_result()
            .unwrap();

        assert_eq!(by_key, by_query);
        assert_eq!(by_key, by_native);
        assert_eq!(session.managed_count(), 1);
    });
}

#[test]
fn join_query_translates_to_nested_key_path() {
    let fixture = TestMapper::new();
    let query = fixture.compile(ITEMS_QUANTITY_QUERY).unwrap();

    assert_eq!(query.collection(), ORDER_COLLECTION);
    assert_eq!(
        query.to_filter(&Bindings::new()).unwrap().to_string(),
        r#"{ "ITEMS.QUANTITY": 2 }"#
    );
}

#[test]
fn stored_document_uses_upper_case_keys() {
    with_seeded_mapper(|fixture, id| {
        let documents = fixture.order_documents();
        let document = &documents[0];

        let keys: Vec<_> = document.keys().collect();
        assert_eq!(keys, vec!["_id", "CUSTOMER", "ITEMS"]);
        assert_eq!(document.get("_id").and_then(Value::as_text), Some(id));

        let items = document.get("ITEMS").and_then(Value::as_array).unwrap();
        let first = items[0].as_document().unwrap();
        let item_keys: Vec<_> = first.keys().collect();
        assert_eq!(item_keys, vec!["QUANTITY", "PRICE", "DESCRIPTION"]);
        assert_eq!(first.get("PRICE"), Some(&Value::Float(47.11)));
    });
}

#[test]
fn no_match_is_no_result() {
    with_seeded_mapper(|fixture, _| {
        let mut session = fixture.session();
        let result = session
            .create_query::<Order>("SELECT o FROM Order o JOIN o.items i WHERE i.quantity = 3")
            .unwrap()
            .single_result();
        assert!(matches!(result, Err(CoreError::NoResult { .. })));

        let all = session
            .create_query::<Order>("SELECT o FROM Order o JOIN o.items i WHERE i.quantity = 3")
            .unwrap()
            .result_list()
            .unwrap();
        assert!(all.is_empty());
    });
}

#[test]
fn two_matches_is_non_unique() {
    let fixture = TestMapper::new();
    fixture.seed_sample_order();
    fixture.seed_orders(vec![sample_order()]).unwrap();

    let mut session = fixture.session();
    let result = session
        .create_query::<Order>(ITEMS_QUANTITY_QUERY)
        .unwrap()
        .single_result();
    assert!(matches!(result, Err(CoreError::NonUniqueResult { .. })));

    let orders = session
        .create_query::<Order>(ITEMS_QUANTITY_QUERY)
        .unwrap()
        .result_list()
        .unwrap();
    assert_eq!(orders.len(), 2);
}

#[test]
fn native_find_one_is_limited_to_one_match() {
    let fixture = TestMapper::new();
    fixture.seed_sample_order();
    fixture.seed_orders(vec![sample_order()]).unwrap();

    let mut session = fixture.session();
    let first = session
        .create_native_query::<Order>(r#"db.ORDER.findOne({"ITEMS.QUANTITY": 2})"#)
        .unwrap()
        .single_result();
    assert!(first.is_ok());

    let result = session
        .create_native_query::<Order>(r#"db.ORDER.find({"ITEMS.QUANTITY": 2})"#)
        .unwrap()
        .single_result();
    assert!(matches!(result, Err(CoreError::NonUniqueResult { .. })));
}

#[test]
fn price_literal_matches_across_number_kinds() {
    with_seeded_mapper(|fixture, id| {
        let mut session = fixture.session();
        let order = session
            .create_query::<Order>("SELECT o FROM Order o JOIN o.items i WHERE i.price = 42")
            .unwrap()
            .single_result()
            .unwrap();
        assert_order(&order, id);
    });
}

#[test]
fn parameters_are_bound_at_execution() {
    with_seeded_mapper(|fixture, id| {
        let mut session = fixture.session();
        let text = "SELECT o FROM Order o JOIN o.items i WHERE i.description = :d AND o.customer = :c";

        let order = session
            .create_query::<Order>(text)
            .unwrap()
            .bind("d", "Item #2")
            .bind("c", "Tobias Trelle")
            .single_result()
            .unwrap();
        assert_order(&order, id);

        let none = session
            .create_query::<Order>(text)
            .unwrap()
            .bind("d", "Item #3")
            .bind("c", "Tobias Trelle")
            .result_list()
            .unwrap();
        assert!(none.is_empty());
    });
}

#[test]
fn unbound_parameter_fails_before_the_store_is_asked() {
    let store = Arc::new(FailingStore::new());
    let mapper = mapper_builder()
        .store(Arc::clone(&store) as Arc<dyn docmap_store::DocumentStore>)
        .build()
        .unwrap();

    let mut session = mapper.session();
    let result = session
        .create_query::<Order>("SELECT o FROM Order o JOIN o.items i WHERE i.quantity = :q")
        .unwrap()
        .result_list();

    assert!(matches!(result, Err(CoreError::UnboundParameter { ref name }) if name == "q"));
    assert_eq!(store.operations(), 0);
}

#[test]
fn query_for_another_type_is_rejected() {
    let fixture = TestMapper::new();
    let mut session = fixture.session();
    let result = session.create_query::<Order>("SELECT s FROM Shipment s");
    assert!(matches!(result, Err(CoreError::InvalidQuery { .. })));
}

#[test]
fn native_query_for_another_collection_fails_in_the_store() {
    with_seeded_mapper(|fixture, id| {
        let mut session = fixture.session();
        let result = session
            .create_native_query::<Order>(&format!(r#"db.SHIPMENT.findOne({{_id: "{id}"}})"#))
            .unwrap()
            .result_list();
        assert!(matches!(result, Err(CoreError::Store(_))));
    });
}

#[test]
fn criteria_and_text_share_the_cache() {
    let fixture = TestMapper::new();
    let criteria = Criteria::of("Order", "o")
        .join("o.items", "i")
        .where_eq("i.quantity", 2);

    let from_criteria = fixture.compile_criteria(&criteria).unwrap();
    let from_text = fixture.compile(ITEMS_QUANTITY_QUERY).unwrap();

    assert!(Arc::ptr_eq(&from_criteria, &from_text));
    assert_eq!(fixture.cache_stats().entries, 1);
}

#[test]
fn mapper_is_shared_across_threads() {
    let fixture = TestMapper::new();
    let id = fixture.seed_sample_order();
    let mapper: Mapper = fixture.mapper.clone();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let mapper = mapper.clone();
            let id = id.clone();
            std::thread::spawn(move || {
                let mut session = mapper.session();
                let order: Order = session.find(id.as_str()).unwrap().unwrap();
                order.items.len()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 2);
    }
}
