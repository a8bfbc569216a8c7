//! Property tests: what is persisted is what is read back.

use docmap_core::{IdStrategy, MapperConfig};
use docmap_testkit::prelude::*;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn persisted_orders_are_found_unchanged(order in order_strategy(6)) {
        let fixture = TestMapper::new();
        let mut persisted = order.clone();
        let id = fixture
            .transaction(|session| session.persist(&mut persisted))
            .unwrap();

        let mut session = fixture.session();
        let found: Order = session.find(id).unwrap().unwrap();
        prop_assert_eq!(found.items.len(), order.items.len());
        prop_assert_eq!(&found.items, &order.items);
        prop_assert_eq!(found, persisted);
    }

    #[test]
    fn shipments_survive_the_codec(record in shipment_record_strategy()) {
        let fixture = TestMapper::new();
        let codec = fixture.codec();

        let document = codec.encode(&record).unwrap();
        prop_assert_eq!(codec.decode(&document, "Shipment").unwrap(), record);
    }

    #[test]
    fn shipments_survive_the_store(record in shipment_record_strategy()) {
        let fixture = TestMapper::with_config(MapperConfig::new().id_strategy(IdStrategy::Sequence));
        let id = record.scalar("id").cloned().unwrap();
        fixture
            .transaction(|session| session.persist_record(&mut record.clone()))
            .unwrap();

        let mut session = fixture.session();
        let found = session.find_record("Shipment", id).unwrap().unwrap();
        prop_assert_eq!(found, record);
    }

    #[test]
    fn quantity_queries_find_exactly_matching_orders(
        orders in prop::collection::vec(order_strategy(3), 1..6),
        quantity in 0i64..4,
    ) {
        let fixture = TestMapper::new();
        fixture.seed_orders(orders.clone()).unwrap();

        let expected = orders
            .iter()
            .filter(|order| order.items.iter().any(|item| item.quantity == quantity))
            .count();

        let mut session = fixture.session();
        let found = session
            .create_query::<Order>("SELECT o FROM Order o JOIN o.items i WHERE i.quantity = :q")
            .unwrap()
            .bind("q", quantity)
            .result_list()
            .unwrap();
        prop_assert_eq!(found.len(), expected);
        prop_assert!(found
            .iter()
            .all(|order| order.items.iter().any(|item| item.quantity == quantity)));
    }
}
