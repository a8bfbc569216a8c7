//! Property-based test generators using proptest.
//!
//! Provides strategies for generating test entities that the fixture
//! definitions accept.

use crate::model::{Item, Order};
use docmap_core::Record;
use docmap_document::Value;
use proptest::prelude::*;

/// Strategy for item quantities.
pub fn quantity_strategy() -> impl Strategy<Value = i64> {
    0i64..1_000
}

/// Strategy for prices. Two decimals, always finite.
pub fn price_strategy() -> impl Strategy<Value = f64> {
    (0u32..100_000).prop_map(|cents| f64::from(cents) / 100.0)
}

/// Strategy for valid items.
pub fn item_strategy() -> impl Strategy<Value = Item> {
    (quantity_strategy(), price_strategy(), "\\PC{0,24}")
        .prop_map(|(quantity, price, description)| Item::new(quantity, price, description))
}

/// Strategy for orders without identity, with up to `max_items` items.
pub fn order_strategy(max_items: usize) -> impl Strategy<Value = Order> {
    ("\\PC{1,32}", prop::collection::vec(item_strategy(), 0..=max_items))
        .prop_map(|(customer, items)| Order::new(customer).with_items(items))
}

/// Strategy for `Shipment` records with an integer identity.
///
/// Parts carry dimensions and components only some of the time, so the
/// optional embedded fields are exercised both set and null. Fields are
/// set in declaration order with unset optionals as explicit nulls, which
/// is the shape decoding produces.
pub fn shipment_record_strategy() -> impl Strategy<Value = Record> {
    let part = (
        "[A-Z]{3}-[0-9]{3}",
        price_strategy(),
        prop::option::of(1i64..500),
        prop::option::of(prop::collection::vec("[a-z]{1,8}", 0..3)),
    )
        .prop_map(|(sku, weight, width, components)| {
            let part = Record::new("Part").with("sku", sku).with("weight", weight);
            let part = match width {
                Some(width) => {
                    part.with_entity("dimensions", Record::new("Dimensions").with("width", width))
                }
                None => part.with("dimensions", Value::Null),
            };
            match components {
                Some(names) => part.with_list(
                    "components",
                    names
                        .into_iter()
                        .map(|name| Record::new("Component").with("name", name))
                        .collect(),
                ),
                None => part.with("components", Value::Null),
            }
        });

    (1i64..1_000_000, "[A-Za-z ]{1,16}", prop::collection::vec(part, 0..4)).prop_map(
        |(id, carrier, parts)| {
            Record::new("Shipment")
                .with("id", id)
                .with("carrier", carrier)
                .with("destination", Value::Null)
                .with_list("parts", parts)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn generated_prices_are_finite() {
        let mut runner = TestRunner::default();
        for _ in 0..32 {
            let item = item_strategy().new_tree(&mut runner).unwrap().current();
            assert!(item.price.is_finite());
        }
    }

    proptest! {
        #[test]
        fn orders_respect_item_bound(order in order_strategy(3)) {
            prop_assert!(order.items.len() <= 3);
            prop_assert!(order.id.is_none());
            prop_assert!(!order.customer.is_empty());
        }
    }
}
