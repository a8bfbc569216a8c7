//! Typed test entities.
//!
//! `Order` and `Item` are the model the mapping tests revolve around: an
//! order with a customer name and an embedded list of items. The matching
//! definitions live in [`crate::fixtures`].

use docmap_core::{CoreResult, Entity, Record};

/// An order with embedded items.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    /// Identity; `None` until persisted.
    pub id: Option<String>,
    /// Customer name.
    pub customer: String,
    /// Ordered items.
    pub items: Vec<Item>,
}

impl Order {
    /// Creates an order without identity or items.
    pub fn new(customer: impl Into<String>) -> Self {
        Self {
            id: None,
            customer: customer.into(),
            items: Vec::new(),
        }
    }

    /// Sets the items, builder style.
    #[must_use]
    pub fn with_items(mut self, items: Vec<Item>) -> Self {
        self.items = items;
        self
    }

    /// Sum of quantity times price over all items.
    pub fn total(&self) -> f64 {
        self.items
            .iter()
            .map(|item| item.quantity as f64 * item.price)
            .sum()
    }
}

impl Entity for Order {
    fn entity_type() -> &'static str {
        "Order"
    }

    fn to_record(&self) -> Record {
        Record::new("Order")
            .with("id", self.id.clone())
            .with("customer", self.customer.as_str())
            .with_list("items", self.items.iter().map(Item::to_record).collect())
    }

    fn from_record(record: &Record) -> CoreResult<Self> {
        Ok(Self {
            id: record.optional_text("id")?,
            customer: record.text("customer")?,
            items: record
                .list("items")?
                .iter()
                .map(Item::from_record)
                .collect::<CoreResult<_>>()?,
        })
    }
}

/// One order line, embedded in [`Order`].
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Number of units.
    pub quantity: i64,
    /// Unit price.
    pub price: f64,
    /// Free-text description.
    pub description: String,
}

impl Item {
    /// Creates an item.
    pub fn new(quantity: i64, price: f64, description: impl Into<String>) -> Self {
        Self {
            quantity,
            price,
            description: description.into(),
        }
    }
}

impl Entity for Item {
    fn entity_type() -> &'static str {
        "Item"
    }

    fn to_record(&self) -> Record {
        Record::new("Item")
            .with("quantity", self.quantity)
            .with("price", self.price)
            .with("description", self.description.as_str())
    }

    fn from_record(record: &Record) -> CoreResult<Self> {
        Ok(Self {
            quantity: record.integer("quantity")?,
            price: record.float("price")?,
            description: record.text("description")?,
        })
    }
}
