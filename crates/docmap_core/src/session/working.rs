//! Entities managed by a session.

use crate::id::IdentityKey;
use crate::record::Record;
use docmap_document::Document;
use std::collections::HashMap;

type EntryKey = (String, IdentityKey);

/// A managed entity.
#[derive(Debug, Clone)]
pub(crate) struct WorkingEntity {
    pub record: Record,
    /// The document last written or read, if any.
    pub snapshot: Option<Document>,
}

/// The identity map of a session plus the order of pending inserts.
#[derive(Debug, Default)]
pub(crate) struct WorkingSet {
    entries: HashMap<EntryKey, WorkingEntity>,
    /// Persisted but not yet flushed, in persist order.
    pending: Vec<EntryKey>,
}

impl WorkingSet {
    pub fn get(&self, entity_type: &str, key: &IdentityKey) -> Option<&WorkingEntity> {
        self.entries.get(&(entity_type.to_string(), key.clone()))
    }

    pub fn contains(&self, entity_type: &str, key: &IdentityKey) -> bool {
        self.get(entity_type, key).is_some()
    }

    /// Manages a newly persisted entity. The caller checks for duplicates.
    pub fn insert_pending(&mut self, entity_type: &str, key: IdentityKey, record: Record) {
        let entry = (entity_type.to_string(), key);
        self.pending.push(entry.clone());
        self.entries.insert(
            entry,
            WorkingEntity {
                record,
                snapshot: None,
            },
        );
    }

    /// Manages an entity read from the store, unless one with the same
    /// identity is already managed. Returns the managed record.
    pub fn insert_loaded(
        &mut self,
        entity_type: &str,
        key: IdentityKey,
        record: Record,
        document: Document,
    ) -> &Record {
        &self
            .entries
            .entry((entity_type.to_string(), key))
            .or_insert(WorkingEntity {
                record,
                snapshot: Some(document),
            })
            .record
    }

    /// Returns the pending entries in persist order.
    pub fn pending(&self) -> Vec<EntryKey> {
        self.pending.clone()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Records a successful write.
    pub fn mark_flushed(&mut self, entry: &EntryKey, document: Document) {
        if let Some(entity) = self.entries.get_mut(entry) {
            entity.snapshot = Some(document);
        }
        self.pending.retain(|pending| pending != entry);
    }

    /// Forgets every entity of a type. Returns how many were dropped.
    pub fn evict_type(&mut self, entity_type: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(ty, _), _| ty != entity_type);
        self.pending.retain(|(ty, _)| ty != entity_type);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: &str) -> IdentityKey {
        IdentityKey::Text(id.to_string())
    }

    #[test]
    fn pending_order_and_flush() {
        let mut set = WorkingSet::default();
        set.insert_pending("Order", key("b"), Record::new("Order"));
        set.insert_pending("Order", key("a"), Record::new("Order"));

        let pending = set.pending();
        assert_eq!(pending[0].1, key("b"));

        set.mark_flushed(&pending[0], Document::new());
        assert_eq!(set.pending_count(), 1);
        assert!(set.get("Order", &key("b")).unwrap().snapshot.is_some());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn loaded_entities_do_not_replace_managed_ones() {
        let mut set = WorkingSet::default();
        set.insert_pending("Order", key("a"), Record::new("Order").with("customer", "mine"));

        let managed = set.insert_loaded(
            "Order",
            key("a"),
            Record::new("Order").with("customer", "stored"),
            Document::new(),
        );

        assert_eq!(managed.text("customer").unwrap(), "mine");
    }

    #[test]
    fn evict_type_drops_entries_and_pending() {
        let mut set = WorkingSet::default();
        set.insert_pending("Order", key("a"), Record::new("Order"));
        set.insert_pending("Invoice", key("a"), Record::new("Invoice"));

        assert_eq!(set.evict_type("Order"), 1);
        assert_eq!(set.pending_count(), 1);
        assert!(set.contains("Invoice", &key("a")));

        set.clear();
        assert_eq!(set.len(), 0);
    }
}
