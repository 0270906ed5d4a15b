use std::collections::{BTreeMap, BTreeSet};

use crate::model::DocumentKey;

/// Relation between document keys and the integer ids that pin them, with a
/// reverse index so both directions are cheap. The store keeps one instance
/// per pin source: target matching keys (ids are target ids), local view
/// pins (target ids), and mutation pins (batch ids).
#[derive(Debug, Default, Clone)]
pub struct ReferenceSet {
    by_key: BTreeMap<DocumentKey, BTreeSet<i32>>,
    by_id: BTreeMap<i32, BTreeSet<DocumentKey>>,
}

impl ReferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_reference(&mut self, key: DocumentKey, id: i32) {
        self.by_key.entry(key.clone()).or_default().insert(id);
        self.by_id.entry(id).or_default().insert(key);
    }

    pub fn add_references<I>(&mut self, keys: I, id: i32)
    where
        I: IntoIterator<Item = DocumentKey>,
    {
        for key in keys {
            self.add_reference(key, id);
        }
    }

    pub fn remove_reference(&mut self, key: &DocumentKey, id: i32) {
        if let Some(ids) = self.by_key.get_mut(key) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_key.remove(key);
            }
        }
        if let Some(keys) = self.by_id.get_mut(&id) {
            keys.remove(key);
            if keys.is_empty() {
                self.by_id.remove(&id);
            }
        }
    }

    pub fn remove_references<'a, I>(&mut self, keys: I, id: i32)
    where
        I: IntoIterator<Item = &'a DocumentKey>,
    {
        for key in keys {
            self.remove_reference(key, id);
        }
    }

    /// Drops every reference held under `id` and returns the keys that were
    /// pinned by it.
    pub fn remove_references_for_id(&mut self, id: i32) -> BTreeSet<DocumentKey> {
        let keys = self.by_id.remove(&id).unwrap_or_default();
        for key in &keys {
            if let Some(ids) = self.by_key.get_mut(key) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.by_key.remove(key);
                }
            }
        }
        keys
    }

    pub fn references_for_id(&self, id: i32) -> BTreeSet<DocumentKey> {
        self.by_id.get(&id).cloned().unwrap_or_default()
    }

    pub fn contains_key(&self, key: &DocumentKey) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
