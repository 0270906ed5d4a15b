use std::collections::BTreeSet;

use crate::model::DocumentKey;

/// Delta reported by the view layer: which keys became visible to a
/// target's local view and which dropped out. Visible keys are pinned so
/// eager reclamation cannot evict documents the UI is still showing.
#[derive(Clone, Debug, Default)]
pub struct LocalViewChanges {
    pub target_id: i32,
    pub added: BTreeSet<DocumentKey>,
    pub removed: BTreeSet<DocumentKey>,
}

impl LocalViewChanges {
    pub fn new(target_id: i32, added: BTreeSet<DocumentKey>, removed: BTreeSet<DocumentKey>) -> Self {
        Self {
            target_id,
            added,
            removed,
        }
    }
}
