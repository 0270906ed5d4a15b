use std::collections::{BTreeMap, BTreeSet};

use crate::model::{DocumentKey, MaybeDocument, SnapshotVersion};

/// Aggregated result of a batch of watch responses, produced by the watch
/// stream collaborator and consumed by
/// [`LocalStore::apply_remote_event`](crate::LocalStore::apply_remote_event).
///
/// `target_changes` may reference target ids the store never allocated;
/// those entries, and document updates claimed only by them, are dropped.
#[derive(Debug, Clone, Default)]
pub struct RemoteEvent {
    pub snapshot_version: Option<SnapshotVersion>,
    pub target_changes: BTreeMap<i32, TargetChange>,
    pub document_updates: BTreeMap<DocumentKey, MaybeDocument>,
    /// Keys the sync layer is resolving out-of-band; they count as
    /// referenced even without a claiming target.
    pub limbo_document_changes: BTreeSet<DocumentKey>,
}

impl RemoteEvent {
    pub fn is_empty(&self) -> bool {
        self.target_changes.is_empty()
            && self.document_updates.is_empty()
            && self.limbo_document_changes.is_empty()
    }
}

/// Per-target delta inside a [`RemoteEvent`].
#[derive(Debug, Clone, Default)]
pub struct TargetChange {
    /// Replayed on reconnect; an empty token never replaces a stored one.
    pub resume_token: Vec<u8>,
    /// True once the server has delivered a consistent snapshot up to the
    /// event's version.
    pub current: bool,
    pub added_documents: BTreeSet<DocumentKey>,
    pub modified_documents: BTreeSet<DocumentKey>,
    pub removed_documents: BTreeSet<DocumentKey>,
}

impl TargetChange {
    /// True when this change claims `key` for its target.
    pub fn mentions(&self, key: &DocumentKey) -> bool {
        self.added_documents.contains(key)
            || self.modified_documents.contains(key)
            || self.removed_documents.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mentions_covers_all_delta_sets() {
        let key = DocumentKey::from_string("foo/bar").unwrap();
        let mut change = TargetChange::default();
        assert!(!change.mentions(&key));
        change.removed_documents.insert(key.clone());
        assert!(change.mentions(&key));
    }
}
