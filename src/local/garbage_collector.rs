use std::collections::BTreeSet;

use log::debug;

use crate::error::StoreResult;
use crate::local::persistence::Transaction;
use crate::local::reference_set::ReferenceSet;
use crate::model::DocumentKey;

/// Reclamation strategy, chosen when the store is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GarbageMode {
    /// Remove a document from the remote document cache as soon as nothing
    /// references it.
    Eager,
    /// Leave documents in place on the hot path; a separate sweep prunes
    /// them later using reference counts and sequence numbers.
    Deferred,
}

/// Strategy interface the coordinator invokes after every operation that
/// can drop the last reference to a key: writes, acks, rejects, remote
/// events, query releases, and view changes.
pub trait GarbageCollector {
    fn is_eager(&self) -> bool;

    /// Inspects `candidates` and removes from the remote document cache the
    /// ones no longer referenced by a target, a pending mutation, or a
    /// local-view pin. Returns the removed keys.
    fn collect(
        &mut self,
        candidates: BTreeSet<DocumentKey>,
        txn: &mut Transaction<'_>,
        local_view_references: &ReferenceSet,
        mutation_references: &ReferenceSet,
    ) -> StoreResult<BTreeSet<DocumentKey>>;
}

pub(crate) fn for_mode(mode: GarbageMode) -> Box<dyn GarbageCollector> {
    match mode {
        GarbageMode::Eager => Box::new(EagerGarbageCollector),
        GarbageMode::Deferred => Box::new(DeferredGarbageCollector),
    }
}

pub struct EagerGarbageCollector;

impl GarbageCollector for EagerGarbageCollector {
    fn is_eager(&self) -> bool {
        true
    }

    fn collect(
        &mut self,
        candidates: BTreeSet<DocumentKey>,
        txn: &mut Transaction<'_>,
        local_view_references: &ReferenceSet,
        mutation_references: &ReferenceSet,
    ) -> StoreResult<BTreeSet<DocumentKey>> {
        let mut removed = BTreeSet::new();
        for key in candidates {
            if local_view_references.contains_key(&key)
                || mutation_references.contains_key(&key)
                || txn.targets.contains_key(&key)?
            {
                continue;
            }
            txn.remote_documents.remove(&key)?;
            removed.insert(key);
        }
        if !removed.is_empty() {
            debug!("Garbage collected {} unreferenced documents", removed.len());
        }
        Ok(removed)
    }
}

pub struct DeferredGarbageCollector;

impl GarbageCollector for DeferredGarbageCollector {
    fn is_eager(&self) -> bool {
        false
    }

    fn collect(
        &mut self,
        _candidates: BTreeSet<DocumentKey>,
        _txn: &mut Transaction<'_>,
        _local_view_references: &ReferenceSet,
        _mutation_references: &ReferenceSet,
    ) -> StoreResult<BTreeSet<DocumentKey>> {
        Ok(BTreeSet::new())
    }
}
