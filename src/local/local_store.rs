use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::auth::User;
use crate::error::{data_corruption, failed_precondition, StoreResult};
use crate::local::garbage_collector::{for_mode, GarbageCollector, GarbageMode};
use crate::local::local_documents_view::LocalDocumentsView;
use crate::local::local_view_changes::LocalViewChanges;
use crate::local::persistence::Persistence;
use crate::local::query_data::{QueryData, QueryPurpose};
use crate::local::reference_set::ReferenceSet;
use crate::model::{Document, DocumentKey, MaybeDocument, Timestamp};
use crate::mutation::{Mutation, MutationBatchResult};
use crate::query::Query;
use crate::remote::RemoteEvent;

/// Change-set returned by mutating operations: the overlaid view of every
/// affected key, in path order.
pub type MaybeDocumentMap = BTreeMap<DocumentKey, MaybeDocument>;

/// Result of [`LocalStore::write_locally`].
#[derive(Clone, Debug)]
pub struct LocalWriteResult {
    pub batch_id: i32,
    pub changes: MaybeDocumentMap,
}

/// The client-side authoritative cache.
///
/// Coordinates four pieces of state — the remote baseline, the mutation
/// queue, the target registry, and the reference sets pinning documents —
/// so that their cross-cutting invariants hold at the end of every public
/// operation. All operations run on one serial executor; each opens exactly
/// one storage transaction and returns the change-set it produced.
pub struct LocalStore {
    persistence: Box<dyn Persistence>,
    garbage_collector: Box<dyn GarbageCollector>,
    /// Keys pinned because the view layer reports them visible; ids are
    /// target ids.
    local_view_references: ReferenceSet,
    /// Keys pinned by pending mutation batches; ids are batch ids.
    mutation_references: ReferenceSet,
    /// Targets with a live listen, keyed by target id. Released targets
    /// drop out of here even when deferred GC keeps their registration.
    active_targets: BTreeMap<i32, QueryData>,
    /// Store-wide operation counter stamped onto target registrations.
    sequence_number: i64,
}

impl LocalStore {
    /// Builds and starts the store: opens the back-end, seeds the mutation
    /// pins from the persisted queue, and prepares the chosen reclamation
    /// strategy.
    pub fn new(
        mut persistence: Box<dyn Persistence>,
        garbage_mode: GarbageMode,
    ) -> StoreResult<Self> {
        persistence.start()?;
        let mut store = Self {
            persistence,
            garbage_collector: for_mode(garbage_mode),
            local_view_references: ReferenceSet::new(),
            mutation_references: ReferenceSet::new(),
            active_targets: BTreeMap::new(),
            sequence_number: 0,
        };

        let txn = store.persistence.transaction("Start LocalStore");
        let highest_target_id = txn.targets.highest_target_id()?;
        let batches = txn.mutation_queue.all_batches()?;
        debug!(
            "Starting LocalStore: highest target id {highest_target_id}, {} pending batches",
            batches.len()
        );
        for batch in batches {
            store
                .mutation_references
                .add_references(batch.keys(), batch.batch_id);
        }
        Ok(store)
    }

    pub fn shutdown(&mut self) {
        self.persistence.shutdown();
    }

    /// Queues `mutations` as one batch and returns its id together with the
    /// resulting overlaid view of every key the batch touches.
    pub fn write_locally(&mut self, mutations: Vec<Mutation>) -> StoreResult<LocalWriteResult> {
        let local_write_time = Timestamp::now();
        let mut txn = self.persistence.transaction("Locally write mutations");
        let batch = txn.mutation_queue.add_batch(local_write_time, mutations)?;
        let keys = batch.keys();
        self.mutation_references
            .add_references(keys.iter().cloned(), batch.batch_id);

        let view = LocalDocumentsView::new(&*txn.remote_documents, &*txn.mutation_queue);
        let changes = view.get_documents(&keys)?;

        self.garbage_collector.collect(
            keys,
            &mut txn,
            &self.local_view_references,
            &self.mutation_references,
        )?;
        Ok(LocalWriteResult {
            batch_id: batch.batch_id,
            changes,
        })
    }

    /// Removes the acknowledged batch from the head of the queue, applies
    /// the acknowledged values to the remote baseline where the commit is
    /// newer than what the baseline already holds, and recomputes the view
    /// of the affected keys.
    pub fn acknowledge_batch(
        &mut self,
        result: MutationBatchResult,
    ) -> StoreResult<MaybeDocumentMap> {
        let mut txn = self.persistence.transaction("Acknowledge batch");
        txn.mutation_queue
            .acknowledge_batch(&result.batch, result.stream_token.clone())?;

        for (mutation, mutation_result) in result
            .batch
            .mutations
            .iter()
            .zip(result.mutation_results.iter())
        {
            let key = mutation.key();
            let existing = txn.remote_documents.get(key)?;
            if let Some(existing_doc) = &existing {
                if result.commit_version <= existing_doc.version() {
                    // The watch stream already delivered something newer;
                    // the acknowledgement has nothing left to contribute.
                    debug!(
                        "Holding acknowledged write to {key}: commit version {} is not newer than baseline {}",
                        result.commit_version,
                        existing_doc.version()
                    );
                    continue;
                }
            }
            if let Some(doc) = mutation.apply_to_remote_document(existing.as_ref(), mutation_result)
            {
                txn.remote_documents.add(doc)?;
            }
        }

        txn.mutation_queue.remove_batch(&result.batch)?;
        txn.mutation_queue.consistency_check()?;

        let keys = result.batch.keys();
        self.mutation_references
            .remove_references_for_id(result.batch_id());

        let view = LocalDocumentsView::new(&*txn.remote_documents, &*txn.mutation_queue);
        let changes = view.get_documents(&keys)?;

        self.garbage_collector.collect(
            keys,
            &mut txn,
            &self.local_view_references,
            &self.mutation_references,
        )?;
        Ok(changes)
    }

    /// Drops the rejected batch from the head of the queue. No baseline is
    /// written; the batch's overlays simply vanish from the view.
    pub fn reject_batch(&mut self, batch_id: i32) -> StoreResult<MaybeDocumentMap> {
        let mut txn = self.persistence.transaction("Reject batch");
        let batch = txn.mutation_queue.lookup_batch(batch_id)?.ok_or_else(|| {
            failed_precondition(format!("Attempt to reject nonexistent batch {batch_id}"))
        })?;
        txn.mutation_queue.remove_batch(&batch)?;
        txn.mutation_queue.consistency_check()?;

        let keys = batch.keys();
        self.mutation_references.remove_references_for_id(batch_id);

        let view = LocalDocumentsView::new(&*txn.remote_documents, &*txn.mutation_queue);
        let changes = view.get_documents(&keys)?;

        self.garbage_collector.collect(
            keys,
            &mut txn,
            &self.local_view_references,
            &self.mutation_references,
        )?;
        Ok(changes)
    }

    /// Folds one aggregated watch event into the store: per-target resume
    /// state and matching keys, then document baselines, then the global
    /// snapshot version. Stale and orphaned updates are dropped silently —
    /// they are valid protocol states, not errors.
    pub fn apply_remote_event(&mut self, event: RemoteEvent) -> StoreResult<MaybeDocumentMap> {
        let mut txn = self.persistence.transaction("Apply remote event");
        let last_version = txn.targets.last_remote_snapshot_version()?;
        if let Some(version) = event.snapshot_version {
            if version < last_version {
                return Err(data_corruption(format!(
                    "Watch stream reverted to snapshot version {version} after {last_version}"
                )));
            }
        }

        let mut candidates = BTreeSet::new();

        for (target_id, change) in &event.target_changes {
            let Some(query_data) = self.active_targets.get(target_id) else {
                debug!("Ignoring watch change for inactive target {target_id}");
                continue;
            };

            txn.targets
                .remove_matching_keys(&change.removed_documents, *target_id)?;
            txn.targets
                .add_matching_keys(&change.added_documents, *target_id)?;
            candidates.extend(change.removed_documents.iter().cloned());

            let mut updated = query_data.clone();
            let mut dirty = false;
            if !change.resume_token.is_empty() {
                updated.resume_token = change.resume_token.clone();
                dirty = true;
            } else {
                debug!("Ignoring empty resume token for target {target_id}");
            }
            if let Some(version) = event.snapshot_version {
                if version >= updated.snapshot_version {
                    updated.snapshot_version = version;
                    dirty = true;
                }
            }
            if dirty {
                self.sequence_number += 1;
                updated.sequence_number = self.sequence_number;
                txn.targets.update_query_data(updated.clone())?;
                self.active_targets.insert(*target_id, updated);
            }
        }

        let mut changed_keys = BTreeSet::new();
        for (key, doc) in &event.document_updates {
            let claimed = event
                .target_changes
                .iter()
                .any(|(id, change)| {
                    self.active_targets.contains_key(id) && change.mentions(key)
                })
                || event.limbo_document_changes.contains(key);
            if !claimed {
                debug!("Ignoring document update for {key}: no active target claims it");
                continue;
            }

            changed_keys.insert(key.clone());
            candidates.insert(key.clone());

            let existing = txn.remote_documents.get(key)?;
            let applies = match &existing {
                None => true,
                Some(existing_doc) => {
                    doc.version() > existing_doc.version()
                        || (doc.version() == existing_doc.version()
                            && doc.is_document()
                            && !existing_doc.is_document())
                }
            };
            if applies {
                txn.remote_documents.add(doc.clone())?;
            } else if let Some(existing_doc) = existing {
                debug!(
                    "Ignoring outdated watch update for {key}: current version {}, watch version {}",
                    existing_doc.version(),
                    doc.version()
                );
            }
        }

        if let Some(version) = event.snapshot_version {
            txn.targets.set_last_remote_snapshot_version(version)?;
        }

        let view = LocalDocumentsView::new(&*txn.remote_documents, &*txn.mutation_queue);
        let changes = view.get_documents(&changed_keys)?;

        self.garbage_collector.collect(
            candidates,
            &mut txn,
            &self.local_view_references,
            &self.mutation_references,
        )?;
        Ok(changes)
    }

    /// Registers a live listen for `query`, reusing the persisted
    /// registration (with its resume token and snapshot version) when one
    /// survives from an earlier listen.
    pub fn allocate_query(&mut self, query: Query) -> StoreResult<QueryData> {
        let txn = self.persistence.transaction("Allocate query");
        let query_data = match txn.targets.query_data(&query)? {
            Some(cached) => cached,
            None => {
                let target_id = txn.targets.allocate_target_id()?;
                self.sequence_number += 1;
                let data = QueryData::new(
                    query.clone(),
                    target_id,
                    self.sequence_number,
                    QueryPurpose::Listen,
                );
                txn.targets.add_query_data(data.clone())?;
                data
            }
        };

        if self.active_targets.contains_key(&query_data.target_id) {
            return Err(failed_precondition(format!(
                "Tried to allocate an already allocated query: {query}"
            )));
        }
        self.active_targets
            .insert(query_data.target_id, query_data.clone());
        Ok(query_data)
    }

    /// Ends the live listen for `query`. Under eager reclamation the
    /// registration is deleted outright; under deferred reclamation it
    /// stays behind, inactive, so a later allocation resumes from its
    /// token and version.
    pub fn release_query(&mut self, query: &Query) -> StoreResult<()> {
        let mut txn = self.persistence.transaction("Release query");
        let query_data = txn.targets.query_data(query)?.ok_or_else(|| {
            failed_precondition(format!("Attempt to release nonexistent query: {query}"))
        })?;
        let target_id = query_data.target_id;
        if self.active_targets.remove(&target_id).is_none() {
            return Err(failed_precondition(format!(
                "Attempt to release inactive query: {query}"
            )));
        }

        let mut candidates = self.local_view_references.remove_references_for_id(target_id);
        candidates.extend(txn.targets.remove_matching_keys_for_target(target_id)?);
        if self.garbage_collector.is_eager() {
            txn.targets.remove_query_data(&query_data)?;
        }

        self.garbage_collector.collect(
            candidates,
            &mut txn,
            &self.local_view_references,
            &self.mutation_references,
        )?;
        Ok(())
    }

    /// Runs `query` against the overlaid local view.
    pub fn execute_query(&mut self, query: &Query) -> StoreResult<BTreeMap<DocumentKey, Document>> {
        let txn = self.persistence.transaction("Execute query");
        let view = LocalDocumentsView::new(&*txn.remote_documents, &*txn.mutation_queue);
        view.get_documents_matching_query(query)
    }

    /// Applies the view layer's pin deltas. Keys that lose their last pin
    /// become reclaimable.
    pub fn notify_local_view_changes(
        &mut self,
        view_changes: Vec<LocalViewChanges>,
    ) -> StoreResult<()> {
        let mut txn = self.persistence.transaction("Notify of local view changes");
        let mut candidates = BTreeSet::new();
        for change in view_changes {
            self.local_view_references
                .add_references(change.added.iter().cloned(), change.target_id);
            self.local_view_references
                .remove_references(change.removed.iter(), change.target_id);
            candidates.extend(change.removed);
        }

        self.garbage_collector.collect(
            candidates,
            &mut txn,
            &self.local_view_references,
            &self.mutation_references,
        )?;
        Ok(())
    }

    /// The overlaid view of one document; `None` when nothing local or
    /// remote makes the key visible.
    pub fn read_document(&mut self, key: &DocumentKey) -> StoreResult<Option<MaybeDocument>> {
        let txn = self.persistence.transaction("Read document");
        let view = LocalDocumentsView::new(&*txn.remote_documents, &*txn.mutation_queue);
        view.get_document(key)
    }

    /// Keys the given target has synced, per the target cache.
    pub fn get_remote_document_keys(
        &mut self,
        target_id: i32,
    ) -> StoreResult<BTreeSet<DocumentKey>> {
        let txn = self.persistence.transaction("Remote document keys");
        txn.targets.matching_keys_for_target(target_id)
    }

    /// Rebinds the store to `user`'s mutation queue and reports the keys
    /// whose overlaid view may have changed: everything touched by either
    /// the outgoing or the incoming queue.
    pub fn handle_user_change(&mut self, user: User) -> StoreResult<MaybeDocumentMap> {
        let mut affected_keys = BTreeSet::new();
        {
            let txn = self.persistence.transaction("Handle user change (old queue)");
            for batch in txn.mutation_queue.all_batches()? {
                affected_keys.extend(batch.keys());
            }
        }

        self.persistence.set_user(user)?;

        let mut txn = self.persistence.transaction("Handle user change");
        self.mutation_references = ReferenceSet::new();
        for batch in txn.mutation_queue.all_batches()? {
            let keys = batch.keys();
            affected_keys.extend(keys.iter().cloned());
            self.mutation_references.add_references(keys, batch.batch_id);
        }

        let view = LocalDocumentsView::new(&*txn.remote_documents, &*txn.mutation_queue);
        let changes = view.get_documents(&affected_keys)?;

        self.garbage_collector.collect(
            affected_keys,
            &mut txn,
            &self.local_view_references,
            &self.mutation_references,
        )?;
        Ok(changes)
    }

    /// Stream token most recently handed back by the write stream for the
    /// current user's queue.
    pub fn last_stream_token(&mut self) -> StoreResult<Vec<u8>> {
        let txn = self.persistence.transaction("Read stream token");
        txn.mutation_queue.last_stream_token()
    }
}
