use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::error::{data_corruption, failed_precondition, StoreResult};
use crate::model::{DocumentKey, Timestamp};
use crate::mutation::{Mutation, MutationBatch};
use crate::query::Query;

/// Ordered log of locally issued, not-yet-acknowledged mutation batches for
/// a single user. Batch ids increase strictly with insertion order, and both
/// acknowledgement and removal are permitted only at the head.
pub trait MutationQueue {
    fn is_empty(&self) -> StoreResult<bool>;

    fn add_batch(
        &mut self,
        local_write_time: Timestamp,
        mutations: Vec<Mutation>,
    ) -> StoreResult<MutationBatch>;

    fn lookup_batch(&self, batch_id: i32) -> StoreResult<Option<MutationBatch>>;

    /// The next batch after `batch_id`, used by the write pipeline to walk
    /// the queue in order. Pass a negative id for the first batch.
    fn next_batch_after(&self, batch_id: i32) -> StoreResult<Option<MutationBatch>>;

    fn all_batches(&self) -> StoreResult<Vec<MutationBatch>>;

    /// Batches touching `key`, in insertion order.
    fn all_batches_affecting_key(&self, key: &DocumentKey) -> StoreResult<Vec<MutationBatch>>;

    /// Batches touching any key under `query`'s path, in insertion order.
    fn all_batches_affecting_query(&self, query: &Query) -> StoreResult<Vec<MutationBatch>>;

    fn contains_key(&self, key: &DocumentKey) -> StoreResult<bool>;

    /// Records the acknowledgement's stream token. `batch` must be at the
    /// head of the queue.
    fn acknowledge_batch(&mut self, batch: &MutationBatch, stream_token: Vec<u8>)
        -> StoreResult<()>;

    /// Drops `batch` from the queue. Only the head may be removed.
    fn remove_batch(&mut self, batch: &MutationBatch) -> StoreResult<()>;

    fn last_stream_token(&self) -> StoreResult<Vec<u8>>;

    fn set_last_stream_token(&mut self, token: Vec<u8>) -> StoreResult<()>;

    fn highest_batch_id(&self) -> StoreResult<i32>;

    /// Verifies the secondary index against the log, surfacing corruption
    /// instead of acting on it.
    fn consistency_check(&self) -> StoreResult<()>;
}

/// In-memory queue: a growable array in insertion order plus a
/// `key -> batch ids` index keeping the affecting-key lookups fast.
#[derive(Debug)]
pub struct MemoryMutationQueue {
    batches: Vec<MutationBatch>,
    batches_by_key: BTreeMap<DocumentKey, BTreeSet<i32>>,
    next_batch_id: i32,
    last_stream_token: Vec<u8>,
}

impl Default for MemoryMutationQueue {
    fn default() -> Self {
        Self {
            batches: Vec::new(),
            batches_by_key: BTreeMap::new(),
            next_batch_id: 1,
            last_stream_token: Vec::new(),
        }
    }
}

impl MemoryMutationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn require_head(&self, batch: &MutationBatch) -> StoreResult<()> {
        match self.batches.first() {
            Some(head) if head.batch_id == batch.batch_id => Ok(()),
            Some(head) => Err(failed_precondition(format!(
                "Can only remove the first entry of the mutation queue; requested batch {} but the head is {}",
                batch.batch_id, head.batch_id
            ))),
            None => Err(failed_precondition(format!(
                "Batch {} is not in the mutation queue",
                batch.batch_id
            ))),
        }
    }

    fn batches_for_ids(&self, ids: &BTreeSet<i32>) -> Vec<MutationBatch> {
        // Ids are ordered and the log is ordered by id, so this preserves
        // insertion order.
        ids.iter()
            .filter_map(|id| {
                self.batches
                    .binary_search_by_key(id, |batch| batch.batch_id)
                    .ok()
                    .map(|index| self.batches[index].clone())
            })
            .collect()
    }
}

impl MutationQueue for MemoryMutationQueue {
    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.batches.is_empty())
    }

    fn add_batch(
        &mut self,
        local_write_time: Timestamp,
        mutations: Vec<Mutation>,
    ) -> StoreResult<MutationBatch> {
        let batch_id = self.next_batch_id;
        self.next_batch_id += 1;

        let batch = MutationBatch::new(batch_id, local_write_time, mutations);
        for key in batch.keys() {
            self.batches_by_key.entry(key).or_default().insert(batch_id);
        }
        self.batches.push(batch.clone());
        Ok(batch)
    }

    fn lookup_batch(&self, batch_id: i32) -> StoreResult<Option<MutationBatch>> {
        Ok(self
            .batches
            .binary_search_by_key(&batch_id, |batch| batch.batch_id)
            .ok()
            .map(|index| self.batches[index].clone()))
    }

    fn next_batch_after(&self, batch_id: i32) -> StoreResult<Option<MutationBatch>> {
        Ok(self
            .batches
            .iter()
            .find(|batch| batch.batch_id > batch_id)
            .cloned())
    }

    fn all_batches(&self) -> StoreResult<Vec<MutationBatch>> {
        Ok(self.batches.clone())
    }

    fn all_batches_affecting_key(&self, key: &DocumentKey) -> StoreResult<Vec<MutationBatch>> {
        Ok(self
            .batches_by_key
            .get(key)
            .map(|ids| self.batches_for_ids(ids))
            .unwrap_or_default())
    }

    fn all_batches_affecting_query(&self, query: &Query) -> StoreResult<Vec<MutationBatch>> {
        let mut ids = BTreeSet::new();
        for (key, batch_ids) in &self.batches_by_key {
            let affects = if query.is_document_query() {
                key.path() == query.path()
            } else {
                query.path().is_immediate_parent_of(key.path())
            };
            if affects {
                ids.extend(batch_ids.iter().copied());
            }
        }
        Ok(self.batches_for_ids(&ids))
    }

    fn contains_key(&self, key: &DocumentKey) -> StoreResult<bool> {
        Ok(self.batches_by_key.contains_key(key))
    }

    fn acknowledge_batch(
        &mut self,
        batch: &MutationBatch,
        stream_token: Vec<u8>,
    ) -> StoreResult<()> {
        self.require_head(batch)?;
        debug!("Acknowledged mutation batch {}", batch.batch_id);
        self.last_stream_token = stream_token;
        Ok(())
    }

    fn remove_batch(&mut self, batch: &MutationBatch) -> StoreResult<()> {
        self.require_head(batch)?;
        let removed = self.batches.remove(0);
        for key in removed.keys() {
            if let Some(ids) = self.batches_by_key.get_mut(&key) {
                ids.remove(&removed.batch_id);
                if ids.is_empty() {
                    self.batches_by_key.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn last_stream_token(&self) -> StoreResult<Vec<u8>> {
        Ok(self.last_stream_token.clone())
    }

    fn set_last_stream_token(&mut self, token: Vec<u8>) -> StoreResult<()> {
        self.last_stream_token = token;
        Ok(())
    }

    fn highest_batch_id(&self) -> StoreResult<i32> {
        Ok(self.next_batch_id - 1)
    }

    fn consistency_check(&self) -> StoreResult<()> {
        if self.batches.is_empty() && !self.batches_by_key.is_empty() {
            return Err(data_corruption(
                "Document leak: empty mutation queue still has entries in its key index",
            ));
        }
        Ok(())
    }
}
