use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{internal_error, StoreResult};
use crate::model::{DocumentKey, MaybeDocument, SnapshotVersion, Timestamp};
use crate::mutation::mutation::Mutation;
use crate::value::FieldValue;

/// Batch of mutations queued for the write pipeline. Batch ids are assigned
/// by the mutation queue in strictly increasing order per user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MutationBatch {
    pub batch_id: i32,
    /// Client-side time at which the batch was created, used to compensate
    /// server-timestamp transforms locally.
    pub local_write_time: Timestamp,
    pub mutations: Vec<Mutation>,
}

impl MutationBatch {
    pub fn new(batch_id: i32, local_write_time: Timestamp, mutations: Vec<Mutation>) -> Self {
        Self {
            batch_id,
            local_write_time,
            mutations,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Union of the document keys the batch touches.
    pub fn keys(&self) -> BTreeSet<DocumentKey> {
        self.mutations
            .iter()
            .map(|mutation| mutation.key().clone())
            .collect()
    }

    /// Overlays every mutation in this batch that targets `key`, in batch
    /// order, onto `maybe_doc`.
    pub fn apply_to_local_view(
        &self,
        key: &DocumentKey,
        maybe_doc: Option<MaybeDocument>,
    ) -> Option<MaybeDocument> {
        let mut current = maybe_doc;
        for mutation in &self.mutations {
            if mutation.key() == key {
                current = mutation.apply_to_local_view(current, self.local_write_time);
            }
        }
        current
    }
}

/// Result of a single acknowledged mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MutationResult {
    pub version: SnapshotVersion,
    /// Server-computed transform values, positionally matching the
    /// mutation's transforms.
    pub transform_results: Option<Vec<FieldValue>>,
}

/// Successful acknowledgement of a whole mutation batch.
#[derive(Clone, Debug, PartialEq)]
pub struct MutationBatchResult {
    pub batch: MutationBatch,
    pub commit_version: SnapshotVersion,
    pub mutation_results: Vec<MutationResult>,
    pub stream_token: Vec<u8>,
    doc_versions: BTreeMap<DocumentKey, SnapshotVersion>,
}

impl MutationBatchResult {
    /// Builds a result payload, pairing each mutation with its result.
    pub fn from(
        batch: MutationBatch,
        commit_version: SnapshotVersion,
        mutation_results: Vec<MutationResult>,
        stream_token: Vec<u8>,
    ) -> StoreResult<Self> {
        if batch.mutations.len() != mutation_results.len() {
            return Err(internal_error(format!(
                "Mutation batch {} expected {} results but received {}",
                batch.batch_id,
                batch.mutations.len(),
                mutation_results.len()
            )));
        }

        let mut doc_versions = BTreeMap::new();
        for (mutation, result) in batch.mutations.iter().zip(mutation_results.iter()) {
            doc_versions.insert(mutation.key().clone(), result.version);
        }

        Ok(Self {
            batch,
            commit_version,
            mutation_results,
            stream_token,
            doc_versions,
        })
    }

    pub fn batch_id(&self) -> i32 {
        self.batch.batch_id
    }

    /// Resulting remote version for each mutated document; when several
    /// mutations in the batch target the same key, the last result wins.
    /// The write pipeline reads this to record acknowledged versions per
    /// key without re-pairing mutations and results.
    pub fn doc_versions(&self) -> &BTreeMap<DocumentKey, SnapshotVersion> {
        &self.doc_versions
    }
}
