use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::error::{failed_precondition, StoreResult};
use crate::local::query_data::QueryData;
use crate::local::reference_set::ReferenceSet;
use crate::model::{DocumentKey, SnapshotVersion};
use crate::query::Query;
use crate::util::base64;

/// Registry of query targets with their resume metadata and the set of
/// document keys each target has synced.
pub trait TargetCache {
    /// Allocates the next unused target id. Ids are monotonic across the
    /// cache's lifetime; the first allocation yields `2`.
    fn allocate_target_id(&mut self) -> StoreResult<i32>;

    fn add_query_data(&mut self, data: QueryData) -> StoreResult<()>;

    /// Updates an existing registration. An empty resume token in `data`
    /// never replaces a stored non-empty token.
    fn update_query_data(&mut self, data: QueryData) -> StoreResult<()>;

    fn remove_query_data(&mut self, data: &QueryData) -> StoreResult<()>;

    fn query_data(&self, query: &Query) -> StoreResult<Option<QueryData>>;

    fn add_matching_keys(&mut self, keys: &BTreeSet<DocumentKey>, target_id: i32)
        -> StoreResult<()>;

    fn remove_matching_keys(
        &mut self,
        keys: &BTreeSet<DocumentKey>,
        target_id: i32,
    ) -> StoreResult<()>;

    fn remove_matching_keys_for_target(&mut self, target_id: i32) -> StoreResult<BTreeSet<DocumentKey>>;

    fn matching_keys_for_target(&self, target_id: i32) -> StoreResult<BTreeSet<DocumentKey>>;

    /// True when any target has synced `key`.
    fn contains_key(&self, key: &DocumentKey) -> StoreResult<bool>;

    fn highest_target_id(&self) -> StoreResult<i32>;

    fn last_remote_snapshot_version(&self) -> StoreResult<SnapshotVersion>;

    fn set_last_remote_snapshot_version(&mut self, version: SnapshotVersion) -> StoreResult<()>;
}

/// Hands out even target ids starting at 2. Odd ids (and 0) belong to the
/// collaborating sync layer's limbo resolutions, so the two id spaces never
/// collide.
#[derive(Debug)]
pub struct TargetIdGenerator {
    next_id: i32,
}

impl TargetIdGenerator {
    /// Generator whose first id is the smallest even id greater than
    /// `after` (and at least 2).
    pub fn after(after: i32) -> Self {
        let mut next_id = after + 1;
        if next_id % 2 != 0 {
            next_id += 1;
        }
        Self {
            next_id: next_id.max(2),
        }
    }

    pub fn next_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id += 2;
        id
    }
}

#[derive(Debug)]
pub struct MemoryTargetCache {
    /// Registrations keyed by the query's canonical id.
    queries: BTreeMap<String, QueryData>,
    /// The persisted `target id -> matching keys` relation.
    references: ReferenceSet,
    generator: TargetIdGenerator,
    highest_target_id: i32,
    last_remote_snapshot_version: SnapshotVersion,
}

impl Default for MemoryTargetCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTargetCache {
    pub fn new() -> Self {
        Self::with_highest_target_id(0)
    }

    /// Rebuilds a cache whose registry previously allocated ids up to
    /// `highest_target_id`, seeding the generator past it so restored
    /// registrations and fresh allocations never collide.
    pub fn with_highest_target_id(highest_target_id: i32) -> Self {
        Self {
            queries: BTreeMap::new(),
            references: ReferenceSet::new(),
            generator: TargetIdGenerator::after(highest_target_id),
            highest_target_id,
            last_remote_snapshot_version: SnapshotVersion::MIN,
        }
    }
}

impl TargetCache for MemoryTargetCache {
    fn allocate_target_id(&mut self) -> StoreResult<i32> {
        let id = self.generator.next_id();
        self.highest_target_id = self.highest_target_id.max(id);
        Ok(id)
    }

    fn add_query_data(&mut self, data: QueryData) -> StoreResult<()> {
        self.queries.insert(data.query.canonical_id(), data);
        Ok(())
    }

    fn update_query_data(&mut self, mut data: QueryData) -> StoreResult<()> {
        let canonical_id = data.query.canonical_id();
        if let Some(existing) = self.queries.get(&canonical_id) {
            if data.resume_token.is_empty() && !existing.resume_token.is_empty() {
                debug!(
                    "Keeping resume token {} for target {}: the update carried an empty token",
                    base64::encode(&existing.resume_token),
                    existing.target_id
                );
                data.resume_token = existing.resume_token.clone();
            }
        }
        self.queries.insert(canonical_id, data);
        Ok(())
    }

    fn remove_query_data(&mut self, data: &QueryData) -> StoreResult<()> {
        if self.queries.remove(&data.query.canonical_id()).is_none() {
            return Err(failed_precondition(format!(
                "Attempt to remove unregistered query: {}",
                data.query
            )));
        }
        self.references.remove_references_for_id(data.target_id);
        Ok(())
    }

    fn query_data(&self, query: &Query) -> StoreResult<Option<QueryData>> {
        Ok(self.queries.get(&query.canonical_id()).cloned())
    }

    fn add_matching_keys(
        &mut self,
        keys: &BTreeSet<DocumentKey>,
        target_id: i32,
    ) -> StoreResult<()> {
        self.references.add_references(keys.iter().cloned(), target_id);
        Ok(())
    }

    fn remove_matching_keys(
        &mut self,
        keys: &BTreeSet<DocumentKey>,
        target_id: i32,
    ) -> StoreResult<()> {
        self.references.remove_references(keys.iter(), target_id);
        Ok(())
    }

    fn remove_matching_keys_for_target(
        &mut self,
        target_id: i32,
    ) -> StoreResult<BTreeSet<DocumentKey>> {
        Ok(self.references.remove_references_for_id(target_id))
    }

    fn matching_keys_for_target(&self, target_id: i32) -> StoreResult<BTreeSet<DocumentKey>> {
        Ok(self.references.references_for_id(target_id))
    }

    fn contains_key(&self, key: &DocumentKey) -> StoreResult<bool> {
        Ok(self.references.contains_key(key))
    }

    fn highest_target_id(&self) -> StoreResult<i32> {
        Ok(self.highest_target_id)
    }

    fn last_remote_snapshot_version(&self) -> StoreResult<SnapshotVersion> {
        Ok(self.last_remote_snapshot_version)
    }

    fn set_last_remote_snapshot_version(&mut self, version: SnapshotVersion) -> StoreResult<()> {
        self.last_remote_snapshot_version = version;
        Ok(())
    }
}
