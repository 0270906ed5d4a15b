//! Fixtures and a driver harness for exercising the local store the way the
//! sync pipeline does: local writes, acknowledgements/rejections, aggregated
//! watch events, and query lifecycle calls.

use std::collections::BTreeSet;

use serde_json::Value as JsonValue;

use firestore_localstore::{
    Document, DocumentKey, FieldValue, GarbageMode, LocalStore, LocalViewChanges, MapValue,
    MaybeDocument, MaybeDocumentMap, MemoryPersistence, Mutation, MutationBatch,
    MutationBatchResult, MutationResult, NoDocument, Query, RemoteEvent, SnapshotVersion,
    TargetChange, Timestamp, UnknownDocument, User,
};

pub fn key(path: &str) -> DocumentKey {
    DocumentKey::from_string(path).expect("valid document key")
}

pub fn query(path: &str) -> Query {
    Query::from_string(path).expect("valid query path")
}

/// Versions are expressed in microseconds, like the watch stream reports
/// them.
pub fn version(micros: i64) -> SnapshotVersion {
    let seconds = micros / 1_000_000;
    let nanos = ((micros % 1_000_000) * 1_000) as i32;
    SnapshotVersion::new(Timestamp::new(seconds, nanos))
}

pub fn fields(json: JsonValue) -> MapValue {
    firestore_localstore::value::map_value_from_json(&json).expect("valid fields")
}

pub fn doc(path: &str, micros: i64, json: JsonValue, has_local_mutations: bool) -> MaybeDocument {
    Document::new(key(path), version(micros), fields(json), has_local_mutations).into()
}

pub fn deleted_doc(path: &str, micros: i64) -> MaybeDocument {
    NoDocument::new(key(path), version(micros)).into()
}

pub fn unknown_doc(path: &str, micros: i64) -> MaybeDocument {
    UnknownDocument::new(key(path), version(micros)).into()
}

pub fn set_mutation(path: &str, json: JsonValue) -> Mutation {
    Mutation::set(key(path), fields(json))
}

pub fn patch_mutation(path: &str, json: JsonValue) -> Mutation {
    Mutation::patch(key(path), fields(json))
}

pub fn delete_mutation(path: &str) -> Mutation {
    Mutation::delete(key(path))
}

pub fn resume_token(micros: i64) -> Vec<u8> {
    format!("snapshot-{micros}").into_bytes()
}

/// Builds the aggregated event the watch stream would produce for a single
/// document update. Present documents are recorded as additions for the
/// targets in `updated`; tombstones and unknown documents as removals, the
/// way the aggregator reports them. Ids in `removed` always become
/// removals. The event's snapshot version is the document's version.
pub fn update_remote_event(
    document: MaybeDocument,
    updated: &[i32],
    removed: &[i32],
) -> RemoteEvent {
    let doc_key = document.key().clone();
    let mut event = RemoteEvent {
        snapshot_version: Some(document.version()),
        ..RemoteEvent::default()
    };

    for target_id in updated {
        let change = event.target_changes.entry(*target_id).or_default();
        if document.is_document() {
            change.added_documents.insert(doc_key.clone());
        } else {
            change.removed_documents.insert(doc_key.clone());
        }
    }
    for target_id in removed {
        let change = event.target_changes.entry(*target_id).or_default();
        change.removed_documents.insert(doc_key.clone());
    }

    event.document_updates.insert(doc_key, document);
    event
}

pub fn added_remote_event(
    document: MaybeDocument,
    updated: &[i32],
    removed: &[i32],
) -> RemoteEvent {
    update_remote_event(document, updated, removed)
}

/// Event carrying only a `Current` target change, as produced when the
/// server checkpoints a listen without document changes.
pub fn current_target_event(target_id: i32, token: Vec<u8>, micros: i64) -> RemoteEvent {
    let mut event = RemoteEvent {
        snapshot_version: Some(version(micros)),
        ..RemoteEvent::default()
    };
    event.target_changes.insert(
        target_id,
        TargetChange {
            resume_token: token,
            current: true,
            ..TargetChange::default()
        },
    );
    event
}

pub fn view_changes(target_id: i32, added: &[&str], removed: &[&str]) -> LocalViewChanges {
    LocalViewChanges::new(
        target_id,
        added.iter().map(|path| key(path)).collect(),
        removed.iter().map(|path| key(path)).collect(),
    )
}

/// Drives one store through the suite, mirroring the sync engine's calling
/// conventions and remembering the change-set of the last operation.
pub struct Fixture {
    pub store: LocalStore,
    pub mode: GarbageMode,
    batches: Vec<MutationBatch>,
    last_changes: Option<MaybeDocumentMap>,
    last_target_id: i32,
}

impl Fixture {
    pub fn new(mode: GarbageMode) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let persistence = MemoryPersistence::new(User::unauthenticated());
        let store =
            LocalStore::new(Box::new(persistence), mode).expect("store starts");
        Self {
            store,
            mode,
            batches: Vec::new(),
            last_changes: None,
            last_target_id: 0,
        }
    }

    pub fn is_eager(&self) -> bool {
        self.mode == GarbageMode::Eager
    }

    pub fn write_mutation(&mut self, mutation: Mutation) {
        self.write_mutations(vec![mutation]);
    }

    pub fn write_mutations(&mut self, mutations: Vec<Mutation>) {
        let result = self
            .store
            .write_locally(mutations.clone())
            .expect("write_locally");
        self.batches.push(MutationBatch::new(
            result.batch_id,
            Timestamp::now(),
            mutations,
        ));
        self.last_changes = Some(result.changes);
    }

    pub fn apply_remote_event(&mut self, event: RemoteEvent) {
        let changes = self.store.apply_remote_event(event).expect("apply event");
        self.last_changes = Some(changes);
    }

    pub fn acknowledge_mutation(&mut self, micros: i64) {
        self.acknowledge_mutation_with(micros, None, Vec::new());
    }

    pub fn acknowledge_mutation_with(
        &mut self,
        micros: i64,
        transform_results: Option<Vec<FieldValue>>,
        stream_token: Vec<u8>,
    ) {
        let batch = self.batches.remove(0);
        let commit_version = version(micros);
        let results = batch
            .mutations
            .iter()
            .map(|_| MutationResult {
                version: commit_version,
                transform_results: transform_results.clone(),
            })
            .collect();
        let result = MutationBatchResult::from(batch, commit_version, results, stream_token)
            .expect("batch result");
        let changes = self.store.acknowledge_batch(result).expect("acknowledge");
        self.last_changes = Some(changes);
    }

    pub fn reject_mutation(&mut self) {
        let batch = self.batches.remove(0);
        let changes = self.store.reject_batch(batch.batch_id).expect("reject");
        self.last_changes = Some(changes);
    }

    pub fn allocate_query(&mut self, q: Query) -> i32 {
        let query_data = self.store.allocate_query(q).expect("allocate query");
        self.last_target_id = query_data.target_id;
        query_data.target_id
    }

    pub fn release_query(&mut self, q: &Query) {
        self.store.release_query(q).expect("release query");
    }

    pub fn notify_local_view_changes(&mut self, changes: LocalViewChanges) {
        self.store
            .notify_local_view_changes(vec![changes])
            .expect("view changes");
    }

    pub fn assert_target_id(&self, target_id: i32) {
        assert_eq!(self.last_target_id, target_id);
    }

    /// The last change-set holds exactly `expected`, in path order.
    pub fn assert_changed(&mut self, expected: &[MaybeDocument]) {
        let changes = self.last_changes.take().expect("an operation ran");
        let actual: Vec<MaybeDocument> = changes.into_values().collect();
        assert_eq!(actual, expected.to_vec());
    }

    /// The last change-set reports exactly `paths`, each as an absent
    /// document.
    pub fn assert_removed(&mut self, paths: &[&str]) {
        let changes = self.last_changes.take().expect("an operation ran");
        assert_eq!(changes.len(), paths.len());
        for ((actual_key, document), path) in changes.iter().zip(paths) {
            assert_eq!(actual_key, &key(path));
            assert!(
                matches!(document, MaybeDocument::NoDocument(_)),
                "expected {path} to be reported as removed, got {document:?}"
            );
        }
    }

    pub fn assert_contains(&mut self, expected: MaybeDocument) {
        let actual = self
            .store
            .read_document(expected.key())
            .expect("read_document");
        assert_eq!(actual.as_ref(), Some(&expected));
    }

    pub fn assert_not_contains(&mut self, path: &str) {
        let actual = self.store.read_document(&key(path)).expect("read_document");
        assert_eq!(actual, None, "expected {path} to be absent");
    }

    pub fn assert_query_returns(&mut self, q: &Query, expected: &[MaybeDocument]) {
        let results = self.store.execute_query(q).expect("execute_query");
        let actual: Vec<MaybeDocument> = results
            .into_values()
            .map(MaybeDocument::Document)
            .collect();
        assert_eq!(actual, expected.to_vec());
    }

    pub fn remote_keys_for_target(&mut self, target_id: i32) -> BTreeSet<DocumentKey> {
        self.store
            .get_remote_document_keys(target_id)
            .expect("remote keys")
    }
}

/// Runs `test` once per garbage-collection mode, each time against a fresh
/// store.
pub fn for_each_mode(test: impl Fn(&mut Fixture)) {
    for mode in [GarbageMode::Eager, GarbageMode::Deferred] {
        let mut fixture = Fixture::new(mode);
        test(&mut fixture);
    }
}
