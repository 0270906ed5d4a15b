use std::collections::{BTreeMap, BTreeSet};

use crate::error::StoreResult;
use crate::local::mutation_queue::MutationQueue;
use crate::local::remote_document_cache::RemoteDocumentCache;
use crate::model::{Document, DocumentKey, MaybeDocument, NoDocument, SnapshotVersion};
use crate::query::Query;

/// The locally visible state of documents: the remote baseline overlaid
/// with every pending mutation, in batch order. A pure function over the
/// two components it borrows; it holds no state of its own.
pub struct LocalDocumentsView<'a> {
    remote_documents: &'a dyn RemoteDocumentCache,
    mutation_queue: &'a dyn MutationQueue,
}

impl<'a> LocalDocumentsView<'a> {
    pub fn new(
        remote_documents: &'a dyn RemoteDocumentCache,
        mutation_queue: &'a dyn MutationQueue,
    ) -> Self {
        Self {
            remote_documents,
            mutation_queue,
        }
    }

    /// The overlaid view of `key`, or `None` when neither the baseline nor
    /// any pending mutation makes it visible.
    pub fn get_document(&self, key: &DocumentKey) -> StoreResult<Option<MaybeDocument>> {
        let batches = self.mutation_queue.all_batches_affecting_key(key)?;
        let mut document = self.remote_documents.get(key)?;
        for batch in &batches {
            document = batch.apply_to_local_view(key, document);
        }
        Ok(document)
    }

    /// Overlaid views for every key. Keys with no visible document map to a
    /// [`NoDocument`] at `SnapshotVersion::MIN` so change-sets always carry
    /// an entry per affected key.
    pub fn get_documents(
        &self,
        keys: &BTreeSet<DocumentKey>,
    ) -> StoreResult<BTreeMap<DocumentKey, MaybeDocument>> {
        let mut results = BTreeMap::new();
        for key in keys {
            let document = self.get_document(key)?.unwrap_or_else(|| {
                NoDocument::new(key.clone(), SnapshotVersion::MIN).into()
            });
            results.insert(key.clone(), document);
        }
        Ok(results)
    }

    /// Documents matching `query` after overlay: baseline matches, plus
    /// documents that pending mutations create under the query's path,
    /// minus those the overlay deletes or mutates out of the query.
    pub fn get_documents_matching_query(
        &self,
        query: &Query,
    ) -> StoreResult<BTreeMap<DocumentKey, Document>> {
        if query.is_document_query() {
            let key = DocumentKey::from_path(query.path().clone())?;
            let mut results = BTreeMap::new();
            if let Some(MaybeDocument::Document(doc)) = self.get_document(&key)? {
                results.insert(key, doc);
            }
            return Ok(results);
        }

        let mut results = self.remote_documents.get_matching(query)?;
        let batches = self.mutation_queue.all_batches_affecting_query(query)?;
        for batch in &batches {
            for mutation in &batch.mutations {
                let key = mutation.key();
                if !query.path().is_immediate_parent_of(key.path()) {
                    continue;
                }
                let base = results.remove(key).map(MaybeDocument::from);
                let overlaid =
                    mutation.apply_to_local_view(base, batch.local_write_time);
                if let Some(MaybeDocument::Document(doc)) = overlaid {
                    if query.matches(&doc) {
                        results.insert(key.clone(), doc);
                    }
                }
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::mutation_queue::MemoryMutationQueue;
    use crate::local::remote_document_cache::MemoryRemoteDocumentCache;
    use crate::model::Timestamp;
    use crate::mutation::Mutation;
    use crate::value::map_value_from_json;
    use serde_json::json;

    fn key(path: &str) -> DocumentKey {
        DocumentKey::from_string(path).unwrap()
    }

    #[test]
    fn overlays_pending_set_over_baseline() {
        let mut remote = MemoryRemoteDocumentCache::new();
        remote
            .add(
                Document::new(
                    key("foo/bar"),
                    SnapshotVersion::new(Timestamp::new(2, 0)),
                    map_value_from_json(&json!({"it": "base"})).unwrap(),
                    false,
                )
                .into(),
            )
            .unwrap();
        let mut queue = MemoryMutationQueue::new();
        queue
            .add_batch(
                Timestamp::now(),
                vec![Mutation::set(
                    key("foo/bar"),
                    map_value_from_json(&json!({"foo": "bar"})).unwrap(),
                )],
            )
            .unwrap();

        let view = LocalDocumentsView::new(&remote, &queue);
        let doc = view.get_document(&key("foo/bar")).unwrap().unwrap();
        let doc = doc.as_document().unwrap();
        assert!(doc.has_local_mutations);
        assert_eq!(doc.version, SnapshotVersion::new(Timestamp::new(2, 0)));
        assert_eq!(
            doc.fields,
            map_value_from_json(&json!({"foo": "bar"})).unwrap()
        );
    }

    #[test]
    fn query_includes_mutation_created_documents() {
        let remote = MemoryRemoteDocumentCache::new();
        let mut queue = MemoryMutationQueue::new();
        queue
            .add_batch(
                Timestamp::now(),
                vec![Mutation::set(
                    key("foo/bonk"),
                    map_value_from_json(&json!({"a": "b"})).unwrap(),
                )],
            )
            .unwrap();

        let view = LocalDocumentsView::new(&remote, &queue);
        let results = view
            .get_documents_matching_query(&Query::from_string("foo").unwrap())
            .unwrap();
        assert!(results.contains_key(&key("foo/bonk")));
    }

    #[test]
    fn query_drops_locally_deleted_documents() {
        let mut remote = MemoryRemoteDocumentCache::new();
        remote
            .add(
                Document::new(
                    key("foo/bar"),
                    SnapshotVersion::new(Timestamp::new(1, 0)),
                    map_value_from_json(&json!({"a": "b"})).unwrap(),
                    false,
                )
                .into(),
            )
            .unwrap();
        let mut queue = MemoryMutationQueue::new();
        queue
            .add_batch(Timestamp::now(), vec![Mutation::delete(key("foo/bar"))])
            .unwrap();

        let view = LocalDocumentsView::new(&remote, &queue);
        let results = view
            .get_documents_matching_query(&Query::from_string("foo").unwrap())
            .unwrap();
        assert!(results.is_empty());
    }
}
