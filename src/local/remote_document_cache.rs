use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use crate::error::StoreResult;
use crate::model::{Document, DocumentKey, MaybeDocument};
use crate::query::Query;

/// Cache of the latest server-known state of each document: present
/// documents, tombstones, and unknown documents alike. `add` overwrites
/// unconditionally; version monotonicity is the caller's rule. No mutation
/// overlay is applied at this layer.
pub trait RemoteDocumentCache {
    fn add(&mut self, document: MaybeDocument) -> StoreResult<()>;

    fn remove(&mut self, key: &DocumentKey) -> StoreResult<()>;

    fn get(&self, key: &DocumentKey) -> StoreResult<Option<MaybeDocument>>;

    fn get_all(
        &self,
        keys: &BTreeSet<DocumentKey>,
    ) -> StoreResult<BTreeMap<DocumentKey, Option<MaybeDocument>>>;

    /// Present documents matching `query`, scanned via the path-prefix
    /// index. Tombstones and unknown documents are not returned.
    fn get_matching(&self, query: &Query) -> StoreResult<BTreeMap<DocumentKey, Document>>;
}

/// In-memory cache over an ordered map; the key ordering is the path-prefix
/// index used by `get_matching`.
#[derive(Debug, Default)]
pub struct MemoryRemoteDocumentCache {
    documents: BTreeMap<DocumentKey, MaybeDocument>,
}

impl MemoryRemoteDocumentCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RemoteDocumentCache for MemoryRemoteDocumentCache {
    fn add(&mut self, document: MaybeDocument) -> StoreResult<()> {
        self.documents.insert(document.key().clone(), document);
        Ok(())
    }

    fn remove(&mut self, key: &DocumentKey) -> StoreResult<()> {
        self.documents.remove(key);
        Ok(())
    }

    fn get(&self, key: &DocumentKey) -> StoreResult<Option<MaybeDocument>> {
        Ok(self.documents.get(key).cloned())
    }

    fn get_all(
        &self,
        keys: &BTreeSet<DocumentKey>,
    ) -> StoreResult<BTreeMap<DocumentKey, Option<MaybeDocument>>> {
        let mut results = BTreeMap::new();
        for key in keys {
            results.insert(key.clone(), self.documents.get(key).cloned());
        }
        Ok(results)
    }

    fn get_matching(&self, query: &Query) -> StoreResult<BTreeMap<DocumentKey, Document>> {
        let mut results = BTreeMap::new();

        if query.is_document_query() {
            let key = DocumentKey::from_path(query.path().clone())?;
            if let Some(MaybeDocument::Document(doc)) = self.documents.get(&key) {
                results.insert(key, doc.clone());
            }
            return Ok(results);
        }

        // The empty document id sorts before every real id, making this the
        // smallest possible key inside the queried collection.
        let start = DocumentKey::from_path(query.path().child([""]))?;
        for (key, doc) in self
            .documents
            .range((Bound::Included(start), Bound::Unbounded))
        {
            if !query.path().is_prefix_of(key.path()) {
                break;
            }
            if let MaybeDocument::Document(doc) = doc {
                if query.matches(doc) {
                    results.insert(key.clone(), doc.clone());
                }
            }
        }
        Ok(results)
    }
}
