use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::model::{Document, DocumentKey, ResourcePath};

/// Path-scoped query: either all documents directly inside a collection, or
/// a single document. Filters, ordering, and limits belong to the query
/// engine collaborator; the local store only needs path scoping and the
/// membership predicate.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Query {
    path: ResourcePath,
}

impl Query {
    pub fn at_path(path: ResourcePath) -> Self {
        Self { path }
    }

    pub fn from_string(path: &str) -> StoreResult<Self> {
        Ok(Self::at_path(ResourcePath::from_string(path)?))
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    /// True when the query names one document rather than a collection.
    pub fn is_document_query(&self) -> bool {
        DocumentKey::is_document_path(&self.path)
    }

    /// Membership predicate over present documents.
    pub fn matches(&self, doc: &Document) -> bool {
        if self.is_document_query() {
            doc.key.path() == &self.path
        } else {
            self.path.is_immediate_parent_of(doc.key.path())
        }
    }

    /// Stable identifier used to key target registrations.
    pub fn canonical_id(&self) -> String {
        self.path.canonical_string()
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Query({})", self.canonical_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SnapshotVersion;
    use crate::value::MapValue;

    fn doc(path: &str) -> Document {
        Document::new(
            DocumentKey::from_string(path).unwrap(),
            SnapshotVersion::MIN,
            MapValue::empty(),
            false,
        )
    }

    #[test]
    fn collection_query_matches_direct_children_only() {
        let query = Query::from_string("foo").unwrap();
        assert!(query.matches(&doc("foo/bar")));
        assert!(!query.matches(&doc("foo/bar/Foo/Bar")));
        assert!(!query.matches(&doc("fooo/bar")));
    }

    #[test]
    fn document_query_matches_exactly_one_key() {
        let query = Query::from_string("foo/bar").unwrap();
        assert!(query.is_document_query());
        assert!(query.matches(&doc("foo/bar")));
        assert!(!query.matches(&doc("foo/baz")));
    }
}
