use serde::{Deserialize, Serialize};

use crate::model::document_key::DocumentKey;
use crate::model::snapshot_version::SnapshotVersion;
use crate::value::MapValue;

/// Everything the local store can know about a document at a version:
/// present with fields, known to be missing, or known to exist with unknown
/// contents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MaybeDocument {
    Document(Document),
    NoDocument(NoDocument),
    UnknownDocument(UnknownDocument),
}

impl MaybeDocument {
    pub fn key(&self) -> &DocumentKey {
        match self {
            MaybeDocument::Document(doc) => &doc.key,
            MaybeDocument::NoDocument(doc) => &doc.key,
            MaybeDocument::UnknownDocument(doc) => &doc.key,
        }
    }

    pub fn version(&self) -> SnapshotVersion {
        match self {
            MaybeDocument::Document(doc) => doc.version,
            MaybeDocument::NoDocument(doc) => doc.version,
            MaybeDocument::UnknownDocument(doc) => doc.version,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            MaybeDocument::Document(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn is_document(&self) -> bool {
        matches!(self, MaybeDocument::Document(_))
    }
}

/// A document present at `version` with its field contents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub key: DocumentKey,
    pub version: SnapshotVersion,
    pub fields: MapValue,
    /// True when at least one pending mutation batch touches this key.
    pub has_local_mutations: bool,
}

impl Document {
    pub fn new(
        key: DocumentKey,
        version: SnapshotVersion,
        fields: MapValue,
        has_local_mutations: bool,
    ) -> Self {
        Self {
            key,
            version,
            fields,
            has_local_mutations,
        }
    }
}

/// Tombstone: the server confirmed the document does not exist at `version`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoDocument {
    pub key: DocumentKey,
    pub version: SnapshotVersion,
}

impl NoDocument {
    pub fn new(key: DocumentKey, version: SnapshotVersion) -> Self {
        Self { key, version }
    }
}

/// The document exists remotely at `version` but its fields are not known
/// locally. Produced when a transform is acknowledged against a baseline the
/// store never saw.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnknownDocument {
    pub key: DocumentKey,
    pub version: SnapshotVersion,
}

impl UnknownDocument {
    pub fn new(key: DocumentKey, version: SnapshotVersion) -> Self {
        Self { key, version }
    }
}

impl From<Document> for MaybeDocument {
    fn from(doc: Document) -> Self {
        MaybeDocument::Document(doc)
    }
}

impl From<NoDocument> for MaybeDocument {
    fn from(doc: NoDocument) -> Self {
        MaybeDocument::NoDocument(doc)
    }
}

impl From<UnknownDocument> for MaybeDocument {
    fn from(doc: UnknownDocument) -> Self {
        MaybeDocument::UnknownDocument(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn exposes_key_and_version() {
        let key = DocumentKey::from_string("cities/sf").unwrap();
        let doc: MaybeDocument =
            NoDocument::new(key.clone(), SnapshotVersion::MIN).into();
        assert_eq!(doc.key(), &key);
        assert_eq!(doc.version(), SnapshotVersion::MIN);
        assert!(!doc.is_document());
    }

    #[test]
    fn document_variant_carries_fields() {
        let key = DocumentKey::from_string("cities/sf").unwrap();
        let doc: MaybeDocument = Document::new(
            key,
            SnapshotVersion::MIN,
            MapValue::new(BTreeMap::new()),
            true,
        )
        .into();
        assert!(doc.as_document().unwrap().has_local_mutations);
    }
}
