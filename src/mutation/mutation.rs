use serde::{Deserialize, Serialize};

use crate::model::{
    Document, DocumentKey, FieldPath, MaybeDocument, NoDocument, SnapshotVersion, Timestamp,
    UnknownDocument,
};
use crate::mutation::batch::MutationResult;
use crate::mutation::transform::FieldTransform;
use crate::value::map_value::{remove_at_field_path, set_at_field_path};
use crate::value::MapValue;

/// Guard a mutation imposes on the state it applies to. `None` is distinct
/// from `Exists(false)`: the former applies unconditionally, the latter
/// requires the document to be absent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Precondition {
    None,
    Exists(bool),
    UpdateTime(SnapshotVersion),
}

impl Precondition {
    pub fn is_valid_for(&self, maybe_doc: Option<&MaybeDocument>) -> bool {
        match self {
            Precondition::None => true,
            Precondition::Exists(exists) => {
                let is_document = matches!(maybe_doc, Some(MaybeDocument::Document(_)));
                is_document == *exists
            }
            Precondition::UpdateTime(version) => match maybe_doc {
                Some(MaybeDocument::Document(doc)) => doc.version == *version,
                _ => false,
            },
        }
    }
}

/// A single locally issued write.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    key: DocumentKey,
    op: MutationOp,
    precondition: Precondition,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MutationOp {
    /// Replace the document's contents.
    Set { fields: MapValue },
    /// Merge `fields` into the document under `mask`; a masked path missing
    /// from `fields` is deleted.
    Patch {
        mask: Vec<FieldPath>,
        fields: MapValue,
    },
    Delete,
    /// Server-evaluated field transforms, compensated locally until the
    /// acknowledgement arrives.
    Transform { transforms: Vec<FieldTransform> },
}

impl Mutation {
    pub fn set(key: DocumentKey, fields: MapValue) -> Self {
        Self {
            key,
            op: MutationOp::Set { fields },
            precondition: Precondition::None,
        }
    }

    /// Patch over the given top-level fields. Patches require the document to
    /// exist; a patch queued before any baseline stays invisible.
    pub fn patch(key: DocumentKey, fields: MapValue) -> Self {
        let mask = fields
            .fields()
            .keys()
            .map(|name| FieldPath::new([name.clone()]).expect("field names are non-empty"))
            .collect();
        Self::patch_with_mask(key, mask, fields)
    }

    pub fn patch_with_mask(key: DocumentKey, mask: Vec<FieldPath>, fields: MapValue) -> Self {
        Self {
            key,
            op: MutationOp::Patch { mask, fields },
            precondition: Precondition::Exists(true),
        }
    }

    pub fn delete(key: DocumentKey) -> Self {
        Self {
            key,
            op: MutationOp::Delete,
            precondition: Precondition::None,
        }
    }

    pub fn transform(key: DocumentKey, transforms: Vec<FieldTransform>) -> Self {
        Self {
            key,
            op: MutationOp::Transform { transforms },
            precondition: Precondition::Exists(true),
        }
    }

    pub fn with_precondition(mut self, precondition: Precondition) -> Self {
        self.precondition = precondition;
        self
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn op(&self) -> &MutationOp {
        &self.op
    }

    pub fn precondition(&self) -> &Precondition {
        &self.precondition
    }

    /// Applies the not-yet-acknowledged mutation to the overlaid view of its
    /// document. Returns the input unchanged when the precondition does not
    /// hold, which is what keeps blind patches and transforms invisible.
    pub fn apply_to_local_view(
        &self,
        maybe_doc: Option<MaybeDocument>,
        local_write_time: Timestamp,
    ) -> Option<MaybeDocument> {
        if !self.precondition.is_valid_for(maybe_doc.as_ref()) {
            return maybe_doc;
        }

        match &self.op {
            MutationOp::Set { fields } => {
                let version = post_mutation_version(maybe_doc.as_ref());
                Some(Document::new(self.key.clone(), version, fields.clone(), true).into())
            }
            MutationOp::Patch { mask, fields } => {
                let doc = match maybe_doc {
                    Some(MaybeDocument::Document(doc)) => doc,
                    other => return other,
                };
                let mut new_fields = doc.fields.fields().clone();
                for path in mask {
                    match fields.get(path) {
                        Some(value) => set_at_field_path(&mut new_fields, path, value.clone()),
                        None => remove_at_field_path(&mut new_fields, path),
                    }
                }
                Some(
                    Document::new(
                        self.key.clone(),
                        doc.version,
                        MapValue::new(new_fields),
                        true,
                    )
                    .into(),
                )
            }
            MutationOp::Delete => {
                Some(NoDocument::new(self.key.clone(), SnapshotVersion::MIN).into())
            }
            MutationOp::Transform { transforms } => {
                let doc = match maybe_doc {
                    Some(MaybeDocument::Document(doc)) => doc,
                    other => return other,
                };
                let mut new_fields = doc.fields.fields().clone();
                for transform in transforms {
                    let current = doc.fields.get(transform.field_path()).cloned();
                    let result = transform.local_result(current, local_write_time);
                    set_at_field_path(&mut new_fields, transform.field_path(), result);
                }
                Some(
                    Document::new(
                        self.key.clone(),
                        doc.version,
                        MapValue::new(new_fields),
                        true,
                    )
                    .into(),
                )
            }
        }
    }

    /// Applies the acknowledged mutation to the remote baseline. Returns
    /// `None` when the acknowledgement carries nothing to persist (patches
    /// are reconciled by a later watch update instead).
    pub fn apply_to_remote_document(
        &self,
        existing: Option<&MaybeDocument>,
        result: &MutationResult,
    ) -> Option<MaybeDocument> {
        match &self.op {
            MutationOp::Set { fields } => Some(
                Document::new(self.key.clone(), result.version, fields.clone(), false).into(),
            ),
            MutationOp::Patch { .. } => None,
            MutationOp::Delete => {
                Some(NoDocument::new(self.key.clone(), result.version).into())
            }
            MutationOp::Transform { transforms } => {
                let doc = match existing {
                    Some(MaybeDocument::Document(doc)) => doc,
                    _ => {
                        return Some(
                            UnknownDocument::new(self.key.clone(), result.version).into(),
                        )
                    }
                };
                let server_results = match &result.transform_results {
                    Some(results) if results.len() == transforms.len() => results,
                    // Without usable server results the new contents cannot be
                    // derived locally.
                    _ => {
                        return Some(
                            UnknownDocument::new(self.key.clone(), result.version).into(),
                        )
                    }
                };
                let mut new_fields = doc.fields.fields().clone();
                for (transform, value) in transforms.iter().zip(server_results) {
                    set_at_field_path(&mut new_fields, transform.field_path(), value.clone());
                }
                Some(
                    Document::new(
                        self.key.clone(),
                        result.version,
                        MapValue::new(new_fields),
                        false,
                    )
                    .into(),
                )
            }
        }
    }
}

/// A local write keeps the baseline's version when one exists so the view
/// stays comparable with later watch updates.
fn post_mutation_version(maybe_doc: Option<&MaybeDocument>) -> SnapshotVersion {
    match maybe_doc {
        Some(MaybeDocument::Document(doc)) => doc.version,
        _ => SnapshotVersion::MIN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Timestamp;
    use crate::value::map_value_from_json;
    use serde_json::json;

    fn key() -> DocumentKey {
        DocumentKey::from_string("rooms/eros").unwrap()
    }

    fn fields(json: serde_json::Value) -> MapValue {
        map_value_from_json(&json).unwrap()
    }

    fn base_doc(version_seconds: i64, json: serde_json::Value) -> MaybeDocument {
        Document::new(
            key(),
            SnapshotVersion::new(Timestamp::new(version_seconds, 0)),
            fields(json),
            false,
        )
        .into()
    }

    #[test]
    fn set_replaces_contents_and_keeps_version() {
        let mutation = Mutation::set(key(), fields(json!({"name": "eros"})));
        let result = mutation
            .apply_to_local_view(Some(base_doc(3, json!({"old": true}))), Timestamp::new(9, 0))
            .unwrap();
        let doc = result.as_document().unwrap();
        assert_eq!(doc.version, SnapshotVersion::new(Timestamp::new(3, 0)));
        assert_eq!(doc.fields, fields(json!({"name": "eros"})));
        assert!(doc.has_local_mutations);
    }

    #[test]
    fn patch_without_document_is_invisible() {
        let mutation = Mutation::patch(key(), fields(json!({"name": "eros"})));
        assert_eq!(mutation.apply_to_local_view(None, Timestamp::new(9, 0)), None);
    }

    #[test]
    fn patch_merges_masked_fields() {
        let mutation = Mutation::patch(key(), fields(json!({"name": "eros"})));
        let result = mutation
            .apply_to_local_view(Some(base_doc(1, json!({"count": 1}))), Timestamp::new(9, 0))
            .unwrap();
        let doc = result.as_document().unwrap();
        assert_eq!(doc.fields, fields(json!({"count": 1, "name": "eros"})));
    }

    #[test]
    fn delete_produces_local_tombstone() {
        let mutation = Mutation::delete(key());
        let result = mutation
            .apply_to_local_view(Some(base_doc(5, json!({}))), Timestamp::new(9, 0))
            .unwrap();
        assert_eq!(
            result,
            NoDocument::new(key(), SnapshotVersion::MIN).into()
        );
    }

    #[test]
    fn acknowledged_transform_without_baseline_is_unknown() {
        let mutation = Mutation::transform(key(), Vec::new());
        let ack = MutationResult {
            version: SnapshotVersion::new(Timestamp::new(7, 0)),
            transform_results: None,
        };
        let result = mutation.apply_to_remote_document(None, &ack).unwrap();
        assert!(matches!(result, MaybeDocument::UnknownDocument(_)));
    }
}
