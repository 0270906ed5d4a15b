pub mod document_key;
pub mod field_path;
pub mod maybe_document;
pub mod resource_path;
pub mod snapshot_version;
pub mod timestamp;

#[doc(inline)]
pub use document_key::DocumentKey;
#[doc(inline)]
pub use field_path::FieldPath;
#[doc(inline)]
pub use maybe_document::{Document, MaybeDocument, NoDocument, UnknownDocument};
#[doc(inline)]
pub use resource_path::ResourcePath;
#[doc(inline)]
pub use snapshot_version::SnapshotVersion;
#[doc(inline)]
pub use timestamp::Timestamp;
