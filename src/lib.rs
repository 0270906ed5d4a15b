#![doc = include_str!("RUSTDOC.md")]

pub mod auth;
pub mod error;
pub mod local;
pub mod model;
pub mod mutation;
pub mod query;
pub mod remote;
pub mod util;
pub mod value;

#[doc(inline)]
pub use auth::User;

#[doc(inline)]
pub use error::{LocalStoreError, LocalStoreErrorCode, StoreResult};

#[doc(inline)]
pub use local::{
    GarbageCollector, GarbageMode, LocalStore, LocalViewChanges, LocalWriteResult,
    MaybeDocumentMap, MemoryPersistence, Persistence, QueryData, QueryPurpose,
};

#[doc(inline)]
pub use model::{
    Document, DocumentKey, FieldPath, MaybeDocument, NoDocument, ResourcePath, SnapshotVersion,
    Timestamp, UnknownDocument,
};

#[doc(inline)]
pub use mutation::{
    FieldTransform, Mutation, MutationBatch, MutationBatchResult, MutationResult, Precondition,
    TransformOperation,
};

#[doc(inline)]
pub use query::Query;

#[doc(inline)]
pub use remote::{RemoteEvent, TargetChange};

#[doc(inline)]
pub use value::{ArrayValue, BytesValue, FieldValue, MapValue, ValueKind};
