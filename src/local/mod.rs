pub mod garbage_collector;
pub mod local_documents_view;
pub mod local_store;
pub mod local_view_changes;
pub mod mutation_queue;
pub mod persistence;
pub mod query_data;
pub mod reference_set;
pub mod remote_document_cache;
pub mod target_cache;

#[doc(inline)]
pub use garbage_collector::{
    DeferredGarbageCollector, EagerGarbageCollector, GarbageCollector, GarbageMode,
};
#[doc(inline)]
pub use local_documents_view::LocalDocumentsView;
#[doc(inline)]
pub use local_store::{LocalStore, LocalWriteResult, MaybeDocumentMap};
#[doc(inline)]
pub use local_view_changes::LocalViewChanges;
#[doc(inline)]
pub use mutation_queue::{MemoryMutationQueue, MutationQueue};
#[doc(inline)]
pub use persistence::{MemoryPersistence, Persistence, Transaction};
#[doc(inline)]
pub use query_data::{QueryData, QueryPurpose};
#[doc(inline)]
pub use reference_set::ReferenceSet;
#[doc(inline)]
pub use remote_document_cache::{MemoryRemoteDocumentCache, RemoteDocumentCache};
#[doc(inline)]
pub use target_cache::{MemoryTargetCache, TargetCache, TargetIdGenerator};
