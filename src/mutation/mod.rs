pub mod batch;
pub mod mutation;
pub mod transform;

#[doc(inline)]
pub use batch::{MutationBatch, MutationBatchResult, MutationResult};
#[doc(inline)]
pub use mutation::{Mutation, MutationOp, Precondition};
#[doc(inline)]
pub use transform::{FieldTransform, TransformOperation};
