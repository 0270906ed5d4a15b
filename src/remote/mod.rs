pub mod remote_event;

#[doc(inline)]
pub use remote_event::{RemoteEvent, TargetChange};
