pub mod array_value;
pub mod bytes_value;
pub mod json;
pub mod map_value;
pub mod value;

#[doc(inline)]
pub use array_value::ArrayValue;
#[doc(inline)]
pub use bytes_value::BytesValue;
#[doc(inline)]
pub use json::{field_value_from_json, map_value_from_json};
#[doc(inline)]
pub use map_value::MapValue;
#[doc(inline)]
pub use value::{FieldValue, ValueKind};
