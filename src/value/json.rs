//! Conversions from plain JSON into field values, for key/value back-ends
//! and test fixtures.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::error::{invalid_argument, StoreResult};
use crate::value::{FieldValue, MapValue};

/// Converts a JSON value into a [`FieldValue`]. Numbers become integers when
/// they fit in `i64` and doubles otherwise.
pub fn field_value_from_json(value: &JsonValue) -> StoreResult<FieldValue> {
    let converted = match value {
        JsonValue::Null => FieldValue::null(),
        JsonValue::Bool(b) => FieldValue::from_bool(*b),
        JsonValue::Number(number) => {
            if let Some(int) = number.as_i64() {
                FieldValue::from_integer(int)
            } else if let Some(double) = number.as_f64() {
                FieldValue::from_double(double)
            } else {
                return Err(invalid_argument(format!(
                    "Unrepresentable JSON number: {number}"
                )));
            }
        }
        JsonValue::String(s) => FieldValue::from_string(s.clone()),
        JsonValue::Array(entries) => {
            let values = entries
                .iter()
                .map(field_value_from_json)
                .collect::<StoreResult<Vec<_>>>()?;
            FieldValue::from_array(values)
        }
        JsonValue::Object(entries) => {
            let mut fields = BTreeMap::new();
            for (name, entry) in entries {
                fields.insert(name.clone(), field_value_from_json(entry)?);
            }
            FieldValue::from_map(fields)
        }
    };
    Ok(converted)
}

/// Converts a JSON object into a [`MapValue`] document body.
pub fn map_value_from_json(value: &JsonValue) -> StoreResult<MapValue> {
    match value {
        JsonValue::Object(entries) => {
            let mut fields = BTreeMap::new();
            for (name, entry) in entries {
                fields.insert(name.clone(), field_value_from_json(entry)?);
            }
            Ok(MapValue::new(fields))
        }
        other => Err(invalid_argument(format!(
            "Document fields must be a JSON object, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldPath;
    use crate::value::ValueKind;
    use serde_json::json;

    #[test]
    fn converts_scalars_and_nesting() {
        let map = map_value_from_json(&json!({
            "name": "sf",
            "population": 815_000,
            "coords": { "lat": 37.77 },
            "tags": ["bay", "fog"],
            "county": null
        }))
        .unwrap();

        let lat = FieldPath::from_dot_separated("coords.lat").unwrap();
        assert!(matches!(map.get(&lat).unwrap().kind(), ValueKind::Double(_)));
        let name = FieldPath::from_dot_separated("name").unwrap();
        assert_eq!(map.get(&name), Some(&FieldValue::from_string("sf")));
    }

    #[test]
    fn rejects_non_object_document() {
        let err = map_value_from_json(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(err.code_str(), "localstore/invalid-argument");
    }
}
