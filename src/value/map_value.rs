use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::FieldPath;
use crate::value::{FieldValue, ValueKind};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapValue {
    fields: BTreeMap<String, FieldValue>,
}

impl MapValue {
    pub fn new(fields: BTreeMap<String, FieldValue>) -> Self {
        Self { fields }
    }

    pub fn empty() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    /// Retrieves the value referenced by `field_path`, descending through
    /// nested maps.
    pub fn get(&self, field_path: &FieldPath) -> Option<&FieldValue> {
        get_from_segments(self.fields(), field_path.segments())
    }
}

fn get_from_segments<'a>(
    fields: &'a BTreeMap<String, FieldValue>,
    segments: &[String],
) -> Option<&'a FieldValue> {
    let (first, rest) = segments.split_first()?;
    let value = fields.get(first)?;
    if rest.is_empty() {
        Some(value)
    } else if let ValueKind::Map(child) = value.kind() {
        get_from_segments(child.fields(), rest)
    } else {
        None
    }
}

/// Writes `value` at `path`, creating intermediate maps and replacing any
/// non-map value along the way.
pub(crate) fn set_at_field_path(
    fields: &mut BTreeMap<String, FieldValue>,
    path: &FieldPath,
    value: FieldValue,
) {
    set_at_segments(fields, path.segments(), value);
}

fn set_at_segments(
    fields: &mut BTreeMap<String, FieldValue>,
    segments: &[String],
    value: FieldValue,
) {
    let (first, rest) = match segments.split_first() {
        Some(parts) => parts,
        None => return,
    };

    if rest.is_empty() {
        fields.insert(first.clone(), value);
        return;
    }

    let mut child_fields = match fields.get(first).map(FieldValue::kind) {
        Some(ValueKind::Map(child)) => child.fields().clone(),
        _ => BTreeMap::new(),
    };
    set_at_segments(&mut child_fields, rest, value);
    fields.insert(first.clone(), FieldValue::from_map(child_fields));
}

/// Deletes the value at `path`, pruning maps that become empty.
pub(crate) fn remove_at_field_path(fields: &mut BTreeMap<String, FieldValue>, path: &FieldPath) {
    remove_at_segments(fields, path.segments());
}

fn remove_at_segments(fields: &mut BTreeMap<String, FieldValue>, segments: &[String]) {
    let (first, rest) = match segments.split_first() {
        Some(parts) => parts,
        None => return,
    };

    if rest.is_empty() {
        fields.remove(first);
        return;
    }

    if let Some(value) = fields.get(first).cloned() {
        if let ValueKind::Map(child_map) = value.kind() {
            let mut child_fields = child_map.fields().clone();
            remove_at_segments(&mut child_fields, rest);
            if child_fields.is_empty() {
                fields.remove(first);
            } else {
                fields.insert(first.clone(), FieldValue::from_map(child_fields));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_map_entries() {
        let mut map = BTreeMap::new();
        map.insert("foo".to_string(), FieldValue::from_integer(1));
        let value = MapValue::new(map.clone());
        assert_eq!(value.fields().get("foo"), map.get("foo"));
    }

    #[test]
    fn get_returns_nested_value() {
        let mut inner = BTreeMap::new();
        inner.insert("bar".to_string(), FieldValue::from_string("baz"));
        let mut map = BTreeMap::new();
        map.insert("foo".to_string(), FieldValue::from_map(inner));
        let value = MapValue::new(map);
        let path = FieldPath::from_dot_separated("foo.bar").unwrap();
        let result = value.get(&path).unwrap();
        match result.kind() {
            ValueKind::String(s) => assert_eq!(s, "baz"),
            _ => panic!("expected string"),
        }
    }

    #[test]
    fn set_creates_intermediate_maps() {
        let mut fields = BTreeMap::new();
        let path = FieldPath::from_dot_separated("a.b.c").unwrap();
        set_at_field_path(&mut fields, &path, FieldValue::from_integer(7));
        let map = MapValue::new(fields);
        assert_eq!(map.get(&path), Some(&FieldValue::from_integer(7)));
    }

    #[test]
    fn remove_prunes_empty_maps() {
        let mut fields = BTreeMap::new();
        let path = FieldPath::from_dot_separated("a.b").unwrap();
        set_at_field_path(&mut fields, &path, FieldValue::from_bool(true));
        remove_at_field_path(&mut fields, &path);
        assert!(fields.is_empty());
    }
}
