use serde::{Deserialize, Serialize};

use crate::model::{FieldPath, Timestamp};
use crate::value::{FieldValue, ValueKind};

/// A server-evaluated transformation of a single field, carried by a
/// transform mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldTransform {
    field_path: FieldPath,
    operation: TransformOperation,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TransformOperation {
    ServerTimestamp,
    ArrayUnion(Vec<FieldValue>),
    ArrayRemove(Vec<FieldValue>),
    NumericIncrement(FieldValue),
}

impl FieldTransform {
    pub fn new(field_path: FieldPath, operation: TransformOperation) -> Self {
        Self {
            field_path,
            operation,
        }
    }

    pub fn field_path(&self) -> &FieldPath {
        &self.field_path
    }

    pub fn operation(&self) -> &TransformOperation {
        &self.operation
    }

    /// Evaluates the transform locally against the field's current value,
    /// substituting `local_write_time` for server timestamps.
    pub(crate) fn local_result(
        &self,
        current: Option<FieldValue>,
        local_write_time: Timestamp,
    ) -> FieldValue {
        match &self.operation {
            TransformOperation::ServerTimestamp => FieldValue::from_timestamp(local_write_time),
            TransformOperation::ArrayUnion(elements) => array_union(current, elements),
            TransformOperation::ArrayRemove(elements) => array_remove(current, elements),
            TransformOperation::NumericIncrement(operand) => numeric_increment(current, operand),
        }
    }
}

fn array_union(existing: Option<FieldValue>, additions: &[FieldValue]) -> FieldValue {
    let mut values = match existing {
        Some(value) => match value.kind() {
            ValueKind::Array(array) => array.values().to_vec(),
            _ => Vec::new(),
        },
        None => Vec::new(),
    };

    for element in additions {
        if !values.iter().any(|candidate| candidate == element) {
            values.push(element.clone());
        }
    }

    FieldValue::from_array(values)
}

fn array_remove(existing: Option<FieldValue>, removals: &[FieldValue]) -> FieldValue {
    let values = match existing {
        Some(value) => match value.kind() {
            ValueKind::Array(array) => array.values().to_vec(),
            _ => Vec::new(),
        },
        None => Vec::new(),
    };

    let filtered: Vec<FieldValue> = values
        .into_iter()
        .filter(|candidate| !removals.iter().any(|needle| needle == candidate))
        .collect();

    FieldValue::from_array(filtered)
}

fn numeric_increment(existing: Option<FieldValue>, operand: &FieldValue) -> FieldValue {
    match (existing.as_ref().map(FieldValue::kind), operand.kind()) {
        (Some(ValueKind::Integer(current)), ValueKind::Integer(delta)) => {
            if let Some(sum) = current.checked_add(*delta) {
                FieldValue::from_integer(sum)
            } else {
                FieldValue::from_double(*current as f64 + *delta as f64)
            }
        }
        (Some(ValueKind::Double(current)), ValueKind::Integer(delta)) => {
            FieldValue::from_double(*current + *delta as f64)
        }
        (Some(ValueKind::Integer(current)), ValueKind::Double(delta)) => {
            FieldValue::from_double(*current as f64 + *delta)
        }
        (Some(ValueKind::Double(current)), ValueKind::Double(delta)) => {
            FieldValue::from_double(*current + *delta)
        }
        // A non-numeric or absent base is treated as zero.
        (_, ValueKind::Integer(delta)) => FieldValue::from_integer(*delta),
        (_, ValueKind::Double(delta)) => FieldValue::from_double(*delta),
        (_, _) => FieldValue::from_integer(0),
    }
}
