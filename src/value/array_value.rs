use serde::{Deserialize, Serialize};

use crate::value::FieldValue;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArrayValue {
    values: Vec<FieldValue>,
}

impl ArrayValue {
    pub fn new(values: Vec<FieldValue>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_values_in_order() {
        let array = ArrayValue::new(vec![
            FieldValue::from_integer(1),
            FieldValue::from_integer(2),
        ]);
        assert_eq!(array.values().len(), 2);
    }
}
