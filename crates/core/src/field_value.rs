//! [`FieldValue`]: the typed variant a field change's value is represented as
//!
//! `new_value`/`old_value`/`final_value` are represented as a sum type over
//! {null, bool, number, string, array, object} rather than an untyped blob.
//! `serde_json::Value` already is exactly that sum type and arrives for free
//! with `Serialize`/`Deserialize`, so we wrap it in a transparent newtype
//! rather than redefine it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A serializable field value: null, bool, number, string, array, or object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldValue(serde_json::Value);

impl FieldValue {
    /// The JSON `null` value
    pub fn null() -> Self {
        Self(serde_json::Value::Null)
    }

    /// Wrap a `serde_json::Value` directly
    pub fn from_json(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Unwrap into the underlying `serde_json::Value`
    pub fn into_json(self) -> serde_json::Value {
        self.0
    }

    /// Borrow the underlying `serde_json::Value`
    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    /// True if this value is a JSON object
    pub fn is_object(&self) -> bool {
        self.0.is_object()
    }

    /// Borrow as an object map, if this value is one
    pub fn as_object(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.0.as_object()
    }

    /// Recursively merge `other` on top of `self`: later values override
    /// overlapping leaf keys; non-object inputs simply replace.
    ///
    /// Unlike a JSON merge-patch, a `null` leaf in `other` does not delete
    /// the key here — the `merge` strategy has no delete semantics, only
    /// override.
    pub fn merge_over(&self, other: &FieldValue) -> FieldValue {
        FieldValue(merge_inner(&self.0, &other.0))
    }
}

fn merge_inner(base: &serde_json::Value, patch: &serde_json::Value) -> serde_json::Value {
    match (base, patch) {
        (serde_json::Value::Object(base_obj), serde_json::Value::Object(patch_obj)) => {
            let mut merged = base_obj.clone();
            for (key, patch_value) in patch_obj {
                let next = match merged.get(key) {
                    Some(base_value) => merge_inner(base_value, patch_value),
                    None => patch_value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            serde_json::Value::Object(merged)
        }
        _ => patch.clone(),
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self(serde_json::Value::from(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self(serde_json::Value::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self(serde_json::Value::from(value))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self(serde_json::Value::from(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self(serde_json::Value::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_overrides_overlapping_leaf_keys() {
        let base = FieldValue::from_json(json!({"x": 1, "y": 2}));
        let patch = FieldValue::from_json(json!({"y": 3, "z": 4}));
        let merged = base.merge_over(&patch);
        assert_eq!(merged.as_json(), &json!({"x": 1, "y": 3, "z": 4}));
    }

    #[test]
    fn merge_of_non_objects_replaces() {
        let base = FieldValue::from_json(json!(1));
        let patch = FieldValue::from_json(json!(2));
        assert_eq!(base.merge_over(&patch).as_json(), &json!(2));
    }

    #[test]
    fn three_way_merge_folds_left_to_right() {
        let c1 = FieldValue::from_json(json!({"x": 1, "y": 2}));
        let c2 = FieldValue::from_json(json!({"y": 3, "z": 4}));
        let c3 = FieldValue::from_json(json!({"z": 5}));
        let merged = c1.merge_over(&c2).merge_over(&c3);
        assert_eq!(merged.as_json(), &json!({"x": 1, "y": 3, "z": 5}));
    }

    #[test]
    fn accepted_value_kinds() {
        let _n = FieldValue::null();
        let _b = FieldValue::from(true);
        let _i = FieldValue::from(42i64);
        let _f = FieldValue::from(3.5);
        let _s = FieldValue::from("hello");
        let _o = FieldValue::from_json(json!({"a": 1}));
    }
}
