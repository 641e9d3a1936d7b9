//! Field values extracted from graph nodes for indexing.
//!
//! Indexes operate on flat field maps rather than on `GraphNode` directly,
//! so the orchestrator stays agnostic of where a document came from. The
//! value type carries a total order (floats via `ordered-float`) so any
//! field can serve as a B-tree key.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single field value in an index document.
///
/// The derived ordering is total: `Null < Bool < Int < Float < Str`, with
/// the natural order inside each variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(String),
}

/// A flat field map describing one node to the indexes.
pub type NodeData = BTreeMap<String, FieldValue>;

impl FieldValue {
    /// Check for the null value
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(v.into_inner()),
            _ => None,
        }
    }

    /// String view of the value, if it is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "NULL"),
            FieldValue::Bool(v) => write!(f, "{}", v),
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Str(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<usize> for FieldValue {
    fn from(v: usize) -> Self {
        FieldValue::Int(v as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(OrderedFloat(v))
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

/// Convenience constructor for a [`NodeData`] map from (field, value) pairs.
pub fn node_data<I, K, V>(fields: I) -> NodeData
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<FieldValue>,
{
    fields
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_order() {
        let mut values = vec![
            FieldValue::from("zeta"),
            FieldValue::from(3.5),
            FieldValue::from(10i64),
            FieldValue::from(2i64),
            FieldValue::Null,
            FieldValue::from("alpha"),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                FieldValue::Null,
                FieldValue::from(2i64),
                FieldValue::from(10i64),
                FieldValue::from(3.5),
                FieldValue::from("alpha"),
                FieldValue::from("zeta"),
            ]
        );
    }

    #[test]
    fn test_display_for_composite_keys() {
        assert_eq!(FieldValue::Null.to_string(), "NULL");
        assert_eq!(FieldValue::from("ts").to_string(), "ts");
        assert_eq!(FieldValue::from(42i64).to_string(), "42");
    }

    #[test]
    fn test_node_data_helper() {
        let data = node_data([("name", FieldValue::from("login")), ("line", 10usize.into())]);
        assert_eq!(data.get("name").unwrap().as_str(), Some("login"));
        assert_eq!(data.get("line").unwrap().as_f64(), Some(10.0));
    }
}
