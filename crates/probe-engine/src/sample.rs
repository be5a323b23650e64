//! Samples, values, and dimension tuples
//!
//! Every stream carries [`Sample`]s. A sample's [`Dimensions`] identify
//! which series within the stream it belongs to: the group-by tuple as
//! an ordered label→value map, with the empty map meaning the single
//! global series. Two samples on the same stream with equal dimensions
//! are successive points of one time series.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The group-by tuple identifying one series within a stream
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Dimensions(BTreeMap<String, String>);

impl Dimensions {
    /// The empty (global) dimension tuple
    pub fn none() -> Self {
        Self(BTreeMap::new())
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.0.insert(label.into(), value.into());
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.0.get(label).map(String::as_str)
    }

    /// Restrict to the given labels; labels absent from the tuple are
    /// simply not part of the projection
    pub fn project(&self, labels: &[String]) -> Dimensions {
        Self(
            self.0
                .iter()
                .filter(|(k, _)| labels.iter().any(|l| l == *k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(global)");
        }
        let mut first = true;
        for (k, v) in &self.0 {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{k}={v}")?;
            first = false;
        }
        Ok(())
    }
}

/// One point of a buffered window, as re-emitted by accumulating
/// processors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: Value,
}

/// A sample value
///
/// `Series` is the composite shape produced by window-emitting
/// processors; its `sample_count` pseudo-field is addressable through
/// the `property` selector of range processors. `Set` is produced by
/// set-algebra processors and holds projected dimension tuples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Number(f64),
    Bool(bool),
    Text(String),
    Set(BTreeSet<Dimensions>),
    Series(Vec<SeriesPoint>),
}

impl Value {
    /// Numeric view; booleans coerce to 0/1 so that status feeds can be
    /// range-checked directly
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The discrete rendering compared against `reference_state`
    pub fn discrete(&self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(b.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Named-field selection for composite values (the `property`
    /// selector of range processors)
    pub fn field(&self, name: &str) -> Option<f64> {
        match (self, name) {
            (Value::Series(points), "sample_count") => Some(points.len() as f64),
            (Value::Set(members), "sample_count") => Some(members.len() as f64),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// One observation on a stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub dimensions: Dimensions,
    pub value: Value,
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    pub fn new(dimensions: Dimensions, value: impl Into<Value>, timestamp: DateTime<Utc>) -> Self {
        Self {
            dimensions,
            value: value.into(),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_projection_keeps_only_named_labels() {
        let dims = Dimensions::from_pairs([
            ("system_id", "leaf1"),
            ("interface", "swp1"),
            ("link_role", "leaf_spine"),
        ]);
        let projected = dims.project(&["system_id".to_string(), "link_role".to_string()]);
        assert_eq!(projected.len(), 2);
        assert_eq!(projected.get("system_id"), Some("leaf1"));
        assert_eq!(projected.get("interface"), None);
    }

    #[test]
    fn test_projection_onto_empty_is_global() {
        let dims = Dimensions::from_pairs([("system_id", "leaf1")]);
        assert!(dims.project(&[]).is_empty());
        assert_eq!(dims.project(&[]), Dimensions::none());
    }

    #[test]
    fn test_value_coercions() {
        assert_eq!(Value::Number(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::Bool(true).as_f64(), Some(1.0));
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Number(1.0).as_bool(), None);
        assert_eq!(Value::Bool(false).discrete().as_deref(), Some("false"));
    }

    #[test]
    fn test_series_sample_count_field() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let series = Value::Series(vec![
            SeriesPoint {
                timestamp: t,
                value: Value::Number(1.0),
            },
            SeriesPoint {
                timestamp: t,
                value: Value::Number(2.0),
            },
        ]);
        assert_eq!(series.field("sample_count"), Some(2.0));
        assert_eq!(series.field("unknown"), None);
        assert_eq!(Value::Number(1.0).field("sample_count"), None);
    }
}
