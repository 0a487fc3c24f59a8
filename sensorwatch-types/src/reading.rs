//! Reading - a point-in-time set of named sensor values.

use std::collections::BTreeMap;

/// An immutable mapping from variable name to numeric value.
///
/// A reading is built once per inbound message and handed to every channel's
/// predicate. Names are case-sensitive (`X` and `x` are different variables).
///
/// # Example
///
/// ```rust
/// use sensorwatch_types::Reading;
///
/// let reading: Reading = [("T", 51.0), ("H", 82.5)].into_iter().collect();
/// assert!(reading.contains("T"));
/// assert_eq!(reading.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Reading {
    values: BTreeMap<String, f64>,
}

impl Reading {
    /// Create an empty reading.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, returning the reading for chaining.
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    /// Look up a value by variable name.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Check whether a variable is present.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of values in the reading.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the reading holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Reading {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_builder() {
        let reading = Reading::new().with("X", 1.5).with("Y", -2.0);
        assert_eq!(reading.get("X"), Some(1.5));
        assert_eq!(reading.get("Y"), Some(-2.0));
        assert_eq!(reading.get("Z"), None);
    }

    #[test]
    fn test_reading_insert_replaces() {
        let mut reading = Reading::new();
        reading.insert("L", 10.0);
        reading.insert("L", 20.0);
        assert_eq!(reading.len(), 1);
        assert_eq!(reading.get("L"), Some(20.0));
    }

    #[test]
    fn test_reading_names_are_case_sensitive() {
        let reading = Reading::new().with("x", 1.0);
        assert!(reading.contains("x"));
        assert!(!reading.contains("X"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_reading_serde_is_flat_map() {
        let reading = Reading::new().with("T", 40.0);
        let json = serde_json::to_string(&reading).unwrap();
        assert_eq!(json, r#"{"T":40.0}"#);
    }
}
