//! Attribute extraction for streaming aggregates.
//!
//! A [`StreamDB`](crate::StreamDB) never inspects the values it stores.
//! It asks an [`AttributeStrategy`] for a named attribute and gets back an
//! [`AttributeValue`], or nothing when the value does not carry that
//! attribute.
//!
//! Three strategies ship with the crate:
//!
//! - [`AttributeTable`]: a closed table of `name -> extractor` functions for
//!   your own types.
//! - [`MapAttributes`]: values that are `HashMap<String, AttributeValue>`.
//! - [`JsonAttributes`]: `serde_json::Value` objects.
//!
//! # Examples
//!
//! ```
//! use geoprox::{AttributeStrategy, AttributeTable, AttributeValue};
//!
//! struct Building {
//!     name: String,
//!     square_feet: f64,
//! }
//!
//! let strategy = AttributeTable::new()
//!     .with("name", |b: &Building| Some(b.name.clone().into()))
//!     .with("square_feet", |b: &Building| Some(b.square_feet.into()));
//!
//! let hall = Building { name: "Kirkland Hall".into(), square_feet: 150_000.0 };
//! assert_eq!(
//!     strategy.extract(&hall, "square_feet"),
//!     Some(AttributeValue::Number(150_000.0))
//! );
//! assert_eq!(strategy.extract(&hall, "floors"), None);
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A scalar extracted from a stored value.
///
/// Equality and hashing are exact. Numbers compare by bit pattern (with
/// `-0.0` equal to `0.0`), so they can be used as histogram buckets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Integer(i64),
    Number(f64),
    Bool(bool),
    Text(String),
}

impl AttributeValue {
    /// Numeric view used by average, max, min and sum.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Integer(i) => Some(*i as f64),
            Self::Bool(_) | Self::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => (a + 0.0).to_bits() == (b + 0.0).to_bits(),
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for AttributeValue {}

impl Hash for AttributeValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Number(n) => (n + 0.0).to_bits().hash(state),
            Self::Integer(i) => i.hash(state),
            Self::Bool(b) => b.hash(state),
            Self::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<f32> for AttributeValue {
    fn from(value: f32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// Translates a stored value into named scalar attributes.
pub trait AttributeStrategy<T>: Send + Sync {
    /// The value of `attribute` on `value`, or `None` if it has no such
    /// attribute.
    fn extract(&self, value: &T, attribute: &str) -> Option<AttributeValue>;
}

type Extractor<T> = Box<dyn Fn(&T) -> Option<AttributeValue> + Send + Sync>;

/// A closed set of named extractors for one value type.
pub struct AttributeTable<T> {
    names: Vec<String>,
    extractors: FxHashMap<String, Extractor<T>>,
}

impl<T> AttributeTable<T> {
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            extractors: FxHashMap::default(),
        }
    }

    /// Register `extractor` under `name`, replacing any previous one.
    pub fn with<F>(mut self, name: impl Into<String>, extractor: F) -> Self
    where
        F: Fn(&T) -> Option<AttributeValue> + Send + Sync + 'static,
    {
        let name = name.into();
        if self
            .extractors
            .insert(name.clone(), Box::new(extractor))
            .is_none()
        {
            self.names.push(name);
        }
        self
    }

    /// Attribute names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.extractors.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<T> Default for AttributeTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for AttributeTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeTable")
            .field("names", &self.names)
            .finish()
    }
}

impl<T> AttributeStrategy<T> for AttributeTable<T> {
    fn extract(&self, value: &T, attribute: &str) -> Option<AttributeValue> {
        self.extractors
            .get(attribute)
            .and_then(|extractor| extractor(value))
    }
}

/// Strategy for values that are string-keyed attribute maps.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapAttributes;

impl AttributeStrategy<HashMap<String, AttributeValue>> for MapAttributes {
    fn extract(
        &self,
        value: &HashMap<String, AttributeValue>,
        attribute: &str,
    ) -> Option<AttributeValue> {
        value.get(attribute).cloned()
    }
}

impl AttributeStrategy<FxHashMap<String, AttributeValue>> for MapAttributes {
    fn extract(
        &self,
        value: &FxHashMap<String, AttributeValue>,
        attribute: &str,
    ) -> Option<AttributeValue> {
        value.get(attribute).cloned()
    }
}

/// Strategy for JSON objects: attributes are top-level fields.
///
/// Numbers, strings and booleans are attributes; `null`, arrays and nested
/// objects are not.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonAttributes;

impl AttributeStrategy<serde_json::Value> for JsonAttributes {
    fn extract(&self, value: &serde_json::Value, attribute: &str) -> Option<AttributeValue> {
        match value.get(attribute)? {
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(AttributeValue::Integer(i)),
                None => n.as_f64().map(AttributeValue::Number),
            },
            serde_json::Value::String(s) => Some(AttributeValue::Text(s.clone())),
            serde_json::Value::Bool(b) => Some(AttributeValue::Bool(*b)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;
    use serde_json::json;

    struct Building {
        name: &'static str,
        square_feet: f64,
        classrooms: Option<u32>,
    }

    fn building_strategy() -> AttributeTable<Building> {
        AttributeTable::new()
            .with("name", |b: &Building| Some(b.name.into()))
            .with("square_feet", |b: &Building| Some(b.square_feet.into()))
            .with("classrooms", |b: &Building| b.classrooms.map(Into::into))
    }

    #[test]
    fn test_table_lookup_by_name() {
        let strategy = building_strategy();
        let fgh = Building {
            name: "Featheringill Hall",
            square_feet: 95023.4,
            classrooms: Some(38),
        };

        assert_eq!(
            strategy.extract(&fgh, "name"),
            Some(AttributeValue::Text("Featheringill Hall".into()))
        );
        assert_eq!(
            strategy.extract(&fgh, "classrooms"),
            Some(AttributeValue::Integer(38))
        );
        assert_eq!(strategy.extract(&fgh, "height"), None);
    }

    #[test]
    fn test_table_missing_attribute_on_value() {
        let strategy = building_strategy();
        let garage = Building {
            name: "Garage",
            square_feet: 1000.0,
            classrooms: None,
        };
        assert_eq!(strategy.extract(&garage, "classrooms"), None);
    }

    #[test]
    fn test_table_names_keep_registration_order() {
        let strategy = building_strategy().with("name", |b: &Building| Some(b.name.into()));
        assert_eq!(
            strategy.names().collect::<Vec<_>>(),
            vec!["name", "square_feet", "classrooms"]
        );
        assert_eq!(strategy.len(), 3);
        assert!(strategy.contains("square_feet"));
        assert!(!strategy.contains("height"));
    }

    #[test]
    fn test_map_attributes() {
        let mut map = HashMap::new();
        map.insert("rooms".to_string(), AttributeValue::Integer(4));
        assert_eq!(
            MapAttributes.extract(&map, "rooms"),
            Some(AttributeValue::Integer(4))
        );
        assert_eq!(MapAttributes.extract(&map, "floors"), None);
    }

    #[test]
    fn test_json_attributes() {
        let value = json!({
            "name": "ESB",
            "square_feet": 218793.34,
            "classrooms": 10,
            "open": true,
            "tags": ["engineering"],
            "manager": null,
        });

        assert_eq!(
            JsonAttributes.extract(&value, "name"),
            Some(AttributeValue::Text("ESB".into()))
        );
        assert_eq!(
            JsonAttributes.extract(&value, "square_feet"),
            Some(AttributeValue::Number(218793.34))
        );
        assert_eq!(
            JsonAttributes.extract(&value, "classrooms"),
            Some(AttributeValue::Integer(10))
        );
        assert_eq!(
            JsonAttributes.extract(&value, "open"),
            Some(AttributeValue::Bool(true))
        );
        assert_eq!(JsonAttributes.extract(&value, "tags"), None);
        assert_eq!(JsonAttributes.extract(&value, "manager"), None);
        assert_eq!(JsonAttributes.extract(&json!(42), "name"), None);
    }

    #[test]
    fn test_value_equality_is_exact() {
        assert_eq!(AttributeValue::Number(0.0), AttributeValue::Number(-0.0));
        assert_ne!(AttributeValue::Number(1.0), AttributeValue::Integer(1));
        assert_ne!(AttributeValue::Number(0.1 + 0.2), AttributeValue::Number(0.3));

        let mut buckets = FxHashSet::default();
        buckets.insert(AttributeValue::Number(-0.0));
        assert!(buckets.contains(&AttributeValue::Number(0.0)));
    }

    #[test]
    fn test_numeric_view() {
        assert_eq!(AttributeValue::Integer(3).as_f64(), Some(3.0));
        assert_eq!(AttributeValue::Number(2.5).as_f64(), Some(2.5));
        assert_eq!(AttributeValue::Text("x".into()).as_f64(), None);
        assert_eq!(AttributeValue::Bool(true).as_f64(), None);
        assert_eq!(AttributeValue::Text("x".into()).as_str(), Some("x"));
        assert_eq!(AttributeValue::Number(2.5).to_string(), "2.5");
    }
}
