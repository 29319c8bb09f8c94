//! Mapped records and typed extraction
//!
//! A [`Record`] is what the mapper builds for one entity: its declared
//! fields in declaration order plus, in non-strict mode, the undeclared
//! document fields passed through untyped. Typed entities are built from a
//! record through [`FromValue`] and the `take*` helpers.

use docbind_common::{DocbindError, Result};

use crate::entity::Entity;
use crate::types::Value;

/// Mapped entity instance
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    entity: String,
    fields: Vec<(String, Value)>,
    extras: Vec<(String, Value)>,
}

impl Record {
    /// Create a record with no fields set
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            fields: Vec::new(),
            extras: Vec::new(),
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// True when no field has been set (mapping was skipped)
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.extras.is_empty()
    }

    /// Set a declared field, replacing any previous value
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Add an undeclared pass-through field
    pub fn set_extra(&mut self, name: impl Into<String>, value: Value) {
        self.extras.push((name.into(), value));
    }

    /// Get a declared field; `None` if it was never set
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn extra(&self, name: &str) -> Option<&Value> {
        self.extras.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    pub fn extras(&self) -> &[(String, Value)] {
        &self.extras
    }

    /// Remove a declared field and return its value (`Null` if unset)
    pub fn remove(&mut self, name: &str) -> Value {
        match self.fields.iter().position(|(k, _)| k == name) {
            Some(index) => self.fields.remove(index).1,
            None => Value::Null,
        }
    }

    /// Take the undeclared fields out of the record
    pub fn take_extras(&mut self) -> Vec<(String, Value)> {
        std::mem::take(&mut self.extras)
    }

    /// Take a declared field as a typed value
    pub fn take<T: FromValue>(&mut self, name: &str) -> Result<T> {
        let value = self.remove(name);
        T::from_value(value).map_err(|e| self.field_error(name, e))
    }

    /// Take a declared field holding one nested entity
    pub fn take_entity<E: Entity>(&mut self, name: &str) -> Result<Option<E>> {
        match self.remove(name) {
            Value::Null => Ok(None),
            Value::Entity(record) => E::from_record(record).map(Some),
            other => Err(self.field_error(
                name,
                DocbindError::Mapping(format!("expected entity, got {}", other.type_name())),
            )),
        }
    }

    /// Take a declared `Type[]` field, keeping keyed input keyed
    pub fn take_many<E: Entity>(&mut self, name: &str) -> Result<Option<Many<E>>> {
        match self.remove(name) {
            Value::Null => Ok(None),
            Value::Array(items) => items
                .into_iter()
                .map(entity_from_value::<E>)
                .collect::<Result<Vec<_>>>()
                .map(|items| Some(Many::Ordered(items))),
            Value::Object(pairs) => pairs
                .into_iter()
                .map(|(key, value)| entity_from_value::<E>(value).map(|e| (key, e)))
                .collect::<Result<Vec<_>>>()
                .map(|pairs| Some(Many::Keyed(pairs))),
            other => Err(self.field_error(
                name,
                DocbindError::Mapping(format!(
                    "expected entity collection, got {}",
                    other.type_name()
                )),
            )),
        }
    }

    fn field_error(&self, name: &str, err: DocbindError) -> DocbindError {
        let reason = match err {
            DocbindError::Mapping(reason) => reason,
            other => other.to_string(),
        };
        DocbindError::Mapping(format!("{}.{}: {}", self.entity, name, reason))
    }

    /// Render declared fields followed by extras as a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .chain(self.extras.iter())
                .map(|(k, v)| (k.clone(), v.clone().into()))
                .collect(),
        )
    }
}

fn entity_from_value<E: Entity>(value: Value) -> Result<E> {
    match value {
        Value::Entity(record) => E::from_record(record),
        other => Err(DocbindError::Mapping(format!(
            "expected entity element, got {}",
            other.type_name()
        ))),
    }
}

/// Entities mapped from a `Type[]` field
#[derive(Debug, Clone, PartialEq)]
pub enum Many<E> {
    /// Built from a sequence, in order
    Ordered(Vec<E>),
    /// Built from a keyed document; keys are the original ones
    Keyed(Vec<(String, E)>),
}

impl<E> Many<E> {
    pub fn len(&self) -> usize {
        match self {
            Many::Ordered(items) => items.len(),
            Many::Keyed(pairs) => pairs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = &E> + '_> {
        match self {
            Many::Ordered(items) => Box::new(items.iter()),
            Many::Keyed(pairs) => Box::new(pairs.iter().map(|(_, e)| e)),
        }
    }

    /// Look up an element of a keyed collection
    pub fn get(&self, key: &str) -> Option<&E> {
        match self {
            Many::Ordered(_) => None,
            Many::Keyed(pairs) => pairs.iter().find(|(k, _)| k == key).map(|(_, e)| e),
        }
    }

    /// Drop keys and return the elements in order
    pub fn into_vec(self) -> Vec<E> {
        match self {
            Many::Ordered(items) => items,
            Many::Keyed(pairs) => pairs.into_iter().map(|(_, e)| e).collect(),
        }
    }
}

// ============================================================================
// FromValue
// ============================================================================

/// Conversion from an already-coerced mapped value
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch<T>(expected: &str, value: &Value) -> Result<T> {
    Err(DocbindError::Mapping(format!(
        "expected {}, got {}",
        expected,
        value.type_name()
    )))
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            other => mismatch("boolean", &other),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int(i) => Ok(i),
            other => mismatch("integer", &other),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int(i) => i32::try_from(i)
                .map_err(|_| DocbindError::Mapping(format!("integer {} out of range for i32", i))),
            other => mismatch("integer", &other),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            other => mismatch("float", &other),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => mismatch("string", &other),
        }
    }
}

impl FromValue for Record {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Entity(record) => Ok(record),
            other => mismatch("entity", &other),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => items.into_iter().map(T::from_value).collect(),
            Value::Object(pairs) => pairs.into_iter().map(|(_, v)| T::from_value(v)).collect(),
            other => mismatch("array", &other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_in_place() {
        let mut record = Record::new("User");
        record.set("a", Value::Int(1));
        record.set("b", Value::Int(2));
        record.set("a", Value::Int(3));
        assert_eq!(
            record.fields(),
            &[
                ("a".to_string(), Value::Int(3)),
                ("b".to_string(), Value::Int(2))
            ]
        );
    }

    #[test]
    fn test_take_typed() {
        let mut record = Record::new("User");
        record.set("name", Value::String("ann".into()));
        record.set("age", Value::Int(7));
        record.set("nick", Value::Null);

        let name: String = record.take("name").unwrap();
        let age: i32 = record.take("age").unwrap();
        let nick: Option<String> = record.take("nick").unwrap();
        let missing: Option<i64> = record.take("missing").unwrap();

        assert_eq!(name, "ann");
        assert_eq!(age, 7);
        assert_eq!(nick, None);
        assert_eq!(missing, None);
    }

    #[test]
    fn test_take_mismatch_names_field() {
        let mut record = Record::new("User");
        record.set("age", Value::String("x".into()));

        let err = record.take::<i64>("age").unwrap_err();
        assert_eq!(err.to_string(), "Mapping error: User.age: expected integer, got string");
    }

    #[test]
    fn test_take_null_into_required_fails() {
        let mut record = Record::new("User");
        record.set("age", Value::Null);
        assert!(record.take::<i64>("age").is_err());
    }

    #[test]
    fn test_vec_from_keyed_object() {
        let value = Value::Object(vec![
            ("x".to_string(), Value::Int(1)),
            ("y".to_string(), Value::Int(2)),
        ]);
        assert_eq!(Vec::<i64>::from_value(value).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_to_json_includes_extras() {
        let mut record = Record::new("User");
        record.set("name", Value::String("ann".into()));
        record.set_extra("legacy", Value::Bool(true));
        assert_eq!(record.to_json(), serde_json::json!({"name": "ann", "legacy": true}));
    }

    #[test]
    fn test_many_accessors() {
        let keyed = Many::Keyed(vec![("home".to_string(), 1), ("work".to_string(), 2)]);
        assert_eq!(keyed.len(), 2);
        assert_eq!(keyed.get("work"), Some(&2));
        assert_eq!(keyed.iter().copied().collect::<Vec<_>>(), vec![1, 2]);

        let ordered = Many::Ordered(vec![3]);
        assert_eq!(ordered.get("0"), None);
        assert_eq!(ordered.into_vec(), vec![3]);
    }
}
