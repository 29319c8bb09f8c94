//! Core type system for entity mapping
//!
//! This module defines the mapped value type and the type descriptors parsed
//! from entity field annotations.

use bson::Bson;
use std::fmt;

use crate::record::Record;

// ============================================================================
// Value Enum - Mapped values
// ============================================================================

/// Value produced by the mapper for a single field
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value (absent field, `null` kind or swallowed coercion failure)
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (i64)
    Int(i64),
    /// Float value (f64)
    Float(f64),
    /// String value
    String(String),
    /// Ordered sequence
    Array(Vec<Value>),
    /// Keyed mapping, in document order
    Object(Vec<(String, Value)>),
    /// Nested entity instance
    Entity(Record),
    /// Driver-native leaf kept as-is (ObjectId, DateTime, Decimal128, ...)
    Raw(Bson),
}

impl Value {
    /// Get human-readable type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Entity(_) => "entity",
            Self::Raw(_) => "bson",
        }
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Look up a key of an `Object` value
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Object(pairs) => pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&Record> {
        match self {
            Self::Entity(record) => Some(record),
            _ => None,
        }
    }
}

// ============================================================================
// TypeDescriptor - Parsed field annotations
// ============================================================================

/// Built-in scalar kinds with weak coercion rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Boolean,
    Integer,
    Float,
    String,
    Array,
    Null,
}

impl ScalarKind {
    /// Resolve a scalar keyword, including its short aliases
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "boolean" | "bool" => Some(Self::Boolean),
            "integer" | "int" => Some(Self::Integer),
            "float" | "double" => Some(Self::Float),
            "string" => Some(Self::String),
            "array" => Some(Self::Array),
            "null" => Some(Self::Null),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Array => "array",
            Self::Null => "null",
        }
    }
}

/// What a field annotation names
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Built-in scalar kind
    Scalar(ScalarKind),
    /// Plain structural object
    Object,
    /// Another entity, resolved by name through the registry
    Entity(String),
}

/// Type descriptor parsed from a field annotation (`type` or `type[]`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    pub kind: TypeKind,
    pub is_array: bool,
}

impl TypeDescriptor {
    /// Build a descriptor from a bare type name
    pub fn from_type_name(type_name: &str, is_array: bool) -> Self {
        let kind = if let Some(scalar) = ScalarKind::from_keyword(type_name) {
            TypeKind::Scalar(scalar)
        } else if type_name == "object" {
            TypeKind::Object
        } else {
            TypeKind::Entity(type_name.to_string())
        };
        Self { kind, is_array }
    }

    pub fn scalar(kind: ScalarKind) -> Self {
        Self {
            kind: TypeKind::Scalar(kind),
            is_array: false,
        }
    }

    /// Get the type name as it appears in annotations (without `[]`)
    pub fn type_name(&self) -> &str {
        match &self.kind {
            TypeKind::Scalar(scalar) => scalar.type_name(),
            TypeKind::Object => "object",
            TypeKind::Entity(name) => name,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_array {
            write!(f, "{}[]", self.type_name())
        } else {
            write!(f, "{}", self.type_name())
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::Number(i.into()),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Object(pairs) => serde_json::Value::Object(
                pairs.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
            Value::Entity(record) => record.to_json(),
            Value::Raw(bson) => bson.into_relaxed_extjson(),
        }
    }
}
