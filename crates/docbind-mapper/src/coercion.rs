//! Weak coercion of BSON values into declared scalar kinds
//!
//! Coercion never aborts mapping: a conversion that cannot be performed
//! yields [`Coercion::Failed`], which callers turn into `Value::Null`.
//!
//! Rules per target kind:
//!
//! | target    | null  | bool    | numbers          | string              | document / array | other driver values        |
//! |-----------|-------|---------|------------------|---------------------|------------------|----------------------------|
//! | `boolean` | false | as-is   | `!= 0`           | false for `""`/`"0"` | true             | true                       |
//! | `integer` | 0     | 0 / 1   | truncate, saturate | leading numeric prefix | failed      | DateTime: ms; Decimal128: text |
//! | `float`   | 0.0   | 0.0/1.0 | as f64           | leading numeric prefix | failed        | DateTime: ms; Decimal128: text |
//! | `string`  | `""`  | `"1"`/`""` | decimal / shortest float | as-is     | failed           | ObjectId hex, RFC 3339, Decimal128 text |
//! | `array`   | `[]`  | `[v]`   | `[v]`            | `[v]`               | flattened        | `[v]`                      |
//! | `null`    | null  | null    | null             | null                | null             | null                       |
//!
//! Floats render to strings in their shortest round-trip decimal form with no
//! exponent (`1e20` -> `"100000000000000000000"`, NaN -> `"NaN"`).

use bson::{Bson, Document as BsonDocument};

use crate::types::{ScalarKind, Value};

/// Outcome of coercing one value
#[derive(Debug, Clone, PartialEq)]
pub enum Coercion {
    /// Converted value
    Value(Value),
    /// Explicit null (the `null` kind)
    Null,
    /// Conversion impossible; carries the reason for logging
    Failed(String),
}

impl Coercion {
    /// Collapse to the value the mapper assigns
    pub fn into_value(self) -> Value {
        match self {
            Coercion::Value(value) => value,
            Coercion::Null | Coercion::Failed(_) => Value::Null,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Coercion::Failed(_))
    }
}

/// Coerce a BSON value into a built-in scalar kind
pub fn coerce_scalar(value: &Bson, kind: ScalarKind) -> Coercion {
    match kind {
        ScalarKind::Boolean => Coercion::Value(Value::Bool(to_bool(value))),
        ScalarKind::Integer => match to_int(value) {
            Some(i) => Coercion::Value(Value::Int(i)),
            None => failed(value, kind),
        },
        ScalarKind::Float => match to_float(value) {
            Some(f) => Coercion::Value(Value::Float(f)),
            None => failed(value, kind),
        },
        ScalarKind::String => match to_string(value) {
            Some(s) => Coercion::Value(Value::String(s)),
            None => failed(value, kind),
        },
        ScalarKind::Array => Coercion::Value(to_array(value)),
        ScalarKind::Null => Coercion::Null,
    }
}

fn failed(value: &Bson, kind: ScalarKind) -> Coercion {
    Coercion::Failed(format!(
        "cannot convert {} to {}",
        bson_type_name(value),
        kind.type_name()
    ))
}

fn to_bool(value: &Bson) -> bool {
    match value {
        Bson::Null | Bson::Undefined => false,
        Bson::Boolean(b) => *b,
        Bson::Int32(i) => *i != 0,
        Bson::Int64(i) => *i != 0,
        Bson::Double(f) => *f != 0.0,
        Bson::String(s) => !(s.is_empty() || s == "0"),
        _ => true,
    }
}

fn to_int(value: &Bson) -> Option<i64> {
    match value {
        Bson::Null | Bson::Undefined => Some(0),
        Bson::Boolean(b) => Some(i64::from(*b)),
        Bson::Int32(i) => Some(i64::from(*i)),
        Bson::Int64(i) => Some(*i),
        Bson::Double(f) => Some(float_to_int(*f)),
        Bson::String(s) => Some(parse_int_prefix(s)),
        Bson::DateTime(dt) => Some(dt.timestamp_millis()),
        Bson::Decimal128(d) => Some(parse_int_prefix(&d.to_string())),
        _ => None,
    }
}

fn to_float(value: &Bson) -> Option<f64> {
    match value {
        Bson::Null | Bson::Undefined => Some(0.0),
        Bson::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        Bson::String(s) => Some(parse_float_prefix(s)),
        Bson::DateTime(dt) => Some(dt.timestamp_millis() as f64),
        Bson::Decimal128(d) => Some(parse_float_prefix(&d.to_string())),
        _ => None,
    }
}

fn to_string(value: &Bson) -> Option<String> {
    match value {
        Bson::Null | Bson::Undefined => Some(String::new()),
        Bson::Boolean(true) => Some("1".to_string()),
        Bson::Boolean(false) => Some(String::new()),
        Bson::Int32(i) => Some(i.to_string()),
        Bson::Int64(i) => Some(i.to_string()),
        Bson::Double(f) => Some(f.to_string()),
        Bson::String(s) => Some(s.clone()),
        Bson::Symbol(s) => Some(s.clone()),
        Bson::ObjectId(oid) => Some(oid.to_hex()),
        Bson::DateTime(dt) => Some(
            dt.to_chrono()
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        ),
        Bson::Decimal128(d) => Some(d.to_string()),
        _ => None,
    }
}

fn to_array(value: &Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Array(Vec::new()),
        Bson::Array(_) | Bson::Document(_) => to_plain(value),
        other => Value::Array(vec![to_plain(other)]),
    }
}

/// Truncate toward zero; out-of-range values saturate and NaN becomes 0
fn float_to_int(f: f64) -> i64 {
    f as i64
}

/// Longest numeric prefix after leading whitespace (`"  12.5kg"` -> `"12.5"`)
fn numeric_prefix(s: &str) -> &str {
    let s = s.trim_start_matches(|c: char| matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c'));
    let bytes = s.as_bytes();
    let len = bytes.len();
    let mut end = 0;

    if end < len && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }

    let int_start = end;
    while end < len && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < len && bytes[end] == b'.' {
        let mut frac_end = end + 1;
        while frac_end < len && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        let frac_digits = frac_end - end - 1;
        if digits + frac_digits > 0 {
            digits += frac_digits;
            end = frac_end;
        }
    }

    if digits == 0 {
        return "";
    }

    if end < len && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < len && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < len && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    &s[..end]
}

fn parse_int_prefix(s: &str) -> i64 {
    let prefix = numeric_prefix(s);
    if prefix.is_empty() {
        return 0;
    }
    if prefix.bytes().any(|b| matches!(b, b'.' | b'e' | b'E')) {
        return float_to_int(prefix.parse::<f64>().unwrap_or(0.0));
    }
    match prefix.parse::<i64>() {
        Ok(i) => i,
        // Only overflow can fail here
        Err(_) if prefix.starts_with('-') => i64::MIN,
        Err(_) => i64::MAX,
    }
}

fn parse_float_prefix(s: &str) -> f64 {
    let prefix = numeric_prefix(s);
    if prefix.is_empty() {
        return 0.0;
    }
    prefix.parse::<f64>().unwrap_or(0.0)
}

/// Recursively flatten a BSON value into plain mapped values
///
/// Documents become insertion-ordered objects, arrays become sequences and
/// driver-native leaves are kept as [`Value::Raw`].
pub fn to_plain(value: &Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Int32(i) => Value::Int(i64::from(*i)),
        Bson::Int64(i) => Value::Int(*i),
        Bson::Double(f) => Value::Float(*f),
        Bson::String(s) => Value::String(s.clone()),
        Bson::Array(items) => Value::Array(items.iter().map(to_plain).collect()),
        Bson::Document(doc) => document_to_plain(doc),
        other => Value::Raw(other.clone()),
    }
}

pub fn document_to_plain(doc: &BsonDocument) -> Value {
    Value::Object(
        doc.iter()
            .map(|(key, value)| (key.clone(), to_plain(value)))
            .collect(),
    )
}

/// Cast a value to the `object` kind
///
/// Containers are flattened, `null` becomes an empty object and any other
/// scalar is wrapped as `{ "scalar": value }`.
pub fn cast_object(value: &Bson) -> Value {
    match value {
        Bson::Array(_) | Bson::Document(_) => to_plain(value),
        Bson::Null | Bson::Undefined => Value::Object(Vec::new()),
        other => Value::Object(vec![(SCALAR_KEY.to_string(), to_plain(other))]),
    }
}

/// Key under which a scalar is stored when it is viewed as an object
pub const SCALAR_KEY: &str = "scalar";

/// Get the BSON type name for log and error messages
pub fn bson_type_name(value: &Bson) -> &'static str {
    match value {
        Bson::Double(_) => "double",
        Bson::String(_) => "string",
        Bson::Array(_) => "array",
        Bson::Document(_) => "object",
        Bson::Boolean(_) => "bool",
        Bson::Null => "null",
        Bson::Int32(_) => "int32",
        Bson::Int64(_) => "int64",
        Bson::Timestamp(_) => "timestamp",
        Bson::Binary(_) => "binary",
        Bson::ObjectId(_) => "objectid",
        Bson::DateTime(_) => "datetime",
        Bson::Symbol(_) => "symbol",
        Bson::Decimal128(_) => "decimal128",
        Bson::RegularExpression(_) => "regex",
        _ => "unknown",
    }
}
