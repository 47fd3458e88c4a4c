//! Protocol through which values owned by another runtime are read.
//!
//! A host object only has to answer the messages it understands; every
//! default method reports `UnsupportedMessage`, so a host that exposes no
//! array elements is never asked to read by index.

use crate::JSError;
use crate::core::Value;
use std::rc::Rc;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum InteropError {
    #[error("unsupported message '{message}'")]
    UnsupportedMessage { message: &'static str },

    #[error("invalid array index {index}")]
    InvalidArrayIndex { index: u64 },

    #[error("unknown identifier '{name}'")]
    UnknownIdentifier { name: String },
}

fn unsupported<T>(message: &'static str) -> Result<T, InteropError> {
    Err(InteropError::UnsupportedMessage { message })
}

/// Raw value as produced by the host, before import.
#[derive(Clone)]
pub enum ForeignValue {
    Null,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    String(String),
    Object(Rc<dyn ForeignObject>),
}

impl std::fmt::Debug for ForeignValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForeignValue::Null => write!(f, "Null"),
            ForeignValue::Boolean(b) => write!(f, "Boolean({b})"),
            ForeignValue::Byte(n) => write!(f, "Byte({n})"),
            ForeignValue::Short(n) => write!(f, "Short({n})"),
            ForeignValue::Int(n) => write!(f, "Int({n})"),
            ForeignValue::Long(n) => write!(f, "Long({n})"),
            ForeignValue::Float(n) => write!(f, "Float({n})"),
            ForeignValue::Double(n) => write!(f, "Double({n})"),
            ForeignValue::Char(c) => write!(f, "Char({c:?})"),
            ForeignValue::String(s) => write!(f, "String({s:?})"),
            ForeignValue::Object(_) => write!(f, "Object(..)"),
        }
    }
}

pub trait ForeignObject {
    fn is_null(&self) -> bool {
        false
    }

    /// Member names, returned as a host array whose elements are strings
    /// (or string-like host objects).
    fn get_members(&self) -> Result<ForeignValue, InteropError> {
        unsupported("getMembers")
    }

    fn read_member(&self, name: &str) -> Result<ForeignValue, InteropError> {
        let _ = name;
        unsupported("readMember")
    }

    fn has_array_elements(&self) -> bool {
        false
    }

    fn get_array_size(&self) -> Result<u64, InteropError> {
        unsupported("getArraySize")
    }

    fn is_array_element_readable(&self, index: u64) -> bool {
        let _ = index;
        false
    }

    fn read_array_element(&self, index: u64) -> Result<ForeignValue, InteropError> {
        let _ = index;
        unsupported("readArrayElement")
    }

    fn is_string(&self) -> bool {
        false
    }

    fn as_string(&self) -> Result<String, InteropError> {
        unsupported("asString")
    }
}

/// Converts a host value into an engine value. Narrow integers widen to
/// 32-bit numbers, characters become one-character strings and host objects
/// stay foreign.
pub fn import_foreign_value(value: ForeignValue) -> Value {
    match value {
        ForeignValue::Null => Value::Null,
        ForeignValue::Boolean(b) => Value::Boolean(b),
        ForeignValue::Byte(n) => Value::Number(f64::from(i32::from(n))),
        ForeignValue::Short(n) => Value::Number(f64::from(i32::from(n))),
        ForeignValue::Int(n) => Value::Number(f64::from(n)),
        ForeignValue::Long(n) => Value::Number(n as f64),
        ForeignValue::Float(n) => Value::Number(f64::from(n)),
        ForeignValue::Double(n) => Value::Number(n),
        ForeignValue::Char(c) => Value::String(c.to_string()),
        ForeignValue::String(s) => Value::String(s),
        ForeignValue::Object(obj) => {
            if obj.is_null() {
                Value::Null
            } else {
                Value::Foreign(obj)
            }
        }
    }
}

/// String coercion applied to member keys.
pub fn foreign_as_string(key: &ForeignValue) -> Result<String, InteropError> {
    match key {
        ForeignValue::String(s) => Ok(s.clone()),
        ForeignValue::Char(c) => Ok(c.to_string()),
        ForeignValue::Object(obj) if obj.is_string() => obj.as_string(),
        _ => unsupported("asString"),
    }
}

pub fn foreign_has_element(obj: &dyn ForeignObject, index: u64) -> bool {
    obj.has_array_elements() && obj.is_array_element_readable(index)
}

/// Reads and imports the element at `index`; an element that is not
/// readable reads as `undefined`.
pub fn foreign_read(obj: &dyn ForeignObject, index: u64) -> Result<Value, JSError> {
    if !obj.is_array_element_readable(index) {
        return Ok(Value::Undefined);
    }
    let raw = obj
        .read_array_element(index)
        .map_err(|e| JSError::interop("ForEachIndex", e))?;
    Ok(import_foreign_value(raw))
}

/// Host adapter exposing a JSON document through the interop protocol:
/// JSON objects answer member messages, JSON arrays answer array messages.
#[derive(Debug, Clone)]
pub struct JsonForeignObject {
    value: serde_json::Value,
}

impl JsonForeignObject {
    pub fn new(value: serde_json::Value) -> Self {
        JsonForeignObject { value }
    }

    pub fn into_value(value: serde_json::Value) -> Value {
        Value::Foreign(Rc::new(JsonForeignObject::new(value)))
    }

    fn to_foreign(value: &serde_json::Value) -> ForeignValue {
        match value {
            serde_json::Value::Null => ForeignValue::Null,
            serde_json::Value::Bool(b) => ForeignValue::Boolean(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    match i32::try_from(i) {
                        Ok(small) => ForeignValue::Int(small),
                        Err(_) => ForeignValue::Long(i),
                    }
                } else {
                    ForeignValue::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => ForeignValue::String(s.clone()),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => ForeignValue::Object(Rc::new(JsonForeignObject::new(value.clone()))),
        }
    }
}

impl ForeignObject for JsonForeignObject {
    fn is_null(&self) -> bool {
        self.value.is_null()
    }

    fn get_members(&self) -> Result<ForeignValue, InteropError> {
        match &self.value {
            serde_json::Value::Object(map) => {
                let keys = map.keys().map(|k| serde_json::Value::String(k.clone())).collect();
                Ok(ForeignValue::Object(Rc::new(JsonForeignObject::new(serde_json::Value::Array(keys)))))
            }
            _ => unsupported("getMembers"),
        }
    }

    fn read_member(&self, name: &str) -> Result<ForeignValue, InteropError> {
        match &self.value {
            serde_json::Value::Object(map) => map
                .get(name)
                .map(Self::to_foreign)
                .ok_or_else(|| InteropError::UnknownIdentifier { name: name.to_string() }),
            _ => unsupported("readMember"),
        }
    }

    fn has_array_elements(&self) -> bool {
        self.value.is_array()
    }

    fn get_array_size(&self) -> Result<u64, InteropError> {
        match &self.value {
            serde_json::Value::Array(items) => Ok(items.len() as u64),
            _ => unsupported("getArraySize"),
        }
    }

    fn is_array_element_readable(&self, index: u64) -> bool {
        match &self.value {
            serde_json::Value::Array(items) => usize::try_from(index).is_ok_and(|i| i < items.len()),
            _ => false,
        }
    }

    fn read_array_element(&self, index: u64) -> Result<ForeignValue, InteropError> {
        match &self.value {
            serde_json::Value::Array(items) => usize::try_from(index)
                .ok()
                .and_then(|i| items.get(i))
                .map(Self::to_foreign)
                .ok_or(InteropError::InvalidArrayIndex { index }),
            _ => unsupported("readArrayElement"),
        }
    }

    fn is_string(&self) -> bool {
        self.value.is_string()
    }

    fn as_string(&self) -> Result<String, InteropError> {
        match &self.value {
            serde_json::Value::String(s) => Ok(s.clone()),
            _ => unsupported("asString"),
        }
    }
}
