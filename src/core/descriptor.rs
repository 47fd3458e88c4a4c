use crate::core::{JSObjectDataPtr, PropertyKey, PropertySlot, Value, get_own_property};

/// A Rust representation of a property descriptor used by the engine.
/// Supports both data descriptors (`value` + `writable`) and accessor
/// descriptors (`get`). Fields are optional so partial descriptors can be
/// represented.
#[derive(Clone, Debug, Default)]
pub struct PropertyDescriptor {
    // Data fields
    pub value: Option<Value>,
    pub writable: Option<bool>,
    // Accessor fields
    pub get: Option<Value>,
    // Common flags
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
}

impl PropertyDescriptor {
    /// Construct a full data descriptor from explicit values
    pub fn new_data(value: &Value, writable: bool, enumerable: bool, configurable: bool) -> Self {
        PropertyDescriptor {
            value: Some(value.clone()),
            writable: Some(writable),
            get: None,
            enumerable: Some(enumerable),
            configurable: Some(configurable),
        }
    }

    /// Construct an accessor descriptor
    pub fn new_accessor(get: Option<Value>, enumerable: bool, configurable: bool) -> Self {
        PropertyDescriptor {
            value: None,
            writable: None,
            get: Some(get.unwrap_or(Value::Undefined)),
            enumerable: Some(enumerable),
            configurable: Some(configurable),
        }
    }

    pub fn is_accessor(&self) -> bool {
        self.get.is_some()
    }

    pub fn is_enumerable(&self) -> bool {
        self.enumerable.unwrap_or(false)
    }
}

/// Build a `PropertyDescriptor` for an own property on `obj` if present.
pub fn get_own_property_descriptor(obj: &JSObjectDataPtr, key: &PropertyKey) -> Option<PropertyDescriptor> {
    let slot = get_own_property(obj, key)?;
    let data = obj.borrow();
    let enumerable = data.is_enumerable(key);
    let desc = match slot {
        PropertySlot::Data(v) => {
            let is_length = data.array().is_some() && matches!(key, PropertyKey::String(s) if s == "length");
            PropertyDescriptor::new_data(&v, true, enumerable, !is_length)
        }
        PropertySlot::Accessor { getter } => PropertyDescriptor::new_accessor(getter, enumerable, true),
    };
    Some(desc)
}
