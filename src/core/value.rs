use crate::core::{ForeignObject, PropertyKey, SymbolData, array_prototype_no_elements, parse_array_index};
use crate::{JSError, raise_type_error};
use num_bigint::BigInt;
use num_traits::Zero;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

pub type NativeFn = dyn Fn(&Value, &[Value]) -> Result<Value, JSError>;

pub struct JSFunction {
    pub name: String,
    func: Box<NativeFn>,
}

impl JSFunction {
    pub fn call(&self, this: &Value, args: &[Value]) -> Result<Value, JSError> {
        (self.func)(this, args)
    }
}

#[derive(Debug)]
pub struct JSArrayBuffer {
    pub data: Vec<u8>,
    pub detached: bool,
}

pub type JSArrayBufferPtr = Rc<RefCell<JSArrayBuffer>>;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TypedArrayKind {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
    BigInt64,
    BigUint64,
}

#[derive(Clone, Debug)]
pub struct JSTypedArray {
    pub kind: TypedArrayKind,
    pub buffer: JSArrayBufferPtr,
    pub byte_offset: usize,
    pub length: usize,
}

/// Element storage of an array-shaped object. `Packed` holds no holes,
/// `Holey` marks holes with `None` and never ends in one, `Sparse` keeps only
/// present indices.
#[derive(Clone, Debug)]
pub enum ArrayStorage {
    Packed(Vec<Value>),
    Holey(Vec<Option<Value>>),
    Sparse(BTreeMap<u64, Value>),
}

#[derive(Clone, Debug)]
pub struct JSArray {
    pub storage: ArrayStorage,
    /// Declared length. For arguments objects this may be lower than the
    /// extent of `storage`.
    pub length: u64,
}

#[derive(Clone, Debug)]
pub enum ObjectKind {
    Ordinary,
    Array(JSArray),
    Arguments(JSArray),
    TypedArray(JSTypedArray),
}

#[derive(Clone)]
pub enum PropertySlot {
    Data(Value),
    Accessor { getter: Option<Value> },
}

pub type JSObjectDataPtr = Rc<RefCell<JSObjectData>>;

#[inline]
pub fn new_js_object_data() -> JSObjectDataPtr {
    Rc::new(RefCell::new(JSObjectData::new()))
}

pub struct JSObjectData {
    pub properties: indexmap::IndexMap<PropertyKey, PropertySlot>,
    pub non_enumerable: HashSet<PropertyKey>,
    pub prototype: Option<JSObjectDataPtr>,
    pub kind: ObjectKind,
    used_as_prototype: bool,
}

impl Default for JSObjectData {
    fn default() -> Self {
        Self::new()
    }
}

impl JSObjectData {
    pub fn new() -> Self {
        Self::with_kind(ObjectKind::Ordinary)
    }

    pub fn with_kind(kind: ObjectKind) -> Self {
        JSObjectData {
            properties: indexmap::IndexMap::new(),
            non_enumerable: HashSet::new(),
            prototype: None,
            kind,
            used_as_prototype: false,
        }
    }

    pub fn set_non_enumerable(&mut self, key: impl Into<PropertyKey>) {
        self.non_enumerable.insert(key.into());
    }

    pub fn is_enumerable(&self, key: &PropertyKey) -> bool {
        if self.is_array_like_storage() && matches!(key, PropertyKey::String(s) if s == "length") {
            return false;
        }
        !self.non_enumerable.contains(key)
    }

    /// Arrays, arguments objects and typed arrays: objects whose indexed
    /// elements live in dedicated storage.
    pub fn is_array_shaped(&self) -> bool {
        !matches!(self.kind, ObjectKind::Ordinary)
    }

    fn is_array_like_storage(&self) -> bool {
        matches!(self.kind, ObjectKind::Array(_) | ObjectKind::Arguments(_))
    }

    pub fn array(&self) -> Option<&JSArray> {
        match &self.kind {
            ObjectKind::Array(arr) | ObjectKind::Arguments(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn typed_array(&self) -> Option<&JSTypedArray> {
        match &self.kind {
            ObjectKind::TypedArray(ta) => Some(ta),
            _ => None,
        }
    }

    fn has_indexed_elements(&self) -> bool {
        let in_storage = match &self.kind {
            ObjectKind::Array(arr) | ObjectKind::Arguments(arr) => arr.has_any_element(),
            ObjectKind::TypedArray(ta) => ta.current_length() > 0,
            ObjectKind::Ordinary => false,
        };
        in_storage || self.properties.keys().any(|k| k.array_index().is_some())
    }
}

#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Symbol(Rc<SymbolData>),
    BigInt(BigInt),
    Object(JSObjectDataPtr),
    Function(Rc<JSFunction>),
    Foreign(Rc<dyn ForeignObject>),
}

impl Value {
    pub fn native_function(name: &str, func: impl Fn(&Value, &[Value]) -> Result<Value, JSError> + 'static) -> Value {
        Value::Function(Rc::new(JSFunction {
            name: name.to_string(),
            func: Box::new(func),
        }))
    }

    pub fn is_null_or_undefined(&self) -> bool {
        matches!(self, Value::Null | Value::Undefined)
    }

    pub fn as_object(&self) -> Option<&JSObjectDataPtr> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn to_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::BigInt(b) => !b.is_zero(),
            Value::Foreign(f) => !f.is_null(),
            Value::Symbol(_) | Value::Object(_) | Value::Function(_) => true,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<JSObjectDataPtr> for Value {
    fn from(obj: JSObjectDataPtr) -> Self {
        Value::Object(obj)
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Symbol(sym) => write!(f, "Symbol({})", sym.description.as_deref().unwrap_or("")),
            Value::BigInt(b) => write!(f, "{b}n"),
            Value::Object(obj) => write!(f, "[object {:p}]", Rc::as_ptr(obj)),
            Value::Function(func) => write!(f, "[Function: {}]", func.name),
            Value::Foreign(_) => write!(f, "[foreign object]"),
        }
    }
}

pub fn type_of(value: &Value) -> &'static str {
    match value {
        Value::Undefined => "undefined",
        Value::Null => "object",
        Value::Boolean(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Symbol(_) => "symbol",
        Value::BigInt(_) => "bigint",
        Value::Object(_) | Value::Foreign(_) => "object",
        Value::Function(_) => "function",
    }
}

/// Strict equality (`===`).
pub fn identical(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Symbol(x), Value::Symbol(y)) => Rc::ptr_eq(x, y),
        (Value::BigInt(x), Value::BigInt(y)) => x == y,
        (Value::Object(x), Value::Object(y)) => Rc::ptr_eq(x, y),
        (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
        (Value::Foreign(x), Value::Foreign(y)) => std::ptr::addr_eq(Rc::as_ptr(x), Rc::as_ptr(y)),
        _ => false,
    }
}

pub fn to_number(value: &Value) -> Result<f64, JSError> {
    match value {
        Value::Undefined => Ok(f64::NAN),
        Value::Null => Ok(0.0),
        Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => Ok(*n),
        Value::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                Ok(0.0)
            } else {
                Ok(t.parse::<f64>().unwrap_or(f64::NAN))
            }
        }
        Value::Symbol(_) => Err(raise_type_error!("Cannot convert a Symbol value to a number")),
        Value::BigInt(_) => Err(raise_type_error!("Cannot convert a BigInt value to a number")),
        Value::Object(_) | Value::Function(_) | Value::Foreign(_) => Ok(f64::NAN),
    }
}

pub fn is_callable(value: &Value) -> bool {
    matches!(value, Value::Function(_))
}

pub fn call_function(func: &Value, this: &Value, args: &[Value]) -> Result<Value, JSError> {
    match func {
        Value::Function(f) => f.call(this, args),
        other => Err(raise_type_error!(format!("{other:?} is not a function"))),
    }
}

/// Own property lookup. Indexed keys of array-shaped objects are answered
/// from element storage.
pub fn get_own_property(obj: &JSObjectDataPtr, key: &PropertyKey) -> Option<PropertySlot> {
    let data = obj.borrow();
    if let Some(index) = key.array_index() {
        match &data.kind {
            ObjectKind::Array(arr) | ObjectKind::Arguments(arr) => {
                if let Some(v) = arr.get(index) {
                    return Some(PropertySlot::Data(v.clone()));
                }
            }
            ObjectKind::TypedArray(ta) => return ta.get_value(index).map(PropertySlot::Data),
            ObjectKind::Ordinary => {}
        }
    }
    if let Some(arr) = data.array()
        && matches!(key, PropertyKey::String(s) if s == "length")
    {
        return Some(PropertySlot::Data(Value::Number(arr.length as f64)));
    }
    data.properties.get(key).cloned()
}

pub fn has_own_property(obj: &JSObjectDataPtr, key: &PropertyKey) -> bool {
    get_own_property(obj, key).is_some()
}

/// `HasProperty`: own lookup followed by the prototype chain. Indexed keys
/// of typed arrays never consult the prototype.
pub fn has_property(obj: &JSObjectDataPtr, key: &PropertyKey) -> bool {
    let mut current = obj.clone();
    loop {
        if has_own_property(&current, key) {
            return true;
        }
        let next = {
            let data = current.borrow();
            if data.typed_array().is_some() && key.array_index().is_some() {
                return false;
            }
            data.prototype.clone()
        };
        match next {
            Some(p) => current = p,
            None => return false,
        }
    }
}

pub fn has_index_property(obj: &JSObjectDataPtr, index: u64) -> bool {
    has_property(obj, &PropertyKey::from_index(index))
}

/// `Get` with `obj` as receiver. Accessors are invoked after every borrow
/// of the object graph has been released.
pub fn get(obj: &JSObjectDataPtr, key: &PropertyKey) -> Result<Value, JSError> {
    let mut current = obj.clone();
    let slot = loop {
        if let Some(slot) = get_own_property(&current, key) {
            break slot;
        }
        let next = {
            let data = current.borrow();
            if data.typed_array().is_some() && key.array_index().is_some() {
                return Ok(Value::Undefined);
            }
            data.prototype.clone()
        };
        match next {
            Some(p) => current = p,
            None => return Ok(Value::Undefined),
        }
    };
    match slot {
        PropertySlot::Data(v) => Ok(v),
        PropertySlot::Accessor { getter: Some(getter) } => call_function(&getter, &Value::Object(obj.clone()), &[]),
        PropertySlot::Accessor { getter: None } => Ok(Value::Undefined),
    }
}

pub fn get_index(obj: &JSObjectDataPtr, index: u64) -> Result<Value, JSError> {
    get(obj, &PropertyKey::from_index(index))
}

/// `CreateDataProperty`: defines (or redefines) an own enumerable data
/// property.
pub fn create_data_property(obj: &JSObjectDataPtr, key: &PropertyKey, value: Value) -> Result<(), JSError> {
    let index = key.array_index();
    let is_length = matches!(key, PropertyKey::String(s) if s == "length");
    let notify = {
        let mut guard = obj.borrow_mut();
        let data = &mut *guard;
        let notify = index.is_some() && data.used_as_prototype;
        match (&mut data.kind, index) {
            (ObjectKind::Array(arr), Some(i)) => arr.set(i, value, true),
            (ObjectKind::Arguments(arr), Some(i)) => arr.set(i, value, false),
            (ObjectKind::TypedArray(ta), Some(i)) => ta.set_value(i, &value)?,
            (ObjectKind::Array(arr), None) if is_length => arr.set_length(to_array_length(&value)?),
            (ObjectKind::Arguments(arr), None) if is_length => arr.length = to_array_length(&value)?,
            _ => {
                data.properties.insert(key.clone(), PropertySlot::Data(value));
                data.non_enumerable.remove(key);
            }
        }
        notify
    };
    if notify {
        array_prototype_no_elements().invalidate("indexed property defined on a prototype object");
    }
    Ok(())
}

fn to_array_length(value: &Value) -> Result<u64, JSError> {
    let n = to_number(value)?;
    if n < 0.0 || n.fract() != 0.0 || n > f64::from(u32::MAX) {
        return Err(crate::raise_range_error!("Invalid array length"));
    }
    Ok(n as u64)
}

pub fn define_accessor(obj: &JSObjectDataPtr, key: &PropertyKey, getter: Option<Value>, enumerable: bool) -> Result<(), JSError> {
    let notify = {
        let mut data = obj.borrow_mut();
        if key.array_index().is_some() && data.is_array_shaped() {
            return Err(raise_type_error!("Cannot define an accessor on an indexed element"));
        }
        data.properties.insert(key.clone(), PropertySlot::Accessor { getter });
        if enumerable {
            data.non_enumerable.remove(key);
        } else {
            data.non_enumerable.insert(key.clone());
        }
        key.array_index().is_some() && data.used_as_prototype
    };
    if notify {
        array_prototype_no_elements().invalidate("indexed accessor defined on a prototype object");
    }
    Ok(())
}

pub fn delete_property(obj: &JSObjectDataPtr, key: &PropertyKey) -> bool {
    let mut data = obj.borrow_mut();
    if let Some(index) = key.array_index() {
        match &mut data.kind {
            ObjectKind::Array(arr) | ObjectKind::Arguments(arr) => {
                arr.delete(index);
                return true;
            }
            ObjectKind::TypedArray(ta) => return index >= ta.current_length() as u64,
            ObjectKind::Ordinary => {}
        }
    }
    if data.array().is_some() && matches!(key, PropertyKey::String(s) if s == "length") {
        return false;
    }
    data.non_enumerable.remove(key);
    data.properties.shift_remove(key);
    true
}

fn chain_contains(start: &JSObjectDataPtr, needle: &JSObjectDataPtr) -> bool {
    let mut current = Some(start.clone());
    while let Some(c) = current {
        if Rc::ptr_eq(&c, needle) {
            return true;
        }
        current = c.borrow().prototype.clone();
    }
    false
}

/// Sets `[[Prototype]]`. Every object on the new chain is marked as a
/// prototype so that gaining indexed elements later invalidates the
/// array-prototype assumption.
pub fn set_prototype(obj: &JSObjectDataPtr, proto: Option<JSObjectDataPtr>) -> Result<(), JSError> {
    if let Some(p) = &proto {
        if chain_contains(p, obj) {
            return Err(raise_type_error!("Cyclic __proto__ value"));
        }
        let mut chain_has_elements = false;
        let mut current = Some(p.clone());
        while let Some(c) = current {
            let mut data = c.borrow_mut();
            data.used_as_prototype = true;
            chain_has_elements |= data.has_indexed_elements();
            current = data.prototype.clone();
        }
        let affects_arrays = {
            let data = obj.borrow();
            data.is_array_shaped() || data.used_as_prototype
        };
        if chain_has_elements && affects_arrays {
            array_prototype_no_elements().invalidate("prototype with indexed elements installed");
        }
    }
    obj.borrow_mut().prototype = proto;
    Ok(())
}

/// `[[OwnPropertyKeys]]`: array indices ascending, then string keys in
/// creation order, then symbols in creation order.
pub fn own_property_keys(obj: &JSObjectDataPtr) -> Vec<PropertyKey> {
    let data = obj.borrow();
    let mut indices: Vec<u64> = match &data.kind {
        ObjectKind::Array(arr) | ObjectKind::Arguments(arr) => arr.present_indices(),
        ObjectKind::TypedArray(ta) => (0..ta.current_length() as u64).collect(),
        ObjectKind::Ordinary => Vec::new(),
    };
    let mut strings = Vec::new();
    let mut symbols = Vec::new();
    if data.array().is_some() {
        strings.push(PropertyKey::from("length"));
    }
    for key in data.properties.keys() {
        match key {
            PropertyKey::String(s) => match parse_array_index(s) {
                Some(i) => indices.push(i),
                None => strings.push(key.clone()),
            },
            PropertyKey::Symbol(_) => symbols.push(key.clone()),
        }
    }
    indices.sort_unstable();
    indices.dedup();
    let mut keys: Vec<PropertyKey> = indices.into_iter().map(PropertyKey::from_index).collect();
    keys.extend(strings);
    keys.extend(symbols);
    keys
}
