use crate::core::{
    JSArrayBuffer, JSArrayBufferPtr, JSObjectData, JSObjectDataPtr, JSTypedArray, ObjectKind, TypedArrayKind, Value, to_number,
    typed_array_not_detached,
};
use crate::{JSError, raise_range_error, raise_type_error};
use num_bigint::{BigInt, Sign};
use std::cell::RefCell;
use std::rc::Rc;

pub fn new_array_buffer(byte_length: usize) -> JSArrayBufferPtr {
    Rc::new(RefCell::new(JSArrayBuffer {
        data: vec![0; byte_length],
        detached: false,
    }))
}

/// Releases the buffer's storage. Every view over it becomes unusable and
/// the process-wide "not detached" assumption is dropped.
pub fn detach_array_buffer(buffer: &JSArrayBufferPtr) {
    {
        let mut b = buffer.borrow_mut();
        b.data = Vec::new();
        b.detached = true;
    }
    typed_array_not_detached().invalidate("array buffer detached");
}

pub fn create_typed_array(kind: TypedArrayKind, length: usize) -> JSObjectDataPtr {
    let buffer = new_array_buffer(length * kind.element_size());
    Rc::new(RefCell::new(JSObjectData::with_kind(ObjectKind::TypedArray(JSTypedArray {
        kind,
        buffer,
        byte_offset: 0,
        length,
    }))))
}

pub fn create_typed_array_on_buffer(
    kind: TypedArrayKind,
    buffer: &JSArrayBufferPtr,
    byte_offset: usize,
    length: usize,
) -> Result<JSObjectDataPtr, JSError> {
    let element_size = kind.element_size();
    if byte_offset % element_size != 0 {
        return Err(raise_range_error!(format!("start offset of {kind:?}Array should be a multiple of {element_size}")));
    }
    {
        let b = buffer.borrow();
        if b.detached {
            return Err(JSError::DetachedBuffer);
        }
        if byte_offset + length * element_size > b.data.len() {
            return Err(raise_range_error!(format!("Invalid typed array length: {length}")));
        }
    }
    Ok(Rc::new(RefCell::new(JSObjectData::with_kind(ObjectKind::TypedArray(JSTypedArray {
        kind,
        buffer: buffer.clone(),
        byte_offset,
        length,
    })))))
}

pub fn create_typed_array_from(kind: TypedArrayKind, values: &[Value]) -> Result<JSObjectDataPtr, JSError> {
    let obj = create_typed_array(kind, values.len());
    if let Some(ta) = obj.borrow().typed_array() {
        for (i, v) in values.iter().enumerate() {
            ta.set_value(i as u64, v)?;
        }
    }
    Ok(obj)
}

pub fn has_detached_buffer(obj: &JSObjectDataPtr) -> bool {
    obj.borrow().typed_array().is_some_and(JSTypedArray::is_detached)
}

impl TypedArrayKind {
    pub fn element_size(&self) -> usize {
        match self {
            TypedArrayKind::Int8 | TypedArrayKind::Uint8 | TypedArrayKind::Uint8Clamped => 1,
            TypedArrayKind::Int16 | TypedArrayKind::Uint16 => 2,
            TypedArrayKind::Int32 | TypedArrayKind::Uint32 | TypedArrayKind::Float32 => 4,
            TypedArrayKind::Float64 | TypedArrayKind::BigInt64 | TypedArrayKind::BigUint64 => 8,
        }
    }

    pub fn is_bigint(&self) -> bool {
        matches!(self, TypedArrayKind::BigInt64 | TypedArrayKind::BigUint64)
    }
}

// ToInt32-style wrap of a number into the low 32 bits.
fn to_uint32_bits(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32
}

fn to_uint8_clamp(n: f64) -> u8 {
    if n.is_nan() || n <= 0.0 {
        return 0;
    }
    if n >= 255.0 {
        return 255;
    }
    let f = n.floor();
    let half = f + 0.5;
    if n < half {
        f as u8
    } else if n > half {
        (f + 1.0) as u8
    } else if f % 2.0 == 0.0 {
        f as u8
    } else {
        (f + 1.0) as u8
    }
}

// BigInt modulo 2^64, as two's complement bits.
fn bigint_to_u64_bits(b: &BigInt) -> u64 {
    let (sign, digits) = b.to_u64_digits();
    let low = digits.first().copied().unwrap_or(0);
    if sign == Sign::Minus { low.wrapping_neg() } else { low }
}

impl JSTypedArray {
    pub fn is_detached(&self) -> bool {
        self.buffer.borrow().detached
    }

    /// Element count as currently observable; zero once detached.
    pub fn current_length(&self) -> usize {
        if self.is_detached() { 0 } else { self.length }
    }

    fn byte_range(&self, index: u64) -> Option<std::ops::Range<usize>> {
        let index = usize::try_from(index).ok()?;
        if index >= self.current_length() {
            return None;
        }
        let size = self.kind.element_size();
        let start = self.byte_offset + index * size;
        Some(start..start + size)
    }

    pub fn get_value(&self, index: u64) -> Option<Value> {
        let range = self.byte_range(index)?;
        let buffer = self.buffer.borrow();
        let bytes = buffer.data.get(range)?;
        let value = match self.kind {
            TypedArrayKind::Int8 => Value::Number(f64::from(i8::from_le_bytes(bytes.try_into().ok()?))),
            TypedArrayKind::Uint8 | TypedArrayKind::Uint8Clamped => Value::Number(f64::from(u8::from_le_bytes(bytes.try_into().ok()?))),
            TypedArrayKind::Int16 => Value::Number(f64::from(i16::from_le_bytes(bytes.try_into().ok()?))),
            TypedArrayKind::Uint16 => Value::Number(f64::from(u16::from_le_bytes(bytes.try_into().ok()?))),
            TypedArrayKind::Int32 => Value::Number(f64::from(i32::from_le_bytes(bytes.try_into().ok()?))),
            TypedArrayKind::Uint32 => Value::Number(f64::from(u32::from_le_bytes(bytes.try_into().ok()?))),
            TypedArrayKind::Float32 => Value::Number(f64::from(f32::from_le_bytes(bytes.try_into().ok()?))),
            TypedArrayKind::Float64 => Value::Number(f64::from_le_bytes(bytes.try_into().ok()?)),
            TypedArrayKind::BigInt64 => Value::BigInt(BigInt::from(i64::from_le_bytes(bytes.try_into().ok()?))),
            TypedArrayKind::BigUint64 => Value::BigInt(BigInt::from(u64::from_le_bytes(bytes.try_into().ok()?))),
        };
        Some(value)
    }

    pub fn set_value(&self, index: u64, value: &Value) -> Result<(), JSError> {
        let bytes: Vec<u8> = if self.kind.is_bigint() {
            let Value::BigInt(b) = value else {
                return Err(raise_type_error!(format!("Cannot convert {value:?} to a BigInt")));
            };
            bigint_to_u64_bits(b).to_le_bytes().to_vec()
        } else {
            let n = to_number(value)?;
            match self.kind {
                TypedArrayKind::Int8 | TypedArrayKind::Uint8 => vec![to_uint32_bits(n) as u8],
                TypedArrayKind::Uint8Clamped => vec![to_uint8_clamp(n)],
                TypedArrayKind::Int16 | TypedArrayKind::Uint16 => (to_uint32_bits(n) as u16).to_le_bytes().to_vec(),
                TypedArrayKind::Int32 | TypedArrayKind::Uint32 => to_uint32_bits(n).to_le_bytes().to_vec(),
                TypedArrayKind::Float32 => (n as f32).to_le_bytes().to_vec(),
                _ => n.to_le_bytes().to_vec(),
            }
        };
        let Some(range) = self.byte_range(index) else {
            if self.is_detached() {
                return Err(JSError::DetachedBuffer);
            }
            return Err(raise_type_error!(format!("Invalid typed array index {index}")));
        };
        let mut buffer = self.buffer.borrow_mut();
        if let Some(slot) = buffer.data.get_mut(range) {
            slot.copy_from_slice(&bytes);
        }
        Ok(())
    }
}
