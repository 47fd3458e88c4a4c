use crate::core::{
    ArrayStorage, Direction, ForEachIndexCall, JSArray, JSObjectData, JSObjectDataPtr, MaybeResult, ObjectKind, PropertyKey, Value,
    call_function, create_data_property, get, identical, is_callable, to_number,
};
use crate::{JSError, raise_type_error};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

// Writes further than this past the end of a vector-backed array switch the
// storage to sparse.
const MAX_DENSE_GAP: usize = 1024;

impl JSArray {
    pub fn packed(values: Vec<Value>) -> Self {
        let length = values.len() as u64;
        JSArray {
            storage: ArrayStorage::Packed(values),
            length,
        }
    }

    pub fn holey(mut values: Vec<Option<Value>>) -> Self {
        let length = values.len() as u64;
        trim_trailing_holes(&mut values);
        JSArray {
            storage: ArrayStorage::Holey(values),
            length,
        }
    }

    pub fn sparse(length: u64, elements: BTreeMap<u64, Value>) -> Self {
        JSArray {
            storage: ArrayStorage::Sparse(elements),
            length,
        }
    }

    pub fn get(&self, index: u64) -> Option<&Value> {
        match &self.storage {
            ArrayStorage::Packed(v) => usize::try_from(index).ok().and_then(|i| v.get(i)),
            ArrayStorage::Holey(v) => usize::try_from(index).ok().and_then(|i| v.get(i)).and_then(Option::as_ref),
            ArrayStorage::Sparse(m) => m.get(&index),
        }
    }

    fn make_holey(&mut self) {
        if let ArrayStorage::Packed(v) = &mut self.storage {
            let values = std::mem::take(v);
            self.storage = ArrayStorage::Holey(values.into_iter().map(Some).collect());
        }
    }

    fn make_sparse(&mut self) {
        let elements: BTreeMap<u64, Value> = match std::mem::replace(&mut self.storage, ArrayStorage::Sparse(BTreeMap::new())) {
            ArrayStorage::Packed(v) => v.into_iter().enumerate().map(|(i, v)| (i as u64, v)).collect(),
            ArrayStorage::Holey(v) => v.into_iter().enumerate().filter_map(|(i, v)| v.map(|v| (i as u64, v))).collect(),
            ArrayStorage::Sparse(m) => m,
        };
        self.storage = ArrayStorage::Sparse(elements);
    }

    /// Stores `value` at `index`, growing the declared length when
    /// `grow_length` is set (arrays) and leaving it alone otherwise
    /// (arguments objects).
    pub fn set(&mut self, index: u64, value: Value, grow_length: bool) {
        if grow_length && index >= self.length {
            self.length = index + 1;
        }
        if let ArrayStorage::Packed(v) = &mut self.storage {
            match usize::try_from(index) {
                Ok(i) if i < v.len() => {
                    v[i] = value;
                    return;
                }
                Ok(i) if i == v.len() => {
                    v.push(value);
                    return;
                }
                _ => self.make_holey(),
            }
        }
        if let ArrayStorage::Holey(v) = &mut self.storage {
            match usize::try_from(index) {
                Ok(i) if i <= v.len() + MAX_DENSE_GAP => {
                    if i >= v.len() {
                        v.resize(i + 1, None);
                    }
                    v[i] = Some(value);
                    return;
                }
                _ => self.make_sparse(),
            }
        }
        if let ArrayStorage::Sparse(m) = &mut self.storage {
            m.insert(index, value);
        }
    }

    pub fn delete(&mut self, index: u64) {
        if let ArrayStorage::Packed(v) = &mut self.storage {
            match usize::try_from(index) {
                Ok(i) if i + 1 == v.len() => {
                    v.pop();
                    return;
                }
                Ok(i) if i < v.len() => self.make_holey(),
                _ => return,
            }
        }
        match &mut self.storage {
            ArrayStorage::Holey(v) => {
                if let Some(slot) = usize::try_from(index).ok().and_then(|i| v.get_mut(i)) {
                    *slot = None;
                }
                trim_trailing_holes(v);
            }
            ArrayStorage::Sparse(m) => {
                m.remove(&index);
            }
            ArrayStorage::Packed(_) => {}
        }
    }

    /// Changes the declared length, dropping elements at or above it.
    pub fn set_length(&mut self, new_length: u64) {
        let keep = usize::try_from(new_length).unwrap_or(usize::MAX);
        match &mut self.storage {
            ArrayStorage::Packed(v) => v.truncate(keep),
            ArrayStorage::Holey(v) => {
                v.truncate(keep);
                trim_trailing_holes(v);
            }
            ArrayStorage::Sparse(m) => {
                m.split_off(&new_length);
            }
        }
        self.length = new_length;
    }

    pub fn has_any_element(&self) -> bool {
        match &self.storage {
            ArrayStorage::Packed(v) => !v.is_empty(),
            ArrayStorage::Holey(v) => !v.is_empty(),
            ArrayStorage::Sparse(m) => !m.is_empty(),
        }
    }

    pub fn present_indices(&self) -> Vec<u64> {
        match &self.storage {
            ArrayStorage::Packed(v) => (0..v.len() as u64).collect(),
            ArrayStorage::Holey(v) => v.iter().enumerate().filter(|(_, e)| e.is_some()).map(|(i, _)| i as u64).collect(),
            ArrayStorage::Sparse(m) => m.keys().copied().collect(),
        }
    }

    /// Smallest present index `>= from`.
    pub fn first_present_from(&self, from: u64) -> Option<u64> {
        match &self.storage {
            ArrayStorage::Packed(v) => (from < v.len() as u64).then_some(from),
            ArrayStorage::Holey(v) => {
                let start = usize::try_from(from).ok()?;
                v.iter().enumerate().skip(start).find(|(_, e)| e.is_some()).map(|(i, _)| i as u64)
            }
            ArrayStorage::Sparse(m) => m.range(from..).next().map(|(k, _)| *k),
        }
    }

    /// Largest present index `< end`.
    pub fn last_present_before(&self, end: u64) -> Option<u64> {
        match &self.storage {
            ArrayStorage::Packed(v) => {
                let end = end.min(v.len() as u64);
                end.checked_sub(1)
            }
            ArrayStorage::Holey(v) => {
                let end = usize::try_from(end).unwrap_or(usize::MAX).min(v.len());
                v[..end].iter().rposition(Option::is_some).map(|i| i as u64)
            }
            ArrayStorage::Sparse(m) => m.range(..end).next_back().map(|(k, _)| *k),
        }
    }

    pub fn last_present(&self) -> Option<u64> {
        match &self.storage {
            ArrayStorage::Packed(v) => (v.len() as u64).checked_sub(1),
            // holey storage never ends in a hole
            ArrayStorage::Holey(v) => (v.len() as u64).checked_sub(1),
            ArrayStorage::Sparse(m) => m.last_key_value().map(|(k, _)| *k),
        }
    }
}

fn trim_trailing_holes(values: &mut Vec<Option<Value>>) {
    while matches!(values.last(), Some(None)) {
        values.pop();
    }
}

pub fn create_array(values: Vec<Value>) -> JSObjectDataPtr {
    Rc::new(RefCell::new(JSObjectData::with_kind(ObjectKind::Array(JSArray::packed(values)))))
}

pub fn create_holey_array(values: Vec<Option<Value>>) -> JSObjectDataPtr {
    Rc::new(RefCell::new(JSObjectData::with_kind(ObjectKind::Array(JSArray::holey(values)))))
}

pub fn create_sparse_array(length: u64, elements: impl IntoIterator<Item = (u64, Value)>) -> JSObjectDataPtr {
    let elements = elements.into_iter().filter(|(i, _)| *i < length).collect();
    Rc::new(RefCell::new(JSObjectData::with_kind(ObjectKind::Array(JSArray::sparse(length, elements)))))
}

/// Arguments object holding `args`. Its length can later be lowered through
/// the `length` property without discarding elements.
pub fn create_arguments_object(args: Vec<Value>) -> JSObjectDataPtr {
    Rc::new(RefCell::new(JSObjectData::with_kind(ObjectKind::Arguments(JSArray::packed(args)))))
}

pub fn get_array_length(obj: &JSObjectDataPtr) -> Option<u64> {
    let data = obj.borrow();
    match &data.kind {
        ObjectKind::Array(arr) | ObjectKind::Arguments(arr) => Some(arr.length),
        ObjectKind::TypedArray(ta) => Some(ta.current_length() as u64),
        ObjectKind::Ordinary => None,
    }
}

pub fn set_array_length(obj: &JSObjectDataPtr, new_length: u64) -> Result<(), JSError> {
    create_data_property(obj, &PropertyKey::from("length"), Value::Number(new_length as f64))
}

/// `LengthOfArrayLike`, plus the host array size for foreign targets.
pub fn length_of_array_like(target: &Value) -> Result<u64, JSError> {
    match target {
        Value::Object(obj) => {
            if let Some(len) = get_array_length(obj) {
                return Ok(len);
            }
            let len = to_number(&get(obj, &PropertyKey::from("length"))?)?;
            Ok(to_length(len))
        }
        Value::Foreign(f) => {
            if !f.has_array_elements() {
                return Ok(0);
            }
            f.get_array_size().map_err(|e| JSError::interop("getArraySize", e))
        }
        _ => Err(raise_type_error!(format!("{target:?} is not an object"))),
    }
}

fn to_length(n: f64) -> u64 {
    if n.is_nan() || n <= 0.0 {
        0
    } else {
        n.trunc().min(crate::core::MAX_SAFE_INTEGER as f64) as u64
    }
}

fn to_integer_or_infinity(n: f64) -> f64 {
    if n.is_nan() { 0.0 } else { n.trunc() }
}

// Index strategy used by the traversal fast path. Indices are signed so that
// "before the first element" is representable as -1.

pub fn first_element_index(obj: &JSObjectDataPtr, length: i64) -> i64 {
    let data = obj.borrow();
    match &data.kind {
        ObjectKind::Array(arr) | ObjectKind::Arguments(arr) => arr.first_present_from(0).map_or(length, |i| i as i64),
        _ => 0,
    }
}

/// May exceed `length - 1` for arguments objects whose length was lowered.
pub fn last_element_index(obj: &JSObjectDataPtr, length: i64) -> i64 {
    let data = obj.borrow();
    match &data.kind {
        ObjectKind::Array(arr) | ObjectKind::Arguments(arr) => arr.last_present().map_or(-1, |i| i as i64),
        ObjectKind::TypedArray(ta) => (ta.current_length() as i64).min(length) - 1,
        ObjectKind::Ordinary => length - 1,
    }
}

pub fn next_element_index(obj: &JSObjectDataPtr, current: i64, length: i64) -> i64 {
    let next = current + 1;
    let data = obj.borrow();
    match &data.kind {
        ObjectKind::Array(arr) | ObjectKind::Arguments(arr) => arr.first_present_from(next as u64).map_or(length.max(next), |i| i as i64),
        _ => next,
    }
}

pub fn previous_element_index(obj: &JSObjectDataPtr, current: i64) -> i64 {
    if current <= 0 {
        return -1;
    }
    let data = obj.borrow();
    match &data.kind {
        ObjectKind::Array(arr) | ObjectKind::Arguments(arr) => arr.last_present_before(current as u64).map_or(-1, |i| i as i64),
        _ => current - 1,
    }
}

/// Reads an element the index strategy reported as present.
pub fn read_element_in_bounds(obj: &JSObjectDataPtr, index: i64) -> Value {
    let data = obj.borrow();
    let index = index as u64;
    match &data.kind {
        ObjectKind::Array(arr) | ObjectKind::Arguments(arr) => arr.get(index).cloned().unwrap_or(Value::Undefined),
        ObjectKind::TypedArray(ta) => ta.get_value(index).unwrap_or(Value::Undefined),
        ObjectKind::Ordinary => Value::Undefined,
    }
}

fn call_with_element(
    index: u64,
    value: &Value,
    target: &Value,
    callback: &Value,
    this_arg: &Value,
    _current_result: &Value,
) -> Result<Value, JSError> {
    call_function(callback, this_arg, &[value.clone(), Value::Number(index as f64), target.clone()])
}

fn call_with_accumulator(
    index: u64,
    value: &Value,
    target: &Value,
    callback: &Value,
    _this_arg: &Value,
    current_result: &Value,
) -> Result<Value, JSError> {
    call_function(
        callback,
        &Value::Undefined,
        &[current_result.clone(), value.clone(), Value::Number(index as f64), target.clone()],
    )
}

fn stop_at_value_when_truthy(_: u64, value: &Value, callback_result: Value, current_result: Value) -> Result<MaybeResult, JSError> {
    if callback_result.to_truthy() {
        Ok(MaybeResult::return_result(value.clone()))
    } else {
        Ok(MaybeResult::continue_result(current_result))
    }
}

fn stop_at_index_when_truthy(index: u64, _: &Value, callback_result: Value, current_result: Value) -> Result<MaybeResult, JSError> {
    if callback_result.to_truthy() {
        Ok(MaybeResult::return_result(Value::Number(index as f64)))
    } else {
        Ok(MaybeResult::continue_result(current_result))
    }
}

fn validate_target(method: &str, target: &Value) -> Result<(), JSError> {
    match target {
        Value::Object(obj) => {
            if crate::js_typedarray::has_detached_buffer(obj) {
                return Err(JSError::DetachedBuffer);
            }
            Ok(())
        }
        Value::Foreign(_) => Ok(()),
        _ => Err(raise_type_error!(format!("Array.prototype.{method} called on {target:?}"))),
    }
}

fn callback_arg(method: &str, args: &[Value]) -> Result<(Value, Value), JSError> {
    let callback = args.first().cloned().unwrap_or(Value::Undefined);
    if !is_callable(&callback) {
        return Err(raise_type_error!(format!("Array.prototype.{method}: {callback:?} is not a function")));
    }
    Ok((callback, args.get(1).cloned().unwrap_or(Value::Undefined)))
}

/// Finds the first (forward) or last (backward) present element, used to
/// seed `reduce`/`reduceRight` when no initial value is given.
fn find_seed(target: &Value, from_index: u64, length: u64, direction: Direction) -> Result<Option<(u64, Value)>, JSError> {
    let mut found = None;
    let seed = ForEachIndexCall::without_callback(
        |index: u64, value: &Value, _: Value, _: Value| -> Result<MaybeResult, JSError> {
            found = Some(index);
            Ok(MaybeResult::return_result(value.clone()))
        },
        direction,
    )
    .execute(target, &Value::Undefined, &Value::Undefined, from_index, length, Value::Undefined)?;
    Ok(found.map(|index| (index, seed)))
}

/// Handle Array.prototype iteration methods that are built on the indexed
/// traversal (forEach, map, filter, every, some, reduce, reduceRight, find,
/// findIndex, findLast, findLastIndex, indexOf, lastIndexOf).
pub fn handle_array_iteration_method(method: &str, target: &Value, args: &[Value]) -> Result<Value, JSError> {
    validate_target(method, target)?;
    let length = length_of_array_like(target)?;
    match method {
        "forEach" => {
            let (callback, this_arg) = callback_arg(method, args)?;
            ForEachIndexCall::new(
                call_with_element,
                |_: u64, _: &Value, _: Value, current_result: Value| -> Result<MaybeResult, JSError> {
                    Ok(MaybeResult::continue_result(current_result))
                },
                Direction::Forward,
            )
            .execute(target, &callback, &this_arg, 0, length, Value::Undefined)?;
            Ok(Value::Undefined)
        }
        "map" => {
            let (callback, this_arg) = callback_arg(method, args)?;
            let result = create_sparse_array(length, []);
            ForEachIndexCall::new(
                call_with_element,
                |index: u64, _: &Value, callback_result: Value, current_result: Value| -> Result<MaybeResult, JSError> {
                    if let Value::Object(out) = &current_result {
                        create_data_property(out, &PropertyKey::from_index(index), callback_result)?;
                    }
                    Ok(MaybeResult::continue_result(current_result))
                },
                Direction::Forward,
            )
            .execute(target, &callback, &this_arg, 0, length, Value::Object(result))
        }
        "filter" => {
            let (callback, this_arg) = callback_arg(method, args)?;
            let result = create_array(Vec::new());
            ForEachIndexCall::new(
                call_with_element,
                |_: u64, value: &Value, callback_result: Value, current_result: Value| -> Result<MaybeResult, JSError> {
                    if callback_result.to_truthy()
                        && let Value::Object(out) = &current_result
                    {
                        let next = get_array_length(out).unwrap_or(0);
                        create_data_property(out, &PropertyKey::from_index(next), value.clone())?;
                    }
                    Ok(MaybeResult::continue_result(current_result))
                },
                Direction::Forward,
            )
            .execute(target, &callback, &this_arg, 0, length, Value::Object(result))
        }
        "every" => {
            let (callback, this_arg) = callback_arg(method, args)?;
            ForEachIndexCall::new(
                call_with_element,
                |_: u64, _: &Value, callback_result: Value, current_result: Value| -> Result<MaybeResult, JSError> {
                    if callback_result.to_truthy() {
                        Ok(MaybeResult::continue_result(current_result))
                    } else {
                        Ok(MaybeResult::return_result(Value::Boolean(false)))
                    }
                },
                Direction::Forward,
            )
            .execute(target, &callback, &this_arg, 0, length, Value::Boolean(true))
        }
        "some" => {
            let (callback, this_arg) = callback_arg(method, args)?;
            ForEachIndexCall::new(
                call_with_element,
                |_: u64, _: &Value, callback_result: Value, current_result: Value| -> Result<MaybeResult, JSError> {
                    if callback_result.to_truthy() {
                        Ok(MaybeResult::return_result(Value::Boolean(true)))
                    } else {
                        Ok(MaybeResult::continue_result(current_result))
                    }
                },
                Direction::Forward,
            )
            .execute(target, &callback, &this_arg, 0, length, Value::Boolean(false))
        }
        "find" | "findLast" => {
            let (callback, this_arg) = callback_arg(method, args)?;
            if length == 0 {
                return Ok(Value::Undefined);
            }
            let (direction, from_index) = if method == "find" {
                (Direction::Forward, 0)
            } else {
                (Direction::Backward, length - 1)
            };
            ForEachIndexCall::new(call_with_element, stop_at_value_when_truthy, direction).execute(
                target,
                &callback,
                &this_arg,
                from_index,
                length,
                Value::Undefined,
            )
        }
        "findIndex" | "findLastIndex" => {
            let (callback, this_arg) = callback_arg(method, args)?;
            if length == 0 {
                return Ok(Value::Number(-1.0));
            }
            let (direction, from_index) = if method == "findIndex" {
                (Direction::Forward, 0)
            } else {
                (Direction::Backward, length - 1)
            };
            ForEachIndexCall::new(call_with_element, stop_at_index_when_truthy, direction).execute(
                target,
                &callback,
                &this_arg,
                from_index,
                length,
                Value::Number(-1.0),
            )
        }
        "reduce" | "reduceRight" => {
            let callback = args.first().cloned().unwrap_or(Value::Undefined);
            if !is_callable(&callback) {
                return Err(raise_type_error!(format!("Array.prototype.{method}: {callback:?} is not a function")));
            }
            let direction = if method == "reduce" { Direction::Forward } else { Direction::Backward };
            if length == 0 {
                return args.get(1).cloned().ok_or_else(|| raise_type_error!("Reduce of empty array with no initial value"));
            }
            let start = if direction == Direction::Forward { 0 } else { length - 1 };
            let (initial, from_index) = match args.get(1) {
                Some(initial) => (initial.clone(), Some(start)),
                None => {
                    let Some((seed_index, seed)) = find_seed(target, start, length, direction)? else {
                        return Err(raise_type_error!("Reduce of empty array with no initial value"));
                    };
                    let next = match direction {
                        Direction::Forward => Some(seed_index + 1),
                        Direction::Backward => seed_index.checked_sub(1),
                    };
                    (seed, next)
                }
            };
            let Some(from_index) = from_index else {
                return Ok(initial);
            };
            ForEachIndexCall::new(
                call_with_accumulator,
                |_: u64, _: &Value, callback_result: Value, _: Value| -> Result<MaybeResult, JSError> {
                    Ok(MaybeResult::continue_result(callback_result))
                },
                direction,
            )
            .execute(target, &callback, &Value::Undefined, from_index, length, initial)
        }
        "indexOf" | "lastIndexOf" => {
            if length == 0 {
                return Ok(Value::Number(-1.0));
            }
            let search = args.first().cloned().unwrap_or(Value::Undefined);
            let from_index = match args.get(1) {
                Some(v) => Some(to_integer_or_infinity(to_number(v)?)),
                None => None,
            };
            let len = length as f64;
            let (direction, start) = if method == "indexOf" {
                let n = from_index.unwrap_or(0.0);
                let k = if n >= 0.0 { n } else { (len + n).max(0.0) };
                if k >= len {
                    return Ok(Value::Number(-1.0));
                }
                (Direction::Forward, k as u64)
            } else {
                let n = from_index.unwrap_or(len - 1.0);
                let k = if n >= 0.0 { n.min(len - 1.0) } else { len + n };
                if k < 0.0 {
                    return Ok(Value::Number(-1.0));
                }
                (Direction::Backward, k as u64)
            };
            ForEachIndexCall::without_callback(
                |index: u64, value: &Value, _: Value, current_result: Value| -> Result<MaybeResult, JSError> {
                    if identical(value, &search) {
                        Ok(MaybeResult::return_result(Value::Number(index as f64)))
                    } else {
                        Ok(MaybeResult::continue_result(current_result))
                    }
                },
                direction,
            )
            .execute(target, &Value::Undefined, &Value::Undefined, start, length, Value::Number(-1.0))
        }
        _ => Err(raise_type_error!(format!("Array.prototype.{method} is not supported"))),
    }
}
