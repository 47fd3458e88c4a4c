//! Indexed traversal shared by the array iteration builtins.
//!
//! A traversal is configured with a callback node (how to call the user
//! function for one element) and a result node (how to fold that call into
//! the running result and whether to stop). The target is classified once
//! per call: array-shaped objects walk their element storage through the
//! index strategy in `js_array` while the array-prototype assumption holds,
//! everything else goes through `HasProperty`/`Get` or the interop protocol.

use crate::JSError;
use crate::core::{
    ForeignObject, JSObjectDataPtr, Value, array_prototype_no_elements, foreign_has_element, foreign_read, get_index, has_index_property,
    is_integer_index, typed_array_not_detached,
};
use crate::js_array::{first_element_index, last_element_index, next_element_index, previous_element_index, read_element_in_bounds};
use std::rc::Rc;

/// Outcome of folding one element into the running result.
#[derive(Clone, Debug)]
pub enum MaybeResult {
    Continue(Value),
    Stop(Value),
}

impl MaybeResult {
    pub fn continue_result(value: Value) -> Self {
        MaybeResult::Continue(value)
    }

    pub fn return_result(value: Value) -> Self {
        MaybeResult::Stop(value)
    }
}

/// Invokes the user function for one element and returns its result.
pub trait CallbackNode {
    fn apply(
        &mut self,
        index: u64,
        value: &Value,
        target: &Value,
        callback: &Value,
        this_arg: &Value,
        current_result: &Value,
    ) -> Result<Value, JSError>;
}

impl<F> CallbackNode for F
where
    F: FnMut(u64, &Value, &Value, &Value, &Value, &Value) -> Result<Value, JSError>,
{
    fn apply(
        &mut self,
        index: u64,
        value: &Value,
        target: &Value,
        callback: &Value,
        this_arg: &Value,
        current_result: &Value,
    ) -> Result<Value, JSError> {
        self(index, value, target, callback, this_arg, current_result)
    }
}

/// Traversals without a user function (`indexOf`): the callback result is
/// `this_arg`.
pub struct NoCallback;

impl CallbackNode for NoCallback {
    fn apply(&mut self, _: u64, _: &Value, _: &Value, _: &Value, this_arg: &Value, _: &Value) -> Result<Value, JSError> {
        Ok(this_arg.clone())
    }
}

/// Folds a callback result into the running result.
pub trait MaybeResultNode {
    fn apply(&mut self, index: u64, value: &Value, callback_result: Value, current_result: Value) -> Result<MaybeResult, JSError>;
}

impl<F> MaybeResultNode for F
where
    F: FnMut(u64, &Value, Value, Value) -> Result<MaybeResult, JSError>,
{
    fn apply(&mut self, index: u64, value: &Value, callback_result: Value, current_result: Value) -> Result<MaybeResult, JSError> {
        self(index, value, callback_result, current_result)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

enum SlowTarget {
    Native(JSObjectDataPtr),
    Foreign(Rc<dyn ForeignObject>),
}

enum Dispatch {
    Fast(JSObjectDataPtr),
    Slow(SlowTarget),
}

fn select_dispatch(target: &Value, array_prototype_no_elements: bool) -> Result<Dispatch, JSError> {
    match target {
        Value::Object(obj) => {
            if array_prototype_no_elements && obj.borrow().is_array_shaped() {
                Ok(Dispatch::Fast(obj.clone()))
            } else {
                Ok(Dispatch::Slow(SlowTarget::Native(obj.clone())))
            }
        }
        Value::Foreign(f) => Ok(Dispatch::Slow(SlowTarget::Foreign(f.clone()))),
        other => Err(crate::raise_type_error!(format!("Cannot iterate over {other:?}"))),
    }
}

fn check_has_detached_buffer(view: &JSObjectDataPtr) -> Result<(), JSError> {
    if !typed_array_not_detached().is_valid() && view.borrow().typed_array().is_some_and(|ta| ta.is_detached()) {
        return Err(JSError::DetachedBuffer);
    }
    Ok(())
}

pub struct ForEachIndexCall<C, M> {
    callback_node: C,
    maybe_result_node: M,
    direction: Direction,
}

impl<M: MaybeResultNode> ForEachIndexCall<NoCallback, M> {
    pub fn without_callback(maybe_result_node: M, direction: Direction) -> Self {
        ForEachIndexCall {
            callback_node: NoCallback,
            maybe_result_node,
            direction,
        }
    }
}

impl<C: CallbackNode, M: MaybeResultNode> ForEachIndexCall<C, M> {
    pub fn new(callback_node: C, maybe_result_node: M, direction: Direction) -> Self {
        ForEachIndexCall {
            callback_node,
            maybe_result_node,
            direction,
        }
    }

    /// Visits the present elements of `target` in `[from_index, length)`
    /// (forward) or `[0, from_index]` descending (backward).
    ///
    /// `length` is fixed for the whole call. Callers guarantee
    /// `from_index <= length` (forward) or `from_index < length` (backward).
    pub fn execute(
        &mut self,
        target: &Value,
        callback: &Value,
        this_arg: &Value,
        from_index: u64,
        length: u64,
        initial_result: Value,
    ) -> Result<Value, JSError> {
        debug_assert!(is_integer_index(length));
        debug_assert!(match self.direction {
            Direction::Forward => from_index <= length,
            Direction::Backward => from_index < length,
        });
        match select_dispatch(target, array_prototype_no_elements().is_valid())? {
            Dispatch::Fast(obj) => {
                log::trace!("for-each-index {:?}: fast path from {} length {}", self.direction, from_index, length);
                let (from_index, length) = (from_index as i64, length as i64);
                match self.direction {
                    Direction::Forward => self.forward_fast(&obj, target, callback, this_arg, from_index, length, initial_result),
                    Direction::Backward => self.backward_fast(&obj, target, callback, this_arg, from_index, length, initial_result),
                }
            }
            Dispatch::Slow(slow) => {
                log::trace!("for-each-index {:?}: slow path from {} length {}", self.direction, from_index, length);
                if let SlowTarget::Foreign(f) = &slow
                    && !f.has_array_elements()
                {
                    // a host object without array elements would not understand indexed reads
                    return Ok(initial_result);
                }
                match self.direction {
                    Direction::Forward => self.slow(&slow, target, callback, this_arg, from_index..length, initial_result),
                    Direction::Backward => self.slow(&slow, target, callback, this_arg, (0..=from_index).rev(), initial_result),
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn step(
        &mut self,
        index: u64,
        value: Value,
        target: &Value,
        callback: &Value,
        this_arg: &Value,
        current_result: Value,
        view: Option<&JSObjectDataPtr>,
    ) -> Result<MaybeResult, JSError> {
        let callback_result = self.callback_node.apply(index, &value, target, callback, this_arg, &current_result)?;
        let maybe_result = self.maybe_result_node.apply(index, &value, callback_result, current_result)?;
        if let Some(view) = view {
            check_has_detached_buffer(view)?;
        }
        Ok(maybe_result)
    }

    #[allow(clippy::too_many_arguments)]
    fn forward_fast(
        &mut self,
        obj: &JSObjectDataPtr,
        target: &Value,
        callback: &Value,
        this_arg: &Value,
        from_index: i64,
        length: i64,
        initial_result: Value,
    ) -> Result<Value, JSError> {
        let mut index = if from_index == 0 {
            first_element_index(obj, length)
        } else {
            next_element_index(obj, from_index - 1, length)
        };
        let mut current_result = initial_result;
        while index >= 0 && index < length && index <= last_element_index(obj, length) {
            let value = read_element_in_bounds(obj, index);
            match self.step(index as u64, value, target, callback, this_arg, current_result, Some(obj))? {
                MaybeResult::Stop(v) => return Ok(v),
                MaybeResult::Continue(v) => current_result = v,
            }
            index = next_element_index(obj, index, length);
        }
        Ok(current_result)
    }

    #[allow(clippy::too_many_arguments)]
    fn backward_fast(
        &mut self,
        obj: &JSObjectDataPtr,
        target: &Value,
        callback: &Value,
        this_arg: &Value,
        from_index: i64,
        length: i64,
        initial_result: Value,
    ) -> Result<Value, JSError> {
        // the last element index cannot be trusted here: an arguments object
        // may hold elements beyond its length
        let mut index = previous_element_index(obj, from_index + 1);
        let mut current_result = initial_result;
        while index >= 0 && index < length && index >= first_element_index(obj, length) {
            let value = read_element_in_bounds(obj, index);
            match self.step(index as u64, value, target, callback, this_arg, current_result, Some(obj))? {
                MaybeResult::Stop(v) => return Ok(v),
                MaybeResult::Continue(v) => current_result = v,
            }
            index = previous_element_index(obj, index);
        }
        Ok(current_result)
    }

    fn slow(
        &mut self,
        slow: &SlowTarget,
        target: &Value,
        callback: &Value,
        this_arg: &Value,
        indices: impl Iterator<Item = u64>,
        initial_result: Value,
    ) -> Result<Value, JSError> {
        let mut current_result = initial_result;
        for index in indices {
            let (value, view) = match slow {
                SlowTarget::Native(obj) => {
                    if !has_index_property(obj, index) {
                        continue;
                    }
                    (get_index(obj, index)?, Some(obj))
                }
                SlowTarget::Foreign(f) => {
                    if !foreign_has_element(f.as_ref(), index) {
                        continue;
                    }
                    (foreign_read(f.as_ref(), index)?, None)
                }
            };
            match self.step(index, value, target, callback, this_arg, current_result, view)? {
                MaybeResult::Stop(v) => return Ok(v),
                MaybeResult::Continue(v) => current_result = v,
            }
        }
        Ok(current_result)
    }
}
