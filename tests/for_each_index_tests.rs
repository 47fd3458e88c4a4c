use js_traversal::js_array::{create_arguments_object, create_array, create_holey_array, create_sparse_array, set_array_length};
use js_traversal::{
    Direction, ForEachIndexCall, JSError, MaybeResult, PropertyKey, Value, array_prototype_no_elements, call_function, create_data_property,
    delete_property, new_js_object_data,
};
use std::cell::RefCell;
use std::rc::Rc;

// Initialize logger for this integration test binary so `RUST_LOG` is honored.
#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

fn num(v: &Value) -> f64 {
    v.as_number().unwrap_or(f64::NAN)
}

fn invoke(index: u64, value: &Value, target: &Value, callback: &Value, this_arg: &Value, _: &Value) -> Result<Value, JSError> {
    call_function(callback, this_arg, &[value.clone(), Value::Number(index as f64), target.clone()])
}

fn keep_going(_: u64, _: &Value, _: Value, current: Value) -> Result<MaybeResult, JSError> {
    Ok(MaybeResult::continue_result(current))
}

fn sum(_: u64, _: &Value, callback_result: Value, current: Value) -> Result<MaybeResult, JSError> {
    Ok(MaybeResult::continue_result(Value::Number(num(&current) + num(&callback_result))))
}

/// Callback returning the element and recording the index it was called with.
fn recording_callback(visited: &Rc<RefCell<Vec<u64>>>) -> Value {
    let visited = visited.clone();
    Value::native_function("record", move |_: &Value, args: &[Value]| -> Result<Value, JSError> {
        visited.borrow_mut().push(args.get(1).map(num).unwrap_or(-1.0) as u64);
        Ok(args.first().cloned().unwrap_or(Value::Undefined))
    })
}

fn run(target: &Value, direction: Direction, from_index: u64, length: u64) -> (Result<Value, JSError>, Vec<u64>) {
    let visited = Rc::new(RefCell::new(Vec::new()));
    let callback = recording_callback(&visited);
    let result = ForEachIndexCall::new(invoke, sum, direction).execute(target, &callback, &Value::Undefined, from_index, length, Value::from(0));
    let visited = visited.borrow().clone();
    (result, visited)
}

#[test]
fn test_forward_sum_over_dense_array() {
    let arr = Value::Object(create_array(vec![Value::from(10), Value::from(20), Value::from(30)]));
    let (result, visited) = run(&arr, Direction::Forward, 0, 3);
    assert_eq!(num(&result.unwrap()), 60.0);
    assert_eq!(visited, vec![0, 1, 2]);
}

#[test]
fn test_holes_are_never_visited() {
    let arr = Value::Object(create_holey_array(vec![Some(Value::from(10)), None, Some(Value::from(30))]));
    let (result, visited) = run(&arr, Direction::Forward, 0, 3);
    assert_eq!(num(&result.unwrap()), 40.0);
    assert_eq!(visited, vec![0, 2]);
}

#[test]
fn test_backward_from_last_index() {
    let arr = Value::Object(create_array(vec![Value::from(10), Value::from(20), Value::from(30)]));
    let (result, visited) = run(&arr, Direction::Backward, 2, 3);
    assert_eq!(num(&result.unwrap()), 60.0);
    assert_eq!(visited, vec![2, 1, 0]);
}

#[test]
fn test_forward_from_middle_and_backward_from_middle() {
    let arr = Value::Object(create_array((1..=5).map(Value::from).collect()));
    let (_, visited) = run(&arr, Direction::Forward, 2, 5);
    assert_eq!(visited, vec![2, 3, 4]);
    let (_, visited) = run(&arr, Direction::Backward, 1, 5);
    assert_eq!(visited, vec![1, 0]);
    let (result, visited) = run(&arr, Direction::Forward, 5, 5);
    assert_eq!(num(&result.unwrap()), 0.0);
    assert!(visited.is_empty());
}

#[test]
fn test_sparse_array_skips_to_present_elements() {
    let arr = Value::Object(create_sparse_array(100_000, [(5, Value::from(1)), (99_999, Value::from(2))]));
    let (result, visited) = run(&arr, Direction::Forward, 0, 100_000);
    assert_eq!(num(&result.unwrap()), 3.0);
    assert_eq!(visited, vec![5, 99_999]);
    let (_, visited) = run(&arr, Direction::Backward, 99_999, 100_000);
    assert_eq!(visited, vec![99_999, 5]);
}

#[test]
fn test_stop_returns_immediately() {
    let arr = Value::Object(create_array(vec![Value::from(10), Value::from(20), Value::from(30)]));
    let visited = Rc::new(RefCell::new(Vec::new()));
    let callback = recording_callback(&visited);
    let result = ForEachIndexCall::new(
        invoke,
        |_: u64, value: &Value, _: Value, current: Value| -> Result<MaybeResult, JSError> {
            if num(value) == 20.0 {
                Ok(MaybeResult::return_result(value.clone()))
            } else {
                Ok(MaybeResult::continue_result(current))
            }
        },
        Direction::Forward,
    )
    .execute(&arr, &callback, &Value::Undefined, 0, 3, Value::Undefined)
    .unwrap();
    assert_eq!(num(&result), 20.0);
    assert_eq!(*visited.borrow(), vec![0, 1]);
}

#[test]
fn test_callback_errors_propagate_unchanged() {
    let arr = Value::Object(create_array(vec![Value::from(1), Value::from(2)]));
    let calls = Rc::new(RefCell::new(0));
    let seen = calls.clone();
    let callback = Value::native_function("boom", move |_: &Value, _: &[Value]| -> Result<Value, JSError> {
        *seen.borrow_mut() += 1;
        Err(js_traversal::raise_eval_error!("boom"))
    });
    let err = ForEachIndexCall::new(invoke, keep_going, Direction::Forward)
        .execute(&arr, &callback, &Value::Undefined, 0, 2, Value::Undefined)
        .err();
    assert!(matches!(err, Some(JSError::EvaluationError { ref message, .. }) if message == "boom"));
    assert_eq!(*calls.borrow(), 1);

    let callback = Value::native_function("throw", |_: &Value, args: &[Value]| -> Result<Value, JSError> {
        Err(JSError::Throw {
            value: args.first().cloned().unwrap_or(Value::Undefined),
        })
    });
    let err = ForEachIndexCall::new(invoke, keep_going, Direction::Backward)
        .execute(&arr, &callback, &Value::Undefined, 1, 2, Value::Undefined)
        .err();
    assert!(matches!(err, Some(JSError::Throw { value: Value::Number(n) }) if n == 2.0));
}

#[test]
fn test_this_arg_is_passed_to_callback() {
    let arr = Value::Object(create_array(vec![Value::from(1)]));
    let callback = Value::native_function("this", |this: &Value, _: &[Value]| -> Result<Value, JSError> { Ok(this.clone()) });
    let result = ForEachIndexCall::new(
        invoke,
        |_: u64, _: &Value, callback_result: Value, _: Value| -> Result<MaybeResult, JSError> { Ok(MaybeResult::continue_result(callback_result)) },
        Direction::Forward,
    )
    .execute(&arr, &callback, &Value::from("receiver"), 0, 1, Value::Undefined)
    .unwrap();
    assert!(matches!(result, Value::String(ref s) if s == "receiver"));
}

#[test]
fn test_without_callback_the_callback_result_is_this_arg() {
    let arr = Value::Object(create_array(vec![Value::from(1), Value::from(2)]));
    let mut seen = Vec::new();
    ForEachIndexCall::without_callback(
        |index: u64, _: &Value, callback_result: Value, current: Value| -> Result<MaybeResult, JSError> {
            seen.push((index, callback_result));
            Ok(MaybeResult::continue_result(current))
        },
        Direction::Forward,
    )
    .execute(&arr, &Value::Undefined, &Value::from("marker"), 0, 2, Value::Undefined)
    .unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|(_, v)| matches!(v, Value::String(s) if s == "marker")));
}

#[test]
fn test_deleting_a_later_element_prevents_its_visit() {
    let obj = create_array(vec![Value::from(1), Value::from(2), Value::from(3)]);
    let arr = Value::Object(obj.clone());
    let visited = Rc::new(RefCell::new(Vec::new()));
    let log = visited.clone();
    let callback = Value::native_function("delete", move |_: &Value, args: &[Value]| -> Result<Value, JSError> {
        let index = args.get(1).map(num).unwrap_or(-1.0) as u64;
        log.borrow_mut().push(index);
        if index == 0 {
            delete_property(&obj, &PropertyKey::from_index(2));
        }
        Ok(Value::Undefined)
    });
    ForEachIndexCall::new(invoke, keep_going, Direction::Forward)
        .execute(&arr, &callback, &Value::Undefined, 0, 3, Value::Undefined)
        .unwrap();
    assert_eq!(*visited.borrow(), vec![0, 1]);
}

#[test]
fn test_growing_the_array_does_not_extend_the_visit() {
    let obj = create_array(vec![Value::from(1), Value::from(2), Value::from(3)]);
    let arr = Value::Object(obj.clone());
    let visited = Rc::new(RefCell::new(Vec::new()));
    let log = visited.clone();
    let callback = Value::native_function("push", move |_: &Value, args: &[Value]| -> Result<Value, JSError> {
        log.borrow_mut().push(args.get(1).map(num).unwrap_or(-1.0) as u64);
        let len = js_traversal::js_array::get_array_length(&obj).unwrap_or(0);
        create_data_property(&obj, &PropertyKey::from_index(len), Value::from(0))?;
        Ok(Value::Undefined)
    });
    ForEachIndexCall::new(invoke, keep_going, Direction::Forward)
        .execute(&arr, &callback, &Value::Undefined, 0, 3, Value::Undefined)
        .unwrap();
    assert_eq!(*visited.borrow(), vec![0, 1, 2]);
    assert_eq!(js_traversal::js_array::get_array_length(arr.as_object().unwrap()), Some(6));
}

#[test]
fn test_arguments_object_with_lowered_length_is_not_over_read() {
    let args = create_arguments_object(vec![Value::from(1), Value::from(2), Value::from(3), Value::from(4)]);
    set_array_length(&args, 2).unwrap();
    let target = Value::Object(args);
    let (result, visited) = run(&target, Direction::Forward, 0, 2);
    assert_eq!(num(&result.unwrap()), 3.0);
    assert_eq!(visited, vec![0, 1]);
    let (result, visited) = run(&target, Direction::Backward, 1, 2);
    assert_eq!(num(&result.unwrap()), 3.0);
    assert_eq!(visited, vec![1, 0]);
}

#[test]
fn test_array_like_ordinary_object() {
    let obj = new_js_object_data();
    create_data_property(&obj, &PropertyKey::from("length"), Value::from(3)).unwrap();
    create_data_property(&obj, &PropertyKey::from("0"), Value::from(7)).unwrap();
    create_data_property(&obj, &PropertyKey::from("2"), Value::from(9)).unwrap();
    let (result, visited) = run(&Value::Object(obj), Direction::Forward, 0, 3);
    assert_eq!(num(&result.unwrap()), 16.0);
    assert_eq!(visited, vec![0, 2]);
}

#[test]
fn test_plain_arrays_keep_the_fast_path_available() {
    let arr = Value::Object(create_holey_array(vec![Some(Value::from(1)), None]));
    let (result, _) = run(&arr, Direction::Forward, 0, 2);
    assert_eq!(num(&result.unwrap()), 1.0);
    assert!(array_prototype_no_elements().is_valid());
}

#[test]
fn test_primitive_target_is_a_type_error() {
    let (result, visited) = run(&Value::from(42), Direction::Forward, 0, 0);
    assert!(matches!(result, Err(JSError::TypeError { .. })));
    assert!(visited.is_empty());
}
