use js_traversal::js_array::handle_array_iteration_method;
use js_traversal::{
    CopyDataProperties, Direction, ForEachIndexCall, ForeignObject, ForeignValue, InteropError, JSError, JsonForeignObject, MaybeResult,
    PropertyKey, Value, get, new_js_object_data, own_property_keys,
};
use std::cell::RefCell;
use std::rc::Rc;

// Initialize logger for this integration test binary so `RUST_LOG` is honored.
#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

/// Host object that records every interop message it receives.
#[derive(Default)]
struct RecordingHost {
    null: bool,
    members: Vec<(ForeignValue, ForeignValue)>,
    elements: Option<Vec<Option<ForeignValue>>>,
    broken_index: Option<u64>,
    log: Rc<RefCell<Vec<String>>>,
}

impl RecordingHost {
    fn with_members(members: Vec<(&str, ForeignValue)>) -> Self {
        RecordingHost {
            members: members.into_iter().map(|(k, v)| (ForeignValue::String(k.to_string()), v)).collect(),
            ..Default::default()
        }
    }

    fn with_elements(elements: Vec<Option<ForeignValue>>) -> Self {
        RecordingHost {
            elements: Some(elements),
            ..Default::default()
        }
    }

    fn record(&self, message: String) {
        self.log.borrow_mut().push(message);
    }
}

/// Host array of member names handed out by `RecordingHost::get_members`.
struct KeyList {
    keys: Vec<ForeignValue>,
    log: Rc<RefCell<Vec<String>>>,
}

impl ForeignObject for KeyList {
    fn has_array_elements(&self) -> bool {
        true
    }

    fn get_array_size(&self) -> Result<u64, InteropError> {
        self.log.borrow_mut().push("getArraySize".into());
        Ok(self.keys.len() as u64)
    }

    fn read_array_element(&self, index: u64) -> Result<ForeignValue, InteropError> {
        self.log.borrow_mut().push(format!("readArrayElement({index})"));
        self.keys.get(index as usize).cloned().ok_or(InteropError::InvalidArrayIndex { index })
    }
}

/// String-like host object used as a member key.
struct HostString(&'static str);

impl ForeignObject for HostString {
    fn is_string(&self) -> bool {
        true
    }

    fn as_string(&self) -> Result<String, InteropError> {
        Ok(self.0.to_string())
    }
}

impl ForeignObject for RecordingHost {
    fn is_null(&self) -> bool {
        self.null
    }

    fn get_members(&self) -> Result<ForeignValue, InteropError> {
        self.record("getMembers".into());
        Ok(ForeignValue::Object(Rc::new(KeyList {
            keys: self.members.iter().map(|(k, _)| k.clone()).collect(),
            log: self.log.clone(),
        })))
    }

    fn read_member(&self, name: &str) -> Result<ForeignValue, InteropError> {
        self.record(format!("readMember({name})"));
        self.members
            .iter()
            .find(|(k, _)| js_traversal::foreign_as_string(k).is_ok_and(|k| k == name))
            .map(|(_, v)| v.clone())
            .ok_or_else(|| InteropError::UnknownIdentifier { name: name.to_string() })
    }

    fn has_array_elements(&self) -> bool {
        self.elements.is_some()
    }

    fn get_array_size(&self) -> Result<u64, InteropError> {
        match &self.elements {
            Some(elements) => Ok(elements.len() as u64),
            None => Err(InteropError::UnsupportedMessage { message: "getArraySize" }),
        }
    }

    fn is_array_element_readable(&self, index: u64) -> bool {
        self.elements
            .as_ref()
            .and_then(|e| e.get(index as usize))
            .is_some_and(Option::is_some)
    }

    fn read_array_element(&self, index: u64) -> Result<ForeignValue, InteropError> {
        self.record(format!("readArrayElement({index})"));
        if self.broken_index == Some(index) {
            return Err(InteropError::InvalidArrayIndex { index });
        }
        self.elements
            .as_ref()
            .and_then(|e| e.get(index as usize))
            .cloned()
            .flatten()
            .ok_or(InteropError::InvalidArrayIndex { index })
    }
}

fn keys(obj: &js_traversal::JSObjectDataPtr) -> Vec<String> {
    own_property_keys(obj).iter().map(|k| k.to_string()).collect()
}

fn collect_elements(target: &Value, length: u64) -> Result<Vec<(u64, Value)>, JSError> {
    let mut seen = Vec::new();
    ForEachIndexCall::without_callback(
        |index: u64, value: &Value, _: Value, current: Value| -> Result<MaybeResult, JSError> {
            seen.push((index, value.clone()));
            Ok(MaybeResult::continue_result(current))
        },
        Direction::Forward,
    )
    .execute(target, &Value::Undefined, &Value::Undefined, 0, length, Value::Undefined)?;
    Ok(seen)
}

#[test]
fn test_foreign_members_are_imported_once_in_order() {
    let host = RecordingHost::with_members(vec![("x", ForeignValue::Int(1)), ("y", ForeignValue::String("s".into()))]);
    let log = host.log.clone();
    let target = CopyDataProperties::new(false)
        .execute(new_js_object_data(), &Value::Foreign(Rc::new(host)))
        .unwrap();
    assert_eq!(keys(&target), vec!["x", "y"]);
    assert!(matches!(get(&target, &PropertyKey::from("x")), Ok(Value::Number(n)) if n == 1.0));
    assert!(matches!(get(&target, &PropertyKey::from("y")), Ok(Value::String(ref s)) if s == "s"));
    assert_eq!(
        *log.borrow(),
        vec![
            "getMembers",
            "getArraySize",
            "readArrayElement(0)",
            "readMember(x)",
            "readArrayElement(1)",
            "readMember(y)"
        ]
    );
}

#[test]
fn test_excluded_foreign_member_is_not_read() {
    let host = RecordingHost::with_members(vec![("x", ForeignValue::Byte(-3)), ("y", ForeignValue::Char('q'))]);
    let log = host.log.clone();
    let target = CopyDataProperties::new(true)
        .execute_excluding(new_js_object_data(), &Value::Foreign(Rc::new(host)), &[PropertyKey::from("x")])
        .unwrap();
    assert_eq!(keys(&target), vec!["y"]);
    assert!(matches!(get(&target, &PropertyKey::from("y")), Ok(Value::String(ref s)) if s == "q"));
    assert!(!log.borrow().iter().any(|m| m == "readMember(x)"));
}

#[test]
fn test_string_like_member_keys_are_coerced() {
    let mut host = RecordingHost::with_members(vec![]);
    host.members = vec![(ForeignValue::Object(Rc::new(HostString("k"))), ForeignValue::Short(300))];
    let target = CopyDataProperties::new(false)
        .execute(new_js_object_data(), &Value::Foreign(Rc::new(host)))
        .unwrap();
    assert!(matches!(get(&target, &PropertyKey::from("k")), Ok(Value::Number(n)) if n == 300.0));
}

#[test]
fn test_null_foreign_source_copies_nothing() {
    let host = RecordingHost {
        null: true,
        ..RecordingHost::with_members(vec![("x", ForeignValue::Int(1))])
    };
    let log = host.log.clone();
    let target = CopyDataProperties::new(false)
        .execute(new_js_object_data(), &Value::Foreign(Rc::new(host)))
        .unwrap();
    assert!(keys(&target).is_empty());
    assert!(log.borrow().is_empty());
}

#[test]
fn test_member_read_failure_is_tagged_with_the_operation() {
    let mut host = RecordingHost::with_members(vec![("x", ForeignValue::Int(1))]);
    host.members.push((ForeignValue::Long(5), ForeignValue::Int(2)));
    let err = CopyDataProperties::new(false)
        .execute(new_js_object_data(), &Value::Foreign(Rc::new(host)))
        .err();
    match err {
        Some(JSError::Interop { operation, source }) => {
            assert_eq!(operation, "CopyDataProperties");
            assert_eq!(source, InteropError::UnsupportedMessage { message: "asString" });
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_json_source_keeps_nested_values_foreign() {
    let source = JsonForeignObject::into_value(serde_json::json!({"b": 1, "a": {"c": 2}, "n": null}));
    let target = CopyDataProperties::new(false).execute(new_js_object_data(), &source).unwrap();
    assert_eq!(keys(&target), vec!["b", "a", "n"]);
    assert!(matches!(get(&target, &PropertyKey::from("a")), Ok(Value::Foreign(_))));
    assert!(matches!(get(&target, &PropertyKey::from("n")), Ok(Value::Null)));
}

#[test]
fn test_traversal_skips_unreadable_foreign_elements() {
    let host = RecordingHost::with_elements(vec![Some(ForeignValue::Int(1)), None, Some(ForeignValue::Char('c'))]);
    let seen = collect_elements(&Value::Foreign(Rc::new(host)), 3).unwrap();
    assert_eq!(seen.len(), 2);
    assert!(matches!(seen[0], (0, Value::Number(n)) if n == 1.0));
    assert!(matches!(seen[1], (2, Value::String(ref s)) if s == "c"));
}

#[test]
fn test_foreign_read_failure_aborts_traversal() {
    let mut host = RecordingHost::with_elements(vec![Some(ForeignValue::Int(1)), Some(ForeignValue::Int(2)), Some(ForeignValue::Int(3))]);
    host.broken_index = Some(1);
    let log = host.log.clone();
    let err = collect_elements(&Value::Foreign(Rc::new(host)), 3).err();
    assert!(matches!(
        err,
        Some(JSError::Interop { ref operation, source: InteropError::InvalidArrayIndex { index: 1 } }) if operation == "ForEachIndex"
    ));
    assert!(!log.borrow().iter().any(|m| m == "readArrayElement(2)"));
}

#[test]
fn test_foreign_without_array_elements_returns_initial_result() {
    let host = RecordingHost::with_members(vec![("x", ForeignValue::Int(1))]);
    let log = host.log.clone();
    let result = ForEachIndexCall::without_callback(
        |_: u64, _: &Value, _: Value, _: Value| -> Result<MaybeResult, JSError> { panic!("no element should be visited") },
        Direction::Backward,
    )
    .execute(&Value::Foreign(Rc::new(host)), &Value::Undefined, &Value::Undefined, 4, 5, Value::from("initial"))
    .unwrap();
    assert!(matches!(result, Value::String(ref s) if s == "initial"));
    assert!(log.borrow().is_empty());
}

#[test]
fn test_array_builtins_over_json_arrays() {
    let numbers = JsonForeignObject::into_value(serde_json::json!([1, 2, 3]));
    let add = Value::native_function("add", |_: &Value, args: &[Value]| -> Result<Value, JSError> {
        let a = args[0].as_number().unwrap_or(f64::NAN);
        let b = args[1].as_number().unwrap_or(f64::NAN);
        Ok(Value::Number(a + b))
    });
    let sum = handle_array_iteration_method("reduce", &numbers, &[add]).unwrap();
    assert!(matches!(sum, Value::Number(n) if n == 6.0));
    let found = handle_array_iteration_method("lastIndexOf", &numbers, &[Value::from(2)]).unwrap();
    assert!(matches!(found, Value::Number(n) if n == 1.0));
}
