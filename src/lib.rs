pub(crate) mod core;
pub(crate) mod error;
pub mod js_array;
pub mod js_object;
pub mod js_typedarray;

pub use core::{
    ArrayStorage, Assumption, CallbackNode, CopyDataProperties, Direction, ForEachIndexCall, ForeignObject, ForeignValue, InteropError,
    JSArray, JSArrayBuffer, JSArrayBufferPtr, JSFunction, JSObjectData, JSObjectDataPtr, JSTypedArray, JsonForeignObject, MAX_ARRAY_INDEX,
    MAX_SAFE_INTEGER, MaybeResult, MaybeResultNode, NativeFn, NoCallback, ObjectKind, PropertyDescriptor, PropertyKey, PropertySlot,
    SymbolData, TypedArrayKind, Value, array_prototype_no_elements, call_function, create_data_property, define_accessor, delete_property,
    foreign_as_string, get, get_index, get_own_property, get_own_property_descriptor, has_own_property, has_property, identical,
    import_foreign_value, is_array_index, is_callable, is_integer_index, new_js_object_data, own_property_keys, parse_array_index,
    set_prototype, to_number, type_of, typed_array_not_detached,
};
pub use error::JSError;
