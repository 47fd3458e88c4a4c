use crate::core::{CopyDataProperties, JSObjectDataPtr, PropertyKey, Value, new_js_object_data};
use crate::error::JSError;
use crate::raise_type_error;

/// `{ ...source }` into an existing target. `null`/`undefined` sources are
/// skipped.
pub fn object_spread(target: JSObjectDataPtr, source: &Value) -> Result<JSObjectDataPtr, JSError> {
    CopyDataProperties::new(false).execute(target, source)
}

/// `const { a, b, ...rest } = source`: a fresh object holding every own
/// enumerable property of `source` except the `excluded` keys.
pub fn object_rest(source: &Value, excluded: &[PropertyKey]) -> Result<JSObjectDataPtr, JSError> {
    if source.is_null_or_undefined() {
        return Err(raise_type_error!(format!("Cannot destructure '{source:?}' as it is {source:?}")));
    }
    log::trace!("object rest excluding {} keys", excluded.len());
    CopyDataProperties::new(true).execute_excluding(new_js_object_data(), source, excluded)
}
