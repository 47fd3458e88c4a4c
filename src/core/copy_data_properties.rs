//! `CopyDataProperties`: copies the own enumerable properties of a source
//! onto a target, as used by object spread and object rest.

use crate::JSError;
use crate::core::{
    ForeignObject, ForeignValue, InteropError, JSObjectDataPtr, PropertyKey, Value, create_data_property, foreign_as_string, get,
    get_own_property_descriptor, import_foreign_value, own_property_keys,
};

#[derive(Clone, Copy, Debug)]
pub struct CopyDataProperties {
    with_excluded: bool,
}

impl CopyDataProperties {
    /// When `with_excluded` is false the excluded-key list is never looked at.
    pub fn new(with_excluded: bool) -> Self {
        CopyDataProperties { with_excluded }
    }

    pub fn execute(&self, target: JSObjectDataPtr, source: &Value) -> Result<JSObjectDataPtr, JSError> {
        self.execute_excluding(target, source, &[])
    }

    pub fn execute_excluding(&self, target: JSObjectDataPtr, source: &Value, excluded: &[PropertyKey]) -> Result<JSObjectDataPtr, JSError> {
        match source {
            Value::Object(obj) => self.copy_from_object(&target, obj, excluded)?,
            Value::Foreign(f) => self.copy_from_foreign(&target, f.as_ref(), excluded)?,
            Value::String(s) => {
                // one index per UTF-16 code unit; a lone surrogate half reads as U+FFFD
                for (i, unit) in s.encode_utf16().enumerate() {
                    let key = PropertyKey::from_index(i as u64);
                    if !self.is_excluded(excluded, &key) {
                        create_data_property(&target, &key, Value::String(String::from_utf16_lossy(&[unit])))?;
                    }
                }
            }
            // undefined, null and the remaining primitives have nothing to copy
            _ => {}
        }
        Ok(target)
    }

    fn is_excluded(&self, excluded: &[PropertyKey], key: &PropertyKey) -> bool {
        self.with_excluded && excluded.contains(key)
    }

    fn copy_from_object(&self, target: &JSObjectDataPtr, source: &JSObjectDataPtr, excluded: &[PropertyKey]) -> Result<(), JSError> {
        for key in own_property_keys(source) {
            if self.is_excluded(excluded, &key) {
                continue;
            }
            // the descriptor is re-read per key: an earlier getter may have deleted it
            let Some(desc) = get_own_property_descriptor(source, &key) else {
                continue;
            };
            if desc.is_enumerable() {
                let value = get(source, &key)?;
                create_data_property(target, &key, value)?;
            }
        }
        Ok(())
    }

    fn copy_from_foreign(&self, target: &JSObjectDataPtr, source: &dyn ForeignObject, excluded: &[PropertyKey]) -> Result<(), JSError> {
        if source.is_null() {
            return Ok(());
        }
        self.copy_foreign_members(target, source, excluded).map_err(|e| match e {
            ForeignCopyError::Interop(e) => JSError::interop("CopyDataProperties", e),
            ForeignCopyError::Js(e) => e,
        })
    }

    fn copy_foreign_members(&self, target: &JSObjectDataPtr, source: &dyn ForeignObject, excluded: &[PropertyKey]) -> Result<(), ForeignCopyError> {
        let members = match source.get_members()? {
            ForeignValue::Object(members) => members,
            _ => return Err(InteropError::UnsupportedMessage { message: "getArraySize" }.into()),
        };
        let size = members.get_array_size()?;
        log::trace!("copying {size} host members");
        for i in 0..size {
            let name = foreign_as_string(&members.read_array_element(i)?)?;
            let key = PropertyKey::from(name.as_str());
            if self.is_excluded(excluded, &key) {
                continue;
            }
            let value = import_foreign_value(source.read_member(&name)?);
            create_data_property(target, &key, value)?;
        }
        Ok(())
    }
}

// Keeps host failures apart from engine errors raised while defining the
// copied properties, so only the former are reported as interop errors.
enum ForeignCopyError {
    Interop(InteropError),
    Js(JSError),
}

impl From<InteropError> for ForeignCopyError {
    fn from(e: InteropError) -> Self {
        ForeignCopyError::Interop(e)
    }
}

impl From<JSError> for ForeignCopyError {
    fn from(e: JSError) -> Self {
        ForeignCopyError::Js(e)
    }
}
