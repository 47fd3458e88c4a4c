use crate::core::{InteropError, Value};

#[derive(thiserror::Error, Debug)]
pub enum JSError {
    #[error("Type error: {message}")]
    TypeError { message: String },

    #[error("Range error: {message}")]
    RangeError { message: String },

    #[error("Type error: Detached ArrayBuffer")]
    DetachedBuffer,

    #[error("Interop error in {operation}: {source}")]
    Interop {
        operation: String,
        #[source]
        source: InteropError,
    },

    #[error("Evaluation failed at {method} {file}:{line}: {message}")]
    EvaluationError {
        message: String,
        file: String,
        line: usize,
        method: String,
    },

    #[error("Thrown value: {value:?}")]
    Throw { value: Value },
}

impl JSError {
    pub fn message(&self) -> String {
        match self {
            JSError::TypeError { message } | JSError::RangeError { message } | JSError::EvaluationError { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }

    pub fn interop(operation: &str, source: InteropError) -> Self {
        JSError::Interop {
            operation: operation.to_string(),
            source,
        }
    }

    pub fn is_detached_buffer(&self) -> bool {
        matches!(self, JSError::DetachedBuffer)
    }
}

#[macro_export]
macro_rules! raise_type_error {
    ($msg:expr) => {
        $crate::JSError::TypeError { message: $msg.to_string() }
    };
}

#[macro_export]
macro_rules! raise_range_error {
    ($msg:expr) => {
        $crate::JSError::RangeError { message: $msg.to_string() }
    };
}

// Constructs an EvaluationError carrying the location of the macro call
// site, so `file!()` and `line!()` point at the caller.
#[macro_export]
macro_rules! raise_eval_error {
    ($msg:expr) => {
        $crate::JSError::EvaluationError {
            message: $msg.to_string(),
            file: file!().to_string(),
            line: line!() as usize,
            method: $crate::function_name!().to_string(),
        }
    };
}

#[macro_export]
macro_rules! function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        // remove the trailing "::f"
        name.strip_suffix("::f").unwrap_or(name)
    }};
}
