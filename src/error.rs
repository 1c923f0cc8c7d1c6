//! Error types and the boundary error channel.
//!
//! Two disjoint failure families share the [`Error`] enum: usage errors
//! raised by this layer for API misuse, and [`JsError`] for failures the
//! engine reports (syntax errors and runtime throws).

use std::ffi::{c_char, CStr, CString};

use thiserror::Error;

use crate::engine;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// A script failure reported by the engine: a compile error or a thrown
/// exception.
///
/// `location` and `stack` are `None` when the engine did not provide them;
/// compile errors carry a location but no stack.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
#[error("{message}")]
pub struct JsError {
    /// Human-readable message, e.g. `ReferenceError: add is not defined`.
    pub message: String,
    /// `origin:line:column` of the failure.
    pub location: Option<String>,
    /// Rendered stack trace.
    pub stack: Option<String>,
}

/// Errors that can occur during host operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The script failed to compile or threw.
    #[error(transparent)]
    Script(#[from] JsError),

    /// The engine could not allocate an isolate.
    #[error("failed to create isolate")]
    IsolateCreation,

    /// The owning isolate has already been disposed.
    #[error("isolate has been disposed")]
    IsolateDisposed,

    /// The context has already been disposed.
    #[error("context has been disposed")]
    ContextDisposed,

    /// The value handle has already been disposed.
    #[error("value has been disposed")]
    ValueDisposed,

    /// A host value of this kind cannot be marshaled into the engine.
    #[error("unsupported value kind: {0}")]
    UnsupportedValue(String),

    /// A string argument contained an interior NUL byte.
    #[error("invalid string: {0}")]
    InvalidString(#[from] std::ffi::NulError),

    /// Internal invariant violation (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an unsupported-value error.
    pub fn unsupported_value(kind: impl Into<String>) -> Self {
        Self::UnsupportedValue(kind.into())
    }

    pub(crate) fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if this error came from the script rather than from
    /// API misuse.
    pub fn is_script(&self) -> bool {
        matches!(self, Self::Script(_))
    }

    /// The underlying script error, if any.
    pub fn as_js_error(&self) -> Option<&JsError> {
        match self {
            Self::Script(err) => Some(err),
            _ => None,
        }
    }
}

/// Copy a boundary-owned C string into host memory and release its buffer.
/// Null yields an empty string and releases nothing.
pub(crate) unsafe fn take_string(ptr: *mut c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    let copied = CStr::from_ptr(ptr).to_string_lossy().into_owned();
    drop(CString::from_raw(ptr));
    copied
}

unsafe fn take_opt_string(ptr: *mut c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(take_string(ptr))
    }
}

/// Convert a one-shot boundary error record into a [`JsError`], or
/// recognize "no error" by the absent message. Each present buffer is
/// copied and released exactly once on both paths.
pub(crate) unsafe fn take_error(rtn: engine::RtnError) -> Option<JsError> {
    let message = take_opt_string(rtn.msg)?;
    Some(JsError {
        message,
        location: take_opt_string(rtn.location),
        stack: take_opt_string(rtn.stack),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_error_display_is_message() {
        let err = JsError {
            message: "SyntaxError: Unexpected identifier".into(),
            location: Some("syntax.js:1:5".into()),
            stack: None,
        };
        assert_eq!(err.to_string(), "SyntaxError: Unexpected identifier");

        let err: Error = err.into();
        assert_eq!(err.to_string(), "SyntaxError: Unexpected identifier");
        assert!(err.is_script());
        assert_eq!(
            err.as_js_error().unwrap().location.as_deref(),
            Some("syntax.js:1:5")
        );
    }

    #[test]
    fn test_usage_error_display() {
        assert_eq!(
            Error::IsolateDisposed.to_string(),
            "isolate has been disposed"
        );
        assert_eq!(
            Error::unsupported_value("array").to_string(),
            "unsupported value kind: array"
        );
        assert!(!Error::IsolateDisposed.is_script());
        assert!(Error::IsolateDisposed.as_js_error().is_none());
    }

    #[test]
    fn test_take_error_absent() {
        let none = unsafe {
            take_error(engine::RtnError {
                msg: std::ptr::null_mut(),
                location: std::ptr::null_mut(),
                stack: std::ptr::null_mut(),
            })
        };
        assert!(none.is_none());
    }
}
