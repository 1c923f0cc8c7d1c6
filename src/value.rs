//! Value handles and the engine-to-host half of the marshaling protocol.

use std::cell::Cell;
use std::ffi::{c_int, CString};
use std::fmt;
use std::ptr;
use std::rc::Rc;

use tracing::trace;

use crate::context::Context;
use crate::engine;
use crate::error::{self, Error, Result};
use crate::isolate::IsolateState;

/// A handle to an engine-owned value: a primitive, object, or function.
///
/// The handle is scoped to the isolate that produced it; once that isolate
/// is disposed, fallible operations fail with [`Error::IsolateDisposed`].
/// Disposal is exactly-once: [`Value::dispose`] is explicit and idempotent,
/// and `Drop` releases forgotten handles. The coercive readers mirror the
/// engine's own conversion rules and never fail.
pub struct Value {
    isolate: Rc<IsolateState>,
    raw: Cell<*mut engine::RawValue>,
}

impl Value {
    /// Wrap a boundary result. A null handle is absence, never a live
    /// value.
    pub(crate) fn from_raw(isolate: &Rc<IsolateState>, ptr: *mut engine::RawValue) -> Option<Value> {
        if ptr.is_null() {
            None
        } else {
            Some(Value {
                isolate: Rc::clone(isolate),
                raw: Cell::new(ptr),
            })
        }
    }

    /// Convert a boundary value-or-error pair into a result, consuming the
    /// record. A populated error with a populated value would violate the
    /// boundary contract; the value is released and the error wins.
    pub(crate) fn from_rtn(isolate: &Rc<IsolateState>, rtn: engine::RtnValue) -> Result<Value> {
        // SAFETY: the record was just returned by the boundary and its
        // error strings have not been taken yet.
        let error = unsafe { error::take_error(rtn.error) };
        match (Self::from_raw(isolate, rtn.value), error) {
            (Some(value), None) => Ok(value),
            (None, Some(err)) => Err(Error::Script(err)),
            (Some(value), Some(err)) => {
                value.dispose();
                Err(Error::Script(err))
            }
            (None, None) => Err(Error::internal(
                "boundary call returned neither a value nor an error",
            )),
        }
    }

    fn live(&self) -> Result<*mut engine::RawValue> {
        self.isolate.raw()?;
        let ptr = self.raw.get();
        if ptr.is_null() {
            Err(Error::ValueDisposed)
        } else {
            Ok(ptr)
        }
    }

    /// Get a named property. Fails if this value is not an object.
    pub fn get(&self, name: &str) -> Result<Value> {
        let ptr = self.live()?;
        let field = CString::new(name)?;
        let rtn = unsafe { engine::value_get(ptr, field.as_ptr()) };
        Self::from_rtn(&self.isolate, rtn)
    }

    /// Set a named property. Fails if this value is not an object.
    pub fn set(&self, name: &str, value: &Value) -> Result<()> {
        let ptr = self.live()?;
        let value_ptr = value.live()?;
        let field = CString::new(name)?;
        let err = unsafe { engine::value_set(ptr, field.as_ptr(), value_ptr) };
        match unsafe { error::take_error(err) } {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Invoke this value as a function in `context`. An absent `recv`
    /// means "no explicit receiver": the callee sees the context's global
    /// object as `this`.
    ///
    /// Fails if this value is not callable or if the callee throws.
    pub fn call(&self, context: &Context, recv: Option<&Value>, args: &[&Value]) -> Result<Value> {
        context.ensure_live()?;
        let func = self.live()?;
        let recv_ptr = match recv {
            Some(value) => value.live()?,
            None => ptr::null_mut(),
        };

        // One extra slot keeps the buffer allocated even for zero
        // arguments, so the boundary never sees a dangling pointer.
        let mut argv: Vec<*mut engine::RawValue> = Vec::with_capacity(args.len() + 1);
        for arg in args {
            argv.push(arg.live()?);
        }
        argv.push(ptr::null_mut());

        trace!(argc = args.len(), "calling value");
        let rtn =
            unsafe { engine::value_call(func, recv_ptr, args.len() as c_int, argv.as_ptr()) };
        Self::from_rtn(&self.isolate, rtn)
    }

    /// The string representation of the value. Primitives print their
    /// value, objects print a generic placeholder, functions print their
    /// definition.
    pub fn as_string(&self) -> String {
        let Ok(ptr) = self.live() else {
            return "undefined".to_string();
        };
        let buf = unsafe { engine::value_to_string(ptr) };
        // SAFETY: ownership of the buffer transferred on return.
        unsafe { error::take_string(buf) }
    }

    /// Coerce to a boolean using the engine's truthiness rules.
    pub fn as_bool(&self) -> bool {
        match self.live() {
            Ok(ptr) => unsafe { engine::value_to_bool(ptr) == 1 },
            Err(_) => false,
        }
    }

    /// Coerce to an integer; non-numeric values yield zero.
    pub fn as_int64(&self) -> i64 {
        match self.live() {
            Ok(ptr) => unsafe { engine::value_to_int64(ptr) },
            Err(_) => 0,
        }
    }

    /// Coerce to a float; non-numeric values yield NaN.
    pub fn as_float64(&self) -> f64 {
        match self.live() {
            Ok(ptr) => unsafe { engine::value_to_float64(ptr) },
            Err(_) => f64::NAN,
        }
    }

    /// Release the underlying handle. Safe to call multiple times; the
    /// second call is a no-op.
    pub fn dispose(&self) {
        let ptr = self.raw.replace(ptr::null_mut());
        if !ptr.is_null() {
            // SAFETY: the cell held the sole live handle and was just
            // emptied, so this release happens exactly once.
            unsafe { engine::value_dispose(ptr) };
        }
    }
}

impl Drop for Value {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Value").field(&self.as_string()).finish()
    }
}
