//! Execution contexts: independent global scopes inside an isolate.

use std::cell::Cell;
use std::ffi::CString;
use std::ptr;
use std::rc::Rc;

use tracing::debug;

use crate::convert::Primitive;
use crate::engine;
use crate::error::{Error, Result};
use crate::isolate::{Isolate, IsolateState};
use crate::value::Value;

/// A script execution context with its own global object.
///
/// Contexts within one isolate are fully independent: globals defined in
/// one are invisible to the others. A context keeps its isolate's state
/// alive, so an isolate created implicitly by [`Context::new`] lives as
/// long as the context does.
pub struct Context {
    pub(crate) isolate: Rc<IsolateState>,
    raw: Cell<*mut engine::RawContext>,
}

impl Context {
    /// Create a context in `isolate`, or in a fresh implicit isolate when
    /// `None` is given.
    pub fn new(isolate: Option<&Isolate>) -> Result<Context> {
        let state = match isolate {
            Some(iso) => Rc::clone(&iso.state),
            None => Isolate::new()?.state,
        };
        let iso_ptr = state.raw()?;
        let raw = unsafe { engine::new_context(iso_ptr) };
        if raw.is_null() {
            return Err(Error::internal("context creation failed"));
        }
        debug!("created context");
        Ok(Context {
            isolate: state,
            raw: Cell::new(raw),
        })
    }

    /// The isolate this context runs in. Fails with
    /// [`Error::IsolateDisposed`] once the isolate is gone.
    pub fn isolate(&self) -> Result<Isolate> {
        self.isolate.raw()?;
        Ok(Isolate {
            state: Rc::clone(&self.isolate),
        })
    }

    /// Fails if the context or its isolate has been disposed.
    pub(crate) fn ensure_live(&self) -> Result<()> {
        self.live().map(|_| ())
    }

    fn live(&self) -> Result<*mut engine::RawContext> {
        self.isolate.raw()?;
        let ptr = self.raw.get();
        if ptr.is_null() {
            Err(Error::ContextDisposed)
        } else {
            Ok(ptr)
        }
    }

    /// Compile and run `source`, tagged with `origin` for error locations.
    /// Returns the value of the script's final expression.
    pub fn run_script(&self, source: &str, origin: &str) -> Result<Value> {
        let ptr = self.live()?;
        let source = CString::new(source)?;
        let origin = CString::new(origin)?;
        debug!("running script");
        let rtn = unsafe { engine::run_script(ptr, source.as_ptr(), origin.as_ptr()) };
        drop(source);
        drop(origin);
        Value::from_rtn(&self.isolate, rtn)
    }

    /// A handle to this context's global object.
    pub fn global(&self) -> Result<Value> {
        let ptr = self.live()?;
        let raw = unsafe { engine::context_global(ptr) };
        Value::from_raw(&self.isolate, raw)
            .ok_or_else(|| Error::internal("global object handle was null"))
    }

    /// Create an engine value from a host primitive.
    pub fn create<T: Into<Primitive>>(&self, value: T) -> Result<Value> {
        self.create_primitive(value.into())
    }

    /// Create an engine value from an already-built [`Primitive`].
    pub fn create_primitive(&self, value: Primitive) -> Result<Value> {
        let ptr = self.live()?;
        let raw = match value {
            Primitive::Undefined => {
                unsafe { engine::context_create(ptr, engine::TaggedValue::Undefined) }
            }
            Primitive::Bool(b) => {
                unsafe { engine::context_create(ptr, engine::TaggedValue::Bool(b)) }
            }
            Primitive::Number(n) => {
                unsafe { engine::context_create(ptr, engine::TaggedValue::Float64(n)) }
            }
            Primitive::String(s) => {
                let len = s.len();
                let buf = CString::new(s)?;
                let raw = unsafe {
                    engine::context_create(
                        ptr,
                        engine::TaggedValue::String {
                            data: buf.as_ptr(),
                            len: len as std::ffi::c_int,
                        },
                    )
                };
                drop(buf);
                raw
            }
        };
        Value::from_raw(&self.isolate, raw)
            .ok_or_else(|| Error::internal("value creation failed"))
    }

    /// Create an engine value from a dynamic JSON value. Only scalar
    /// values are supported; arrays and objects are rejected.
    #[cfg(feature = "serde-support")]
    pub fn create_json(&self, value: &serde_json::Value) -> Result<Value> {
        self.create_primitive(Primitive::try_from(value)?)
    }

    /// Release the context. Safe to call multiple times; values created
    /// in the context remain owned by the isolate.
    pub fn close(&self) {
        let ptr = self.raw.replace(ptr::null_mut());
        if !ptr.is_null() {
            debug!("closing context");
            unsafe { engine::context_dispose(ptr) };
        }
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("disposed", &self.raw.get().is_null())
            .finish()
    }
}
