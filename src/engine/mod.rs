//! The embedded JavaScript engine and its boundary API.
//!
//! Everything above this module treats the engine as an external
//! collaborator reached through the C-shaped calls below: opaque raw
//! handles in, `RtnValue`/`RtnError` records out. Strings crossing the
//! boundary are NUL-terminated heap buffers whose ownership transfers to
//! the caller exactly once; input string buffers stay owned by the caller
//! and are only borrowed for the duration of a call.

mod interp;
mod lexer;
mod parser;
mod value;

use std::ffi::{c_char, c_int, CStr, CString};
use std::ptr;
use std::rc::Rc;
use std::slice;

use interp::{ExecError, Throw};
use value::{JsObject, JsValue};

/// One engine instance. Opaque to the host layer.
pub(crate) struct RawIsolate {
    _priv: (),
}

/// One execution environment: a global object scoped to its isolate.
pub(crate) struct RawContext {
    global: Rc<JsObject>,
}

/// An engine-owned value handle. Carries the global object of the context
/// that produced it so calls can resolve their default receiver.
pub(crate) struct RawValue {
    value: JsValue,
    global: Rc<JsObject>,
}

/// Error record returned by fallible boundary calls. All fields are either
/// populated heap C strings (ownership transfers to the caller) or null;
/// a null `msg` means "no error".
#[derive(Debug)]
pub(crate) struct RtnError {
    pub msg: *mut c_char,
    pub location: *mut c_char,
    pub stack: *mut c_char,
}

impl RtnError {
    fn none() -> Self {
        Self {
            msg: ptr::null_mut(),
            location: ptr::null_mut(),
            stack: ptr::null_mut(),
        }
    }
}

/// Value-or-error pair returned by fallible boundary calls. Exactly one
/// side is populated.
#[derive(Debug)]
pub(crate) struct RtnValue {
    pub value: *mut RawValue,
    pub error: RtnError,
}

/// The closed set of primitives the host may hand across the boundary.
/// String data is borrowed from the caller; the engine copies it before
/// returning.
#[derive(Debug)]
pub(crate) enum TaggedValue {
    Undefined,
    Bool(bool),
    Float64(f64),
    String { data: *const c_char, len: c_int },
}

/// Copy a Rust string into a caller-owned C buffer. Interior NUL bytes
/// cannot be represented and are stripped.
fn copy_string(s: &str) -> *mut c_char {
    let bytes: Vec<u8> = s.bytes().filter(|&b| b != 0).collect();
    // SAFETY: interior NULs were stripped above.
    unsafe { CString::from_vec_unchecked(bytes) }.into_raw()
}

fn error_only(msg: &str) -> RtnError {
    RtnError {
        msg: copy_string(msg),
        location: ptr::null_mut(),
        stack: ptr::null_mut(),
    }
}

fn throw_error(throw: Throw) -> RtnError {
    RtnError {
        location: copy_string(&throw.location()),
        stack: copy_string(&throw.stack()),
        msg: copy_string(&throw.message),
    }
}

fn exec_error(err: ExecError, origin: &str) -> RtnError {
    match err {
        ExecError::Syntax(syntax) => RtnError {
            msg: copy_string(&syntax.message),
            location: copy_string(&format!("{}:{}:{}", origin, syntax.line, syntax.col)),
            stack: ptr::null_mut(),
        },
        ExecError::Throw(throw) => throw_error(throw),
    }
}

fn wrap_value(global: &Rc<JsObject>, value: JsValue) -> *mut RawValue {
    Box::into_raw(Box::new(RawValue {
        value,
        global: Rc::clone(global),
    }))
}

pub(crate) fn new_isolate() -> *mut RawIsolate {
    Box::into_raw(Box::new(RawIsolate { _priv: () }))
}

/// # Safety
/// `ptr` must be null or a live handle from [`new_isolate`]; it is dead
/// after this call.
pub(crate) unsafe fn isolate_dispose(ptr: *mut RawIsolate) {
    if ptr.is_null() {
        return;
    }
    drop(Box::from_raw(ptr));
}

/// # Safety
/// `isolate` must be a live handle from [`new_isolate`].
pub(crate) unsafe fn new_context(_isolate: *mut RawIsolate) -> *mut RawContext {
    Box::into_raw(Box::new(RawContext {
        global: JsObject::new(),
    }))
}

/// # Safety
/// `ptr` must be null or a live handle from [`new_context`]; it is dead
/// after this call.
pub(crate) unsafe fn context_dispose(ptr: *mut RawContext) {
    if ptr.is_null() {
        return;
    }
    drop(Box::from_raw(ptr));
}

/// Compile and execute `source` against the context. `origin` labels the
/// script in diagnostics.
///
/// # Safety
/// `ctx` must be a live context handle; `source` and `origin` must be valid
/// NUL-terminated strings that outlive the call.
pub(crate) unsafe fn run_script(
    ctx: *mut RawContext,
    source: *const c_char,
    origin: *const c_char,
) -> RtnValue {
    let ctx = &*ctx;
    let source = CStr::from_ptr(source).to_string_lossy();
    let origin = CStr::from_ptr(origin).to_string_lossy();
    match interp::run_script(&ctx.global, &source, &origin) {
        Ok(value) => RtnValue {
            value: wrap_value(&ctx.global, value),
            error: RtnError::none(),
        },
        Err(err) => RtnValue {
            value: ptr::null_mut(),
            error: exec_error(err, &origin),
        },
    }
}

/// # Safety
/// `ctx` must be a live context handle.
pub(crate) unsafe fn context_global(ctx: *mut RawContext) -> *mut RawValue {
    let ctx = &*ctx;
    wrap_value(&ctx.global, JsValue::Object(Rc::clone(&ctx.global)))
}

/// # Safety
/// `ctx` must be a live context handle; a `String` payload must point at
/// `len` valid bytes that outlive the call.
pub(crate) unsafe fn context_create(ctx: *mut RawContext, val: TaggedValue) -> *mut RawValue {
    let ctx = &*ctx;
    let value = match val {
        TaggedValue::Undefined => JsValue::Undefined,
        TaggedValue::Bool(b) => JsValue::Bool(b),
        TaggedValue::Float64(f) => JsValue::Number(f),
        TaggedValue::String { data, len } => {
            let bytes = slice::from_raw_parts(data as *const u8, len as usize);
            JsValue::string(String::from_utf8_lossy(bytes))
        }
    };
    wrap_value(&ctx.global, value)
}

/// # Safety
/// `ptr` must be a live value handle; `field` a valid NUL-terminated string.
pub(crate) unsafe fn value_get(ptr: *mut RawValue, field: *const c_char) -> RtnValue {
    let raw = &*ptr;
    let field = CStr::from_ptr(field).to_string_lossy();
    match &raw.value {
        JsValue::Object(obj) => RtnValue {
            value: wrap_value(&raw.global, obj.get(&field).unwrap_or(JsValue::Undefined)),
            error: RtnError::none(),
        },
        _ => RtnValue {
            value: ptr::null_mut(),
            error: error_only("Not an object"),
        },
    }
}

/// # Safety
/// `ptr` and `value` must be live value handles; `field` a valid
/// NUL-terminated string.
pub(crate) unsafe fn value_set(
    ptr: *mut RawValue,
    field: *const c_char,
    value: *mut RawValue,
) -> RtnError {
    let raw = &*ptr;
    let field = CStr::from_ptr(field).to_string_lossy();
    match &raw.value {
        JsValue::Object(obj) => {
            obj.set(field.into_owned(), (*value).value.clone());
            RtnError::none()
        }
        _ => error_only("Not an object"),
    }
}

/// Invoke a value as a function. A null `recv` means "no explicit
/// receiver" and resolves to the context's global object.
///
/// # Safety
/// `func` must be a live value handle; `argv` must point at `argc` live
/// value handles (the buffer itself must be non-null even when `argc` is
/// zero); `recv` must be null or a live value handle.
pub(crate) unsafe fn value_call(
    func: *mut RawValue,
    recv: *mut RawValue,
    argc: c_int,
    argv: *const *mut RawValue,
) -> RtnValue {
    let raw = &*func;
    let function = match &raw.value {
        JsValue::Function(f) => Rc::clone(f),
        _ => {
            return RtnValue {
                value: ptr::null_mut(),
                error: error_only("Not a function"),
            }
        }
    };

    let this = if recv.is_null() {
        JsValue::Object(Rc::clone(&raw.global))
    } else {
        (*recv).value.clone()
    };

    let mut args = Vec::with_capacity(argc as usize);
    for i in 0..argc as usize {
        let arg = *argv.add(i);
        args.push((*arg).value.clone());
    }

    match interp::call_function(&raw.global, &function, this, args) {
        Ok(value) => RtnValue {
            value: wrap_value(&raw.global, value),
            error: RtnError::none(),
        },
        Err(throw) => RtnValue {
            value: ptr::null_mut(),
            error: throw_error(throw),
        },
    }
}

/// Stringify a value. The returned buffer's ownership transfers to the
/// caller.
///
/// # Safety
/// `ptr` must be a live value handle.
pub(crate) unsafe fn value_to_string(ptr: *mut RawValue) -> *mut c_char {
    copy_string(&(*ptr).value.to_js_string())
}

/// # Safety
/// `ptr` must be a live value handle.
pub(crate) unsafe fn value_to_bool(ptr: *mut RawValue) -> c_int {
    (*ptr).value.truthy() as c_int
}

/// # Safety
/// `ptr` must be a live value handle.
pub(crate) unsafe fn value_to_int64(ptr: *mut RawValue) -> i64 {
    (*ptr).value.to_int64()
}

/// # Safety
/// `ptr` must be a live value handle.
pub(crate) unsafe fn value_to_float64(ptr: *mut RawValue) -> f64 {
    (*ptr).value.to_number()
}

/// # Safety
/// `ptr` must be null or a live value handle; it is dead after this call.
pub(crate) unsafe fn value_dispose(ptr: *mut RawValue) {
    if ptr.is_null() {
        return;
    }
    drop(Box::from_raw(ptr));
}
