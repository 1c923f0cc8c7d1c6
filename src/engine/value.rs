//! Engine value representation and the ECMAScript coercion rules the
//! boundary's `to_*` calls rely on.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::parser::{Expr, Stmt};

/// A property container. Also backs each context's global object.
#[derive(Debug, Default)]
pub(crate) struct JsObject {
    props: RefCell<HashMap<String, JsValue>>,
}

impl JsObject {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn get(&self, name: &str) -> Option<JsValue> {
        self.props.borrow().get(name).cloned()
    }

    pub fn set(&self, name: impl Into<String>, value: JsValue) {
        self.props.borrow_mut().insert(name.into(), value);
    }

    #[cfg(test)]
    pub fn has(&self, name: &str) -> bool {
        self.props.borrow().contains_key(name)
    }
}

/// A script function: parameters, body, and the exact source slice it was
/// parsed from (its `toString` rendering).
#[derive(Debug)]
pub(crate) struct JsFunction {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: FuncBody,
    pub source: String,
    /// Origin label of the script that defined the function, kept for
    /// diagnostics on errors thrown inside the body.
    pub origin: String,
}

#[derive(Debug)]
pub(crate) enum FuncBody {
    Expr(Expr),
    Block(Vec<Stmt>),
}

/// A value in the engine's heap. Cheap to clone; compound values share
/// their backing store.
#[derive(Debug, Clone)]
pub(crate) enum JsValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Object(Rc<JsObject>),
    Function(Rc<JsFunction>),
}

impl JsValue {
    pub fn string(s: impl AsRef<str>) -> Self {
        JsValue::String(Rc::from(s.as_ref()))
    }

    /// ToBoolean.
    pub fn truthy(&self) -> bool {
        match self {
            JsValue::Undefined | JsValue::Null => false,
            JsValue::Bool(b) => *b,
            JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
            JsValue::String(s) => !s.is_empty(),
            JsValue::Object(_) | JsValue::Function(_) => true,
        }
    }

    /// ToNumber. Objects and functions have no primitive conversion here
    /// and coerce to NaN.
    pub fn to_number(&self) -> f64 {
        match self {
            JsValue::Undefined => f64::NAN,
            JsValue::Null => 0.0,
            JsValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            JsValue::Number(n) => *n,
            JsValue::String(s) => string_to_number(s),
            JsValue::Object(_) | JsValue::Function(_) => f64::NAN,
        }
    }

    /// ToNumber followed by integer truncation; NaN and infinities become 0.
    pub fn to_int64(&self) -> i64 {
        let n = self.to_number();
        if n.is_nan() || n.is_infinite() {
            0
        } else {
            n.trunc() as i64
        }
    }

    /// ToString. Objects render as the generic placeholder, functions as
    /// their source text.
    pub fn to_js_string(&self) -> String {
        match self {
            JsValue::Undefined => "undefined".to_string(),
            JsValue::Null => "null".to_string(),
            JsValue::Bool(b) => b.to_string(),
            JsValue::Number(n) => format_number(*n),
            JsValue::String(s) => s.to_string(),
            JsValue::Object(_) => "[object Object]".to_string(),
            JsValue::Function(f) => f.source.clone(),
        }
    }

    /// String concatenation applies when either operand is a string or an
    /// object-like value (whose primitive form is its string rendering).
    pub fn prefers_string_concat(&self) -> bool {
        matches!(
            self,
            JsValue::String(_) | JsValue::Object(_) | JsValue::Function(_)
        )
    }
}

fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// Format a number the way scripts see it: no trailing `.0` on integral
/// values, `NaN`/`Infinity` spelled out.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    // Integral values within exact i64-representable range print without a
    // fractional part.
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        return format!("{}", n as i64);
    }
    format!("{}", n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!JsValue::Undefined.truthy());
        assert!(!JsValue::Null.truthy());
        assert!(!JsValue::Bool(false).truthy());
        assert!(!JsValue::Number(0.0).truthy());
        assert!(!JsValue::Number(f64::NAN).truthy());
        assert!(!JsValue::string("").truthy());
        assert!(JsValue::Bool(true).truthy());
        assert!(JsValue::Number(-1.0).truthy());
        assert!(JsValue::string("x").truthy());
        assert!(JsValue::Object(JsObject::new()).truthy());
    }

    #[test]
    fn test_to_number() {
        assert!(JsValue::Undefined.to_number().is_nan());
        assert_eq!(JsValue::Null.to_number(), 0.0);
        assert_eq!(JsValue::Bool(true).to_number(), 1.0);
        assert_eq!(JsValue::string(" 12.5 ").to_number(), 12.5);
        assert_eq!(JsValue::string("").to_number(), 0.0);
        assert!(JsValue::string("abc").to_number().is_nan());
        assert!(JsValue::Object(JsObject::new()).to_number().is_nan());
    }

    #[test]
    fn test_to_int64() {
        assert_eq!(JsValue::Number(6.9).to_int64(), 6);
        assert_eq!(JsValue::Number(-6.9).to_int64(), -6);
        assert_eq!(JsValue::Number(f64::NAN).to_int64(), 0);
        assert_eq!(JsValue::Number(f64::INFINITY).to_int64(), 0);
        assert_eq!(JsValue::string("42").to_int64(), 42);
        assert_eq!(JsValue::Undefined.to_int64(), 0);
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_number(26.0), "26");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(10.1), "10.1");
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
    }

    #[test]
    fn test_object_props() {
        let obj = JsObject::new();
        obj.set("k", JsValue::Number(1.0));
        assert!(obj.has("k"));
        assert_eq!(obj.get("k").unwrap().to_number(), 1.0);
        assert!(obj.get("missing").is_none());
    }
}
