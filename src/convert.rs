//! The host-to-engine half of the marshaling protocol.
//!
//! [`Primitive`] is the closed set of host inputs the engine accepts.
//! Supported host types convert through `From` impls, so an unsupported
//! kind on this path is a compile error rather than a runtime one. The
//! feature-gated [`serde_json::Value`] conversion covers dynamic inputs and
//! fails with a usage error for composite kinds.

#[cfg(feature = "serde-support")]
use crate::error::Error;

/// A host primitive awaiting marshaling into an engine value.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// The absent value; becomes `undefined`.
    Undefined,
    /// A boolean.
    Bool(bool),
    /// Any numeric input, narrowed to a 64-bit float. No overflow check is
    /// performed on the way in.
    Number(f64),
    /// UTF-8 text; the engine receives a copy.
    String(String),
}

impl From<()> for Primitive {
    fn from((): ()) -> Self {
        Primitive::Undefined
    }
}

impl From<bool> for Primitive {
    fn from(b: bool) -> Self {
        Primitive::Bool(b)
    }
}

impl From<&str> for Primitive {
    fn from(s: &str) -> Self {
        Primitive::String(s.to_string())
    }
}

impl From<String> for Primitive {
    fn from(s: String) -> Self {
        Primitive::String(s)
    }
}

impl<T: Into<Primitive>> From<Option<T>> for Primitive {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(value) => value.into(),
            None => Primitive::Undefined,
        }
    }
}

macro_rules! impl_from_numeric {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Primitive {
                fn from(n: $ty) -> Self {
                    Primitive::Number(n as f64)
                }
            }
        )*
    };
}

impl_from_numeric!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

/// Dynamic marshaling entry: JSON primitives map onto [`Primitive`];
/// arrays and objects are not marshalable and fail with a usage error.
#[cfg(feature = "serde-support")]
impl TryFrom<&serde_json::Value> for Primitive {
    type Error = Error;

    fn try_from(value: &serde_json::Value) -> Result<Self, Error> {
        use serde_json::Value as Json;
        Ok(match value {
            Json::Null => Primitive::Undefined,
            Json::Bool(b) => Primitive::Bool(*b),
            Json::Number(n) => Primitive::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Primitive::String(s.clone()),
            Json::Array(_) => return Err(Error::unsupported_value("array")),
            Json::Object(_) => return Err(Error::unsupported_value("object")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_impls() {
        assert_eq!(Primitive::from(()), Primitive::Undefined);
        assert_eq!(Primitive::from(true), Primitive::Bool(true));
        assert_eq!(Primitive::from(10u8), Primitive::Number(10.0));
        assert_eq!(Primitive::from(-3i64), Primitive::Number(-3.0));
        assert_eq!(Primitive::from(10.1f64), Primitive::Number(10.1));
        assert_eq!(
            Primitive::from("text"),
            Primitive::String("text".to_string())
        );
        assert_eq!(Primitive::from(None::<i32>), Primitive::Undefined);
        assert_eq!(Primitive::from(Some(5i32)), Primitive::Number(5.0));
    }

    #[test]
    fn test_float32_narrows() {
        match Primitive::from(2.5f32) {
            Primitive::Number(n) => assert_eq!(n, 2.5),
            other => panic!("expected number, got {:?}", other),
        }
    }

    #[cfg(feature = "serde-support")]
    mod serde_tests {
        use super::*;

        #[test]
        fn test_json_primitives() {
            let json: serde_json::Value = serde_json::json!("hello");
            assert_eq!(
                Primitive::try_from(&json).unwrap(),
                Primitive::String("hello".to_string())
            );
            let json = serde_json::json!(4.5);
            assert_eq!(Primitive::try_from(&json).unwrap(), Primitive::Number(4.5));
            let json = serde_json::Value::Null;
            assert_eq!(Primitive::try_from(&json).unwrap(), Primitive::Undefined);
        }

        #[test]
        fn test_json_composites_rejected() {
            let json = serde_json::json!([1, 2, 3]);
            let err = Primitive::try_from(&json).unwrap_err();
            assert_eq!(err.to_string(), "unsupported value kind: array");

            let json = serde_json::json!({ "a": 1 });
            let err = Primitive::try_from(&json).unwrap_err();
            assert_eq!(err.to_string(), "unsupported value kind: object");
        }
    }
}
