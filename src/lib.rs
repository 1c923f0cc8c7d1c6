//! # perchjs
//!
//! A safe, handle-based embedding layer for a JavaScript engine.
//!
//! This crate provides:
//! - **Isolates** owning engine instances with shared, revocable handles
//! - **Contexts** with independent global scopes inside an isolate
//! - **Value handles** with property access, calls, and coercive readers
//! - **Primitive marshaling** from host types into engine values
//! - **Structured script errors** carrying message, location, and stack
//!
//! ## Quick Start
//!
//! ```rust
//! use perchjs::Context;
//!
//! # fn main() -> perchjs::Result<()> {
//! let ctx = Context::new(None)?;
//! ctx.run_script("const add = (a, b) => a + b", "math.js")?;
//! let sum = ctx.run_script("add(3, 4)", "math.js")?;
//! assert_eq!(sum.as_int64(), 7);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `serde-support` (default): dynamic value creation from `serde_json`
//!   and serde derives on [`JsError`]

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod context;
mod convert;
mod engine;
mod error;
mod isolate;
mod value;

pub use context::Context;
pub use convert::Primitive;
pub use error::{Error, JsError, Result};
pub use isolate::Isolate;
pub use value::Value;

/// Crate version for compatibility checks
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
