//! Isolate: the root of an isolation domain.

use std::cell::Cell;
use std::fmt;
use std::ptr;
use std::rc::Rc;

use tracing::debug;

use crate::engine;
use crate::error::{Error, Result};

/// Shared ownership cell for the raw isolate handle.
///
/// Contexts hold an `Rc` to this state so every operation can check
/// liveness before crossing the boundary; disposal empties the cell, making
/// a second disposal a no-op and turning later use into a typed error
/// instead of undefined behavior.
pub(crate) struct IsolateState {
    raw: Cell<*mut engine::RawIsolate>,
}

impl IsolateState {
    /// The live raw handle, or [`Error::IsolateDisposed`].
    pub(crate) fn raw(&self) -> Result<*mut engine::RawIsolate> {
        let ptr = self.raw.get();
        if ptr.is_null() {
            Err(Error::IsolateDisposed)
        } else {
            Ok(ptr)
        }
    }

    pub(crate) fn dispose(&self) {
        let ptr = self.raw.replace(ptr::null_mut());
        if !ptr.is_null() {
            debug!("disposing isolate");
            // SAFETY: the cell held the sole live handle and was just
            // emptied, so this release happens exactly once.
            unsafe { engine::isolate_dispose(ptr) };
        }
    }

    fn is_disposed(&self) -> bool {
        self.raw.get().is_null()
    }
}

impl Drop for IsolateState {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// An independent instance of the embedded engine; the unit of heap
/// isolation.
///
/// Everything created under an isolate (contexts, values) must be used from
/// a single logical thread of control; the raw handle makes this type
/// `!Send` so the compiler enforces that domain boundary.
///
/// Cloning shares the same underlying instance. [`Isolate::dispose`] is
/// explicit and idempotent; dropping the last handle releases the instance
/// as a safety net.
#[derive(Clone)]
pub struct Isolate {
    pub(crate) state: Rc<IsolateState>,
}

impl Isolate {
    /// Request a new engine instance.
    ///
    /// Fails only if the engine cannot allocate one, which is treated as
    /// fatal rather than a normal error path.
    pub fn new() -> Result<Isolate> {
        let raw = engine::new_isolate();
        if raw.is_null() {
            return Err(Error::IsolateCreation);
        }
        debug!("created isolate");
        Ok(Isolate {
            state: Rc::new(IsolateState {
                raw: Cell::new(raw),
            }),
        })
    }

    /// Release the underlying engine instance.
    ///
    /// Safe to call multiple times; the second call is a no-op. Contexts
    /// and values created under this isolate fail with
    /// [`Error::IsolateDisposed`] afterwards.
    pub fn dispose(&self) {
        self.state.dispose();
    }

    /// Whether this isolate has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.state.is_disposed()
    }
}

impl fmt::Debug for Isolate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Isolate")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
