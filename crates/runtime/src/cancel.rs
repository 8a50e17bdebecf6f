use std::cell::Cell;
use std::rc::Rc;

/// Cooperative cancellation flag shared between an owner and its pending
/// continuations.
///
/// Continuations check [`DisposeToken::is_disposed`] before touching shared
/// state; the underlying work (a fetch, a device request) is not aborted.
/// Single-threaded by construction (`Rc`), matching the browser main thread.
#[derive(Debug, Clone, Default)]
pub struct DisposeToken {
    disposed: Rc<Cell<bool>>,
}

impl DisposeToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark disposed. Returns `true` only for the call that flipped the flag.
    pub fn dispose(&self) -> bool {
        !self.disposed.replace(true)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }
}
