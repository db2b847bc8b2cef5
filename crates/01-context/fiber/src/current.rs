//! Thread-local record of the fiber currently being resumed.

use std::cell::Cell;

use crate::FiberId;

thread_local! {
    static CURRENT: Cell<Option<FiberId>> = const { Cell::new(None) };
}

/// Returns the fiber that is executing on this thread, if any.
///
/// Outside of [`crate::Fiber::resume`] this is always `None`. Nested resumes
/// report the innermost fiber and restore the outer one when they return.
pub fn current() -> Option<FiberId> {
    CURRENT.with(Cell::get)
}

/// Marks `id` as current until dropped.
pub(crate) struct Entered {
    previous: Option<FiberId>,
}

impl Entered {
    pub(crate) fn enter(id: FiberId) -> Self {
        let previous = CURRENT.with(|cell| cell.replace(Some(id)));
        Self { previous }
    }
}

impl Drop for Entered {
    fn drop(&mut self) {
        let previous = self.previous;
        CURRENT.with(|cell| cell.set(previous));
    }
}
