//! Resumable execution contexts for cooperatively scheduled scripts.
//!
//! A [`Fiber`] owns a pinned future that plays the role of a private stack.
//! The driver calls [`Fiber::resume`] to run it until the body parks on its
//! own [`Suspender`]; the value handed to [`Suspender::suspend`] travels back
//! to the driver as [`Resumed::Yield`]. Nothing is preempted: a body only
//! gives up control at its own suspension points, and local state survives
//! every suspend/resume round-trip for as long as the fiber lives.
//!
//! Failures inside a body stay inside the fiber. A panic is caught during
//! [`Fiber::resume`] and poisons that fiber only; parking on any future other
//! than the fiber's own suspender does the same.

mod context;
mod current;
mod error;
mod suspend;

pub use context::{panic_message, Fiber, FiberId, FiberStatus, Resumed};
pub use current::current;
pub use error::{FiberError, FiberResult};
pub use suspend::{Suspend, Suspender};
