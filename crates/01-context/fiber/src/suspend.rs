//! Task-side half of the transfer: handing a value to the driver and parking.

use std::cell::Cell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use crate::current::current;
use crate::error::{FiberError, FiberResult};
use crate::FiberId;

/// Hand-off cell shared between a fiber and its suspenders.
pub(crate) struct Channel<Y> {
    owner: FiberId,
    running: Cell<bool>,
    slot: Cell<Option<Y>>,
}

impl<Y> Channel<Y> {
    pub(crate) fn new(owner: FiberId) -> Self {
        Self {
            owner,
            running: Cell::new(false),
            slot: Cell::new(None),
        }
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.set(running);
    }

    pub(crate) fn take(&self) -> Option<Y> {
        self.slot.take()
    }
}

/// Handle a fiber body uses to give control back to its driver.
pub struct Suspender<Y> {
    channel: Rc<Channel<Y>>,
}

impl<Y> Suspender<Y> {
    pub(crate) fn new(channel: Rc<Channel<Y>>) -> Self {
        Self { channel }
    }

    /// Fiber this suspender belongs to.
    pub fn fiber(&self) -> FiberId {
        self.channel.owner
    }

    /// Transfers `value` to the driver and parks until the next resume.
    ///
    /// Resolves to [`FiberError::NotRunning`] without parking when awaited
    /// anywhere but inside the owning fiber's resume.
    pub fn suspend(&self, value: Y) -> Suspend<'_, Y> {
        Suspend {
            channel: &self.channel,
            value: Some(value),
        }
    }
}

impl<Y> Clone for Suspender<Y> {
    fn clone(&self) -> Self {
        Self {
            channel: Rc::clone(&self.channel),
        }
    }
}

/// Future returned by [`Suspender::suspend`]; parks exactly once.
#[must_use = "a suspension does nothing unless awaited"]
pub struct Suspend<'a, Y> {
    channel: &'a Channel<Y>,
    value: Option<Y>,
}

// `value` is moved out by value and never pinned.
impl<Y> Unpin for Suspend<'_, Y> {}

impl<Y> Future for Suspend<'_, Y> {
    type Output = FiberResult<()>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let Some(value) = this.value.take() else {
            return Poll::Ready(Ok(()));
        };
        let owner = this.channel.owner;
        if !this.channel.running.get() || current() != Some(owner) {
            return Poll::Ready(Err(FiberError::NotRunning(owner)));
        }
        this.channel.slot.set(Some(value));
        Poll::Pending
    }
}
