use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use futures::task::noop_waker_ref;

use crate::current::Entered;
use crate::error::{FiberError, FiberResult};
use crate::suspend::{Channel, Suspender};

static NEXT_FIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique fiber identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FiberId(u64);

impl FiberId {
    fn next() -> Self {
        FiberId(NEXT_FIBER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric identity.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FiberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a fiber sits in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FiberStatus {
    /// Parked (or not yet started); the only state `resume` accepts.
    Suspended,
    /// Inside `resume`.
    Running,
    /// The body returned.
    Finished,
    /// The body panicked or parked on a foreign future.
    Poisoned,
}

impl fmt::Display for FiberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FiberStatus::Suspended => "suspended",
            FiberStatus::Running => "running",
            FiberStatus::Finished => "finished",
            FiberStatus::Poisoned => "poisoned",
        };
        f.write_str(name)
    }
}

/// Result of a successful resume.
#[derive(Debug, PartialEq, Eq)]
pub enum Resumed<Y, R> {
    /// The body suspended and handed over a value.
    Yield(Y),
    /// The body returned.
    Complete(R),
}

type Body<R> = Pin<Box<dyn Future<Output = R>>>;

/// A suspended computation with its own private state, resumed on demand.
pub struct Fiber<Y, R = ()> {
    id: FiberId,
    status: FiberStatus,
    body: Option<Body<R>>,
    channel: Rc<Channel<Y>>,
}

impl<Y: 'static, R: 'static> Fiber<Y, R> {
    /// Builds a fiber around `entry`. The body does not start running until
    /// the first [`Fiber::resume`].
    pub fn new<F, Fut>(entry: F) -> Self
    where
        F: FnOnce(Suspender<Y>) -> Fut,
        Fut: Future<Output = R> + 'static,
    {
        let id = FiberId::next();
        let channel = Rc::new(Channel::new(id));
        let body: Body<R> = Box::pin(entry(Suspender::new(Rc::clone(&channel))));
        Self {
            id,
            status: FiberStatus::Suspended,
            body: Some(body),
            channel,
        }
    }
}

impl<Y, R> Fiber<Y, R> {
    pub fn id(&self) -> FiberId {
        self.id
    }

    pub fn status(&self) -> FiberStatus {
        self.status
    }

    pub fn is_suspended(&self) -> bool {
        self.status == FiberStatus::Suspended
    }

    /// Runs the body until it suspends or returns.
    ///
    /// Control comes back only when the body awaits its own
    /// [`Suspender::suspend`] or finishes. A panic is caught here and poisons
    /// this fiber; the caller's stack is never unwound.
    pub fn resume(&mut self) -> FiberResult<Resumed<Y, R>> {
        if self.status != FiberStatus::Suspended {
            return Err(FiberError::NotSuspended {
                id: self.id,
                status: self.status,
            });
        }
        let Some(body) = self.body.as_mut() else {
            return Err(FiberError::NotSuspended {
                id: self.id,
                status: FiberStatus::Finished,
            });
        };

        self.status = FiberStatus::Running;
        let polled = {
            let _entered = Entered::enter(self.id);
            self.channel.set_running(true);
            let mut cx = Context::from_waker(noop_waker_ref());
            let polled = panic::catch_unwind(AssertUnwindSafe(|| body.as_mut().poll(&mut cx)));
            self.channel.set_running(false);
            polled
        };

        match polled {
            Ok(Poll::Pending) => match self.channel.take() {
                Some(value) => {
                    self.status = FiberStatus::Suspended;
                    Ok(Resumed::Yield(value))
                }
                None => {
                    self.poison();
                    Err(FiberError::ForeignAwait(self.id))
                }
            },
            Ok(Poll::Ready(output)) => {
                self.body = None;
                self.status = FiberStatus::Finished;
                Ok(Resumed::Complete(output))
            }
            Err(payload) => {
                self.poison();
                Err(FiberError::Panicked {
                    id: self.id,
                    message: panic_message(payload.as_ref()),
                })
            }
        }
    }

    fn poison(&mut self) {
        self.body = None;
        let _ = self.channel.take();
        self.status = FiberStatus::Poisoned;
    }
}

impl<Y, R> fmt::Debug for Fiber<Y, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fiber")
            .field("id", &self.id)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Best-effort text of a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_owned()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::current;
    use std::cell::{Cell, RefCell};

    #[test]
    fn body_does_not_run_until_first_resume() {
        let ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ran);
        let mut fiber: Fiber<(), ()> = Fiber::new(move |_suspender| async move {
            flag.set(true);
        });

        assert!(!ran.get());
        assert!(fiber.is_suspended());
        assert_eq!(fiber.resume(), Ok(Resumed::Complete(())));
        assert!(ran.get());
        assert_eq!(fiber.status(), FiberStatus::Finished);
    }

    #[test]
    fn locals_survive_suspension() {
        let mut fiber = Fiber::new(|suspender| async move {
            let mut total = 0u32;
            for step in 1..=3u32 {
                total += step;
                suspender.suspend(total).await.expect("inside fiber");
            }
            total * 10
        });

        assert_eq!(fiber.resume(), Ok(Resumed::Yield(1)));
        assert_eq!(fiber.resume(), Ok(Resumed::Yield(3)));
        assert_eq!(fiber.resume(), Ok(Resumed::Yield(6)));
        assert_eq!(fiber.resume(), Ok(Resumed::Complete(60)));
    }

    #[test]
    fn finished_fiber_rejects_resume() {
        let mut fiber: Fiber<(), u8> = Fiber::new(|_suspender| async { 7 });
        assert_eq!(fiber.resume(), Ok(Resumed::Complete(7)));

        let err = fiber.resume().expect_err("finished");
        assert_eq!(
            err,
            FiberError::NotSuspended {
                id: fiber.id(),
                status: FiberStatus::Finished,
            }
        );
    }

    #[test]
    fn panic_poisons_only_that_fiber() {
        let mut broken: Fiber<(), ()> = Fiber::new(|_suspender| async {
            panic!("boom");
        });
        let mut healthy = Fiber::new(|suspender| async move {
            suspender.suspend(1u8).await.expect("inside fiber");
        });

        match broken.resume() {
            Err(FiberError::Panicked { message, .. }) => assert_eq!(message, "boom"),
            other => panic!("expected panic error, got {other:?}"),
        }
        assert_eq!(broken.status(), FiberStatus::Poisoned);
        assert!(matches!(
            broken.resume(),
            Err(FiberError::NotSuspended {
                status: FiberStatus::Poisoned,
                ..
            })
        ));

        assert_eq!(healthy.resume(), Ok(Resumed::Yield(1)));
    }

    #[test]
    fn suspending_outside_resume_is_reported() {
        let stash: Rc<RefCell<Option<Suspender<u8>>>> = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&stash);
        let mut fiber: Fiber<u8, ()> = Fiber::new(move |suspender| {
            *slot.borrow_mut() = Some(suspender.clone());
            async move {
                suspender.suspend(1).await.expect("inside fiber");
            }
        });
        assert_eq!(fiber.resume(), Ok(Resumed::Yield(1)));

        let escaped = stash.borrow_mut().take().expect("suspender stashed");
        let outcome = futures::executor::block_on(escaped.suspend(2));
        assert_eq!(outcome, Err(FiberError::NotRunning(fiber.id())));

        // The fiber itself is unaffected.
        assert_eq!(fiber.resume(), Ok(Resumed::Complete(())));
    }

    #[test]
    fn foreign_await_poisons_fiber() {
        let mut fiber: Fiber<(), ()> = Fiber::new(|_suspender| async {
            futures::future::pending::<()>().await;
        });
        assert_eq!(fiber.resume(), Err(FiberError::ForeignAwait(fiber.id())));
        assert_eq!(fiber.status(), FiberStatus::Poisoned);
    }

    #[test]
    fn current_reports_innermost_fiber() {
        assert_eq!(current(), None);

        let mut outer = Fiber::new(|suspender| async move {
            let outer_id = current();
            let mut inner: Fiber<Option<FiberId>, ()> = Fiber::new(|inner_suspender| async move {
                inner_suspender
                    .suspend(current())
                    .await
                    .expect("inside inner fiber");
            });
            let inner_seen = match inner.resume() {
                Ok(Resumed::Yield(seen)) => seen,
                other => panic!("unexpected {other:?}"),
            };
            let restored = current();
            suspender
                .suspend((outer_id, inner_seen, inner.id(), restored))
                .await
                .expect("inside outer fiber");
        });

        let Ok(Resumed::Yield((outer_seen, inner_seen, inner_id, restored))) = outer.resume()
        else {
            panic!("outer fiber should yield");
        };
        assert_eq!(outer_seen, Some(outer.id()));
        assert_eq!(inner_seen, Some(inner_id));
        assert_eq!(restored, Some(outer.id()));
        assert_eq!(current(), None);
    }
}
