use std::cell::{Cell, RefCell};
use std::ffi::CStr;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use fiber::Suspender;
use smallvec::SmallVec;

use crate::error::{ScriptError, ScriptResult};
use crate::pool::{NativeStr, StringPool};
use crate::script::PresentHook;
use crate::task::{Phase, TaskId};

/// Value a task hands to its driver every time it suspends.
pub enum Transfer {
    /// First resume finished the init step. On success carries the script's
    /// present hook, if it declared one.
    Initialized(Result<Option<Box<dyn PresentHook>>, ScriptError>),
    /// The main step called `wait`; execution continues after the call on the
    /// next resume.
    Waiting(Duration),
    /// One Ready cycle ran to completion.
    TickDone(TickReport),
    /// The script asked never to be resumed again.
    Retired,
}

impl fmt::Debug for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transfer::Initialized(Ok(hook)) => f
                .debug_struct("Initialized")
                .field("present_hook", &hook.is_some())
                .finish(),
            Transfer::Initialized(Err(err)) => {
                f.debug_tuple("InitFailed").field(err).finish()
            }
            Transfer::Waiting(delay) => f.debug_tuple("Waiting").field(delay).finish(),
            Transfer::TickDone(report) => f.debug_tuple("TickDone").field(report).finish(),
            Transfer::Retired => f.write_str("Retired"),
        }
    }
}

/// A handler failure absorbed during one cycle.
#[derive(Debug)]
pub struct HandlerFailure {
    pub phase: Phase,
    pub error: ScriptError,
}

/// Summary of one Ready cycle.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Key events drained at the start of the cycle.
    pub events: usize,
    pub failures: SmallVec<[HandlerFailure; 2]>,
}

impl TickReport {
    pub fn record(&mut self, phase: Phase, error: ScriptError) {
        self.failures.push(HandlerFailure { phase, error });
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_in(&self, phase: Phase) -> bool {
        self.failures.iter().any(|failure| failure.phase == phase)
    }
}

/// A script's view of its own task.
///
/// Handed to every script callback. Only the main step may suspend, and only
/// through [`ScriptContext::wait`] (or the helpers built on it).
pub struct ScriptContext {
    task: TaskId,
    name: Rc<str>,
    delay: Rc<Cell<Duration>>,
    suspender: Suspender<Transfer>,
    pool: Rc<RefCell<StringPool>>,
}

impl ScriptContext {
    /// `delay` is shared with the driver, which reads and resets it between
    /// resumes. `pool` is shared by every task of the domain.
    pub fn new(
        task: TaskId,
        name: Rc<str>,
        suspender: Suspender<Transfer>,
        delay: Rc<Cell<Duration>>,
        pool: Rc<RefCell<StringPool>>,
    ) -> Self {
        Self {
            task,
            name,
            delay,
            suspender,
            pool,
        }
    }

    pub fn task(&self) -> TaskId {
        self.task
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Delay most recently requested and not yet consumed by the driver.
    pub fn requested_delay(&self) -> Duration {
        self.delay.get()
    }

    /// Requests to be resumed no sooner than `delay` from now and suspends.
    ///
    /// Resolves once the driver resumes this task again. Fails with
    /// [`ScriptError::IllegalContext`] when awaited anywhere except inside
    /// this task's own execution; the stored delay is left untouched then.
    pub async fn wait(&self, delay: Duration) -> ScriptResult {
        let previous = self.delay.replace(delay);
        if let Err(err) = self.suspender.suspend(Transfer::Waiting(delay)).await {
            self.delay.set(previous);
            return Err(err.into());
        }
        Ok(())
    }

    /// Gives the host a chance to run others; resumes on the next tick.
    pub async fn yield_now(&self) -> ScriptResult {
        self.wait(Duration::ZERO).await
    }

    /// Marks this task defective. The driver never resumes it again, so on
    /// success this future does not complete.
    pub async fn retire(&self) -> ScriptResult {
        self.suspender.suspend(Transfer::Retired).await?;
        Err(ScriptError::msg("task resumed after retiring"))
    }

    /// Copies `text` into the domain's string pool for a native call. The
    /// handle stays valid until the current slot invocation returns to the
    /// host.
    pub fn native_str(&self, text: &str) -> ScriptResult<NativeStr> {
        self.pool.borrow_mut().intern(text)
    }

    /// Runs `f` on a pooled string; `None` if the handle has been reclaimed.
    pub fn resolve_str<R>(&self, handle: NativeStr, f: impl FnOnce(&CStr) -> R) -> Option<R> {
        self.pool.borrow().resolve(handle).map(f)
    }
}

impl fmt::Debug for ScriptContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptContext")
            .field("task", &self.task)
            .field("name", &self.name)
            .field("fiber", &self.suspender.fiber())
            .field("requested_delay", &self.delay.get())
            .finish()
    }
}
