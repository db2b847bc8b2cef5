//! Task units and the body every task fiber runs.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::time::Duration;

use fiber::{panic_message, Fiber, Suspender};
use futures::FutureExt;
use log::error;
use script_abi::{
    EventReceiver, Phase, PresentHook, Script, ScriptContext, ScriptDescriptor, ScriptError,
    ScriptEvent, ScriptResult, StringPool, TaskId, TickReport, Transfer,
};

/// Lifecycle of a task unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    /// Not yet resumed; init runs on the first resume.
    Uninitialized,
    /// Init succeeded; every resume runs (or continues) one cycle.
    Ready,
    /// Terminal. Never resumed again.
    Defective,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Uninitialized => "uninitialized",
            TaskState::Ready => "ready",
            TaskState::Defective => "defective",
        };
        f.write_str(name)
    }
}

/// Snapshot of one task for observers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskInfo {
    pub id: TaskId,
    pub name: String,
    pub state: TaskState,
    /// Completed Ready cycles.
    pub ticks: u64,
    /// Handler failures absorbed so far, init excluded.
    pub failures: u64,
}

pub(crate) struct TaskUnit {
    pub(crate) id: TaskId,
    pub(crate) name: Rc<str>,
    pub(crate) state: TaskState,
    pub(crate) fiber: Fiber<Transfer>,
    pub(crate) delay: Rc<Cell<Duration>>,
    pub(crate) present: Option<Box<dyn PresentHook>>,
    pub(crate) ticks: u64,
    pub(crate) failures: u64,
}

impl TaskUnit {
    pub(crate) fn spawn(
        id: TaskId,
        descriptor: ScriptDescriptor,
        events: EventReceiver,
        pool: Rc<RefCell<StringPool>>,
    ) -> Self {
        let name: Rc<str> = Rc::from(descriptor.name());
        let delay = Rc::new(Cell::new(Duration::ZERO));
        let fiber = {
            let name = Rc::clone(&name);
            let delay = Rc::clone(&delay);
            Fiber::new(move |suspender: Suspender<Transfer>| {
                let ctx = ScriptContext::new(id, name, suspender.clone(), delay, pool);
                run_script(ctx, suspender, descriptor, events)
            })
        };
        Self {
            id,
            name,
            state: TaskState::Uninitialized,
            fiber,
            delay,
            present: None,
            ticks: 0,
            failures: 0,
        }
    }

    pub(crate) fn info(&self) -> TaskInfo {
        TaskInfo {
            id: self.id,
            name: self.name.to_string(),
            state: self.state,
            ticks: self.ticks,
            failures: self.failures,
        }
    }
}

impl fmt::Debug for TaskUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskUnit")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("fiber", &self.fiber)
            .field("delay", &self.delay.get())
            .finish_non_exhaustive()
    }
}

/// Runs `f`, turning a panic into [`ScriptError::Panicked`].
pub(crate) fn guard<T>(f: impl FnOnce() -> ScriptResult<T>) -> ScriptResult<T> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(ScriptError::Panicked(panic_message(&*payload))))
}

type Started = (Box<dyn Script>, Option<Box<dyn PresentHook>>);

fn start(descriptor: &ScriptDescriptor, ctx: &ScriptContext) -> ScriptResult<Started> {
    guard(|| {
        let mut script = descriptor.instantiate()?;
        script.init(ctx)?;
        let hook = script.present_hook();
        Ok((script, hook))
    })
}

async fn run_script(
    ctx: ScriptContext,
    suspender: Suspender<Transfer>,
    descriptor: ScriptDescriptor,
    events: EventReceiver,
) {
    let mut script = match start(&descriptor, &ctx) {
        Ok((script, hook)) => {
            if suspender
                .suspend(Transfer::Initialized(Ok(hook)))
                .await
                .is_err()
            {
                return;
            }
            script
        }
        Err(err) => {
            let _ = suspender.suspend(Transfer::Initialized(Err(err))).await;
            return;
        }
    };

    loop {
        let report = run_cycle(script.as_mut(), &ctx, &events).await;
        if suspender.suspend(Transfer::TickDone(report)).await.is_err() {
            return;
        }
    }
}

/// One Ready cycle: queued key events first, then the main step once.
async fn run_cycle(
    script: &mut dyn Script,
    ctx: &ScriptContext,
    events: &EventReceiver,
) -> TickReport {
    let mut report = TickReport::default();

    for event in events.drain() {
        report.events += 1;
        let handled = guard(|| match &event {
            ScriptEvent::KeyDown(key) => script.on_key_down(key),
            ScriptEvent::KeyUp(key) => script.on_key_up(key),
        });
        if let Err(err) = handled {
            absorb(&mut report, ctx, event.phase(), err);
        }
    }

    let step = AssertUnwindSafe(async { script.on_tick(ctx).await })
        .catch_unwind()
        .await;
    match step {
        Ok(Ok(())) => {}
        Ok(Err(err)) => absorb(&mut report, ctx, Phase::MainStep, err),
        Err(payload) => absorb(
            &mut report,
            ctx,
            Phase::MainStep,
            ScriptError::Panicked(panic_message(&*payload)),
        ),
    }

    report
}

fn absorb(report: &mut TickReport, ctx: &ScriptContext, phase: Phase, err: ScriptError) {
    error!(
        "*** Exception during {phase} in {} ({}): {err}",
        ctx.name(),
        ctx.task()
    );
    report.record(phase, err);
}
