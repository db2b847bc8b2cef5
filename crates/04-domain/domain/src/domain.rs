use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use fiber::Resumed;
use log::{debug, error, info, trace, warn};
use script_abi::{
    event_queue, KeyEvent, Phase, ScriptCatalog, StringPool, SurfaceHandle, TaskId, TickReport,
    Transfer,
};
use slot_table::{DriverEntry, SlotDriver, SlotIndex, SlotTable};

use crate::config::DomainConfig;
use crate::error::{DomainError, RegistrationFailure};
use crate::router::KeyRouter;
use crate::task::{guard, TaskInfo, TaskState, TaskUnit};

/// What one [`ScriptDomain::tick`] did.
#[derive(Debug)]
pub enum TickOutcome {
    /// Absent, unbound, not yet initialised or defective; nothing was touched.
    Skipped,
    /// The main step suspended in `wait`; the cycle continues next tick.
    Waiting(Duration),
    /// The cycle ran to completion.
    Completed(TickReport),
    /// The task became defective during this tick.
    Retired,
}

/// Result of fanning one present frame out to interested tasks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PresentReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Outcome of [`ScriptDomain::bind_slots`].
#[derive(Debug, Default)]
pub struct SlotBindings {
    /// Entries to hand to the host, in slot order.
    pub entries: Vec<(SlotIndex, DriverEntry)>,
    /// Tasks left without a slot; they never run.
    pub failures: Vec<RegistrationFailure>,
}

/// The scheduler: owns every task unit for the lifetime of the host session.
///
/// All methods run on the host's single driving thread. The only piece that
/// crosses threads is the [`KeyRouter`] handed out by
/// [`ScriptDomain::key_router`].
pub struct ScriptDomain {
    tasks: Vec<TaskUnit>,
    slots: SlotTable,
    router: KeyRouter,
    pool: Rc<RefCell<StringPool>>,
}

impl ScriptDomain {
    /// Discovers scripts and creates one suspended task per descriptor.
    ///
    /// Discovery failure is fatal: no task is created. Scripts do not run
    /// until their slot is driven.
    pub fn load(catalog: &dyn ScriptCatalog, config: DomainConfig) -> Result<Self, DomainError> {
        let descriptors = catalog.discover().map_err(|err| {
            error!("*** Exception during script discovery: {err}");
            DomainError::Discovery(err)
        })?;
        if descriptors.len() > usize::from(u16::MAX) {
            return Err(DomainError::TooManyScripts(descriptors.len()));
        }

        info!("{} script types found:", descriptors.len());
        for (index, descriptor) in descriptors.iter().enumerate() {
            info!("  {index}: {}", descriptor.name());
        }

        let router = KeyRouter::new();
        let pool = Rc::new(RefCell::new(StringPool::new()));
        let tasks = descriptors
            .into_iter()
            .enumerate()
            .map(|(index, descriptor)| {
                let (sender, receiver) = event_queue();
                let unit =
                    TaskUnit::spawn(TaskId(index as u16), descriptor, receiver, Rc::clone(&pool));
                router.add(unit.fiber.id(), sender);
                unit
            })
            .collect();

        Ok(Self {
            tasks,
            slots: SlotTable::with_limit(config.slot_limit),
            router,
            pool,
        })
    }

    /// Binds task *i* to slot *i*. Tasks beyond the slot limit are reported,
    /// stop receiving events and never run; the others are unaffected.
    pub fn bind_slots(&mut self) -> SlotBindings {
        let mut bindings = SlotBindings::default();
        for task in &self.tasks {
            match self.slots.bind(task.id.index(), task.id) {
                Ok(entry) => {
                    let slot = SlotIndex(task.id.0 as u8);
                    debug!("{} ({}) bound to {slot}", task.name, task.id);
                    bindings.entries.push((slot, entry));
                }
                Err(err) => {
                    error!(
                        "*** Exception during registration of {} ({}): {err}",
                        task.name, task.id
                    );
                    self.router.retire(task.id);
                    bindings.failures.push(RegistrationFailure {
                        task: task.id,
                        name: task.name.to_string(),
                        error: err,
                    });
                }
            }
        }
        bindings
    }

    /// Drops the key route of the task bound to `slot` after the host
    /// refused its driver entry. The task is never invoked, so it stays
    /// uninitialized and events addressed to it are dropped.
    pub fn release_unregistered(&mut self, slot: SlotIndex) {
        let Some(task) = unit_for(&self.slots, &mut self.tasks, slot) else {
            return;
        };
        warn!(
            "{} ({}) not registered with the host; releasing its route",
            task.name, task.id
        );
        self.router.retire(task.id);
    }

    /// Runs the task's init step on first call. Returns whether the task is
    /// usable; a failed init leaves it defective for good.
    pub fn initialize_task(&mut self, slot: SlotIndex) -> bool {
        let Some(task) = unit_for(&self.slots, &mut self.tasks, slot) else {
            warn!("initialize requested for unbound {slot}");
            return false;
        };
        match task.state {
            TaskState::Ready => return true,
            TaskState::Defective => return false,
            TaskState::Uninitialized => {}
        }

        let ready = match task.fiber.resume() {
            Ok(Resumed::Yield(Transfer::Initialized(Ok(hook)))) => {
                task.present = hook;
                task.state = TaskState::Ready;
                info!("{} ({}) initialized", task.name, task.id);
                true
            }
            Ok(Resumed::Yield(Transfer::Initialized(Err(err)))) => {
                error!(
                    "*** Exception during {} in {} ({}): {err}",
                    Phase::Init,
                    task.name,
                    task.id
                );
                false
            }
            Ok(other) => {
                error!(
                    "*** Exception during {} in {} ({}): unexpected transfer {other:?}",
                    Phase::Init,
                    task.name,
                    task.id
                );
                false
            }
            Err(err) => {
                error!(
                    "*** Exception during {} in {} ({}): {err}",
                    Phase::Init,
                    task.name,
                    task.id
                );
                false
            }
        };
        if !ready {
            retire(task, &self.router);
        }
        self.reclaim_strings();
        ready
    }

    /// Delay the task last requested via `wait`; zero when there is none.
    pub fn requested_delay(&self, slot: SlotIndex) -> Duration {
        self.slots
            .task_for(slot)
            .and_then(|task| self.tasks.get(task.index()))
            .map_or(Duration::ZERO, |task| task.delay.get())
    }

    /// Clears the stored delay once the driver has consumed it.
    pub fn reset_requested_delay(&mut self, slot: SlotIndex) {
        if let Some(task) = unit_for(&self.slots, &mut self.tasks, slot) {
            task.delay.set(Duration::ZERO);
        }
    }

    /// Resumes one Ready task for one cooperative time slice, then reclaims
    /// the string pool. Defective, uninitialised or unbound slots are
    /// skipped without side effects.
    pub fn tick(&mut self, slot: SlotIndex) -> TickOutcome {
        let Some(task) = unit_for(&self.slots, &mut self.tasks, slot) else {
            return TickOutcome::Skipped;
        };
        if task.state != TaskState::Ready {
            return TickOutcome::Skipped;
        }

        let outcome = match task.fiber.resume() {
            Ok(Resumed::Yield(Transfer::Waiting(delay))) => {
                trace!("{} ({}) waiting {delay:?}", task.name, task.id);
                TickOutcome::Waiting(delay)
            }
            Ok(Resumed::Yield(Transfer::TickDone(report))) => {
                task.ticks += 1;
                task.failures += report.failures.len() as u64;
                TickOutcome::Completed(report)
            }
            Ok(Resumed::Yield(Transfer::Retired)) => {
                info!("{} ({}) retired", task.name, task.id);
                retire(task, &self.router);
                TickOutcome::Retired
            }
            Ok(other) => {
                error!(
                    "*** Exception during {} in {} ({}): unexpected transfer {other:?}",
                    Phase::MainStep,
                    task.name,
                    task.id
                );
                retire(task, &self.router);
                TickOutcome::Retired
            }
            Err(err) => {
                error!(
                    "*** Exception during {} in {} ({}): {err}",
                    Phase::MainStep,
                    task.name,
                    task.id
                );
                retire(task, &self.router);
                TickOutcome::Retired
            }
        };
        self.reclaim_strings();
        outcome
    }

    /// Delivers one present frame to every Ready task with a present hook.
    /// A failing hook is logged and does not stop delivery to the rest.
    pub fn on_present_frame(&mut self, surface: SurfaceHandle) -> PresentReport {
        let mut report = PresentReport::default();
        for task in &mut self.tasks {
            if task.state != TaskState::Ready {
                continue;
            }
            let Some(hook) = task.present.as_mut() else {
                continue;
            };
            match guard(|| hook.present(surface)) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    error!(
                        "*** Exception during {} in {} ({}): {err}",
                        Phase::Present,
                        task.name,
                        task.id
                    );
                    task.failures += 1;
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Queues a key event for `task`; safe from any thread through
    /// [`ScriptDomain::key_router`]. `Ok(false)` when the task is retired.
    pub fn post_key_event(
        &self,
        task: TaskId,
        is_down: bool,
        event: KeyEvent,
    ) -> Result<bool, DomainError> {
        self.router.post(task, is_down, event)
    }

    /// Task whose fiber is executing on this thread.
    pub fn executing_task(&self) -> Result<TaskId, DomainError> {
        self.router.current_task()
    }

    /// Thread-safe handle for posting key events.
    pub fn key_router(&self) -> KeyRouter {
        self.router.clone()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn task(&self, task: TaskId) -> Option<TaskInfo> {
        self.tasks.get(task.index()).map(TaskUnit::info)
    }

    pub fn tasks(&self) -> impl Iterator<Item = TaskInfo> + '_ {
        self.tasks.iter().map(TaskUnit::info)
    }

    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }

    /// Unbinds every slot and releases every task and its fiber. Safe to
    /// call more than once.
    pub fn teardown(&mut self) {
        if self.tasks.is_empty() && self.slots.is_empty() {
            return;
        }
        let unbound = self.slots.unbind_all();
        self.router.clear();
        let released = self.tasks.len();
        self.tasks.clear();
        self.pool.borrow_mut().clear();
        info!("script domain torn down: {released} tasks released, {unbound} slots unbound");
    }

    fn reclaim_strings(&self) {
        let released = self.pool.borrow_mut().clear();
        if released > 0 {
            trace!("reclaimed {released} native strings");
        }
    }
}

impl SlotDriver for ScriptDomain {
    fn drive_slot(&mut self, slot: SlotIndex) -> Duration {
        let state = self
            .slots
            .task_for(slot)
            .and_then(|task| self.tasks.get(task.index()))
            .map(|task| task.state);
        match state {
            Some(TaskState::Uninitialized) => {
                self.initialize_task(slot);
            }
            Some(TaskState::Ready) => {
                self.tick(slot);
            }
            Some(TaskState::Defective) | None => {}
        }
        let delay = self.requested_delay(slot);
        self.reset_requested_delay(slot);
        delay
    }
}

impl Drop for ScriptDomain {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn unit_for<'a>(
    slots: &SlotTable,
    tasks: &'a mut [TaskUnit],
    slot: SlotIndex,
) -> Option<&'a mut TaskUnit> {
    let task = slots.task_for(slot)?;
    tasks.get_mut(task.index())
}

fn retire(task: &mut TaskUnit, router: &KeyRouter) {
    task.state = TaskState::Defective;
    task.present = None;
    router.retire(task.id);
}
