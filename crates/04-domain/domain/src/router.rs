//! Thread-safe routing of key events into task queues.

use std::sync::Arc;

use fiber::FiberId;
use log::trace;
use parking_lot::RwLock;
use script_abi::{EventSender, KeyEvent, ScriptEvent, TaskId};

use crate::error::DomainError;

#[derive(Clone)]
struct Route {
    fiber: FiberId,
    sender: EventSender,
}

/// Cloneable handle for posting key events from outside the cooperative
/// thread. Retired tasks keep their id but have no route; events addressed
/// to them are dropped.
#[derive(Clone, Default)]
pub struct KeyRouter {
    routes: Arc<RwLock<Vec<Option<Route>>>>,
}

impl KeyRouter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Routes are indexed by task id, so tasks must be added in id order.
    pub(crate) fn add(&self, fiber: FiberId, sender: EventSender) {
        self.routes.write().push(Some(Route { fiber, sender }));
    }

    pub(crate) fn retire(&self, task: TaskId) {
        if let Some(route) = self.routes.write().get_mut(task.index()) {
            *route = None;
        }
    }

    pub(crate) fn clear(&self) {
        self.routes.write().clear();
    }

    /// Queues a key event for `task`. `Ok(false)` when the task is retired
    /// and the event was dropped.
    pub fn post(&self, task: TaskId, is_down: bool, event: KeyEvent) -> Result<bool, DomainError> {
        let routes = self.routes.read();
        let route = routes
            .get(task.index())
            .ok_or(DomainError::UnknownTask(task))?;
        Ok(deliver(route.as_ref(), task, ScriptEvent::key(is_down, event)))
    }

    /// Queues a key event for every live task; returns how many took it.
    pub fn broadcast(&self, is_down: bool, event: KeyEvent) -> usize {
        let routes = self.routes.read();
        routes
            .iter()
            .enumerate()
            .filter(|(index, route)| {
                deliver(
                    route.as_ref(),
                    TaskId(*index as u16),
                    ScriptEvent::key(is_down, event),
                )
            })
            .count()
    }

    /// Queues a key event for the task whose fiber is running on this thread.
    pub fn post_current(&self, is_down: bool, event: KeyEvent) -> Result<TaskId, DomainError> {
        let task = self.current_task()?;
        self.post(task, is_down, event)?;
        Ok(task)
    }

    /// Task whose fiber is running on this thread.
    pub fn current_task(&self) -> Result<TaskId, DomainError> {
        let current = fiber::current().ok_or(DomainError::NoExecutingTask)?;
        self.routes
            .read()
            .iter()
            .position(|route| route.as_ref().is_some_and(|route| route.fiber == current))
            .map(|index| TaskId(index as u16))
            .ok_or(DomainError::NoExecutingTask)
    }

    /// Number of tasks that still accept events.
    pub fn live(&self) -> usize {
        self.routes.read().iter().flatten().count()
    }
}

fn deliver(route: Option<&Route>, task: TaskId, event: ScriptEvent) -> bool {
    let Some(route) = route else {
        trace!("dropping {event:?} for retired {task}");
        return false;
    };
    match route.sender.post(event) {
        Ok(()) => true,
        Err(err) => {
            trace!("dropping {event:?} for {task}: {err}");
            false
        }
    }
}
