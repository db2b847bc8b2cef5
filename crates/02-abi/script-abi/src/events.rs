//! Per-task event queue.
//!
//! Producers live outside the cooperative region (the host's input path, other
//! threads); the consumer is the task itself, which drains everything queued
//! at the start of each tick. The channel is the only per-task state that is
//! touched from more than one thread.

use crossbeam_channel::{unbounded, Receiver, Sender};
use thiserror::Error;

use crate::keys::KeyEvent;
use crate::task::Phase;

/// Out-of-band input destined for one task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptEvent {
    KeyDown(KeyEvent),
    KeyUp(KeyEvent),
}

impl ScriptEvent {
    pub fn key(is_down: bool, event: KeyEvent) -> Self {
        if is_down {
            ScriptEvent::KeyDown(event)
        } else {
            ScriptEvent::KeyUp(event)
        }
    }

    /// Handler phase this event is dispatched to.
    pub fn phase(&self) -> Phase {
        match self {
            ScriptEvent::KeyDown(_) => Phase::KeyDown,
            ScriptEvent::KeyUp(_) => Phase::KeyUp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("event queue closed")]
    Closed,
}

/// Creates a connected producer/consumer pair.
pub fn event_queue() -> (EventSender, EventReceiver) {
    let (tx, rx) = unbounded();
    (EventSender { tx }, EventReceiver { rx })
}

/// Cloneable, thread-safe producer side.
#[derive(Clone, Debug)]
pub struct EventSender {
    tx: Sender<ScriptEvent>,
}

impl EventSender {
    /// Appends `event`; fails once the owning task is gone.
    pub fn post(&self, event: ScriptEvent) -> Result<(), EventError> {
        self.tx.send(event).map_err(|_| EventError::Closed)
    }
}

/// Consumer side, owned by the task's execution context.
#[derive(Debug)]
pub struct EventReceiver {
    rx: Receiver<ScriptEvent>,
}

impl EventReceiver {
    /// Yields every event queued at call time, oldest first. Events posted
    /// while draining wait for the next drain.
    pub fn drain(&self) -> impl Iterator<Item = ScriptEvent> + '_ {
        let pending = self.rx.len();
        self.rx.try_iter().take(pending)
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
