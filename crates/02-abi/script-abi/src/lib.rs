//! Script ABI shared between script authors and the scheduler.
//!
//! This crate defines the protocol boundary between the domain (layer 04)
//! and the scripts it runs, with no knowledge of how scripts are found or
//! how the host drives slots.
//!
//! * [`Script`] – the trait every script implements; `on_tick` is the main
//!   step and may call [`ScriptContext::wait`].
//! * [`Transfer`] – the typed value a task hands to its driver whenever it
//!   suspends.
//! * [`event_queue`] – the only structure shared across threads: key events
//!   posted from the host's input path, drained by the task at tick start.
//! * [`StringPool`] – transient strings handed to host natives, reclaimed
//!   once a task's tick completes.

#![allow(missing_docs)]

mod context;
mod error;
mod events;
mod keys;
mod pool;
mod script;
mod task;

pub use context::{HandlerFailure, ScriptContext, TickReport, Transfer};
pub use error::{CatalogError, ScriptError, ScriptResult};
pub use events::{event_queue, EventError, EventReceiver, EventSender, ScriptEvent};
pub use keys::{KeyEvent, KeyboardMessage, Modifiers};
pub use pool::{NativeStr, StringPool};
pub use script::{
    PresentHook, Script, ScriptCatalog, ScriptDescriptor, ScriptFactory, SurfaceHandle,
};
pub use task::{Phase, TaskId};

pub use futures::future::{FutureExt, LocalBoxFuture};
