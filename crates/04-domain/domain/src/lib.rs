//! Cooperative script scheduler.
//!
//! A [`ScriptDomain`] owns one task unit per discovered script. Each task
//! runs on its own fiber and only gives control back at `wait` (or when its
//! cycle ends). The host drives tasks through the slot table:
//!
//! ```text
//! host ──entry k──▶ SlotDriver::drive_slot(k) ──▶ initialize_task / tick
//!                                               ◀── requested delay
//! ```
//!
//! Failures are contained per task. Init failures retire the task; failures
//! in key handlers, the main step or present hooks are logged and the task
//! runs again next tick.

mod config;
mod domain;
mod error;
mod router;
mod task;


pub use config::DomainConfig;
pub use domain::{PresentReport, ScriptDomain, SlotBindings, TickOutcome};
pub use error::{DomainError, RegistrationFailure};
pub use router::KeyRouter;
pub use task::{TaskInfo, TaskState};

pub use slot_table::{DriverEntry, SlotDriver, SlotIndex, MAX_SLOTS};
