//! Host boundary for the script scheduler.
//!
//! [`Runtime`] is the plugin half: the callbacks a game host calls into
//! (control, keyboard, present, unload) around one [`domain::ScriptDomain`].
//! [`HostSurface`] is the host half's registration API. [`SimHost`] is a
//! deterministic host with a virtual clock, used by the CLI and tests.

mod error;
mod runtime;
mod sim;

pub use error::{HostError, HostResult};
pub use runtime::{HostSurface, Runtime, RuntimeConfig, RuntimeState};
pub use sim::{FrameReport, SimHost, SimHostConfig};
