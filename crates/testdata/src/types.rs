//! Core type definitions for journal entries.

use std::time::Duration;

use script_abi::SurfaceHandle;

/// One observable call made into a probe script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    /// `init` ran (whether or not it then failed).
    Init,
    /// The main step started its n-th cycle.
    Tick(u32),
    /// The main step of cycle n came back from a `wait(delay)`.
    Resumed {
        /// Cycle number.
        tick: u32,
        /// Delay that was requested.
        delay: Duration,
    },
    /// `on_key_down` with this key code.
    KeyDown(u32),
    /// `on_key_up` with this key code.
    KeyUp(u32),
    /// The present hook received this surface.
    Present(SurfaceHandle),
}

/// A journal entry tagged with the probe that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Probe name.
    pub script: String,
    /// What happened.
    pub entry: Entry,
}
