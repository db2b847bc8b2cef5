//! Deterministic stand-in for the game host.
//!
//! Time is virtual: every frame advances the clock by a fixed interval, so a
//! run is fully reproducible.

use std::time::Duration;

use domain::PresentReport;
use log::{debug, trace};
use script_abi::{KeyboardMessage, ScriptCatalog, SurfaceHandle};
use slot_table::{DriverEntry, MAX_SLOTS};

use crate::error::{HostError, HostResult};
use crate::runtime::{HostSurface, Runtime};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimHostConfig {
    /// Virtual time between frames.
    pub frame_interval: Duration,
}

impl Default for SimHostConfig {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(16),
        }
    }
}

struct Registration {
    entry: DriverEntry,
    wake_at: Duration,
    invocations: u64,
}

/// What happened during one simulated frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: u64,
    /// Keyboard messages delivered, each counted once per receiving script.
    pub key_deliveries: usize,
    /// Script entries invoked.
    pub invoked: usize,
    pub present: PresentReport,
}

/// Simulated host with a virtual clock.
///
/// Per frame: the control callback (first frame only), due keyboard
/// messages, every registered entry whose wake time has passed (in
/// registration order), then one present. An entry returning `d` is next
/// invoked on the first frame at least `d` later.
pub struct SimHost {
    config: SimHostConfig,
    clock: Duration,
    frame: u64,
    controlled: bool,
    registrations: Vec<Registration>,
    keys: Vec<(u64, KeyboardMessage)>,
}

impl SimHost {
    pub fn new(config: SimHostConfig) -> Self {
        Self {
            config,
            clock: Duration::ZERO,
            frame: 0,
            controlled: false,
            registrations: Vec::new(),
            keys: Vec::new(),
        }
    }

    /// Virtual time of the next frame.
    pub fn now(&self) -> Duration {
        self.clock
    }

    /// Number of frames run so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn registered(&self) -> usize {
        self.registrations.len()
    }

    /// How often the `index`-th registered entry has been invoked.
    pub fn invocations(&self, index: usize) -> Option<u64> {
        self.registrations.get(index).map(|reg| reg.invocations)
    }

    /// Delivers `message` at the start of frame `frame` (or the next frame
    /// if that one has already run).
    pub fn schedule_key(&mut self, frame: u64, message: KeyboardMessage) {
        self.keys.push((frame, message));
    }

    /// A key press and release, `hold` frames apart.
    pub fn schedule_press(&mut self, frame: u64, hold: u64, key: u32) {
        self.schedule_key(frame, KeyboardMessage::down(key));
        self.schedule_key(frame + hold.max(1), KeyboardMessage::up(key));
    }

    pub fn run_frame(&mut self, runtime: &mut Runtime, catalog: &dyn ScriptCatalog) -> FrameReport {
        let mut report = FrameReport {
            frame: self.frame,
            ..FrameReport::default()
        };

        if !self.controlled {
            self.controlled = true;
            runtime.control(catalog, self);
        }

        let frame = self.frame;
        let (due, later): (Vec<_>, Vec<_>) = self.keys.drain(..).partition(|(at, _)| *at <= frame);
        self.keys = later;
        for (_, message) in due {
            report.key_deliveries += runtime.keyboard_message(message);
        }

        if let Some(driver) = runtime.driver() {
            let now = self.clock;
            for registration in self.registrations.iter_mut() {
                if registration.wake_at > now {
                    continue;
                }
                let delay = (registration.entry)(&mut *driver);
                // Saturates: a delay past the end of virtual time is never due.
                registration.wake_at = now.saturating_add(delay);
                registration.invocations += 1;
                report.invoked += 1;
            }
        }

        report.present = runtime.present(SurfaceHandle(self.frame));
        trace!("frame {} at {:?}: {report:?}", self.frame, self.clock);

        self.clock += self.config.frame_interval;
        self.frame += 1;
        report
    }

    /// Runs `frames` frames back to back.
    pub fn run(
        &mut self,
        runtime: &mut Runtime,
        catalog: &dyn ScriptCatalog,
        frames: u64,
    ) -> Vec<FrameReport> {
        (0..frames)
            .map(|_| self.run_frame(runtime, catalog))
            .collect()
    }
}

impl HostSurface for SimHost {
    fn register_script(&mut self, entry: DriverEntry) -> HostResult<()> {
        if self.registrations.len() >= MAX_SLOTS {
            return Err(HostError::CapacityExhausted(self.registrations.len()));
        }
        self.registrations.push(Registration {
            entry,
            wake_at: self.clock,
            invocations: 0,
        });
        debug!("script entry {} registered", self.registrations.len() - 1);
        Ok(())
    }

    fn unregister_scripts(&mut self) {
        debug!("{} script entries unregistered", self.registrations.len());
        self.registrations.clear();
    }
}

impl Default for SimHost {
    fn default() -> Self {
        Self::new(SimHostConfig::default())
    }
}
