use domain::{DomainConfig, KeyRouter, PresentReport, ScriptDomain};
use log::{error, info, warn};
use script_abi::{KeyboardMessage, ScriptCatalog, SurfaceHandle};
use slot_table::{DriverEntry, SlotDriver};

use crate::error::HostResult;

/// The host's script registration API.
pub trait HostSurface {
    /// Registers one script callback. The host invokes `entry` repeatedly,
    /// waiting at least the returned duration between invocations.
    fn register_script(&mut self, entry: DriverEntry) -> HostResult<()>;

    /// Drops every callback registered by this plugin.
    fn unregister_scripts(&mut self);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub domain: DomainConfig,
}

/// Lifecycle of the plugin runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuntimeState {
    /// Waiting for the first control callback.
    Idle,
    Running,
    /// Bootstrap failed; no script was registered.
    Failed,
    Unloaded,
}

/// Plugin side of the host integration: owns the single scheduler instance
/// and exposes the callbacks the host calls into.
pub struct Runtime {
    config: RuntimeConfig,
    state: RuntimeState,
    domain: Option<ScriptDomain>,
    router: Option<KeyRouter>,
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            state: RuntimeState::Idle,
            domain: None,
            router: None,
        }
    }

    pub fn state(&self) -> RuntimeState {
        self.state
    }

    /// Coordinator callback. On its first invocation discovers scripts and
    /// registers one driver entry per bound slot; later calls do nothing.
    pub fn control(&mut self, catalog: &dyn ScriptCatalog, host: &mut dyn HostSurface) {
        if self.state != RuntimeState::Idle {
            return;
        }

        let mut domain = match ScriptDomain::load(catalog, self.config.domain) {
            Ok(domain) => domain,
            Err(err) => {
                error!("*** Exception during bootstrap: {err}");
                self.state = RuntimeState::Failed;
                return;
            }
        };

        let bindings = domain.bind_slots();
        let mut registered = 0;
        for (slot, entry) in bindings.entries {
            match host.register_script(entry) {
                Ok(()) => registered += 1,
                Err(err) => {
                    error!("*** Exception during registration of {slot}: {err}");
                    domain.release_unregistered(slot);
                }
            }
        }
        info!(
            "registered {registered} of {} scripts",
            domain.task_count()
        );

        self.router = Some(domain.key_router());
        self.domain = Some(domain);
        self.state = RuntimeState::Running;
    }

    /// Keyboard callback: broadcasts the key to every live script. Returns
    /// how many scripts queued it.
    pub fn keyboard_message(&self, message: KeyboardMessage) -> usize {
        let Some(router) = &self.router else {
            return 0;
        };
        let (is_down, event) = message.split();
        router.broadcast(is_down, event)
    }

    /// Present callback: fans the frame out to interested scripts.
    pub fn present(&mut self, surface: SurfaceHandle) -> PresentReport {
        self.domain
            .as_mut()
            .map(|domain| domain.on_present_frame(surface))
            .unwrap_or_default()
    }

    /// Unregisters from the host and releases every script.
    pub fn unload(&mut self, host: &mut dyn HostSurface) {
        if self.state == RuntimeState::Unloaded {
            warn!("unload called twice");
            return;
        }
        host.unregister_scripts();
        if let Some(mut domain) = self.domain.take() {
            domain.teardown();
        }
        self.router = None;
        self.state = RuntimeState::Unloaded;
        info!("script runtime unloaded");
    }

    /// Target for registered driver entries, once running.
    pub fn driver(&mut self) -> Option<&mut dyn SlotDriver> {
        self.domain
            .as_mut()
            .map(|domain| domain as &mut dyn SlotDriver)
    }

    pub fn domain(&self) -> Option<&ScriptDomain> {
        self.domain.as_ref()
    }

    /// Thread-safe key router for input captured off the host thread.
    pub fn key_router(&self) -> Option<KeyRouter> {
        self.router.clone()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}
