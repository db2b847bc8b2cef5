use futures::future::LocalBoxFuture;

use crate::context::ScriptContext;
use crate::error::{CatalogError, ScriptError, ScriptResult};
use crate::keys::KeyEvent;

/// Opaque per-frame handle supplied by the host's present callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u64);

/// Receives present frames. Returned from [`Script::present_hook`] once the
/// script has initialised.
pub trait PresentHook {
    fn present(&mut self, surface: SurfaceHandle) -> ScriptResult;
}

impl<F> PresentHook for F
where
    F: FnMut(SurfaceHandle) -> ScriptResult,
{
    fn present(&mut self, surface: SurfaceHandle) -> ScriptResult {
        self(surface)
    }
}

/// A long-lived cooperative script.
///
/// Every method runs on the task's own fiber. Errors and panics are caught
/// at the task boundary: a failing [`Script::init`] retires the task for
/// good, a failure anywhere else is logged and the task keeps running.
///
/// A script that never awaits inside `on_tick` and never returns starves
/// every other script and the host.
pub trait Script {
    /// One-time setup, run on the first resume.
    fn init(&mut self, _ctx: &ScriptContext) -> ScriptResult {
        Ok(())
    }

    /// Main step, run once per tick after queued key events are handled.
    fn on_tick<'a>(&'a mut self, ctx: &'a ScriptContext) -> LocalBoxFuture<'a, ScriptResult>;

    fn on_key_down(&mut self, _event: &KeyEvent) -> ScriptResult {
        Ok(())
    }

    fn on_key_up(&mut self, _event: &KeyEvent) -> ScriptResult {
        Ok(())
    }

    /// Declares interest in present frames. Called once, after `init`.
    ///
    /// The hook runs on the host's present path, outside the script's own
    /// execution, and never gets `&mut self`: the script stays parked inside
    /// its task while frames are presented. State the hook needs must be
    /// shared with it up front, e.g. through an `Rc<Cell<_>>` the script
    /// keeps updating from `on_tick`.
    fn present_hook(&mut self) -> Option<Box<dyn PresentHook>> {
        None
    }
}

pub type ScriptFactory = Box<dyn Fn() -> Result<Box<dyn Script>, ScriptError>>;

/// A discovered script type: display name plus a way to construct it.
pub struct ScriptDescriptor {
    name: String,
    factory: ScriptFactory,
}

impl ScriptDescriptor {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Box<dyn Script>, ScriptError> + 'static,
    {
        Self {
            name: name.into(),
            factory: Box::new(factory),
        }
    }

    /// Descriptor for a script type with a `Default` constructor.
    pub fn of<S>(name: impl Into<String>) -> Self
    where
        S: Script + Default + 'static,
    {
        Self::new(name, || Ok(Box::new(S::default()) as Box<dyn Script>))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instantiate(&self) -> Result<Box<dyn Script>, ScriptError> {
        (self.factory)()
    }
}

impl std::fmt::Debug for ScriptDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Source of script types, consulted once when the domain loads.
pub trait ScriptCatalog {
    /// Ordered descriptors; the order becomes task and slot order.
    fn discover(&self) -> Result<Vec<ScriptDescriptor>, CatalogError>;
}

impl<F> ScriptCatalog for F
where
    F: Fn() -> Result<Vec<ScriptDescriptor>, CatalogError>,
{
    fn discover(&self) -> Result<Vec<ScriptDescriptor>, CatalogError> {
        self()
    }
}
