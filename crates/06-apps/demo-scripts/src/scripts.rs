use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::anyhow;
use log::{debug, info, warn};
use script_abi::{
    FutureExt, KeyEvent, LocalBoxFuture, PresentHook, Script, ScriptContext, ScriptError,
    ScriptResult, SurfaceHandle,
};

/// Logs a beat once per second.
#[derive(Debug, Default)]
pub struct Heartbeat {
    beats: u64,
}

impl Script for Heartbeat {
    fn on_tick<'a>(&'a mut self, ctx: &'a ScriptContext) -> LocalBoxFuture<'a, ScriptResult> {
        async move {
            self.beats += 1;
            info!("{}: beat {}", ctx.name(), self.beats);
            ctx.wait(Duration::from_secs(1)).await
        }
        .boxed_local()
    }
}

/// Counts key presses and shows the total as a notification whenever it
/// changes.
#[derive(Debug, Default)]
pub struct KeyCounter {
    presses: u32,
    shown: u32,
}

impl Script for KeyCounter {
    fn on_tick<'a>(&'a mut self, ctx: &'a ScriptContext) -> LocalBoxFuture<'a, ScriptResult> {
        async move {
            if self.presses != self.shown {
                let text = ctx.native_str(&format!("~y~keys pressed: {}", self.presses))?;
                ctx.resolve_str(text, |text| {
                    info!("{}: notify {}", ctx.name(), text.to_string_lossy())
                });
                self.shown = self.presses;
            }
            ctx.yield_now().await
        }
        .boxed_local()
    }

    fn on_key_down(&mut self, event: &KeyEvent) -> ScriptResult {
        if !event.was_down_before {
            self.presses += 1;
        }
        Ok(())
    }
}

/// Toggles a marker every half second; the marker is drawn on present.
#[derive(Debug, Default)]
pub struct Blinker {
    lit: Rc<Cell<bool>>,
}

impl Script for Blinker {
    fn on_tick<'a>(&'a mut self, ctx: &'a ScriptContext) -> LocalBoxFuture<'a, ScriptResult> {
        async move {
            self.lit.set(!self.lit.get());
            ctx.wait(Duration::from_millis(500)).await
        }
        .boxed_local()
    }

    fn present_hook(&mut self) -> Option<Box<dyn PresentHook>> {
        let lit = Rc::clone(&self.lit);
        Some(Box::new(move |surface: SurfaceHandle| -> ScriptResult {
            if lit.get() {
                debug!("blinker: marker drawn on surface {}", surface.0);
            }
            Ok(())
        }))
    }
}

/// Cannot start: its init always fails.
#[derive(Debug, Default)]
pub struct Faulty;

impl Script for Faulty {
    fn init(&mut self, _ctx: &ScriptContext) -> ScriptResult {
        Err(ScriptError::msg("required native library is missing"))
    }

    fn on_tick<'a>(&'a mut self, _ctx: &'a ScriptContext) -> LocalBoxFuture<'a, ScriptResult> {
        async move { Ok(()) }.boxed_local()
    }
}

/// Fails every third main step and recovers on the next.
#[derive(Debug, Default)]
pub struct Flaky {
    runs: u32,
}

impl Script for Flaky {
    fn on_tick<'a>(&'a mut self, ctx: &'a ScriptContext) -> LocalBoxFuture<'a, ScriptResult> {
        async move {
            self.runs += 1;
            if self.runs % 3 == 0 {
                return Err(anyhow!("entity handle {} went stale", self.runs).into());
            }
            ctx.wait(Duration::from_millis(100)).await
        }
        .boxed_local()
    }
}

/// Counts down once per 200 ms, then retires.
#[derive(Debug)]
pub struct Countdown {
    remaining: u32,
}

impl Default for Countdown {
    fn default() -> Self {
        Self { remaining: 5 }
    }
}

impl Script for Countdown {
    fn on_tick<'a>(&'a mut self, ctx: &'a ScriptContext) -> LocalBoxFuture<'a, ScriptResult> {
        async move {
            if self.remaining == 0 {
                warn!("{}: done, retiring", ctx.name());
                return ctx.retire().await;
            }
            info!("{}: {}", ctx.name(), self.remaining);
            self.remaining -= 1;
            ctx.wait(Duration::from_millis(200)).await
        }
        .boxed_local()
    }
}
