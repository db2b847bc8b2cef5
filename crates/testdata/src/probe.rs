use std::time::Duration;

use script_abi::{
    FutureExt, KeyEvent, LocalBoxFuture, PresentHook, Script, ScriptContext, ScriptDescriptor,
    ScriptError, ScriptResult, SurfaceHandle,
};

use crate::{Entry, Journal};

/// Behaviour of a probe script. Tick numbers count from 1.
#[derive(Clone, Debug)]
pub struct Probe {
    name: String,
    journal: Journal,
    fail_factory: bool,
    fail_init: bool,
    panic_init: bool,
    waits: Vec<Duration>,
    fail_ticks: Vec<u32>,
    panic_ticks: Vec<u32>,
    fail_keys: Vec<u32>,
    panic_keys: Vec<u32>,
    fail_key_ups: Vec<u32>,
    present: bool,
    fail_present: bool,
    retire_on: Option<u32>,
}

impl Probe {
    /// A probe that succeeds at everything and never waits.
    pub fn new(name: impl Into<String>, journal: &Journal) -> Self {
        Self {
            name: name.into(),
            journal: journal.clone(),
            fail_factory: false,
            fail_init: false,
            panic_init: false,
            waits: Vec::new(),
            fail_ticks: Vec::new(),
            panic_ticks: Vec::new(),
            fail_keys: Vec::new(),
            panic_keys: Vec::new(),
            fail_key_ups: Vec::new(),
            present: false,
            fail_present: false,
            retire_on: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Construction itself fails.
    pub fn failing_factory(mut self) -> Self {
        self.fail_factory = true;
        self
    }

    /// `init` returns an error.
    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// `init` panics.
    pub fn panicking_init(mut self) -> Self {
        self.panic_init = true;
        self
    }

    /// Every main step waits for each of `delays` in turn.
    pub fn waits(mut self, delays: impl IntoIterator<Item = Duration>) -> Self {
        self.waits = delays.into_iter().collect();
        self
    }

    /// The main step returns an error on these cycles.
    pub fn failing_ticks(mut self, ticks: impl IntoIterator<Item = u32>) -> Self {
        self.fail_ticks = ticks.into_iter().collect();
        self
    }

    /// The main step panics on these cycles.
    pub fn panicking_ticks(mut self, ticks: impl IntoIterator<Item = u32>) -> Self {
        self.panic_ticks = ticks.into_iter().collect();
        self
    }

    /// Key-down handling fails for these key codes.
    pub fn failing_keys(mut self, keys: impl IntoIterator<Item = u32>) -> Self {
        self.fail_keys = keys.into_iter().collect();
        self
    }

    /// Key-down handling panics for these key codes.
    pub fn panicking_keys(mut self, keys: impl IntoIterator<Item = u32>) -> Self {
        self.panic_keys = keys.into_iter().collect();
        self
    }

    /// Key-up handling fails for these key codes.
    pub fn failing_key_ups(mut self, keys: impl IntoIterator<Item = u32>) -> Self {
        self.fail_key_ups = keys.into_iter().collect();
        self
    }

    /// Declares a present hook.
    pub fn presenting(mut self) -> Self {
        self.present = true;
        self
    }

    /// Declares a present hook that always fails.
    pub fn failing_present(mut self) -> Self {
        self.present = true;
        self.fail_present = true;
        self
    }

    /// Retires the task at the start of this cycle.
    pub fn retiring_on(mut self, tick: u32) -> Self {
        self.retire_on = Some(tick);
        self
    }

    /// Descriptor constructing a fresh script from this probe.
    pub fn descriptor(self) -> ScriptDescriptor {
        let name = self.name.clone();
        ScriptDescriptor::new(name, move || {
            if self.fail_factory {
                return Err(ScriptError::msg(format!("cannot construct {}", self.name)));
            }
            Ok(Box::new(ProbeScript {
                probe: self.clone(),
                ticks: 0,
            }) as Box<dyn Script>)
        })
    }
}

struct ProbeScript {
    probe: Probe,
    ticks: u32,
}

impl ProbeScript {
    fn record(&self, entry: Entry) {
        self.probe.journal.push(&self.probe.name, entry);
    }
}

impl Script for ProbeScript {
    fn init(&mut self, _ctx: &ScriptContext) -> ScriptResult {
        self.record(Entry::Init);
        if self.probe.panic_init {
            panic!("{} exploded during init", self.probe.name);
        }
        if self.probe.fail_init {
            return Err(ScriptError::msg(format!("{} refused to start", self.probe.name)));
        }
        Ok(())
    }

    fn on_tick<'a>(&'a mut self, ctx: &'a ScriptContext) -> LocalBoxFuture<'a, ScriptResult> {
        async move {
            self.ticks += 1;
            let tick = self.ticks;
            self.record(Entry::Tick(tick));

            if self.probe.retire_on == Some(tick) {
                ctx.retire().await?;
            }
            if self.probe.panic_ticks.contains(&tick) {
                panic!("{} exploded on tick {tick}", self.probe.name);
            }
            if self.probe.fail_ticks.contains(&tick) {
                return Err(ScriptError::msg(format!(
                    "{} failed on tick {tick}",
                    self.probe.name
                )));
            }

            for delay in self.probe.waits.clone() {
                ctx.wait(delay).await?;
                self.record(Entry::Resumed { tick, delay });
            }
            Ok(())
        }
        .boxed_local()
    }

    fn on_key_down(&mut self, event: &KeyEvent) -> ScriptResult {
        self.record(Entry::KeyDown(event.key));
        if self.probe.panic_keys.contains(&event.key) {
            panic!("{} exploded on key {}", self.probe.name, event.key);
        }
        if self.probe.fail_keys.contains(&event.key) {
            return Err(ScriptError::msg(format!("key {} rejected", event.key)));
        }
        Ok(())
    }

    fn on_key_up(&mut self, event: &KeyEvent) -> ScriptResult {
        self.record(Entry::KeyUp(event.key));
        if self.probe.fail_key_ups.contains(&event.key) {
            return Err(ScriptError::msg(format!("key {} release rejected", event.key)));
        }
        Ok(())
    }

    fn present_hook(&mut self) -> Option<Box<dyn PresentHook>> {
        if !self.probe.present {
            return None;
        }
        let journal = self.probe.journal.clone();
        let name = self.probe.name.clone();
        let fail = self.probe.fail_present;
        Some(Box::new(move |surface: SurfaceHandle| {
            journal.push(&name, Entry::Present(surface));
            if fail {
                return Err(ScriptError::msg(format!("{name} cannot draw")));
            }
            Ok(())
        }))
    }
}
