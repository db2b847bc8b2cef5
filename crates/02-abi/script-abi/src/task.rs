use std::fmt;

/// Dense task identity, assigned in discovery order and stable for the
/// task's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u16);

impl TaskId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task {}", self.0)
    }
}

/// Call site a script failure is attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// One-time setup; failures here are terminal.
    Init,
    KeyDown,
    KeyUp,
    /// `Script::on_tick`.
    MainStep,
    Present,
}

impl Phase {
    /// Only init failures retire a task; everything else is retried next tick.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Init)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Init => "init",
            Phase::KeyDown => "key-down",
            Phase::KeyUp => "key-up",
            Phase::MainStep => "main-step",
            Phase::Present => "present",
        };
        f.write_str(name)
    }
}
