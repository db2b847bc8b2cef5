//! Keyboard input as delivered by the host and as seen by scripts.

/// Modifier keys held while the event fired.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub alt: bool,
    pub ctrl: bool,
    pub shift: bool,
}

/// Discrete key transition handed to `on_key_down` / `on_key_up`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    /// Virtual key code.
    pub key: u32,
    /// Auto-repeat count reported by the host.
    pub repeats: u16,
    pub scan_code: u8,
    pub extended: bool,
    pub was_down_before: bool,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: u32) -> Self {
        Self {
            key,
            repeats: 1,
            scan_code: 0,
            extended: false,
            was_down_before: false,
            modifiers: Modifiers::default(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Raw keyboard message in the shape the host's input hook reports it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyboardMessage {
    pub key: u32,
    pub repeats: u16,
    pub scan_code: u8,
    pub extended: bool,
    pub modifiers: Modifiers,
    pub was_down_before: bool,
    pub is_up_now: bool,
}

impl KeyboardMessage {
    pub fn down(key: u32) -> Self {
        Self {
            key,
            repeats: 1,
            scan_code: 0,
            extended: false,
            modifiers: Modifiers::default(),
            was_down_before: false,
            is_up_now: false,
        }
    }

    pub fn up(key: u32) -> Self {
        Self {
            was_down_before: true,
            is_up_now: true,
            ..Self::down(key)
        }
    }

    /// Splits the message into its direction and the script-facing event.
    pub fn split(self) -> (bool, KeyEvent) {
        let event = KeyEvent {
            key: self.key,
            repeats: self.repeats,
            scan_code: self.scan_code,
            extended: self.extended,
            was_down_before: self.was_down_before,
            modifiers: self.modifiers,
        };
        (!self.is_up_now, event)
    }
}
