use slot_table::MAX_SLOTS;

/// Scheduler configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DomainConfig {
    /// Number of host slots scripts may occupy; clamped to [`MAX_SLOTS`].
    pub slot_limit: usize,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            slot_limit: MAX_SLOTS,
        }
    }
}
