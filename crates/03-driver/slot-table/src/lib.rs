#![deny(missing_docs)]
//! Fixed table of host-facing driver entry points.
//!
//! The host only accepts plain function addresses as script callbacks, so it
//! cannot be handed a closure over a task. This crate provides
//! [`MAX_SLOTS`] statically distinct entries; entry *k* forwards to
//! [`SlotDriver::drive_slot`] with slot *k*. [`SlotTable`] records which task
//! each slot drives.

use std::fmt;
use std::time::Duration;

use script_abi::TaskId;
use thiserror::Error;

/// Maximum number of callbacks the host can tell apart.
pub const MAX_SLOTS: usize = 20;

/// Index of a host-visible callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotIndex(pub u8);

impl SlotIndex {
    /// Index as a table offset.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}", self.0)
    }
}

/// Receiver of slot invocations; implemented by the scheduler.
pub trait SlotDriver {
    /// Runs one invocation of `slot` and returns how long the host should
    /// wait before invoking it again.
    fn drive_slot(&mut self, slot: SlotIndex) -> Duration;
}

/// A host-registrable entry point.
pub type DriverEntry = fn(&mut dyn SlotDriver) -> Duration;

macro_rules! driver_entries {
    ($($name:ident => $slot:literal),+ $(,)?) => {
        $(
            fn $name(driver: &mut dyn SlotDriver) -> Duration {
                driver.drive_slot(SlotIndex($slot))
            }
        )+

        static ENTRIES: [DriverEntry; MAX_SLOTS] = [$($name),+];
    };
}

driver_entries! {
    drive_slot_00 => 0,
    drive_slot_01 => 1,
    drive_slot_02 => 2,
    drive_slot_03 => 3,
    drive_slot_04 => 4,
    drive_slot_05 => 5,
    drive_slot_06 => 6,
    drive_slot_07 => 7,
    drive_slot_08 => 8,
    drive_slot_09 => 9,
    drive_slot_10 => 10,
    drive_slot_11 => 11,
    drive_slot_12 => 12,
    drive_slot_13 => 13,
    drive_slot_14 => 14,
    drive_slot_15 => 15,
    drive_slot_16 => 16,
    drive_slot_17 => 17,
    drive_slot_18 => 18,
    drive_slot_19 => 19,
}

/// Errors raised while binding slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SlotError {
    /// The slot lies beyond the table's usable range.
    #[error("slot {slot} exceeds the maximum of {max} script slots")]
    OutOfRange {
        /// Requested slot.
        slot: usize,
        /// Usable slot count.
        max: usize,
    },
    /// The slot already drives a live task.
    #[error("{slot} is already bound to {task}")]
    AlreadyBound {
        /// Requested slot.
        slot: SlotIndex,
        /// Task currently holding it.
        task: TaskId,
    },
}

/// Slot-to-task bindings. At most one task per slot; bindings are only
/// released all at once, at teardown.
#[derive(Debug, Clone)]
pub struct SlotTable {
    limit: usize,
    bindings: [Option<TaskId>; MAX_SLOTS],
}

impl SlotTable {
    /// Table using every available slot.
    pub fn new() -> Self {
        Self::with_limit(MAX_SLOTS)
    }

    /// Table restricted to the first `limit` slots (clamped to [`MAX_SLOTS`]).
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: limit.min(MAX_SLOTS),
            bindings: [None; MAX_SLOTS],
        }
    }

    /// Number of usable slots.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Binds `task` to `slot` and returns the entry the host must register.
    pub fn bind(&mut self, slot: usize, task: TaskId) -> Result<DriverEntry, SlotError> {
        if slot >= self.limit {
            return Err(SlotError::OutOfRange {
                slot,
                max: self.limit,
            });
        }
        let index = SlotIndex(slot as u8);
        if let Some(holder) = self.bindings[slot] {
            return Err(SlotError::AlreadyBound {
                slot: index,
                task: holder,
            });
        }
        self.bindings[slot] = Some(task);
        Ok(ENTRIES[slot])
    }

    /// Task driven by `slot`, if bound.
    pub fn task_for(&self, slot: SlotIndex) -> Option<TaskId> {
        self.bindings.get(slot.index()).copied().flatten()
    }

    /// Slot driving `task`, if any.
    pub fn slot_for(&self, task: TaskId) -> Option<SlotIndex> {
        self.bound()
            .find(|(_, bound)| *bound == task)
            .map(|(slot, _)| slot)
    }

    /// Bound slots in slot order.
    pub fn bound(&self) -> impl Iterator<Item = (SlotIndex, TaskId)> + '_ {
        self.bindings
            .iter()
            .enumerate()
            .filter_map(|(slot, task)| task.map(|task| (SlotIndex(slot as u8), task)))
    }

    /// Number of bound slots.
    pub fn len(&self) -> usize {
        self.bound().count()
    }

    /// Whether no slot is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.iter().all(Option::is_none)
    }

    /// Entry point for `slot`, bound or not.
    pub fn entry(slot: SlotIndex) -> Option<DriverEntry> {
        ENTRIES.get(slot.index()).copied()
    }

    /// Releases every binding; returns how many were released.
    pub fn unbind_all(&mut self) -> usize {
        let released = self.len();
        self.bindings = [None; MAX_SLOTS];
        released
    }
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<SlotIndex>,
    }

    impl SlotDriver for Recorder {
        fn drive_slot(&mut self, slot: SlotIndex) -> Duration {
            self.calls.push(slot);
            Duration::from_millis(slot.0 as u64 * 10)
        }
    }

    #[test]
    fn each_entry_forwards_its_own_slot() {
        let mut recorder = Recorder::default();
        for slot in 0..MAX_SLOTS {
            let entry = SlotTable::entry(SlotIndex(slot as u8)).expect("entry exists");
            let delay = entry(&mut recorder);
            assert_eq!(delay, Duration::from_millis(slot as u64 * 10));
        }
        let expected: Vec<SlotIndex> = (0..MAX_SLOTS as u8).map(SlotIndex).collect();
        assert_eq!(recorder.calls, expected);
        assert!(SlotTable::entry(SlotIndex(MAX_SLOTS as u8)).is_none());
    }

    #[test]
    fn twenty_first_binding_fails_without_disturbing_the_rest() {
        let mut table = SlotTable::new();
        for slot in 0..MAX_SLOTS {
            table.bind(slot, TaskId(slot as u16)).expect("within bound");
        }

        let err = table
            .bind(MAX_SLOTS, TaskId(MAX_SLOTS as u16))
            .expect_err("beyond bound");
        assert_eq!(
            err,
            SlotError::OutOfRange {
                slot: MAX_SLOTS,
                max: MAX_SLOTS
            }
        );
        assert_eq!(table.len(), MAX_SLOTS);
        for slot in 0..MAX_SLOTS {
            assert_eq!(
                table.task_for(SlotIndex(slot as u8)),
                Some(TaskId(slot as u16))
            );
        }
    }

    #[test]
    fn double_binding_reports_the_holder() {
        let mut table = SlotTable::new();
        table.bind(4, TaskId(1)).expect("free slot");
        let err = table.bind(4, TaskId(2)).expect_err("taken");
        assert_eq!(
            err,
            SlotError::AlreadyBound {
                slot: SlotIndex(4),
                task: TaskId(1)
            }
        );
        assert_eq!(table.task_for(SlotIndex(4)), Some(TaskId(1)));
        assert_eq!(table.slot_for(TaskId(1)), Some(SlotIndex(4)));
    }

    #[test]
    fn limit_caps_usable_slots() {
        let mut table = SlotTable::with_limit(2);
        assert!(table.bind(0, TaskId(0)).is_ok());
        assert!(table.bind(1, TaskId(1)).is_ok());
        assert!(matches!(
            table.bind(2, TaskId(2)),
            Err(SlotError::OutOfRange { slot: 2, max: 2 })
        ));
        assert_eq!(SlotTable::with_limit(64).limit(), MAX_SLOTS);
    }

    #[test]
    fn unbind_all_releases_everything() {
        let mut table = SlotTable::new();
        table.bind(0, TaskId(0)).expect("bind");
        table.bind(3, TaskId(1)).expect("bind");
        assert_eq!(
            table.bound().collect::<Vec<_>>(),
            vec![(SlotIndex(0), TaskId(0)), (SlotIndex(3), TaskId(1))]
        );
        assert_eq!(table.unbind_all(), 2);
        assert!(table.is_empty());
        assert_eq!(table.task_for(SlotIndex(0)), None);
    }
}
