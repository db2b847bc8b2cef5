//! Sample scripts and a static catalog for running the scheduler without a
//! real script directory.

mod scripts;

pub use scripts::{Blinker, Countdown, Faulty, Flaky, Heartbeat, KeyCounter};

use script_abi::{CatalogError, ScriptCatalog, ScriptDescriptor};

/// Names of every bundled script, in discovery order.
pub const SCRIPT_NAMES: [&str; 6] = [
    "heartbeat",
    "key-counter",
    "blinker",
    "faulty",
    "flaky",
    "countdown",
];

fn descriptor(name: &str) -> Option<ScriptDescriptor> {
    let descriptor = match name {
        "heartbeat" => ScriptDescriptor::of::<Heartbeat>(name),
        "key-counter" => ScriptDescriptor::of::<KeyCounter>(name),
        "blinker" => ScriptDescriptor::of::<Blinker>(name),
        "faulty" => ScriptDescriptor::of::<Faulty>(name),
        "flaky" => ScriptDescriptor::of::<Flaky>(name),
        "countdown" => ScriptDescriptor::of::<Countdown>(name),
        _ => return None,
    };
    Some(descriptor)
}

/// Catalog over the bundled scripts, optionally restricted by name.
#[derive(Clone, Debug, Default)]
pub struct DemoCatalog {
    only: Vec<String>,
}

impl DemoCatalog {
    /// Every bundled script.
    pub fn all() -> Self {
        Self::default()
    }

    /// Only the named scripts, in the given order. An unknown name makes
    /// discovery fail.
    pub fn only(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            only: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Names this catalog will discover.
    pub fn names(&self) -> Vec<String> {
        if self.only.is_empty() {
            SCRIPT_NAMES.iter().map(|name| name.to_string()).collect()
        } else {
            self.only.clone()
        }
    }
}

impl ScriptCatalog for DemoCatalog {
    fn discover(&self) -> Result<Vec<ScriptDescriptor>, CatalogError> {
        self.names()
            .iter()
            .map(|name| {
                descriptor(name)
                    .ok_or_else(|| CatalogError::Unavailable(format!("no script named {name:?}")))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{DomainConfig, ScriptDomain, SlotDriver, SlotIndex, TaskState};
    use script_abi::{KeyEvent, TaskId};
    use std::time::Duration;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn catalog_discovers_in_declared_order() {
        let names: Vec<String> = DemoCatalog::all()
            .discover()
            .expect("bundled scripts")
            .iter()
            .map(|descriptor| descriptor.name().to_string())
            .collect();
        assert_eq!(names, SCRIPT_NAMES);
    }

    #[test]
    fn unknown_filter_fails_discovery() {
        let err = DemoCatalog::only(["heartbeat", "nope"])
            .discover()
            .expect_err("unknown script");
        assert!(matches!(err, CatalogError::Unavailable(_)));
    }

    #[test]
    fn bundled_scripts_behave_as_described() {
        init_logging();
        let catalog = DemoCatalog::all();
        let mut domain = ScriptDomain::load(&catalog, DomainConfig::default()).expect("load");
        domain.bind_slots();

        for slot in 0..SCRIPT_NAMES.len() as u8 {
            domain.drive_slot(SlotIndex(slot));
        }
        let faulty = SCRIPT_NAMES
            .iter()
            .position(|name| *name == "faulty")
            .expect("faulty bundled");
        assert_eq!(
            domain.task(TaskId(faulty as u16)).expect("task").state,
            TaskState::Defective
        );

        assert_eq!(domain.drive_slot(SlotIndex(0)), Duration::from_secs(1));
        domain
            .post_key_event(TaskId(1), true, KeyEvent::new(0x20))
            .expect("key counter live");
        assert_eq!(domain.drive_slot(SlotIndex(1)), Duration::ZERO);
        assert_eq!(domain.drive_slot(SlotIndex(2)), Duration::from_millis(500));
    }

    #[test]
    fn countdown_retires_after_five_steps() {
        init_logging();
        let catalog = DemoCatalog::only(["countdown"]);
        let mut domain = ScriptDomain::load(&catalog, DomainConfig::default()).expect("load");
        domain.bind_slots();

        domain.drive_slot(SlotIndex(0));
        for _ in 0..5 {
            assert_eq!(
                domain.drive_slot(SlotIndex(0)),
                Duration::from_millis(200)
            );
            // Resumed after the wait; the cycle ends.
            domain.drive_slot(SlotIndex(0));
        }
        domain.drive_slot(SlotIndex(0));
        assert_eq!(
            domain.task(TaskId(0)).expect("task").state,
            TaskState::Defective
        );
    }

    #[test]
    fn flaky_recovers_after_failing() {
        init_logging();
        let catalog = DemoCatalog::only(["flaky"]);
        let mut domain = ScriptDomain::load(&catalog, DomainConfig::default()).expect("load");
        domain.bind_slots();
        domain.drive_slot(SlotIndex(0));

        for _ in 0..12 {
            domain.drive_slot(SlotIndex(0));
        }
        let info = domain.task(TaskId(0)).expect("task");
        assert_eq!(info.state, TaskState::Ready);
        assert!(info.failures >= 2);
    }
}
