//! Probe scripts and catalogs for scheduler tests.
//!
//! A [`Probe`] describes a script's behaviour (which calls fail, panic or
//! wait). Every call the resulting script receives is appended to a shared
//! [`Journal`] so tests can assert on ordering across tasks.

mod probe;
mod types;

pub use probe::Probe;
pub use types::{Entry, Record};

use std::cell::RefCell;
use std::rc::Rc;

use script_abi::{CatalogError, ScriptCatalog, ScriptDescriptor};

/// Shared, ordered record of probe activity.
#[derive(Clone, Debug, Default)]
pub struct Journal {
    records: Rc<RefCell<Vec<Record>>>,
}

impl Journal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, script: &str, entry: Entry) {
        self.records.borrow_mut().push(Record {
            script: script.to_string(),
            entry,
        });
    }

    /// Every record so far, oldest first.
    pub fn records(&self) -> Vec<Record> {
        self.records.borrow().clone()
    }

    /// Entries produced by `script`, oldest first.
    pub fn entries(&self, script: &str) -> Vec<Entry> {
        self.records
            .borrow()
            .iter()
            .filter(|record| record.script == script)
            .map(|record| record.entry)
            .collect()
    }

    /// Number of main-step cycles `script` has started.
    pub fn ticks(&self, script: &str) -> usize {
        self.entries(script)
            .iter()
            .filter(|entry| matches!(entry, Entry::Tick(_)))
            .count()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }
}

/// Catalog serving a fixed list of probes in order.
#[derive(Clone, Debug, Default)]
pub struct ProbeCatalog {
    probes: Vec<Probe>,
}

impl ProbeCatalog {
    /// Catalog over `probes`, discovered in the given order.
    pub fn new(probes: impl IntoIterator<Item = Probe>) -> Self {
        Self {
            probes: probes.into_iter().collect(),
        }
    }

    /// `count` well-behaved probes named `probe-00`, `probe-01`, …
    pub fn uniform(count: usize, journal: &Journal) -> Self {
        Self::new((0..count).map(|index| Probe::new(format!("probe-{index:02}"), journal)))
    }
}

impl ScriptCatalog for ProbeCatalog {
    fn discover(&self) -> Result<Vec<ScriptDescriptor>, CatalogError> {
        Ok(self.probes.iter().cloned().map(Probe::descriptor).collect())
    }
}

/// Catalog whose discovery always fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailingCatalog;

impl ScriptCatalog for FailingCatalog {
    fn discover(&self) -> Result<Vec<ScriptDescriptor>, CatalogError> {
        Err(CatalogError::Unavailable("scripts directory missing".into()))
    }
}
