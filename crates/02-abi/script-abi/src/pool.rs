//! Transient strings passed to host natives.
//!
//! Natives take NUL-terminated strings that must stay alive until the host
//! has consumed them. Scripts intern them here during a tick; the domain
//! reclaims the whole pool once the tick completes.

use std::ffi::{CStr, CString};

use crate::error::{ScriptError, ScriptResult};

/// Handle to a pooled string, valid until the next reclaim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NativeStr {
    generation: u32,
    index: u32,
}

#[derive(Debug, Default)]
pub struct StringPool {
    generation: u32,
    entries: Vec<CString>,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, text: &str) -> ScriptResult<NativeStr> {
        let owned = CString::new(text).map_err(|err| ScriptError::InteriorNul(err.nul_position()))?;
        let index = self.entries.len() as u32;
        self.entries.push(owned);
        Ok(NativeStr {
            generation: self.generation,
            index,
        })
    }

    /// `None` once the pool has been reclaimed since `handle` was issued.
    pub fn resolve(&self, handle: NativeStr) -> Option<&CStr> {
        if handle.generation != self.generation {
            return None;
        }
        self.entries
            .get(handle.index as usize)
            .map(CString::as_c_str)
    }

    /// Drops every pooled string and invalidates outstanding handles.
    /// Returns how many strings were released.
    pub fn clear(&mut self) -> usize {
        let released = self.entries.len();
        self.entries.clear();
        self.generation = self.generation.wrapping_add(1);
        released
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
