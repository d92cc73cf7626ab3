//! Breakpoint table keyed by class and line.

use indexmap::IndexMap;
use tether_model::{Breakpoint, PositionKey};

#[derive(Debug, Clone)]
struct Entry {
    breakpoint: Breakpoint,
    active: bool,
}

/// Requested breakpoints in insertion order. Entries for classes that are
/// not loaded yet stay pending until [`BreakpointTable::activate_class`].
#[derive(Debug, Default)]
pub(crate) struct BreakpointTable {
    entries: IndexMap<PositionKey, Entry>,
}

impl BreakpointTable {
    /// Insert a breakpoint; returns `false` when one already exists at the
    /// same position.
    pub(crate) fn insert(&mut self, breakpoint: Breakpoint, active: bool) -> bool {
        let key = breakpoint.key();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, Entry { breakpoint, active });
        true
    }

    pub(crate) fn remove(&mut self, key: &PositionKey) -> Option<Breakpoint> {
        self.entries.shift_remove(key).map(|entry| entry.breakpoint)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Activate pending entries of a class that was just loaded.
    pub(crate) fn activate_class(&mut self, class: &str) -> Vec<Breakpoint> {
        self.entries
            .values_mut()
            .filter(|entry| !entry.active && entry.breakpoint.location.target == class)
            .map(|entry| {
                entry.active = true;
                entry.breakpoint.clone()
            })
            .collect()
    }

    /// Active, enabled breakpoint at a statement position.
    pub(crate) fn matching(&self, class: &str, line: i32) -> Option<&Breakpoint> {
        let key = PositionKey {
            target: class.to_string(),
            line_number: line,
        };
        self.entries
            .get(&key)
            .filter(|entry| entry.active && entry.breakpoint.enabled)
            .map(|entry| &entry.breakpoint)
    }

    pub(crate) fn list(&self) -> Vec<Breakpoint> {
        self.entries
            .values()
            .map(|entry| entry.breakpoint.clone())
            .collect()
    }
}
