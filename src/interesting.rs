//! Interesting-line tracking: named patterns tested against lines that survive a diff
//! unchanged, with matches collected per name and per side.

use regex::Regex;

use crate::errors::DiffError;

/// Which side of the comparison a line belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// Sequence A, the original file.
    Original = 0,
    /// Sequence B, the modified file.
    Modified = 1,
}

impl Side {
    pub const fn from_modified(is_modified_file: bool) -> Self {
        if is_modified_file {
            Side::Modified
        } else {
            Side::Original
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// A matched line: its 0-based index on its side and its text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterestingLine {
    pub line: usize,
    pub text: String,
}

/// Registered patterns, grouped by name in registration order.
#[derive(Clone, Debug, Default)]
pub struct PatternSet {
    names: Vec<String>,
    patterns: Vec<(usize, Regex)>,
}

impl PatternSet {
    /// Register `regex` under `name`, returning the name's slot index.
    pub fn add(&mut self, name: &str, regex: Regex) -> usize {
        let slot = self.slot_of(name).unwrap_or_else(|| {
            self.names.push(name.to_owned());
            self.names.len() - 1
        });
        self.patterns.push((slot, regex));
        slot
    }

    /// Compile and register `pattern` under `name`.
    pub fn add_str(&mut self, name: &str, pattern: &str) -> Result<usize, DiffError> {
        let regex = Regex::new(pattern).map_err(|source| DiffError::InvalidPattern {
            name: name.to_owned(),
            source,
        })?;
        Ok(self.add(name, regex))
    }

    pub fn slot_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Slots whose patterns match `text` at its start, each reported once, in slot order.
    ///
    /// Lines made only of whitespace never match.
    pub fn matching_slots(&self, text: &str) -> Vec<usize> {
        if self.patterns.is_empty() || text.trim().is_empty() {
            return Vec::new();
        }
        let mut hits = vec![false; self.names.len()];
        for (slot, regex) in &self.patterns {
            if !hits[*slot] && regex.find(text).is_some_and(|m| m.start() == 0) {
                hits[*slot] = true;
            }
        }
        hits.iter()
            .enumerate()
            .filter_map(|(slot, hit)| hit.then_some(slot))
            .collect()
    }
}

/// Accumulated matches, one list per registered name and side.
#[derive(Clone, Debug, Default)]
pub struct InterestingLines {
    slots: Vec<[Vec<InterestingLine>; 2]>,
}

impl InterestingLines {
    /// Make sure a (possibly empty) result slot exists for `slot`.
    pub fn ensure_slot(&mut self, slot: usize) {
        if self.slots.len() <= slot {
            self.slots.resize_with(slot + 1, Default::default);
        }
    }

    pub fn push(&mut self, slot: usize, side: Side, line: usize, text: &str) {
        self.ensure_slot(slot);
        self.slots[slot][side.index()].push(InterestingLine {
            line,
            text: text.to_owned(),
        });
    }

    pub fn get(&self, slot: usize, side: Side) -> &[InterestingLine] {
        self.slots
            .get(slot)
            .map(|sides| sides[side.index()].as_slice())
            .unwrap_or_default()
    }

    /// Test `text` against `patterns` and record one match per matching name.
    pub fn record(&mut self, patterns: &PatternSet, side: Side, line: usize, text: &str) {
        for slot in patterns.matching_slots(text) {
            self.push(slot, side, line, text);
        }
    }
}
