//! Differ construction and the opcode stream.
//!
//! A [`Differ`] owns one comparison: the two sequences, the registered interesting-line
//! patterns and the matches collected while its opcodes are consumed. The engine is picked
//! from a [`DiffCompatVersion`], the integer persisted next to every stored diff, so the same
//! version always reproduces the same opcodes.
//!
//! Engines:
//! - `myers`: shortest-edit-script search, optionally with the middle-snake cost bail.
//! - `smdiff`: legacy block matching, frozen for old stored diffs.

pub mod myers;
pub mod smdiff;

use std::collections::VecDeque;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    config::DiffConfig,
    errors::DiffError,
    filetypes::{HEADER, header_patterns_for_filename},
    interesting::{InterestingLine, InterestingLines, PatternSet, Side},
    line::{DiffLine, Lines},
    opcode::{Opcode, OpcodeMeta, OpcodeTag},
    utils::equal_ignoring_whitespace,
};

/// Algorithm compatibility versions. The integer values are persisted with stored diffs and
/// must keep resolving to the same behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum DiffCompatVersion {
    /// Legacy block-matching differ.
    SmDiffer = 0,
    /// Myers differ.
    Myers = 1,
    /// Myers differ bailing out of too expensive middle-snake searches.
    MyersSmsCostBail = 2,
}

impl DiffCompatVersion {
    pub const DEFAULT: Self = DiffCompatVersion::MyersSmsCostBail;
    pub const MYERS_VERSIONS: [Self; 2] = [
        DiffCompatVersion::Myers,
        DiffCompatVersion::MyersSmsCostBail,
    ];

    pub const fn value(self) -> i64 {
        self as i64
    }
}

impl Default for DiffCompatVersion {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for DiffCompatVersion {
    type Error = DiffError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DiffCompatVersion::SmDiffer),
            1 => Ok(DiffCompatVersion::Myers),
            2 => Ok(DiffCompatVersion::MyersSmsCostBail),
            other => Err(DiffError::InvalidCompatVersion(other)),
        }
    }
}

impl From<DiffCompatVersion> for i64 {
    fn from(version: DiffCompatVersion) -> Self {
        version.value()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Engine {
    SequenceMatcher,
    Myers { cost_bail: bool },
}

impl From<DiffCompatVersion> for Engine {
    fn from(version: DiffCompatVersion) -> Self {
        match version {
            DiffCompatVersion::SmDiffer => Engine::SequenceMatcher,
            DiffCompatVersion::Myers => Engine::Myers { cost_bail: false },
            DiffCompatVersion::MyersSmsCostBail => Engine::Myers { cost_bail: true },
        }
    }
}

impl Engine {
    /// The engine's opcodes before whitespace splitting and annotation.
    fn raw_opcodes<T: DiffLine>(self, a: &[T], b: &[T], ignore_space: bool) -> RawOpcodes {
        match self {
            Engine::Myers { cost_bail } => {
                RawOpcodes::Runs(myers::diff(a, b, ignore_space, cost_bail).into_opcodes())
            }
            // The legacy engine has always compared lines exactly.
            Engine::SequenceMatcher => {
                RawOpcodes::Blocks(smdiff::SequenceMatcher::new(a, b).get_opcodes().into_iter())
            }
        }
    }
}

enum RawOpcodes {
    Runs(myers::ChangeRuns),
    Blocks(std::vec::IntoIter<Opcode>),
}

impl Iterator for RawOpcodes {
    type Item = Opcode;

    fn next(&mut self) -> Option<Opcode> {
        match self {
            RawOpcodes::Runs(runs) => runs.next(),
            RawOpcodes::Blocks(blocks) => blocks.next(),
        }
    }
}

/// One comparison between two line sequences.
#[derive(Debug)]
pub struct Differ<'a, T> {
    a: &'a [T],
    b: &'a [T],
    ignore_space: bool,
    engine: Engine,
    patterns: PatternSet,
    interesting: InterestingLines,
    /// Lines of `a` below this index have already been scanned for interesting lines.
    scanned_through: usize,
}

impl<'a, T: DiffLine> Differ<'a, T> {
    pub fn new(
        a: &'a [T],
        b: &'a [T],
        ignore_space: bool,
        compat_version: DiffCompatVersion,
    ) -> Self {
        Differ {
            a,
            b,
            ignore_space,
            engine: Engine::from(compat_version),
            patterns: PatternSet::default(),
            interesting: InterestingLines::default(),
            scanned_through: 0,
        }
    }

    /// Register a regular expression used to look for interesting lines.
    ///
    /// Unchanged lines matching it at their start are stored under `name`; see
    /// [`get_interesting_lines`](Self::get_interesting_lines).
    pub fn add_interesting_line_regex(&mut self, name: &str, regex: Regex) {
        let slot = self.patterns.add(name, regex);
        self.interesting.ensure_slot(slot);
    }

    /// Compile `pattern` and register it like [`add_interesting_line_regex`](Self::add_interesting_line_regex).
    pub fn register_pattern(&mut self, name: &str, pattern: &str) -> Result<(), DiffError> {
        let slot = self.patterns.add_str(name, pattern)?;
        self.interesting.ensure_slot(slot);
        Ok(())
    }

    /// Watch for header lines (functions, classes, targets) of the file type matching
    /// `filename`, under the name `"header"`. Unknown file types register nothing.
    pub fn add_interesting_lines_for_headers(&mut self, filename: &str) {
        let patterns = header_patterns_for_filename(filename);
        tracing::trace!("{} header patterns for {}", patterns.len(), filename);
        for regex in patterns {
            self.add_interesting_line_regex(HEADER, regex.clone());
        }
    }

    /// Interesting lines collected so far under `name` for one side. Unregistered names
    /// yield an empty slice.
    pub fn get_interesting_lines(&self, name: &str, is_modified_file: bool) -> &[InterestingLine] {
        match self.patterns.slot_of(name) {
            Some(slot) => self
                .interesting
                .get(slot, Side::from_modified(is_modified_file)),
            None => &[],
        }
    }

    /// Stream the opcodes of the diff.
    ///
    /// The comparison runs when the first opcode is requested. Interesting lines are
    /// collected as equal spans are produced, so they are complete only once the stream is
    /// drained. Calling this again recomputes the same diff; collected interesting lines are
    /// kept and each line is scanned once over the lifetime of the differ.
    pub fn get_opcodes(&mut self) -> Opcodes<'_, 'a, T> {
        Opcodes {
            a: self.a,
            b: self.b,
            ignore_space: self.ignore_space,
            engine: self.engine,
            patterns: &self.patterns,
            interesting: &mut self.interesting,
            scanned_through: &mut self.scanned_through,
            raw: None,
            pending: VecDeque::new(),
        }
    }

    /// Share of lines left unchanged: `(unchanged in a + unchanged in b) / (len(a) + len(b))`.
    pub fn ratio(&self) -> f64 {
        let total = self.a.len() + self.b.len();
        if total == 0 {
            return 1.0;
        }
        let matched: usize = self
            .engine
            .raw_opcodes(self.a, self.b, self.ignore_space)
            .filter(|op| op.tag.is_equal())
            .map(|op| op.a_len())
            .sum();
        (2 * matched) as f64 / total as f64
    }
}

/// Lazy opcode stream of one [`Differ`].
pub struct Opcodes<'d, 'a, T> {
    a: &'a [T],
    b: &'a [T],
    ignore_space: bool,
    engine: Engine,
    patterns: &'d PatternSet,
    interesting: &'d mut InterestingLines,
    scanned_through: &'d mut usize,
    raw: Option<RawOpcodes>,
    pending: VecDeque<Opcode>,
}

impl<T: DiffLine> Opcodes<'_, '_, T> {
    /// Interesting lines collected up to the current position of the stream.
    pub fn interesting_lines(&self, name: &str, is_modified_file: bool) -> &[InterestingLine] {
        match self.patterns.slot_of(name) {
            Some(slot) => self
                .interesting
                .get(slot, Side::from_modified(is_modified_file)),
            None => &[],
        }
    }

    fn lines_match(&self, i: usize, j: usize) -> bool {
        !self.ignore_space || self.a[i] == self.b[j]
    }

    /// Split an engine `equal` span into exact and whitespace-only runs.
    fn split_equal(&mut self, op: Opcode) {
        if op.i1 == op.i2 {
            self.pending.push_back(op);
            return;
        }
        let (mut i, mut j) = (op.i1, op.j1);
        while i < op.i2 {
            let (i1, j1) = (i, j);
            let exact = self.lines_match(i, j);
            while i < op.i2 && self.lines_match(i, j) == exact {
                i += 1;
                j += 1;
            }
            let tag = if exact {
                OpcodeTag::Equal
            } else {
                OpcodeTag::FilteredEqual
            };
            self.record_unchanged(tag, i1, i, j1);
            self.pending.push_back(Opcode::new(tag, i1, i, j1, j));
        }
    }

    fn record_unchanged(&mut self, tag: OpcodeTag, i1: usize, i2: usize, j1: usize) {
        if self.patterns.is_empty() || i2 <= *self.scanned_through {
            return;
        }
        let skip = self.scanned_through.saturating_sub(i1);
        *self.scanned_through = i2;
        for (i, j) in (i1..i2).zip(j1..).skip(skip) {
            let a_text = self.a[i].text();
            if tag == OpcodeTag::Equal {
                for slot in self.patterns.matching_slots(&a_text) {
                    self.interesting.push(slot, Side::Original, i, &a_text);
                    self.interesting.push(slot, Side::Modified, j, &a_text);
                }
            } else {
                self.interesting
                    .record(self.patterns, Side::Original, i, &a_text);
                self.interesting
                    .record(self.patterns, Side::Modified, j, &self.b[j].text());
            }
        }
    }

    /// Attach whitespace metadata to a `replace` whose paired lines differ only in whitespace.
    fn annotate_replace(&self, mut op: Opcode) -> Opcode {
        let whitespace_lines: Vec<(usize, usize)> = (op.i1..op.i2)
            .zip(op.j1..op.j2)
            .filter(|&(i, j)| {
                equal_ignoring_whitespace(self.a[i].content(), self.b[j].content())
            })
            .collect();
        if !whitespace_lines.is_empty() {
            op.meta = Some(OpcodeMeta {
                whitespace_chunk: op.a_len() == op.b_len()
                    && whitespace_lines.len() == op.a_len(),
                whitespace_lines,
            });
        }
        op
    }
}

impl<T: DiffLine> Iterator for Opcodes<'_, '_, T> {
    type Item = Opcode;

    fn next(&mut self) -> Option<Opcode> {
        if let Some(op) = self.pending.pop_front() {
            return Some(op);
        }

        let raw = self
            .raw
            .get_or_insert_with(|| self.engine.raw_opcodes(self.a, self.b, self.ignore_space));
        let op = raw.next()?;
        match op.tag {
            OpcodeTag::Equal => {
                self.split_equal(op);
                self.pending.pop_front()
            }
            OpcodeTag::Replace => Some(self.annotate_replace(op)),
            _ => Some(op),
        }
    }
}

/// Build a differ for `a` and `b` using the engine persisted as `compat_version`.
///
/// By default callers should pass [`DiffCompatVersion::DEFAULT`]; older versions exist only to
/// reproduce stored diffs. Unknown versions are an error, never a fallback.
pub fn get_differ<'a, T: DiffLine>(
    a: &'a [T],
    b: &'a [T],
    ignore_space: bool,
    compat_version: i64,
) -> Result<Differ<'a, T>, DiffError> {
    let version = DiffCompatVersion::try_from(compat_version)?;
    tracing::debug!(
        "creating {:?} differ for {} vs {} lines (ignore_space: {})",
        version,
        a.len(),
        b.len(),
        ignore_space
    );
    Ok(Differ::new(a, b, ignore_space, version))
}

/// Build a differ from stored settings.
pub fn get_differ_with_config<'a, T: DiffLine>(
    a: &'a [T],
    b: &'a [T],
    config: &DiffConfig,
) -> Differ<'a, T> {
    Differ::new(a, b, config.ignore_space, config.compat_version)
}

/// Differ over dynamically typed [`Lines`].
#[derive(Debug)]
pub enum LinesDiffer<'a> {
    Text(Differ<'a, String>),
    Bytes(Differ<'a, Vec<u8>>),
}

/// Build a differ over stored line content; both sides must hold the same kind of lines.
pub fn get_lines_differ<'a>(
    a: &'a Lines,
    b: &'a Lines,
    ignore_space: bool,
    compat_version: i64,
) -> Result<LinesDiffer<'a>, DiffError> {
    match (a, b) {
        (Lines::Text(a), Lines::Text(b)) => Ok(LinesDiffer::Text(get_differ(
            a,
            b,
            ignore_space,
            compat_version,
        )?)),
        (Lines::Bytes(a), Lines::Bytes(b)) => Ok(LinesDiffer::Bytes(get_differ(
            a,
            b,
            ignore_space,
            compat_version,
        )?)),
        _ => Err(DiffError::TypeMismatch {
            a: a.kind(),
            b: b.kind(),
        }),
    }
}

impl<'a> LinesDiffer<'a> {
    pub fn add_interesting_line_regex(&mut self, name: &str, regex: Regex) {
        match self {
            LinesDiffer::Text(d) => d.add_interesting_line_regex(name, regex),
            LinesDiffer::Bytes(d) => d.add_interesting_line_regex(name, regex),
        }
    }

    pub fn register_pattern(&mut self, name: &str, pattern: &str) -> Result<(), DiffError> {
        match self {
            LinesDiffer::Text(d) => d.register_pattern(name, pattern),
            LinesDiffer::Bytes(d) => d.register_pattern(name, pattern),
        }
    }

    pub fn add_interesting_lines_for_headers(&mut self, filename: &str) {
        match self {
            LinesDiffer::Text(d) => d.add_interesting_lines_for_headers(filename),
            LinesDiffer::Bytes(d) => d.add_interesting_lines_for_headers(filename),
        }
    }

    pub fn get_interesting_lines(&self, name: &str, is_modified_file: bool) -> &[InterestingLine] {
        match self {
            LinesDiffer::Text(d) => d.get_interesting_lines(name, is_modified_file),
            LinesDiffer::Bytes(d) => d.get_interesting_lines(name, is_modified_file),
        }
    }

    pub fn get_opcodes(&mut self) -> LinesOpcodes<'_, 'a> {
        match self {
            LinesDiffer::Text(d) => LinesOpcodes::Text(d.get_opcodes()),
            LinesDiffer::Bytes(d) => LinesOpcodes::Bytes(d.get_opcodes()),
        }
    }

    pub fn ratio(&self) -> f64 {
        match self {
            LinesDiffer::Text(d) => d.ratio(),
            LinesDiffer::Bytes(d) => d.ratio(),
        }
    }
}

/// Opcode stream of a [`LinesDiffer`].
pub enum LinesOpcodes<'d, 'a> {
    Text(Opcodes<'d, 'a, String>),
    Bytes(Opcodes<'d, 'a, Vec<u8>>),
}

impl Iterator for LinesOpcodes<'_, '_> {
    type Item = Opcode;

    fn next(&mut self) -> Option<Opcode> {
        match self {
            LinesOpcodes::Text(ops) => ops.next(),
            LinesOpcodes::Bytes(ops) => ops.next(),
        }
    }
}
