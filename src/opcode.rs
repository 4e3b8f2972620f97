//! Opcode vocabulary shared by every engine: one tagged span of correspondence or divergence
//! between `a[i1..i2]` and `b[j1..j2]`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of span an opcode describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpcodeTag {
    Equal,
    /// Equal once ignored content (whitespace) is removed, but not byte-identical.
    FilteredEqual,
    Delete,
    Insert,
    Replace,
}

impl OpcodeTag {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OpcodeTag::Equal => "equal",
            OpcodeTag::FilteredEqual => "filtered-equal",
            OpcodeTag::Delete => "delete",
            OpcodeTag::Insert => "insert",
            OpcodeTag::Replace => "replace",
        }
    }

    /// Whether the span is treated as unchanged for diff purposes.
    pub const fn is_equal(&self) -> bool {
        matches!(self, OpcodeTag::Equal | OpcodeTag::FilteredEqual)
    }
}

impl fmt::Display for OpcodeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Auxiliary annotations attached to some opcodes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpcodeMeta {
    /// True when every line of an equal-length `replace` differs only in whitespace.
    pub whitespace_chunk: bool,
    /// `(i, j)` index pairs of replaced lines that differ only in whitespace.
    pub whitespace_lines: Vec<(usize, usize)>,
}

/// A single edit-script entry covering the half-open ranges `[i1, i2)` of A and `[j1, j2)` of B.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opcode {
    pub tag: OpcodeTag,
    pub i1: usize,
    pub i2: usize,
    pub j1: usize,
    pub j2: usize,
    pub meta: Option<OpcodeMeta>,
}

impl Opcode {
    pub fn new(tag: OpcodeTag, i1: usize, i2: usize, j1: usize, j2: usize) -> Self {
        debug_assert!(i1 <= i2 && j1 <= j2);
        debug_assert!(!tag.is_equal() || i2 - i1 == j2 - j1);
        Opcode {
            tag,
            i1,
            i2,
            j1,
            j2,
            meta: None,
        }
    }

    /// The `(tag, i1, i2, j1, j2)` tuple, ignoring metadata.
    pub fn as_tuple(&self) -> (OpcodeTag, usize, usize, usize, usize) {
        (self.tag, self.i1, self.i2, self.j1, self.j2)
    }

    pub fn a_len(&self) -> usize {
        self.i2 - self.i1
    }

    pub fn b_len(&self) -> usize {
        self.j2 - self.j1
    }

    /// Check the per-tag shape rules: equal spans are square, deletes leave B untouched,
    /// inserts leave A untouched and replaces touch both sides.
    pub fn is_well_formed(&self) -> bool {
        if self.i1 > self.i2 || self.j1 > self.j2 {
            return false;
        }
        match self.tag {
            OpcodeTag::Equal | OpcodeTag::FilteredEqual => self.a_len() == self.b_len(),
            OpcodeTag::Delete => self.a_len() > 0 && self.j1 == self.j2,
            OpcodeTag::Insert => self.b_len() > 0 && self.i1 == self.i2,
            OpcodeTag::Replace => self.a_len() > 0 && self.b_len() > 0,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {}, {})",
            self.tag, self.i1, self.i2, self.j1, self.j2
        )
    }
}

/// Check that `opcodes` tile `[0, a_len)` and `[0, b_len)` contiguously and that each
/// opcode is well formed.
pub fn opcodes_tile(opcodes: &[Opcode], a_len: usize, b_len: usize) -> bool {
    let (mut i, mut j) = (0, 0);
    for op in opcodes {
        if !op.is_well_formed() || op.i1 != i || op.j1 != j {
            // The empty diff is reported as a single zero-width equal span.
            if !(op.tag == OpcodeTag::Equal && a_len == 0 && b_len == 0 && opcodes.len() == 1)
            {
                return false;
            }
        }
        i = op.i2;
        j = op.j2;
    }
    i == a_len && j == b_len
}
