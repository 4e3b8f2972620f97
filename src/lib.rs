//! rb-differ: the line-level differencing engine behind a code-review diff viewer. It turns two
//! line sequences into opcodes and collects "interesting lines" (function and class headers)
//! to annotate collapsed regions.
//!
//! Goals
//! - Produce minimal, well-shaped edit scripts for line sequences.
//! - Reproduce stored diffs exactly: every engine is selected by a persisted compatibility version.
//! - Bound the work spent on pathological inputs without affecting the rest of a comparison.
//!
//! Core Capabilities
//! - Myers shortest-edit-script engine with popularity discards, boundary shifting and an optional
//!   middle-snake cost bail.
//! - Legacy block-matching engine frozen for old diffs.
//! - Whitespace-insensitive comparison reported as `filtered-equal` spans, and whitespace-only
//!   replace annotations.
//! - Interesting-line patterns, registered by hand or per file type.
//!
//! Modules
//! - `differ`: version dispatch, the `Differ` type and its lazy opcode stream.
//! - `opcode`: the result vocabulary.
//! - `interesting` and `filetypes`: pattern registration and header tables.
//! - `line`: the line abstraction and dynamically typed line content.
//! - `config` and `errors`: stored settings and unified error types.
//!
//! Typical Usage
//! - `get_differ(&old, &new, false, DiffCompatVersion::DEFAULT.value())?`, then
//!   `add_interesting_lines_for_headers(path)`, then drain `get_opcodes()`.

pub mod config;
pub mod differ;
pub mod errors;
pub mod filetypes;
pub mod interesting;
pub mod line;
pub mod opcode;
pub mod utils;

pub use config::DiffConfig;
pub use differ::{
    DiffCompatVersion, Differ, LinesDiffer, Opcodes, get_differ, get_differ_with_config,
    get_lines_differ,
};
pub use errors::DiffError;
pub use interesting::InterestingLine;
pub use line::{DiffLine, Lines};
pub use opcode::{Opcode, OpcodeMeta, OpcodeTag};
