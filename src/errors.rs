//! Error types for the differ crate.
//!
//! Construction of a differ is the only fallible step: comparisons themselves are pure
//! functions of their inputs and never fail once an engine exists.
//!
//! Notes:
//! - Variants carry the offending value so stored-diff reproduction failures are diagnosable.
//! - Pattern compilation errors keep the underlying `regex::Error` as their source.

use thiserror::Error;

#[derive(Error, Debug)]
/// Unified error enumeration for differ construction and configuration.
pub enum DiffError {
    /// The two sequences handed to the dynamic entry point hold different element kinds.
    #[error("Cannot diff sequences of different types: `{a}` against `{b}`")]
    TypeMismatch { a: &'static str, b: &'static str },

    /// No engine is registered for the requested compatibility version.
    #[error("Invalid diff compatibility version ({0}) passed to Differ")]
    InvalidCompatVersion(i64),

    /// An interesting-line pattern supplied as a string failed to compile.
    #[error("Invalid interesting line pattern `{name}`: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}
