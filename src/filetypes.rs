//! Header patterns by file type: lines (functions, classes, targets) that viewers show as
//! context for collapsed regions of a diff.

use std::{path::Path, sync::LazyLock};

use ahash::AHashMap;
use regex::Regex;

/// Name under which header patterns are registered.
pub const HEADER: &str = "header";

const METHOD_SIGNATURE: &str = concat!(
    r"^\s*((public|private|protected|static)\s+)+",
    r"([a-zA-Z_][a-zA-Z0-9_\.\[\]]*\s+)+?",
    r"[a-zA-Z_][a-zA-Z0-9_]*",
    r"\s*\(",
);

const OBJC_DECLARATION: &str = r"^@(interface|implementation|class|protocol)";
const TOP_LEVEL_IDENTIFIER: &str = r"^[A-Za-z0-9$_]";

static HEADER_PATTERNS: LazyLock<AHashMap<&'static str, Vec<Regex>>> = LazyLock::new(|| {
    let table: [(&str, &[&str]); 11] = [
        (
            ".c",
            &[OBJC_DECLARATION, TOP_LEVEL_IDENTIFIER],
        ),
        (
            ".cs",
            &[
                METHOD_SIGNATURE,
                r"^\s*((public|static|private|protected|internal|abstract|partial)\s+)*(class|struct)\s+([A-Za-z0-9_])+",
            ],
        ),
        (
            ".java",
            &[
                METHOD_SIGNATURE,
                r"^\s*((public|static|private|protected)\s+)*(class|struct)\s+([A-Za-z0-9_])+",
            ],
        ),
        (
            ".js",
            &[
                r"^\s*function [A-Za-z0-9_]+\s*\(",
                r"^\s*(var\s+)?[A-Za-z0-9_]+\s*[=:]\s*function\s*\(",
            ],
        ),
        (
            ".m",
            &[
                OBJC_DECLARATION,
                r"^[-+]\s+\([^\)]+\)\s+[A-Za-z0-9_]+[^;]*$",
                TOP_LEVEL_IDENTIFIER,
            ],
        ),
        (
            ".mk",
            &[r"^[A-Za-z0-9_.$()%/-]+\s*::?([^=]|$)"],
        ),
        (
            ".php",
            &[r"^\s*(public\s+|private\s+|protected\s+)?(static\s+)?(abstract\s+)?(class|interface|function)\s+[A-Za-z0-9_]"],
        ),
        (".pl", &[r"^\s*sub [A-Za-z0-9_]+"]),
        (".py", &[r"^\s*(def|class) [A-Za-z0-9_]+\s*\(?"]),
        (".rb", &[r"^\s*(def|class) [A-Za-z0-9_]+\s*\(?"]),
        (
            ".rs",
            &[r"^\s*(pub(\([a-z:]+\))?\s+)?((const|async|unsafe|extern\s+\S+)\s+)*(fn|struct|enum|trait|union|impl|mod|macro_rules!)[\s<]"],
        ),
    ];

    table
        .into_iter()
        .map(|(ext, patterns)| {
            let compiled = patterns
                .iter()
                .map(|p| Regex::new(p).expect("Invalid header pattern"))
                .collect();
            (ext, compiled)
        })
        .collect()
});

static HEADER_ALIASES: LazyLock<AHashMap<&'static str, &'static str>> = LazyLock::new(|| {
    [
        // C/C++/Objective-C
        (".cc", ".c"),
        (".cpp", ".c"),
        (".cxx", ".c"),
        (".c++", ".c"),
        (".h", ".c"),
        (".hh", ".c"),
        (".hpp", ".c"),
        (".hxx", ".c"),
        (".h++", ".c"),
        (".C", ".c"),
        (".H", ".c"),
        (".mm", ".m"),
        // Make
        ("Makefile", ".mk"),
        ("makefile", ".mk"),
        ("GNUmakefile", ".mk"),
        (".mak", ".mk"),
        // Perl
        (".pm", ".pl"),
        // Python
        ("SConstruct", ".py"),
        ("SConscript", ".py"),
        (".pyw", ".py"),
        (".sc", ".py"),
        // Ruby
        ("Rakefile", ".rb"),
        (".rbw", ".rb"),
        (".rake", ".rb"),
        (".gemspec", ".rb"),
        (".rbx", ".rb"),
    ]
    .into_iter()
    .collect()
});

/// Look up the header patterns for `filename`.
///
/// The base name is checked against the alias table first (`Makefile`, `Rakefile`), then the
/// extension against the pattern table and the alias table. Unknown files yield no patterns.
pub fn header_patterns_for_filename(filename: &str) -> &'static [Regex] {
    let path = Path::new(filename);
    let base = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(filename);

    if let Some(target) = HEADER_ALIASES.get(base) {
        return patterns_for(target);
    }

    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return &[];
    };
    let ext = format!(".{ext}");

    if HEADER_PATTERNS.contains_key(ext.as_str()) {
        patterns_for(&ext)
    } else if let Some(target) = HEADER_ALIASES.get(ext.as_str()) {
        patterns_for(target)
    } else {
        &[]
    }
}

fn patterns_for(key: &str) -> &'static [Regex] {
    HEADER_PATTERNS
        .get(key)
        .map(Vec::as_slice)
        .unwrap_or_default()
}
