//! Integration tests for the differ: opcode shapes for the documented scenarios, whitespace
//! handling, compatibility-version dispatch, cost-bail determinism and interesting lines.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use tracing::{
    Event,
    field::{Field, Visit},
};
use tracing_subscriber::{
    Layer,
    layer::{Context, SubscriberExt},
    util::SubscriberInitExt,
};

use quickcheck::{QuickCheck, TestResult};
use rayon::prelude::*;
use rb_differ::{
    DiffCompatVersion, DiffConfig, DiffError, Opcode, OpcodeTag, get_differ,
    get_differ_with_config, opcode::opcodes_tile,
};

type Tuple = (OpcodeTag, usize, usize, usize, usize);

const ALL_VERSIONS: [i64; 3] = [0, 1, 2];

fn init_logger() {
    let _ = tracing_subscriber::fmt::Subscriber::builder()
        .with_target(false)
        .without_time()
        .with_level(true)
        .with_max_level(tracing::Level::DEBUG)
        .finish()
        .try_init(); // avoid multi-init
}

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn opcodes(a: &[String], b: &[String], ignore_space: bool, version: i64) -> Vec<Opcode> {
    let mut differ = get_differ(a, b, ignore_space, version).expect("valid version");
    differ.get_opcodes().collect()
}

fn tuples(a: &[String], b: &[String], ignore_space: bool, version: i64) -> Vec<Tuple> {
    opcodes(a, b, ignore_space, version)
        .iter()
        .map(Opcode::as_tuple)
        .collect()
}

/// A block that forces a long middle-snake search: distinct lines against their reverse.
fn pathological(n: usize, prefix: &str) -> (Vec<String>, Vec<String>) {
    let a: Vec<String> = (0..n).map(|i| format!("{prefix} {i}")).collect();
    let b: Vec<String> = a.iter().rev().cloned().collect();
    (a, b)
}

/// Concrete single-line change yields equal / replace / equal on every engine.
#[test]
fn single_line_replace() {
    let a = lines(&["a", "b", "c", "d"]);
    let b = lines(&["a", "x", "c", "d"]);
    for version in ALL_VERSIONS {
        assert_eq!(
            tuples(&a, &b, false, version),
            vec![
                (OpcodeTag::Equal, 0, 1, 0, 1),
                (OpcodeTag::Replace, 1, 2, 1, 2),
                (OpcodeTag::Equal, 2, 4, 2, 4),
            ],
            "version {version}"
        );
    }
}

/// Identical inputs yield one equal opcode spanning everything.
#[test]
fn identity() {
    let a = lines(&["fn main() {", "", "    println!(\"hi\");", "", "}"]);
    for version in ALL_VERSIONS {
        for ignore_space in [false, true] {
            assert_eq!(
                tuples(&a, &a.clone(), ignore_space, version),
                vec![(OpcodeTag::Equal, 0, 5, 0, 5)]
            );
        }
    }
    assert_eq!(tuples(&[], &[], false, 2), vec![(OpcodeTag::Equal, 0, 0, 0, 0)]);
}

/// Sequences with nothing in common are one replace.
#[test]
fn total_replace() {
    let a = lines(&["a", "b", "c"]);
    let b = lines(&["x", "y"]);
    for version in ALL_VERSIONS {
        assert_eq!(
            tuples(&a, &b, false, version),
            vec![(OpcodeTag::Replace, 0, 3, 0, 2)]
        );
    }
}

/// Empty sides yield a single insert or delete.
#[test]
fn pure_insert_and_delete() {
    let xyz = lines(&["x", "y", "z"]);
    for version in ALL_VERSIONS {
        assert_eq!(
            tuples(&[], &xyz, false, version),
            vec![(OpcodeTag::Insert, 0, 0, 0, 3)]
        );
        assert_eq!(
            tuples(&xyz, &[], false, version),
            vec![(OpcodeTag::Delete, 0, 3, 0, 0)]
        );
    }
}

/// Trailing whitespace is filtered-equal with ignore_space and a replace without it.
#[test]
fn whitespace_filtering() {
    let a = lines(&["foo "]);
    let b = lines(&["foo"]);
    assert_eq!(
        tuples(&a, &b, true, 2),
        vec![(OpcodeTag::FilteredEqual, 0, 1, 0, 1)]
    );
    assert_eq!(tuples(&a, &b, false, 2), vec![(OpcodeTag::Replace, 0, 1, 0, 1)]);

    let ops = opcodes(&a, &b, false, 2);
    let meta = ops[0].meta.as_ref().expect("whitespace metadata");
    assert!(meta.whitespace_chunk);
    assert_eq!(meta.whitespace_lines, vec![(0, 0)]);
}

/// Whitespace-only lines still compare exactly in ignore_space mode.
#[test]
fn whitespace_only_lines_compare_exactly() {
    let a = lines(&["a", "  ", "b"]);
    let b = lines(&["a", "", "b"]);
    assert_eq!(
        tuples(&a, &b, true, 1),
        vec![
            (OpcodeTag::Equal, 0, 1, 0, 1),
            (OpcodeTag::Replace, 1, 2, 1, 2),
            (OpcodeTag::Equal, 2, 3, 2, 3),
        ]
    );
}

/// Unknown versions fail and name the value.
#[test]
fn invalid_version() {
    let a = lines(&["a"]);
    match get_differ(&a, &a, false, 999) {
        Err(err @ DiffError::InvalidCompatVersion(999)) => {
            assert!(err.to_string().contains("999"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

/// Stored settings select the same engine as the raw integer.
#[test]
fn config_selects_engine() {
    let a = lines(&["a", "b", "c"]);
    let b = lines(&["c", "b", "a"]);
    for version in ALL_VERSIONS {
        let config = DiffConfig {
            ignore_space: false,
            compat_version: DiffCompatVersion::try_from(version).unwrap(),
        };
        let mut differ = get_differ_with_config(&a, &b, &config);
        let from_config: Vec<Tuple> = differ.get_opcodes().map(|op| op.as_tuple()).collect();
        assert_eq!(from_config, tuples(&a, &b, false, version));
    }
}

/// Pattern matches on unchanged lines keep source order and skip non-matching lines.
#[test]
fn interesting_lines_ordering() {
    let a = lines(&["FOO", "bar", "BAZ"]);
    let b = a.clone();
    for version in ALL_VERSIONS {
        let mut differ = get_differ(&a, &b, false, version).unwrap();
        differ.register_pattern("upper", r"^[A-Z]+$").unwrap();
        assert!(differ.get_interesting_lines("upper", false).is_empty());

        let _ = differ.get_opcodes().count();
        for side in [false, true] {
            let found: Vec<(usize, &str)> = differ
                .get_interesting_lines("upper", side)
                .iter()
                .map(|line| (line.line, line.text.as_str()))
                .collect();
            assert_eq!(found, vec![(0, "FOO"), (2, "BAZ")]);
        }
        assert!(differ.get_interesting_lines("lower", false).is_empty());
    }
}

/// Filtered-equal lines are matched on each side with that side's text and index.
#[test]
fn interesting_lines_on_filtered_equal() {
    let a = lines(&["new", "def foo():", "x"]);
    let b = lines(&["def foo(): ", "x"]);
    let mut differ = get_differ(&a, &b, true, 2).unwrap();
    differ.add_interesting_lines_for_headers("pkg/mod.py");
    let ops: Vec<Tuple> = differ.get_opcodes().map(|op| op.as_tuple()).collect();
    assert_eq!(
        ops,
        vec![
            (OpcodeTag::Delete, 0, 1, 0, 0),
            (OpcodeTag::FilteredEqual, 1, 2, 0, 1),
            (OpcodeTag::Equal, 2, 3, 1, 2),
        ]
    );
    assert_eq!(differ.get_interesting_lines("header", false)[0].line, 1);
    let modified = &differ.get_interesting_lines("header", true)[0];
    assert_eq!((modified.line, modified.text.as_str()), (0, "def foo(): "));
}

/// Counts cost-bail events logged by the Myers engine.
#[derive(Clone, Default)]
struct BailCounter(Arc<AtomicUsize>);

impl BailCounter {
    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: tracing::Subscriber> Layer<S> for BailCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        if visitor.0.contains("bailing") {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Run `version` over `a`/`b` and return its opcodes with the number of bails it logged.
fn opcodes_counting_bails(a: &[String], b: &[String], version: i64) -> (Vec<Opcode>, usize) {
    let counter = BailCounter::default();
    let subscriber = tracing_subscriber::registry().with(counter.clone());
    let ops = tracing::subscriber::with_default(subscriber, || opcodes(a, b, false, version));
    (ops, counter.count())
}

fn unchanged(ops: &[Opcode]) -> usize {
    ops.iter()
        .filter(|op| op.tag == OpcodeTag::Equal)
        .map(Opcode::a_len)
        .sum()
}

/// Two expensive blocks around an anchored region with one real edit: the bail only
/// degrades the expensive blocks, the anchored edit comes out as with the exact engine.
#[test]
fn cost_bail_is_deterministic_and_local() {
    init_logger();
    let (head_a, head_b) = pathological(1000, "head");
    let (tail_a, tail_b) = pathological(1000, "tail");
    let anchor: Vec<String> = (0..200).map(|i| format!("anchor {i}")).collect();
    let mut anchor_a = anchor.clone();
    let mut anchor_b = anchor;
    anchor_a[100] = "edit old".to_string();
    anchor_b[100] = "edit new".to_string();

    let a: Vec<String> = head_a.iter().chain(&anchor_a).chain(&tail_a).cloned().collect();
    let b: Vec<String> = head_b.iter().chain(&anchor_b).chain(&tail_b).cloned().collect();

    let (exact, exact_bails) = opcodes_counting_bails(&a, &b, 1);
    let (bailed, bails) = opcodes_counting_bails(&a, &b, 2);
    assert_eq!(exact_bails, 0);
    assert!(bails > 0);

    let (again, bails_again) = opcodes_counting_bails(&a, &b, 2);
    assert_eq!(bailed, again);
    assert_eq!(bails, bails_again);

    for ops in [&exact, &bailed] {
        assert!(opcodes_tile(ops, a.len(), b.len()));
        let found: Vec<Tuple> = ops.iter().map(Opcode::as_tuple).collect();
        for expected in [
            (OpcodeTag::Equal, 1000, 1100, 1000, 1100),
            (OpcodeTag::Replace, 1100, 1101, 1100, 1101),
            (OpcodeTag::Equal, 1101, 1200, 1101, 1200),
        ] {
            assert!(found.contains(&expected), "missing {expected:?}");
        }
    }
    for op in bailed.iter().filter(|op| op.tag == OpcodeTag::Equal) {
        assert_eq!(a[op.i1..op.i2], b[op.j1..op.j2]);
    }
    assert!(unchanged(&bailed) <= unchanged(&exact));
}

/// Independent comparisons share nothing and give the same opcodes in parallel.
#[test]
fn parallel_comparisons_match_sequential() {
    let pairs: Vec<(Vec<String>, Vec<String>)> = (0..16)
        .map(|n| {
            let a: Vec<String> = (0..200).map(|i| format!("{} {}", i % (n + 3), i)).collect();
            let mut b = a.clone();
            b.retain(|line| !line.ends_with('7'));
            b.insert(b.len() / 2, format!("inserted {n}"));
            (a, b)
        })
        .collect();

    let sequential: Vec<Vec<Opcode>> = pairs.iter().map(|(a, b)| opcodes(a, b, false, 2)).collect();
    let parallel: Vec<Vec<Opcode>> = pairs
        .par_iter()
        .map(|(a, b)| opcodes(a, b, false, 2))
        .collect();
    assert_eq!(sequential, parallel);
}

fn small_lines(raw: &[u8], alphabet: u8, max: usize) -> Vec<String> {
    raw.iter()
        .take(max)
        .map(|x| format!("line {}", x % alphabet))
        .collect()
}

/// Opcodes tile both sequences and equal spans really are equal.
#[test]
fn opcodes_always_tile() {
    fn prop(a: Vec<u8>, b: Vec<u8>, ignore_space: bool) -> bool {
        let a = small_lines(&a, 5, 40);
        let b = small_lines(&b, 5, 40);
        ALL_VERSIONS.iter().all(|&version| {
            let ops = opcodes(&a, &b, ignore_space, version);
            opcodes_tile(&ops, a.len(), b.len())
                && ops
                    .iter()
                    .filter(|op| op.tag == OpcodeTag::Equal)
                    .all(|op| a[op.i1..op.i2] == b[op.j1..op.j2])
        })
    }
    QuickCheck::new()
        .tests(300)
        .quickcheck(prop as fn(Vec<u8>, Vec<u8>, bool) -> bool);
}

/// Diffing against an identical copy yields one equal opcode.
#[test]
fn identity_property() {
    fn prop(a: Vec<u8>) -> bool {
        let a = small_lines(&a, 4, 60);
        ALL_VERSIONS.iter().all(|&version| {
            let ops = tuples(&a, &a, false, version);
            ops == vec![(OpcodeTag::Equal, 0, a.len(), 0, a.len())]
        })
    }
    QuickCheck::new().quickcheck(prop as fn(Vec<u8>) -> bool);
}

/// Without popularity discards the exact Myers engine keeps as many lines as an LCS.
#[test]
fn exact_myers_is_minimal() {
    fn prop(a: Vec<u8>, b: Vec<u8>) -> TestResult {
        let a = small_lines(&a, 6, 15);
        let b = small_lines(&b, 6, 15);
        let popular = |lines: &[String], other: &[String]| {
            lines
                .iter()
                .any(|line| other.iter().filter(|o| *o == line).count() > 5)
        };
        if popular(&a, &b) || popular(&b, &a) {
            return TestResult::discard();
        }

        let ours: usize = opcodes(&a, &b, false, 1)
            .iter()
            .filter(|op| op.tag == OpcodeTag::Equal)
            .map(Opcode::a_len)
            .sum();
        let theirs: usize = similar::capture_diff_slices(similar::Algorithm::Myers, &a, &b)
            .iter()
            .filter_map(|op| match op {
                similar::DiffOp::Equal { len, .. } => Some(*len),
                _ => None,
            })
            .sum();
        TestResult::from_bool(ours == theirs)
    }
    QuickCheck::new()
        .tests(300)
        .quickcheck(prop as fn(Vec<u8>, Vec<u8>) -> TestResult);
}
