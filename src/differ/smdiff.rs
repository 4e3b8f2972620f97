//! Legacy block-matching engine, kept only to re-render diffs stored before the Myers engine
//! became the default. Its output is frozen: it finds the longest matching block, recurses on
//! both sides of it, and turns the matching blocks into opcodes.
//!
//! Elements of `b` occurring more than `len(b) / 100 + 1` times are "popular" once `b` has at
//! least 200 elements; popular elements never seed a match but may extend one.
//!
//! One deliberate departure from the frozen output: two empty sequences yield a single
//! `equal(0, 0, 0, 0)` instead of no opcodes, matching the Myers engines.

use std::hash::Hash;

use ahash::AHashMap;

use crate::opcode::{Opcode, OpcodeTag};

const AUTOJUNK_MIN_LEN: usize = 200;

/// A matching block: `a[i..i + size] == b[j..j + size]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Match {
    pub i: usize,
    pub j: usize,
    pub size: usize,
}

pub struct SequenceMatcher<'a, T> {
    a: &'a [T],
    b: &'a [T],
    /// Positions of every non-popular element of `b`, ascending.
    b2j: AHashMap<&'a T, Vec<usize>>,
}

impl<'a, T: Eq + Hash> SequenceMatcher<'a, T> {
    pub fn new(a: &'a [T], b: &'a [T]) -> Self {
        let mut b2j: AHashMap<&'a T, Vec<usize>> = AHashMap::new();
        for (j, elt) in b.iter().enumerate() {
            b2j.entry(elt).or_default().push(j);
        }

        let n = b.len();
        if n >= AUTOJUNK_MIN_LEN {
            let ntest = n / 100 + 1;
            let before = b2j.len();
            b2j.retain(|_, positions| positions.len() <= ntest);
            tracing::trace!(
                "sequence matcher: {} popular elements ignored as match seeds",
                before - b2j.len()
            );
        }

        SequenceMatcher { a, b, b2j }
    }

    /// Longest matching block in `a[alo..ahi]` / `b[blo..bhi]`, earliest in `a` then in `b`
    /// on ties.
    pub fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> Match {
        let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0);
        let mut j2len: AHashMap<usize, usize> = AHashMap::new();

        for i in alo..ahi {
            let mut next_j2len = AHashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = if j == 0 {
                        1
                    } else {
                        j2len.get(&(j - 1)).copied().unwrap_or(0) + 1
                    };
                    next_j2len.insert(j, k);
                    if k > bestsize {
                        besti = i + 1 - k;
                        bestj = j + 1 - k;
                        bestsize = k;
                    }
                }
            }
            j2len = next_j2len;
        }

        // Popular elements cannot seed a block but still extend one.
        while besti > alo && bestj > blo && self.a[besti - 1] == self.b[bestj - 1] {
            besti -= 1;
            bestj -= 1;
            bestsize += 1;
        }
        while besti + bestsize < ahi
            && bestj + bestsize < bhi
            && self.a[besti + bestsize] == self.b[bestj + bestsize]
        {
            bestsize += 1;
        }

        Match {
            i: besti,
            j: bestj,
            size: bestsize,
        }
    }

    /// Non-adjacent matching blocks in increasing order, ending with a zero-size sentinel at
    /// `(len(a), len(b))`.
    pub fn get_matching_blocks(&self) -> Vec<Match> {
        let (la, lb) = (self.a.len(), self.b.len());
        let mut queue = vec![(0, la, 0, lb)];
        let mut blocks = Vec::new();

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let m = self.find_longest_match(alo, ahi, blo, bhi);
            if m.size > 0 {
                blocks.push(m);
                if alo < m.i && blo < m.j {
                    queue.push((alo, m.i, blo, m.j));
                }
                if m.i + m.size < ahi && m.j + m.size < bhi {
                    queue.push((m.i + m.size, ahi, m.j + m.size, bhi));
                }
            }
        }
        blocks.sort();

        let mut collapsed: Vec<Match> = Vec::with_capacity(blocks.len() + 1);
        for m in blocks {
            match collapsed.last_mut() {
                Some(last) if last.i + last.size == m.i && last.j + last.size == m.j => {
                    last.size += m.size;
                }
                _ => collapsed.push(m),
            }
        }
        collapsed.push(Match {
            i: la,
            j: lb,
            size: 0,
        });
        collapsed
    }

    pub fn get_opcodes(&self) -> Vec<Opcode> {
        let mut opcodes = Vec::new();
        let (mut i, mut j) = (0, 0);

        for m in self.get_matching_blocks() {
            let tag = match (i < m.i, j < m.j) {
                (true, true) => Some(OpcodeTag::Replace),
                (true, false) => Some(OpcodeTag::Delete),
                (false, true) => Some(OpcodeTag::Insert),
                (false, false) => None,
            };
            if let Some(tag) = tag {
                opcodes.push(Opcode::new(tag, i, m.i, j, m.j));
            }
            i = m.i + m.size;
            j = m.j + m.size;
            if m.size > 0 {
                opcodes.push(Opcode::new(OpcodeTag::Equal, m.i, i, m.j, j));
            }
        }

        if opcodes.is_empty() {
            opcodes.push(Opcode::new(OpcodeTag::Equal, 0, 0, 0, 0));
        }
        opcodes
    }
}
