//! Myers shortest-edit-script engine.
//!
//! Lines are first mapped to integer codes through a hash index. Lines with no counterpart
//! on the other side are discarded up front (they can never match), and over-popular lines are
//! provisionally discarded when they sit inside runs of unmatched lines, so blank lines and
//! braces do not anchor degenerate alignments. The remaining codes are aligned with the
//! bidirectional middle-snake search; change groups are finally slid so they line up with the
//! other side and end as late as possible.
//!
//! With the cost bail enabled, a middle-snake search that runs past the cost limit stops and
//! splits at the furthest-reaching diagonal found so far. Only that subrange loses
//! optimality. The limit is part of the stored-diff contract, see [`cost_limit`].

use ahash::AHashMap;

use crate::{
    line::DiffLine,
    opcode::{Opcode, OpcodeTag},
    utils::{strip_whitespace, very_approx_sqrt},
};

/// Floor of the middle-snake cost limit.
const MIN_COST_LIMIT: usize = 256;

/// Consecutive unmatched lines that stop the provisional-discard scan at a run's edge.
const RUN_EDGE_CONSEC: usize = 3;

/// Lines scanned into a run before an unmatched line stops the edge scan.
const RUN_EDGE_SCAN: usize = 8;

#[derive(Hash, PartialEq, Eq)]
enum LineKey<'a, T> {
    Exact(&'a T),
    /// Line content with all whitespace removed, used in ignore-space mode.
    Collapsed(Vec<u8>),
}

/// Integer codes for both sides plus per-code occurrence counts.
struct LineIndex {
    a: Vec<usize>,
    b: Vec<usize>,
    /// `counts[code] = [occurrences in a, occurrences in b]`
    counts: Vec<[usize; 2]>,
}

impl LineIndex {
    fn build<'a, T: DiffLine>(a: &'a [T], b: &'a [T], ignore_space: bool) -> Self {
        let mut table: AHashMap<LineKey<'a, T>, usize> = AHashMap::new();
        let mut counts: Vec<[usize; 2]> = Vec::new();
        let mut codes = [Vec::with_capacity(a.len()), Vec::with_capacity(b.len())];

        for (side, lines) in [a, b].into_iter().enumerate() {
            for line in lines {
                let next = table.len();
                let code = *table.entry(line_key(line, ignore_space)).or_insert(next);
                if code == counts.len() {
                    counts.push([0, 0]);
                }
                counts[code][side] += 1;
                codes[side].push(code);
            }
        }

        let [a, b] = codes;
        LineIndex { a, b, counts }
    }
}

fn line_key<T: DiffLine>(line: &T, ignore_space: bool) -> LineKey<'_, T> {
    if ignore_space {
        let collapsed = strip_whitespace(line.content());
        // Lines made only of whitespace still compare exactly.
        if !collapsed.is_empty() {
            return LineKey::Collapsed(collapsed);
        }
    }
    LineKey::Exact(line)
}

/// Cost limit for one middle-snake search over `undiscarded` lines in total.
pub fn cost_limit(undiscarded: usize) -> usize {
    very_approx_sqrt(undiscarded + 3).max(MIN_COST_LIMIT)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Discard {
    Keep,
    /// No counterpart on the other side.
    Unmatched,
    /// Matches too often on the other side; dropped only inside unmatched runs.
    Provisional,
}

fn classify(codes: &[usize], counts: &[[usize; 2]], other: usize) -> Vec<Discard> {
    let many = 5 * very_approx_sqrt(codes.len() / 64);
    codes
        .iter()
        .map(|&code| match counts[code][other] {
            0 => Discard::Unmatched,
            n if n > many => Discard::Provisional,
            _ => Discard::Keep,
        })
        .collect()
}

/// Keep provisional discards only where they sit well inside runs of unmatched lines.
fn prune_provisionals(discards: &mut [Discard]) {
    let end = discards.len();
    let mut i = 0;
    while i < end {
        match discards[i] {
            Discard::Keep => {}
            Discard::Provisional => discards[i] = Discard::Keep,
            Discard::Unmatched => {
                let mut provisional = 0;
                let mut j = i;
                while j < end && discards[j] != Discard::Keep {
                    if discards[j] == Discard::Provisional {
                        provisional += 1;
                    }
                    j += 1;
                }
                while j > i && discards[j - 1] == Discard::Provisional {
                    j -= 1;
                    discards[j] = Discard::Keep;
                    provisional -= 1;
                }

                let length = j - i;
                if provisional * 4 > length {
                    for d in &mut discards[i..j] {
                        if *d == Discard::Provisional {
                            *d = Discard::Keep;
                        }
                    }
                } else {
                    cancel_long_subruns(&mut discards[i..j]);
                    scan_run_edge(discards[i..j].iter_mut());
                    scan_run_edge(discards[i..j].iter_mut().rev());
                    i += length - 1;
                }
            }
        }
        i += 1;
    }
}

/// Cancel every subrun of provisionals at least `1 + sqrt(len / 4)` long.
fn cancel_long_subruns(run: &mut [Discard]) {
    let minimum = 1 + very_approx_sqrt(run.len() >> 2);
    let mut consec = 0;
    let mut k = 0;
    while k < run.len() {
        if run[k] != Discard::Provisional {
            consec = 0;
        } else {
            consec += 1;
            if consec == minimum {
                // Back up to the subrun start and cancel all of it.
                k = k + 1 - consec;
                continue;
            } else if consec > minimum {
                run[k] = Discard::Keep;
            }
        }
        k += 1;
    }
}

/// Cancel provisionals from the edge of a run inwards, until three unmatched lines in a row
/// or an unmatched line past the first eight.
fn scan_run_edge<'r>(run: impl Iterator<Item = &'r mut Discard>) {
    let mut consec = 0;
    for (k, d) in run.enumerate() {
        if k >= RUN_EDGE_SCAN && *d == Discard::Unmatched {
            break;
        }
        match *d {
            Discard::Provisional => {
                consec = 0;
                *d = Discard::Keep;
            }
            Discard::Keep => consec = 0,
            Discard::Unmatched => consec += 1,
        }
        if consec == RUN_EDGE_CONSEC {
            break;
        }
    }
}

/// Split point of one subproblem, and whether each half must be searched exactly.
#[derive(Clone, Copy, Debug)]
struct Partition {
    xmid: usize,
    ymid: usize,
    lo_minimal: bool,
    hi_minimal: bool,
}

/// Alignment state over the undiscarded codes of both sides.
struct Aligner<'c> {
    xv: &'c [usize],
    yv: &'c [usize],
    /// Forward and backward furthest-reaching x per diagonal, indexed by `k + offset`.
    fd: Vec<isize>,
    bd: Vec<isize>,
    offset: isize,
    cost_limit: Option<usize>,
    bails: usize,
}

impl<'c> Aligner<'c> {
    fn new(xv: &'c [usize], yv: &'c [usize], cost_limit: Option<usize>) -> Self {
        let diagonals = xv.len() + yv.len() + 3;
        Aligner {
            xv,
            yv,
            fd: vec![0; diagonals],
            bd: vec![0; diagonals],
            offset: yv.len() as isize + 1,
            cost_limit,
            bails: 0,
        }
    }

    fn at(&self, k: isize) -> usize {
        (k + self.offset) as usize
    }

    /// Align `xv` against `yv`, marking changed positions in the undiscarded index space.
    fn align(&mut self, x_changed: &mut [bool], y_changed: &mut [bool]) {
        let mut work = vec![(0, self.xv.len(), 0, self.yv.len(), false)];

        while let Some((mut xoff, mut xlim, mut yoff, mut ylim, minimal)) = work.pop() {
            while xoff < xlim && yoff < ylim && self.xv[xoff] == self.yv[yoff] {
                xoff += 1;
                yoff += 1;
            }
            while xlim > xoff && ylim > yoff && self.xv[xlim - 1] == self.yv[ylim - 1] {
                xlim -= 1;
                ylim -= 1;
            }

            if xoff == xlim {
                y_changed[yoff..ylim].fill(true);
            } else if yoff == ylim {
                x_changed[xoff..xlim].fill(true);
            } else {
                let part = self.middle_snake(xoff, xlim, yoff, ylim, minimal);
                work.push((part.xmid, xlim, part.ymid, ylim, part.hi_minimal));
                work.push((xoff, part.xmid, yoff, part.ymid, part.lo_minimal));
            }
        }
    }

    fn middle_snake(
        &mut self,
        xoff: usize,
        xlim: usize,
        yoff: usize,
        ylim: usize,
        find_minimal: bool,
    ) -> Partition {
        let (xoff, xlim, yoff, ylim) = (xoff as isize, xlim as isize, yoff as isize, ylim as isize);
        let dmin = xoff - ylim;
        let dmax = xlim - yoff;
        let fmid = xoff - yoff;
        let bmid = xlim - ylim;
        let (mut fmin, mut fmax) = (fmid, fmid);
        let (mut bmin, mut bmax) = (bmid, bmid);
        let odd = (fmid - bmid) & 1 != 0;

        let i = self.at(fmid);
        self.fd[i] = xoff;
        let i = self.at(bmid);
        self.bd[i] = xlim;

        let mut cost = 1;
        loop {
            if fmin > dmin {
                fmin -= 1;
                let i = self.at(fmin - 1);
                self.fd[i] = -1;
            } else {
                fmin += 1;
            }
            if fmax < dmax {
                fmax += 1;
                let i = self.at(fmax + 1);
                self.fd[i] = -1;
            } else {
                fmax -= 1;
            }

            let mut d = fmax;
            while d >= fmin {
                let tlo = self.fd[self.at(d - 1)];
                let thi = self.fd[self.at(d + 1)];
                let x0 = if tlo >= thi { tlo + 1 } else { thi };
                let (mut x, mut y) = (x0, x0 - d);
                while x < xlim && y < ylim && self.xv[x as usize] == self.yv[y as usize] {
                    x += 1;
                    y += 1;
                }
                let i = self.at(d);
                self.fd[i] = x;
                if odd && bmin <= d && d <= bmax && self.bd[i] <= x {
                    return Partition::exact(x, y);
                }
                d -= 2;
            }

            if bmin > dmin {
                bmin -= 1;
                let i = self.at(bmin - 1);
                self.bd[i] = isize::MAX;
            } else {
                bmin += 1;
            }
            if bmax < dmax {
                bmax += 1;
                let i = self.at(bmax + 1);
                self.bd[i] = isize::MAX;
            } else {
                bmax -= 1;
            }

            let mut d = bmax;
            while d >= bmin {
                let tlo = self.bd[self.at(d - 1)];
                let thi = self.bd[self.at(d + 1)];
                let x0 = if tlo < thi { tlo } else { thi - 1 };
                let (mut x, mut y) = (x0, x0 - d);
                while xoff < x && yoff < y && self.xv[x as usize - 1] == self.yv[y as usize - 1]
                {
                    x -= 1;
                    y -= 1;
                }
                let i = self.at(d);
                self.bd[i] = x;
                if !odd && fmin <= d && d <= fmax && x <= self.fd[i] {
                    return Partition::exact(x, y);
                }
                d -= 2;
            }

            if !find_minimal {
                if let Some(limit) = self.cost_limit {
                    if cost >= limit {
                        self.bails += 1;
                        tracing::debug!(
                            "middle snake search over a[{}..{}] b[{}..{}] reached cost {}, bailing",
                            xoff,
                            xlim,
                            yoff,
                            ylim,
                            cost
                        );
                        return self.furthest_reaching(
                            (xoff, xlim, yoff, ylim),
                            (fmin, fmax),
                            (bmin, bmax),
                        );
                    }
                }
            }
            cost += 1;
        }
    }

    /// Split at whichever of the forward and backward searches has made the most progress.
    fn furthest_reaching(
        &self,
        (xoff, xlim, yoff, ylim): (isize, isize, isize, isize),
        (fmin, fmax): (isize, isize),
        (bmin, bmax): (isize, isize),
    ) -> Partition {
        let mut fxybest = -1;
        let mut fxbest = 0;
        let mut d = fmax;
        while d >= fmin {
            let mut x = self.fd[self.at(d)].min(xlim);
            let mut y = x - d;
            if ylim < y {
                x = ylim + d;
                y = ylim;
            }
            if fxybest < x + y {
                fxybest = x + y;
                fxbest = x;
            }
            d -= 2;
        }

        let mut bxybest = isize::MAX;
        let mut bxbest = 0;
        let mut d = bmax;
        while d >= bmin {
            let mut x = self.bd[self.at(d)].max(xoff);
            let mut y = x - d;
            if y < yoff {
                x = yoff + d;
                y = yoff;
            }
            if x + y < bxybest {
                bxybest = x + y;
                bxbest = x;
            }
            d -= 2;
        }

        if (xlim + ylim) - bxybest < fxybest - (xoff + yoff) {
            Partition {
                xmid: fxbest as usize,
                ymid: (fxybest - fxbest) as usize,
                lo_minimal: true,
                hi_minimal: false,
            }
        } else {
            Partition {
                xmid: bxbest as usize,
                ymid: (bxybest - bxbest) as usize,
                lo_minimal: false,
                hi_minimal: true,
            }
        }
    }
}

impl Partition {
    fn exact(x: isize, y: isize) -> Self {
        Partition {
            xmid: x as usize,
            ymid: y as usize,
            lo_minimal: true,
            hi_minimal: true,
        }
    }
}

/// Changed-line flags for both sides of one comparison.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Changes {
    pub a: Vec<bool>,
    pub b: Vec<bool>,
}

impl Changes {
    #[cfg(test)]
    pub fn unchanged(&self) -> (usize, usize) {
        (
            self.a.iter().filter(|c| !**c).count(),
            self.b.iter().filter(|c| !**c).count(),
        )
    }

    pub fn into_opcodes(self) -> ChangeRuns {
        ChangeRuns {
            changes: self,
            i: 0,
            j: 0,
            emitted: false,
        }
    }
}

/// Compute changed lines between `a` and `b`.
pub fn diff<T: DiffLine>(a: &[T], b: &[T], ignore_space: bool, cost_bail: bool) -> Changes {
    let index = LineIndex::build(a, b, ignore_space);

    let mut a_discards = classify(&index.a, &index.counts, 1);
    let mut b_discards = classify(&index.b, &index.counts, 0);
    prune_provisionals(&mut a_discards);
    prune_provisionals(&mut b_discards);

    let mut changes = Changes {
        a: vec![false; a.len()],
        b: vec![false; b.len()],
    };
    let (xv, xreal) = undiscarded(&index.a, &a_discards, &mut changes.a);
    let (yv, yreal) = undiscarded(&index.b, &b_discards, &mut changes.b);

    tracing::debug!(
        "myers: aligning {}/{} lines of a against {}/{} lines of b",
        xv.len(),
        a.len(),
        yv.len(),
        b.len()
    );

    let limit = cost_bail.then(|| cost_limit(xv.len() + yv.len()));
    let mut x_changed = vec![false; xv.len()];
    let mut y_changed = vec![false; yv.len()];
    let mut aligner = Aligner::new(&xv, &yv, limit);
    aligner.align(&mut x_changed, &mut y_changed);
    if aligner.bails > 0 {
        tracing::debug!(
            "myers: {} middle snake searches exceeded cost limit {:?}",
            aligner.bails,
            limit
        );
    }

    for (x, _) in x_changed.iter().enumerate().filter(|(_, c)| **c) {
        changes.a[xreal[x]] = true;
    }
    for (y, _) in y_changed.iter().enumerate().filter(|(_, c)| **c) {
        changes.b[yreal[y]] = true;
    }

    shift_boundaries(&index.a, &mut changes.a, &changes.b);
    shift_boundaries(&index.b, &mut changes.b, &changes.a);
    changes
}

/// Codes kept for alignment and their original indexes; discarded lines are marked changed.
fn undiscarded(
    codes: &[usize],
    discards: &[Discard],
    changed: &mut [bool],
) -> (Vec<usize>, Vec<usize>) {
    let mut kept = Vec::with_capacity(codes.len());
    let mut real = Vec::with_capacity(codes.len());
    for (i, (&code, discard)) in codes.iter().zip(discards).enumerate() {
        if *discard == Discard::Keep {
            kept.push(code);
            real.push(i);
        } else {
            changed[i] = true;
        }
    }
    (kept, real)
}

fn flag(flags: &[bool], k: isize) -> bool {
    k >= 0 && (k as usize) < flags.len() && flags[k as usize]
}

/// Slide each group of changes so it merges with neighbouring groups where possible, lines up
/// with a changed group on the other side, and otherwise ends as late as possible.
fn shift_boundaries(codes: &[usize], changed: &mut [bool], other: &[bool]) {
    let end = codes.len() as isize;
    let code = |k: isize| codes[k as usize];
    let (mut i, mut j): (isize, isize) = (0, 0);

    loop {
        // Find the next run of changes, tracking the matching point on the other side.
        while i < end && !flag(changed, i) {
            while flag(other, j) {
                j += 1;
            }
            j += 1;
            i += 1;
        }
        if i == end {
            break;
        }

        let mut start = i;
        i += 1;
        while flag(changed, i) {
            i += 1;
        }
        while flag(other, j) {
            j += 1;
        }

        let mut corresponding;
        loop {
            let run_length = i - start;

            while start > 0 && code(start - 1) == code(i - 1) {
                start -= 1;
                changed[start as usize] = true;
                i -= 1;
                changed[i as usize] = false;
                while flag(changed, start - 1) {
                    start -= 1;
                }
                j -= 1;
                while flag(other, j) {
                    j -= 1;
                }
            }

            corresponding = if flag(other, j - 1) { i } else { end };

            while i != end && code(start) == code(i) {
                changed[start as usize] = false;
                start += 1;
                changed[i as usize] = true;
                i += 1;
                while flag(changed, i) {
                    i += 1;
                }
                j += 1;
                while flag(other, j) {
                    j += 1;
                    corresponding = i;
                }
            }

            if run_length == i - start {
                break;
            }
        }

        while corresponding < i {
            start -= 1;
            changed[start as usize] = true;
            i -= 1;
            changed[i as usize] = false;
            j -= 1;
            while flag(other, j) {
                j -= 1;
            }
        }
    }
}

/// Lazily walks changed-line flags, emitting one opcode per maximal run.
#[derive(Clone, Debug)]
pub struct ChangeRuns {
    changes: Changes,
    i: usize,
    j: usize,
    emitted: bool,
}

impl Iterator for ChangeRuns {
    type Item = Opcode;

    fn next(&mut self) -> Option<Opcode> {
        let (a, b) = (&self.changes.a, &self.changes.b);
        let (n, m) = (a.len(), b.len());
        if self.i >= n && self.j >= m {
            if self.emitted {
                return None;
            }
            self.emitted = true;
            return Some(Opcode::new(OpcodeTag::Equal, 0, 0, 0, 0));
        }
        self.emitted = true;

        let (i1, j1) = (self.i, self.j);
        while self.i < n && self.j < m && !a[self.i] && !b[self.j] {
            self.i += 1;
            self.j += 1;
        }
        if self.i > i1 {
            return Some(Opcode::new(OpcodeTag::Equal, i1, self.i, j1, self.j));
        }

        while self.i < n && (self.j >= m || a[self.i]) {
            self.i += 1;
        }
        while self.j < m && (self.i >= n || b[self.j]) {
            self.j += 1;
        }

        let tag = match (self.i > i1, self.j > j1) {
            (false, _) => OpcodeTag::Insert,
            (true, false) => OpcodeTag::Delete,
            (true, true) => OpcodeTag::Replace,
        };
        Some(Opcode::new(tag, i1, self.i, j1, self.j))
    }
}
