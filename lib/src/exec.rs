/*! The matcher.

Runs a compiled [`Tnfa`] over an input in a single forward pass. The
executor maintains the set of automaton states reachable at the current
input position, each with its own vector of tag values (input offsets,
`-1` when unset). One step consumes one code point and moves every
surviving path from the `reach` stack to the `reach_next` stack through the
transitions whose literal matches the consumed code point and whose
assertions hold.

At most one path per state survives a step: when two paths land on the same
state at the same position, their tag vectors are compared slot by slot and
the first differing slot decides, according to that tag's direction. A
per-state record of the last position at which the state was reached makes
the deduplication O(1).

Until a match is found the initial states are reseeded at every position,
which yields the leftmost match; among paths with equal starting offset a
later accepting position overwrites an earlier one. After a match is found,
paths inside the scope of a minimal repetition that would extend past the
matched end are weeded out before every step.
*/

use std::mem;

use crate::ast::{Assertion, AssertionSet, TagId};
use crate::errors::MatchError;
use crate::input::{Cursor, Source};
use crate::tnfa::{TagDirection, Tnfa, Transition};

/// A pair of offsets delimiting a match or submatch.
///
/// Offsets count code points from the start of the input; `end` is
/// exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Offset of the first code point of the match.
    pub begin: usize,
    /// Offset just past the last code point of the match.
    pub end: usize,
}

impl Match {
    /// The match as a `begin..end` range.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.begin..self.end
    }
}

/// The submatch offsets extracted from a successful match.
///
/// Index 0 is the whole match; further indexes correspond to the pattern's
/// groups in the order their `(` appears. A `None` entry means the group
/// took no part in the match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captures {
    slots: Vec<Option<Match>>,
}

impl Captures {
    pub(crate) fn new(slots: Vec<Option<Match>>) -> Self {
        Self { slots }
    }

    /// The offsets of submatch `i`, if it participated in the match.
    pub fn get(&self, i: usize) -> Option<Match> {
        self.slots.get(i).copied().flatten()
    }

    /// Number of submatches, including the whole match.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if there are no submatches at all. Never the case for captures
    /// produced by a match, which always include submatch 0.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterates over all submatch slots, starting with the whole match.
    pub fn iter(&self) -> impl Iterator<Item = Option<Match>> + '_ {
        self.slots.iter().copied()
    }
}

/// Runs `tnfa` against `source`. Returns the submatch table of the best
/// match, or `None` if the pattern doesn't match anywhere.
pub(crate) fn execute<S: Source>(
    tnfa: &Tnfa,
    source: S,
) -> Result<Option<Vec<Option<Match>>>, MatchError> {
    Execution::new(tnfa, source).run()
}

const UNSET: i64 = -1;

struct ReachSlot {
    state: usize,
    tags: Vec<i64>,
}

/// Per-state deduplication record: the last position at which the state
/// was reached and the `reach_next` slot holding its path.
#[derive(Clone, Copy)]
struct LastSeen {
    pos: i64,
    slot: usize,
}

struct Execution<'a, S: Source> {
    tnfa: &'a Tnfa,
    input: Cursor<S>,
    /// Number of code points consumed so far.
    pos: i64,
    /// The most recently consumed code point.
    prev: char,
    reach: Vec<ReachSlot>,
    reach_len: usize,
    reach_next: Vec<ReachSlot>,
    reach_next_len: usize,
    last_seen: Vec<LastSeen>,
    tmp_tags: Vec<i64>,
    /// Tag values of the best match found so far.
    best_tags: Vec<i64>,
    /// End offset of the best match found so far, -1 while none.
    match_end: i64,
    /// True when the best match changed since the last weeding.
    fresh_match: bool,
}

impl<'a, S: Source> Execution<'a, S> {
    fn new(tnfa: &'a Tnfa, source: S) -> Self {
        let slots = |_| ReachSlot { state: 0, tags: vec![UNSET; tnfa.n_tags] };
        Self {
            tnfa,
            input: Cursor::new(source),
            pos: 0,
            prev: '\0',
            reach: (0..tnfa.n_states).map(slots).collect(),
            reach_len: 0,
            reach_next: (0..tnfa.n_states).map(slots).collect(),
            reach_next_len: 0,
            last_seen: vec![LastSeen { pos: -1, slot: 0 }; tnfa.n_states],
            tmp_tags: vec![UNSET; tnfa.n_tags],
            best_tags: vec![UNSET; tnfa.n_tags],
            match_end: -1,
            fresh_match: false,
        }
    }

    fn run(mut self) -> Result<Option<Vec<Option<Match>>>, MatchError> {
        let has_minimal_tags = !self.tnfa.minimal_tags.is_empty();
        loop {
            if self.match_end < 0 {
                self.add_initial()?;
            } else if self.tnfa.n_tags == 0 || self.reach_next_len == 0 {
                // Nothing can improve on the match anymore.
                break;
            }
            if !self.input.more_input()? {
                break;
            }
            self.prev = self.input.eat();
            self.pos += 1;
            self.swap_stacks();
            if has_minimal_tags && self.fresh_match {
                self.weed_out_nonminimals();
            }
            self.check_reach()?;
        }
        if self.match_end < 0 {
            return Ok(None);
        }
        Ok(Some(self.create_matches()))
    }

    /// Seeds the initial states at the current position, on top of
    /// whatever the previous step left in `reach_next`. States already
    /// reached at this position keep the path they have.
    fn add_initial(&mut self) -> Result<(), MatchError> {
        let tnfa = self.tnfa;
        for t in &tnfa.initial {
            if self.last_seen[t.target].pos >= self.pos {
                continue;
            }
            if !self.passes_assertions(t.assertions)? {
                continue;
            }
            let slot = self.reach_next_len;
            self.reach_next[slot].state = t.target;
            self.reach_next[slot].tags.fill(UNSET);
            for &tag in &t.tags {
                if tag < tnfa.n_tags {
                    self.reach_next[slot].tags[tag] = self.pos;
                }
            }
            if t.target == tnfa.final_state {
                self.match_end = self.pos;
                self.fresh_match = true;
                self.best_tags
                    .copy_from_slice(&self.reach_next[slot].tags);
            }
            self.last_seen[t.target] = LastSeen { pos: self.pos, slot };
            self.reach_next_len += 1;
        }
        Ok(())
    }

    fn swap_stacks(&mut self) {
        mem::swap(&mut self.reach, &mut self.reach_next);
        self.reach_len = self.reach_next_len;
    }

    /// Advances every path in `reach` through the transitions enabled by
    /// the consumed code point, filling `reach_next`.
    fn check_reach(&mut self) -> Result<(), MatchError> {
        let tnfa = self.tnfa;
        self.reach_next_len = 0;
        for i in 0..self.reach_len {
            let state = self.reach[i].state;
            for t in tnfa.state(state) {
                if !t.literal.matches(self.prev) {
                    continue;
                }
                if !self.passes_assertions(t.assertions)? {
                    continue;
                }
                self.follow(i, t);
            }
        }
        Ok(())
    }

    /// Takes transition `t` out of the path in `reach[from]`.
    fn follow(&mut self, from: usize, t: &Transition) {
        let tnfa = self.tnfa;
        let n_tags = tnfa.n_tags;
        self.tmp_tags.copy_from_slice(&self.reach[from].tags);
        for &tag in &t.tags {
            if tag < n_tags {
                self.tmp_tags[tag] = self.pos;
            }
        }
        let seen = self.last_seen[t.target];
        if seen.pos < self.pos {
            // First path to reach the target at this position. A path
            // into the final state only displaces the recorded match when
            // it doesn't start later.
            if t.target == tnfa.final_state
                && (self.match_end < 0
                    || (n_tags > 0 && self.tmp_tags[0] <= self.best_tags[0]))
            {
                self.match_end = self.pos;
                self.fresh_match = true;
                self.best_tags.copy_from_slice(&self.tmp_tags);
            }
            let slot = self.reach_next_len;
            self.reach_next[slot].state = t.target;
            mem::swap(&mut self.reach_next[slot].tags, &mut self.tmp_tags);
            self.last_seen[t.target] = LastSeen { pos: self.pos, slot };
            self.reach_next_len += 1;
        } else {
            // The target already holds a path for this position; keep
            // whichever tag vector wins.
            let slot = seen.slot;
            if tags_win(
                n_tags,
                &tnfa.tag_directions,
                &self.tmp_tags,
                &self.reach_next[slot].tags,
            ) {
                mem::swap(
                    &mut self.reach_next[slot].tags,
                    &mut self.tmp_tags,
                );
                if t.target == tnfa.final_state {
                    self.match_end = self.pos;
                    self.fresh_match = true;
                    self.best_tags
                        .copy_from_slice(&self.reach_next[slot].tags);
                }
            }
        }
    }

    /// Drops every path that sits inside the scope of a minimal
    /// repetition and would extend it past the match already found.
    fn weed_out_nonminimals(&mut self) {
        self.fresh_match = false;
        self.reach_next_len = 0;
        for i in 0..self.reach_len {
            if self.has_minimal_tag(i) {
                continue;
            }
            let slot = self.reach_next_len;
            self.reach_next[slot].state = self.reach[i].state;
            mem::swap(&mut self.reach_next[slot].tags, &mut self.reach[i].tags);
            self.reach_next_len += 1;
        }
        mem::swap(&mut self.reach, &mut self.reach_next);
        self.reach_len = self.reach_next_len;
    }

    fn has_minimal_tag(&self, i: usize) -> bool {
        let tags = &self.reach[i].tags;
        for &(end, begin) in &self.tnfa.minimal_tags {
            // A scope that closes at the end sentinel covers the whole
            // match; continuing past it can never be minimal.
            if end >= self.tnfa.n_tags
                || (tags[begin] == self.best_tags[begin]
                    && tags[end] < self.best_tags[end])
            {
                return true;
            }
        }
        false
    }

    fn passes_assertions(
        &mut self,
        assertions: AssertionSet,
    ) -> Result<bool, MatchError> {
        if assertions.is_none() {
            return Ok(true);
        }
        if assertions.contains(Assertion::BeginInput) && self.pos != 0 {
            return Ok(false);
        }
        if assertions.contains(Assertion::BeginLine)
            && self.pos != 0
            && self.prev != '\n'
        {
            return Ok(false);
        }
        if assertions.contains(Assertion::EndLine) {
            if let Some(c) = self.input.peek()? {
                if c != '\n' {
                    return Ok(false);
                }
            }
        }
        if assertions.contains(Assertion::EndInput)
            && self.input.peek()?.is_some()
        {
            return Ok(false);
        }
        Ok(true)
    }

    /// Builds the submatch table from the winning tag values.
    fn create_matches(&self) -> Vec<Option<Match>> {
        let tnfa = self.tnfa;
        let offset_of = |tag: TagId| -> i64 {
            if tag == tnfa.end_tag {
                self.match_end
            } else {
                self.best_tags[tag]
            }
        };
        let mut matches: Vec<Option<Match>> = tnfa
            .submatch_data
            .iter()
            .map(|data| {
                let begin = offset_of(data.begin_tag);
                let end = offset_of(data.end_tag);
                if begin < 0 || end < 0 {
                    None
                } else {
                    debug_assert!(begin <= end);
                    Some(Match { begin: begin as usize, end: end as usize })
                }
            })
            .collect();
        // A submatch only counts when it lies within every enclosing
        // submatch; tag values left over from an abandoned path are
        // discarded here. Parents precede children in the table, so each
        // parent is final by the time its children look at it.
        for i in 0..matches.len() {
            let Some(m) = matches[i] else { continue };
            let contained = tnfa.submatch_data[i].parents.iter().all(|&p| {
                matches!(
                    matches[p],
                    Some(parent)
                        if parent.begin <= m.begin && m.end <= parent.end
                )
            });
            if !contained {
                matches[i] = None;
            }
        }
        matches
    }
}

/// Lexicographic comparison of two tag vectors: the first differing slot
/// decides according to that tag's direction. Returns true when `a` beats
/// `b`.
fn tags_win(
    n_tags: usize,
    directions: &[TagDirection],
    a: &[i64],
    b: &[i64],
) -> bool {
    for i in 0..n_tags {
        if a[i] > b[i] {
            return directions[i] == TagDirection::Maximize;
        }
        if a[i] < b[i] {
            return directions[i] == TagDirection::Minimize;
        }
    }
    false
}
