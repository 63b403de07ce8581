/*! The compiled form of a pattern.

A [`Tnfa`] is a tagged nondeterministic finite automaton. Its states are the
literal leaves of the pattern tree; a transition exists from state `a` to
state `b` when some string matched by the pattern contains the literal of
`a` immediately followed by the literal of `b`. Epsilon transitions don't
exist: the tags and assertions that epsilon paths would have carried are
attached to the transitions themselves, so the simulation advances one
input symbol per step.

Tags are numbered slots. Whenever a path crosses a transition carrying tag
`t`, the current input offset is stored into slot `t` of that path's tag
vector. Submatch boundaries are expressed in terms of tags through
[`SubmatchData`], with one sentinel: a submatch boundary equal to
[`Tnfa::end_tag`] stands for "wherever the whole match ended".
*/

use crate::ast::{AssertionSet, Literal, TagId, TagSet};

/// The tie-breaking policy for one tag.
///
/// When two paths reach the same state at the same input position, their
/// tag vectors are compared slot by slot and the first differing slot
/// decides which path survives, according to that tag's direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagDirection {
    /// Smaller offsets win.
    Minimize,
    /// Larger offsets win.
    Maximize,
}

/// One transition of the automaton.
///
/// `literal` is the literal of the source state: the transition may be
/// taken when the consumed code point matches it and `assertions` hold at
/// the current position.
#[derive(Debug, Clone)]
pub(crate) struct Transition {
    pub literal: Literal,
    pub target: usize,
    pub tags: TagSet,
    pub assertions: AssertionSet,
}

/// Tag addressing for one submatch.
#[derive(Debug, Clone)]
pub(crate) struct SubmatchData {
    /// Tag holding the offset where the submatch begins.
    pub begin_tag: TagId,
    /// Tag holding the offset where the submatch ends.
    pub end_tag: TagId,
    /// Submatches enclosing this one, outermost first. A submatch offset
    /// pair is only meaningful when it lies within all of its parents.
    pub parents: Vec<usize>,
}

/// A compiled pattern.
#[derive(Debug)]
pub(crate) struct Tnfa {
    /// All transitions, grouped by source state.
    transitions: Vec<Transition>,
    /// Prefix sums delimiting each state's group in `transitions`. The
    /// transitions of state `s` are `transitions[offsets[s]..offsets[s+1]]`.
    offsets: Vec<usize>,
    /// The states a match may start in, with the tags and assertions
    /// collected on the way there. These are seeded at every input
    /// position until a match is found.
    pub initial: Vec<Transition>,
    /// The accepting state.
    pub final_state: usize,
    pub submatch_data: Vec<SubmatchData>,
    pub tag_directions: Vec<TagDirection>,
    /// Pairs `(end_tag, begin_tag)` delimiting the scopes of minimal
    /// repetitions, used to weed out paths that kept iterating after a
    /// match was found.
    pub minimal_tags: Vec<(TagId, TagId)>,
    pub n_states: usize,
    pub n_tags: usize,
    /// Sentinel tag id standing for the end of the whole match.
    pub end_tag: TagId,
}

impl Tnfa {
    pub fn new(
        transitions: Vec<Transition>,
        offsets: Vec<usize>,
        initial: Vec<Transition>,
        final_state: usize,
        submatch_data: Vec<SubmatchData>,
        tag_directions: Vec<TagDirection>,
        minimal_tags: Vec<(TagId, TagId)>,
        n_states: usize,
        n_tags: usize,
    ) -> Self {
        assert_eq!(offsets.len(), n_states + 1);
        assert_eq!(tag_directions.len(), n_tags);
        Self {
            transitions,
            offsets,
            initial,
            final_state,
            submatch_data,
            tag_directions,
            minimal_tags,
            n_states,
            n_tags,
            end_tag: n_tags,
        }
    }

    /// The outgoing transitions of `state`.
    #[inline]
    pub fn state(&self, state: usize) -> &[Transition] {
        &self.transitions[self.offsets[state]..self.offsets[state + 1]]
    }

    pub fn n_submatches(&self) -> usize {
        self.submatch_data.len()
    }

    pub fn n_transitions(&self) -> usize {
        self.transitions.len()
    }
}
