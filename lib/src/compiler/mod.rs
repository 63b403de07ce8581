/*! The pattern compiler.

Compilation turns a parsed tree into a [`Tnfa`] in five steps:

1. tag injection ([`tags`]), which rewrites submatch boundaries into tag
   leaves and collects per-tag metadata;
2. bounded repetition expansion ([`expand`]), which rewrites `x<m,n>` into
   copies so only optional atoms and unbounded loops remain;
3. appending a synthetic terminal literal to the tree; its leaf becomes the
   accepting state, and the tags crossed on the way into it describe where
   submatches ended;
4. the nullable/firstpos/lastpos induction ([`nfl`]);
5. transition construction: wherever a leaf in some `lastpos` can be
   followed by a leaf in an adjacent `firstpos`, a transition is laid down
   between the corresponding states. A counting walk sizes each state's
   group first, and a second walk fills them in.

The `firstpos` of the whole tree, with its collected tags and assertions,
becomes the initial set that the executor seeds at every input position.
*/

pub(crate) mod expand;
pub(crate) mod nfl;
pub(crate) mod tags;

use log::*;

use itertools::Itertools;

use crate::ast::{Ast, NodeId, NodeKind, PosEntry};
use crate::parser::Parsed;
use crate::tnfa::{Tnfa, Transition};

/// Compiles a parsed pattern into its automaton.
pub(crate) fn compile(parsed: Parsed) -> Tnfa {
    let Parsed { mut ast, root, n_leaves, n_submatches } = parsed;
    let mut n_states = n_leaves;

    let mut tag_data = tags::add_tags(&mut ast, root, n_submatches);
    expand::expand(
        &mut ast,
        root,
        &mut n_states,
        &mut tag_data.tag_directions,
    );

    // The terminal leaf. Entering its state ends the match; its own
    // literal can never be consumed.
    let terminal = ast.literal_char('\0', n_states);
    let root = ast.cons(root, terminal);
    n_states += 1;

    nfl::compute_nfl(&mut ast, root);

    let mut counts = vec![0_usize; n_states];
    count_transitions(&ast, root, &mut counts);
    let mut groups: Vec<Vec<Transition>> =
        counts.iter().map(|n| Vec::with_capacity(*n)).collect();
    fill_transitions(&ast, root, &mut groups);

    let mut transitions = Vec::new();
    let mut offsets = Vec::with_capacity(n_states + 1);
    offsets.push(0);
    for group in groups {
        transitions.extend(group);
        offsets.push(transitions.len());
    }

    let initial: Vec<Transition> = ast
        .node(root)
        .firstpos
        .iter()
        .map(|entry| Transition {
            literal: entry.literal,
            target: entry.id,
            tags: entry.tags.clone(),
            assertions: entry.assertions,
        })
        .collect();

    // Only the terminal leaf can end a match.
    assert_eq!(ast.node(root).lastpos.len(), 1);
    let final_state = ast.node(root).lastpos[0].id;

    debug!(
        "pattern compiled: {} states, {} transitions, {} tags, {} submatches",
        n_states,
        transitions.len(),
        tag_data.n_tags,
        n_submatches,
    );

    Tnfa::new(
        transitions,
        offsets,
        initial,
        final_state,
        tag_data.submatch_data,
        tag_data.tag_directions,
        tag_data.minimal_tags,
        n_states,
        tag_data.n_tags,
    )
}

/// Walks the tree adding up, per source state, how many transitions the
/// filling walk may lay down. Duplicated targets are counted too, so the
/// counts are an upper bound.
fn count_transitions(ast: &Ast, node: NodeId, counts: &mut [usize]) {
    match ast.node(node).kind {
        NodeKind::Leaf(_) => {}
        NodeKind::Cons(left, right) => {
            let fanout = ast.node(right).firstpos.len();
            for from in &ast.node(left).lastpos {
                counts[from.id] += fanout;
            }
            count_transitions(ast, left, counts);
            count_transitions(ast, right, counts);
        }
        NodeKind::Iter { atom, min, max, .. } => {
            if max.is_none() {
                // Bounded repetitions were expanded away.
                debug_assert!(min <= 1);
                let fanout = ast.node(atom).firstpos.len();
                for from in &ast.node(atom).lastpos {
                    counts[from.id] += fanout;
                }
            }
            count_transitions(ast, atom, counts);
        }
        NodeKind::Union(left, right) => {
            count_transitions(ast, left, counts);
            count_transitions(ast, right, counts);
        }
    }
}

fn fill_transitions(
    ast: &Ast,
    node: NodeId,
    groups: &mut [Vec<Transition>],
) {
    match ast.node(node).kind {
        NodeKind::Leaf(_) => {}
        NodeKind::Cons(left, right) => {
            connect(
                &ast.node(left).lastpos,
                &ast.node(right).firstpos,
                groups,
            );
            fill_transitions(ast, left, groups);
            fill_transitions(ast, right, groups);
        }
        NodeKind::Iter { atom, max, .. } => {
            if max.is_none() {
                connect(
                    &ast.node(atom).lastpos,
                    &ast.node(atom).firstpos,
                    groups,
                );
            }
            fill_transitions(ast, atom, groups);
        }
        NodeKind::Union(left, right) => {
            fill_transitions(ast, left, groups);
            fill_transitions(ast, right, groups);
        }
    }
}

/// Lays down a transition from every position in `from` to every position
/// in `to`, merging the tag sets and assertion sets of the two endpoints.
fn connect(from: &[PosEntry], to: &[PosEntry], groups: &mut [Vec<Transition>]) {
    for a in from {
        // A target can appear in `to` more than once when position sets
        // were merged; one transition per run of equal ids is enough.
        for b in to.iter().dedup_by(|x, y| x.id == y.id) {
            let mut tags = a.tags.clone();
            for &tag in &b.tags {
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
            groups[a.id].push(Transition {
                literal: a.literal,
                target: b.id,
                tags,
                assertions: a.assertions | b.assertions,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::compile;
    use crate::parser::parse;

    #[test]
    fn plain_concatenation() {
        let tnfa = compile(parse("ab", None).unwrap());
        // Two literals plus the terminal.
        assert_eq!(tnfa.n_states, 3);
        assert_eq!(tnfa.n_transitions(), 2);
        assert_eq!(tnfa.final_state, 2);
        assert_eq!(tnfa.n_tags, 1);
        assert_eq!(tnfa.initial.len(), 1);
        assert_eq!(tnfa.initial[0].target, 0);
        assert_eq!(tnfa.initial[0].tags.as_slice(), &[0]);
        assert_eq!(tnfa.state(0).len(), 1);
        assert_eq!(tnfa.state(0)[0].target, 1);
        assert_eq!(tnfa.state(1).len(), 1);
        assert_eq!(tnfa.state(1)[0].target, 2);
        assert!(tnfa.state(2).is_empty());
    }

    #[test]
    fn nullable_pattern_can_start_in_the_final_state() {
        let tnfa = compile(parse("a*", None).unwrap());
        assert_eq!(tnfa.n_states, 2);
        assert!(tnfa.initial.iter().any(|t| t.target == tnfa.final_state));
        // The loop transition.
        assert!(tnfa.state(0).iter().any(|t| t.target == 0));
    }

    #[test]
    fn empty_pattern() {
        let tnfa = compile(parse("", None).unwrap());
        assert_eq!(tnfa.n_states, 1);
        assert_eq!(tnfa.n_tags, 0);
        assert_eq!(tnfa.initial.len(), 1);
        assert_eq!(tnfa.initial[0].target, tnfa.final_state);
    }

    #[test]
    fn expanded_repetition_produces_a_chain() {
        let tnfa = compile(parse("a<2,3>", None).unwrap());
        // Three copies of `a` plus the terminal.
        assert_eq!(tnfa.n_states, 4);
        assert_eq!(tnfa.initial.len(), 1);
    }

    #[test]
    fn union_branches_share_the_initial_set() {
        let tnfa = compile(parse("a|b", None).unwrap());
        assert_eq!(tnfa.n_states, 3);
        assert_eq!(tnfa.initial.len(), 2);
    }
}
