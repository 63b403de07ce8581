/*! Bounded repetition expansion.

The automaton construction only understands optional atoms and unbounded
loops, so `x<m,n>` is rewritten, after tag injection, into `m` mandatory
copies of `x` followed by `n - m` nested optional copies (or one unbounded
`x*` tail when there is no upper bound).

Copying a subtree copies its literal leaves, and leaf ids must stay dense
because they become the states of the automaton. Every copy therefore
shifts the ids of its literals by the number of literals duplicated so far,
and the walk keeps per-depth bookkeeping (`id_add`, `id_add_total`) so
that the leaves following an expanded repetition are shifted past the ids
the copies claimed. The last copy reuses the id budget of the original
subtree, which the expansion replaces.

Tags inside the copies need care too: the mandatory copies drop their tags
except for the last one, which keeps them so the final iteration is the one
recorded; the first tag kept this way flips to maximize so the recorded
iteration is pushed as far right as possible. Optional copies keep their
tags untouched.
*/

use crate::ast::{Ast, Leaf, NodeId, NodeKind};
use crate::tnfa::TagDirection;

/// Expands every bounded repetition under `root`. `n_leaves` is updated
/// with the number of literal leaves the expansion created.
pub(crate) fn expand(
    ast: &mut Ast,
    root: NodeId,
    n_leaves: &mut usize,
    tag_directions: &mut [TagDirection],
) {
    let mut expander = Expander {
        ast,
        tag_directions,
        max_id: 0,
        id_add: 0,
        id_add_total: 0,
        iter_depth: 0,
    };
    expander.visit(root);
    let max_id = expander.max_id;
    *n_leaves += expander.id_add_total;
    debug_assert!(*n_leaves == 0 || max_id < *n_leaves);
}

/// What to do with the tag leaves of a duplicated subtree.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Duplicate {
    LeaveTags,
    RemoveTags,
    MaximizeFirstTag,
}

struct Expander<'a> {
    ast: &'a mut Ast,
    tag_directions: &'a mut [TagDirection],
    max_id: usize,
    /// Shift applied to the literal ids encountered by the walk.
    id_add: usize,
    /// Total number of new literal ids claimed by expansions so far.
    id_add_total: usize,
    iter_depth: usize,
}

impl<'a> Expander<'a> {
    fn visit(&mut self, node: NodeId) {
        match self.ast.node(node).kind.clone() {
            NodeKind::Leaf(Leaf::Literal { .. }) => {
                let id_add = self.id_add;
                if let NodeKind::Leaf(Leaf::Literal { id, .. }) =
                    &mut self.ast.node_mut(node).kind
                {
                    *id += id_add;
                    self.max_id = self.max_id.max(*id);
                }
            }
            NodeKind::Leaf(_) => {}
            NodeKind::Cons(left, right) | NodeKind::Union(left, right) => {
                self.visit(left);
                self.visit(right);
            }
            NodeKind::Iter { atom, min, max, .. } => {
                let expanding = min > 1 || max.is_some_and(|max| max > 1);
                let saved_id_add = self.id_add;
                // Nested repetitions expand with a zero shift; the totals
                // they claim are folded in on the way out.
                if expanding {
                    self.id_add = 0;
                }
                self.iter_depth += 1;
                self.visit(atom);
                self.id_add = saved_id_add;
                let id_add_last = self.id_add;
                if expanding {
                    self.expand_iter(node);
                }
                self.id_add_total += self.id_add - id_add_last;
                self.iter_depth -= 1;
                if self.iter_depth == 0 {
                    self.id_add = self.id_add_total;
                }
            }
        }
    }

    fn expand_iter(&mut self, node: NodeId) {
        let NodeKind::Iter { atom, min, max, .. } =
            self.ast.node(node).kind.clone()
        else {
            unreachable!()
        };

        let mut saved_id_add = self.id_add;

        // The mandatory copies.
        let mut seq1: Option<NodeId> = None;
        for i in 0..min {
            saved_id_add = self.id_add;
            let option = if i + 1 == min {
                Duplicate::MaximizeFirstTag
            } else {
                Duplicate::RemoveTags
            };
            let copy = self.duplicate(atom, option);
            seq1 = self.ast.cons_or_other(seq1, Some(copy));
        }

        // The optional tail: nested optional copies up to the upper bound,
        // or an unbounded loop when there is none.
        let seq2 = match max {
            Some(max) => {
                let mut seq: Option<NodeId> = None;
                for _ in min..max {
                    saved_id_add = self.id_add;
                    let copy = self.duplicate(atom, Duplicate::LeaveTags);
                    let body = self.ast.cons_or_other(Some(copy), seq);
                    if let Some(body) = body {
                        let empty = self.ast.empty();
                        seq = Some(self.ast.union(empty, body));
                    }
                }
                seq
            }
            None => {
                saved_id_add = self.id_add;
                let copy = self.duplicate(atom, Duplicate::LeaveTags);
                Some(self.ast.iter(copy, 0, None, false))
            }
        };

        // The last copy takes over the id budget of the subtree this
        // expansion replaces.
        self.id_add = saved_id_add;

        if let Some(seq) = self.ast.cons_or_other(seq1, seq2) {
            let kind = self.ast.node(seq).kind.clone();
            self.ast.node_mut(node).kind = kind;
        }
    }

    fn duplicate(&mut self, node: NodeId, option: Duplicate) -> NodeId {
        let mut n_copied = 0;
        let mut first_tag = true;
        let copy =
            self.duplicate_node(node, option, &mut n_copied, &mut first_tag);
        self.id_add += n_copied;
        copy
    }

    fn duplicate_node(
        &mut self,
        node: NodeId,
        option: Duplicate,
        n_copied: &mut usize,
        first_tag: &mut bool,
    ) -> NodeId {
        match self.ast.node(node).kind.clone() {
            NodeKind::Leaf(Leaf::Literal { literal, id }) => {
                let id = id + self.id_add;
                self.max_id = self.max_id.max(id);
                *n_copied += 1;
                self.ast.literal(literal, id)
            }
            NodeKind::Leaf(Leaf::Tag(tag)) => match option {
                Duplicate::RemoveTags => self.ast.empty(),
                Duplicate::MaximizeFirstTag => {
                    if *first_tag {
                        self.tag_directions[tag] = TagDirection::Maximize;
                        *first_tag = false;
                    }
                    self.ast.tag(tag)
                }
                Duplicate::LeaveTags => self.ast.tag(tag),
            },
            NodeKind::Leaf(Leaf::Assertion(assertions)) => {
                self.ast.assertion(assertions)
            }
            NodeKind::Leaf(Leaf::Empty) => self.ast.empty(),
            NodeKind::Cons(left, right) => {
                let left =
                    self.duplicate_node(left, option, n_copied, first_tag);
                let right =
                    self.duplicate_node(right, option, n_copied, first_tag);
                self.ast.cons(left, right)
            }
            NodeKind::Union(left, right) => {
                let left =
                    self.duplicate_node(left, option, n_copied, first_tag);
                let right =
                    self.duplicate_node(right, option, n_copied, first_tag);
                self.ast.union(left, right)
            }
            NodeKind::Iter { atom, min, max, minimal } => {
                let atom =
                    self.duplicate_node(atom, option, n_copied, first_tag);
                self.ast.iter(atom, min, max, minimal)
            }
        }
    }
}
