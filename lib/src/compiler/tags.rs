/*! Tag injection.

Submatch addressing is reduced to tags before the automaton is built. This
pass walks the tree twice:

* a counting pass that computes, bottom-up, how many tags each subtree
  needs, without touching the structure;
* an annotation pass that rewrites the tree, inserting tag leaves at the
  submatch boundaries, recording each tag's tie-breaking direction, the
  scopes of minimal repetitions, and which pair of tags delimits each
  submatch.

The annotation pass reads the per-node counts produced by the counting pass
to reserve tag numbers across concatenations, so both passes must agree on
how many tags every construct introduces.

Pending submatch boundaries are kept in `regset` as markers (`2 * id` for
the beginning of submatch `id`, `2 * id + 1` for its end). Markers
accumulate until a tag is injected, at which point every pending marker is
resolved to that tag. Markers still pending when the walk finishes resolve
to the end sentinel, meaning "wherever the whole match ends".
*/

use crate::ast::{Ast, Leaf, NodeId, NodeKind, SubmatchId, TagId};
use crate::tnfa::{SubmatchData, TagDirection};

/// Everything the tag pass feeds into the final automaton.
pub(crate) struct TagOutput {
    pub tag_directions: Vec<TagDirection>,
    pub minimal_tags: Vec<(TagId, TagId)>,
    pub submatch_data: Vec<SubmatchData>,
    pub n_tags: usize,
}

/// Injects tags into the tree rooted at `root` and returns the collected
/// tag metadata. `n_submatches` must be the number of submatches in the
/// tree, including submatch 0.
pub(crate) fn add_tags(
    ast: &mut Ast,
    root: NodeId,
    n_submatches: usize,
) -> TagOutput {
    let n_tags = {
        let mut counting = AddTags::new(ast, Pass::Count, 0, 0);
        counting.visit(root);
        assert_eq!(counting.ast.node(root).n_tags, counting.n_tags);
        counting.n_tags
    };

    let mut annotating = AddTags::new(ast, Pass::Annotate, n_tags, n_submatches);
    annotating.visit(root);

    // Markers still pending resolve to the end sentinel.
    annotating.tag = n_tags;
    annotating.flush_markers();

    // The two passes must agree on how many tags every construct needs.
    assert_eq!(annotating.ast.node(root).n_tags, n_tags);
    assert_eq!(annotating.n_tags, n_tags);

    TagOutput {
        tag_directions: annotating.tag_directions,
        minimal_tags: annotating.minimal_tags,
        submatch_data: annotating.submatch_data,
        n_tags,
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Pass {
    Count,
    Annotate,
}

struct AddTags<'a> {
    ast: &'a mut Ast,
    pass: Pass,
    /// The tag number the next injection will use.
    tag: TagId,
    /// The first tag number not yet spoken for.
    next_tag: TagId,
    /// How many tags have actually been injected (or counted).
    n_tags: usize,
    /// Pending submatch boundary markers. Entries below `regset_base`
    /// belong to an enclosing scope and must not be resolved here.
    regset: Vec<usize>,
    regset_base: usize,
    /// The submatches enclosing the node being visited, outermost first.
    parents: Vec<SubmatchId>,
    /// Start tag of a minimal repetition whose scope hasn't closed yet.
    minimal_tag: Option<TagId>,
    direction: TagDirection,
    tag_directions: Vec<TagDirection>,
    minimal_tags: Vec<(TagId, TagId)>,
    submatch_data: Vec<SubmatchData>,
}

impl<'a> AddTags<'a> {
    fn new(
        ast: &'a mut Ast,
        pass: Pass,
        n_tags: usize,
        n_submatches: usize,
    ) -> Self {
        Self {
            ast,
            pass,
            tag: 0,
            next_tag: 1,
            n_tags: 0,
            regset: Vec::new(),
            regset_base: 0,
            parents: Vec::new(),
            minimal_tag: None,
            direction: TagDirection::Minimize,
            tag_directions: vec![TagDirection::Minimize; n_tags],
            minimal_tags: Vec::new(),
            submatch_data: vec![
                SubmatchData {
                    begin_tag: 0,
                    end_tag: 0,
                    parents: Vec::new()
                };
                n_submatches
            ],
        }
    }

    fn visit(&mut self, node: NodeId) {
        let submatch_id = self.ast.node(node).submatch_id;
        if let Some(id) = submatch_id {
            self.push_submatch(id);
        }
        match self.ast.node(node).kind.clone() {
            NodeKind::Leaf(leaf) => self.visit_leaf(node, &leaf),
            NodeKind::Cons(left, right) => self.visit_cons(node, left, right),
            NodeKind::Iter { atom, minimal, .. } => {
                self.visit_iter(node, atom, minimal)
            }
            NodeKind::Union(left, right) => {
                self.visit_union(node, left, right)
            }
        }
        if let Some(id) = submatch_id {
            self.pop_submatch(id);
        }
    }

    fn visit_leaf(&mut self, node: NodeId, leaf: &Leaf) {
        match leaf {
            Leaf::Tag(_) => {
                // Tag leaves are created by this pass and are never part
                // of the tree it traverses.
                unreachable!("tag leaf found during tag injection")
            }
            Leaf::Literal { .. } if self.markers_pending() => {
                match self.pass {
                    Pass::Annotate => {
                        let direction = self.direction;
                        self.tag_and_update(node, direction);
                    }
                    Pass::Count => self.ast.node_mut(node).n_tags = 1,
                }
                self.update_tags();
            }
            _ => {}
        }
        self.update_parents(node);
    }

    fn visit_cons(&mut self, node: NodeId, left: NodeId, right: NodeId) {
        // During annotation the per-node counts are known, so the numbers
        // the left subtree will use can be reserved up front, keeping the
        // numbering dense across the concatenation. During counting the
        // counts still read zero and nothing is reserved.
        let left_n_tags = self.ast.node(left).n_tags;
        let right_n_tags = self.ast.node(right).n_tags;
        let next_tag_after_left = self.next_tag + left_n_tags;
        let mut reserved_tag = None;
        if left_n_tags > 0 && right_n_tags > 0 {
            reserved_tag = Some(self.next_tag);
            self.next_tag += 1;
        }
        self.update_parents(node);
        self.visit(left);
        self.next_tag = next_tag_after_left;
        if let Some(tag) = reserved_tag {
            self.tag = tag;
        }
        self.visit(right);
        if self.pass == Pass::Count {
            let n =
                self.ast.node(left).n_tags + self.ast.node(right).n_tags;
            self.ast.node_mut(node).n_tags = n;
        }
    }

    fn visit_iter(&mut self, node: NodeId, atom: NodeId, minimal: bool) {
        let add_tag = self.markers_pending() || minimal;
        let saved_tag = self.tag;
        if add_tag {
            if self.pass == Pass::Annotate {
                // The start tag of a minimal repetition prefers later
                // offsets, pushing the repetition scope rightwards.
                let direction = if minimal {
                    TagDirection::Maximize
                } else {
                    self.direction
                };
                self.tag_and_update(node, direction);
            }
            self.update_tags();
        }
        self.direction = TagDirection::Minimize;
        self.update_parents(node);
        self.visit(atom);
        match self.pass {
            Pass::Count => {
                let n = self.ast.node(atom).n_tags + usize::from(add_tag);
                self.ast.node_mut(node).n_tags = n;
                self.minimal_tag = None;
            }
            Pass::Annotate => {
                if minimal {
                    self.minimal_tag = Some(saved_tag);
                    self.direction = TagDirection::Minimize;
                } else {
                    self.direction = TagDirection::Maximize;
                }
            }
        }
    }

    fn visit_union(&mut self, node: NodeId, left: NodeId, right: NodeId) {
        let add_tag = self.markers_pending();
        let (left_tag, right_tag) = if add_tag {
            (self.next_tag, self.next_tag + 1)
        } else {
            (self.tag, self.next_tag)
        };
        if add_tag {
            if self.pass == Pass::Annotate {
                let direction = self.direction;
                self.tag_and_update(node, direction);
            }
            self.update_tags();
        }
        // When the union contains submatches, each branch gets a marker
        // tag at its end so that paths through different branches stay
        // distinguishable.
        let has_submatches = self.ast.node(node).n_submatches > 0;
        if has_submatches {
            self.next_tag += 1;
            self.tag = self.next_tag;
            self.next_tag += 1;
        }
        self.update_parents(node);
        self.visit(left);
        let saved_base = self.regset_base;
        self.regset_base = self.regset.len();
        self.visit(right);
        self.regset_base = saved_base;
        if self.pass == Pass::Count {
            let n = self.ast.node(left).n_tags
                + self.ast.node(right).n_tags
                + usize::from(add_tag)
                + if has_submatches { 2 } else { 0 };
            self.ast.node_mut(node).n_tags = n;
        }
        if has_submatches {
            if self.pass == Pass::Annotate {
                self.ast.wrap_tag_right(left, left_tag);
                self.tag_directions[left_tag] = TagDirection::Maximize;
                self.ast.wrap_tag_right(right, right_tag);
                self.tag_directions[right_tag] = TagDirection::Maximize;
            }
            self.n_tags += 2;
        }
        self.direction = TagDirection::Maximize;
    }

    fn markers_pending(&self) -> bool {
        self.regset.len() > self.regset_base
    }

    fn push_submatch(&mut self, id: SubmatchId) {
        self.regset.push(id * 2);
        if self.pass == Pass::Annotate {
            self.submatch_data[id].parents = self.parents.clone();
        }
    }

    fn pop_submatch(&mut self, id: SubmatchId) {
        self.regset.push(id * 2 + 1);
        self.parents.pop();
    }

    fn update_parents(&mut self, node: NodeId) {
        if let Some(id) = self.ast.node(node).submatch_id {
            self.parents.push(id);
        }
    }

    /// Injects the current tag in front of `node` and resolves everything
    /// pending against it.
    fn tag_and_update(&mut self, node: NodeId, direction: TagDirection) {
        self.ast.wrap_tag_left(node, self.tag);
        self.tag_directions[self.tag] = direction;
        self.flush_markers();
    }

    /// Resolves the pending minimal scope and submatch boundary markers to
    /// the current tag.
    fn flush_markers(&mut self) {
        if let Some(begin) = self.minimal_tag.take() {
            self.minimal_tags.push((self.tag, begin));
        }
        for &marker in &self.regset[self.regset_base..] {
            let id = marker / 2;
            if marker % 2 == 0 {
                self.submatch_data[id].begin_tag = self.tag;
            } else {
                self.submatch_data[id].end_tag = self.tag;
            }
        }
    }

    fn update_tags(&mut self) {
        self.regset.truncate(self.regset_base);
        self.tag = self.next_tag;
        self.next_tag += 1;
        self.n_tags += 1;
    }
}
