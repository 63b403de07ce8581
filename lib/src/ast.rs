/*! Abstract syntax trees for patterns.

The parser produces one of these trees for every pattern, and the compiler
consumes it while building the TNFA. All nodes live in an [`Ast`] arena and
reference each other through stable [`NodeId`] indices; the whole arena is
dropped at once when compilation finishes (or fails), so individual nodes
are never freed.

Four kinds of nodes exist: leaves, concatenations, iterations and unions.
Leaves are either empty (matching zero-width), literals (a code point, a
code point range, or a class predicate), input-position assertions, or tags
that the compiler injects for submatch addressing.
*/

use bitmask::bitmask;
use smallvec::SmallVec;

use crate::classes::CharClass;

/// A tag index. Tags number the slots of the tag-value vector maintained
/// per path during execution.
pub(crate) type TagId = usize;

/// A leaf id. Literal leaves are numbered densely, starting at zero, and
/// become the states of the TNFA.
pub(crate) type LeafId = usize;

/// A submatch id. Submatch 0 is the whole pattern.
pub(crate) type SubmatchId = usize;

/// A set of tags. Most sets are tiny, so they are kept inline.
pub(crate) type TagSet = SmallVec<[TagId; 4]>;

bitmask! {
    /// A set of input-position assertions attached to a leaf or to a
    /// transition. More than one assertion can be made at the same point
    /// of the input, so they act like a bitmask.
    #[derive(Debug)]
    pub mask AssertionSet: u8 where
    /// Each of the input-position assertions: the beginning and end of
    /// the input (`^^`, `$$`) and of a line (`^`, `$`).
    flags Assertion {
        BeginInput = 0x01,
        EndInput   = 0x02,
        BeginLine  = 0x04,
        EndLine    = 0x08,
    }
}

/// A literal, defined by value, by range, or by a class predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Literal {
    Char(char),
    Range(char, char),
    Class(CharClass),
}

impl Literal {
    /// Returns true if the literal matches the code point `c`.
    #[inline]
    pub fn matches(&self, c: char) -> bool {
        match self {
            Literal::Char(l) => *l == c,
            Literal::Range(begin, end) => (*begin..=*end).contains(&c),
            Literal::Class(class) => class.contains(c),
        }
    }
}

/// A leaf node.
#[derive(Debug, Clone)]
pub(crate) enum Leaf {
    /// Matches the empty string.
    Empty,
    /// Matches one code point. `id` is unique among literal leaves.
    Literal { literal: Literal, id: LeafId },
    /// Asserts something about the current input position.
    Assertion(AssertionSet),
    /// Records the current input offset into a tag slot when crossed.
    Tag(TagId),
}

/// The variant part of a node.
#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Leaf(Leaf),
    Cons(NodeId, NodeId),
    Iter { atom: NodeId, min: u32, max: Option<u32>, minimal: bool },
    Union(NodeId, NodeId),
}

/// An element of a firstpos/lastpos set: a leaf position reachable as the
/// first (or last) symbol of a subtree, together with the tags and
/// assertions collected along any epsilon path used to reach it.
#[derive(Debug, Clone)]
pub(crate) struct PosEntry {
    pub id: LeafId,
    pub tags: TagSet,
    pub assertions: AssertionSet,
    pub literal: Literal,
}

pub(crate) type PosSet = Vec<PosEntry>;

/// A node of the tree, together with the annotations maintained by the
/// parser and the compiler.
///
/// `n_submatches` and `n_tags` always equal the sum over the children plus
/// whatever the node introduces itself; the compiler recomputes them
/// bottom-up where it edits the structure.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub kind: NodeKind,
    pub submatch_id: Option<SubmatchId>,
    pub n_submatches: usize,
    pub n_tags: usize,
    pub nullable: bool,
    pub firstpos: PosSet,
    pub lastpos: PosSet,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            submatch_id: None,
            n_submatches: 0,
            n_tags: 0,
            nullable: true,
            firstpos: Vec::new(),
            lastpos: Vec::new(),
        }
    }
}

/// A stable index into the [`Ast`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeId(u32);

impl NodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// The arena that owns every node of one pattern's tree.
#[derive(Debug, Default)]
pub(crate) struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = u32::try_from(self.nodes.len())
            .expect("pattern tree exceeds u32::MAX nodes");
        self.nodes.push(node);
        NodeId(id)
    }

    pub fn literal_char(&mut self, c: char, id: LeafId) -> NodeId {
        self.literal(Literal::Char(c), id)
    }

    pub fn literal_range(
        &mut self,
        begin: char,
        end: char,
        id: LeafId,
    ) -> NodeId {
        self.literal(Literal::Range(begin, end), id)
    }

    pub fn literal_class(&mut self, class: CharClass, id: LeafId) -> NodeId {
        self.literal(Literal::Class(class), id)
    }

    pub fn literal(&mut self, literal: Literal, id: LeafId) -> NodeId {
        self.push(Node::new(NodeKind::Leaf(Leaf::Literal { literal, id })))
    }

    pub fn assertion(&mut self, assertions: AssertionSet) -> NodeId {
        self.push(Node::new(NodeKind::Leaf(Leaf::Assertion(assertions))))
    }

    pub fn tag(&mut self, tag: TagId) -> NodeId {
        self.push(Node::new(NodeKind::Leaf(Leaf::Tag(tag))))
    }

    pub fn empty(&mut self) -> NodeId {
        self.push(Node::new(NodeKind::Leaf(Leaf::Empty)))
    }

    /// Creates a concatenation node. The number of submatches is inherited
    /// from the two children.
    pub fn cons(&mut self, left: NodeId, right: NodeId) -> NodeId {
        let n_submatches =
            self.node(left).n_submatches + self.node(right).n_submatches;
        let mut node = Node::new(NodeKind::Cons(left, right));
        node.n_submatches = n_submatches;
        self.push(node)
    }

    /// Concatenates two optional nodes, returning the other one when one of
    /// them is absent.
    pub fn cons_or_other(
        &mut self,
        left: Option<NodeId>,
        right: Option<NodeId>,
    ) -> Option<NodeId> {
        match (left, right) {
            (None, right) => right,
            (left, None) => left,
            (Some(left), Some(right)) => Some(self.cons(left, right)),
        }
    }

    pub fn iter(
        &mut self,
        atom: NodeId,
        min: u32,
        max: Option<u32>,
        minimal: bool,
    ) -> NodeId {
        let n_submatches = self.node(atom).n_submatches;
        let mut node =
            Node::new(NodeKind::Iter { atom, min, max, minimal });
        node.n_submatches = n_submatches;
        self.push(node)
    }

    pub fn union(&mut self, left: NodeId, right: NodeId) -> NodeId {
        let n_submatches =
            self.node(left).n_submatches + self.node(right).n_submatches;
        let mut node = Node::new(NodeKind::Union(left, right));
        node.n_submatches = n_submatches;
        self.push(node)
    }

    /// Marks the subtree rooted at `target` as submatch `id`. If the node
    /// already carries a submatch id it is first wrapped in a concatenation
    /// with an empty leaf, so that at most one id sits on any given node.
    pub fn mark_submatch(&mut self, target: NodeId, id: SubmatchId) {
        if self.node(target).submatch_id.is_some() {
            let inner = self.nodes[target.index()].clone();
            let n_submatches = inner.n_submatches;
            let inner = self.push(inner);
            let empty = self.empty();
            let slot = self.node_mut(target);
            slot.kind = NodeKind::Cons(empty, inner);
            slot.submatch_id = None;
            slot.n_submatches = n_submatches;
        }
        let node = self.node_mut(target);
        node.submatch_id = Some(id);
        node.n_submatches += 1;
    }

    /// Rewrites the slot of `target` into `Cons(tag, copy-of-target)`. The
    /// original node's contents move into a fresh slot, so references to
    /// `target` now see the tagged concatenation while its annotations stay
    /// in place.
    pub fn wrap_tag_left(&mut self, target: NodeId, tag: TagId) {
        let copy = Node::new(self.nodes[target.index()].kind.clone());
        let copy = self.push(copy);
        let tag = self.tag(tag);
        self.node_mut(target).kind = NodeKind::Cons(tag, copy);
    }

    /// Same as [`Ast::wrap_tag_left`], but with the tag and the node
    /// reversed: the slot becomes `Cons(copy-of-target, tag)`.
    pub fn wrap_tag_right(&mut self, target: NodeId, tag: TagId) {
        let copy = Node::new(self.nodes[target.index()].kind.clone());
        let copy = self.push(copy);
        let tag = self.tag(tag);
        self.node_mut(target).kind = NodeKind::Cons(copy, tag);
    }
}
