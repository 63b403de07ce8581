/*! Nullability and position set computation.

This is the induction that makes epsilon elimination possible. Every node
gets three annotations, computed bottom-up:

* `nullable`: whether the subtree matches the empty string;
* `firstpos`: the literal leaves that can match the first code point of a
  non-empty match of the subtree;
* `lastpos`: the literal leaves that can match the last one.

Tags and assertions have no position of their own. When a concatenation
skips over a nullable child, the tags and assertions that an empty match of
that child would cross are collected and folded into the position entries
they precede, so the information survives into the transitions even though
the epsilon paths themselves disappear.
*/

use crate::ast::{
    Ast, AssertionSet, Leaf, NodeId, NodeKind, PosEntry, PosSet, TagSet,
};

/// Annotates the subtree rooted at `node`.
pub(crate) fn compute_nfl(ast: &mut Ast, node: NodeId) {
    match ast.node(node).kind.clone() {
        NodeKind::Leaf(Leaf::Literal { literal, id }) => {
            let entry = PosEntry {
                id,
                tags: TagSet::new(),
                assertions: AssertionSet::none(),
                literal,
            };
            let n = ast.node_mut(node);
            n.nullable = false;
            n.firstpos = vec![entry.clone()];
            n.lastpos = vec![entry];
        }
        NodeKind::Leaf(_) => {
            let n = ast.node_mut(node);
            n.nullable = true;
            n.firstpos = Vec::new();
            n.lastpos = Vec::new();
        }
        NodeKind::Cons(left, right) => {
            compute_nfl(ast, left);
            compute_nfl(ast, right);
            let nullable = ast.node(left).nullable && ast.node(right).nullable;
            let firstpos = if ast.node(left).nullable {
                let skipped = ast.node(right).firstpos.clone();
                let direct = ast.node(left).firstpos.clone();
                union_through(ast, left, &skipped, &direct)
            } else {
                ast.node(left).firstpos.clone()
            };
            let lastpos = if ast.node(right).nullable {
                let skipped = ast.node(left).lastpos.clone();
                let direct = ast.node(right).lastpos.clone();
                union_through(ast, right, &skipped, &direct)
            } else {
                ast.node(right).lastpos.clone()
            };
            let n = ast.node_mut(node);
            n.nullable = nullable;
            n.firstpos = firstpos;
            n.lastpos = lastpos;
        }
        NodeKind::Iter { atom, min, .. } => {
            compute_nfl(ast, atom);
            let nullable = min == 0 || ast.node(atom).nullable;
            let firstpos = ast.node(atom).firstpos.clone();
            let lastpos = ast.node(atom).lastpos.clone();
            let n = ast.node_mut(node);
            n.nullable = nullable;
            n.firstpos = firstpos;
            n.lastpos = lastpos;
        }
        NodeKind::Union(left, right) => {
            compute_nfl(ast, left);
            compute_nfl(ast, right);
            let nullable = ast.node(left).nullable || ast.node(right).nullable;
            let mut firstpos = ast.node(left).firstpos.clone();
            firstpos.extend_from_slice(&ast.node(right).firstpos);
            let mut lastpos = ast.node(left).lastpos.clone();
            lastpos.extend_from_slice(&ast.node(right).lastpos);
            let n = ast.node_mut(node);
            n.nullable = nullable;
            n.firstpos = firstpos;
            n.lastpos = lastpos;
        }
    }
}

/// Unions two position sets across a nullable subtree. The entries of
/// `crossing` are reached by matching `via` empty, so they pick up the tags
/// an empty match of `via` crosses; the assertions it crosses constrain the
/// position itself and apply to both sets.
fn union_through(
    ast: &Ast,
    via: NodeId,
    crossing: &PosSet,
    direct: &PosSet,
) -> PosSet {
    let mut tags = TagSet::new();
    let mut assertions = AssertionSet::none();
    match_empty(ast, via, &mut tags, &mut assertions);
    let mut out = Vec::with_capacity(crossing.len() + direct.len());
    for entry in crossing {
        let mut entry_tags = entry.tags.clone();
        for &tag in &tags {
            if !entry_tags.contains(&tag) {
                entry_tags.push(tag);
            }
        }
        out.push(PosEntry {
            id: entry.id,
            tags: entry_tags,
            assertions: entry.assertions | assertions,
            literal: entry.literal,
        });
    }
    for entry in direct {
        out.push(PosEntry {
            id: entry.id,
            tags: entry.tags.clone(),
            assertions: entry.assertions | assertions,
            literal: entry.literal,
        });
    }
    out
}

/// Collects the tags and assertions crossed by one empty match of `node`.
/// The subtree must be nullable.
fn match_empty(
    ast: &Ast,
    node: NodeId,
    tags: &mut TagSet,
    assertions: &mut AssertionSet,
) {
    match ast.node(node).kind {
        NodeKind::Leaf(Leaf::Empty) => {}
        NodeKind::Leaf(Leaf::Assertion(set)) => *assertions |= set,
        NodeKind::Leaf(Leaf::Tag(tag)) => {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        NodeKind::Leaf(Leaf::Literal { .. }) => {
            unreachable!("literal leaf in an empty match")
        }
        NodeKind::Cons(left, right) => {
            debug_assert!(ast.node(left).nullable);
            debug_assert!(ast.node(right).nullable);
            match_empty(ast, left, tags, assertions);
            match_empty(ast, right, tags, assertions);
        }
        NodeKind::Iter { atom, .. } => {
            if ast.node(atom).nullable {
                match_empty(ast, atom, tags, assertions);
            }
        }
        NodeKind::Union(left, right) => {
            if ast.node(left).nullable {
                match_empty(ast, left, tags, assertions);
            } else {
                match_empty(ast, right, tags, assertions);
            }
        }
    }
}
