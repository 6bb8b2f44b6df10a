//! Removal half of a replace change.
//!
//! The range is walked once to classify what it touches. Each touched node
//! is either removed whole, has chars cut out of it, loses its open
//! boundary (it is entered from the left) or loses its close boundary (it
//! is left towards the right). The classification drives both the tree
//! mutation and the fragments that put everything back.

use super::{common_ancestor, gap_container};
use crate::errors::EditResult;
use folio_model::{Fragment, ModelError, Node, NodeKey, Tree};
use std::collections::HashSet;
use std::ops::Range;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Full { key: NodeKey, depth: usize },
    /// The start of `key` was removed; its identity is handed back as an
    /// open shell
    Open { key: NodeKey, depth: usize },
    Close { key: NodeKey },
    Chars { key: NodeKey, range: Range<usize> },
}

#[derive(Debug, Clone)]
pub(crate) struct Removal {
    pub fragments: Vec<Fragment>,
    /// Removed text started at the head of a leaf that keeps content
    pub starts_leaf: bool,
    /// Deepest branch holding both ends of the range
    pub container: NodeKey,
}

struct Walk<'a> {
    tree: &'a Tree,
    from: usize,
    to: usize,
    base: usize,
    events: Vec<Event>,
}

impl Walk<'_> {
    fn collect(&mut self, node: NodeKey, start: usize, depth: usize) {
        let size = self.tree.node_size(node);
        let end = start + size;
        // Depth of `node` as a fragment entry, relative to the gap at `from`
        let level = (self.base + 2).saturating_sub(depth);

        if self.tree.is_leaf(node) {
            let lo = self.from.max(start) - start;
            let hi = self.to.min(end) - start;
            if size == 0 || (lo == 0 && hi == size) {
                self.events.push(Event::Full { key: node, depth: level });
            } else if lo < hi {
                if lo == 0 && self.from < start {
                    self.events.push(Event::Open { key: node, depth: level });
                }
                self.events.push(Event::Chars {
                    key: node,
                    range: lo..hi,
                });
            }
            return;
        }

        if self.from <= start && end <= self.to {
            self.events.push(Event::Full { key: node, depth: level });
            return;
        }
        if self.from <= start {
            self.events.push(Event::Open { key: node, depth: level });
        }
        let mut cursor = start + 1;
        for child in self.tree.children(node) {
            let child_size = self.tree.node_size(*child);
            if cursor < self.to && self.from < cursor + child_size {
                self.collect(*child, cursor, depth + 1);
            }
            cursor += child_size;
        }
        if end <= self.to {
            self.events.push(Event::Close { key: node });
        }
    }
}

impl Removal {
    pub(crate) fn remove(tree: &mut Tree, from: usize, to: usize, base: usize) -> EditResult<Self> {
        if from == to {
            return Ok(Self {
                fragments: Vec::new(),
                starts_leaf: false,
                container: gap_container(tree, from)?,
            });
        }

        // Chars inside a single leaf that keeps some of its text
        let position = tree.resolve_position(from)?;
        let deepest = position.deepest();
        if tree.is_leaf(deepest.node) {
            let leaf = deepest.node;
            let start = from - deepest.offset;
            let len = tree.node_size(leaf);
            let whole = deepest.offset == 0 && to == start + len;
            if to <= start + len && !whole {
                let removed = tree.splice_text(leaf, deepest.offset..to - start, "")?;
                debug!(len = removed.len(), "[Change] Removed text");
                return Ok(Self {
                    fragments: vec![Fragment::text(removed)],
                    starts_leaf: deepest.offset == 0,
                    container: tree.parent(leaf).unwrap_or(leaf),
                });
            }
        }

        let root = tree.root();
        let mut walk = Walk {
            tree,
            from,
            to,
            base,
            events: Vec::new(),
        };
        walk.collect(root, 0, 1);
        let mut events = walk.events;

        let from_container = gap_container(tree, from)?;
        let container = common_ancestor(tree, from_container, gap_container(tree, to)?);
        keep_cut_container(tree, from_container, &mut events)?;

        let (left, right) = cut_neighbours(tree, from, to)?;
        if let Some(right) = joinable(tree, left, right) {
            let opened = events
                .iter()
                .any(|event| matches!(event, Event::Open { key, .. } if *key == right));
            if !opened {
                events.push(Event::Open {
                    key: right,
                    depth: base + 2 - tree.depth(right),
                });
            }
        }
        let join = joinable(tree, left, right).zip(left);

        let fragments = group(tree, &events);
        execute(tree, &events)?;
        if let Some((right, left)) = join {
            if tree.next_sibling(left) == Some(right) {
                tree.merge_into(left, right)?;
            }
        }

        debug!(
            events = events.len(),
            fragments = fragments.len(),
            "[Change] Removed range"
        );
        Ok(Self {
            fragments,
            starts_leaf: false,
            container,
        })
    }
}

/// Nodes on either side of the cut: the node ending at `from` and the node
/// starting at `to`, at the depth of the gap
fn cut_neighbours(
    tree: &Tree,
    from: usize,
    to: usize,
) -> EditResult<(Option<NodeKey>, Option<NodeKey>)> {
    let start = tree.resolve_position(from)?.deepest();
    let left = if tree.is_leaf(start.node) && start.offset > 0 {
        Some(start.node)
    } else if start.offset == 0 {
        tree.previous_sibling(start.node)
    } else {
        tree.children(start.node).last().copied()
    };

    let end = tree.resolve_position(to)?.deepest();
    let right = if tree.is_leaf(end.node) || end.offset == 0 {
        Some(end.node)
    } else {
        None
    };
    Ok((left, right))
}

/// Right leaf that will join the left one once the range is gone. Leaves
/// that were already neighbours stay apart.
fn joinable(tree: &Tree, left: Option<NodeKey>, right: Option<NodeKey>) -> Option<NodeKey> {
    let (left, right) = (left?, right?);
    let joins = left != right
        && tree.is_leaf(left)
        && tree.is_leaf(right)
        && tree.identity(left).mergeable_with(tree.identity(right))
        && tree.next_sibling(left) != Some(right);
    joins.then_some(right)
}

/// The deepest branch left holding the cut must keep a child. The first
/// leaf removed from it is emptied instead of removed; without one the
/// removal is refused.
fn keep_cut_container(
    tree: &Tree,
    from_container: NodeKey,
    events: &mut Vec<Event>,
) -> EditResult<()> {
    let holder = events
        .iter()
        .find_map(|event| match event {
            Event::Close { key } => Some(*key),
            _ => None,
        })
        .unwrap_or(from_container);
    let partner = events.iter().rev().find_map(|event| match event {
        Event::Open { key, .. } if !tree.is_leaf(*key) => Some(*key),
        _ => None,
    });

    let full: HashSet<NodeKey> = events
        .iter()
        .filter_map(|event| match event {
            Event::Full { key, .. } => Some(*key),
            _ => None,
        })
        .collect();
    let candidates: Vec<NodeKey> = tree
        .children(holder)
        .iter()
        .chain(partner.iter().flat_map(|key| tree.children(*key)))
        .copied()
        .collect();
    if candidates.iter().any(|key| !full.contains(key)) {
        return Ok(());
    }

    let kept = candidates
        .iter()
        .copied()
        .find(|key| tree.is_leaf(*key))
        .ok_or_else(|| ModelError::EmptyBranch(tree.id(holder).to_string()))?;
    let Some(index) = events
        .iter()
        .position(|event| matches!(event, Event::Full { key, .. } if *key == kept))
    else {
        return Err(ModelError::EmptyBranch(tree.id(holder).to_string()).into());
    };

    let chars = Event::Chars {
        key: kept,
        range: 0..tree.node_size(kept),
    };
    if Some(holder) == tree.parent(kept) {
        events[index] = chars;
    } else {
        events[index] = Event::Open {
            key: kept,
            depth: 1,
        };
        events.insert(index + 1, chars);
    }
    Ok(())
}

/// Turn removal events into fragments. Entries at one depth form a single
/// list; an open shell ends its list.
fn group(tree: &Tree, events: &[Event]) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut list: Option<(usize, Vec<Node>)> = None;

    fn flush(fragments: &mut Vec<Fragment>, list: &mut Option<(usize, Vec<Node>)>, open: bool) {
        if let Some((depth, nodes)) = list.take() {
            fragments.push(if open {
                Fragment::open_nodes(depth, nodes)
            } else {
                Fragment::nodes(depth, nodes)
            });
        }
    }

    for event in events {
        match event {
            Event::Close { .. } => {}
            Event::Chars { key, range } => {
                flush(&mut fragments, &mut list, false);
                let text: String = tree
                    .text_of(*key)
                    .chars()
                    .skip(range.start)
                    .take(range.len())
                    .collect();
                fragments.push(Fragment::text(text));
            }
            Event::Full { key, depth } | Event::Open { key, depth } => {
                if list.as_ref().map(|(d, _)| d) != Some(depth) {
                    flush(&mut fragments, &mut list, false);
                    list = Some((*depth, Vec::new()));
                }
                let node = match event {
                    Event::Open { .. } => Node::shell(tree.identity(*key).clone()),
                    _ => tree.to_node(*key),
                };
                if let Some((_, nodes)) = list.as_mut() {
                    nodes.push(node);
                }
                if matches!(event, Event::Open { .. }) {
                    flush(&mut fragments, &mut list, true);
                }
            }
        }
    }
    flush(&mut fragments, &mut list, false);
    fragments
}

fn execute(tree: &mut Tree, events: &[Event]) -> EditResult<()> {
    let mut left_chain = Vec::new();
    let mut right_chain = Vec::new();

    for event in events {
        match event {
            Event::Chars { key, range } => {
                tree.splice_text(*key, range.clone(), "")?;
            }
            Event::Full { key, .. } => {
                tree.remove_node(*key)?;
            }
            Event::Close { key } => left_chain.push(*key),
            Event::Open { key, .. } if !tree.is_leaf(*key) => right_chain.push(*key),
            Event::Open { .. } => {}
        }
    }

    // Close events arrive deepest first, open events shallowest first
    left_chain.reverse();
    for (left, right) in left_chain.into_iter().zip(right_chain) {
        tree.merge_into(left, right)?;
    }
    Ok(())
}
