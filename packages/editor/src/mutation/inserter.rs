//! Insertion half of a replace change.
//!
//! The inserter keeps a spot in the tree and a level: 0 inside a leaf, `n`
//! in the gap among the children of the branch `n - 1` levels above the
//! leaf's parent. Each fragment moves the spot to its own depth, splitting
//! nodes on the way up and entering nodes on the way down.

use super::Bias;
use crate::errors::{EditError, EditResult};
use folio_model::{Fragment, IdGenerator, Identity, ModelError, Node, NodeKey, Tree};
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Spot {
    InLeaf { leaf: NodeKey, offset: usize },
    Gap { parent: NodeKey, index: usize },
}

pub(crate) struct Inserter<'a> {
    tree: &'a mut Tree,
    ids: &'a mut IdGenerator,
    at: usize,
    spot: Spot,
    level: usize,
    /// Right halves created by splitting at the insertion point
    fresh: HashSet<NodeKey>,
    /// Branch shells that must be filled before the change completes
    shells: Vec<NodeKey>,
    /// Whole leaf lists inserted among leaves
    leaf_lists: Vec<Vec<NodeKey>>,
    /// Shallowest branch modified so far
    top: NodeKey,
}

impl<'a> Inserter<'a> {
    pub(crate) fn new(
        tree: &'a mut Tree,
        ids: &'a mut IdGenerator,
        at: usize,
    ) -> EditResult<Self> {
        let deepest = tree.resolve_position(at)?.deepest();
        let node = deepest.node;
        let spot = if tree.is_leaf(node) {
            Spot::InLeaf {
                leaf: node,
                offset: deepest.offset,
            }
        } else if deepest.offset == 0 {
            let parent = tree
                .parent(node)
                .ok_or(EditError::invalid_range(at, at))?;
            Spot::Gap {
                parent,
                index: tree.index_in_parent(node).unwrap_or(0),
            }
        } else {
            Spot::Gap {
                parent: node,
                index: tree.children(node).len(),
            }
        };
        let (level, top) = match spot {
            Spot::InLeaf { leaf, .. } => (0, tree.parent(leaf).unwrap_or(leaf)),
            Spot::Gap { parent, .. } => (1, parent),
        };

        Ok(Self {
            tree,
            ids,
            at,
            spot,
            level,
            fresh: HashSet::new(),
            shells: Vec::new(),
            leaf_lists: Vec::new(),
            top,
        })
    }

    /// Insert every fragment, returning the shallowest modified branch
    pub(crate) fn insert(
        mut self,
        fragments: &[Fragment],
        bias: Bias,
        join: bool,
    ) -> EditResult<NodeKey> {
        for (index, fragment) in fragments.iter().enumerate() {
            match fragment {
                Fragment::Text { text } => {
                    // Text that follows a node list continues to the right
                    let bias = if index == 0 { bias } else { Bias::Right };
                    self.enter_text(bias, index == 0)?;
                    if let Spot::InLeaf { leaf, offset } = &mut self.spot {
                        self.tree.splice_text(*leaf, *offset..*offset, text)?;
                        *offset += text.chars().count();
                    }
                }
                Fragment::Nodes { depth, nodes, open } => {
                    self.insert_nodes(*depth, nodes, *open)?;
                }
            }
        }

        if join {
            self.join_leaf_lists()?;
        }
        for shell in &self.shells {
            if self.tree.contains(*shell) && self.tree.children(*shell).is_empty() {
                let id = self.tree.id(*shell).to_string();
                return Err(ModelError::EmptyBranch(id).into());
            }
        }
        debug!(level = self.level, top = self.tree.id(self.top), "[Change] Inserted");
        Ok(self.top)
    }

    fn insert_nodes(&mut self, depth: usize, nodes: &[Node], open: bool) -> EditResult<()> {
        if depth == 0 {
            return Err(EditError::FragmentDepthMismatch { depth, max: 0 });
        }
        self.reach(depth)?;
        let Spot::Gap { parent, index } = self.spot else {
            return Err(EditError::FragmentDepthMismatch { depth, max: self.level });
        };

        let (whole, shell) = match nodes.split_last() {
            Some((last, rest)) if open => (rest, Some(last)),
            _ => (nodes, None),
        };
        let keys = self.tree.attach(parent, index, whole.to_vec())?;
        let index = index + keys.len();
        self.spot = Spot::Gap { parent, index };
        if depth == 1 && !open && !keys.is_empty() && keys.iter().all(|key| self.tree.is_leaf(*key)) {
            self.leaf_lists.push(keys);
        }

        if let Some(shell) = shell {
            self.enter_shell(parent, index, shell.identity.clone())?;
        }
        Ok(())
    }

    /// Give the shell's identity to the right half split off at the gap, or
    /// reuse the node already carrying it. Any other following node is left
    /// alone and an empty node is attached in front of it. Then enter that
    /// node.
    fn enter_shell(&mut self, parent: NodeKey, index: usize, identity: Identity) -> EditResult<()> {
        let next = self.tree.children(parent).get(index).copied();
        let key = match next {
            Some(next)
                if self.tree.kind(next) == identity.kind
                    && (self.fresh.contains(&next) || self.tree.id(next) == identity.id) =>
            {
                self.tree.set_identity(next, identity)?;
                next
            }
            _ => {
                let key = self.tree.attach_shell(parent, index, identity)?;
                if !self.tree.is_leaf(key) {
                    self.shells.push(key);
                }
                key
            }
        };
        self.enter_start(key)
    }

    fn reach(&mut self, level: usize) -> EditResult<()> {
        while self.level < level {
            self.ascend()?;
        }
        while self.level > level {
            self.descend()?;
        }
        Ok(())
    }

    /// Move to the gap one level up, splitting the current node if the spot
    /// is in its middle
    fn ascend(&mut self) -> EditResult<()> {
        let (node, cut, len) = match self.spot {
            Spot::InLeaf { leaf, offset } => (leaf, offset, self.tree.node_size(leaf)),
            Spot::Gap { parent, index } => (parent, index, self.tree.children(parent).len()),
        };
        let parent = self.tree.parent(node).ok_or(EditError::FragmentDepthMismatch {
            depth: self.level + 1,
            max: self.level,
        })?;
        let position = self.tree.index_in_parent(node).unwrap_or(0);

        let index = if cut == 0 {
            position
        } else if cut >= len {
            position + 1
        } else {
            let id = self.fresh_id();
            let right = if self.tree.is_leaf(node) {
                self.tree.split_leaf(node, cut, id)?
            } else {
                self.tree.split_branch(node, cut, id)?
            };
            self.fresh.insert(right);
            position + 1
        };

        self.spot = Spot::Gap { parent, index };
        self.level += 1;
        self.touch(parent);
        Ok(())
    }

    /// Enter the node after the gap at its start, or the node before it at
    /// its end
    fn descend(&mut self) -> EditResult<()> {
        let Spot::Gap { parent, index } = self.spot else {
            return Err(EditError::NoLeafAt { offset: self.at });
        };
        let children = self.tree.children(parent);
        if let Some(next) = children.get(index).copied() {
            return self.enter_start(next);
        }
        let Some(previous) = index.checked_sub(1).and_then(|i| children.get(i)).copied() else {
            return Err(EditError::NoLeafAt { offset: self.at });
        };
        if self.tree.is_leaf(previous) {
            self.enter_leaf(previous, self.tree.node_size(previous))
        } else {
            let end = self.tree.children(previous).len();
            self.enter_branch(previous, end)
        }
    }

    fn enter_start(&mut self, key: NodeKey) -> EditResult<()> {
        if self.tree.is_leaf(key) {
            self.enter_leaf(key, 0)
        } else {
            self.enter_branch(key, 0)
        }
    }

    /// Leaves sit at level 0 only, so branches can be entered from level 2
    /// and up
    fn enter_branch(&mut self, branch: NodeKey, index: usize) -> EditResult<()> {
        if self.level < 2 {
            return Err(EditError::FragmentDepthMismatch {
                depth: self.level,
                max: 0,
            });
        }
        self.spot = Spot::Gap {
            parent: branch,
            index,
        };
        self.level -= 1;
        Ok(())
    }

    fn enter_leaf(&mut self, leaf: NodeKey, offset: usize) -> EditResult<()> {
        if self.level != 1 {
            return Err(EditError::FragmentDepthMismatch {
                depth: self.level.saturating_sub(1),
                max: 0,
            });
        }
        self.spot = Spot::InLeaf { leaf, offset };
        self.level = 0;
        Ok(())
    }

    /// Bring the spot inside a leaf for text
    fn enter_text(&mut self, bias: Bias, leading: bool) -> EditResult<()> {
        while self.level > 1 {
            self.descend()?;
        }

        match self.spot {
            Spot::InLeaf { leaf, offset } => {
                if leading && offset == 0 && bias == Bias::Left {
                    if let Some(previous) = self.tree.previous_sibling(leaf) {
                        if self.tree.is_leaf(previous) {
                            let end = self.tree.node_size(previous);
                            self.spot = Spot::InLeaf {
                                leaf: previous,
                                offset: end,
                            };
                        }
                    }
                }
                Ok(())
            }
            Spot::Gap { parent, index } => {
                let children = self.tree.children(parent);
                let previous = index
                    .checked_sub(1)
                    .and_then(|i| children.get(i))
                    .copied()
                    .filter(|key| self.tree.is_leaf(*key));
                let next = children
                    .get(index)
                    .copied()
                    .filter(|key| self.tree.is_leaf(*key));
                let choice = match bias {
                    Bias::Left => previous
                        .map(|key| (key, self.tree.node_size(key)))
                        .or(next.map(|key| (key, 0))),
                    Bias::Right => next
                        .map(|key| (key, 0))
                        .or(previous.map(|key| (key, self.tree.node_size(key)))),
                };
                let (leaf, offset) = choice.ok_or(EditError::NoLeafAt { offset: self.at })?;
                self.enter_leaf(leaf, offset)
            }
        }
    }

    /// Join inserted leaf lists with matching neighbours. Pre-existing
    /// nodes keep their ids; halves split off at the insertion point are
    /// folded back into whatever precedes them.
    fn join_leaf_lists(&mut self) -> EditResult<()> {
        for keys in std::mem::take(&mut self.leaf_lists) {
            let (Some(first), Some(last)) = (keys.first().copied(), keys.last().copied()) else {
                continue;
            };

            let mut last_survivor = last;
            let mut merged_left = false;
            if let Some(previous) = self.tree.previous_sibling(first) {
                if self.mergeable(previous, first) {
                    self.tree.merge_into(previous, first)?;
                    merged_left = true;
                    if first == last {
                        last_survivor = previous;
                    }
                }
            }

            let Some(next) = self.tree.next_sibling(last_survivor) else {
                continue;
            };
            if !self.mergeable(last_survivor, next) {
                continue;
            }
            if self.fresh.contains(&next) {
                self.tree.merge_into(last_survivor, next)?;
            } else if !(merged_left && first == last) {
                let text = self.tree.text_of(last_survivor).to_string();
                self.tree.splice_text(next, 0..0, &text)?;
                self.tree.remove_node(last_survivor)?;
            }
        }
        Ok(())
    }

    fn mergeable(&self, left: NodeKey, right: NodeKey) -> bool {
        self.tree.is_leaf(left)
            && self.tree.is_leaf(right)
            && self
                .tree
                .identity(left)
                .mergeable_with(self.tree.identity(right))
    }

    fn fresh_id(&mut self) -> String {
        loop {
            let id = self.ids.new_id();
            if self.tree.get(&id).is_none() {
                return id;
            }
        }
    }

    fn touch(&mut self, key: NodeKey) {
        if self.tree.depth(key) < self.tree.depth(self.top) {
            self.top = key;
        }
    }
}
