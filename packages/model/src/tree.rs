//! # Document Tree
//!
//! Arena-backed document model. Nodes live in a slot vector and are addressed
//! by [`NodeKey`]; parent links are stored as keys so splitting, joining and
//! removing nodes is index rewiring rather than pointer surgery.
//!
//! ## Design
//!
//! - Sizes are stored on every slot and updated eagerly: any change to a
//!   node's text or children propagates the size delta up the parent chain
//!   before the mutating call returns, so a stale size is never observable.
//! - Stable string ids are indexed so derived trees can locate a node by id.
//! - Low-level primitives (`attach`, `detach`, `move_children`, splits) may
//!   leave a branch momentarily empty. The mutation engine composes them and
//!   restores the non-empty invariant before handing control back.

use crate::error::{ModelError, ModelResult};
use crate::node::{Identity, Node, NodeKind};
use std::collections::{HashMap, HashSet};
use std::ops::Range;

/// Handle to a node slot in a [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(usize);

impl NodeKey {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Slot {
    identity: Identity,
    text: String,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
    size: usize,
}

/// One step of a resolved position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathEntry {
    pub node: NodeKey,
    /// Offset local to `node`. For branches 0 is the open boundary and
    /// `size - 1` the close boundary.
    pub offset: usize,
}

/// Resolved address of an offset: the path from the root to the deepest node
/// containing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
    pub path: Vec<PathEntry>,
}

impl Position {
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn deepest(&self) -> PathEntry {
        // Resolution always yields at least the root entry
        self.path[self.path.len() - 1]
    }

    pub fn node_at(&self, depth: usize) -> Option<NodeKey> {
        self.path.get(depth).map(|entry| entry.node)
    }
}

#[derive(Debug, Clone)]
pub struct Tree {
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    root: NodeKey,
    index: HashMap<String, NodeKey>,
}

impl Tree {
    /// Build a tree from an owned root node
    pub fn new(root: Node) -> ModelResult<Self> {
        if root.kind() != NodeKind::Root {
            return Err(ModelError::UnknownComponent(format!(
                "{} is not a root component",
                root.identity.component
            )));
        }
        check_shape(&root)?;

        let mut tree = Self {
            slots: Vec::with_capacity(root.count()),
            free: Vec::new(),
            root: NodeKey(0),
            index: HashMap::new(),
        };
        let mut seen = HashSet::new();
        tree.check_ids(&root, &mut seen)?;
        tree.root = tree.alloc(root, None);
        Ok(tree)
    }

    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Size of the whole document in offset units
    pub fn size(&self) -> usize {
        self.slot(self.root).size
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        matches!(self.slots.get(key.0), Some(Some(_)))
    }

    pub fn node_size(&self, key: NodeKey) -> usize {
        self.slot(key).size
    }

    pub fn identity(&self, key: NodeKey) -> &Identity {
        &self.slot(key).identity
    }

    pub fn id(&self, key: NodeKey) -> &str {
        &self.slot(key).identity.id
    }

    pub fn kind(&self, key: NodeKey) -> NodeKind {
        self.slot(key).identity.kind
    }

    pub fn is_leaf(&self, key: NodeKey) -> bool {
        self.kind(key).is_leaf()
    }

    pub fn text_of(&self, key: NodeKey) -> &str {
        &self.slot(key).text
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        &self.slot(key).children
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.slot(key).parent
    }

    /// Look a node up by its stable id
    pub fn get(&self, id: &str) -> Option<NodeKey> {
        self.index.get(id).copied()
    }

    pub fn key_of(&self, id: &str) -> ModelResult<NodeKey> {
        self.get(id)
            .ok_or_else(|| ModelError::UnknownNode(id.to_string()))
    }

    /// Root has depth 1
    pub fn depth(&self, key: NodeKey) -> usize {
        let mut depth = 1;
        let mut current = key;
        while let Some(parent) = self.parent(current) {
            depth += 1;
            current = parent;
        }
        depth
    }

    pub fn index_in_parent(&self, key: NodeKey) -> Option<usize> {
        let parent = self.parent(key)?;
        self.children(parent).iter().position(|child| *child == key)
    }

    pub fn next_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.parent(key)?;
        let index = self.index_in_parent(key)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.parent(key)?;
        let index = self.index_in_parent(key)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    /// Ancestors from the root down to and including `key`
    pub fn ancestry(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut chain = vec![key];
        let mut current = key;
        while let Some(parent) = self.parent(current) {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// Absolute offset of the first unit a node occupies
    pub fn offset_of(&self, key: NodeKey) -> usize {
        let mut offset = 0;
        let mut current = key;
        while let Some(parent) = self.parent(current) {
            offset += 1;
            for sibling in self.children(parent) {
                if *sibling == current {
                    break;
                }
                offset += self.node_size(*sibling);
            }
            current = parent;
        }
        offset
    }

    /// Offset of child `index` inside `parent`, local to the parent
    pub fn child_offset(&self, parent: NodeKey, index: usize) -> usize {
        1 + self.children(parent)[..index]
            .iter()
            .map(|child| self.node_size(*child))
            .sum::<usize>()
    }

    /// Resolve an offset to the path of nodes containing it
    pub fn resolve_position(&self, offset: usize) -> ModelResult<Position> {
        let size = self.size();
        if offset >= size {
            return Err(ModelError::out_of_range(offset, size));
        }

        let mut path = Vec::new();
        let mut node = self.root;
        let mut local = offset;

        loop {
            path.push(PathEntry {
                node,
                offset: local,
            });

            if self.is_leaf(node) || local == 0 {
                break;
            }

            let mut cursor = 1;
            let mut next = None;
            for child in self.children(node) {
                let child_size = self.node_size(*child);
                if local < cursor + child_size {
                    next = Some((*child, local - cursor));
                    break;
                }
                cursor += child_size;
            }

            match next {
                Some((child, child_local)) => {
                    node = child;
                    local = child_local;
                }
                // Close boundary
                None => break,
            }
        }

        Ok(Position { offset, path })
    }

    /// Node-local splice: replace `range` of `parent`'s children with `nodes`
    /// and return the detached children
    pub fn replace(
        &mut self,
        parent: NodeKey,
        range: Range<usize>,
        nodes: Vec<Node>,
    ) -> ModelResult<Vec<Node>> {
        if self.is_leaf(parent) {
            return Err(ModelError::NotABranch(self.id(parent).to_string()));
        }
        let len = self.children(parent).len();
        if range.start > range.end || range.end > len {
            return Err(ModelError::out_of_range(range.end, len));
        }
        if len - range.len() + nodes.len() == 0 {
            return Err(ModelError::EmptyBranch(self.id(parent).to_string()));
        }
        for node in &nodes {
            check_shape(node)?;
        }
        let mut seen = HashSet::new();
        let removed_ids: HashSet<String> = self.children(parent)[range.clone()]
            .iter()
            .flat_map(|child| self.subtree_ids(*child))
            .collect();
        for node in &nodes {
            self.check_ids_except(node, &mut seen, &removed_ids)?;
        }

        let start = range.start;
        let removed = self.detach(parent, range);
        self.attach(parent, start, nodes)?;
        Ok(removed)
    }

    /// Copy a subtree out as an owned node
    pub fn to_node(&self, key: NodeKey) -> Node {
        let slot = self.slot(key);
        Node {
            identity: slot.identity.clone(),
            text: slot.text.clone(),
            children: slot.children.iter().map(|child| self.to_node(*child)).collect(),
        }
    }

    pub fn to_document(&self) -> Node {
        self.to_node(self.root)
    }

    /// Concatenated leaf text in document order
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(self.root, &mut out);
        out
    }

    fn collect_text(&self, key: NodeKey, out: &mut String) {
        let slot = self.slot(key);
        if slot.identity.kind.is_leaf() {
            out.push_str(&slot.text);
        } else {
            for child in &slot.children {
                self.collect_text(*child, out);
            }
        }
    }

    /// Leaves of a subtree in document order
    pub fn leaves(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        self.collect_leaves(key, &mut out);
        out
    }

    fn collect_leaves(&self, key: NodeKey, out: &mut Vec<NodeKey>) {
        if self.is_leaf(key) {
            out.push(key);
        } else {
            for child in self.children(key) {
                self.collect_leaves(*child, out);
            }
        }
    }

    // ---------------------------------------------------------------
    // Mutation primitives
    // ---------------------------------------------------------------

    /// Insert owned nodes as children of `parent` starting at `index`
    pub fn attach(
        &mut self,
        parent: NodeKey,
        index: usize,
        nodes: Vec<Node>,
    ) -> ModelResult<Vec<NodeKey>> {
        if self.is_leaf(parent) {
            return Err(ModelError::NotABranch(self.id(parent).to_string()));
        }
        let mut seen = HashSet::new();
        for node in &nodes {
            self.check_ids(node, &mut seen)?;
        }

        let mut keys = Vec::with_capacity(nodes.len());
        let mut added = 0;
        for node in nodes {
            let key = self.alloc(node, Some(parent));
            added += self.node_size(key);
            keys.push(key);
        }
        let slot = self.slot_mut(parent);
        let at = index.min(slot.children.len());
        slot.children.splice(at..at, keys.iter().copied());
        self.adjust(parent, added as isize);
        Ok(keys)
    }

    /// Detach a range of children, returning them as owned nodes
    pub fn detach(&mut self, parent: NodeKey, range: Range<usize>) -> Vec<Node> {
        let keys: Vec<NodeKey> = self.slot_mut(parent).children.drain(range).collect();
        let removed: usize = keys.iter().map(|key| self.node_size(*key)).sum();
        self.adjust(parent, -(removed as isize));
        keys.into_iter().map(|key| self.release(key)).collect()
    }

    /// Detach a single node from its parent
    pub fn remove_node(&mut self, key: NodeKey) -> ModelResult<Node> {
        let parent = self
            .parent(key)
            .ok_or_else(|| ModelError::EmptyBranch(self.id(key).to_string()))?;
        let index = self
            .index_in_parent(key)
            .ok_or_else(|| ModelError::UnknownNode(self.id(key).to_string()))?;
        Ok(self.detach(parent, index..index + 1).remove(0))
    }

    /// Move a range of children (keeping their keys and ids) to another
    /// branch at `index`
    pub fn move_children(
        &mut self,
        from: NodeKey,
        range: Range<usize>,
        to: NodeKey,
        index: usize,
    ) -> ModelResult<()> {
        if self.is_leaf(to) {
            return Err(ModelError::NotABranch(self.id(to).to_string()));
        }
        let keys: Vec<NodeKey> = self.slot_mut(from).children.drain(range).collect();
        let moved: usize = keys.iter().map(|key| self.node_size(*key)).sum();
        self.adjust(from, -(moved as isize));

        for key in &keys {
            self.slot_mut(*key).parent = Some(to);
        }
        let slot = self.slot_mut(to);
        let at = index.min(slot.children.len());
        slot.children.splice(at..at, keys);
        self.adjust(to, moved as isize);
        Ok(())
    }

    /// Replace a char range of a leaf's text, returning the removed text
    pub fn splice_text(
        &mut self,
        leaf: NodeKey,
        range: Range<usize>,
        insert: &str,
    ) -> ModelResult<String> {
        if !self.is_leaf(leaf) {
            return Err(ModelError::NotALeaf(self.id(leaf).to_string()));
        }
        let len = self.node_size(leaf);
        if range.start > range.end || range.end > len {
            return Err(ModelError::out_of_range(range.end, len));
        }

        let slot = self.slot_mut(leaf);
        let start = byte_index(&slot.text, range.start);
        let end = byte_index(&slot.text, range.end);
        let removed: String = slot.text[start..end].to_string();
        slot.text.replace_range(start..end, insert);

        let delta = insert.chars().count() as isize - range.len() as isize;
        self.adjust(leaf, delta);
        Ok(removed)
    }

    /// Split a leaf at a char offset. The left half keeps the original id;
    /// the right half is inserted after it with `new_id`.
    pub fn split_leaf(&mut self, leaf: NodeKey, at: usize, new_id: String) -> ModelResult<NodeKey> {
        if self.index.contains_key(&new_id) {
            return Err(ModelError::DuplicateId(new_id));
        }
        let len = self.node_size(leaf);
        let tail = self.splice_text(leaf, at..len, "")?;
        let parent = self
            .parent(leaf)
            .ok_or_else(|| ModelError::NotABranch(self.id(leaf).to_string()))?;
        let index = self.index_in_parent(leaf).unwrap_or(0);

        let mut identity = self.identity(leaf).clone();
        identity.id = new_id;
        let right = Node {
            identity,
            text: tail,
            children: Vec::new(),
        };
        let keys = self.attach(parent, index + 1, vec![right])?;
        Ok(keys[0])
    }

    /// Split a branch before child `at`. Children `at..` move to a new
    /// sibling inserted after the branch with `new_id`.
    pub fn split_branch(
        &mut self,
        branch: NodeKey,
        at: usize,
        new_id: String,
    ) -> ModelResult<NodeKey> {
        if self.index.contains_key(&new_id) {
            return Err(ModelError::DuplicateId(new_id));
        }
        let parent = self
            .parent(branch)
            .ok_or_else(|| ModelError::NotABranch(self.id(branch).to_string()))?;
        let index = self.index_in_parent(branch).unwrap_or(0);

        let mut identity = self.identity(branch).clone();
        identity.id = new_id;
        let right = self.attach_shell(parent, index + 1, identity)?;

        let len = self.children(branch).len();
        self.move_children(branch, at..len, right, 0)?;
        Ok(right)
    }

    /// Insert a content-less node. Branches created this way are empty
    /// until the caller moves children into them.
    pub fn attach_shell(
        &mut self,
        parent: NodeKey,
        index: usize,
        identity: Identity,
    ) -> ModelResult<NodeKey> {
        let keys = self.attach(parent, index, vec![Node::shell(identity)])?;
        Ok(keys[0])
    }

    /// Replace a node's identity, keeping its content
    pub fn set_identity(&mut self, key: NodeKey, identity: Identity) -> ModelResult<()> {
        if identity.kind != self.kind(key) {
            return Err(ModelError::UnknownComponent(identity.component));
        }
        let old_id = self.id(key).to_string();
        if identity.id != old_id {
            if self.index.contains_key(&identity.id) {
                return Err(ModelError::DuplicateId(identity.id));
            }
            self.index.remove(&old_id);
            self.index.insert(identity.id.clone(), key);
        }
        self.slot_mut(key).identity = identity;
        Ok(())
    }

    /// Append the content of `right` to `left` and remove `right`.
    /// Both nodes must share a kind.
    pub fn merge_into(&mut self, left: NodeKey, right: NodeKey) -> ModelResult<()> {
        if self.is_leaf(left) {
            let text = self.text_of(right).to_string();
            let end = self.node_size(left);
            self.splice_text(left, end..end, &text)?;
        } else {
            let count = self.children(right).len();
            let end = self.children(left).len();
            self.move_children(right, 0..count, left, end)?;
        }
        self.remove_node(right)?;
        Ok(())
    }

    /// Check size and non-empty invariants over the whole tree
    pub fn check_invariants(&self) -> ModelResult<()> {
        self.check_node(self.root).map(|_| ())
    }

    fn check_node(&self, key: NodeKey) -> ModelResult<usize> {
        let slot = self.slot(key);
        let expected = if slot.identity.kind.is_leaf() {
            slot.text.chars().count()
        } else {
            if slot.children.is_empty() {
                return Err(ModelError::EmptyBranch(slot.identity.id.clone()));
            }
            let mut sum = 2;
            for child in &slot.children {
                if self.parent(*child) != Some(key) {
                    return Err(ModelError::UnknownNode(self.id(*child).to_string()));
                }
                sum += self.check_node(*child)?;
            }
            sum
        };
        if expected != slot.size {
            return Err(ModelError::out_of_range(slot.size, expected));
        }
        Ok(expected)
    }

    // ---------------------------------------------------------------
    // Arena bookkeeping
    // ---------------------------------------------------------------

    fn slot(&self, key: NodeKey) -> &Slot {
        match self.slots.get(key.0) {
            Some(Some(slot)) => slot,
            _ => panic!("stale node key {:?}", key),
        }
    }

    fn slot_mut(&mut self, key: NodeKey) -> &mut Slot {
        match self.slots.get_mut(key.0) {
            Some(Some(slot)) => slot,
            _ => panic!("stale node key {:?}", key),
        }
    }

    fn adjust(&mut self, key: NodeKey, delta: isize) {
        if delta == 0 {
            return;
        }
        let mut current = Some(key);
        while let Some(node) = current {
            let slot = self.slot_mut(node);
            slot.size = (slot.size as isize + delta) as usize;
            current = slot.parent;
        }
    }

    fn alloc(&mut self, node: Node, parent: Option<NodeKey>) -> NodeKey {
        let Node {
            identity,
            text,
            children,
        } = node;

        let size = if identity.kind.is_leaf() {
            text.chars().count()
        } else {
            2
        };
        let slot = Slot {
            identity,
            text,
            parent,
            children: Vec::with_capacity(children.len()),
            size,
        };

        let key = match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(slot);
                NodeKey(index)
            }
            None => {
                self.slots.push(Some(slot));
                NodeKey(self.slots.len() - 1)
            }
        };
        let id = self.slot(key).identity.id.clone();
        self.index.insert(id, key);

        let mut child_keys = Vec::with_capacity(children.len());
        let mut child_size = 0;
        for child in children {
            let child_key = self.alloc(child, Some(key));
            child_size += self.node_size(child_key);
            child_keys.push(child_key);
        }
        let slot = self.slot_mut(key);
        slot.children = child_keys;
        slot.size += child_size;
        key
    }

    fn release(&mut self, key: NodeKey) -> Node {
        let slot = match self.slots.get_mut(key.0).and_then(Option::take) {
            Some(slot) => slot,
            None => panic!("stale node key {:?}", key),
        };
        self.free.push(key.0);
        if self.index.get(&slot.identity.id) == Some(&key) {
            self.index.remove(&slot.identity.id);
        }
        let children = slot
            .children
            .into_iter()
            .map(|child| self.release(child))
            .collect();
        Node {
            identity: slot.identity,
            text: slot.text,
            children,
        }
    }

    fn subtree_ids(&self, key: NodeKey) -> Vec<String> {
        let mut ids = vec![self.id(key).to_string()];
        for child in self.children(key) {
            ids.extend(self.subtree_ids(*child));
        }
        ids
    }

    fn check_ids(
        &self,
        node: &Node,
        seen: &mut HashSet<String>,
    ) -> ModelResult<()> {
        self.check_ids_except(node, seen, &HashSet::new())
    }

    fn check_ids_except(
        &self,
        node: &Node,
        seen: &mut HashSet<String>,
        replaced: &HashSet<String>,
    ) -> ModelResult<()> {
        let id = node.id();
        if (self.index.contains_key(id) && !replaced.contains(id)) || !seen.insert(id.to_string()) {
            return Err(ModelError::DuplicateId(id.to_string()));
        }
        for child in &node.children {
            self.check_ids_except(child, seen, replaced)?;
        }
        Ok(())
    }
}

/// Equality over the serialized form: same identities, text and structure
impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        self.to_document() == other.to_document()
    }
}

fn check_shape(node: &Node) -> ModelResult<()> {
    match node.kind() {
        NodeKind::Leaf => {
            if !node.children.is_empty() {
                return Err(ModelError::NotABranch(node.id().to_string()));
            }
        }
        NodeKind::Branch | NodeKind::Root => {
            if !node.text.is_empty() {
                return Err(ModelError::NotALeaf(node.id().to_string()));
            }
            if node.children.is_empty() {
                return Err(ModelError::EmptyBranch(node.id().to_string()));
            }
            for child in &node.children {
                if child.kind() == NodeKind::Root {
                    return Err(ModelError::UnknownComponent(child.identity.component.clone()));
                }
                check_shape(child)?;
            }
        }
    }
    Ok(())
}

fn byte_index(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}
