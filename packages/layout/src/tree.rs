//! # Layout Tree
//!
//! Arena of layout nodes in a fixed six-level hierarchy:
//!
//! ```text
//! Doc → Page → Block → Line → Inline → Atomic
//! ```
//!
//! Unlike model and render nodes, layout nodes are split and merged in place
//! while flowing. A block or inline that has been broken across lines or
//! pages is represented by several *pieces* sharing one `render_id`.
//!
//! ## Geometry
//!
//! Atomics are measured once when built. Every other level derives its
//! width, height and size from its children through [`LayoutTree::refresh`],
//! which is called on every node a flow step touches and on its ancestors.

use crate::metrics::{TextMetrics, TextSize};
use folio_model::Style;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutKey(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayoutLevel {
    Doc,
    Page,
    Block,
    Line,
    Inline,
    Atomic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Pending,
    Flowed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Padding {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Padding {
    pub fn uniform(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    /// Line capacity
    pub line_width: f32,
    /// Page sheet height, padding included
    pub page_height: f32,
    pub page_padding: Padding,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            line_width: 700.0,
            page_height: 1000.0,
            page_padding: Padding::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayoutNode {
    pub level: LayoutLevel,
    /// Id of the render node this piece belongs to. Lines carry their
    /// block's id; pages and the doc carry none.
    pub render_id: String,
    pub style: Style,
    /// Atomic text
    pub text: String,
    pub line_break: bool,
    pub width: f32,
    pub height: f32,
    pub padding: Padding,
    /// Render units covered
    pub size: usize,
    pub state: FlowState,
    parent: Option<LayoutKey>,
    children: Vec<LayoutKey>,
}

impl LayoutNode {
    pub fn container(level: LayoutLevel, render_id: impl Into<String>, style: Style) -> Self {
        Self {
            level,
            render_id: render_id.into(),
            style,
            text: String::new(),
            line_break: false,
            width: 0.0,
            height: 0.0,
            padding: Padding::default(),
            size: 0,
            state: FlowState::Pending,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn atomic(render_id: &str, text: String, style: &Style, measured: TextSize) -> Self {
        let size = text.chars().count();
        Self {
            text,
            width: measured.width,
            height: measured.height,
            size,
            state: FlowState::Flowed,
            ..Self::container(LayoutLevel::Atomic, render_id, style.clone())
        }
    }

    /// Zero-width atomic that occupies the block's line-break unit
    pub fn line_break(render_id: &str, style: &Style, height: f32) -> Self {
        Self {
            line_break: true,
            height,
            size: 1,
            state: FlowState::Flowed,
            ..Self::container(LayoutLevel::Atomic, render_id, style.clone())
        }
    }

    pub fn parent(&self) -> Option<LayoutKey> {
        self.parent
    }

    pub fn children(&self) -> &[LayoutKey] {
        &self.children
    }
}

pub struct LayoutTree {
    nodes: Vec<Option<LayoutNode>>,
    free: Vec<usize>,
    root: LayoutKey,
    pub(crate) options: LayoutOptions,
    pub(crate) metrics: Arc<dyn TextMetrics>,
}

impl fmt::Debug for LayoutTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutTree")
            .field("root", &self.root)
            .field("nodes", &(self.nodes.len() - self.free.len()))
            .field("options", &self.options)
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl LayoutTree {
    /// A document with a single empty page
    pub fn new(metrics: Arc<dyn TextMetrics>, options: LayoutOptions) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: LayoutKey(0),
            options,
            metrics,
        };
        tree.root = tree.alloc(LayoutNode::container(LayoutLevel::Doc, "", Style::new()));
        let page = tree.new_page();
        tree.insert(tree.root, 0, page);
        tree
    }

    pub fn root(&self) -> LayoutKey {
        self.root
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    pub fn metrics(&self) -> Arc<dyn TextMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn contains(&self, key: LayoutKey) -> bool {
        matches!(self.nodes.get(key.0), Some(Some(_)))
    }

    pub fn get(&self, key: LayoutKey) -> Option<&LayoutNode> {
        self.nodes.get(key.0).and_then(Option::as_ref)
    }

    pub fn node(&self, key: LayoutKey) -> &LayoutNode {
        match self.get(key) {
            Some(node) => node,
            None => panic!("stale layout key {:?}", key),
        }
    }

    pub(crate) fn node_mut(&mut self, key: LayoutKey) -> &mut LayoutNode {
        match self.nodes.get_mut(key.0).and_then(Option::as_mut) {
            Some(node) => node,
            None => panic!("stale layout key {:?}", key),
        }
    }

    pub fn children(&self, key: LayoutKey) -> &[LayoutKey] {
        &self.node(key).children
    }

    pub fn parent(&self, key: LayoutKey) -> Option<LayoutKey> {
        self.node(key).parent
    }

    pub fn index_in_parent(&self, key: LayoutKey) -> Option<usize> {
        let parent = self.parent(key)?;
        self.children(parent).iter().position(|child| *child == key)
    }

    pub fn next_sibling(&self, key: LayoutKey) -> Option<LayoutKey> {
        let parent = self.parent(key)?;
        let index = self.index_in_parent(key)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Nearest ancestor (or self) at `level`
    pub fn ancestor_at(&self, key: LayoutKey, level: LayoutLevel) -> Option<LayoutKey> {
        let mut current = Some(key);
        while let Some(node) = current {
            if self.node(node).level == level {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    pub(crate) fn new_page(&mut self) -> LayoutKey {
        let mut page = LayoutNode::container(LayoutLevel::Page, "", Style::new());
        page.padding = self.options.page_padding;
        self.alloc(page)
    }

    pub(crate) fn alloc(&mut self, node: LayoutNode) -> LayoutKey {
        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = Some(node);
                LayoutKey(index)
            }
            None => {
                self.nodes.push(Some(node));
                LayoutKey(self.nodes.len() - 1)
            }
        }
    }

    /// Attach a detached node under `parent`
    pub(crate) fn insert(&mut self, parent: LayoutKey, index: usize, child: LayoutKey) {
        self.node_mut(child).parent = Some(parent);
        let children = &mut self.node_mut(parent).children;
        let at = index.min(children.len());
        children.insert(at, child);
    }

    /// Detach and free a subtree
    pub(crate) fn remove(&mut self, key: LayoutKey) {
        if let Some(parent) = self.parent(key) {
            self.node_mut(parent).children.retain(|child| *child != key);
        }
        self.release(key);
    }

    fn release(&mut self, key: LayoutKey) {
        if let Some(node) = self.nodes.get_mut(key.0).and_then(Option::take) {
            self.free.push(key.0);
            for child in node.children {
                self.release(child);
            }
        }
    }

    pub(crate) fn move_children(
        &mut self,
        from: LayoutKey,
        range: Range<usize>,
        to: LayoutKey,
        index: usize,
    ) {
        let moved: Vec<LayoutKey> = self.node_mut(from).children.drain(range).collect();
        for key in &moved {
            self.node_mut(*key).parent = Some(to);
        }
        let children = &mut self.node_mut(to).children;
        let at = index.min(children.len());
        children.splice(at..at, moved);
    }

    /// Recompute a container's size and geometry from its children
    pub(crate) fn refresh(&mut self, key: LayoutKey) {
        let node = self.node(key);
        if node.level == LayoutLevel::Atomic {
            return;
        }
        let mut size = 0;
        let mut sum_width: f32 = 0.0;
        let mut sum_height: f32 = 0.0;
        let mut max_width: f32 = 0.0;
        let mut max_height: f32 = 0.0;
        for child in &node.children {
            let child = self.node(*child);
            size += child.size;
            sum_width += child.width;
            sum_height += child.height;
            max_width = max_width.max(child.width);
            max_height = max_height.max(child.height);
        }
        let (width, height) = match node.level {
            LayoutLevel::Inline | LayoutLevel::Line => (sum_width, max_height),
            _ => (max_width, sum_height),
        };

        let node = self.node_mut(key);
        node.size = size;
        node.width = width;
        node.height = height;
    }

    /// Refresh a node and every ancestor
    pub(crate) fn refresh_up(&mut self, key: LayoutKey) {
        let mut current = Some(key);
        while let Some(node) = current {
            self.refresh(node);
            current = self.parent(node);
        }
    }

    fn path_to_root(&self, key: LayoutKey) -> Vec<LayoutKey> {
        let mut path = vec![key];
        let mut current = key;
        while let Some(parent) = self.parent(current) {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Deepest node that contains every key
    pub fn lowest_common_ancestor(&self, keys: &[LayoutKey]) -> Option<LayoutKey> {
        let (first, rest) = keys.split_first()?;
        let mut common = self.path_to_root(*first);
        for key in rest {
            let path = self.path_to_root(*key);
            let shared = common
                .iter()
                .zip(path.iter())
                .take_while(|(a, b)| a == b)
                .count();
            common.truncate(shared);
        }
        common.last().copied()
    }

    /// Capacity of a breakable container, along its flow axis
    pub(crate) fn capacity(&self, key: LayoutKey) -> f32 {
        let node = self.node(key);
        match node.level {
            LayoutLevel::Line => self.options.line_width,
            _ => self.options.page_height - node.padding.top - node.padding.bottom,
        }
    }

    /// Extent of a node along the axis its parent flows on
    pub(crate) fn extent(&self, key: LayoutKey) -> f32 {
        let node = self.node(key);
        match node.level {
            LayoutLevel::Inline | LayoutLevel::Atomic => node.width,
            _ => node.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::FixedMetrics;

    fn tree() -> LayoutTree {
        LayoutTree::new(Arc::new(FixedMetrics::default()), LayoutOptions::default())
    }

    fn word(tree: &mut LayoutTree, text: &str) -> LayoutKey {
        let style = Style::new();
        let measured = tree.metrics.measure(text, &style);
        tree.alloc(LayoutNode::atomic("t", text.to_string(), &style, measured))
    }

    #[test]
    fn test_new_has_one_page() {
        let tree = tree();
        assert_eq!(tree.children(tree.root()).len(), 1);
    }

    #[test]
    fn test_refresh_sums_along_axis() {
        let mut tree = tree();
        let inline = tree.alloc(LayoutNode::container(LayoutLevel::Inline, "t", Style::new()));
        for text in ["ab ", "cd"] {
            let atomic = word(&mut tree, text);
            let at = tree.children(inline).len();
            tree.insert(inline, at, atomic);
        }
        tree.refresh(inline);

        let node = tree.node(inline);
        assert_eq!(node.size, 5);
        assert_eq!(node.width, 50.0);
        assert_eq!(node.height, 20.0);
    }

    #[test]
    fn test_lowest_common_ancestor() {
        let mut tree = tree();
        let page = tree.children(tree.root())[0];
        let second = tree.new_page();
        tree.insert(tree.root(), 1, second);
        let block = tree.alloc(LayoutNode::container(LayoutLevel::Block, "p", Style::new()));
        tree.insert(page, 0, block);

        assert_eq!(tree.lowest_common_ancestor(&[block, page]), Some(page));
        assert_eq!(tree.lowest_common_ancestor(&[block, second]), Some(tree.root()));
        assert_eq!(tree.lowest_common_ancestor(&[]), None);
    }

    #[test]
    fn test_removed_slots_are_reused() {
        let mut tree = tree();
        let a = word(&mut tree, "a");
        tree.remove(a);
        assert!(!tree.contains(a));
        let b = word(&mut tree, "b");
        assert_eq!(a, b);
    }
}
