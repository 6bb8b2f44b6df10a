//! # Building Layout From Render Nodes
//!
//! Each render block becomes one Block holding a single pending Line with
//! every inline of the block. Flowing breaks that line (and then the page)
//! to capacity.

use crate::tree::{LayoutKey, LayoutLevel, LayoutNode, LayoutOptions, LayoutTree};
use crate::flow::FlowReport;
use crate::metrics::TextMetrics;
use folio_render::{RenderKind, RenderNode, RenderTree};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Split text into words, each keeping its trailing whitespace
pub fn segment_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut previous_space = false;
    for ch in text.chars() {
        if !ch.is_whitespace() && previous_space && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        previous_space = ch.is_whitespace();
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

impl LayoutTree {
    /// Lay out a whole render tree
    #[instrument(skip(render, metrics))]
    pub fn build(
        render: &RenderTree,
        metrics: Arc<dyn TextMetrics>,
        options: LayoutOptions,
    ) -> (Self, FlowReport) {
        let mut tree = Self::new(metrics, options);
        let page = tree.children(tree.root())[0];
        for (index, block) in render.root().children.iter().enumerate() {
            let key = tree.build_block(block);
            tree.insert(page, index, key);
        }
        tree.refresh_up(page);

        let report = tree.flow_from(tree.root());
        debug!(
            pages = tree.page_count(),
            lines = tree.line_count(),
            "[Layout] Built layout"
        );
        (tree, report)
    }

    /// Build a detached Block for a render block
    pub(crate) fn build_block(&mut self, block: &RenderNode) -> LayoutKey {
        let key = self.alloc(LayoutNode::container(
            LayoutLevel::Block,
            block.id.clone(),
            block.style.clone(),
        ));
        let line = self.alloc(LayoutNode::container(
            LayoutLevel::Line,
            block.id.clone(),
            block.style.clone(),
        ));
        self.insert(key, 0, line);

        let leaves = match block.kind {
            RenderKind::Container => block.leaves(),
            _ => vec![block],
        };
        for leaf in leaves {
            if leaf.kind == RenderKind::Text && leaf.text.is_empty() {
                continue;
            }
            let inline = self.build_inline(leaf);
            let at = self.children(line).len();
            self.insert(line, at, inline);
        }

        self.refresh(line);
        self.refresh(key);
        key
    }

    fn build_inline(&mut self, leaf: &RenderNode) -> LayoutKey {
        let inline = self.alloc(LayoutNode::container(
            LayoutLevel::Inline,
            leaf.id.clone(),
            leaf.style.clone(),
        ));

        let atomics: Vec<LayoutNode> = if leaf.is_line_break() {
            let height = self.metrics.measure("", &leaf.style).height;
            vec![LayoutNode::line_break(&leaf.id, &leaf.style, height)]
        } else {
            segment_words(&leaf.text)
                .into_iter()
                .map(|word| {
                    let measured = self.metrics.measure(&word, &leaf.style);
                    LayoutNode::atomic(&leaf.id, word, &leaf.style, measured)
                })
                .collect()
        };
        for (index, atomic) in atomics.into_iter().enumerate() {
            let key = self.alloc(atomic);
            self.insert(inline, index, key);
        }

        self.refresh(inline);
        inline
    }
}
