//! # Layout Sync
//!
//! Brings the layout up to date with a render tree after a render sync.
//! Only blocks whose render node needs layout are rebuilt: their pieces are
//! removed and a fresh block is put where the first piece was. Flow then
//! starts from the lowest common ancestor of the pages that were touched.

use crate::flow::FlowReport;
use crate::tree::{FlowState, LayoutKey, LayoutLevel, LayoutTree};
use folio_render::RenderTree;
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutUpdate {
    /// Root of the layout subtree that was reflowed
    pub root: LayoutKey,
    pub rebuilt: usize,
    pub removed: usize,
    pub report: FlowReport,
}

impl LayoutTree {
    /// Block pieces in document order, as (render id, key)
    pub fn block_pieces(&self) -> Vec<(String, LayoutKey)> {
        let mut pieces = Vec::new();
        for page in self.children(self.root()) {
            for block in self.children(*page) {
                pieces.push((self.node(*block).render_id.clone(), *block));
            }
        }
        pieces
    }

    #[instrument(skip(self, render))]
    pub fn sync(&mut self, render: &RenderTree) -> LayoutUpdate {
        let root = render.root();
        let mut update = LayoutUpdate {
            root: self.root(),
            rebuilt: 0,
            removed: 0,
            report: FlowReport::default(),
        };
        if !root.needs_layout {
            return update;
        }

        let mut pieces: HashMap<String, Vec<LayoutKey>> = HashMap::new();
        for (id, key) in self.block_pieces() {
            pieces.entry(id).or_default().push(key);
        }
        let live: HashSet<&str> = root.children.iter().map(|block| block.id.as_str()).collect();

        let mut touched = Vec::new();
        for (id, keys) in &pieces {
            if live.contains(id.as_str()) {
                continue;
            }
            for key in keys {
                touched.extend(self.parent(*key));
                self.remove(*key);
                update.removed += 1;
            }
        }

        let mut anchor: Option<LayoutKey> = None;
        for block in &root.children {
            let existing = pieces.get(&block.id);
            if !block.needs_layout {
                if let Some(last) = existing.and_then(|keys| keys.last()) {
                    anchor = Some(*last);
                    continue;
                }
            }

            let (page, index) = match existing.and_then(|keys| keys.first()) {
                Some(first) => self.position_of(*first),
                None => match anchor {
                    Some(anchor) => {
                        let (page, index) = self.position_of(anchor);
                        (page, index + 1)
                    }
                    None => (self.children(self.root())[0], 0),
                },
            };
            for key in existing.into_iter().flatten() {
                touched.extend(self.parent(*key));
                self.remove(*key);
            }

            let fresh = self.build_block(block);
            self.insert(page, index, fresh);
            self.refresh_up(fresh);
            touched.push(page);
            anchor = Some(fresh);
            update.rebuilt += 1;
        }

        touched.extend(self.remove_empty_pages());
        touched.retain(|key| {
            self.get(*key)
                .map(|node| node.level == LayoutLevel::Page)
                .unwrap_or(false)
        });
        touched.sort();
        touched.dedup();
        for page in &touched {
            self.node_mut(*page).state = FlowState::Pending;
            self.refresh(*page);
        }
        self.refresh(self.root());

        let start = self
            .lowest_common_ancestor(&touched)
            .unwrap_or_else(|| self.root());
        update.root = start;
        update.report = self.flow_from(start);

        debug!(
            rebuilt = update.rebuilt,
            removed = update.removed,
            pages = self.page_count(),
            "[Layout] Synced with render tree"
        );
        update
    }

    fn position_of(&self, key: LayoutKey) -> (LayoutKey, usize) {
        match self.parent(key) {
            Some(parent) => (parent, self.index_in_parent(key).unwrap_or(0)),
            None => (self.children(self.root())[0], 0),
        }
    }

    /// Drop pages left without blocks, keeping at least one. Returns the
    /// pages that now border a removed page.
    fn remove_empty_pages(&mut self) -> Vec<LayoutKey> {
        let pages = self.children(self.root()).to_vec();
        let mut neighbours = Vec::new();
        let mut remaining = pages.len();

        for (index, page) in pages.iter().enumerate() {
            if !self.children(*page).is_empty() || remaining == 1 {
                continue;
            }
            let before = pages[..index].iter().rev().find(|key| self.contains(**key));
            neighbours.extend(before.copied());
            self.remove(*page);
            remaining -= 1;
        }
        neighbours
    }
}
