//! # Flow
//!
//! Incremental line and page breaking. Lines and pages are the two
//! breakable levels and are flowed by the same procedure: lines fit
//! Inline/Atomic content into a width, pages fit Block/Line content into a
//! height.
//!
//! ## Procedure
//!
//! For a pending container:
//!
//! 1. **Join**: if the first grandchild of the next sibling fits in the
//!    remaining capacity, pull all of the sibling's children in, sew pieces
//!    of one render node back together, and drop the sibling.
//! 2. **Accumulate** whole children until one would overflow.
//! 3. **Split** the overflowing child between its grandchildren. What does
//!    not fit moves to a new pending sibling container.
//! 4. Mark the container flowed, queue the new sibling, and queue the
//!    enclosing page when a line was flowed.
//!
//! A container joins at most once per visit. When a join leaves room and
//! another sibling follows, the container is queued again.
//!
//! Lines are always drained before pages, so a page only ever measures
//! lines that are already broken.

use crate::tree::{FlowState, LayoutKey, LayoutLevel, LayoutNode, LayoutTree};
use std::collections::VecDeque;
use tracing::{debug, instrument, warn};

const EPSILON: f32 = 0.001;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowReport {
    pub lines_flowed: usize,
    pub pages_flowed: usize,
    pub joins: usize,
    pub splits: usize,
}

#[derive(Debug, Default)]
struct FlowQueue {
    lines: VecDeque<LayoutKey>,
    pages: VecDeque<LayoutKey>,
}

impl FlowQueue {
    fn push(&mut self, key: LayoutKey, level: LayoutLevel) {
        match level {
            LayoutLevel::Line => self.lines.push_back(key),
            LayoutLevel::Page => self.pages.push_back(key),
            _ => {}
        }
    }

    fn pop(&mut self) -> Option<(LayoutKey, LayoutLevel)> {
        if let Some(line) = self.lines.pop_front() {
            return Some((line, LayoutLevel::Line));
        }
        self.pages.pop_front().map(|page| (page, LayoutLevel::Page))
    }
}

/// Where a container overflows: grandchild `grandchild` of child `child`
/// is the first that does not fit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Break {
    child: usize,
    grandchild: usize,
}

impl LayoutTree {
    /// Flow every pending line and page under `start`
    #[instrument(skip(self))]
    pub(crate) fn flow_from(&mut self, start: LayoutKey) -> FlowReport {
        let mut queue = FlowQueue::default();
        self.collect_pending(start, &mut queue);

        let mut report = FlowReport::default();
        while let Some((key, level)) = queue.pop() {
            match self.get(key) {
                Some(node) if node.level == level && node.state == FlowState::Pending => {}
                _ => continue,
            }
            self.flow_container(key, &mut queue, &mut report);
        }

        debug!(
            lines = report.lines_flowed,
            pages = report.pages_flowed,
            joins = report.joins,
            splits = report.splits,
            "[Layout] Flow pass complete"
        );
        report
    }

    fn collect_pending(&self, key: LayoutKey, queue: &mut FlowQueue) {
        let node = self.node(key);
        match node.level {
            LayoutLevel::Line | LayoutLevel::Page if node.state == FlowState::Pending => {
                queue.push(key, node.level);
            }
            _ => {}
        }
        if node.level < LayoutLevel::Line {
            for child in node.children() {
                self.collect_pending(*child, queue);
            }
        }
    }

    fn flow_container(&mut self, key: LayoutKey, queue: &mut FlowQueue, report: &mut FlowReport) {
        let level = self.node(key).level;
        let capacity = self.capacity(key);

        let joined = self.try_join(key, capacity);
        if joined {
            report.joins += 1;
        }

        let split = match self.find_break(key, capacity) {
            Some(at) => self.split_container(key, at),
            None => None,
        };
        if let Some(sibling) = split {
            report.splits += 1;
            queue.push(sibling, level);
        }

        self.node_mut(key).state = FlowState::Flowed;
        match level {
            LayoutLevel::Line => report.lines_flowed += 1,
            _ => report.pages_flowed += 1,
        }

        if joined && split.is_none() && self.next_sibling(key).is_some() {
            self.node_mut(key).state = FlowState::Pending;
            queue.push(key, level);
        }

        if level == LayoutLevel::Line {
            if let Some(page) = self.ancestor_at(key, LayoutLevel::Page) {
                self.node_mut(page).state = FlowState::Pending;
                queue.push(page, LayoutLevel::Page);
            }
        }
    }

    fn used(&self, key: LayoutKey) -> f32 {
        self.children(key).iter().map(|child| self.extent(*child)).sum()
    }

    fn first_grandchild(&self, key: LayoutKey) -> Option<LayoutKey> {
        let child = *self.children(key).first()?;
        self.children(child).first().copied()
    }

    fn try_join(&mut self, key: LayoutKey, capacity: f32) -> bool {
        let Some(next) = self.next_sibling(key) else {
            return false;
        };
        let Some(first) = self.first_grandchild(next) else {
            return false;
        };
        if !self.fits(self.used(key), first, capacity) {
            return false;
        }

        let boundary = self.children(key).len();
        let count = self.children(next).len();
        self.move_children(next, 0..count, key, boundary);
        self.remove(next);
        self.sew(key, boundary);
        self.refresh_up(key);
        true
    }

    /// Merge two pieces of one render node meeting at `boundary`
    fn sew(&mut self, key: LayoutKey, boundary: usize) {
        if boundary == 0 {
            return;
        }
        let children = self.children(key);
        let (Some(left), Some(right)) = (children.get(boundary - 1), children.get(boundary)) else {
            return;
        };
        let (left, right) = (*left, *right);
        if self.node(left).render_id != self.node(right).render_id {
            return;
        }

        let count = self.children(right).len();
        let end = self.children(left).len();
        self.move_children(right, 0..count, left, end);
        self.remove(right);
        self.refresh(left);
    }

    /// Zero-extent content, such as a line break, never overflows
    fn fits(&self, used: f32, key: LayoutKey, capacity: f32) -> bool {
        let extent = self.extent(key);
        extent <= EPSILON || used + extent <= capacity + EPSILON
    }

    /// First grandchild that overflows `capacity`. Content wider than the
    /// whole container is placed first on its own line or page.
    fn find_break(&self, key: LayoutKey, capacity: f32) -> Option<Break> {
        let children = self.children(key);
        let mut used = 0.0;

        for (index, child) in children.iter().enumerate() {
            if self.fits(used, *child, capacity) {
                used += self.extent(*child);
                continue;
            }

            for (fitted, grandchild) in self.children(*child).iter().enumerate() {
                let extent = self.extent(*grandchild);
                if !self.fits(used, *grandchild, capacity) {
                    if used > EPSILON {
                        return Some(Break {
                            child: index,
                            grandchild: fitted,
                        });
                    }
                    warn!(
                        render_id = %self.node(*grandchild).render_id,
                        extent,
                        capacity,
                        "[Layout] Content exceeds its container, placing it anyway"
                    );
                }
                used += extent;
            }
        }
        None
    }

    /// Break `key` at `at`, returning the new pending sibling
    fn split_container(&mut self, key: LayoutKey, at: Break) -> Option<LayoutKey> {
        let child = self.children(key)[at.child];
        let grandchildren = self.children(child).len();

        let first_moved = if at.grandchild == 0 {
            at.child
        } else if at.grandchild < grandchildren {
            let right = self.split_piece(child, at.grandchild);
            self.insert(key, at.child + 1, right);
            at.child + 1
        } else {
            at.child + 1
        };

        let len = self.children(key).len();
        if first_moved >= len {
            self.refresh_up(key);
            return None;
        }

        let parent = self.parent(key)?;
        let index = self.index_in_parent(key)?;
        let node = self.node(key);
        let mut sibling = LayoutNode::container(node.level, node.render_id.clone(), node.style.clone());
        sibling.padding = node.padding;
        let sibling = self.alloc(sibling);
        self.insert(parent, index + 1, sibling);
        self.move_children(key, first_moved..len, sibling, 0);

        self.refresh(key);
        self.refresh_up(sibling);
        Some(sibling)
    }

    /// Split a piece between its children, returning a detached right piece
    fn split_piece(&mut self, piece: LayoutKey, at: usize) -> LayoutKey {
        let node = self.node(piece);
        let right = LayoutNode::container(node.level, node.render_id.clone(), node.style.clone());
        let right = self.alloc(right);
        let len = self.children(piece).len();
        self.move_children(piece, at..len, right, 0);
        self.node_mut(right).state = FlowState::Flowed;
        self.refresh(piece);
        self.refresh(right);
        right
    }
}
