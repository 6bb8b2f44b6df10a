//! # Edit History
//!
//! Tracks applied transformations and enables undo/redo.
//!
//! ## Design
//!
//! - Every transformation is recorded with its reverse
//! - Entries recorded in quick succession coalesce into one action, which
//!   is undone and redone as a unit. An action stops coalescing once it is
//!   older than `max_collapse`, once the gap since its last entry exceeds
//!   `collapse_threshold`, or once it has been undone or redone.
//! - `begin_batch`/`end_batch` force everything in between into one action
//! - Undo applies the reverses newest first and steps the offset back
//! - Redo reapplies the original transformations and refreshes the stored
//!   reverses
//! - A failed undo or redo restores the tree it started from and leaves the
//!   offset where it was
//! - Recording truncates any actions past the offset
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = History::new();
//! history.apply(&Transformation::single(change), &mut tree, &mut ids)?;
//! history.undo(&mut tree, &mut ids)?;
//! history.redo(&mut tree, &mut ids)?;
//! ```

use crate::config::EngineConfig;
use crate::errors::EditResult;
use crate::transformation::{Applied, CursorTarget, Transformation};
use folio_model::{IdGenerator, Tree};
use std::cell::Cell;
use std::fmt::Debug;
use std::rc::Rc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Time source for coalescing
pub trait Clock: Debug {
    fn now(&self) -> Duration;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
    }
}

/// Clock moved by hand; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Rc<Cell<Duration>>);

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.0.set(self.0.get() + by);
    }

    pub fn set(&self, now: Duration) {
        self.0.set(now);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.0.get()
    }
}

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub forward: Transformation,
    pub reverse: Transformation,
}

/// Entries undone and redone together
#[derive(Debug, Clone)]
pub struct Action {
    pub entries: Vec<HistoryEntry>,
    pub description: Option<String>,
    started: Duration,
    last: Duration,
    sealed: bool,
}

impl Action {
    fn new(entry: HistoryEntry, now: Duration) -> Self {
        Self {
            description: entry.forward.description.clone(),
            entries: vec![entry],
            started: now,
            last: now,
            sealed: false,
        }
    }
}

/// What an undo or redo touched
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryStep {
    pub updated: Vec<String>,
    pub cursor: Option<CursorTarget>,
}

#[derive(Debug)]
pub struct History {
    actions: Vec<Action>,
    /// Number of actions currently applied
    offset: usize,
    /// Maximum number of actions kept (0 = unlimited)
    max_levels: usize,
    max_collapse: Duration,
    collapse_threshold: Duration,
    clock: Box<dyn Clock>,
    /// Some while a batch is open; true once it holds an action
    batch: Option<bool>,
}

impl History {
    /// Create a history with default limits (100 actions)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            actions: Vec::new(),
            offset: 0,
            max_levels,
            max_collapse: Duration::from_millis(2000),
            collapse_threshold: Duration::from_millis(500),
            clock: Box::new(SystemClock),
            batch: None,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        let mut history = Self::with_max_levels(config.max_history);
        history.max_collapse = config.max_collapse_duration();
        history.collapse_threshold = config.collapse_threshold();
        history
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Apply a transformation and record it
    pub fn apply(
        &mut self,
        transformation: &Transformation,
        tree: &mut Tree,
        ids: &mut IdGenerator,
    ) -> EditResult<Applied> {
        let applied = transformation.apply(tree, ids)?;
        self.record(transformation.clone(), applied.reverse.clone());
        Ok(applied)
    }

    /// Record an applied transformation with its reverse
    pub fn record(&mut self, forward: Transformation, reverse: Transformation) {
        self.actions.truncate(self.offset);
        let now = self.clock.now();
        let entry = HistoryEntry { forward, reverse };

        let coalesce = match (self.batch, self.actions.last()) {
            (Some(started), Some(_)) => started,
            (Some(_), None) => false,
            (None, Some(action)) => {
                !action.sealed
                    && now.saturating_sub(action.started) < self.max_collapse
                    && now.saturating_sub(action.last) < self.collapse_threshold
            }
            (None, None) => false,
        };

        match self.actions.last_mut() {
            Some(action) if coalesce => {
                action.entries.push(entry);
                action.last = now;
            }
            _ => {
                if let Some(previous) = self.actions.last_mut() {
                    previous.sealed = true;
                }
                self.actions.push(Action::new(entry, now));
                if self.batch.is_some() {
                    self.batch = Some(true);
                }
                if self.max_levels > 0 && self.actions.len() > self.max_levels {
                    self.actions.remove(0);
                }
            }
        }
        self.offset = self.actions.len();
        debug!(
            actions = self.actions.len(),
            coalesced = coalesce,
            "[History] Recorded"
        );
    }

    /// Group everything recorded until `end_batch` into one action
    pub fn begin_batch(&mut self) {
        self.seal();
        self.batch = Some(false);
    }

    pub fn end_batch(&mut self) {
        self.batch = None;
        self.seal();
    }

    /// Set description for the newest action
    pub fn set_description(&mut self, description: impl Into<String>) {
        if let Some(action) = self.actions.get_mut(self.offset.wrapping_sub(1)) {
            action.description = Some(description.into());
        }
    }

    /// Undo the most recent action
    pub fn undo(&mut self, tree: &mut Tree, ids: &mut IdGenerator) -> EditResult<Option<HistoryStep>> {
        if self.offset == 0 {
            return Ok(None);
        }
        let action = &mut self.actions[self.offset - 1];
        action.sealed = true;

        let snapshot = tree.clone();
        let mut updated = Vec::new();
        for entry in action.entries.iter().rev() {
            match entry.reverse.apply(tree, ids) {
                Ok(applied) => updated.extend(applied.updated),
                Err(error) => {
                    debug!(%error, "[History] Undo failed, restoring snapshot");
                    *tree = snapshot;
                    return Err(error);
                }
            }
        }
        let cursor = action.entries.first().and_then(|entry| entry.reverse.cursor);
        self.offset -= 1;
        debug!(offset = self.offset, "[History] Undo");
        Ok(Some(HistoryStep { updated, cursor }))
    }

    /// Redo the most recently undone action
    pub fn redo(&mut self, tree: &mut Tree, ids: &mut IdGenerator) -> EditResult<Option<HistoryStep>> {
        if self.offset == self.actions.len() {
            return Ok(None);
        }
        let action = &mut self.actions[self.offset];
        action.sealed = true;

        let snapshot = tree.clone();
        let mut updated = Vec::new();
        let mut reverses = Vec::with_capacity(action.entries.len());
        let mut cursor = None;
        for entry in &action.entries {
            match entry.forward.apply(tree, ids) {
                Ok(applied) => {
                    reverses.push(Transformation {
                        cursor: entry.reverse.cursor,
                        ..applied.reverse
                    });
                    updated.extend(applied.updated);
                    cursor = applied.cursor;
                }
                Err(error) => {
                    debug!(%error, "[History] Redo failed, restoring snapshot");
                    *tree = snapshot;
                    return Err(error);
                }
            }
        }
        for (entry, reverse) in action.entries.iter_mut().zip(reverses) {
            entry.reverse = reverse;
        }
        self.offset += 1;
        debug!(offset = self.offset, "[History] Redo");
        Ok(Some(HistoryStep { updated, cursor }))
    }

    fn seal(&mut self) {
        if let Some(action) = self.actions.last_mut() {
            action.sealed = true;
        }
    }

    pub fn can_undo(&self) -> bool {
        self.offset > 0
    }

    pub fn can_redo(&self) -> bool {
        self.offset < self.actions.len()
    }

    pub fn undo_levels(&self) -> usize {
        self.offset
    }

    pub fn redo_levels(&self) -> usize {
        self.actions.len() - self.offset
    }

    pub fn clear(&mut self) {
        self.actions.clear();
        self.offset = 0;
        self.batch = None;
    }

    /// Get description of the next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.offset
            .checked_sub(1)
            .and_then(|index| self.actions.get(index))
            .and_then(|action| action.description.as_deref())
    }

    /// Get description of the next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.actions
            .get(self.offset)
            .and_then(|action| action.description.as_deref())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
