//! # Replace Changes
//!
//! The one primitive mutation: remove the offsets `from..to`, then insert a
//! sequence of fragments at `from`. Every application returns the change
//! that undoes it, the step map that relocates offsets across it, and the
//! id of the smallest subtree holding every modification.
//!
//! ## Design
//!
//! - Ranges must be balanced: the gap depth at `from` equals the gap depth
//!   at `to`. Removal closes the left chain of branches, opens the right
//!   chain, and merges each right node into its left partner.
//! - Removed content becomes fragments relative to the depth at `from`.
//!   Nodes whose start was removed are recorded as open shells so the
//!   reverse change can give their identity back.
//! - Inserted fragments are placed one level at a time, splitting the node
//!   at the insertion point when a list needs to sit higher up.
//! - Nothing is left half-applied: on failure the tree is restored from a
//!   snapshot taken after validation.

mod inserter;
mod remover;

use crate::errors::{EditError, EditResult};
use folio_model::{is_well_nested, Fragment, IdGenerator, NodeKey, Tree};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

pub(crate) use inserter::Inserter;
pub(crate) use remover::Removal;

/// Which leaf receives leading text when the insertion point sits on a
/// boundary between two leaves
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Bias {
    #[default]
    Left,
    Right,
}

/// Side an offset sticks to when the range around it is replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceChange {
    pub from: usize,
    pub to: usize,
    #[serde(default)]
    pub fragments: Vec<Fragment>,
    /// Join inserted leaves with matching neighbours
    #[serde(default = "default_join")]
    pub join: bool,
    #[serde(default)]
    pub bias: Bias,
}

fn default_join() -> bool {
    true
}

/// How one applied change moved offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepMap {
    pub from: usize,
    pub to: usize,
    pub inserted: usize,
}

impl StepMap {
    pub fn map(&self, offset: usize, assoc: Assoc) -> usize {
        if offset < self.from {
            offset
        } else if offset > self.to || (offset == self.to && self.to > self.from) {
            offset - (self.to - self.from) + self.inserted
        } else {
            match assoc {
                Assoc::Left => self.from,
                Assoc::Right => self.from + self.inserted,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeResult {
    pub reverse: ReplaceChange,
    pub map: StepMap,
    /// Root of the smallest subtree holding every modification
    pub updated: String,
}

impl ReplaceChange {
    pub fn new(from: usize, to: usize, fragments: Vec<Fragment>) -> Self {
        Self {
            from,
            to,
            fragments,
            join: true,
            bias: Bias::Left,
        }
    }

    pub fn insert(at: usize, fragments: Vec<Fragment>) -> Self {
        Self::new(at, at, fragments)
    }

    pub fn delete(from: usize, to: usize) -> Self {
        Self::new(from, to, Vec::new())
    }

    pub fn text(from: usize, to: usize, text: impl Into<String>) -> Self {
        Self::new(from, to, vec![Fragment::text(text)])
    }

    pub fn without_join(mut self) -> Self {
        self.join = false;
        self
    }

    pub fn with_bias(mut self, bias: Bias) -> Self {
        self.bias = bias;
        self
    }

    /// Apply to a tree, returning the reverse change
    #[instrument(skip(self, tree, ids), fields(from = self.from, to = self.to))]
    pub fn apply(&self, tree: &mut Tree, ids: &mut IdGenerator) -> EditResult<ChangeResult> {
        let base = self.validate(tree)?;
        let snapshot = tree.clone();
        match self.apply_validated(tree, ids, base) {
            Ok(result) => Ok(result),
            Err(error) => {
                debug!(%error, "[Change] Restoring snapshot");
                *tree = snapshot;
                Err(error)
            }
        }
    }

    /// Check range, balance and fragment depths. Returns the gap depth at
    /// `from`.
    fn validate(&self, tree: &Tree) -> EditResult<usize> {
        let size = tree.size();
        if self.from > self.to || self.from == 0 {
            return Err(EditError::invalid_range(self.from, self.to));
        }
        if self.to >= size {
            return Err(folio_model::ModelError::out_of_range(self.to, size).into());
        }

        let base = gap_depth(tree, self.from)?;
        if gap_depth(tree, self.to)? != base {
            return Err(EditError::invalid_range(self.from, self.to));
        }

        if !is_well_nested(&self.fragments) {
            return Err(EditError::MalformedFragments);
        }
        if let Some(depth) = self
            .fragments
            .iter()
            .map(Fragment::depth)
            .find(|depth| *depth > base)
        {
            return Err(EditError::FragmentDepthMismatch { depth, max: base });
        }
        Ok(base)
    }

    fn apply_validated(
        &self,
        tree: &mut Tree,
        ids: &mut IdGenerator,
        base: usize,
    ) -> EditResult<ChangeResult> {
        let removal = Removal::remove(tree, self.from, self.to, base)?;
        let after_removal = tree.size();

        let mut updated = removal.container;
        if !self.fragments.is_empty() {
            let top = Inserter::new(tree, ids, self.from)?.insert(
                &self.fragments,
                self.bias,
                self.join,
            )?;
            if !tree.contains(updated) || tree.depth(top) < tree.depth(updated) {
                updated = top;
            }
        }
        let inserted = tree.size() - after_removal;

        let bias = if removal.starts_leaf {
            Bias::Right
        } else {
            Bias::Left
        };
        let reverse = ReplaceChange {
            from: self.from,
            to: self.from + inserted,
            fragments: removal.fragments,
            join: false,
            bias,
        };
        debug!(
            removed = self.to - self.from,
            inserted,
            updated = tree.id(updated),
            "[Change] Applied"
        );
        Ok(ChangeResult {
            reverse,
            map: StepMap {
                from: self.from,
                to: self.to,
                inserted,
            },
            updated: tree.id(updated).to_string(),
        })
    }
}

/// Number of branches enclosing the gap just before `offset`
pub(crate) fn gap_depth(tree: &Tree, offset: usize) -> EditResult<usize> {
    let position = tree.resolve_position(offset)?;
    let deepest = position.deepest();
    let closing = !tree.is_leaf(deepest.node)
        && deepest.offset > 0
        && deepest.offset + 1 == tree.node_size(deepest.node);
    Ok(position.depth() - 1 + usize::from(closing))
}

/// Branch directly enclosing the gap before `offset`
pub(crate) fn gap_container(tree: &Tree, offset: usize) -> EditResult<NodeKey> {
    let position = tree.resolve_position(offset)?;
    let deepest = position.deepest();
    let node = deepest.node;
    if !tree.is_leaf(node) && deepest.offset > 0 {
        return Ok(node);
    }
    Ok(tree.parent(node).unwrap_or(node))
}

/// Deepest node that is an ancestor of both keys
pub(crate) fn common_ancestor(tree: &Tree, a: NodeKey, b: NodeKey) -> NodeKey {
    let left = tree.ancestry(a);
    let right = tree.ancestry(b);
    left.iter()
        .zip(right.iter())
        .take_while(|(x, y)| x == y)
        .last()
        .map(|(x, _)| *x)
        .unwrap_or_else(|| tree.root())
}
