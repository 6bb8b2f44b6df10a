//! # Transformations
//!
//! An ordered batch of replace changes applied as one unit, with an
//! optional cursor target.
//!
//! ## Mapping
//!
//! - `Threaded` changes are written against the document as it was before
//!   the batch. Each change is relocated through the step maps of the
//!   changes before it, and so is the cursor target.
//! - `Sequential` changes each address the document left by the previous
//!   one. Reverse transformations are always sequential.
//!
//! A failing change rolls back the ones already applied, so the document is
//! left as it was before the batch.

use crate::errors::EditResult;
use crate::mutation::{Assoc, ReplaceChange, StepMap};
use folio_model::{IdGenerator, Tree};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mapping {
    #[default]
    Threaded,
    Sequential,
}

/// Cursor placement requested by a transformation, in model offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorTarget {
    pub anchor: usize,
    pub head: usize,
    /// Keep the remembered horizontal position for vertical moves
    #[serde(default)]
    pub keep_left_lock: bool,
}

impl CursorTarget {
    pub fn collapsed(offset: usize) -> Self {
        Self {
            anchor: offset,
            head: offset,
            keep_left_lock: false,
        }
    }

    fn map(&self, maps: &[StepMap]) -> Self {
        Self {
            anchor: map_through(maps, self.anchor, Assoc::Right),
            head: map_through(maps, self.head, Assoc::Right),
            keep_left_lock: self.keep_left_lock,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transformation {
    pub changes: Vec<ReplaceChange>,
    #[serde(default)]
    pub cursor: Option<CursorTarget>,
    #[serde(default)]
    pub mapping: Mapping,
    #[serde(default)]
    pub description: Option<String>,
}

/// Outcome of applying a transformation
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    /// Undoes the transformation when applied right after it
    pub reverse: Transformation,
    pub maps: Vec<StepMap>,
    /// Updated subtree ids, one per change
    pub updated: Vec<String>,
    /// Cursor target in final model offsets
    pub cursor: Option<CursorTarget>,
}

pub fn map_through(maps: &[StepMap], offset: usize, assoc: Assoc) -> usize {
    maps.iter().fold(offset, |offset, map| map.map(offset, assoc))
}

impl Transformation {
    pub fn new(changes: Vec<ReplaceChange>) -> Self {
        Self {
            changes,
            ..Self::default()
        }
    }

    pub fn single(change: ReplaceChange) -> Self {
        Self::new(vec![change])
    }

    pub fn with_cursor(mut self, cursor: CursorTarget) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn sequential(mut self) -> Self {
        self.mapping = Mapping::Sequential;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    #[instrument(skip_all, fields(changes = self.changes.len()))]
    pub fn apply(&self, tree: &mut Tree, ids: &mut IdGenerator) -> EditResult<Applied> {
        let mut maps: Vec<StepMap> = Vec::with_capacity(self.changes.len());
        let mut reverses = Vec::with_capacity(self.changes.len());
        let mut updated = Vec::with_capacity(self.changes.len());

        for change in &self.changes {
            let change = match self.mapping {
                Mapping::Threaded => thread(change, &maps),
                Mapping::Sequential => change.clone(),
            };
            match change.apply(tree, ids) {
                Ok(result) => {
                    maps.push(result.map);
                    reverses.push(result.reverse);
                    updated.push(result.updated);
                }
                Err(error) => {
                    rollback(tree, ids, &reverses);
                    return Err(error);
                }
            }
        }

        let cursor = self.cursor.map(|target| match self.mapping {
            Mapping::Threaded => target.map(&maps),
            Mapping::Sequential => target,
        });
        reverses.reverse();
        debug!(updated = ?updated, "[Transformation] Applied");

        Ok(Applied {
            reverse: Transformation {
                changes: reverses,
                cursor: None,
                mapping: Mapping::Sequential,
                description: self.description.clone(),
            },
            maps,
            updated,
            cursor,
        })
    }
}

/// Relocate a change written against the original document
fn thread(change: &ReplaceChange, maps: &[StepMap]) -> ReplaceChange {
    let from = map_through(maps, change.from, Assoc::Right);
    let to = if change.to == change.from {
        from
    } else {
        map_through(maps, change.to, Assoc::Left).max(from)
    };
    ReplaceChange {
        from,
        to,
        ..change.clone()
    }
}

fn rollback(tree: &mut Tree, ids: &mut IdGenerator, reverses: &[ReplaceChange]) {
    for reverse in reverses.iter().rev() {
        if let Err(error) = reverse.apply(tree, ids) {
            warn!(%error, "[Transformation] Rollback failed");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EditError;
    use folio_model::{parse_markup, ComponentRegistry};

    fn hello() -> Tree {
        parse_markup(
            r#"<doc id="d"><paragraph id="p"><text id="t">Hello world</text></paragraph></doc>"#,
            &ComponentRegistry::with_defaults(),
        )
        .unwrap()
    }

    #[test]
    fn test_threaded_changes_use_original_offsets() {
        let mut tree = hello();
        let mut ids = IdGenerator::default();
        // Both offsets address "Hello world" as it was
        let transformation = Transformation::new(vec![
            ReplaceChange::text(2, 2, ">> "),
            ReplaceChange::text(8, 8, "big "),
        ])
        .with_cursor(CursorTarget::collapsed(8));

        let applied = transformation.apply(&mut tree, &mut ids).unwrap();
        assert_eq!(tree.text(), ">> Hello big world");
        assert_eq!(applied.cursor, Some(CursorTarget::collapsed(15)));
        assert_eq!(applied.reverse.mapping, Mapping::Sequential);

        applied.reverse.apply(&mut tree, &mut ids).unwrap();
        assert_eq!(tree, hello());
    }

    #[test]
    fn test_sequential_changes_chain() {
        let mut tree = hello();
        let mut ids = IdGenerator::default();
        let transformation = Transformation::new(vec![
            ReplaceChange::text(2, 2, "ab"),
            ReplaceChange::delete(2, 3),
        ])
        .sequential();

        transformation.apply(&mut tree, &mut ids).unwrap();
        assert_eq!(tree.text(), "bHello world");
    }

    #[test]
    fn test_failing_change_rolls_back() {
        let mut tree = hello();
        let mut ids = IdGenerator::default();
        let transformation = Transformation::new(vec![
            ReplaceChange::text(2, 2, "kept? "),
            ReplaceChange::delete(5, 100),
        ]);

        let result = transformation.apply(&mut tree, &mut ids);
        assert!(matches!(result, Err(EditError::Model(_))));
        assert_eq!(tree, hello());
    }
}
