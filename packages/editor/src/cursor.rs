//! Cursor state in render offsets

use serde::{Deserialize, Serialize};

/// Selection between `anchor` and `head`. `left_lock` keeps the horizontal
/// position across vertical moves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub anchor: usize,
    pub head: usize,
    #[serde(default)]
    pub left_lock: Option<f32>,
}

impl Cursor {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self {
            anchor,
            head,
            left_lock: None,
        }
    }

    pub fn collapsed(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    pub fn with_left_lock(mut self, left: f32) -> Self {
        self.left_lock = Some(left);
        self
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    /// Ordered `(start, end)`
    pub fn range(&self) -> (usize, usize) {
        (self.anchor.min(self.head), self.anchor.max(self.head))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_is_ordered() {
        let cursor = Cursor::new(9, 3);
        assert_eq!(cursor.range(), (3, 9));
        assert!(!cursor.is_collapsed());
        assert!(Cursor::collapsed(4).is_collapsed());
    }
}
