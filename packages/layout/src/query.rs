//! # Layout Queries
//!
//! Coordinate ⇄ offset lookups for the presentation surface. Pages are
//! stacked vertically, each occupying a full sheet of `page_height`; lines
//! start at the page's left padding. Offsets are render-space offsets.

use crate::error::{LayoutError, LayoutResult};
use crate::tree::{LayoutKey, LayoutLevel, LayoutTree};
use folio_render::RenderTree;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A line with its absolute position and the offset of its first unit
#[derive(Debug, Clone, Copy, PartialEq)]
struct PlacedLine {
    key: LayoutKey,
    x: f32,
    y: f32,
    offset: usize,
}

impl LayoutTree {
    pub fn page_count(&self) -> usize {
        self.children(self.root()).len()
    }

    pub fn line_count(&self) -> usize {
        self.lines().len()
    }

    /// Lines in document order
    pub fn lines(&self) -> Vec<LayoutKey> {
        self.placed_lines().into_iter().map(|line| line.key).collect()
    }

    /// Text of each line, line breaks shown as `↵`
    pub fn line_texts(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .map(|line| {
                let mut text = String::new();
                for inline in self.children(line) {
                    for atomic in self.children(*inline) {
                        let node = self.node(*atomic);
                        if node.line_break {
                            text.push('↵');
                        } else {
                            text.push_str(&node.text);
                        }
                    }
                }
                text
            })
            .collect()
    }

    /// Total render units covered by the layout
    pub fn size(&self) -> usize {
        self.node(self.root()).size
    }

    fn placed_lines(&self) -> Vec<PlacedLine> {
        let mut placed = Vec::new();
        let mut offset = 0;
        for (index, page) in self.children(self.root()).iter().enumerate() {
            let padding = self.node(*page).padding;
            let mut y = index as f32 * self.options.page_height + padding.top;
            for block in self.children(*page) {
                for line in self.children(*block) {
                    placed.push(PlacedLine {
                        key: *line,
                        x: padding.left,
                        y,
                        offset,
                    });
                    y += self.node(*line).height;
                    offset += self.node(*line).size;
                }
            }
        }
        placed
    }

    /// Box of the unit at `offset`. Line breaks have zero width.
    pub fn bounding_box(&self, offset: usize) -> LayoutResult<Rect> {
        let size = self.size();
        if offset >= size {
            return Err(LayoutError::OutOfRange { offset, size });
        }

        for line in self.placed_lines() {
            let line_size = self.node(line.key).size;
            if offset >= line.offset + line_size {
                continue;
            }
            let height = self.node(line.key).height;
            let mut x = line.x;
            let mut start = line.offset;
            for atomic in self.atomics(line.key) {
                let node = self.node(atomic);
                if offset < start + node.size {
                    let local = offset - start;
                    let prefix: String = node.text.chars().take(local).collect();
                    let unit: String = node.text.chars().skip(local).take(1).collect();
                    return Ok(Rect {
                        x: x + self.metrics.measure(&prefix, &node.style).width,
                        y: line.y,
                        width: self.metrics.measure(&unit, &node.style).width,
                        height,
                    });
                }
                x += node.width;
                start += node.size;
            }
        }
        Err(LayoutError::OutOfRange { offset, size })
    }

    /// Render offset nearest to a point. Points outside the laid out area
    /// clamp to the closest line.
    pub fn offset_at_point(&self, x: f32, y: f32) -> usize {
        let lines = self.placed_lines();
        let Some(last) = lines.last() else {
            return 0;
        };
        let line = lines
            .iter()
            .find(|line| y < line.y + self.node(line.key).height)
            .unwrap_or(last);

        let mut start = line.offset;
        let mut left = line.x;
        let atomics = self.atomics(line.key);
        for atomic in &atomics {
            let node = self.node(*atomic);
            if node.line_break {
                return start;
            }
            if x < left + node.width {
                let mut boundary = left;
                for (index, ch) in node.text.chars().enumerate() {
                    let advance = self.metrics.measure(&ch.to_string(), &node.style).width;
                    if x < boundary + advance / 2.0 {
                        return start + index;
                    }
                    boundary += advance;
                }
                return start + node.size;
            }
            left += node.width;
            start += node.size;
        }
        start.min(self.size().saturating_sub(1))
    }

    /// Caret box for a model offset
    pub fn caret_rect(&self, render: &RenderTree, model_offset: usize) -> LayoutResult<Rect> {
        let offset = render.to_render_offset(model_offset)?;
        let rect = self.bounding_box(offset)?;
        Ok(Rect { width: 0.0, ..rect })
    }

    fn atomics(&self, line: LayoutKey) -> Vec<LayoutKey> {
        debug_assert_eq!(self.node(line).level, LayoutLevel::Line);
        self.children(line)
            .iter()
            .flat_map(|inline| self.children(*inline).iter().copied())
            .collect()
    }
}
