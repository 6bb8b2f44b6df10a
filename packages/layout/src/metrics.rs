//! # Text Metrics
//!
//! Text measurement is injected. The layout engine only ever asks how wide
//! and how tall a run of text is in a given style.

use folio_model::Style;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TextSize {
    pub width: f32,
    pub height: f32,
}

pub trait TextMetrics: fmt::Debug + Send + Sync {
    fn measure(&self, text: &str, style: &Style) -> TextSize;
}

/// Every char has the same advance. Sizes scale with the `scale` style
/// property.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedMetrics {
    pub char_width: f32,
    pub line_height: f32,
}

impl FixedMetrics {
    pub fn new(char_width: f32, line_height: f32) -> Self {
        Self {
            char_width,
            line_height,
        }
    }
}

impl Default for FixedMetrics {
    fn default() -> Self {
        Self::new(10.0, 20.0)
    }
}

pub fn style_scale(style: &Style) -> f32 {
    style
        .get("scale")
        .and_then(|scale| scale.parse::<f32>().ok())
        .filter(|scale| *scale > 0.0)
        .unwrap_or(1.0)
}

impl TextMetrics for FixedMetrics {
    fn measure(&self, text: &str, style: &Style) -> TextSize {
        let scale = style_scale(style);
        TextSize {
            width: text.chars().count() as f32 * self.char_width * scale,
            height: self.line_height * scale,
        }
    }
}
