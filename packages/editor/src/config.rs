use folio_layout::LayoutOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "folio.config.json";

/// Engine configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Longest span, in ms, one history action may cover
    #[serde(default = "default_max_collapse_duration")]
    pub max_collapse_duration: u64,

    /// Longest pause, in ms, between edits that still coalesce
    #[serde(default = "default_collapse_threshold")]
    pub collapse_threshold: u64,

    /// Undo depth cap (0 = unlimited)
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    #[serde(default = "default_line_width")]
    pub line_width: f32,

    #[serde(default = "default_page_height")]
    pub page_height: f32,

    /// Reject markup tags without an id instead of generating one
    #[serde(default)]
    pub strict_ids: bool,
}

fn default_max_collapse_duration() -> u64 {
    2000
}

fn default_collapse_threshold() -> u64 {
    500
}

fn default_max_history() -> usize {
    100
}

fn default_line_width() -> f32 {
    700.0
}

fn default_page_height() -> f32 {
    1000.0
}

impl EngineConfig {
    /// Load config from a directory
    pub fn load(cwd: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd.as_ref()).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: EngineConfig = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(EngineConfig::default())
        }
    }

    pub fn max_collapse_duration(&self) -> Duration {
        Duration::from_millis(self.max_collapse_duration)
    }

    pub fn collapse_threshold(&self) -> Duration {
        Duration::from_millis(self.collapse_threshold)
    }

    pub fn layout_options(&self) -> LayoutOptions {
        LayoutOptions {
            line_width: self.line_width,
            page_height: self.page_height,
            ..LayoutOptions::default()
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_collapse_duration: default_max_collapse_duration(),
            collapse_threshold: default_collapse_threshold(),
            max_history: default_max_history(),
            line_width: default_line_width(),
            page_height: default_page_height(),
            strict_ids: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "collapseThreshold": 250,
            "maxHistory": 0,
            "lineWidth": 480.5,
            "strictIds": true
        }"#;

        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.collapse_threshold(), Duration::from_millis(250));
        assert_eq!(config.max_collapse_duration(), Duration::from_millis(2000));
        assert_eq!(config.max_history, 0);
        assert_eq!(config.layout_options().line_width, 480.5);
        assert_eq!(config.layout_options().page_height, 1000.0);
        assert!(config.strict_ids);
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.max_history, 100);
        assert_eq!(config.line_width, 700.0);
        assert!(!config.strict_ids);
    }

    #[test]
    fn test_missing_file_loads_default() {
        let config = EngineConfig::load("/nonexistent/folio").unwrap();
        assert_eq!(config, EngineConfig::default());
    }
}
