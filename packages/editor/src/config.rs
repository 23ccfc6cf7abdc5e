//! Editor configuration (`pagegrid.config.json`)

use crate::errors::EditorResult;
use pagegrid_layout::GridConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "pagegrid.config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    #[serde(default)]
    pub grid: GridConfig,

    /// Undo levels kept per page
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,

    /// Draft records older than this are pruned on load
    #[serde(default = "default_draft_retention_hours")]
    pub draft_retention_hours: i64,

    /// Canvas width in pixels used for pointer conversion
    #[serde(default = "default_container_width")]
    pub container_width: f64,
}

fn default_history_depth() -> usize {
    50
}

fn default_draft_retention_hours() -> i64 {
    24
}

fn default_container_width() -> f64 {
    1200.0
}

impl EditorConfig {
    /// Load `pagegrid.config.json` from `dir`, or defaults if it is absent
    pub fn load(dir: &Path) -> EditorResult<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, dir: &Path) -> EditorResult<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(dir.join(CONFIG_FILE_NAME), contents)?;
        Ok(())
    }

    pub fn draft_retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.draft_retention_hours.max(0))
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            history_depth: default_history_depth(),
            draft_retention_hours: default_draft_retention_hours(),
            container_width: default_container_width(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = EditorConfig::load(dir.path()).unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.history_depth, 50);
        assert_eq!(config.draft_retention(), chrono::Duration::hours(24));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{ "historyDepth": 5, "grid": { "minRows": 3 } }"#,
        )
        .unwrap();

        let config = EditorConfig::load(dir.path()).unwrap();
        assert_eq!(config.history_depth, 5);
        assert_eq!(config.grid.min_rows, 3);
        assert_eq!(config.grid.columns(), 12);
        assert_eq!(config.container_width, 1200.0);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut config = EditorConfig::default();
        config.draft_retention_hours = 2;
        config.save(dir.path()).unwrap();

        assert_eq!(EditorConfig::load(dir.path()).unwrap(), config);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{ nope").unwrap();
        assert!(EditorConfig::load(dir.path()).is_err());
    }
}
