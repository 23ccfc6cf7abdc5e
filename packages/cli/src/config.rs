use anyhow::{Context, Result};
use pagegrid_common::{Block, PageSnapshot};
use pagegrid_editor::EditorConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub use pagegrid_editor::CONFIG_FILE_NAME as DEFAULT_CONFIG_NAME;

/// Load `pagegrid.config.json` from the working directory (defaults if absent)
pub fn load(cwd: &str) -> Result<EditorConfig> {
    EditorConfig::load(Path::new(cwd))
        .with_context(|| format!("Failed to load {} from {}", DEFAULT_CONFIG_NAME, cwd))
}

/// A blocks file is either a bare array or a whole page
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BlocksFile {
    Blocks(Vec<Block>),
    Page(PageSnapshot),
}

pub fn parse_blocks(json: &str) -> Result<Vec<Block>> {
    let file: BlocksFile = serde_json::from_str(json)?;
    Ok(match file {
        BlocksFile::Blocks(blocks) => blocks,
        BlocksFile::Page(page) => page.blocks,
    })
}

pub fn read_blocks(cwd: &str, file: &str) -> Result<Vec<Block>> {
    let path = resolve(cwd, file);
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    parse_blocks(&contents).with_context(|| format!("Invalid blocks file {}", path.display()))
}

pub fn resolve(cwd: &str, file: &str) -> PathBuf {
    let path = PathBuf::from(file);
    if path.is_absolute() {
        path
    } else {
        PathBuf::from(cwd).join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: &str = r#"{
        "id": 3, "page_id": 1, "block_type": "Text", "content": {"text": "hi"},
        "col": 0, "row": 0, "width": 2, "height": 1,
        "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-01T00:00:00Z"
    }"#;

    #[test]
    fn test_parse_block_array() {
        let blocks = parse_blocks(&format!("[{}]", BLOCK)).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].block_type, "Text");
    }

    #[test]
    fn test_parse_page_snapshot() {
        let blocks = parse_blocks(&format!(r#"{{"page_id": 1, "rows": 12, "blocks": [{}]}}"#, BLOCK)).unwrap();
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_blocks(r#"{"nope": true}"#).is_err());
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = load(&dir.path().display().to_string()).unwrap();
        assert_eq!(config.history_depth, 50);
    }
}
