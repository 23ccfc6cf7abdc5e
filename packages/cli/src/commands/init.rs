use crate::config::DEFAULT_CONFIG_NAME;
use anyhow::Result;
use chrono::Utc;
use clap::Args;
use colored::Colorize;
use pagegrid_common::{Block, BlockId, GridRect, PageSnapshot};
use pagegrid_editor::EditorConfig;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

pub const EXAMPLE_BLOCKS_NAME: &str = "blocks.example.json";

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Desktop column count
    #[arg(short, long)]
    pub columns: Option<u32>,

    /// Also write an example blocks file
    #[arg(long)]
    pub example: bool,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let dir = PathBuf::from(cwd);
    let config_path = dir.join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing pagegrid project...".bright_blue().bold());

    let config = default_config(args.columns);
    config.save(&dir)?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);

    if args.example {
        let example_path = dir.join(EXAMPLE_BLOCKS_NAME);
        if example_path.exists() && !args.force {
            println!("  {} Kept existing {}", "•".dimmed(), EXAMPLE_BLOCKS_NAME);
        } else {
            write_example(&example_path)?;
            println!("  {} Created {}", "✓".green(), EXAMPLE_BLOCKS_NAME);
        }
    }

    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Edit {}", DEFAULT_CONFIG_NAME);
    println!("  2. Run: pagegrid responsive {} --breakpoint mobile", EXAMPLE_BLOCKS_NAME);

    Ok(())
}

fn default_config(columns: Option<u32>) -> EditorConfig {
    let mut config = EditorConfig::default();
    if let Some(columns) = columns {
        let columns = columns.max(1);
        config.grid.desktop.columns = columns;
        config.grid.desktop.max_block_width = columns;
    }
    config
}

fn example_page() -> PageSnapshot {
    let now = Utc::now();
    let blocks = vec![
        Block::new(
            BlockId::Persistent(1),
            1,
            "Heading",
            GridRect::new(0, 0, 12, 1),
            json!({"text": "Welcome", "level": 1}),
            now,
        ),
        Block::new(
            BlockId::Persistent(2),
            1,
            "Image",
            GridRect::new(0, 1, 6, 3),
            json!({"src": "hero.png", "alt": "Hero"}),
            now,
        ),
        Block::new(
            BlockId::Persistent(3),
            1,
            "Text",
            GridRect::new(6, 1, 6, 2),
            json!({"text": "Drag blocks around the grid."}),
            now,
        ),
    ];

    PageSnapshot {
        page_id: 1,
        blocks,
        rows: 10,
        settings: Default::default(),
    }
}

fn write_example(path: &Path) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(&example_page())?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn run(dir: &TempDir, force: bool) -> Result<()> {
        init(
            InitArgs {
                columns: Some(16),
                example: true,
                force,
            },
            &dir.path().display().to_string(),
        )
    }

    #[test]
    fn test_init_writes_config_and_example() {
        let dir = TempDir::new().unwrap();
        run(&dir, false).unwrap();

        let config = EditorConfig::load(dir.path()).unwrap();
        assert_eq!(config.grid.columns(), 16);
        assert_eq!(config.grid.desktop.max_block_width, 16);

        let blocks = crate::config::read_blocks(
            &dir.path().display().to_string(),
            EXAMPLE_BLOCKS_NAME,
        )
        .unwrap();
        assert_eq!(blocks.len(), 3);
    }

    #[test]
    fn test_init_keeps_existing_config_without_force() {
        let dir = TempDir::new().unwrap();
        let mut custom = EditorConfig::default();
        custom.history_depth = 7;
        custom.save(dir.path()).unwrap();

        run(&dir, false).unwrap();
        assert_eq!(EditorConfig::load(dir.path()).unwrap().history_depth, 7);

        run(&dir, true).unwrap();
        assert_eq!(EditorConfig::load(dir.path()).unwrap().history_depth, 50);
    }
}
