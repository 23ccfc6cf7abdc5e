use super::format_block_row;
use crate::config;
use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use pagegrid_common::Block;
use pagegrid_layout::{find_overlaps, Breakpoint, GridConfig, ResponsiveLayout, ResponsiveLayoutTransformer};

#[derive(Debug, Args)]
pub struct ResponsiveArgs {
    /// Blocks file (array of blocks or a page snapshot)
    pub file: String,

    /// Target breakpoint (mobile, tablet, desktop)
    #[arg(short, long, default_value = "mobile")]
    pub breakpoint: Breakpoint,

    /// Print the arrangement as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn responsive(args: ResponsiveArgs, cwd: &str) -> Result<()> {
    let config = config::load(cwd)?;
    let blocks = config::read_blocks(cwd, &args.file)?;

    let overlaps = find_overlaps(&blocks);
    for (a, b) in &overlaps {
        eprintln!("{} blocks {} and {} overlap", "⚠️".yellow(), a, b);
    }

    let layout = derive(config.grid, &blocks, args.breakpoint)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&layout)?);
        return Ok(());
    }

    println!(
        "{} {} layout: {} blocks, {} rows",
        "📐".bright_blue(),
        layout.breakpoint.to_string().bright_white().bold(),
        layout.blocks.len(),
        layout.rows
    );
    for block in &layout.blocks {
        println!("  {}", format_block_row(block));
    }

    Ok(())
}

fn derive(grid: GridConfig, blocks: &[Block], breakpoint: Breakpoint) -> Result<ResponsiveLayout> {
    let columns = grid.columns();
    if let Some(wide) = blocks.iter().find(|b| b.placement().end_col() > columns) {
        bail!(
            "Block {} extends past column {} of the desktop grid",
            wide.id,
            columns
        );
    }
    Ok(ResponsiveLayoutTransformer::new(grid).transform(blocks, breakpoint))
}
