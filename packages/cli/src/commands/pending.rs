use crate::config;
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;
use pagegrid_common::{Block, OperationKind};
use pagegrid_editor::{
    keys, DraftChangeLog, FileStore, KeyValueStore, PendingData, PendingOperation,
    PendingOperationSet,
};
use pagegrid_layout::GridCoordinateSystem;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct PendingArgs {
    /// Directory holding the persisted drafts
    pub store_dir: String,

    /// Page whose draft to inspect
    #[arg(short, long)]
    pub page: i64,

    /// Drop expired and empty-content records before listing
    #[arg(long)]
    pub prune: bool,

    /// Print the batch request that publishing would send
    #[arg(long)]
    pub json: bool,
}

pub fn pending(args: PendingArgs, cwd: &str) -> Result<()> {
    let config = config::load(cwd)?;
    let store_dir = config::resolve(cwd, &args.store_dir);
    let store: Arc<dyn KeyValueStore> = Arc::new(
        FileStore::open(&store_dir)
            .with_context(|| format!("Cannot open draft store {}", store_dir.display()))?,
    );

    let mut log =
        DraftChangeLog::open(args.page, store.clone()).with_retention(config.draft_retention());

    if args.prune {
        let expired = log.prune_expired(Utc::now())?;
        let degenerate = log.prune_degenerate()?;
        println!(
            "{} Pruned {} expired and {} empty records",
            "✂".bright_blue(),
            expired,
            degenerate
        );
    }

    let pending = PendingOperationSet::from_changes(log.changes());
    let rows = publish_rows(store.as_ref(), args.page, config.grid.min_rows);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&pending.to_batch_request(rows)?)?);
        return Ok(());
    }

    if pending.is_empty() && pending.layout().is_empty() {
        println!("{} Page {} has no unpublished changes", "✓".green(), args.page);
        return Ok(());
    }

    println!(
        "{} Page {}: {} records, {} pending operations",
        "📋".bright_blue(),
        args.page,
        log.len(),
        pending.len()
    );
    for op in pending.operations() {
        println!("  {}", describe(op));
    }
    if !pending.layout().is_empty() {
        println!(
            "  {:<7} {}",
            "layout".magenta(),
            serde_json::to_string(pending.layout())?
        );
    }

    Ok(())
}

/// Block cache the editor writes next to the draft
#[derive(Debug, Deserialize)]
struct CachedBlocks {
    blocks: Vec<Block>,

    #[serde(default)]
    rows: u32,
}

/// Rows sent with the batch: the cached block extent, or the configured minimum
fn publish_rows(store: &dyn KeyValueStore, page_id: i64, min_rows: u32) -> u32 {
    store
        .get(&keys::blocks(page_id))
        .ok()
        .flatten()
        .and_then(|json| serde_json::from_str::<CachedBlocks>(&json).ok())
        .map(|cache| GridCoordinateSystem::rows_needed(&cache.blocks, cache.rows.max(min_rows)))
        .unwrap_or(min_rows)
}

fn describe(op: &PendingOperation) -> String {
    let label = match op.kind() {
        OperationKind::Create => "create".green(),
        OperationKind::Update => "update".yellow(),
        OperationKind::Delete => "delete".red(),
    };

    let detail = match &op.data {
        PendingData::Create(block) => format!(
            "{} at col {}, row {} ({}×{})",
            block.block_type, block.col, block.row, block.width, block.height
        ),
        PendingData::Update(patch) => serde_json::to_string(patch).unwrap_or_default(),
        PendingData::Delete if op.block_id.is_temporary() => "never published, skipped".to_string(),
        PendingData::Delete => String::new(),
    };

    format!("{:<7} {} {}", label, op.block_id, detail)
}
