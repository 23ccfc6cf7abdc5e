//! # Responsive Layout Transformer
//!
//! Derives tablet and mobile arrangements from the authored desktop layout.
//!
//! ## Design
//!
//! - Widths scale proportionally to the target column count, then clamp to
//!   the target's block width limits
//! - On the narrowest breakpoint, content-heavy types go full width and
//!   unusually tall blocks lose about a tenth of their height
//! - Source geometry is discarded: blocks are sorted by priority (headers
//!   first, footers last, then original reading order) and re-packed with
//!   the first-fit scan, so the derived layout never overlaps
//! - The source collection is never mutated

use crate::config::{Breakpoint, GridConfig};
use crate::grid::GridCoordinateSystem;
use pagegrid_common::{Block, GridRect};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use tracing::debug;

/// Blocks taller than this many rows shrink on the narrowest breakpoint
pub const TALL_BLOCK_ROWS: u32 = 4;

/// Height factor applied to tall blocks on the narrowest breakpoint
const NARROW_HEIGHT_FACTOR: f64 = 0.9;

/// Types stretched to the full grid width on the narrowest breakpoint
const FULL_BLEED_TYPES: &[&str] = &[
    "text",
    "heading",
    "image",
    "video",
    "container",
    "form",
    "contactform",
    "gallery",
    "carousel",
    "map",
    "embed",
];

const HEADER_HINTS: &[&str] = &["header", "hero", "title"];
const FOOTER_HINTS: &[&str] = &["footer", "copyright"];

/// A derived, non-persisted arrangement for one breakpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsiveLayout {
    pub breakpoint: Breakpoint,
    pub blocks: Vec<Block>,

    /// Minimum row count containing every placed block
    pub rows: u32,
}

#[derive(Debug, Clone)]
pub struct ResponsiveLayoutTransformer {
    config: GridConfig,
}

impl ResponsiveLayoutTransformer {
    pub fn new(config: GridConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Arrangement of `source` (authored on desktop) for `target`
    pub fn transform(&self, source: &[Block], target: Breakpoint) -> ResponsiveLayout {
        if target == Breakpoint::source() {
            let blocks = source.to_vec();
            let rows = GridCoordinateSystem::rows_needed(&blocks, 0);
            return ResponsiveLayout {
                breakpoint: target,
                blocks,
                rows,
            };
        }

        let target_config = self.config.for_breakpoint(target).clone();
        let grid = GridCoordinateSystem::new(target_config, target.reference_width());

        let mut ordered: Vec<&Block> = source.iter().collect();
        ordered.sort_by_key(|b| (Reverse(priority(b)), b.row, b.col, b.id.clone()));

        let mut placed: Vec<Block> = Vec::with_capacity(source.len());
        for block in ordered {
            let width = self.scale_width(block, target);
            let height = self.adjust_height(block, target);
            let cell = grid.find_available_position(width, height, &placed, None, None);

            let mut derived = block.clone();
            derived.set_placement(GridRect::new(cell.col, cell.row, width, height));
            placed.push(derived);
        }

        let rows = GridCoordinateSystem::rows_needed(&placed, 0);
        debug!(
            breakpoint = %target,
            blocks = placed.len(),
            rows,
            "Derived responsive layout"
        );

        ResponsiveLayout {
            breakpoint: target,
            blocks: placed,
            rows,
        }
    }

    /// Every non-source breakpoint, narrow to wide
    pub fn transform_all(&self, source: &[Block]) -> Vec<ResponsiveLayout> {
        Breakpoint::ALL
            .iter()
            .filter(|bp| **bp != Breakpoint::source())
            .map(|bp| self.transform(source, *bp))
            .collect()
    }

    pub fn scale_width(&self, block: &Block, target: Breakpoint) -> u32 {
        let target_config = self.config.for_breakpoint(target);

        if target.is_narrowest() && is_full_bleed(&block.block_type) {
            return target_config.columns.max(1);
        }

        let source_columns = self.config.columns().max(1) as f64;
        let scaled = (block.width as f64 / source_columns * target_config.columns as f64).round();
        target_config.clamp_width(scaled as u32)
    }

    pub fn adjust_height(&self, block: &Block, target: Breakpoint) -> u32 {
        if target.is_narrowest() && block.height > TALL_BLOCK_ROWS {
            ((block.height as f64 * NARROW_HEIGHT_FACTOR).ceil() as u32).max(1)
        } else {
            block.height.max(1)
        }
    }
}

fn is_full_bleed(block_type: &str) -> bool {
    let kind = block_type.to_ascii_lowercase();
    FULL_BLEED_TYPES.contains(&kind.as_str())
}

fn type_priority(kind: &str) -> i32 {
    match kind {
        "navigation" | "nav" | "header" | "hero" => 100,
        "heading" | "title" => 90,
        "text" | "paragraph" => 60,
        "image" | "video" | "gallery" | "carousel" => 50,
        "button" | "form" | "contactform" => 40,
        "container" => 30,
        "divider" | "spacer" => 10,
        "footer" => 0,
        _ => 20,
    }
}

/// Placement priority: higher scores are packed first
pub fn priority(block: &Block) -> i32 {
    let kind = block.block_type.to_ascii_lowercase();
    let text = block.content_text();
    let hinted = |hints: &[&str]| hints.iter().any(|h| kind.contains(h) || text.contains(h));

    if hinted(FOOTER_HINTS) {
        return 0;
    }

    let base = type_priority(&kind);
    if hinted(HEADER_HINTS) {
        base.max(95)
    } else {
        base
    }
}

/// Normalized fingerprint of an arrangement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSignature {
    pub block_count: usize,
    pub positions: String,
}

impl LayoutSignature {
    pub fn of(blocks: &[Block]) -> Self {
        let mut entries: Vec<String> = blocks
            .iter()
            .map(|b| format!("{}:{}:{}:{}:{}", b.id, b.col, b.row, b.width, b.height))
            .collect();
        entries.sort();

        Self {
            block_count: blocks.len(),
            positions: entries.join("|"),
        }
    }
}

/// True when derived layouts must be materialized again
pub fn needs_regeneration(previous: Option<&LayoutSignature>, current: &LayoutSignature) -> bool {
    match previous {
        None => true,
        Some(prev) => prev.block_count != current.block_count || prev.positions != current.positions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::find_overlaps;
    use chrono::Utc;
    use pagegrid_common::BlockId;
    use serde_json::{json, Value};

    fn block(id: i64, kind: &str, col: u32, row: u32, width: u32, height: u32) -> Block {
        block_with(id, kind, col, row, width, height, json!({}))
    }

    fn block_with(
        id: i64,
        kind: &str,
        col: u32,
        row: u32,
        width: u32,
        height: u32,
        content: Value,
    ) -> Block {
        Block::new(
            BlockId::Persistent(id),
            1,
            kind,
            GridRect::new(col, row, width, height),
            content,
            Utc::now(),
        )
    }

    fn transformer() -> ResponsiveLayoutTransformer {
        ResponsiveLayoutTransformer::new(GridConfig::default())
    }

    #[test]
    fn test_full_width_maps_to_full_width() {
        let t = transformer();
        let wide = block(1, "Button", 0, 0, 12, 1);
        assert_eq!(t.scale_width(&wide, Breakpoint::Tablet), 8);
        assert_eq!(t.scale_width(&wide, Breakpoint::Mobile), 4);
    }

    #[test]
    fn test_proportional_scaling_rounds() {
        let t = transformer();
        // 3/12 * 8 = 2
        assert_eq!(t.scale_width(&block(1, "Button", 0, 0, 3, 1), Breakpoint::Tablet), 2);
        // 5/12 * 8 = 3.33
        assert_eq!(t.scale_width(&block(1, "Button", 0, 0, 5, 1), Breakpoint::Tablet), 3);
        // 1/12 * 4 = 0.33 → clamped to min width 1
        assert_eq!(t.scale_width(&block(1, "Button", 0, 0, 1, 1), Breakpoint::Mobile), 1);
    }

    #[test]
    fn test_full_bleed_only_on_narrowest() {
        let t = transformer();
        let text = block(1, "Text", 0, 0, 3, 1);
        assert_eq!(t.scale_width(&text, Breakpoint::Mobile), 4);
        assert_eq!(t.scale_width(&text, Breakpoint::Tablet), 2);

        let button = block(2, "Button", 0, 0, 3, 1);
        assert_eq!(t.scale_width(&button, Breakpoint::Mobile), 1);
    }

    #[test]
    fn test_tall_blocks_shrink_on_mobile() {
        let t = transformer();
        let tall = block(1, "Image", 0, 0, 4, 10);
        assert_eq!(t.adjust_height(&tall, Breakpoint::Mobile), 9);
        assert_eq!(t.adjust_height(&tall, Breakpoint::Tablet), 10);

        let short = block(2, "Image", 0, 0, 4, 3);
        assert_eq!(t.adjust_height(&short, Breakpoint::Mobile), 3);
    }

    #[test]
    fn test_priority_ordering() {
        let footer = block_with(1, "Text", 0, 0, 12, 1, json!({"text": "© Copyright 2024"}));
        let hero = block_with(2, "Text", 0, 5, 12, 1, json!({"text": "Hero title"}));
        let plain = block(3, "Text", 0, 2, 12, 1);
        let nav = block(4, "Navigation", 0, 9, 12, 1);

        assert_eq!(priority(&footer), 0);
        assert_eq!(priority(&hero), 95);
        assert_eq!(priority(&plain), 60);
        assert_eq!(priority(&nav), 100);

        let layout = transformer().transform(&[footer, hero, plain, nav], Breakpoint::Mobile);
        let order: Vec<i64> = {
            let mut blocks = layout.blocks.clone();
            blocks.sort_by_key(|b| b.row);
            blocks.iter().filter_map(|b| b.id.as_persistent()).collect()
        };
        assert_eq!(order, vec![4, 2, 3, 1]);
    }

    #[test]
    fn test_transform_never_overlaps_and_counts_rows() {
        let source = vec![
            block(1, "Heading", 0, 0, 12, 1),
            block(2, "Image", 0, 1, 6, 3),
            block(3, "Text", 6, 1, 6, 3),
            block(4, "Button", 0, 4, 2, 1),
            block(5, "Button", 2, 4, 2, 1),
        ];

        for bp in [Breakpoint::Tablet, Breakpoint::Mobile] {
            let layout = transformer().transform(&source, bp);
            assert!(find_overlaps(&layout.blocks).is_empty());
            assert_eq!(layout.blocks.len(), source.len());

            let columns = GridConfig::default().for_breakpoint(bp).columns;
            assert!(layout.blocks.iter().all(|b| b.col + b.width <= columns));
            assert_eq!(
                layout.rows,
                layout.blocks.iter().map(|b| b.row + b.height).max().unwrap()
            );
        }
    }

    #[test]
    fn test_transform_does_not_mutate_source() {
        let source = vec![block(1, "Text", 3, 3, 6, 2)];
        let before = source.clone();
        let _ = transformer().transform(&source, Breakpoint::Mobile);
        assert_eq!(source, before);
    }

    #[test]
    fn test_desktop_is_identity() {
        let source = vec![block(1, "Text", 3, 3, 6, 2)];
        let layout = transformer().transform(&source, Breakpoint::Desktop);
        assert_eq!(layout.blocks, source);
        assert_eq!(layout.rows, 5);
    }

    #[test]
    fn test_transform_all_skips_source() {
        let layouts = transformer().transform_all(&[block(1, "Text", 0, 0, 2, 1)]);
        let breakpoints: Vec<Breakpoint> = layouts.iter().map(|l| l.breakpoint).collect();
        assert_eq!(breakpoints, vec![Breakpoint::Mobile, Breakpoint::Tablet]);
    }

    #[test]
    fn test_signature_detects_changes() {
        let a = vec![block(1, "Text", 0, 0, 2, 1), block(2, "Text", 2, 0, 2, 1)];
        let sig = LayoutSignature::of(&a);

        assert!(needs_regeneration(None, &sig));
        assert!(!needs_regeneration(Some(&sig), &LayoutSignature::of(&a)));

        let mut reversed = a.clone();
        reversed.reverse();
        assert!(!needs_regeneration(Some(&sig), &LayoutSignature::of(&reversed)));

        let mut moved = a.clone();
        moved[0].row = 4;
        assert!(needs_regeneration(Some(&sig), &LayoutSignature::of(&moved)));

        assert!(needs_regeneration(Some(&sig), &LayoutSignature::of(&a[..1])));
    }
}
