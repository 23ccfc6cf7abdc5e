//! Property tests for grid placement invariants
//!
//! - Blocks placed one after another through `place` never share a cell
//! - grid → pixel → grid is the identity for every cell
//! - Derived responsive layouts never overlap and never exceed the grid

use chrono::Utc;
use pagegrid_layout::{
    find_overlaps, Block, BlockId, Breakpoint, BreakpointGridConfig, GridConfig, GridCell,
    GridCoordinateSystem, GridRect, ResponsiveLayoutTransformer,
};
use proptest::prelude::*;
use serde_json::json;

fn block(id: i64, rect: GridRect) -> Block {
    Block::new(BlockId::Persistent(id), 1, "Text", rect, json!({}), Utc::now())
}

fn request() -> impl Strategy<Value = (u32, u32, u32, u32)> {
    // col, row, width, height (widths may exceed the grid on purpose)
    (0u32..14, 0u32..10, 1u32..14, 1u32..4)
}

proptest! {
    #[test]
    fn placed_blocks_never_overlap(requests in prop::collection::vec(request(), 1..25)) {
        let grid = GridCoordinateSystem::new(BreakpointGridConfig::new(12, 60.0, 16.0), 1200.0);
        let mut blocks: Vec<Block> = Vec::new();

        for (i, (col, row, width, height)) in requests.into_iter().enumerate() {
            let rect = grid.place(GridRect::new(col, row, width, height), &blocks, None);
            prop_assert!(rect.end_col() <= 12);
            blocks.push(block(i as i64, rect));
        }

        prop_assert!(find_overlaps(&blocks).is_empty());
    }

    #[test]
    fn grid_pixel_round_trip(
        col in 0u32..12,
        row in 0u32..500,
        gap in 0.0f64..40.0,
        width in 320.0f64..2560.0,
    ) {
        let grid = GridCoordinateSystem::new(BreakpointGridConfig::new(12, 60.0, gap), width);
        let px = grid.grid_to_pixel(col, row);
        prop_assert_eq!(grid.pixel_to_grid(px.x, px.y), GridCell::new(col, row));
    }

    #[test]
    fn responsive_layouts_stay_in_bounds(requests in prop::collection::vec(request(), 0..20)) {
        let config = GridConfig::default();
        let grid = GridCoordinateSystem::new(config.desktop.clone(), 1200.0);
        let mut source: Vec<Block> = Vec::new();
        for (i, (col, row, width, height)) in requests.into_iter().enumerate() {
            let rect = grid.place(GridRect::new(col, row, width, height), &source, None);
            source.push(block(i as i64, rect));
        }

        let transformer = ResponsiveLayoutTransformer::new(config.clone());
        for bp in [Breakpoint::Tablet, Breakpoint::Mobile] {
            let layout = transformer.transform(&source, bp);
            let columns = config.for_breakpoint(bp).columns;
            prop_assert!(find_overlaps(&layout.blocks).is_empty());
            prop_assert!(layout.blocks.iter().all(|b| b.col + b.width <= columns));
        }
    }
}

#[test]
fn test_auto_wrap_scenario() {
    let grid = GridCoordinateSystem::new(BreakpointGridConfig::new(12, 60.0, 16.0), 1200.0);
    let placed = grid.place(GridRect::new(10, 2, 4, 1), &[], None);
    assert_eq!(placed, GridRect::new(0, 3, 4, 1));
}

#[test]
fn test_collision_scenario() {
    let grid = GridCoordinateSystem::new(BreakpointGridConfig::new(12, 60.0, 16.0), 1200.0);

    let a = grid.place(GridRect::new(0, 0, 2, 1), &[], None);
    assert_eq!(a, GridRect::new(0, 0, 2, 1));

    let blocks = vec![block(1, a)];
    let b = grid.place(GridRect::new(0, 0, 4, 2), &blocks, None);
    assert_eq!(b, GridRect::new(2, 0, 4, 2));
}
