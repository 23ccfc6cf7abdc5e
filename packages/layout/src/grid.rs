//! # Grid Coordinate System
//!
//! Converts between pixel space and grid cells and decides where blocks may
//! go.
//!
//! ## Geometry
//!
//! ```text
//! |<-cell->|gap|<-cell->|gap|<-cell->|
//! x = col * (cellWidth + gap)
//! col = floor((x + gap) / (cellWidth + gap))
//! ```
//!
//! Columns are fixed per breakpoint; rows are unbounded and the grid grows
//! downward as blocks are added.
//!
//! ## Placement policy
//!
//! First-fit, row-major, top-left bias: the preferred cell is tried first,
//! then every row top to bottom and every column left to right. The same
//! input always yields the same cell.

use crate::config::BreakpointGridConfig;
use pagegrid_common::{Block, BlockId, GridRect};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Rows scanned below the lowest block before giving up and appending
pub const SEARCH_SLACK_ROWS: u32 = 100;

/// Absorbs floating point error so grid → pixel → grid is exact
const FLOOR_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCell {
    pub col: u32,
    pub row: u32,
}

impl GridCell {
    pub fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Preview of where a dragged or resized block would land
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropIndicator {
    /// Rectangle under the pointer, before wrapping
    pub target: GridRect,

    /// Pixel geometry of `target`
    pub pixels: PixelRect,

    /// `target` is in bounds and free
    pub available: bool,

    /// `target` overflows the grid width (shown as a boundary warning)
    pub exceeds_width: bool,

    /// Where the block lands once wrapping and collisions are resolved
    pub landing: GridRect,
}

/// Grid math bound to one breakpoint and container width
#[derive(Debug, Clone)]
pub struct GridCoordinateSystem {
    config: BreakpointGridConfig,
    container_width: f64,

    /// 0 = unbounded
    max_rows: u32,
}

impl GridCoordinateSystem {
    pub fn new(config: BreakpointGridConfig, container_width: f64) -> Self {
        Self {
            config,
            container_width,
            max_rows: 0,
        }
    }

    pub fn with_max_rows(mut self, max_rows: u32) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn config(&self) -> &BreakpointGridConfig {
        &self.config
    }

    pub fn columns(&self) -> u32 {
        self.config.columns.max(1)
    }

    pub fn cell_width(&self) -> f64 {
        let columns = self.columns() as f64;
        let gaps = self.config.gap * (columns - 1.0);
        ((self.container_width - gaps) / columns).max(1.0)
    }

    pub fn cell_height(&self) -> f64 {
        self.config.row_height.max(1.0)
    }

    pub fn pixel_to_grid(&self, x: f64, y: f64) -> GridCell {
        let gap = self.config.gap;
        let col = ((x + gap) / (self.cell_width() + gap) + FLOOR_EPSILON).floor();
        let row = ((y + gap) / (self.cell_height() + gap) + FLOOR_EPSILON).floor();

        let max_col = (self.columns() - 1) as f64;
        GridCell {
            col: col.clamp(0.0, max_col) as u32,
            row: row.max(0.0) as u32,
        }
    }

    /// Pixel rectangle of a single cell
    pub fn grid_to_pixel(&self, col: u32, row: u32) -> PixelRect {
        self.block_to_pixel(&GridRect::new(col, row, 1, 1))
    }

    /// Pixel rectangle spanned by a block, gaps between its cells included
    pub fn block_to_pixel(&self, rect: &GridRect) -> PixelRect {
        let gap = self.config.gap;
        let cell_width = self.cell_width();
        let cell_height = self.cell_height();

        PixelRect {
            x: rect.col as f64 * (cell_width + gap),
            y: rect.row as f64 * (cell_height + gap),
            width: rect.width as f64 * cell_width + rect.width.saturating_sub(1) as f64 * gap,
            height: rect.height as f64 * cell_height + rect.height.saturating_sub(1) as f64 * gap,
        }
    }

    pub fn is_within_bounds(&self, rect: &GridRect) -> bool {
        let rows_ok = self.max_rows == 0 || rect.end_row() <= self.max_rows;
        rect.end_col() <= self.columns() && rows_ok
    }

    /// In bounds and not overlapping any block other than `exclude`
    pub fn is_position_available(
        &self,
        rect: &GridRect,
        blocks: &[Block],
        exclude: Option<&BlockId>,
    ) -> bool {
        if !self.is_within_bounds(rect) {
            return false;
        }

        !blocks
            .iter()
            .filter(|b| Some(&b.id) != exclude)
            .any(|b| b.placement().overlaps(rect))
    }

    /// Auto-wrap: a block overflowing the right edge moves to column 0 of
    /// the next row. Widths larger than the grid are clamped first.
    pub fn wrap(&self, rect: GridRect) -> GridRect {
        let columns = self.columns();
        let rect = rect.resized(rect.width.min(columns), rect.height);

        if rect.end_col() > columns {
            debug!(col = rect.col, width = rect.width, columns, "Wrapping block to next row");
            rect.at(0, rect.row.saturating_add(1))
        } else {
            rect
        }
    }

    /// First free cell for a `width`×`height` block
    pub fn find_available_position(
        &self,
        width: u32,
        height: u32,
        blocks: &[Block],
        preferred: Option<GridCell>,
        exclude: Option<&BlockId>,
    ) -> GridCell {
        let columns = self.columns();
        let width = width.clamp(1, columns);
        let height = height.max(1);

        if let Some(cell) = preferred {
            let rect = GridRect::new(cell.col, cell.row, width, height);
            if self.is_position_available(&rect, blocks, exclude) {
                return cell;
            }
        }

        let bottom = blocks
            .iter()
            .filter(|b| Some(&b.id) != exclude)
            .map(|b| b.placement().end_row())
            .max()
            .unwrap_or(0);

        let mut last_row = bottom.saturating_add(height).saturating_add(SEARCH_SLACK_ROWS);
        if self.max_rows > 0 {
            last_row = last_row.min(self.max_rows.saturating_sub(height));
        }

        for row in 0..=last_row {
            for col in 0..=(columns - width) {
                let rect = GridRect::new(col, row, width, height);
                if self.is_position_available(&rect, blocks, exclude) {
                    return GridCell { col, row };
                }
            }
        }

        warn!(width, height, bottom, "No free cell in search window, appending row");
        GridCell { col: 0, row: bottom }
    }

    /// Wrap `rect`, then move it to the first free cell if it collides
    pub fn place(&self, rect: GridRect, blocks: &[Block], exclude: Option<&BlockId>) -> GridRect {
        let wrapped = self.wrap(rect);
        let cell = self.find_available_position(
            wrapped.width,
            wrapped.height,
            blocks,
            Some(GridCell::new(wrapped.col, wrapped.row)),
            exclude,
        );
        wrapped.at(cell.col, cell.row)
    }

    pub fn drop_indicator(
        &self,
        target: GridRect,
        blocks: &[Block],
        exclude: Option<&BlockId>,
    ) -> DropIndicator {
        DropIndicator {
            target,
            pixels: self.block_to_pixel(&target),
            available: self.is_position_available(&target, blocks, exclude),
            exceeds_width: target.end_col() > self.columns(),
            landing: self.place(target, blocks, exclude),
        }
    }

    /// Rows needed to contain every block, never fewer than `min_rows`
    pub fn rows_needed(blocks: &[Block], min_rows: u32) -> u32 {
        blocks
            .iter()
            .map(|b| b.placement().end_row())
            .max()
            .unwrap_or(0)
            .max(min_rows)
    }
}

/// Every pair of blocks sharing at least one cell
pub fn find_overlaps(blocks: &[Block]) -> Vec<(BlockId, BlockId)> {
    let mut overlaps = Vec::new();
    for (i, a) in blocks.iter().enumerate() {
        for b in &blocks[i + 1..] {
            if a.placement().overlaps(&b.placement()) {
                overlaps.push((a.id.clone(), b.id.clone()));
            }
        }
    }
    overlaps
}
