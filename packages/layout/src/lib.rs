//! # Pagegrid Layout
//!
//! Pure grid math for the block editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ config: per-breakpoint grid geometry        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ grid: pixel ↔ cell, collisions, first-fit   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ responsive: desktop → tablet/mobile repack  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Nothing in this crate persists or mutates a caller's blocks. Every
//! function takes the current collection by reference and returns new
//! geometry.

mod config;
mod grid;
mod responsive;

pub use config::{Breakpoint, BreakpointGridConfig, BreakpointWidths, GridConfig};
pub use grid::{
    find_overlaps, DropIndicator, GridCell, GridCoordinateSystem, PixelRect, SEARCH_SLACK_ROWS,
};
pub use responsive::{
    needs_regeneration, LayoutSignature, ResponsiveLayout, ResponsiveLayoutTransformer,
    TALL_BLOCK_ROWS,
};

// Re-export the shared geometry types for convenience
pub use pagegrid_common::{Block, BlockId, GridRect};
