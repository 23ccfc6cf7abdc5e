pub mod init;
pub mod pending;
pub mod place;
pub mod responsive;

pub use init::{init, InitArgs};
pub use pending::{pending, PendingArgs};
pub use place::{place, PlaceArgs};
pub use responsive::{responsive, ResponsiveArgs};

use pagegrid_common::Block;

/// One aligned row per block: id, type, placement
pub(crate) fn format_block_row(block: &Block) -> String {
    format!(
        "{:<38} {:<12} col {:>2}  row {:>3}  {}×{}",
        block.id.to_string(),
        block.block_type,
        block.col,
        block.row,
        block.width,
        block.height
    )
}
