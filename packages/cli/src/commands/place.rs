use crate::config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use pagegrid_common::{Block, GridRect};
use pagegrid_editor::EditorConfig;
use pagegrid_layout::{Breakpoint, GridCell, GridCoordinateSystem};

#[derive(Debug, Args)]
pub struct PlaceArgs {
    /// Blocks file (array of blocks or a page snapshot)
    pub file: String,

    #[arg(short = 'W', long, default_value_t = 2)]
    pub width: u32,

    #[arg(short = 'H', long, default_value_t = 1)]
    pub height: u32,

    /// Preferred column
    #[arg(long, requires = "row")]
    pub col: Option<u32>,

    /// Preferred row
    #[arg(long, requires = "col")]
    pub row: Option<u32>,

    /// Grid to place on (mobile, tablet, desktop)
    #[arg(short, long, default_value = "desktop")]
    pub breakpoint: Breakpoint,
}

/// Where a block lands and how it got there
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub requested: Option<GridRect>,
    pub landing: GridRect,
}

impl Placement {
    pub fn relocated(&self) -> bool {
        self.requested.is_some_and(|r| r != self.landing)
    }
}

pub fn place(args: PlaceArgs, cwd: &str) -> Result<()> {
    let config = config::load(cwd)?;
    let blocks = config::read_blocks(cwd, &args.file)?;

    let preferred = match (args.col, args.row) {
        (Some(col), Some(row)) => Some(GridCell::new(col, row)),
        _ => None,
    };
    let placement = compute(&config, &blocks, args.breakpoint, args.width, args.height, preferred);

    let landing = placement.landing;
    println!(
        "{} {}×{} block lands at col {}, row {} ({})",
        "📍".bright_blue(),
        landing.width,
        landing.height,
        landing.col.to_string().bright_white().bold(),
        landing.row.to_string().bright_white().bold(),
        args.breakpoint
    );

    if let Some(requested) = placement.requested.filter(|_| placement.relocated()) {
        println!(
            "  {} col {}, row {} was unavailable",
            "•".dimmed(),
            requested.col,
            requested.row
        );
    }

    Ok(())
}

fn compute(
    config: &EditorConfig,
    blocks: &[Block],
    breakpoint: Breakpoint,
    width: u32,
    height: u32,
    preferred: Option<GridCell>,
) -> Placement {
    let container_width = if breakpoint == Breakpoint::source() {
        config.container_width
    } else {
        breakpoint.reference_width()
    };
    let grid = GridCoordinateSystem::new(config.grid.for_breakpoint(breakpoint).clone(), container_width)
        .with_max_rows(config.grid.max_rows);

    match preferred {
        Some(cell) => {
            let requested = GridRect::new(cell.col, cell.row, width, height);
            Placement {
                requested: Some(requested),
                landing: grid.place(requested, blocks, None),
            }
        }
        None => {
            let cell = grid.find_available_position(width, height, blocks, None, None);
            Placement {
                requested: None,
                landing: GridRect::new(cell.col, cell.row, width.clamp(1, grid.columns()), height.max(1)),
            }
        }
    }
}
