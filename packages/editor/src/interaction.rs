//! # Pointer Interaction
//!
//! Drag and resize as an explicit state machine:
//!
//! ```text
//!          Down(block)            Up → commit move
//!   Idle ───────────────▶ Dragging ─────────────┐
//!    ▲  ╲                    │ Move → preview   │
//!    │   ╲ Down(handle)      ▼                  │
//!    │    ╲────────────▶ Resizing ──────────────┤
//!    │                       Up → commit resize │
//!    └──────────── cancel / Up ◀────────────────┘
//! ```
//!
//! Moves only refresh the [`DropIndicator`]; nothing reaches the draft log
//! until `Up` hands an [`InteractionCommit`] back to the orchestrator.

use pagegrid_common::{Block, BlockId, GridRect};
use pagegrid_layout::{DropIndicator, GridCoordinateSystem};
use tracing::debug;

/// What the pointer went down on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerTarget {
    Block(BlockId),
    ResizeHandle(BlockId),
}

/// Pointer input in canvas pixel coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum PointerEvent {
    Down { target: PointerTarget, x: f64, y: f64 },
    Move { x: f64, y: f64 },
    Up,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Dragging {
        block_id: BlockId,
        origin: GridRect,

        /// Cell offset of the pointer inside the block
        grab: (u32, u32),
    },
    Resizing {
        block_id: BlockId,
        origin: GridRect,
    },
}

/// Change to apply once the pointer is released
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionCommit {
    Move { block_id: BlockId, col: u32, row: u32 },
    Resize { block_id: BlockId, width: u32, height: u32 },
}

#[derive(Debug, Clone, Default)]
pub struct InteractionMachine {
    state: InteractionState,
    preview: Option<DropIndicator>,
}

impl InteractionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == InteractionState::Idle
    }

    /// Live drop preview while dragging or resizing
    pub fn preview(&self) -> Option<&DropIndicator> {
        self.preview.as_ref()
    }

    /// Abandon the gesture without committing (Escape)
    pub fn cancel(&mut self) {
        if !self.is_idle() {
            debug!(state = ?self.state, "Interaction cancelled");
        }
        self.state = InteractionState::Idle;
        self.preview = None;
    }

    pub fn handle(
        &mut self,
        event: PointerEvent,
        grid: &GridCoordinateSystem,
        blocks: &[Block],
    ) -> Option<InteractionCommit> {
        match event {
            PointerEvent::Down { target, x, y } => {
                self.begin(target, x, y, grid, blocks);
                None
            }
            PointerEvent::Move { x, y } => {
                if let Some((block_id, target)) = self.target_rect(x, y, grid) {
                    self.preview = Some(grid.drop_indicator(target, blocks, Some(&block_id)));
                }
                None
            }
            PointerEvent::Up => {
                let commit = self.commit();
                self.state = InteractionState::Idle;
                self.preview = None;
                commit
            }
        }
    }

    fn begin(
        &mut self,
        target: PointerTarget,
        x: f64,
        y: f64,
        grid: &GridCoordinateSystem,
        blocks: &[Block],
    ) {
        self.preview = None;

        let (block_id, resizing) = match target {
            PointerTarget::Block(id) => (id, false),
            PointerTarget::ResizeHandle(id) => (id, true),
        };

        let Some(block) = blocks.iter().find(|b| b.id == block_id) else {
            debug!(block_id = %block_id, "Pointer down on unknown block");
            self.state = InteractionState::Idle;
            return;
        };

        let origin = block.placement();
        self.state = if resizing {
            InteractionState::Resizing { block_id, origin }
        } else {
            let cell = grid.pixel_to_grid(x, y);
            InteractionState::Dragging {
                block_id,
                origin,
                grab: (
                    cell.col.saturating_sub(origin.col),
                    cell.row.saturating_sub(origin.row),
                ),
            }
        };
    }

    /// Rectangle the pointer currently describes
    fn target_rect(&self, x: f64, y: f64, grid: &GridCoordinateSystem) -> Option<(BlockId, GridRect)> {
        let cell = grid.pixel_to_grid(x, y);
        match &self.state {
            InteractionState::Idle => None,
            InteractionState::Dragging {
                block_id,
                origin,
                grab,
            } => Some((
                block_id.clone(),
                origin.at(cell.col.saturating_sub(grab.0), cell.row.saturating_sub(grab.1)),
            )),
            InteractionState::Resizing { block_id, origin } => Some((
                block_id.clone(),
                origin.resized(
                    cell.col.saturating_add(1).saturating_sub(origin.col),
                    cell.row.saturating_add(1).saturating_sub(origin.row),
                ),
            )),
        }
    }

    fn commit(&self) -> Option<InteractionCommit> {
        let target = self.preview.as_ref()?.target;
        match &self.state {
            InteractionState::Idle => None,
            InteractionState::Dragging {
                block_id, origin, ..
            } => (target.col != origin.col || target.row != origin.row).then(|| {
                InteractionCommit::Move {
                    block_id: block_id.clone(),
                    col: target.col,
                    row: target.row,
                }
            }),
            InteractionState::Resizing { block_id, origin } => {
                (target.width != origin.width || target.height != origin.height).then(|| {
                    InteractionCommit::Resize {
                        block_id: block_id.clone(),
                        width: target.width,
                        height: target.height,
                    }
                })
            }
        }
    }
}
