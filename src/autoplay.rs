//! Scripted player for headless runs
//!
//! Picks the first in-bounds placement of the level's target and drops one
//! sphere over each of its cells, waiting for the next sphere to hang at the
//! launch point between drops.

use std::collections::VecDeque;

use glam::Vec3;

use crate::consts::SIM_DT;
use crate::error::SessionError;
use crate::sim::grid::CellCoord;
use crate::sim::physics::Physics;
use crate::sim::shapes::TargetShape;
use crate::sim::state::{GameEvent, Session, SessionPhase};
use crate::sim::tick::{TickInput, tick};

/// Height above a cell center the sphere is released from
const DROP_HEIGHT: f32 = 2.5;

/// Cells of the first placement of `target` that fits an `n`×`n` grid
pub fn plan_cells(target: TargetShape, n: usize) -> Option<Vec<CellCoord>> {
    for variant in target.variants() {
        for row in 0..n {
            for col in 0..n {
                let origin = CellCoord::new(row, col);
                let cells: Option<Vec<CellCoord>> = variant
                    .offsets()
                    .iter()
                    .map(|&(dr, dc)| origin.offset(dr, dc, n))
                    .collect();
                if cells.is_some() {
                    return cells;
                }
            }
        }
    }
    None
}

#[derive(Debug, Default)]
pub struct Autoplayer {
    /// Level the queue was planned for
    planned: Option<usize>,
    queue: VecDeque<CellCoord>,
}

impl Autoplayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cells still to drop on the current level
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Input for the next tick
    pub fn next_input<P: Physics>(&mut self, session: &Session<P>) -> TickInput {
        if session.phase() != SessionPhase::Active {
            return TickInput::default();
        }
        let Some(level) = session.level() else {
            return TickInput::default();
        };

        if self.planned != Some(level.index) {
            self.planned = Some(level.index);
            self.queue = plan_cells(level.config.target, level.grid.size())
                .unwrap_or_default()
                .into();
            log::info!(
                "Autoplay level {}: {} drops for {}",
                level.index,
                self.queue.len(),
                level.config.target
            );
        }

        if level.waiting_sphere().is_none() {
            return TickInput::default();
        }
        let Some(coord) = self.queue.pop_front() else {
            return TickInput::default();
        };
        match level.grid.cell_center(coord) {
            Some(center) => TickInput {
                drop_at: Some(center + Vec3::Y * DROP_HEIGHT),
                ..Default::default()
            },
            None => TickInput::default(),
        }
    }
}

/// How an autoplay run ended
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub levels_cleared: usize,
    pub shots: u32,
    /// Every level cleared
    pub completed: bool,
    /// Stopped on a level whose shot budget ran out
    pub out_of_shots: bool,
}

/// Play `session` until it ends, runs out of shots, or `max_frames` ticks pass.
/// Every drained event is handed to `on_event`.
pub fn run<P: Physics>(
    session: &mut Session<P>,
    max_frames: u64,
    mut on_event: impl FnMut(&GameEvent),
) -> Result<RunSummary, SessionError> {
    let mut player = Autoplayer::new();
    let mut summary = RunSummary::default();

    while summary.frames < max_frames {
        let input = player.next_input(session);
        tick(session, &input, SIM_DT)?;
        summary.frames += 1;

        for event in session.drain_events() {
            match &event {
                GameEvent::SphereLaunched { .. } => summary.shots += 1,
                GameEvent::LevelComplete { .. } => summary.levels_cleared += 1,
                GameEvent::SessionComplete { .. } => summary.completed = true,
                GameEvent::OutOfShots { .. } => summary.out_of_shots = true,
                _ => {}
            }
            on_event(&event);
        }

        if summary.completed || summary.out_of_shots {
            break;
        }
    }
    Ok(summary)
}
