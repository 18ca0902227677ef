//! Fixed-timestep driver for hosts with a variable frame clock
//!
//! Accumulates wall time, runs whole `SIM_DT` ticks (at most `MAX_SUBSTEPS`
//! per frame) and hands each tick the input gathered since the last one.

use glam::Vec3;

use crate::consts::*;
use crate::error::SessionError;
use crate::sim::physics::{BallWorld, Physics};
use crate::sim::state::Session;
use crate::sim::tick::{TickInput, tick};

pub struct FrameDriver<P: Physics = BallWorld> {
    session: Session<P>,
    accumulator: f32,
    /// Inputs queued for the next tick
    input: TickInput,
}

impl<P: Physics> FrameDriver<P> {
    pub fn new(session: Session<P>) -> Self {
        Self {
            session,
            accumulator: 0.0,
            input: TickInput::default(),
        }
    }

    pub fn session(&self) -> &Session<P> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<P> {
        &mut self.session
    }

    /// Input waiting for the next tick
    pub fn pending_input(&self) -> &TickInput {
        &self.input
    }

    pub fn begin_charge(&mut self) {
        self.input.charge = true;
    }

    pub fn release(&mut self, click: Vec3) {
        self.input.charge = false;
        self.input.release = Some(click);
    }

    pub fn drop_at(&mut self, position: Vec3) {
        self.input.drop_at = Some(position);
    }

    pub fn restart(&mut self) {
        self.input.restart = true;
    }

    /// Run the ticks owed for `dt` seconds; returns how many ran.
    ///
    /// Queued input is consumed by the first tick even when that tick fails,
    /// and a failure drops any remaining backlog.
    pub fn frame(&mut self, dt: f32) -> Result<u32, SessionError> {
        let dt = if dt.is_finite() {
            dt.clamp(0.0, MAX_FRAME_DT)
        } else {
            0.0
        };
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = std::mem::take(&mut self.input);
            self.accumulator -= SIM_DT;
            substeps += 1;
            if let Err(e) = tick(&mut self.session, &input, SIM_DT) {
                self.accumulator = 0.0;
                return Err(e);
            }
        }
        Ok(substeps)
    }
}
