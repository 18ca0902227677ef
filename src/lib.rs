//! Block Shape - a ball-shooting polyomino puzzle
//!
//! Core modules:
//! - `sim`: Deterministic simulation (grid occupancy, shape matching, levels)
//! - `settings`: Player/host preferences
//! - `error`: Session error type
//! - `autoplay`: Scripted player for headless runs and tests
//! - `driver`: Fixed-timestep frame loop for hosts
//!
//! Rendering, asset loading and GUI live in the host (browser or native demo).

pub mod autoplay;
pub mod driver;
pub mod error;
pub mod settings;
pub mod sim;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use error::SessionError;
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    use glam::Vec3;

    /// Fixed simulation timestep (60 Hz, one physics step per frame)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest frame the driver accounts for (tab switches, debugger pauses)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Grid defaults
    pub const GRID_SIZE: usize = 5;
    pub const CELL_SIZE: f32 = 1.0;
    pub const CELL_HEIGHT: f32 = 1.0;
    pub const CELL_GAP: f32 = 2.0;
    /// Largest grid a level may ask for
    pub const MAX_GRID_SIZE: usize = 32;

    /// Sphere defaults
    pub const SPHERE_RADIUS: f32 = 1.0;
    pub const SPAWN_POSITION: Vec3 = Vec3::new(0.0, 5.0, 0.0);
    pub const WAITING_RESTITUTION: f32 = 0.6;
    pub const SHOT_RESTITUTION: f32 = 0.8;
    pub const SPHERE_FRICTION: f32 = 0.3;

    /// Power gauge: +/- POWER_STEP every POWER_INTERVAL seconds
    pub const POWER_MIN: f32 = 5.0;
    pub const POWER_MAX: f32 = 20.0;
    pub const POWER_STEP: f32 = 0.3;
    pub const POWER_INTERVAL: f32 = 0.030;

    /// Shot impulse = direction * power * IMPULSE_SCALE
    pub const IMPULSE_SCALE: f32 = 2.5;
    /// Upward bias added to the shot direction before normalizing
    pub const SHOT_LIFT: f32 = 0.4;

    /// Speed below which a shot sphere counts as stopped
    pub const STOP_THRESHOLD: f32 = 0.05;
    /// Ticks a shot sphere must stay stopped before the next one spawns
    pub const SETTLE_TICKS: u32 = 10;
    /// Spheres below this height are removed
    pub const FALL_LIMIT: f32 = -20.0;

    /// Ticks to hold the completion indicator before moving on (2 seconds)
    pub const MATCH_HOLD_TICKS: u32 = 2 * 60;

    pub const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);
}

/// Center of cell `index` along one grid axis
///
/// `x = (size + gap) * (index - (n - 1) / 2)`
#[inline]
pub fn cell_axis_offset(index: usize, grid_size: usize, cell_size: f32, cell_gap: f32) -> f32 {
    let half = (grid_size as f32 - 1.0) / 2.0;
    (cell_size + cell_gap) * (index as f32 - half)
}

