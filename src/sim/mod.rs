//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID, then row-major over the grid)
//! - No rendering or platform dependencies

pub mod bounds;
pub mod grid;
pub mod level;
pub mod physics;
pub mod shapes;
pub mod sphere;
pub mod state;
pub mod tick;

pub use bounds::{Aabb, BoundingSphere};
pub use grid::{CellCoord, Grid, GridConfig, Occupancy};
pub use level::{Level, LevelConfig, LevelPack};
pub use physics::{BallWorld, BodyHandle, ColliderDesc, Physics, WorldSnapshot};
pub use shapes::{MatchResult, ShapeVariant, TargetShape, check_all, check_target};
pub use sphere::{PowerGauge, SphereSkin, TrackedSphere, is_stopped, shot_impulse};
pub use state::{GameEvent, Session, SessionPhase};
pub use tick::{TickInput, tick, update_intersections};
