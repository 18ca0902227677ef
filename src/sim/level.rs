//! Level data and the live level bundle
//!
//! A [`LevelConfig`] is pure data (loaded from JSON). A [`Level`] is what the
//! session plays: grid, physics world, tracked spheres and shot bookkeeping,
//! always built and replaced as one unit.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::grid::{Grid, GridConfig};
use super::physics::{BallWorld, Physics, WorldSnapshot};
use super::shapes::TargetShape;
use super::sphere::{PowerGauge, SphereSkin, TrackedSphere};
use crate::consts::*;
use crate::error::SessionError;

fn default_spawn() -> Vec3 {
    SPAWN_POSITION
}

fn default_radius() -> f32 {
    SPHERE_RADIUS
}

/// Static description of a level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub name: String,
    pub target: TargetShape,
    #[serde(default)]
    pub grid: GridConfig,
    /// Launch point of the waiting sphere
    #[serde(default = "default_spawn")]
    pub spawn: Vec3,
    #[serde(default = "default_radius")]
    pub sphere_radius: f32,
    /// Shot budget (None = unlimited)
    #[serde(default)]
    pub max_shots: Option<u32>,
    /// Physics world to restore; required to load the level
    #[serde(default)]
    pub world: Option<WorldSnapshot>,
}

impl LevelConfig {
    /// Level on the default grid with a floor flush with the cell bottoms
    pub fn standard(name: &str, target: TargetShape) -> Self {
        let grid = GridConfig::default();
        Self {
            name: name.to_string(),
            target,
            grid,
            spawn: SPAWN_POSITION,
            sphere_radius: SPHERE_RADIUS,
            max_shots: None,
            world: Some(WorldSnapshot::with_floor(-grid.cell_height / 2.0, 20.0)),
        }
    }
}

/// Ordered list of levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelPack {
    pub levels: Vec<LevelConfig>,
}

impl LevelPack {
    /// One level per shape family
    pub fn builtin() -> Self {
        Self {
            levels: vec![
                LevelConfig::standard("Line", TargetShape::Line),
                LevelConfig::standard("Square", TargetShape::Square),
                LevelConfig::standard("Tee", TargetShape::T),
                LevelConfig::standard("Corner", TargetShape::L),
            ],
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        let pack: LevelPack =
            serde_json::from_str(json).map_err(|e| SessionError::InvalidLevelPack {
                reason: e.to_string(),
            })?;
        if pack.levels.is_empty() {
            return Err(SessionError::EmptyLevelPack);
        }
        Ok(pack)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&LevelConfig, SessionError> {
        self.levels.get(index).ok_or(SessionError::LevelOutOfRange {
            index,
            len: self.levels.len(),
        })
    }
}

/// The playable bundle for one level
#[derive(Debug, Clone)]
pub struct Level<P: Physics = BallWorld> {
    pub index: usize,
    pub config: LevelConfig,
    pub grid: Grid,
    pub world: P,
    /// Sorted by id
    pub spheres: Vec<TrackedSphere>,
    pub gauge: PowerGauge,
    pub shots: u32,
    /// OutOfShots already reported
    pub exhausted_reported: bool,
}

impl<P: Physics> Level<P> {
    /// Build a level from its config; fails without touching any live level
    pub fn load(index: usize, config: &LevelConfig) -> Result<Self, SessionError> {
        let snapshot = config
            .world
            .as_ref()
            .ok_or_else(|| SessionError::MissingSnapshot {
                level: config.name.clone(),
            })?;
        if !(config.sphere_radius > 0.0) || !config.spawn.is_finite() {
            return Err(SessionError::InvalidSnapshot {
                reason: format!("level '{}' has an invalid spawn or sphere radius", config.name),
            });
        }
        config.grid.validate()?;
        let world = P::restore(snapshot)?;
        Ok(Self {
            index,
            config: config.clone(),
            grid: Grid::new(config.grid),
            world,
            spheres: Vec::new(),
            gauge: PowerGauge::default(),
            shots: 0,
            exhausted_reported: false,
        })
    }

    pub fn waiting_sphere(&self) -> Option<&TrackedSphere> {
        self.spheres.iter().find(|s| s.waiting)
    }

    pub fn waiting_sphere_mut(&mut self) -> Option<&mut TrackedSphere> {
        self.spheres.iter_mut().find(|s| s.waiting)
    }

    pub fn shots_remaining(&self) -> Option<u32> {
        self.config.max_shots.map(|max| max.saturating_sub(self.shots))
    }

    pub fn out_of_shots(&self) -> bool {
        self.shots_remaining() == Some(0)
    }

    /// Hang a new waiting sphere at the spawn point
    pub fn spawn_waiting(&mut self, id: u32, skin: SphereSkin) {
        let sphere = TrackedSphere::spawn_waiting(
            &mut self.world,
            id,
            self.config.spawn,
            self.config.sphere_radius,
            skin,
        );
        self.spheres.push(sphere);
    }

    /// Remove a tracked sphere and its body
    pub fn remove_sphere(&mut self, id: u32) -> Option<TrackedSphere> {
        let idx = self.spheres.iter().position(|s| s.id == id)?;
        let sphere = self.spheres.remove(idx);
        self.world.remove_body(sphere.body);
        Some(sphere)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_pack_covers_every_family() {
        let pack = LevelPack::builtin();
        for target in TargetShape::ALL {
            assert!(pack.levels.iter().any(|l| l.target == target));
        }
        assert!(pack.levels.iter().all(|l| l.world.is_some()));
    }

    #[test]
    fn test_pack_from_json_with_defaults() {
        let json = r#"{"levels": [
            {"name": "first", "target": "3x1_1x3", "world": {"colliders": []}},
            {"name": "second", "target": "K", "max_shots": 6, "world": {}}
        ]}"#;
        let pack = LevelPack::from_json(json).unwrap();
        assert_eq!(pack.len(), 2);
        assert_eq!(pack.levels[0].target, TargetShape::Line);
        assert_eq!(pack.levels[0].grid, GridConfig::default());
        assert_eq!(pack.levels[0].spawn, SPAWN_POSITION);
        assert_eq!(pack.levels[1].target, TargetShape::L);
        assert_eq!(pack.levels[1].max_shots, Some(6));
    }

    #[test]
    fn test_pack_errors() {
        assert_eq!(
            LevelPack::from_json(r#"{"levels": []}"#),
            Err(SessionError::EmptyLevelPack)
        );
        assert!(matches!(
            LevelPack::from_json(r#"{"levels": [{"name": "x", "target": "Z"}]}"#),
            Err(SessionError::InvalidLevelPack { .. })
        ));
        assert_eq!(
            LevelPack::builtin().get(9).unwrap_err(),
            SessionError::LevelOutOfRange { index: 9, len: 4 }
        );
    }

    #[test]
    fn test_load_requires_snapshot() {
        let mut config = LevelConfig::standard("bare", TargetShape::T);
        config.world = None;
        let err = Level::<BallWorld>::load(0, &config).unwrap_err();
        assert_eq!(err, SessionError::MissingSnapshot { level: "bare".into() });
    }

    #[test]
    fn test_load_rejects_bad_grid() {
        let mut config = LevelConfig::standard("overlap", TargetShape::Square);
        config.grid.cell_gap = 0.0;
        assert!(matches!(
            Level::<BallWorld>::load(0, &config),
            Err(SessionError::InvalidLevelPack { .. })
        ));

        let json = r#"{"levels": [{"name": "huge", "target": "T", "grid": {"size": 100000}, "world": {}}]}"#;
        let pack = LevelPack::from_json(json).unwrap();
        assert!(matches!(
            Level::<BallWorld>::load(0, &pack.levels[0]),
            Err(SessionError::InvalidLevelPack { .. })
        ));
    }

    #[test]
    fn test_spawn_and_remove_sphere() {
        let config = LevelConfig::standard("one", TargetShape::Square);
        let mut level = Level::<BallWorld>::load(0, &config).unwrap();
        assert!(level.waiting_sphere().is_none());

        level.spawn_waiting(1, SphereSkin::Saturn);
        let body = level.waiting_sphere().unwrap().body;
        assert!(level.world.contains(body));

        let removed = level.remove_sphere(1).unwrap();
        assert_eq!(removed.body, body);
        assert!(!level.world.contains(body));
        assert!(level.remove_sphere(1).is_none());
    }

    #[test]
    fn test_shot_budget() {
        let mut config = LevelConfig::standard("budget", TargetShape::Line);
        config.max_shots = Some(2);
        let mut level = Level::<BallWorld>::load(0, &config).unwrap();
        assert_eq!(level.shots_remaining(), Some(2));
        level.shots = 2;
        assert!(level.out_of_shots());
        level.shots = 3;
        assert_eq!(level.shots_remaining(), Some(0));
    }
}
