//! Session state: the single owner of the current level
//!
//! Replaces module-level globals with one controller. Level switches build the
//! new bundle first and only then swap it in, so a failed load leaves the
//! previous level untouched.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::grid::Occupancy;
use super::level::{Level, LevelPack};
use super::physics::{BallWorld, Physics};
use super::shapes::{MatchResult, ShapeVariant, TargetShape};
use super::sphere::{PowerGauge, SphereSkin};
use crate::error::SessionError;
use crate::settings::Settings;

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// A level switch is pending; the next tick builds it
    Loading,
    /// Player is shooting spheres
    Active,
    /// Target shape found; input frozen while the completion indicator shows
    Matched,
    /// Last level cleared
    Ended,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Loading => "loading",
            SessionPhase::Active => "active",
            SessionPhase::Matched => "matched",
            SessionPhase::Ended => "ended",
        }
    }
}

/// Notifications for the host (UI, audio, logging)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    LevelStarted {
        index: usize,
        name: String,
        target: TargetShape,
    },
    SphereSpawned {
        id: u32,
        skin: SphereSkin,
    },
    SphereLaunched {
        id: u32,
        shots: u32,
    },
    /// Sphere fell off the map and was removed
    SphereLost {
        id: u32,
    },
    LevelComplete {
        index: usize,
        variant: ShapeVariant,
        shots: u32,
    },
    /// Budget spent and every sphere at rest without a match
    OutOfShots {
        index: usize,
    },
    SessionComplete {
        levels: usize,
    },
}

pub struct Session<P: Physics = BallWorld> {
    pub(crate) pack: LevelPack,
    pub(crate) settings: Settings,
    /// Run seed for reproducibility
    pub seed: u64,
    pub(crate) rng: Pcg32,
    pub(crate) phase: SessionPhase,
    /// Phase restored if a pending load fails
    pub(crate) resume_phase: SessionPhase,
    pub(crate) level: Option<Level<P>>,
    pub(crate) pending: Option<usize>,
    /// Simulation tick counter
    pub(crate) time_ticks: u64,
    /// Ticks spent in `Matched`
    pub(crate) matched_ticks: u32,
    pub(crate) last_match: MatchResult,
    pub(crate) events: Vec<GameEvent>,
    next_id: u32,
}

impl<P: Physics> Session<P> {
    /// New session; the first tick loads level 0
    pub fn new(pack: LevelPack, settings: Settings, seed: u64) -> Result<Self, SessionError> {
        if pack.is_empty() {
            return Err(SessionError::EmptyLevelPack);
        }
        Ok(Self {
            pack,
            settings,
            seed,
            rng: Pcg32::seed_from_u64(seed),
            phase: SessionPhase::Loading,
            resume_phase: SessionPhase::Loading,
            level: None,
            pending: Some(0),
            time_ticks: 0,
            matched_ticks: 0,
            last_match: MatchResult::NotFound,
            events: Vec::new(),
            next_id: 1,
        })
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn level(&self) -> Option<&Level<P>> {
        self.level.as_ref()
    }

    pub fn pack(&self) -> &LevelPack {
        &self.pack
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Swap settings mid-session; the gauge speed applies to the live level too
    pub fn set_settings(&mut self, settings: Settings) {
        if let Some(level) = self.level.as_mut() {
            level.gauge.rate_scale = settings.power_rate_scale;
        }
        self.settings = settings;
    }

    pub fn time_ticks(&self) -> u64 {
        self.time_ticks
    }

    /// Result of the most recent shape check
    pub fn last_match(&self) -> MatchResult {
        self.last_match
    }

    pub fn current_index(&self) -> Option<usize> {
        self.level.as_ref().map(|l| l.index)
    }

    pub fn occupancy(&self) -> Option<Occupancy> {
        self.level.as_ref().map(|l| l.grid.occupancy())
    }

    /// Gauge bar fill (0 when idle)
    pub fn power_fraction(&self) -> f32 {
        self.level.as_ref().map_or(0.0, |l| l.gauge.fraction())
    }

    /// Take all queued events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Queue a switch to `index`; the next tick performs it
    pub fn request_level(&mut self, index: usize) -> Result<(), SessionError> {
        self.pack.get(index)?;
        if self.phase != SessionPhase::Loading {
            self.resume_phase = self.phase;
        }
        self.pending = Some(index);
        self.phase = SessionPhase::Loading;
        Ok(())
    }

    /// Reload the current level from its config
    pub fn restart(&mut self) -> Result<(), SessionError> {
        match self.current_index() {
            Some(index) => self.request_level(index),
            None => Ok(()),
        }
    }

    /// Leave `Matched`: queue the next level or end the session
    pub fn advance(&mut self) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Matched {
            return Ok(());
        }
        let next = self.current_index().map_or(0, |i| i + 1);
        if next < self.pack.len() {
            self.request_level(next)
        } else {
            log::info!("All {} levels cleared", self.pack.len());
            self.phase = SessionPhase::Ended;
            self.events.push(GameEvent::SessionComplete {
                levels: self.pack.len(),
            });
            Ok(())
        }
    }

    /// Build the pending level and swap it in
    pub(crate) fn load_pending(&mut self) -> Result<(), SessionError> {
        let Some(index) = self.pending.take() else {
            return Ok(());
        };
        let config = self.pack.get(index)?.clone();
        log::info!("Loading level {} '{}' (target {})", index, config.name, config.target);

        let mut level = match Level::<P>::load(index, &config) {
            Ok(level) => level,
            Err(e) => {
                log::error!("Level switch to {} aborted: {}", index, e);
                if self.level.is_some() {
                    self.phase = self.resume_phase;
                } else {
                    // Nothing to fall back to: every tick reports the failure
                    self.pending = Some(index);
                }
                return Err(e);
            }
        };
        level.gauge = PowerGauge::with_rate_scale(self.settings.power_rate_scale);
        self.events.push(GameEvent::LevelStarted {
            index,
            name: config.name,
            target: config.target,
        });

        if !level.out_of_shots() {
            let id = self.next_entity_id();
            let skin = SphereSkin::random(&mut self.rng);
            level.spawn_waiting(id, skin);
            self.events.push(GameEvent::SphereSpawned { id, skin });
        }

        self.level = Some(level);
        self.phase = SessionPhase::Active;
        self.matched_ticks = 0;
        self.last_match = MatchResult::NotFound;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::level::LevelConfig;

    fn session() -> Session {
        Session::new(LevelPack::builtin(), Settings::default(), 42).unwrap()
    }

    #[test]
    fn test_new_session_is_loading() {
        let s = session();
        assert_eq!(s.phase(), SessionPhase::Loading);
        assert!(s.level().is_none());
        assert_eq!(s.power_fraction(), 0.0);
    }

    #[test]
    fn test_empty_pack_rejected() {
        let pack = LevelPack { levels: Vec::new() };
        assert!(matches!(
            Session::<BallWorld>::new(pack, Settings::default(), 1),
            Err(SessionError::EmptyLevelPack)
        ));
    }

    #[test]
    fn test_load_pending_spawns_waiting_sphere() {
        let mut s = session();
        s.load_pending().unwrap();
        assert_eq!(s.phase(), SessionPhase::Active);
        let level = s.level().unwrap();
        assert_eq!(level.index, 0);
        assert_eq!(level.spheres.len(), 1);
        assert!(level.waiting_sphere().is_some());

        let events = s.drain_events();
        assert!(matches!(events[0], GameEvent::LevelStarted { index: 0, .. }));
        assert!(matches!(events[1], GameEvent::SphereSpawned { id: 1, .. }));
        assert!(s.drain_events().is_empty());
    }

    #[test]
    fn test_failed_switch_keeps_current_level() {
        let mut pack = LevelPack::builtin();
        let mut broken = LevelConfig::standard("broken", TargetShape::T);
        broken.world = None;
        pack.levels.push(broken);
        let mut s: Session = Session::new(pack, Settings::default(), 3).unwrap();
        s.load_pending().unwrap();

        s.request_level(4).unwrap();
        assert_eq!(s.phase(), SessionPhase::Loading);
        let err = s.load_pending().unwrap_err();
        assert_eq!(err, SessionError::MissingSnapshot { level: "broken".into() });
        assert_eq!(s.phase(), SessionPhase::Active);
        assert_eq!(s.current_index(), Some(0));
    }

    #[test]
    fn test_set_settings_updates_live_gauge() {
        let mut s = session();
        s.load_pending().unwrap();
        s.set_settings(Settings {
            power_rate_scale: 2.0,
            ..Default::default()
        });
        assert_eq!(s.level().unwrap().gauge.rate_scale, 2.0);
        assert_eq!(s.settings().power_rate_scale, 2.0);
    }

    #[test]
    fn test_failed_first_level_keeps_failing() {
        let mut broken = LevelConfig::standard("broken", TargetShape::Line);
        broken.world = None;
        let pack = LevelPack {
            levels: vec![broken, LevelConfig::standard("ok", TargetShape::T)],
        };
        let mut s: Session = Session::new(pack, Settings::default(), 8).unwrap();
        let expected = SessionError::MissingSnapshot { level: "broken".into() };

        for _ in 0..3 {
            assert_eq!(s.load_pending(), Err(expected.clone()));
            assert_eq!(s.phase(), SessionPhase::Loading);
            assert!(s.level().is_none());
        }
        assert!(s.drain_events().is_empty());

        // Jumping past the broken level recovers
        s.request_level(1).unwrap();
        s.load_pending().unwrap();
        assert_eq!(s.phase(), SessionPhase::Active);
        assert_eq!(s.current_index(), Some(1));
    }

    #[test]
    fn test_request_out_of_range() {
        let mut s = session();
        assert_eq!(
            s.request_level(10),
            Err(SessionError::LevelOutOfRange { index: 10, len: 4 })
        );
    }

    #[test]
    fn test_advance_only_from_matched() {
        let mut s = session();
        s.load_pending().unwrap();
        s.advance().unwrap();
        assert_eq!(s.phase(), SessionPhase::Active);

        s.phase = SessionPhase::Matched;
        s.advance().unwrap();
        assert_eq!(s.phase(), SessionPhase::Loading);
        s.load_pending().unwrap();
        assert_eq!(s.current_index(), Some(1));
    }

    #[test]
    fn test_advance_past_last_level_ends() {
        let pack = LevelPack {
            levels: vec![LevelConfig::standard("only", TargetShape::Line)],
        };
        let mut s: Session = Session::new(pack, Settings::default(), 5).unwrap();
        s.load_pending().unwrap();
        s.phase = SessionPhase::Matched;
        s.advance().unwrap();
        assert_eq!(s.phase(), SessionPhase::Ended);
        assert!(s
            .drain_events()
            .contains(&GameEvent::SessionComplete { levels: 1 }));
    }
}
