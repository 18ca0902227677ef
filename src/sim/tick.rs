//! Fixed timestep simulation tick
//!
//! One call advances the session by one frame, strictly in order:
//! input → physics step → position sync → culling → occupancy → shape match
//! → phase transition.

use glam::Vec3;

use super::level::Level;
use super::physics::Physics;
use super::shapes::{MatchResult, check_target};
use super::sphere::{SphereSkin, is_stopped, shot_impulse};
use super::state::{GameEvent, Session, SessionPhase};
use crate::consts::SETTLE_TICKS;
use crate::error::SessionError;

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Start charging the power gauge (button pressed on the waiting sphere)
    pub charge: bool,
    /// Release the charge; the point on the waiting sphere that was clicked
    pub release: Option<Vec3>,
    /// Drop the waiting sphere at this position with no impulse (debug/demo)
    pub drop_at: Option<Vec3>,
    /// Reload the current level
    pub restart: bool,
}

/// Advance the session by one fixed timestep
pub fn tick<P: Physics>(
    session: &mut Session<P>,
    input: &TickInput,
    dt: f32,
) -> Result<(), SessionError> {
    if input.restart && session.phase != SessionPhase::Ended {
        session.restart()?;
    }

    match session.phase {
        SessionPhase::Ended => return Ok(()),
        SessionPhase::Loading => return session.load_pending(),
        SessionPhase::Active | SessionPhase::Matched => {}
    }

    session.time_ticks += 1;
    let phase = session.phase;
    let fall_limit = session.settings.fall_limit;
    let stop_threshold = session.settings.stop_threshold;

    let Some(level) = session.level.as_mut() else {
        return Ok(());
    };

    // Input is frozen once the target is matched
    if phase == SessionPhase::Active {
        apply_input(level, input, &mut session.events);
    }
    level.gauge.advance(dt);

    level.world.step(dt);
    update_intersections(level, fall_limit, stop_threshold, &mut session.events);

    match phase {
        SessionPhase::Active => {
            let result = check_target(&level.grid.occupancy(), level.config.target);
            session.last_match = result;
            if let MatchResult::Found(variant) = result {
                log::info!(
                    "Level {} '{}' complete: {} in {} shots",
                    level.index,
                    level.config.name,
                    variant,
                    level.shots
                );
                level.gauge.cancel();
                session.events.push(GameEvent::LevelComplete {
                    index: level.index,
                    variant,
                    shots: level.shots,
                });
                session.phase = SessionPhase::Matched;
                session.matched_ticks = 0;
            } else if settled(level) {
                if !level.out_of_shots() {
                    let id = session.next_entity_id();
                    let skin = SphereSkin::random(&mut session.rng);
                    // Re-borrow after the id/rng calls
                    if let Some(level) = session.level.as_mut() {
                        level.spawn_waiting(id, skin);
                    }
                    session.events.push(GameEvent::SphereSpawned { id, skin });
                } else if !level.exhausted_reported {
                    log::info!("Level {} out of shots", level.index);
                    level.exhausted_reported = true;
                    session.events.push(GameEvent::OutOfShots { index: level.index });
                }
            }
        }
        SessionPhase::Matched => {
            session.matched_ticks += 1;
            if session.settings.auto_advance
                && session.matched_ticks >= session.settings.effective_match_hold()
            {
                session.advance()?;
            }
        }
        SessionPhase::Loading | SessionPhase::Ended => {}
    }

    Ok(())
}

/// Gauge and launch handling for the waiting sphere
fn apply_input<P: Physics>(level: &mut Level<P>, input: &TickInput, events: &mut Vec<GameEvent>) {
    if input.charge && !level.gauge.charging && level.waiting_sphere().is_some() {
        level.gauge.start();
    }

    let launch = if let Some(target) = input.drop_at {
        level.gauge.cancel();
        Some((target, Vec3::ZERO))
    } else if let Some(click) = input.release {
        level.gauge.release().and_then(|power| {
            level
                .waiting_sphere()
                .map(|s| (s.position, shot_impulse(s.position, click, power)))
        })
    } else {
        None
    };

    let Some((from, impulse)) = launch else {
        return;
    };
    let Level {
        world,
        spheres,
        shots,
        ..
    } = level;
    if let Some(sphere) = spheres.iter_mut().find(|s| s.waiting) {
        sphere.launch(world, from, impulse);
        *shots += 1;
        events.push(GameEvent::SphereLaunched {
            id: sphere.id,
            shots: *shots,
        });
    }
}

/// No waiting sphere and every shot sphere at rest for a few ticks
fn settled<P: Physics>(level: &Level<P>) -> bool {
    level.waiting_sphere().is_none() && level.spheres.iter().all(|s| s.rest_ticks >= SETTLE_TICKS)
}

/// Sync sphere positions from physics, drop stale or fallen spheres, and
/// recompute grid occupancy. Must run after the physics step.
pub fn update_intersections<P: Physics>(
    level: &mut Level<P>,
    fall_limit: f32,
    stop_threshold: f32,
    events: &mut Vec<GameEvent>,
) {
    let world = &level.world;
    level.spheres.retain_mut(|s| {
        if !s.sync(world) {
            log::debug!("Sphere {} has no body, no longer tracked", s.id);
            return false;
        }
        s.rest_ticks = if is_stopped(world, s, stop_threshold) {
            s.rest_ticks.saturating_add(1)
        } else {
            0
        };
        true
    });

    let fallen: Vec<u32> = level
        .spheres
        .iter()
        .filter(|s| s.position.y < fall_limit)
        .map(|s| s.id)
        .collect();
    for id in fallen {
        if level.remove_sphere(id).is_some() {
            log::debug!("Sphere {} fell below {}", id, fall_limit);
            events.push(GameEvent::SphereLost { id });
        }
    }

    let bounds: Vec<_> = level.spheres.iter().map(|s| s.bounding_sphere()).collect();
    level.grid.update_occupancy(&bounds);
}
