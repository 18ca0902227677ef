//! Tracked spheres and shot mechanics
//!
//! A level always has at most one *waiting* sphere: a fixed body hanging at
//! the launch point. Charging the power gauge and releasing it swaps that
//! fixed body for a dynamic one carrying the shot impulse.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::bounds::BoundingSphere;
use super::physics::{BodyDesc, BodyHandle, Physics};
use crate::consts::*;

/// Planet texture a sphere is drawn with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SphereSkin {
    Earth,
    Jupiter,
    Mars,
    Mercury,
    Neptune,
    Saturn,
    Uranus,
    Venus,
}

impl SphereSkin {
    pub const ALL: [SphereSkin; 8] = [
        SphereSkin::Earth,
        SphereSkin::Jupiter,
        SphereSkin::Mars,
        SphereSkin::Mercury,
        SphereSkin::Neptune,
        SphereSkin::Saturn,
        SphereSkin::Uranus,
        SphereSkin::Venus,
    ];

    /// Texture file the host loads for this skin
    pub fn texture_file(&self) -> &'static str {
        match self {
            SphereSkin::Earth => "2k_earth_daymap.jpg",
            SphereSkin::Jupiter => "2k_jupiter.jpg",
            SphereSkin::Mars => "2k_mars.jpg",
            SphereSkin::Mercury => "2k_mercury.jpg",
            SphereSkin::Neptune => "2k_neptune.jpg",
            SphereSkin::Saturn => "2k_saturn.jpg",
            SphereSkin::Uranus => "2k_uranus.jpg",
            SphereSkin::Venus => "2k_venus_surface.jpg",
        }
    }

    pub fn random(rng: &mut impl Rng) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

/// A sphere whose position feeds the occupancy grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedSphere {
    pub id: u32,
    pub body: BodyHandle,
    pub radius: f32,
    /// Last position read from physics
    pub position: Vec3,
    /// Fixed at the launch point, not shot yet
    pub waiting: bool,
    pub skin: SphereSkin,
    /// Consecutive ticks spent below the stop threshold
    #[serde(default)]
    pub rest_ticks: u32,
}

impl TrackedSphere {
    /// Create a waiting sphere (fixed body) at `position`
    pub fn spawn_waiting<P: Physics>(
        world: &mut P,
        id: u32,
        position: Vec3,
        radius: f32,
        skin: SphereSkin,
    ) -> Self {
        let body = world.create_body(BodyDesc::fixed_sphere(position, radius));
        log::debug!("Sphere {} waiting at {}", id, position);
        Self {
            id,
            body,
            radius,
            position,
            waiting: true,
            skin,
            rest_ticks: 0,
        }
    }

    #[inline]
    pub fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere::new(self.position, self.radius)
    }

    /// Swap the fixed body for a dynamic one at `from` and apply `impulse`
    pub fn launch<P: Physics>(&mut self, world: &mut P, from: Vec3, impulse: Vec3) {
        world.remove_body(self.body);
        let body = world.create_body(BodyDesc::dynamic_sphere(from, self.radius));
        world.apply_impulse(body, impulse);
        self.body = body;
        self.position = from;
        self.waiting = false;
        self.rest_ticks = 0;
        log::debug!("Sphere {} launched from {} with impulse {}", self.id, from, impulse);
    }

    /// Refresh `position` from physics; false if the body no longer exists
    pub fn sync<P: Physics>(&mut self, world: &P) -> bool {
        match world.translation(self.body) {
            Some(pos) => {
                self.position = pos;
                true
            }
            None => false,
        }
    }
}

/// True once a shot sphere has (nearly) stopped; waiting or missing spheres never count
pub fn is_stopped<P: Physics>(world: &P, sphere: &TrackedSphere, threshold: f32) -> bool {
    if sphere.waiting {
        return false;
    }
    world
        .linvel(sphere.body)
        .is_some_and(|v| v.length() < threshold)
}

/// Impulse for a shot: push from the clicked surface point through the center,
/// biased upward so flat shots still lift off
pub fn shot_impulse(center: Vec3, click_point: Vec3, power: f32) -> Vec3 {
    let mut direction = (center - click_point).normalize_or_zero();
    direction.y += SHOT_LIFT;
    let direction = direction.normalize_or(Vec3::Y);
    direction * power * IMPULSE_SCALE
}

/// Ping-pong power gauge charged while the button is held
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerGauge {
    pub power: f32,
    /// +1 rising, -1 falling
    pub direction: f32,
    pub charging: bool,
    /// Multiplier on the gauge speed
    pub rate_scale: f32,
}

impl Default for PowerGauge {
    fn default() -> Self {
        Self {
            power: 0.0,
            direction: 1.0,
            charging: false,
            rate_scale: 1.0,
        }
    }
}

impl PowerGauge {
    pub fn with_rate_scale(rate_scale: f32) -> Self {
        Self {
            rate_scale,
            ..Default::default()
        }
    }

    /// Gauge units per second
    #[inline]
    pub fn rate(&self) -> f32 {
        POWER_STEP / POWER_INTERVAL * self.rate_scale
    }

    pub fn start(&mut self) {
        self.charging = true;
        self.power = POWER_MIN;
        self.direction = 1.0;
    }

    pub fn advance(&mut self, dt: f32) {
        if !self.charging {
            return;
        }
        let span = POWER_MAX - POWER_MIN;
        if span <= 0.0 {
            return;
        }
        // Reflect the overshoot back into range so long frames stay in bounds
        let mut remaining = self.rate() * dt;
        if !remaining.is_finite() {
            return;
        }
        remaining %= 2.0 * span;
        while remaining > 0.0 {
            let room = if self.direction > 0.0 {
                POWER_MAX - self.power
            } else {
                self.power - POWER_MIN
            };
            if remaining <= room {
                self.power += self.direction * remaining;
                break;
            }
            self.power += self.direction * room;
            remaining -= room;
            self.direction = -self.direction;
        }
    }

    /// Stop charging and return the power, None if not charging
    pub fn release(&mut self) -> Option<f32> {
        if !self.charging {
            return None;
        }
        self.charging = false;
        let power = self.power;
        self.power = 0.0;
        Some(power)
    }

    pub fn cancel(&mut self) {
        self.charging = false;
        self.power = 0.0;
    }

    /// 0..1 for the gauge bar
    pub fn fraction(&self) -> f32 {
        if !self.charging {
            return 0.0;
        }
        ((self.power - POWER_MIN) / (POWER_MAX - POWER_MIN)).clamp(0.0, 1.0)
    }
}
