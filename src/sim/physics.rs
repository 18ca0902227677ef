//! Physics seam and the built-in sphere world
//!
//! The session only needs a handful of rigid-body operations: create/remove
//! sphere bodies, read their translation and velocity, apply an impulse, and
//! step. [`Physics`] is that contract; a host can back it with a full engine.
//! [`BallWorld`] is the minimal implementation used headlessly: spheres
//! against static boxes, no sphere/sphere contact.

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::bounds::Aabb;
use crate::consts::*;
use crate::error::SessionError;

/// Bounce speeds below this are absorbed (prevents resting jitter)
const REST_BOUNCE_SPEED: f32 = 0.5;
/// Default static collider restitution (combined by averaging)
const COLLIDER_RESTITUTION: f32 = 0.0;
/// Default static collider friction (combined by averaging)
const COLLIDER_FRICTION: f32 = 0.5;

/// Opaque reference to a body in a physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// Never moves (waiting sphere)
    Fixed,
    /// Integrated every step
    Dynamic,
}

/// Sphere body description
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub position: Vec3,
    pub radius: f32,
    pub restitution: f32,
    pub friction: f32,
}

impl BodyDesc {
    /// Sphere hanging at the launch point
    pub fn fixed_sphere(position: Vec3, radius: f32) -> Self {
        Self {
            kind: BodyKind::Fixed,
            position,
            radius,
            restitution: WAITING_RESTITUTION,
            friction: SPHERE_FRICTION,
        }
    }

    /// Sphere in flight
    pub fn dynamic_sphere(position: Vec3, radius: f32) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            position,
            radius,
            restitution: SHOT_RESTITUTION,
            friction: SPHERE_FRICTION,
        }
    }

    /// Unit density, like common engines' default
    pub fn mass(&self) -> f32 {
        4.0 / 3.0 * std::f32::consts::PI * self.radius.powi(3)
    }
}

/// Rigid-body operations the session relies on
pub trait Physics {
    /// Build a world from snapshot data; malformed data is fatal
    fn restore(snapshot: &WorldSnapshot) -> Result<Self, SessionError>
    where
        Self: Sized;

    /// Capture the world so it can be restored later
    fn snapshot(&self) -> WorldSnapshot;

    /// Advance the simulation by `dt` seconds
    fn step(&mut self, dt: f32);

    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle;

    /// Returns false if the handle was already gone
    fn remove_body(&mut self, handle: BodyHandle) -> bool;

    fn translation(&self, handle: BodyHandle) -> Option<Vec3>;

    fn linvel(&self, handle: BodyHandle) -> Option<Vec3>;

    /// Instant velocity change of `impulse / mass` (ignored for fixed bodies)
    fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec3);

    fn contains(&self, handle: BodyHandle) -> bool {
        self.translation(handle).is_some()
    }
}

/// Static collider as stored in level data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ColliderDesc {
    Cuboid {
        center: Vec3,
        half_extents: Vec3,
        #[serde(default)]
        restitution: Option<f32>,
        #[serde(default)]
        friction: Option<f32>,
    },
    /// Triangle mesh from a model; reduced to its bounding box
    Mesh {
        #[serde(default)]
        name: String,
        #[serde(default)]
        position: Vec3,
        /// Flat xyz triples
        vertices: Vec<f32>,
        #[serde(default)]
        indices: Option<Vec<u32>>,
    },
}

/// A body captured in a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodySnapshot {
    pub handle: BodyHandle,
    pub desc: BodyDesc,
    #[serde(default)]
    pub velocity: Vec3,
}

/// Serializable physics world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    #[serde(default = "default_gravity")]
    pub gravity: Vec3,
    #[serde(default)]
    pub colliders: Vec<ColliderDesc>,
    #[serde(default)]
    pub bodies: Vec<BodySnapshot>,
}

fn default_gravity() -> Vec3 {
    GRAVITY
}

impl Default for WorldSnapshot {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            colliders: Vec::new(),
            bodies: Vec::new(),
        }
    }
}

impl WorldSnapshot {
    /// Flat floor whose top face sits at `top_y`
    pub fn with_floor(top_y: f32, half_width: f32) -> Self {
        Self {
            colliders: vec![ColliderDesc::Cuboid {
                center: Vec3::new(0.0, top_y - 0.5, 0.0),
                half_extents: Vec3::new(half_width, 0.5, half_width),
                restitution: None,
                friction: None,
            }],
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        serde_json::from_str(json).map_err(|e| SessionError::InvalidSnapshot {
            reason: e.to_string(),
        })
    }

    pub fn to_json(&self) -> Result<String, SessionError> {
        serde_json::to_string(self).map_err(|e| SessionError::InvalidSnapshot {
            reason: e.to_string(),
        })
    }
}

/// A static box in the world
#[derive(Debug, Clone, Copy, PartialEq)]
struct StaticBox {
    bounds: Aabb,
    restitution: f32,
    friction: f32,
}

#[derive(Debug, Clone, Copy)]
struct Body {
    desc: BodyDesc,
    position: Vec3,
    velocity: Vec3,
}

/// Minimal sphere world: gravity, static boxes, bounce and friction
#[derive(Debug, Clone)]
pub struct BallWorld {
    gravity: Vec3,
    colliders: Vec<StaticBox>,
    /// Ordered by handle for deterministic stepping
    bodies: BTreeMap<BodyHandle, Body>,
    /// Level data kept so snapshots round-trip
    collider_descs: Vec<ColliderDesc>,
    next_handle: u32,
}

impl BallWorld {
    pub fn new(gravity: Vec3) -> Self {
        Self {
            gravity,
            colliders: Vec::new(),
            bodies: BTreeMap::new(),
            collider_descs: Vec::new(),
            next_handle: 1,
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    /// Add a static collider; returns false if the collider was skipped
    pub fn add_collider(&mut self, desc: &ColliderDesc) -> Result<bool, SessionError> {
        let collider = match desc {
            ColliderDesc::Cuboid {
                center,
                half_extents,
                restitution,
                friction,
            } => {
                if !center.is_finite()
                    || !half_extents.is_finite()
                    || half_extents.cmple(Vec3::ZERO).any()
                {
                    return Err(SessionError::InvalidSnapshot {
                        reason: format!("cuboid at {center} has invalid extents {half_extents}"),
                    });
                }
                StaticBox {
                    bounds: Aabb::from_center_size(*center, *half_extents * 2.0),
                    restitution: restitution.unwrap_or(COLLIDER_RESTITUTION),
                    friction: friction.unwrap_or(COLLIDER_FRICTION),
                }
            }
            ColliderDesc::Mesh {
                name,
                position,
                vertices,
                indices,
            } => {
                let has_indices = indices.as_ref().is_some_and(|i| !i.is_empty());
                if vertices.is_empty() || vertices.len() % 3 != 0 || !has_indices {
                    log::warn!("Skipping mesh '{}' - invalid geometry for collider", name);
                    return Ok(false);
                }
                let points = vertices
                    .chunks_exact(3)
                    .map(|v| Vec3::new(v[0], v[1], v[2]));
                let Some(bounds) = Aabb::from_points(points) else {
                    return Ok(false);
                };
                if !bounds.min.is_finite() || !bounds.max.is_finite() {
                    log::warn!("Skipping mesh '{}' - non-finite vertices", name);
                    return Ok(false);
                }
                StaticBox {
                    bounds: bounds.translated(*position),
                    restitution: COLLIDER_RESTITUTION,
                    friction: COLLIDER_FRICTION,
                }
            }
        };
        self.colliders.push(collider);
        self.collider_descs.push(desc.clone());
        Ok(true)
    }

    fn insert_body(&mut self, handle: BodyHandle, desc: BodyDesc, velocity: Vec3) {
        self.bodies.insert(
            handle,
            Body {
                desc,
                position: desc.position,
                velocity,
            },
        );
        self.next_handle = self.next_handle.max(handle.0 + 1);
    }

    /// Push a sphere out of every static box it overlaps; true if it touched any
    fn resolve_contacts(body: &mut Body, colliders: &[StaticBox], gravity: f32, dt: f32) -> bool {
        let radius = body.desc.radius;
        let mut touched = false;

        for collider in colliders {
            let closest = collider.bounds.closest_point(body.position);
            let delta = body.position - closest;
            let dist_sq = delta.length_squared();
            if dist_sq > radius * radius {
                continue;
            }
            touched = true;

            let (normal, depth) = if dist_sq > 1e-8 {
                let dist = dist_sq.sqrt();
                (delta / dist, radius - dist)
            } else {
                // Center inside the box: lift out through the top face
                (Vec3::Y, collider.bounds.max.y - body.position.y + radius)
            };
            body.position += normal * depth;

            let vn = body.velocity.dot(normal);
            if vn >= 0.0 {
                continue;
            }
            let restitution = (body.desc.restitution + collider.restitution) / 2.0;
            let friction = (body.desc.friction + collider.friction) / 2.0;

            let mut bounce = -vn * restitution;
            if bounce < REST_BOUNCE_SPEED {
                bounce = 0.0;
            }

            // Coulomb-style sliding friction
            let tangent = body.velocity - normal * vn;
            let speed = tangent.length();
            let slowed = (speed - friction * gravity * dt).max(0.0);
            let tangent = if speed > 0.0 { tangent * (slowed / speed) } else { Vec3::ZERO };

            body.velocity = tangent + normal * bounce;
        }

        touched
    }
}

impl Physics for BallWorld {
    fn restore(snapshot: &WorldSnapshot) -> Result<Self, SessionError> {
        if !snapshot.gravity.is_finite() {
            return Err(SessionError::InvalidSnapshot {
                reason: format!("gravity {} is not finite", snapshot.gravity),
            });
        }
        let mut world = BallWorld::new(snapshot.gravity);
        for desc in &snapshot.colliders {
            world.add_collider(desc)?;
        }
        for body in &snapshot.bodies {
            if !(body.desc.radius > 0.0) || !body.desc.position.is_finite() {
                return Err(SessionError::InvalidSnapshot {
                    reason: format!("body {:?} has invalid shape or position", body.handle),
                });
            }
            world.insert_body(body.handle, body.desc, body.velocity);
        }
        Ok(world)
    }

    fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            gravity: self.gravity,
            colliders: self.collider_descs.clone(),
            bodies: self
                .bodies
                .iter()
                .map(|(&handle, body)| BodySnapshot {
                    handle,
                    desc: BodyDesc {
                        position: body.position,
                        ..body.desc
                    },
                    velocity: body.velocity,
                })
                .collect(),
        }
    }

    fn step(&mut self, dt: f32) {
        let gravity = self.gravity;
        let g = gravity.length();
        for body in self.bodies.values_mut() {
            if body.desc.kind != BodyKind::Dynamic {
                continue;
            }
            body.velocity += gravity * dt;
            body.position += body.velocity * dt;
            Self::resolve_contacts(body, &self.colliders, g, dt);
        }
    }

    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.next_handle);
        self.insert_body(handle, desc, Vec3::ZERO);
        handle
    }

    fn remove_body(&mut self, handle: BodyHandle) -> bool {
        self.bodies.remove(&handle).is_some()
    }

    fn translation(&self, handle: BodyHandle) -> Option<Vec3> {
        self.bodies.get(&handle).map(|b| b.position)
    }

    fn linvel(&self, handle: BodyHandle) -> Option<Vec3> {
        self.bodies.get(&handle).map(|b| b.velocity)
    }

    fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec3) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            if body.desc.kind == BodyKind::Dynamic {
                body.velocity += impulse / body.desc.mass();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor_world() -> BallWorld {
        BallWorld::restore(&WorldSnapshot::with_floor(-0.5, 20.0)).unwrap()
    }

    fn run(world: &mut BallWorld, secs: f32) {
        let steps = (secs / SIM_DT).round() as u32;
        for _ in 0..steps {
            world.step(SIM_DT);
        }
    }

    #[test]
    fn test_sphere_falls_and_rests_on_floor() {
        let mut world = floor_world();
        let h = world.create_body(BodyDesc::dynamic_sphere(Vec3::new(0.0, 5.0, 0.0), 1.0));
        run(&mut world, 6.0);

        let pos = world.translation(h).unwrap();
        assert!((pos.y - 0.5).abs() < 0.05, "resting height {}", pos.y);
        assert!(world.linvel(h).unwrap().length() < STOP_THRESHOLD);
    }

    #[test]
    fn test_fixed_body_does_not_move() {
        let mut world = floor_world();
        let h = world.create_body(BodyDesc::fixed_sphere(SPAWN_POSITION, 1.0));
        world.apply_impulse(h, Vec3::new(10.0, 0.0, 0.0));
        run(&mut world, 1.0);
        assert_eq!(world.translation(h), Some(SPAWN_POSITION));
        assert_eq!(world.linvel(h), Some(Vec3::ZERO));
    }

    #[test]
    fn test_impulse_scales_by_mass() {
        let mut world = BallWorld::new(Vec3::ZERO);
        let desc = BodyDesc::dynamic_sphere(Vec3::ZERO, 1.0);
        let h = world.create_body(desc);
        world.apply_impulse(h, Vec3::X * desc.mass() * 3.0);
        let v = world.linvel(h).unwrap();
        assert!((v.x - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_sliding_sphere_comes_to_rest() {
        let mut world = floor_world();
        let h = world.create_body(BodyDesc::dynamic_sphere(Vec3::new(0.0, 0.5, 0.0), 1.0));
        world.apply_impulse(h, Vec3::X * BodyDesc::dynamic_sphere(Vec3::ZERO, 1.0).mass() * 2.0);
        run(&mut world, 3.0);
        let v = world.linvel(h).unwrap();
        assert!(v.length() < STOP_THRESHOLD);
        assert!(world.translation(h).unwrap().x > 0.1);
    }

    #[test]
    fn test_sphere_off_the_edge_keeps_falling() {
        let mut world = BallWorld::restore(&WorldSnapshot::with_floor(-0.5, 2.0)).unwrap();
        let h = world.create_body(BodyDesc::dynamic_sphere(Vec3::new(10.0, 5.0, 0.0), 1.0));
        run(&mut world, 3.0);
        assert!(world.translation(h).unwrap().y < FALL_LIMIT);
    }

    #[test]
    fn test_remove_body_invalidates_handle() {
        let mut world = floor_world();
        let h = world.create_body(BodyDesc::fixed_sphere(Vec3::ZERO, 1.0));
        assert!(world.contains(h));
        assert!(world.remove_body(h));
        assert!(!world.contains(h));
        assert!(!world.remove_body(h));
        assert_eq!(world.linvel(h), None);
    }

    #[test]
    fn test_handles_are_not_reused() {
        let mut world = floor_world();
        let a = world.create_body(BodyDesc::fixed_sphere(Vec3::ZERO, 1.0));
        world.remove_body(a);
        let b = world.create_body(BodyDesc::fixed_sphere(Vec3::ZERO, 1.0));
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let err = WorldSnapshot::from_json("{\"gravity\": [0, -9.81").unwrap_err();
        assert!(matches!(err, SessionError::InvalidSnapshot { .. }));
    }

    #[test]
    fn test_bad_cuboid_is_rejected() {
        let json = r#"{"colliders": [{"type": "Cuboid", "center": [0, 0, 0], "half_extents": [1, 0, 1]}]}"#;
        let snapshot = WorldSnapshot::from_json(json).unwrap();
        assert!(matches!(
            BallWorld::restore(&snapshot),
            Err(SessionError::InvalidSnapshot { .. })
        ));
    }

    #[test]
    fn test_mesh_without_indices_is_skipped() {
        let json = r#"{"colliders": [
            {"type": "Mesh", "name": "wall", "vertices": [0, 0, 0, 1, 1, 1, 2, 0, 2]},
            {"type": "Mesh", "name": "ramp", "position": [0, 1, 0],
             "vertices": [-1, 0, -1, 1, 0, -1, 1, 2, 1], "indices": [0, 1, 2]}
        ]}"#;
        let snapshot = WorldSnapshot::from_json(json).unwrap();
        let world = BallWorld::restore(&snapshot).unwrap();
        assert_eq!(world.collider_count(), 1);
        assert_eq!(world.gravity, GRAVITY);
        assert_eq!(world.colliders[0].bounds.min, Vec3::new(-1.0, 1.0, -1.0));
        assert_eq!(world.colliders[0].bounds.max, Vec3::new(1.0, 3.0, 1.0));
    }

    #[test]
    fn test_snapshot_round_trip_keeps_bodies() {
        let mut world = floor_world();
        let h = world.create_body(BodyDesc::dynamic_sphere(Vec3::new(1.0, 3.0, -2.0), 1.0));
        run(&mut world, 0.25);
        let snapshot = world.snapshot();

        let json = snapshot.to_json().unwrap();
        let restored = BallWorld::restore(&WorldSnapshot::from_json(&json).unwrap()).unwrap();
        assert_eq!(restored.translation(h), world.translation(h));
        assert_eq!(restored.linvel(h), world.linvel(h));
        assert_eq!(restored.collider_count(), 1);
    }
}
