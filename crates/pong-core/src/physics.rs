//! Minimal rigid-body stand-in: body poses, kinematic targets, impulses and
//! per-collider overlap sets. Bodies do not collide with each other. A step
//! integrates gravity, bounces spheres off an optional floor plane, then
//! recomputes which colliders overlap.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::PongError;
use crate::net::actions::MoveAction;
use crate::scene::{EntityId, Scene};

/// Fixed delay between a `move` teleport and its impulse, so the impulse is
/// not consumed by the same step that repositioned the body.
pub const IMPULSE_DEFERRAL_SECS: f64 = 0.010;

/// Collision layer bits.
pub mod groups {
    pub const DEFAULT: u32 = 1 << 0;
    pub const AVATARS: u32 = 1 << 1;
    pub const GROUND: u32 = 1 << 2;
    pub const TRIGGER: u32 = 1 << 4;
    pub const PADDLE: u32 = 1 << 6;

    pub const DEFAULT_MASK: u32 = DEFAULT | AVATARS | GROUND | TRIGGER;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    Dynamic,
    Kinematic,
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidBody {
    pub kind: BodyKind,
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    pub target_kinematic_position: Option<Vec3>,
    pub target_kinematic_rotation: Option<Quat>,
    pub accumulated_force: Vec3,
    pub mass: f32,
}

impl RigidBody {
    pub fn new(kind: BodyKind) -> Self {
        Self {
            kind,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            target_kinematic_position: None,
            target_kinematic_rotation: None,
            accumulated_force: Vec3::ZERO,
            mass: 1.0,
        }
    }

    pub fn dynamic() -> Self {
        Self::new(BodyKind::Dynamic)
    }

    pub fn kinematic() -> Self {
        Self::new(BodyKind::Kinematic)
    }

    pub fn fixed() -> Self {
        Self::new(BodyKind::Fixed)
    }

    pub fn at(mut self, position: Vec3, rotation: Quat) -> Self {
        self.position = position;
        self.rotation = rotation;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass.max(f32::EPSILON);
        self
    }
}

/// Collider shapes. Sphere radii are absolute; cuboid half extents are
/// multiplied by the entity's transform scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    Sphere { radius: f32 },
    Cuboid { half_extents: Vec3 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    pub shape: ColliderShape,
    pub collision_group: u32,
    pub collision_mask: u32,
    pub restitution: f32,
    pub sensor: bool,
}

impl Collider {
    pub fn sphere(radius: f32) -> Self {
        Self::with_shape(ColliderShape::Sphere { radius })
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::with_shape(ColliderShape::Cuboid { half_extents })
    }

    fn with_shape(shape: ColliderShape) -> Self {
        Self {
            shape,
            collision_group: groups::DEFAULT,
            collision_mask: groups::DEFAULT_MASK,
            restitution: 0.0,
            sensor: false,
        }
    }

    pub fn groups(mut self, group: u32, mask: u32) -> Self {
        self.collision_group = group;
        self.collision_mask = mask;
        self
    }

    pub fn restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn sensor(mut self) -> Self {
        self.sensor = true;
        self
    }

    /// Mass at unit density.
    pub fn mass(&self) -> f32 {
        match self.shape {
            ColliderShape::Sphere { radius } => 4.0 / 3.0 * std::f32::consts::PI * radius.powi(3),
            ColliderShape::Cuboid { half_extents } => {
                8.0 * half_extents.x * half_extents.y * half_extents.z
            },
        }
    }

    pub fn interacts_with(&self, other: &Collider) -> bool {
        self.collision_group & other.collision_mask != 0
            && other.collision_group & self.collision_mask != 0
    }
}

/// World-wide simulation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    pub gravity: Vec3,
    /// Height of the floor plane spheres bounce off, if any.
    pub floor_height: Option<f32>,
    /// The floor spans `[-extent, extent]` on X and Z. Parked bodies sit outside it.
    pub floor_half_extent: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            floor_height: Some(0.0),
            floor_half_extent: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DeferredImpulse {
    pub entity: EntityId,
    pub impulse: Vec3,
    pub due: f64,
}

/// Shape placed in the world for one overlap pass.
#[derive(Debug, Clone, Copy)]
enum Placed {
    Sphere { center: Vec3, radius: f32 },
    Aabb { min: Vec3, max: Vec3 },
}

impl Placed {
    fn overlaps(&self, other: &Placed) -> bool {
        match (*self, *other) {
            (Placed::Sphere { center: a, radius: ra }, Placed::Sphere { center: b, radius: rb }) => {
                a.distance_squared(b) < (ra + rb) * (ra + rb)
            },
            (Placed::Sphere { center, radius }, Placed::Aabb { min, max })
            | (Placed::Aabb { min, max }, Placed::Sphere { center, radius }) => {
                let closest = center.clamp(min, max);
                closest.distance_squared(center) < radius * radius
            },
            (Placed::Aabb { min: amin, max: amax }, Placed::Aabb { min: bmin, max: bmax }) => {
                amin.cmple(bmax).all() && bmin.cmple(amax).all()
            },
        }
    }
}

impl Scene {
    pub fn body(&self, id: EntityId) -> Option<&RigidBody> {
        self.get(id).and_then(|e| e.body.as_ref())
    }

    pub fn body_mut(&mut self, id: EntityId) -> Option<&mut RigidBody> {
        self.get_mut(id).and_then(|e| e.body.as_mut())
    }

    /// World position used for physics: the body's if present, else the transform's.
    pub fn physics_position(&self, id: EntityId) -> Option<Vec3> {
        let entity = self.get(id)?;
        Some(entity.body.map_or(entity.transform.position, |b| b.position))
    }

    pub fn reset_forces(&mut self, id: EntityId) {
        if let Some(body) = self.body_mut(id) {
            body.accumulated_force = Vec3::ZERO;
        }
    }

    /// Write a kinematic target to the body and mirror it into the transform.
    pub fn set_kinematic_target(
        &mut self,
        id: EntityId,
        position: Option<Vec3>,
        rotation: Option<Quat>,
    ) -> Result<(), PongError> {
        let entity = self
            .get_mut(id)
            .ok_or_else(|| PongError::MissingBinding(format!("no entity {id:?}")))?;
        let body = entity.body.as_mut().ok_or_else(|| {
            PongError::MissingBinding(format!("entity {} has no rigid body", entity.uuid))
        })?;
        if let Some(p) = position {
            body.target_kinematic_position = Some(p);
            entity.transform.position = p;
        }
        if let Some(r) = rotation {
            body.target_kinematic_rotation = Some(r);
            entity.transform.rotation = r;
        }
        Ok(())
    }

    /// Write a pose straight into the transform and, if present, the body.
    /// A position write is a teleport and clears linear velocity.
    pub fn teleport(&mut self, id: EntityId, position: Option<Vec3>, rotation: Option<Quat>) {
        let Some(entity) = self.get_mut(id) else {
            return;
        };
        if let Some(p) = position {
            entity.transform.position = p;
            if let Some(body) = entity.body.as_mut() {
                body.position = p;
                body.linear_velocity = Vec3::ZERO;
            }
        }
        if let Some(r) = rotation {
            entity.transform.rotation = r;
            if let Some(body) = entity.body.as_mut() {
                body.rotation = r;
            }
        }
    }

    /// Immediately change the velocity of a dynamic body.
    pub fn apply_impulse(&mut self, id: EntityId, impulse: Vec3) {
        if let Some(body) = self.body_mut(id)
            && body.kind == BodyKind::Dynamic
        {
            body.linear_velocity += impulse / body.mass;
        }
    }

    /// Queue an impulse to be applied by the first step at or after `due`.
    pub fn schedule_impulse(&mut self, id: EntityId, impulse: Vec3, due: f64) {
        self.deferred.push(DeferredImpulse {
            entity: id,
            impulse,
            due,
        });
    }

    pub fn pending_impulses(&self) -> usize {
        self.deferred.len()
    }

    /// Apply a replicated `move` action to the entity it names.
    pub fn apply_move(&mut self, action: &MoveAction, now: f64) -> Result<(), PongError> {
        let id = self.entity_by_uuid(&action.entity_uuid).ok_or_else(|| {
            PongError::MissingBinding(format!("move target {} not in scene", action.entity_uuid))
        })?;
        let has_body = self.body(id).is_some();
        self.reset_forces(id);

        if has_body && (action.kinematic_position.is_some() || action.kinematic_rotation.is_some())
        {
            self.set_kinematic_target(id, action.kinematic_position, action.kinematic_rotation)?;
        }
        self.teleport(id, action.position, action.rotation);

        if let Some(impulse) = action.impulse {
            if !has_body {
                return Err(PongError::MissingBinding(format!(
                    "impulse for {} which has no rigid body",
                    action.entity_uuid
                )));
            }
            self.schedule_impulse(id, impulse, now + IMPULSE_DEFERRAL_SECS);
        }
        Ok(())
    }

    /// Advance the simulation by `dt` seconds, ending at clock time `now`.
    pub fn step(&mut self, dt: f32, now: f64) {
        let due: Vec<DeferredImpulse> = {
            let (due, pending): (Vec<_>, Vec<_>) =
                self.deferred.drain(..).partition(|d| d.due <= now);
            self.deferred = pending;
            due
        };
        for d in due {
            self.apply_impulse(d.entity, d.impulse);
        }

        let settings = self.settings;
        for entity in self.entities.iter_mut().flatten() {
            // A held body tracks the hand instead of integrating.
            let held = entity.grabbed.is_some();
            let Some(body) = entity.body.as_mut() else {
                continue;
            };
            match body.kind {
                BodyKind::Dynamic if !held => {
                    let accel = settings.gravity + body.accumulated_force / body.mass;
                    body.linear_velocity += accel * dt;
                    body.position += body.linear_velocity * dt;
                    body.accumulated_force = Vec3::ZERO;

                    if let (Some(floor), Some(collider)) = (settings.floor_height, entity.collider)
                        && let ColliderShape::Sphere { radius } = collider.shape
                        && body.position.x.abs() <= settings.floor_half_extent
                        && body.position.z.abs() <= settings.floor_half_extent
                        && body.position.y - radius < floor
                    {
                        body.position.y = floor + radius;
                        if body.linear_velocity.y < 0.0 {
                            body.linear_velocity.y = -body.linear_velocity.y * collider.restitution;
                        }
                    }
                },
                BodyKind::Kinematic | BodyKind::Dynamic => {
                    if let Some(p) = body.target_kinematic_position {
                        body.position = p;
                    }
                    if let Some(r) = body.target_kinematic_rotation {
                        body.rotation = r;
                    }
                },
                BodyKind::Fixed => {},
            }
            entity.transform.position = body.position;
            entity.transform.rotation = body.rotation;
        }

        self.update_collisions();
    }

    /// Recompute every collider's overlap set from current positions.
    pub fn update_collisions(&mut self) {
        let placed: Vec<(EntityId, Collider, Placed)> = self
            .iter()
            .filter_map(|(id, e)| {
                let collider = e.collider?;
                let center = e.body.map_or(e.transform.position, |b| b.position);
                let shape = match collider.shape {
                    ColliderShape::Sphere { radius } => Placed::Sphere { center, radius },
                    ColliderShape::Cuboid { half_extents } => {
                        let half = half_extents * e.transform.scale.abs();
                        Placed::Aabb {
                            min: center - half,
                            max: center + half,
                        }
                    },
                };
                Some((id, collider, shape))
            })
            .collect();

        self.collisions.clear();
        for (i, (a, ca, pa)) in placed.iter().enumerate() {
            for (b, cb, pb) in &placed[i + 1..] {
                if ca.interacts_with(cb) && pa.overlaps(pb) {
                    self.collisions.entry(*a).or_default().push(*b);
                    self.collisions.entry(*b).or_default().push(*a);
                }
            }
        }
    }
}
