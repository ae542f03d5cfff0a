//! In-memory entity arena standing in for the host engine's entity store
//! and scene graph.
//!
//! Entities carry a stable [`EntityUuid`], a set of [`Marker`]s, a world
//! [`Transform`] and a handful of optional attributes. Game crates only ever
//! hold [`EntityId`] handles (weak references); the scene owns lifetimes.

use std::collections::{BTreeSet, HashMap};

use glam::{Mat4, Quat, Vec3};

use crate::error::PongError;
use crate::ids::{EntityUuid, Handedness, UserId};
use crate::physics::{Collider, DeferredImpulse, PhysicsSettings, RigidBody};

/// Arena handle of a scene entity. Never sent over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32);

impl EntityId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Marker components the game logic queries for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Marker {
    Game,
    Goal,
    Ball,
    Paddle,
    Plate,
    Text,
    Avatar,
}

/// World-space transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Express a world-space point in this transform's local frame.
    pub fn to_local(&self, world: Vec3) -> Vec3 {
        self.matrix().inverse().transform_point3(world)
    }

    /// Squared distance on the ground (XZ) plane.
    pub fn planar_distance_sq(&self, other: &Transform) -> f32 {
        planar_distance_sq(self.position, other.position)
    }
}

pub fn planar_distance_sq(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    dx * dx + dz * dz
}

/// Tracked hand poses of an avatar, in world space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AvatarRig {
    pub left_hand: Option<Transform>,
    pub right_hand: Option<Transform>,
}

impl AvatarRig {
    pub fn hand(&self, handedness: Handedness) -> Option<&Transform> {
        match handedness {
            Handedness::Left => self.left_hand.as_ref(),
            Handedness::Right => self.right_hand.as_ref(),
        }
    }

    pub fn hand_mut(&mut self, handedness: Handedness) -> &mut Option<Transform> {
        match handedness {
            Handedness::Left => &mut self.left_hand,
            Handedness::Right => &mut self.right_hand,
        }
    }
}

/// An entity held in an avatar's hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grab {
    pub grabber: EntityId,
    pub attachment: Handedness,
}

/// Everything the scene knows about one entity.
#[derive(Debug, Clone)]
pub struct EntityRecord {
    pub uuid: EntityUuid,
    pub name: String,
    pub parent: Option<EntityId>,
    pub transform: Transform,
    pub markers: BTreeSet<Marker>,
    pub body: Option<RigidBody>,
    pub collider: Option<Collider>,
    pub text: Option<String>,
    pub rig: Option<AvatarRig>,
    pub owner: Option<UserId>,
    pub grabbed: Option<Grab>,
}

impl EntityRecord {
    pub fn new(uuid: impl Into<EntityUuid>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            parent: None,
            transform: Transform::default(),
            markers: BTreeSet::new(),
            body: None,
            collider: None,
            text: None,
            rig: None,
            owner: None,
            grabbed: None,
        }
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.markers.insert(marker);
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_collider(mut self, collider: Collider) -> Self {
        self.collider = Some(collider);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_rig(mut self, rig: AvatarRig) -> Self {
        self.rig = Some(rig);
        self
    }

    pub fn with_owner(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn has_marker(&self, marker: Marker) -> bool {
        self.markers.contains(&marker)
    }
}

/// The entity arena plus the physics bookkeeping that hangs off it.
#[derive(Debug, Default)]
pub struct Scene {
    pub(crate) entities: Vec<Option<EntityRecord>>,
    by_uuid: HashMap<EntityUuid, EntityId>,
    pub(crate) collisions: HashMap<EntityId, Vec<EntityId>>,
    pub(crate) deferred: Vec<DeferredImpulse>,
    /// Despawned slots, reused by the next insert.
    free: Vec<EntityId>,
    pub settings: PhysicsSettings,
}

impl Scene {
    pub fn new(settings: PhysicsSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Add an entity. UUIDs are unique within a scene. Handles of despawned
    /// entities are reused, so a handle must not outlive its entity.
    pub fn insert(&mut self, record: EntityRecord) -> Result<EntityId, PongError> {
        if record.uuid.is_empty() {
            return Err(PongError::Configuration(format!(
                "entity '{}' has an empty uuid",
                record.name
            )));
        }
        if self.by_uuid.contains_key(&record.uuid) {
            return Err(PongError::Configuration(format!(
                "entity uuid {} already exists",
                record.uuid
            )));
        }
        let id = match self.free.pop() {
            Some(id) => id,
            None => {
                self.entities.push(None);
                EntityId(self.entities.len() as u32 - 1)
            },
        };
        self.by_uuid.insert(record.uuid.clone(), id);
        self.entities[id.index()] = Some(record);
        Ok(id)
    }

    /// Remove an entity, detaching its children and dropping its physics state.
    pub fn despawn(&mut self, id: EntityId) -> Option<EntityRecord> {
        let record = self.entities.get_mut(id.index())?.take()?;
        self.by_uuid.remove(&record.uuid);
        self.forget_collisions(id);
        self.collisions.remove(&id);
        self.deferred.retain(|d| d.entity != id);
        for child in self.entities.iter_mut().flatten() {
            if child.parent == Some(id) {
                child.parent = None;
            }
            if child.grabbed.is_some_and(|g| g.grabber == id) {
                child.grabbed = None;
            }
        }
        self.free.push(id);
        Some(record)
    }

    pub fn entity_by_uuid(&self, uuid: &EntityUuid) -> Option<EntityId> {
        self.by_uuid.get(uuid).copied()
    }

    pub fn uuid(&self, id: EntityId) -> Option<&EntityUuid> {
        self.get(id).map(|e| &e.uuid)
    }

    pub fn get(&self, id: EntityId) -> Option<&EntityRecord> {
        self.entities.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut EntityRecord> {
        self.entities.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.by_uuid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_uuid.is_empty()
    }

    pub fn transform(&self, id: EntityId) -> Option<&Transform> {
        self.get(id).map(|e| &e.transform)
    }

    pub fn transform_mut(&mut self, id: EntityId) -> Option<&mut Transform> {
        self.get_mut(id).map(|e| &mut e.transform)
    }

    pub fn has_marker(&self, id: EntityId, marker: Marker) -> bool {
        self.get(id).is_some_and(|e| e.has_marker(marker))
    }

    /// All live entities carrying `marker`, in creation order.
    pub fn query(&self, marker: Marker) -> Vec<EntityId> {
        self.iter()
            .filter(|(_, e)| e.has_marker(marker))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &EntityRecord)> {
        self.entities
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (EntityId(i as u32), e)))
    }

    pub fn children(&self, id: EntityId) -> Vec<EntityId> {
        self.iter()
            .filter(|(_, e)| e.parent == Some(id))
            .map(|(child, _)| child)
            .collect()
    }

    /// Nearest ancestor (excluding `id` itself) matching `pred`.
    pub fn find_ancestor(
        &self,
        id: EntityId,
        pred: impl Fn(&EntityRecord) -> bool,
    ) -> Option<EntityId> {
        let mut current = self.get(id)?.parent;
        // Bounded by the entity count so a malformed parent cycle cannot spin.
        for _ in 0..self.entities.len() {
            let parent = current?;
            let record = self.get(parent)?;
            if pred(record) {
                return Some(parent);
            }
            current = record.parent;
        }
        None
    }

    /// First descendant (depth-first, creation order) matching `pred`.
    pub fn find_descendant(
        &self,
        id: EntityId,
        pred: impl Fn(&EntityRecord) -> bool,
    ) -> Option<EntityId> {
        let mut stack = self.children(id);
        stack.reverse();
        let mut visited = 0;
        while let Some(next) = stack.pop() {
            visited += 1;
            if visited > self.entities.len() {
                return None;
            }
            let record = self.get(next)?;
            if pred(record) {
                return Some(next);
            }
            let mut children = self.children(next);
            children.reverse();
            stack.extend(children);
        }
        None
    }

    /// The avatar entity controlled by `user`.
    pub fn avatar_of(&self, user: &UserId) -> Option<EntityId> {
        self.iter()
            .find(|(_, e)| e.has_marker(Marker::Avatar) && e.owner.as_ref() == Some(user))
            .map(|(id, _)| id)
    }

    /// Entities currently overlapping `id`'s collider.
    pub fn collisions(&self, id: EntityId) -> &[EntityId] {
        self.collisions.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Overwrite the collision set of `id` (symmetrically).
    pub fn set_collisions(&mut self, id: EntityId, others: Vec<EntityId>) {
        for other in &others {
            let set = self.collisions.entry(*other).or_default();
            if !set.contains(&id) {
                set.push(id);
            }
        }
        self.collisions.insert(id, others);
    }

    /// Drop `id` from every other entity's collision set and clear its own.
    pub fn forget_collisions(&mut self, id: EntityId) {
        for set in self.collisions.values_mut() {
            set.retain(|&other| other != id);
        }
        if let Some(own) = self.collisions.get_mut(&id) {
            own.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_with_tree() -> (Scene, EntityId, EntityId, EntityId) {
        let mut scene = Scene::default();
        let game = scene
            .insert(EntityRecord::new("game", "Pong").with_marker(Marker::Game))
            .unwrap();
        let group = scene
            .insert(EntityRecord::new("group", "plates").with_parent(game))
            .unwrap();
        let plate = scene
            .insert(
                EntityRecord::new("plate-a", "plateA")
                    .with_marker(Marker::Plate)
                    .with_parent(group),
            )
            .unwrap();
        (scene, game, group, plate)
    }

    #[test]
    fn duplicate_uuid_is_rejected() {
        let mut scene = Scene::default();
        scene.insert(EntityRecord::new("a", "a")).unwrap();
        let err = scene.insert(EntityRecord::new("a", "again")).unwrap_err();
        assert!(matches!(err, PongError::Configuration(_)));
    }

    #[test]
    fn query_returns_creation_order() {
        let mut scene = Scene::default();
        let a = scene
            .insert(EntityRecord::new("a", "a").with_marker(Marker::Ball))
            .unwrap();
        scene
            .insert(EntityRecord::new("b", "b").with_marker(Marker::Goal))
            .unwrap();
        let c = scene
            .insert(EntityRecord::new("c", "c").with_marker(Marker::Ball))
            .unwrap();
        assert_eq!(scene.query(Marker::Ball), vec![a, c]);
    }

    #[test]
    fn ancestor_and_descendant_traversal() {
        let (scene, game, _, plate) = scene_with_tree();
        assert_eq!(
            scene.find_ancestor(plate, |e| e.has_marker(Marker::Game)),
            Some(game)
        );
        assert_eq!(scene.find_descendant(game, |e| e.name == "plateA"), Some(plate));
        assert_eq!(scene.find_ancestor(game, |_| true), None);
    }

    #[test]
    fn despawn_clears_lookup_and_collisions() {
        let (mut scene, game, _, plate) = scene_with_tree();
        scene.set_collisions(plate, vec![game]);
        assert_eq!(scene.collisions(game), &[plate]);

        let removed = scene.despawn(plate).unwrap();
        assert_eq!(removed.name, "plateA");
        assert!(scene.entity_by_uuid(&EntityUuid::new("plate-a")).is_none());
        assert!(scene.collisions(game).is_empty());
        assert!(scene.get(plate).is_none());
    }

    #[test]
    fn despawned_uuid_can_be_reinserted() {
        let mut scene = Scene::default();
        let first = scene.insert(EntityRecord::new("ball", "ball")).unwrap();
        scene.despawn(first);
        let second = scene.insert(EntityRecord::new("ball", "ball")).unwrap();
        assert_eq!(scene.entity_by_uuid(&EntityUuid::new("ball")), Some(second));
    }

    #[test]
    fn respawning_reuses_freed_slots() {
        let (mut scene, game, group, _) = scene_with_tree();
        let slots = scene.entities.len();
        for _ in 0..50 {
            let ball = scene
                .insert(
                    EntityRecord::new("game_ball", "Pong Ball")
                        .with_marker(Marker::Ball)
                        .with_parent(game),
                )
                .unwrap();
            scene.despawn(ball);
        }
        assert_eq!(scene.entities.len(), slots + 1);

        let ball = scene
            .insert(EntityRecord::new("game_ball", "Pong Ball").with_marker(Marker::Ball))
            .unwrap();
        assert_eq!(scene.query(Marker::Ball), vec![ball]);
        assert_eq!(scene.uuid(ball).map(|u| u.as_str()), Some("game_ball"));
        assert_eq!(scene.children(game), vec![group]);
    }

    #[test]
    fn to_local_inverts_game_transform() {
        let t = Transform::from_position(Vec3::new(10.0, 1.0, -4.0))
            .with_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        let world = t.matrix().transform_point3(Vec3::new(1.0, 0.5, 0.0));
        let local = t.to_local(world);
        assert!((local - Vec3::new(1.0, 0.5, 0.0)).length() < 1e-4);
    }

    #[test]
    fn avatar_lookup_by_owner() {
        let mut scene = Scene::default();
        let avatar = scene
            .insert(
                EntityRecord::new("av", "Alice")
                    .with_marker(Marker::Avatar)
                    .with_owner(UserId::new("alice")),
            )
            .unwrap();
        assert_eq!(scene.avatar_of(&UserId::new("alice")), Some(avatar));
        assert_eq!(scene.avatar_of(&UserId::new("bob")), None);
    }
}
