//! Demo tables for each variant. Every peer builds its own copy from the
//! same inputs, so entity handles line up across peers.

use glam::{Quat, Vec3};

use pong_core::error::PongError;
use pong_core::ids::UserId;
use pong_core::physics::{Collider, PhysicsSettings, RigidBody, groups};
use pong_core::scene::{AvatarRig, EntityId, EntityRecord, Marker, Scene, Transform};

use crate::config::Variant;

pub const GAME_UUID: &str = "pong-table";

/// Where avatars wait before anyone walks them onto a plate.
pub fn lobby_position(index: usize) -> Vec3 {
    Vec3::new(20.0 + 2.0 * index as f32, 0.0, 20.0)
}

/// Light enough that a volley carries a ball from the center to a goal.
const BALL_MASS: f32 = 0.05;

/// Hand offsets from the avatar root.
pub const RIGHT_HAND: Vec3 = Vec3::new(0.3, 1.2, 0.0);
pub const LEFT_HAND: Vec3 = Vec3::new(-0.3, 1.2, 0.0);

pub fn build(
    variant: Variant,
    settings: PhysicsSettings,
    users: &[UserId],
) -> Result<Scene, PongError> {
    let mut scene = Scene::new(settings);
    let game = scene.insert(
        EntityRecord::new(GAME_UUID, "Pong")
            .with_marker(Marker::Game)
            .with_transform(Transform::default()),
    )?;
    match variant {
        Variant::Arena => arena_table(&mut scene, game)?,
        Variant::Cardinal => cardinal_table(&mut scene, game)?,
    }
    for (i, user) in users.iter().enumerate() {
        spawn_avatar(&mut scene, user, lobby_position(i))?;
    }
    Ok(scene)
}

fn plate(uuid: String, name: String, at: Vec3, size: f32, parent: EntityId) -> EntityRecord {
    EntityRecord::new(uuid, name)
        .with_marker(Marker::Plate)
        .with_parent(parent)
        .with_transform(Transform::from_position(at).with_scale(Vec3::new(size, 0.1, size)))
        .with_collider(
            Collider::cuboid(Vec3::splat(0.5))
                .groups(groups::TRIGGER, groups::DEFAULT | groups::AVATARS)
                .sensor(),
        )
}

/// Four goals at the compass points, each with a plate, a paddle and a
/// health label, plus a pool of parked balls.
fn arena_table(scene: &mut Scene, game: EntityId) -> Result<(), PongError> {
    let sides = [
        ("n", Vec3::new(0.0, 0.0, 6.0)),
        ("s", Vec3::new(0.0, 0.0, -6.0)),
        ("e", Vec3::new(6.0, 0.0, 0.0)),
        ("w", Vec3::new(-6.0, 0.0, 0.0)),
    ];
    for (side, at) in sides {
        scene.insert(
            EntityRecord::new(format!("goal-{side}"), format!("goal {side}"))
                .with_marker(Marker::Goal)
                .with_parent(game)
                .with_transform(Transform::from_position(at)),
        )?;
        scene.insert(plate(
            format!("plate-{side}"),
            format!("plate {side}"),
            at,
            1.5,
            game,
        ))?;
        let paddle_at = at + Vec3::Y;
        scene.insert(
            EntityRecord::new(format!("paddle-{side}"), format!("paddle {side}"))
                .with_marker(Marker::Paddle)
                .with_parent(game)
                .with_transform(Transform::from_position(paddle_at))
                .with_body(RigidBody::kinematic().at(paddle_at, Quat::IDENTITY))
                .with_collider(
                    Collider::sphere(0.15).groups(groups::PADDLE, groups::DEFAULT),
                ),
        )?;
        scene.insert(
            EntityRecord::new(format!("text-{side}"), format!("health {side}"))
                .with_marker(Marker::Text)
                .with_parent(game)
                .with_transform(Transform::from_position(at + Vec3::new(0.0, 2.0, 0.0)))
                .with_text("9"),
        )?;
    }

    let parked = Vec3::splat(-1000.0);
    for i in 0..3 {
        let collider = Collider::sphere(0.1)
            .groups(groups::DEFAULT, groups::DEFAULT_MASK | groups::PADDLE)
            .restitution(1.0);
        scene.insert(
            EntityRecord::new(format!("ball-{i}"), "ball")
                .with_marker(Marker::Ball)
                .with_transform(Transform::from_position(parked).with_scale(Vec3::splat(0.1)))
                .with_body(
                    RigidBody::dynamic()
                        .at(parked, Quat::IDENTITY)
                        .with_mass(BALL_MASS),
                )
                .with_collider(collider),
        )?;
    }
    Ok(())
}

/// A square table with one plate and one score bar per side.
fn cardinal_table(scene: &mut Scene, game: EntityId) -> Result<(), PongError> {
    let table = scene.insert(
        EntityRecord::new("table", "table")
            .with_parent(game)
            .with_transform(Transform::default().with_scale(Vec3::new(2.0, 0.05, 2.0))),
    )?;
    let seats = [
        ('A', Vec3::new(0.0, 0.0, 3.0)),
        ('B', Vec3::new(0.0, 0.0, -3.0)),
        ('C', Vec3::new(3.0, 0.0, 0.0)),
        ('D', Vec3::new(-3.0, 0.0, 0.0)),
    ];
    for (letter, at) in seats {
        scene.insert(plate(
            format!("plate-{letter}"),
            format!("plate{letter}"),
            at,
            1.0,
            game,
        ))?;
        scene.insert(
            EntityRecord::new(format!("score-{letter}"), format!("score{letter}"))
                .with_parent(table)
                .with_transform(Transform::from_position(at * 0.4 + Vec3::Y)),
        )?;
    }
    Ok(())
}

pub fn spawn_avatar(scene: &mut Scene, user: &UserId, at: Vec3) -> Result<EntityId, PongError> {
    let rig = AvatarRig {
        left_hand: Some(Transform::from_position(at + LEFT_HAND)),
        right_hand: Some(Transform::from_position(at + RIGHT_HAND)),
    };
    scene.insert(
        EntityRecord::new(format!("avatar-{user}"), user.as_str())
            .with_marker(Marker::Avatar)
            .with_owner(user.clone())
            .with_transform(Transform::from_position(at))
            .with_rig(rig)
            .with_collider(
                Collider::cuboid(Vec3::new(0.3, 0.9, 0.3))
                    .groups(groups::AVATARS, groups::DEFAULT_MASK),
            ),
    )
}

/// Walk an avatar to `to`, carrying its hands along.
pub fn move_avatar(scene: &mut Scene, user: &UserId, to: Vec3) -> Result<(), PongError> {
    let id = scene
        .avatar_of(user)
        .ok_or_else(|| PongError::MissingBinding(format!("no avatar for {user}")))?;
    let record = scene
        .get_mut(id)
        .ok_or_else(|| PongError::MissingBinding(format!("no avatar for {user}")))?;
    let delta = to - record.transform.position;
    record.transform.position = to;
    if let Some(rig) = record.rig.as_mut() {
        for hand in [&mut rig.left_hand, &mut rig.right_hand].into_iter().flatten() {
            hand.position += delta;
        }
    }
    Ok(())
}
