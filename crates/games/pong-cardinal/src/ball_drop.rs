use std::f32::consts::TAU;

use glam::{EulerRot, Quat, Vec3};
use rand::Rng;

use pong_core::error::PongError;
use pong_core::ids::{EntityUuid, GameUuid};
use pong_core::net::actions::PongAction;
use pong_core::net::bus::ActionBus;
use pong_core::physics::{Collider, RigidBody, groups};
use pong_core::scene::{EntityId, EntityRecord, Marker, Scene, Transform};

use crate::config::CardinalConfig;
use crate::state::CardinalGame;

/// Slot charged for a ball that landed at `local` (game frame). The
/// dominant horizontal axis and its sign pick the zone; ties go to slot 0.
pub fn player_index(local: Vec3) -> u8 {
    if local.z > local.x.abs() {
        0
    } else if local.z < -local.x.abs() {
        1
    } else if local.x > local.z.abs() {
        2
    } else if local.x < -local.z.abs() {
        3
    } else {
        0
    }
}

/// Unit direction toward a slot's side of the table.
pub fn cardinal_direction(index: usize) -> Vec3 {
    match index {
        1 => Vec3::NEG_Z,
        2 => Vec3::X,
        3 => Vec3::NEG_X,
        _ => Vec3::Z,
    }
}

pub fn ball_uuid(game: &GameUuid) -> EntityUuid {
    EntityUuid::new(format!("{game}_ball"))
}

/// Create (or reset) the ball entity above its game. Runs on every peer.
pub fn spawn_ball(
    scene: &mut Scene,
    game: &GameUuid,
    entity: &EntityUuid,
    rng: &mut impl Rng,
    config: &CardinalConfig,
) -> Result<EntityId, PongError> {
    let game_id = scene
        .entity_by_uuid(&game.entity())
        .ok_or_else(|| PongError::MissingBinding(format!("game {game} not in scene")))?;
    let position = scene
        .transform(game_id)
        .map(|t| t.position)
        .unwrap_or_default()
        + config.spawn_offset;
    let rotation = Quat::from_euler(
        EulerRot::YXZ,
        rng.random_range(0.0..TAU),
        rng.random_range(0.0..TAU),
        rng.random_range(0.0..TAU),
    );

    if let Some(existing) = scene.entity_by_uuid(entity) {
        scene.teleport(existing, Some(position), Some(rotation));
        return Ok(existing);
    }

    let collider = Collider::sphere(config.ball_radius)
        .groups(groups::DEFAULT, groups::DEFAULT_MASK | groups::PADDLE)
        .restitution(1.0);
    scene.insert(
        EntityRecord::new(entity.clone(), "Pong Ball")
            .with_marker(Marker::Ball)
            .with_parent(game_id)
            .with_transform(
                Transform::from_position(position)
                    .with_rotation(rotation)
                    .with_scale(Vec3::splat(config.ball_scale)),
            )
            .with_body(RigidBody::dynamic().at(position, rotation))
            .with_collider(collider),
    )
}

/// Server-side ball lifecycle for one game: count down the cooldown, spawn
/// a ball when there is none, and charge a miss once it drops. Returns the
/// slot charged this tick, if any.
pub fn game_logic(
    game_uuid: &GameUuid,
    game: &mut CardinalGame,
    scene: &Scene,
    bus: &mut ActionBus,
    timestep_ms: f64,
    config: &CardinalConfig,
) -> Result<Option<u8>, PongError> {
    if !game.any_connected() {
        return Ok(None);
    }
    if game.ball_cooldown > 0.0 {
        game.ball_cooldown -= timestep_ms;
        return Ok(None);
    }

    let Some(ball_uuid) = game.ball.clone() else {
        let ball = ball_uuid(game_uuid);
        game.ball = Some(ball.clone());
        bus.dispatch(PongAction::spawn_ball(ball, game_uuid.clone()))?;
        return Ok(None);
    };

    // Spawn not applied yet.
    let Some(ball) = scene.entity_by_uuid(&ball_uuid) else {
        return Ok(None);
    };
    let game_transform = scene
        .entity_by_uuid(&game_uuid.entity())
        .and_then(|id| scene.transform(id))
        .ok_or_else(|| PongError::MissingBinding(format!("game {game_uuid} not in scene")))?;
    let Some(world) = scene.physics_position(ball) else {
        return Ok(None);
    };
    let local = game_transform.to_local(world);
    if local.y >= config.drop_threshold {
        return Ok(None);
    }

    bus.dispatch(PongAction::DestroyObject {
        entity_uuid: ball_uuid,
    })?;
    let index = player_index(local);
    bus.dispatch(PongAction::PlayerScore {
        game: game_uuid.clone(),
        player_index: index,
    })?;

    let remaining = game.players[usize::from(index)].score - 1;
    if remaining <= 0 && config.end_game_on_zero_score {
        bus.dispatch(PongAction::EndGame {
            game: game_uuid.clone(),
        })?;
        bus.netlog(format!("game {game_uuid} over, slot {index} is out"));
    }
    Ok(Some(index))
}
