use glam::Vec3;

use pong_core::error::PongError;
use pong_core::game_trait::LocalPeer;
use pong_core::ids::EntityUuid;
use pong_core::net::actions::{MoveAction, PongAction};
use pong_core::net::bus::ActionBus;
use pong_core::physics::{Collider, RigidBody, groups};
use pong_core::scene::{EntityId, EntityRecord, Grab, Marker, Scene, Transform};

use crate::config::CardinalConfig;
use crate::state::{CardinalState, PaddleInfo};

/// Spawn a paddle held in its owner's hand. The body is dynamic but follows
/// its kinematic target while grabbed. A paddle that already exists is left
/// alone.
pub fn spawn_paddle(
    scene: &mut Scene,
    entity: &EntityUuid,
    info: &PaddleInfo,
    config: &CardinalConfig,
) -> Result<EntityId, PongError> {
    if let Some(existing) = scene.entity_by_uuid(entity) {
        return Ok(existing);
    }

    let avatar = scene.avatar_of(&info.owner);
    let hand = avatar
        .and_then(|id| scene.get(id))
        .and_then(|a| a.rig.as_ref())
        .and_then(|rig| rig.hand(info.handedness))
        .copied();
    let game = scene.entity_by_uuid(&info.game.entity());
    let fallback = game
        .and_then(|id| scene.transform(id))
        .map(|t| t.position)
        .unwrap_or(Vec3::ZERO);
    let pose = hand.unwrap_or_else(|| Transform::from_position(fallback));

    let mut record = EntityRecord::new(
        entity.clone(),
        format!("{}'s {} paddle", info.owner, info.handedness.as_str()),
    )
    .with_marker(Marker::Paddle)
    .with_owner(info.owner.clone())
    .with_transform(
        Transform::from_position(pose.position)
            .with_rotation(pose.rotation)
            .with_scale(config.paddle_scale),
    )
    .with_body(RigidBody::dynamic().at(pose.position, pose.rotation))
    .with_collider(
        Collider::sphere(config.paddle_radius)
            .groups(groups::PADDLE, groups::DEFAULT)
            .restitution(config.paddle_restitution),
    );
    if let Some(game) = game {
        record = record.with_parent(game);
    }
    record.grabbed = avatar.map(|grabber| Grab {
        grabber,
        attachment: info.handedness,
    });
    scene.insert(record)
}

/// Remove a replicated object from the scene if it is still there.
pub fn destroy_object(scene: &mut Scene, entity: &EntityUuid) -> bool {
    match scene.entity_by_uuid(entity) {
        Some(id) => scene.despawn(id).is_some(),
        None => false,
    }
}

/// Move every paddle the local user owns to the hand holding it. Returns
/// the number of moves dispatched.
pub fn follow_hands(
    state: &CardinalState,
    scene: &Scene,
    bus: &mut ActionBus,
    peer: &LocalPeer,
) -> Result<usize, PongError> {
    let mut moved = 0;
    for (uuid, info) in &state.paddles {
        if info.owner != peer.user_id || scene.entity_by_uuid(uuid).is_none() {
            continue;
        }
        let Some(hand) = scene
            .avatar_of(&info.owner)
            .and_then(|id| scene.get(id))
            .and_then(|a| a.rig.as_ref())
            .and_then(|rig| rig.hand(info.handedness))
        else {
            continue;
        };
        bus.dispatch(PongAction::Move(MoveAction::kinematic(
            uuid.clone(),
            hand.position,
            hand.rotation,
        )))?;
        moved += 1;
    }
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pong_core::ids::{GameUuid, Handedness, UserId};
    use pong_core::physics::BodyKind;
    use pong_core::test_helpers::spawn_avatar;

    fn info(owner: &str, handedness: Handedness) -> PaddleInfo {
        PaddleInfo {
            owner: UserId::new(owner),
            handedness,
            game: GameUuid::new("game"),
        }
    }

    #[test]
    fn paddle_spawns_in_the_owners_hand() {
        let mut scene = Scene::default();
        let avatar = spawn_avatar(&mut scene, "alice", Vec3::ZERO);
        let uuid = UserId::new("alice").paddle_uuid(Handedness::Left);
        let id = spawn_paddle(
            &mut scene,
            &uuid,
            &info("alice", Handedness::Left),
            &CardinalConfig::default(),
        )
        .unwrap();

        let record = scene.get(id).unwrap();
        assert_eq!(record.name, "alice's left paddle");
        assert_eq!(record.transform.position, Vec3::new(-0.3, 1.2, 0.0));
        assert_eq!(record.transform.scale, Vec3::new(0.2, 0.2, 0.1));
        assert_eq!(record.body.unwrap().kind, BodyKind::Dynamic);
        assert_eq!(
            record.grabbed,
            Some(Grab {
                grabber: avatar,
                attachment: Handedness::Left
            })
        );

        // Spawning again is a no-op.
        let again = spawn_paddle(
            &mut scene,
            &uuid,
            &info("alice", Handedness::Left),
            &CardinalConfig::default(),
        )
        .unwrap();
        assert_eq!(id, again);
    }

    #[test]
    fn paddle_without_avatar_is_not_grabbed() {
        let mut scene = Scene::default();
        let uuid = UserId::new("ghost").paddle_uuid(Handedness::Right);
        let id = spawn_paddle(
            &mut scene,
            &uuid,
            &info("ghost", Handedness::Right),
            &CardinalConfig::default(),
        )
        .unwrap();
        assert_eq!(scene.get(id).unwrap().grabbed, None);
    }

    #[test]
    fn only_local_paddles_follow() {
        let mut scene = Scene::default();
        spawn_avatar(&mut scene, "alice", Vec3::ZERO);
        spawn_avatar(&mut scene, "bob", Vec3::new(2.0, 0.0, 0.0));
        let mut state = CardinalState::default();
        let config = CardinalConfig::default();
        for (owner, hand) in [("alice", Handedness::Right), ("bob", Handedness::Right)] {
            let uuid = UserId::new(owner).paddle_uuid(hand);
            let paddle = info(owner, hand);
            spawn_paddle(&mut scene, &uuid, &paddle, &config).unwrap();
            state.paddle_spawned(uuid, paddle);
        }

        let mut bus = ActionBus::new(UserId::new("alice"));
        let peer = LocalPeer::client(UserId::new("alice"));
        assert_eq!(follow_hands(&state, &scene, &mut bus, &peer).unwrap(), 1);
        let out = bus.take_outgoing();
        assert_eq!(
            out[0].action,
            PongAction::Move(MoveAction::kinematic(
                UserId::new("alice").paddle_uuid(Handedness::Right),
                Vec3::new(0.3, 1.2, 0.0),
                glam::Quat::IDENTITY,
            ))
        );
    }

    #[test]
    fn destroying_twice_is_harmless() {
        let mut scene = Scene::default();
        let uuid = UserId::new("alice").paddle_uuid(Handedness::Right);
        spawn_paddle(
            &mut scene,
            &uuid,
            &info("alice", Handedness::Right),
            &CardinalConfig::default(),
        )
        .unwrap();
        assert!(destroy_object(&mut scene, &uuid));
        assert!(!destroy_object(&mut scene, &uuid));
    }
}
