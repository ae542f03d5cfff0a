use pong_core::error::PongError;
use pong_core::game_trait::LocalPeer;
use pong_core::ids::Handedness;
use pong_core::net::actions::{MoveAction, PongAction};
use pong_core::net::bus::ActionBus;
use pong_core::scene::Scene;

use crate::instance::GameInstance;

/// Mirror the local avatar's hand onto the paddle of every goal it occupies.
/// Paddles of goals held by other avatars are left to their owners.
pub fn drive_paddles(
    instance: &GameInstance,
    scene: &Scene,
    bus: &mut ActionBus,
    peer: &LocalPeer,
    hand: Handedness,
) -> Result<usize, PongError> {
    let Some(local) = peer.avatar(scene).and_then(|id| scene.uuid(id)) else {
        return Ok(0);
    };
    let mut driven = 0;
    for goal in &instance.goals {
        let (Some(avatar), Some(paddle)) = (&goal.avatar, &goal.paddle) else {
            continue;
        };
        if avatar != local {
            continue;
        }
        let Some(pose) = scene
            .entity_by_uuid(avatar)
            .and_then(|id| scene.get(id))
            .and_then(|e| e.rig.as_ref())
            .and_then(|rig| rig.hand(hand))
        else {
            continue;
        };
        bus.dispatch(PongAction::Move(MoveAction::kinematic(
            paddle.clone(),
            pose.position,
            pose.rotation,
        )))?;
        driven += 1;
    }
    Ok(driven)
}
