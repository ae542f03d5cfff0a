use pong_core::error::PongError;
use pong_core::net::actions::{MoveAction, PongAction};
use pong_core::net::bus::ActionBus;
use pong_core::scene::{Marker, Scene};

use crate::config::ArenaConfig;
use crate::instance::{GameInstance, resolve};

/// Charge every goal for each ball touching its plate. Each hit lowers the
/// goal's health locally, parks the ball locally (so it is not counted again
/// this tick) and replicates both. Returns true if any goal is down.
pub fn evaluate_goals(
    instance: &mut GameInstance,
    scene: &mut Scene,
    bus: &mut ActionBus,
    config: &ArenaConfig,
) -> Result<bool, PongError> {
    let mut game_over = false;
    for goal in &mut instance.goals {
        let Some(plate) = &goal.plate else {
            continue;
        };
        let plate = match resolve(scene, plate) {
            Ok(id) => id,
            Err(e) => {
                tracing::debug!(goal = %goal.entity, error = %e, "plate missing, goal not scored");
                continue;
            },
        };
        let hits: Vec<_> = scene
            .collisions(plate)
            .iter()
            .copied()
            .filter(|&id| scene.has_marker(id, Marker::Ball))
            .collect();

        for ball in hits {
            let Some(ball_uuid) = scene.uuid(ball).cloned() else {
                continue;
            };
            if !instance.balls.iter().any(|b| b.entity == ball_uuid) {
                continue;
            }
            goal.health -= 1;
            if goal.health <= 0 {
                game_over = true;
            }
            bus.dispatch(PongAction::set_goal_health(goal.entity.clone(), goal.health))?;

            scene.teleport(ball, Some(config.parked_position), None);
            scene.forget_collisions(ball);
            bus.dispatch(PongAction::Move(MoveAction::position(
                ball_uuid,
                config.parked_position,
            )))?;
        }
    }
    Ok(game_over)
}

/// Reset every goal to its starting health and park every ball, locally and
/// through the bus.
pub fn reset_for_new_game(
    instance: &mut GameInstance,
    scene: &mut Scene,
    bus: &mut ActionBus,
    config: &ArenaConfig,
) -> Result<(), PongError> {
    for goal in &mut instance.goals {
        goal.health = goal.starting_health;
        bus.dispatch(PongAction::set_goal_health(goal.entity.clone(), goal.health))?;
    }
    for ball in &instance.balls {
        if let Some(id) = scene.entity_by_uuid(&ball.entity) {
            scene.teleport(id, Some(config.parked_position), None);
            scene.forget_collisions(id);
        }
        bus.dispatch(PongAction::Move(MoveAction::position(
            ball.entity.clone(),
            config.parked_position,
        )))?;
    }
    Ok(())
}
