//! Discovery of goals, balls and goal parts by proximity, and per-tick
//! avatar occupancy of goal plates.

use glam::Vec3;

use pong_core::error::PongError;
use pong_core::ids::{EntityUuid, GameUuid};
use pong_core::scene::{Marker, Scene, planar_distance_sq};

use crate::config::{ArenaConfig, AvatarPolicy};
use crate::instance::{ArenaState, BallBinding, GoalBinding, resolve};

/// Append every goal and ball not yet owned by any game, then attach the
/// first paddle, text and plate within `bind_radius` of each goal still
/// missing one. Existing bindings are never revisited.
pub fn bind_parts(
    state: &mut ArenaState,
    game: &GameUuid,
    scene: &Scene,
    config: &ArenaConfig,
) -> Result<(), PongError> {
    let new_goals: Vec<EntityUuid> = unclaimed(state, scene, Marker::Goal);
    let new_balls: Vec<EntityUuid> = unclaimed(state, scene, Marker::Ball);

    let instance = state
        .games
        .get_mut(game)
        .ok_or_else(|| PongError::MissingBinding(format!("no instance for game {game}")))?;

    if !new_goals.is_empty() {
        tracing::info!(game = %game, count = new_goals.len(), "bound goals");
    }
    instance.goals.extend(
        new_goals
            .into_iter()
            .map(|uuid| GoalBinding::new(uuid, config.starting_health)),
    );
    if !new_balls.is_empty() {
        tracing::info!(game = %game, count = new_balls.len(), "bound balls");
    }
    instance.balls.extend(new_balls.into_iter().map(|entity| BallBinding {
        entity,
        last_volley: 0.0,
    }));

    let radius_sq = config.bind_radius * config.bind_radius;
    for goal in &mut instance.goals {
        let Some(goal_pos) = scene
            .entity_by_uuid(&goal.entity)
            .and_then(|id| scene.transform(id))
            .map(|t| t.position)
        else {
            continue;
        };
        for (slot, marker) in [
            (&mut goal.paddle, Marker::Paddle),
            (&mut goal.text, Marker::Text),
            (&mut goal.plate, Marker::Plate),
        ] {
            if slot.is_some() {
                continue;
            }
            if let Some(found) = first_near(scene, marker, goal_pos, radius_sq) {
                tracing::info!(game = %game, goal = %goal.entity, part = %found, ?marker, "bound goal part");
                *slot = Some(found);
            }
        }
    }
    Ok(())
}

fn unclaimed(state: &ArenaState, scene: &Scene, marker: Marker) -> Vec<EntityUuid> {
    scene
        .query(marker)
        .into_iter()
        .filter_map(|id| scene.uuid(id).cloned())
        .filter(|uuid| !state.is_claimed(uuid))
        .collect()
}

fn first_near(scene: &Scene, marker: Marker, center: Vec3, radius_sq: f32) -> Option<EntityUuid> {
    scene.query(marker).into_iter().find_map(|id| {
        let record = scene.get(id)?;
        (planar_distance_sq(record.transform.position, center) < radius_sq)
            .then(|| record.uuid.clone())
    })
}

/// Clear and recompute which avatar stands on each goal's plate. An avatar
/// occupies a plate when its planar distance is under the plate's X scale.
/// Returns the number of avatar/goal matches.
pub fn bind_avatars(
    state: &mut ArenaState,
    game: &GameUuid,
    scene: &Scene,
    policy: AvatarPolicy,
) -> Result<usize, PongError> {
    let instance = state
        .games
        .get_mut(game)
        .ok_or_else(|| PongError::MissingBinding(format!("no instance for game {game}")))?;
    let avatars = scene.query(Marker::Avatar);
    let mut matches = 0;

    for goal in &mut instance.goals {
        goal.avatar = None;
        let Some(plate) = &goal.plate else {
            continue;
        };
        let plate = match resolve(scene, plate) {
            Ok(id) => id,
            Err(e) => {
                tracing::debug!(goal = %goal.entity, error = %e, "plate missing");
                continue;
            },
        };
        let Some(plate_t) = scene.transform(plate) else {
            continue;
        };
        let size_sq = plate_t.scale.x * plate_t.scale.x;

        let mut best: Option<(f32, EntityUuid)> = None;
        for &avatar in &avatars {
            let Some(record) = scene.get(avatar) else {
                continue;
            };
            let dist = planar_distance_sq(record.transform.position, plate_t.position);
            if dist >= size_sq {
                continue;
            }
            matches += 1;
            let take = match (&best, policy) {
                (None, _) => true,
                (Some(_), AvatarPolicy::First) => false,
                (Some(_), AvatarPolicy::Last) => true,
                (Some((d, _)), AvatarPolicy::Closest) => dist < *d,
            };
            if take {
                best = Some((dist, record.uuid.clone()));
            }
        }
        goal.avatar = best.map(|(_, uuid)| uuid);
    }
    Ok(matches)
}
