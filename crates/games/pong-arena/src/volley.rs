use glam::Vec3;
use rand::Rng;

use pong_core::error::PongError;
use pong_core::ids::EntityUuid;
use pong_core::net::actions::{MoveAction, PongAction};
use pong_core::net::bus::ActionBus;
use pong_core::scene::Scene;

use crate::config::ArenaConfig;
use crate::instance::{GameInstance, resolve};

/// A ball is parked when it sits farther than `play_radius` from the game center.
pub fn is_parked(scene: &Scene, uuid: &EntityUuid, center: Vec3, config: &ArenaConfig) -> bool {
    scene
        .entity_by_uuid(uuid)
        .and_then(|id| scene.physics_position(id))
        .is_some_and(|p| p.distance_squared(center) > config.play_radius * config.play_radius)
}

/// Index of the least-recently-volleyed parked ball. Ties go to the first.
pub fn pick_ball(
    instance: &GameInstance,
    scene: &Scene,
    center: Vec3,
    config: &ArenaConfig,
) -> Option<usize> {
    instance
        .balls
        .iter()
        .enumerate()
        .filter(|(_, b)| is_parked(scene, &b.entity, center, config))
        .fold(None, |best: Option<(usize, f64)>, (i, b)| match best {
            Some((_, t)) if t <= b.last_volley => best,
            _ => Some((i, b.last_volley)),
        })
        .map(|(i, _)| i)
}

/// Every `volley_interval_secs`, launch one parked ball from above the game
/// center toward a random goal. Returns the volleyed ball, if any.
pub fn volley(
    instance: &mut GameInstance,
    center: Vec3,
    now: f64,
    scene: &Scene,
    bus: &mut ActionBus,
    rng: &mut impl Rng,
    config: &ArenaConfig,
) -> Result<Option<EntityUuid>, PongError> {
    if instance.balls.is_empty() || instance.goals.is_empty() {
        return Ok(None);
    }
    if now < instance.next_volley_at {
        return Ok(None);
    }
    let Some(index) = pick_ball(instance, scene, center, config) else {
        tracing::debug!("no parked ball to volley");
        instance.next_volley_at = now + config.volley_interval_secs;
        return Ok(None);
    };

    let goal = &instance.goals[rng.random_range(0..instance.goals.len())];
    let goal_pos = scene
        .transform(resolve(scene, &goal.entity)?)
        .map(|t| t.position)
        .unwrap_or(center);
    let magnitude = if config.impulse_max > config.impulse_min {
        rng.random_range(config.impulse_min..config.impulse_max)
    } else {
        config.impulse_min
    };
    let impulse = (goal_pos - center).normalize_or_zero() * magnitude;

    let entity = instance.balls[index].entity.clone();
    bus.dispatch(PongAction::Move(MoveAction {
        position: Some(center + config.launch_offset),
        impulse: Some(impulse),
        ..MoveAction::new(entity.clone())
    }))?;
    // Stamp only a launched ball.
    instance.balls[index].last_volley = now;
    instance.next_volley_at = now + config.volley_interval_secs;
    bus.netlog(format!("volleyed ball {entity}"));
    Ok(Some(entity))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::instance::{BallBinding, GoalBinding};
    use pong_core::ids::UserId;
    use pong_core::scene::{EntityRecord, Marker, Transform};

    fn setup(ball_positions: &[Vec3], stamps: &[f64]) -> (Scene, GameInstance) {
        let mut scene = Scene::default();
        scene
            .insert(
                EntityRecord::new("goal", "goal")
                    .with_marker(Marker::Goal)
                    .with_transform(Transform::from_position(Vec3::new(0.0, 0.0, 5.0))),
            )
            .unwrap();
        let mut instance = GameInstance::default();
        instance
            .goals
            .push(GoalBinding::new(EntityUuid::new("goal"), 9));
        for (i, (pos, stamp)) in ball_positions.iter().zip(stamps).enumerate() {
            let uuid = format!("ball-{i}");
            scene
                .insert(
                    EntityRecord::new(uuid.as_str(), "ball")
                        .with_marker(Marker::Ball)
                        .with_transform(Transform::from_position(*pos)),
                )
                .unwrap();
            instance.balls.push(BallBinding {
                entity: EntityUuid::new(uuid),
                last_volley: *stamp,
            });
        }
        (scene, instance)
    }

    const PARKED: Vec3 = Vec3::splat(-1000.0);

    #[test]
    fn picks_least_recent_parked_ball() {
        let (scene, instance) = setup(
            &[PARKED, Vec3::new(0.0, 1.0, 0.0), PARKED, PARKED],
            &[5.0, 0.0, 2.0, 2.0],
        );
        // ball-1 has the oldest stamp but is in play.
        assert_eq!(
            pick_ball(&instance, &scene, Vec3::ZERO, &ArenaConfig::default()),
            Some(2)
        );
    }

    #[test]
    fn volley_is_rate_limited_and_stamps_the_ball() {
        let (scene, mut instance) = setup(&[PARKED, PARKED], &[0.0, 0.0]);
        let mut bus = ActionBus::new(UserId::new("server"));
        let mut rng = StdRng::seed_from_u64(1);
        let config = ArenaConfig::default();

        let first = volley(&mut instance, Vec3::ZERO, 1.0, &scene, &mut bus, &mut rng, &config)
            .unwrap();
        assert_eq!(first.as_ref().map(|u| u.as_str()), Some("ball-0"));
        assert_eq!(instance.balls[0].last_volley, 1.0);
        assert_eq!(instance.next_volley_at, 6.0);

        let early = volley(&mut instance, Vec3::ZERO, 3.0, &scene, &mut bus, &mut rng, &config)
            .unwrap();
        assert!(early.is_none());

        let out = bus.take_outgoing();
        let PongAction::Move(m) = &out[0].action else {
            panic!("expected move, got {:?}", out[0].action);
        };
        assert_eq!(m.position, Some(Vec3::new(0.0, 5.0, 0.0)));
        let impulse = m.impulse.unwrap();
        assert!(impulse.length() >= 0.2 && impulse.length() < 0.3);
        // Toward the only goal (+Z).
        assert!(impulse.z > 0.0 && impulse.x.abs() < 1e-5);
    }

    #[test]
    fn unresolvable_goal_leaves_the_ball_unstamped() {
        let (scene, mut instance) = setup(&[PARKED], &[0.0]);
        instance.goals[0].entity = EntityUuid::new("missing");
        let mut bus = ActionBus::new(UserId::new("server"));
        let mut rng = StdRng::seed_from_u64(1);
        let config = ArenaConfig::default();

        let err = volley(&mut instance, Vec3::ZERO, 1.0, &scene, &mut bus, &mut rng, &config);
        assert!(matches!(err, Err(PongError::MissingBinding(_))));
        assert_eq!(instance.balls[0].last_volley, 0.0);
        assert_eq!(instance.next_volley_at, 0.0);
        assert_eq!(bus.pending_outgoing(), 0);

        instance.goals[0].entity = EntityUuid::new("goal");
        let retried = volley(&mut instance, Vec3::ZERO, 1.0, &scene, &mut bus, &mut rng, &config)
            .unwrap();
        assert_eq!(retried.as_ref().map(|u| u.as_str()), Some("ball-0"));
        assert_eq!(instance.balls[0].last_volley, 1.0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn volley_always_takes_the_minimum_parked_stamp(
                entries in proptest::collection::vec((any::<bool>(), 0u32..100), 1..8),
            ) {
                let positions: Vec<Vec3> = entries
                    .iter()
                    .map(|(parked, _)| if *parked { PARKED } else { Vec3::ZERO })
                    .collect();
                let stamps: Vec<f64> = entries.iter().map(|(_, s)| f64::from(*s)).collect();
                let (scene, instance) = setup(&positions, &stamps);
                let picked = pick_ball(&instance, &scene, Vec3::ZERO, &ArenaConfig::default());

                let min_parked = entries
                    .iter()
                    .filter(|(parked, _)| *parked)
                    .map(|(_, s)| *s)
                    .min();
                match (picked, min_parked) {
                    (None, None) => {},
                    (Some(i), Some(min)) => {
                        prop_assert!(entries[i].0, "picked a ball in play");
                        prop_assert_eq!(entries[i].1, min);
                        // First among equals.
                        let first = entries.iter().position(|(p, s)| *p && *s == min);
                        prop_assert_eq!(Some(i), first);
                    },
                    other => prop_assert!(false, "mismatch {:?}", other),
                }
            }
        }
    }
}
