pub mod binding;
pub mod config;
pub mod instance;
pub mod paddle_bridge;
pub mod scoring;
pub mod state_machine;
pub mod volley;

use pong_core::error::PongError;
use pong_core::game_trait::{GameMetadata, PongGame, TickContext, apply_shared_action};
use pong_core::ids::{EntityUuid, GameUuid};
use pong_core::net::actions::{GameMode, PongAction};
use pong_core::net::bus::ActionEnvelope;
use pong_core::pong_game_boilerplate;
use pong_core::scene::{EntityId, Marker, Scene};

use config::ArenaConfig;
use instance::{ArenaState, GameInstance};

/// Arena Pong: goals with health around a shared center, balls volleyed
/// from above, any goal reaching zero ends the game.
pub struct PongArena {
    state: ArenaState,
    config: ArenaConfig,
}

impl PongArena {
    pub fn new() -> Self {
        Self::with_config(ArenaConfig::load())
    }

    pub fn with_config(config: ArenaConfig) -> Self {
        Self {
            state: ArenaState::default(),
            config,
        }
    }

    pub fn state(&self) -> &ArenaState {
        &self.state
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    fn instance_for(
        &mut self,
        scene: &Scene,
        uuid: &GameUuid,
    ) -> Result<&mut GameInstance, PongError> {
        if !self.state.games.contains_key(uuid) {
            let id = scene
                .entity_by_uuid(&uuid.entity())
                .ok_or_else(|| PongError::MissingBinding(format!("game {uuid} not in scene")))?;
            if !scene.has_marker(id, Marker::Game) {
                return Err(PongError::Configuration(format!(
                    "{uuid} is not a game entity"
                )));
            }
        }
        Ok(self.state.games.entry(uuid.clone()).or_default())
    }

    fn set_goal_health(
        &mut self,
        scene: &mut Scene,
        entity: &EntityUuid,
        health: i32,
    ) -> Result<(), PongError> {
        let goal = self
            .state
            .goal_mut(entity)
            .ok_or_else(|| PongError::MissingBinding(format!("goal {entity} is not bound")))?;
        goal.health = health;
        if let Some(text) = &goal.text
            && let Some(id) = scene.entity_by_uuid(text)
            && let Some(record) = scene.get_mut(id)
        {
            record.text = Some(health.to_string());
        }
        Ok(())
    }

    /// Bind, drive paddles, and on the server evaluate rules for one game.
    fn tick_game(
        &mut self,
        ctx: &mut TickContext<'_>,
        uuid: &GameUuid,
        game_entity: EntityId,
    ) -> Result<(), PongError> {
        binding::bind_parts(&mut self.state, uuid, ctx.scene, &self.config)?;
        let occupied =
            binding::bind_avatars(&mut self.state, uuid, ctx.scene, self.config.avatar_policy)?;

        let instance = self
            .state
            .games
            .get_mut(uuid)
            .ok_or_else(|| PongError::MissingBinding(format!("no instance for game {uuid}")))?;
        paddle_bridge::drive_paddles(
            instance,
            ctx.scene,
            ctx.bus,
            ctx.peer,
            self.config.paddle_hand,
        )?;

        if !ctx.peer.is_server() {
            return Ok(());
        }

        if let Some(next) = state_machine::next_mode(instance.mode, occupied) {
            if next == GameMode::Playing {
                scoring::reset_for_new_game(instance, ctx.scene, ctx.bus, &self.config)?;
            }
            instance.mode = next;
            ctx.bus.dispatch(PongAction::set_mode(uuid.clone(), next))?;
            ctx.bus
                .netlog(format!("game {uuid} is now {}", next.as_str()));
        }

        if instance.mode == GameMode::Playing {
            let center = ctx
                .scene
                .transform(game_entity)
                .map(|t| t.position)
                .unwrap_or_default();
            if let Err(e) = volley::volley(
                instance,
                center,
                ctx.clock.elapsed_seconds,
                ctx.scene,
                ctx.bus,
                &mut *ctx.rng,
                &self.config,
            ) {
                e.log(uuid.as_str());
            }
            // A goal can also be down from a replicated health update.
            let scored_out = scoring::evaluate_goals(instance, ctx.scene, ctx.bus, &self.config)?;
            if scored_out || instance.any_goal_down() {
                instance.mode = GameMode::Completed;
                ctx.bus
                    .dispatch(PongAction::set_mode(uuid.clone(), GameMode::Completed))?;
                ctx.bus.netlog(format!("game {uuid} ended"));
            }
        }
        Ok(())
    }
}

impl Default for PongArena {
    fn default() -> Self {
        Self::new()
    }
}

impl PongGame for PongArena {
    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            name: "Pong Arena".to_string(),
            description: "Defend your goal; last goal standing wins".to_string(),
            max_players: 4,
        }
    }

    fn receive(
        &mut self,
        ctx: &mut TickContext<'_>,
        envelope: &ActionEnvelope,
    ) -> Result<(), PongError> {
        if apply_shared_action(ctx, envelope)? {
            return Ok(());
        }
        match &envelope.action {
            PongAction::SetMode { uuid, mode } => {
                self.instance_for(ctx.scene, uuid)?.mode = *mode;
                Ok(())
            },
            PongAction::SetGoalHealth {
                entity_uuid,
                health,
            } => self.set_goal_health(ctx.scene, entity_uuid, *health),
            _ => Ok(()),
        }
    }

    fn execute(&mut self, ctx: &mut TickContext<'_>) {
        for game_entity in ctx.scene.query(Marker::Game) {
            let Some(uuid) = ctx.scene.uuid(game_entity).map(GameUuid::from) else {
                continue;
            };
            self.state.games.entry(uuid.clone()).or_default();
            if let Err(e) = self.tick_game(ctx, &uuid, game_entity) {
                e.log(uuid.as_str());
            }
        }
    }

    pong_game_boilerplate!(state_type: ArenaState);

    fn replicated_view(&self) -> Vec<u8> {
        let view: Vec<(&GameUuid, GameMode, Vec<(&EntityUuid, i32)>)> = self
            .state
            .games
            .iter()
            .map(|(uuid, g)| {
                (
                    uuid,
                    g.mode,
                    g.goals.iter().map(|goal| (&goal.entity, goal.health)).collect(),
                )
            })
            .collect();
        rmp_serde::to_vec(&view).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use glam::{Quat, Vec3};

    use super::*;
    use pong_core::physics::{Collider, RigidBody, groups};
    use pong_core::scene::{EntityRecord, Transform};
    use pong_core::test_helpers::{
        PeerHarness, contract_garbage_state_is_ignored, contract_move_for_missing_entity_is_harmless,
        contract_state_roundtrip_preserves, contract_ticks_are_deterministic, spawn_avatar,
    };

    /// One game at the origin with a single north goal, its plate, paddle
    /// and text, and two parked balls.
    fn arena_scene() -> Scene {
        let mut scene = Scene::default();
        let mut add = |record: EntityRecord| {
            scene.insert(record).unwrap();
        };
        add(EntityRecord::new("game", "Pong").with_marker(Marker::Game));
        let goal_at = Vec3::new(0.0, 0.0, 4.0);
        add(EntityRecord::new("goal-n", "goal")
            .with_marker(Marker::Goal)
            .with_transform(Transform::from_position(goal_at)));
        add(EntityRecord::new("plate-n", "plate")
            .with_marker(Marker::Plate)
            .with_transform(Transform::from_position(goal_at).with_scale(Vec3::new(1.5, 0.1, 1.5)))
            .with_collider(
                Collider::cuboid(Vec3::splat(0.5))
                    .groups(groups::TRIGGER, groups::DEFAULT | groups::AVATARS)
                    .sensor(),
            ));
        add(EntityRecord::new("paddle-n", "paddle")
            .with_marker(Marker::Paddle)
            .with_transform(Transform::from_position(goal_at + Vec3::Y))
            .with_body(RigidBody::kinematic().at(goal_at + Vec3::Y, Quat::IDENTITY)));
        add(EntityRecord::new("text-n", "text")
            .with_marker(Marker::Text)
            .with_transform(Transform::from_position(goal_at + Vec3::new(0.0, 2.0, 1.0)))
            .with_text("9"));
        for i in 0..2 {
            let parked = Vec3::splat(-1000.0);
            add(EntityRecord::new(format!("ball-{i}"), "ball")
                .with_marker(Marker::Ball)
                .with_transform(Transform::from_position(parked))
                .with_body(RigidBody::dynamic().at(parked, Quat::IDENTITY))
                .with_collider(Collider::sphere(0.1).restitution(1.0)));
        }
        scene
    }

    fn game() -> GameUuid {
        GameUuid::new("game")
    }

    fn modes(actions: &[PongAction]) -> Vec<GameMode> {
        actions
            .iter()
            .filter_map(|a| match a {
                PongAction::SetMode { mode, .. } => Some(*mode),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn occupied_goal_starts_then_plays() {
        let mut arena = PongArena::with_config(ArenaConfig::default());
        let mut server = PeerHarness::server(arena_scene());
        spawn_avatar(&mut server.scene, "alice", Vec3::new(0.0, 0.0, 4.0));

        let first = server.step(&mut arena);
        assert_eq!(modes(&first), vec![GameMode::Starting]);
        let second = server.step(&mut arena);
        assert_eq!(modes(&second), vec![GameMode::Playing]);
        assert_eq!(arena.state.games[&game()].mode, GameMode::Playing);
        // Reset health plus two parked balls, then the first volley.
        assert!(second.iter().any(|a| matches!(a, PongAction::Move(m) if m.impulse.is_some())));
    }

    #[test]
    fn empty_arena_stays_stopped() {
        let mut arena = PongArena::with_config(ArenaConfig::default());
        let mut server = PeerHarness::server(arena_scene());
        let out = server.run(&mut arena, 10);
        assert!(modes(&out).is_empty());
        assert_eq!(arena.state.games[&game()].mode, GameMode::Stopped);
    }

    #[test]
    fn scoring_completes_then_leaving_stops() {
        let mut arena = PongArena::with_config(ArenaConfig {
            starting_health: 1,
            ..ArenaConfig::default()
        });
        let mut server = PeerHarness::server(arena_scene());
        let alice = spawn_avatar(&mut server.scene, "alice", Vec3::new(0.0, 0.0, 4.0));
        server.run(&mut arena, 3);
        assert_eq!(arena.state.games[&game()].mode, GameMode::Playing);

        // Drop a ball straight onto the plate.
        let ball = server.scene.entity_by_uuid(&EntityUuid::new("ball-1")).unwrap();
        server
            .scene
            .teleport(ball, Some(Vec3::new(0.0, 0.1, 4.0)), None);
        let out = server.step(&mut arena);
        assert!(out.contains(&PongAction::set_goal_health(EntityUuid::new("goal-n"), 0)));
        assert_eq!(modes(&out), vec![GameMode::Completed]);

        // Staying on the plate keeps the game completed.
        let out = server.run(&mut arena, 3);
        assert!(modes(&out).is_empty());

        server.scene.transform_mut(alice).unwrap().position = Vec3::new(30.0, 0.0, 0.0);
        let out = server.step(&mut arena);
        assert_eq!(modes(&out), vec![GameMode::Stopped]);
    }

    #[test]
    fn replicated_zero_health_completes_once() {
        let mut arena = PongArena::with_config(ArenaConfig::default());
        let mut server = PeerHarness::server(arena_scene());
        spawn_avatar(&mut server.scene, "alice", Vec3::new(0.0, 0.0, 4.0));
        server.run(&mut arena, 3);
        assert_eq!(arena.state.games[&game()].mode, GameMode::Playing);

        server.inject(
            "server",
            PongAction::set_goal_health(EntityUuid::new("goal-n"), 0),
        );
        let out = server.run(&mut arena, 3);
        assert_eq!(modes(&out), vec![GameMode::Completed]);
        assert_eq!(arena.state.games[&game()].mode, GameMode::Completed);
        assert_eq!(arena.state.games[&game()].goals[0].health, 0);
    }

    #[test]
    fn goal_health_updates_the_bound_text() {
        let mut arena = PongArena::with_config(ArenaConfig::default());
        let mut client = PeerHarness::client("bob", arena_scene());
        client.step(&mut arena);
        client.inject(
            "server",
            PongAction::set_goal_health(EntityUuid::new("goal-n"), 4),
        );
        client.step(&mut arena);
        let text = client.scene.entity_by_uuid(&EntityUuid::new("text-n")).unwrap();
        assert_eq!(client.scene.get(text).unwrap().text.as_deref(), Some("4"));
        assert_eq!(arena.state.games[&game()].goals[0].health, 4);
    }

    #[test]
    fn client_never_evaluates_rules() {
        let mut arena = PongArena::with_config(ArenaConfig::default());
        let mut client = PeerHarness::client("bob", arena_scene());
        spawn_avatar(&mut client.scene, "alice", Vec3::new(0.0, 0.0, 4.0));
        let out = client.run(&mut arena, 5);
        assert!(modes(&out).is_empty());
    }

    #[test]
    fn client_mirrors_replicated_mode() {
        let mut arena = PongArena::with_config(ArenaConfig::default());
        let mut client = PeerHarness::client("bob", arena_scene());
        client.inject("server", PongAction::set_mode(game(), GameMode::Playing));
        client.step(&mut arena);
        assert_eq!(arena.state.games[&game()].mode, GameMode::Playing);
    }

    #[test]
    fn local_avatar_drives_bound_paddle() {
        let mut arena = PongArena::with_config(ArenaConfig::default());
        let mut client = PeerHarness::client("alice", arena_scene());
        spawn_avatar(&mut client.scene, "alice", Vec3::new(0.2, 0.0, 4.0));
        client.run(&mut arena, 3);
        let paddle = client.scene.entity_by_uuid(&EntityUuid::new("paddle-n")).unwrap();
        let body = client.scene.body(paddle).unwrap();
        assert_eq!(body.target_kinematic_position, Some(Vec3::new(0.5, 1.2, 4.0)));
    }

    // ================================================================
    // Game Trait Contract Tests
    // ================================================================

    #[test]
    fn contract_roundtrip() {
        let mut arena = PongArena::with_config(ArenaConfig::default());
        let mut server = PeerHarness::server(arena_scene());
        server.run(&mut arena, 2);
        contract_state_roundtrip_preserves(&mut arena);
        contract_garbage_state_is_ignored(&mut arena);
    }

    #[test]
    fn contract_missing_move_target() {
        let mut arena = PongArena::with_config(ArenaConfig::default());
        let mut server = PeerHarness::server(arena_scene());
        contract_move_for_missing_entity_is_harmless(&mut arena, &mut server);
    }

    #[test]
    fn contract_deterministic() {
        contract_ticks_are_deterministic(
            || {
                let mut peer = PeerHarness::server(arena_scene());
                spawn_avatar(&mut peer.scene, "alice", Vec3::new(0.0, 0.0, 4.0));
                let game: Box<dyn PongGame> =
                    Box::new(PongArena::with_config(ArenaConfig::default()));
                (game, peer)
            },
            600,
        );
    }
}
