pub mod ball_drop;
pub mod config;
pub mod observer;
pub mod paddles;
pub mod plates;
pub mod state;

use std::collections::BTreeSet;

use pong_core::error::PongError;
use pong_core::game_trait::{GameMetadata, PongGame, TickContext, apply_shared_action};
use pong_core::ids::{EntityUuid, GameUuid};
use pong_core::net::actions::PongAction;
use pong_core::net::bus::ActionEnvelope;
use pong_core::pong_game_boilerplate;
use pong_core::scene::Marker;

use config::CardinalConfig;
use observer::Observer;
use plates::PlateTracker;
use state::{CardinalState, PaddleInfo};

/// Cardinal Pong: four seats around a table, one ball at a time, every
/// miss costs the player on that side a point.
pub struct PongCardinal {
    state: CardinalState,
    config: CardinalConfig,
    plates: PlateTracker,
    observer: Observer,
    /// Games the server has asked to start and not yet seen start.
    start_requested: BTreeSet<GameUuid>,
}

impl PongCardinal {
    pub fn new() -> Self {
        Self::with_config(CardinalConfig::load())
    }

    pub fn with_config(config: CardinalConfig) -> Self {
        Self {
            state: CardinalState::default(),
            config,
            plates: PlateTracker::default(),
            observer: Observer::default(),
            start_requested: BTreeSet::new(),
        }
    }

    pub fn state(&self) -> &CardinalState {
        &self.state
    }

    pub fn config(&self) -> &CardinalConfig {
        &self.config
    }

    fn request_starts(&mut self, ctx: &mut TickContext<'_>) -> Result<(), PongError> {
        self.start_requested
            .retain(|g| !self.state.games.contains_key(g));
        for id in ctx.scene.query(Marker::Game) {
            let Some(game) = ctx.scene.uuid(id).map(GameUuid::from) else {
                continue;
            };
            if self.state.games.contains_key(&game) || self.start_requested.contains(&game) {
                continue;
            }
            ctx.bus.dispatch(PongAction::StartGame { game: game.clone() })?;
            self.start_requested.insert(game);
        }
        Ok(())
    }

    fn spawn_ball(
        &mut self,
        ctx: &mut TickContext<'_>,
        entity: &EntityUuid,
        game: &GameUuid,
    ) -> Result<(), PongError> {
        self.state.ball_spawned(game, entity.clone())?;
        let id = ball_drop::spawn_ball(ctx.scene, game, entity, &mut *ctx.rng, &self.config)?;
        if ctx.peer.is_server() {
            let toward = self
                .state
                .games
                .get(game)
                .map(|g| g.last_connected())
                .unwrap_or_default();
            ctx.scene.apply_impulse(
                id,
                ball_drop::cardinal_direction(toward) * self.config.ball_velocity,
            );
        }
        Ok(())
    }
}

impl Default for PongCardinal {
    fn default() -> Self {
        Self::new()
    }
}

impl PongGame for PongCardinal {
    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            name: "Pong Cardinal".to_string(),
            description: "Four seats, one ball; don't let it drop on your side".to_string(),
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
            PongAction::StartGame { game } => {
                if !self.state.games.contains_key(game) {
                    self.state.start_game(
                        game.clone(),
                        self.config.max_score,
                        self.config.ball_cooldown_ms,
                    );
                }
                Ok(())
            },
            PongAction::EndGame { game } => {
                if let Some(ball) = self.state.games.get(game).and_then(|g| g.ball.clone()) {
                    paddles::destroy_object(ctx.scene, &ball);
                }
                self.state.end_game(game);
                Ok(())
            },
            PongAction::PlayerChange {
                game,
                player_index,
                player,
            } => self
                .state
                .player_change(game, *player_index, player.clone()),
            PongAction::PlayerScore { game, player_index } => {
                self.state.player_score(game, *player_index).map(|_| ())
            },
            PongAction::SpawnBall {
                entity_uuid, game, ..
            } => self.spawn_ball(ctx, entity_uuid, game),
            PongAction::SpawnPaddle {
                entity_uuid,
                game,
                handedness,
                owner,
                ..
            } => {
                let info = PaddleInfo {
                    owner: owner.clone(),
                    handedness: *handedness,
                    game: game.clone(),
                };
                paddles::spawn_paddle(ctx.scene, entity_uuid, &info, &self.config)?;
                self.state.paddle_spawned(entity_uuid.clone(), info);
                Ok(())
            },
            PongAction::DestroyObject { entity_uuid } => {
                self.state
                    .object_destroyed(entity_uuid, self.config.ball_cooldown_ms);
                paddles::destroy_object(ctx.scene, entity_uuid);
                Ok(())
            },
            _ => Ok(()),
        }
    }

    fn execute(&mut self, ctx: &mut TickContext<'_>) {
        if ctx.peer.is_server() {
            if let Err(e) = self.request_starts(ctx) {
                e.log("cardinal");
            }
            self.plates.update(&self.state, ctx.scene, ctx.bus);
            let timestep_ms = ctx.clock.timestep_ms;
            for (uuid, game) in self.state.games.iter_mut() {
                if let Err(e) =
                    ball_drop::game_logic(uuid, game, ctx.scene, ctx.bus, timestep_ms, &self.config)
                {
                    e.log(uuid.as_str());
                }
            }
        }

        self.observer
            .observe(&self.state, ctx.scene, ctx.bus, ctx.peer, &self.config);

        if let Err(e) = paddles::follow_hands(&self.state, ctx.scene, ctx.bus, ctx.peer) {
            e.log("cardinal");
        }
    }

    pong_game_boilerplate!(state_type: CardinalState);

    fn replicated_view(&self) -> Vec<u8> {
        // Cooldown is only counted down on the server.
        let view: Vec<_> = self
            .state
            .games
            .iter()
            .map(|(uuid, g)| (uuid, &g.players, &g.ball))
            .collect();
        rmp_serde::to_vec(&(view, &self.state.paddles)).unwrap_or_default()
    }
}
