//! Replicated state of the cardinal variant and the reducers that apply
//! delivered actions to it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use pong_core::error::PongError;
use pong_core::ids::{EntityUuid, GameUuid, Handedness, UserId};
use pong_core::net::actions::MAX_PLAYERS;

/// Slot letters, used in plate (`plateA`) and score bar (`scoreA`) names.
pub const SLOT_LETTERS: [char; MAX_PLAYERS] = ['A', 'B', 'C', 'D'];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSlot {
    pub score: i32,
    pub connected: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardinalGame {
    pub players: [PlayerSlot; MAX_PLAYERS],
    pub ball: Option<EntityUuid>,
    /// Remaining ms before the next ball may spawn. Only the server counts it down.
    pub ball_cooldown: f64,
}

impl CardinalGame {
    pub fn new(max_score: i32, cooldown_ms: f64) -> Self {
        let slot = PlayerSlot {
            score: max_score,
            connected: None,
        };
        Self {
            players: [slot.clone(), slot.clone(), slot.clone(), slot],
            ball: None,
            ball_cooldown: cooldown_ms,
        }
    }

    pub fn any_connected(&self) -> bool {
        self.players.iter().any(|p| p.connected.is_some())
    }

    /// Index of the highest connected slot, or 0 when nobody is connected.
    pub fn last_connected(&self) -> usize {
        self.players
            .iter()
            .rposition(|p| p.connected.is_some())
            .unwrap_or(0)
    }
}

/// A paddle wielded by a connected player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaddleInfo {
    pub owner: UserId,
    pub handedness: Handedness,
    pub game: GameUuid,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardinalState {
    pub games: BTreeMap<GameUuid, CardinalGame>,
    pub paddles: BTreeMap<EntityUuid, PaddleInfo>,
}

impl CardinalState {
    fn game_mut(&mut self, game: &GameUuid) -> Result<&mut CardinalGame, PongError> {
        self.games
            .get_mut(game)
            .ok_or_else(|| PongError::MissingBinding(format!("game {game} has not started")))
    }

    pub fn start_game(&mut self, game: GameUuid, max_score: i32, cooldown_ms: f64) {
        self.games
            .insert(game, CardinalGame::new(max_score, cooldown_ms));
    }

    pub fn end_game(&mut self, game: &GameUuid) {
        self.games.remove(game);
    }

    pub fn player_change(
        &mut self,
        game: &GameUuid,
        index: u8,
        user: Option<UserId>,
    ) -> Result<(), PongError> {
        let slot = slot_mut(self.game_mut(game)?, index)?;
        slot.connected = user;
        Ok(())
    }

    /// Charge a miss to a slot. Returns the new score.
    pub fn player_score(&mut self, game: &GameUuid, index: u8) -> Result<i32, PongError> {
        let slot = slot_mut(self.game_mut(game)?, index)?;
        slot.score -= 1;
        Ok(slot.score)
    }

    pub fn ball_spawned(&mut self, game: &GameUuid, ball: EntityUuid) -> Result<(), PongError> {
        self.game_mut(game)?.ball = Some(ball);
        Ok(())
    }

    /// Clear the ball of whichever game owns `entity` and restart its
    /// cooldown, and forget the entity if it is a paddle. Returns the game
    /// whose ball was destroyed.
    pub fn object_destroyed(&mut self, entity: &EntityUuid, cooldown_ms: f64) -> Option<GameUuid> {
        self.paddles.remove(entity);
        let (uuid, game) = self
            .games
            .iter_mut()
            .find(|(_, g)| g.ball.as_ref() == Some(entity))?;
        game.ball = None;
        game.ball_cooldown = cooldown_ms;
        Some(uuid.clone())
    }

    pub fn paddle_spawned(&mut self, entity: EntityUuid, info: PaddleInfo) {
        self.paddles.insert(entity, info);
    }
}

fn slot_mut(game: &mut CardinalGame, index: u8) -> Result<&mut PlayerSlot, PongError> {
    game.players.get_mut(usize::from(index)).ok_or_else(|| {
        PongError::Configuration(format!("player index {index} out of range"))
    })
}
