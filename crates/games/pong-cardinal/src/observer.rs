//! Per-peer reaction to replicated state changes: logging, score bars and
//! the local player's paddles.

use std::collections::BTreeMap;

use pong_core::error::PongError;
use pong_core::game_trait::LocalPeer;
use pong_core::ids::{GameUuid, Handedness, UserId};
use pong_core::net::actions::{MAX_PLAYERS, PongAction};
use pong_core::net::bus::ActionBus;
use pong_core::scene::Scene;

use crate::config::CardinalConfig;
use crate::state::{CardinalState, PlayerSlot, SLOT_LETTERS};

type Seen = [Option<PlayerSlot>; MAX_PLAYERS];

/// Last slot contents this peer reacted to, per game.
#[derive(Debug, Default)]
pub struct Observer {
    seen: BTreeMap<GameUuid, Seen>,
}

impl Observer {
    pub fn observe(
        &mut self,
        state: &CardinalState,
        scene: &mut Scene,
        bus: &mut ActionBus,
        peer: &LocalPeer,
        config: &CardinalConfig,
    ) {
        let ended: Vec<GameUuid> = self
            .seen
            .keys()
            .filter(|g| !state.games.contains_key(*g))
            .cloned()
            .collect();
        for game in ended {
            tracing::info!(game = %game, "game ended");
            let Some(slots) = self.seen.remove(&game) else {
                continue;
            };
            for user in slots.iter().flatten().filter_map(|s| s.connected.as_ref()) {
                if *user == peer.user_id
                    && let Err(e) = destroy_paddles(bus, user)
                {
                    e.log(game.as_str());
                }
            }
        }

        for (uuid, game) in &state.games {
            let seen = self.seen.entry(uuid.clone()).or_insert_with(|| {
                tracing::info!(game = %uuid, "game started");
                Default::default()
            });
            for (index, slot) in game.players.iter().enumerate() {
                let before = seen[index].take();
                if let Err(e) =
                    react_to_slot(uuid, index, before.as_ref(), slot, scene, bus, peer, config)
                {
                    e.log(uuid.as_str());
                }
                seen[index] = Some(slot.clone());
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn react_to_slot(
    game: &GameUuid,
    index: usize,
    before: Option<&PlayerSlot>,
    now: &PlayerSlot,
    scene: &mut Scene,
    bus: &mut ActionBus,
    peer: &LocalPeer,
    config: &CardinalConfig,
) -> Result<(), PongError> {
    let letter = SLOT_LETTERS[index];
    let was = before.and_then(|s| s.connected.as_ref());
    if was != now.connected.as_ref() {
        if let Some(user) = was {
            tracing::info!(game = %game, slot = %letter, user = %user, "player left");
            if *user == peer.user_id {
                destroy_paddles(bus, user)?;
            }
        }
        if let Some(user) = &now.connected {
            tracing::info!(game = %game, slot = %letter, user = %user, "player joined");
            if *user == peer.user_id {
                for hand in Handedness::BOTH {
                    bus.dispatch(PongAction::spawn_paddle(game.clone(), user.clone(), hand))?;
                }
            }
        }
    }

    if before.map(|s| s.score) != Some(now.score) {
        tracing::info!(game = %game, slot = %letter, score = now.score, "score");
        set_score_bar(scene, game, letter, now.score, config.max_score)?;
    }
    Ok(())
}

fn destroy_paddles(bus: &mut ActionBus, user: &UserId) -> Result<(), PongError> {
    for hand in Handedness::BOTH {
        bus.dispatch(PongAction::DestroyObject {
            entity_uuid: user.paddle_uuid(hand),
        })?;
    }
    Ok(())
}

/// Scale the game's `score<letter>` bar to the remaining fraction of the
/// maximum score.
fn set_score_bar(
    scene: &mut Scene,
    game: &GameUuid,
    letter: char,
    score: i32,
    max_score: i32,
) -> Result<(), PongError> {
    let game_id = scene
        .entity_by_uuid(&game.entity())
        .ok_or_else(|| PongError::MissingBinding(format!("game {game} not in scene")))?;
    let name = format!("score{letter}");
    let Some(bar) = scene.find_descendant(game_id, |e| e.name == name) else {
        tracing::warn!(game = %game, bar = %name, "score bar missing");
        return Ok(());
    };
    let fraction = if max_score > 0 {
        score.max(0) as f32 / max_score as f32
    } else {
        0.0
    };
    if let Some(t) = scene.transform_mut(bar) {
        t.scale.x = fraction;
    }
    Ok(())
}
