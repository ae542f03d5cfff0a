//! Seat plates: standing on `plateB` claims slot 1 of the enclosing game.

use std::collections::BTreeMap;

use pong_core::error::PongError;
use pong_core::ids::{GameUuid, UserId};
use pong_core::net::actions::PongAction;
use pong_core::net::bus::ActionBus;
use pong_core::scene::{EntityId, Marker, Scene};

use crate::state::{CardinalState, SLOT_LETTERS};

/// Slot index encoded in a plate's name, e.g. `plateC` is slot 2.
pub fn plate_slot(name: &str) -> Option<u8> {
    let letter = name.strip_prefix("plate")?;
    let mut chars = letter.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    SLOT_LETTERS
        .iter()
        .position(|&l| l == c)
        .and_then(|i| u8::try_from(i).ok())
}

/// Server-side record of which avatars stood on which plate last tick.
#[derive(Debug, Default)]
pub struct PlateTracker {
    occupants: BTreeMap<GameUuid, BTreeMap<u8, Vec<UserId>>>,
}

impl PlateTracker {
    /// Diff every plate's avatar overlaps against last tick and dispatch a
    /// `playerChange` for each arrival and for each departure of the
    /// connected player.
    pub fn update(&mut self, state: &CardinalState, scene: &Scene, bus: &mut ActionBus) {
        self.occupants.retain(|game, _| state.games.contains_key(game));
        for plate in scene.query(Marker::Plate) {
            if let Err(e) = self.update_plate(plate, state, scene, bus) {
                e.log("plate");
            }
        }
    }

    fn update_plate(
        &mut self,
        plate: EntityId,
        state: &CardinalState,
        scene: &Scene,
        bus: &mut ActionBus,
    ) -> Result<(), PongError> {
        let (game_uuid, index) = plate_binding(scene, plate)?;
        let Some(game) = state.games.get(&game_uuid) else {
            return Ok(());
        };

        let mut present: Vec<UserId> = Vec::new();
        for &other in scene.collisions(plate) {
            if let Some(record) = scene.get(other)
                && record.has_marker(Marker::Avatar)
                && let Some(owner) = &record.owner
                && !present.contains(owner)
            {
                present.push(owner.clone());
            }
        }

        let previous = self
            .occupants
            .entry(game_uuid.clone())
            .or_default()
            .entry(index)
            .or_default();
        for user in present.iter().filter(|u| !previous.contains(u)) {
            bus.dispatch(PongAction::PlayerChange {
                game: game_uuid.clone(),
                player_index: index,
                player: Some(user.clone()),
            })?;
        }
        let connected = game.players[usize::from(index)].connected.as_ref();
        for user in previous.iter().filter(|u| !present.contains(u)) {
            if connected == Some(user) {
                bus.dispatch(PongAction::PlayerChange {
                    game: game_uuid.clone(),
                    player_index: index,
                    player: None,
                })?;
            }
        }
        *previous = present;
        Ok(())
    }
}

fn plate_binding(scene: &Scene, plate: EntityId) -> Result<(GameUuid, u8), PongError> {
    let record = scene
        .get(plate)
        .ok_or_else(|| PongError::MissingBinding("plate vanished".to_string()))?;
    let index = plate_slot(&record.name).ok_or_else(|| {
        PongError::Configuration(format!("plate {} has no slot letter", record.uuid))
    })?;
    let game = scene
        .find_ancestor(plate, |e| e.has_marker(Marker::Game))
        .and_then(|id| scene.uuid(id))
        .map(GameUuid::from)
        .ok_or_else(|| {
            PongError::Configuration(format!("plate {} is not inside a game", record.uuid))
        })?;
    Ok((game, index))
}
