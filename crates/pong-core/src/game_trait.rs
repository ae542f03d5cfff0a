use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::PongError;
use crate::ids::UserId;
use crate::net::actions::PongAction;
use crate::net::bus::{ActionBus, ActionEnvelope};
use crate::scene::{EntityId, Scene};
use crate::time::SimClock;

/// Whether a peer evaluates rules or only mirrors them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Authority {
    Server,
    Client,
}

/// Identity of the peer running a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPeer {
    pub user_id: UserId,
    pub authority: Authority,
}

impl LocalPeer {
    pub fn server(user_id: UserId) -> Self {
        Self {
            user_id,
            authority: Authority::Server,
        }
    }

    pub fn client(user_id: UserId) -> Self {
        Self {
            user_id,
            authority: Authority::Client,
        }
    }

    pub fn is_server(&self) -> bool {
        self.authority == Authority::Server
    }

    /// This peer's own avatar entity, if it has one in the scene.
    pub fn avatar(&self, scene: &Scene) -> Option<EntityId> {
        scene.avatar_of(&self.user_id)
    }
}

/// Everything a game may touch during one tick on one peer.
pub struct TickContext<'a> {
    pub scene: &'a mut Scene,
    pub bus: &'a mut ActionBus,
    pub peer: &'a LocalPeer,
    pub clock: &'a SimClock,
    pub rng: &'a mut StdRng,
}

/// Game metadata shown by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMetadata {
    pub name: String,
    pub description: String,
    pub max_players: u8,
}

/// Core trait every Pong rules variant implements.
///
/// The host owns the scene, the action bus and the clock; the game holds only
/// its own replicated state and weak references into the scene.
pub trait PongGame: Send {
    fn metadata(&self) -> GameMetadata;

    /// Apply one delivered action. Runs on every peer, in delivery order.
    fn receive(
        &mut self,
        ctx: &mut TickContext<'_>,
        envelope: &ActionEnvelope,
    ) -> Result<(), PongError>;

    /// Per-tick systems that run after queued actions were applied.
    fn execute(&mut self, ctx: &mut TickContext<'_>);

    /// Drain queued actions, apply them, then run the per-tick systems.
    fn tick(&mut self, ctx: &mut TickContext<'_>) {
        for envelope in ctx.bus.drain_incoming() {
            if let Err(e) = self.receive(ctx, &envelope) {
                e.log(envelope.action.type_name());
            }
        }
        self.execute(ctx);
    }

    /// Serialize the full game state.
    fn serialize_state(&self) -> Vec<u8>;

    /// Replace the game state with a previously serialized one.
    fn apply_state(&mut self, state: &[u8]);

    /// The part of the state every peer must agree on after the same ticks.
    fn replicated_view(&self) -> Vec<u8>;
}

/// Handle the actions both variants treat identically: replicated log lines
/// and `move`. Returns `Ok(true)` if the action was consumed.
pub fn apply_shared_action(
    ctx: &mut TickContext<'_>,
    envelope: &ActionEnvelope,
) -> Result<bool, PongError> {
    match &envelope.action {
        PongAction::Log { log } => {
            if envelope.from != ctx.peer.user_id {
                tracing::info!(from = %envelope.from, "{log}");
            }
            Ok(true)
        },
        PongAction::Move(m) => {
            ctx.scene.apply_move(m, ctx.clock.elapsed_seconds)?;
            Ok(true)
        },
        _ => Ok(false),
    }
}

/// Generates `serialize_state` and `apply_state` for a game whose state
/// lives in a `state: $StateType` field.
#[macro_export]
macro_rules! pong_game_boilerplate {
    (state_type: $StateType:ty) => {
        fn serialize_state(&self) -> Vec<u8> {
            rmp_serde::to_vec_named(&self.state).unwrap_or_default()
        }

        fn apply_state(&mut self, state: &[u8]) {
            match rmp_serde::from_slice::<$StateType>(state) {
                Ok(s) => self.state = s,
                Err(e) => tracing::warn!(error = %e, "discarding undecodable game state"),
            }
        }
    };
}
