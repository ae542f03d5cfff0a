use rand::SeedableRng;
use rand::rngs::StdRng;

use pong_core::error::ValidationError;
use pong_core::game_trait::{LocalPeer, PongGame, TickContext};
use pong_core::ids::UserId;
use pong_core::net::bus::{ActionBus, ActionEnvelope};
use pong_core::scene::Scene;
use pong_core::time::SimClock;

/// One participant's copy of the world: its scene, its queues, its clock and
/// its own instance of the rules.
pub struct Peer {
    pub local: LocalPeer,
    pub scene: Scene,
    pub bus: ActionBus,
    pub clock: SimClock,
    pub rng: StdRng,
    pub game: Box<dyn PongGame>,
}

impl Peer {
    pub fn new(
        local: LocalPeer,
        scene: Scene,
        game: Box<dyn PongGame>,
        seed: u64,
        timestep_ms: f64,
    ) -> Self {
        Self {
            bus: ActionBus::new(local.user_id.clone()),
            local,
            scene,
            clock: SimClock::new(timestep_ms),
            rng: StdRng::seed_from_u64(seed),
            game,
        }
    }

    pub fn user(&self) -> &UserId {
        &self.local.user_id
    }

    /// Advance the clock, step physics, run the rules, and hand back
    /// everything this peer dispatched.
    pub fn tick(&mut self) -> Vec<ActionEnvelope> {
        self.clock.advance();
        self.scene
            .step(self.clock.timestep_secs(), self.clock.elapsed_seconds);
        let mut ctx = TickContext {
            scene: &mut self.scene,
            bus: &mut self.bus,
            peer: &self.local,
            clock: &self.clock,
            rng: &mut self.rng,
        };
        self.game.tick(&mut ctx);
        self.bus.take_outgoing()
    }

    /// Queue a relayed action for the next tick.
    pub fn deliver(&mut self, envelope: ActionEnvelope) -> Result<(), ValidationError> {
        self.bus.deliver(envelope)
    }

    pub fn replicated_view(&self) -> Vec<u8> {
        self.game.replicated_view()
    }
}
