use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use glam::{Quat, Vec3};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use pong_core::error::PongError;
use pong_core::game_trait::{LocalPeer, PongGame};
use pong_core::ids::{Handedness, UserId};
use pong_core::scene::Transform;

use crate::config::{ServerConfig, Variant};
use crate::peer::Peer;
use crate::relay::Relay;
use crate::scenes;

/// Commands sent to a running session from outside the tick loop.
#[derive(Debug)]
pub enum SessionCommand {
    /// Walk a user's avatar to a new spot on every peer.
    MoveAvatar { user: UserId, position: Vec3 },
    /// Set one tracked hand of a user's avatar on every peer.
    SetHandPose {
        user: UserId,
        handedness: Handedness,
        position: Vec3,
        rotation: Quat,
    },
    Stop,
}

/// Events published by the tick loop.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A tick finished. Carries the server's replicated view.
    Ticked { tick: u64, view: Bytes },
    /// The loop has exited.
    Stopped { ticks: u64 },
}

/// Factory function type for creating rules instances.
type GameFactory = fn() -> Box<dyn PongGame>;

/// Registry mapping variants to factory functions.
pub struct GameRegistry {
    factories: HashMap<Variant, GameFactory>,
}

impl Default for GameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GameRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register_defaults();
        registry
    }

    fn register_defaults(&mut self) {
        #[cfg(feature = "arena")]
        self.factories
            .insert(Variant::Arena, || Box::new(pong_arena::PongArena::new()));
        #[cfg(feature = "cardinal")]
        self.factories.insert(Variant::Cardinal, || {
            Box::new(pong_cardinal::PongCardinal::new())
        });
    }

    pub fn register(&mut self, variant: Variant, factory: GameFactory) {
        self.factories.insert(variant, factory);
    }

    pub fn create(&self, variant: Variant) -> Option<Box<dyn PongGame>> {
        self.factories.get(&variant).map(|f| f())
    }

    /// Return the number of registered variants.
    pub fn available_games(&self) -> usize {
        self.factories.len()
    }
}

/// One authoritative peer plus its clients, wired through a relay.
/// `peers[0]` is the server.
pub struct Session {
    peers: Vec<Peer>,
    relay: Relay,
    tick: u64,
}

impl Session {
    pub fn new(registry: &GameRegistry, config: &ServerConfig) -> Result<Self, PongError> {
        let clients: Vec<UserId> = config.client_ids().into_iter().map(UserId::new).collect();
        let timestep_ms = config.timestep_ms();
        let mut locals = vec![LocalPeer::server(UserId::new("server"))];
        locals.extend(clients.iter().cloned().map(LocalPeer::client));

        let mut peers = Vec::with_capacity(locals.len());
        for local in locals {
            let game = registry.create(config.variant).ok_or_else(|| {
                PongError::Configuration(format!("variant {} is not built in", config.variant))
            })?;
            let scene = scenes::build(config.variant, config.physics, &clients)?;
            peers.push(Peer::new(local, scene, game, config.seed, timestep_ms));
        }
        tracing::info!(
            variant = %config.variant,
            peers = peers.len(),
            "session created"
        );
        Ok(Self {
            peers,
            relay: Relay::new(),
            tick: 0,
        })
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn server(&self) -> &Peer {
        &self.peers[0]
    }

    pub fn clients(&self) -> &[Peer] {
        &self.peers[1..]
    }

    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    pub fn peer_mut(&mut self, user: &UserId) -> Option<&mut Peer> {
        self.peers.iter_mut().find(|p| p.user() == user)
    }

    pub fn relay_mut(&mut self) -> &mut Relay {
        &mut self.relay
    }

    /// Tick every peer, then relay what they dispatched to all of them.
    pub fn step(&mut self) {
        for peer in &mut self.peers {
            for envelope in peer.tick() {
                if let Err(e) = self.relay.publish(&envelope) {
                    tracing::warn!(
                        peer = %envelope.from,
                        action = envelope.action.type_name(),
                        error = %e,
                        "failed to publish action"
                    );
                }
            }
        }
        self.relay.flush(&mut self.peers);
        self.tick += 1;
    }

    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Apply a command to every peer's scene. Returns false on `Stop`.
    pub fn apply(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::MoveAvatar { user, position } => {
                for peer in &mut self.peers {
                    if let Err(e) = scenes::move_avatar(&mut peer.scene, &user, position) {
                        e.log("session");
                    }
                }
                true
            },
            SessionCommand::SetHandPose {
                user,
                handedness,
                position,
                rotation,
            } => {
                for peer in &mut self.peers {
                    let rig = peer
                        .scene
                        .avatar_of(&user)
                        .and_then(|id| peer.scene.get_mut(id))
                        .and_then(|a| a.rig.as_mut());
                    match rig {
                        Some(rig) => {
                            *rig.hand_mut(handedness) =
                                Some(Transform::from_position(position).with_rotation(rotation));
                        },
                        None => tracing::debug!(user = %user, "hand pose for unknown avatar"),
                    }
                }
                true
            },
            SessionCommand::Stop => false,
        }
    }
}

/// Spawn a session tick loop as a tokio task.
/// Returns the command sender, the event receiver, and the task handle.
pub fn spawn_session(
    registry: &GameRegistry,
    config: ServerConfig,
) -> Result<
    (
        mpsc::UnboundedSender<SessionCommand>,
        mpsc::UnboundedReceiver<SessionEvent>,
        JoinHandle<()>,
    ),
    PongError,
> {
    let session = Session::new(registry, &config)?;
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
        run_tick_loop(session, config, cmd_rx, event_tx).await;
    });

    Ok((cmd_tx, event_rx, handle))
}

async fn run_tick_loop(
    mut session: Session,
    config: ServerConfig,
    mut cmd_rx: mpsc::UnboundedReceiver<SessionCommand>,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
) {
    let tick_interval = Duration::from_secs_f64(1.0 / config.tick_rate_hz);
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                session.step();
                let view = Bytes::from(session.server().replicated_view());
                let _ = event_tx.send(SessionEvent::Ticked {
                    tick: session.tick(),
                    view,
                });
                if config.max_ticks.is_some_and(|max| session.tick() >= max) {
                    break;
                }
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(cmd) => {
                        if !session.apply(cmd) {
                            break;
                        }
                    },
                    None => break,
                }
            }
        }
    }

    let stats = session.relay.stats();
    tracing::info!(
        ticks = session.tick(),
        frames = stats.frames,
        bytes = stats.bytes,
        dropped = stats.dropped,
        "session stopped"
    );
    let _ = event_tx.send(SessionEvent::Stopped {
        ticks: session.tick(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config(variant: Variant) -> ServerConfig {
        ServerConfig {
            variant,
            tick_rate_hz: 500.0,
            ..ServerConfig::default()
        }
    }

    #[test]
    fn registry_creates_both_variants() {
        let registry = GameRegistry::new();
        assert!(registry.create(Variant::Arena).is_some());
        assert!(registry.create(Variant::Cardinal).is_some());
        assert_eq!(registry.available_games(), 2);
    }

    #[test]
    fn session_has_one_server_and_a_peer_per_client() {
        let session = Session::new(&GameRegistry::new(), &fast_config(Variant::Arena)).unwrap();
        assert!(session.server().local.is_server());
        assert_eq!(session.clients().len(), 2);
        assert!(session.clients().iter().all(|p| !p.local.is_server()));
    }

    #[test]
    fn unregistered_variant_is_a_configuration_error() {
        let registry = GameRegistry {
            factories: HashMap::new(),
        };
        let err = Session::new(&registry, &fast_config(Variant::Cardinal)).err();
        assert!(matches!(err, Some(PongError::Configuration(_))));
    }

    #[tokio::test]
    async fn session_ticks_and_stops() {
        let registry = GameRegistry::new();
        let (cmd_tx, mut events, handle) =
            spawn_session(&registry, fast_config(Variant::Cardinal)).expect("should spawn");

        let first = events.recv().await.expect("should tick");
        assert!(matches!(first, SessionEvent::Ticked { tick: 1, .. }));

        let _ = cmd_tx.send(SessionCommand::Stop);
        let mut stopped = false;
        while let Some(event) = events.recv().await {
            if matches!(event, SessionEvent::Stopped { .. }) {
                stopped = true;
                break;
            }
        }
        assert!(stopped);
        let _ = handle.await;
    }

    #[tokio::test]
    async fn max_ticks_ends_the_loop() {
        let registry = GameRegistry::new();
        let config = ServerConfig {
            max_ticks: Some(5),
            ..fast_config(Variant::Arena)
        };
        let (_cmd_tx, mut events, handle) = spawn_session(&registry, config).expect("should spawn");
        let mut last = None;
        while let Some(event) = events.recv().await {
            last = Some(event);
        }
        assert!(matches!(last, Some(SessionEvent::Stopped { ticks: 5 })));
        let _ = handle.await;
    }
}
