//! Shared session builders for integration tests.

use glam::Vec3;

use pong_arena::PongArena;
use pong_arena::config::ArenaConfig;
use pong_arena::instance::ArenaState;
use pong_cardinal::PongCardinal;
use pong_cardinal::config::CardinalConfig;
use pong_cardinal::state::CardinalState;
use pong_core::ids::{GameUuid, UserId};
use pong_server::config::{ServerConfig, Variant};
use pong_server::game_loop::{GameRegistry, Session, SessionCommand};
use pong_server::peer::Peer;
use pong_server::scenes::GAME_UUID;

/// A registry whose variants ignore config files on disk.
pub fn registry() -> GameRegistry {
    let mut registry = GameRegistry::new();
    registry.register(Variant::Arena, || {
        Box::new(PongArena::with_config(ArenaConfig::default()))
    });
    registry.register(Variant::Cardinal, || {
        Box::new(PongCardinal::with_config(CardinalConfig {
            ball_cooldown_ms: 100.0,
            ..CardinalConfig::default()
        }))
    });
    registry
}

pub fn config(variant: Variant) -> ServerConfig {
    ServerConfig {
        variant,
        ..ServerConfig::default()
    }
}

pub fn session(variant: Variant) -> Session {
    Session::new(&registry(), &config(variant)).expect("session should build")
}

pub fn game() -> GameUuid {
    GameUuid::new(GAME_UUID)
}

pub fn walk(session: &mut Session, user: &str, to: Vec3) {
    assert!(session.apply(SessionCommand::MoveAvatar {
        user: UserId::new(user),
        position: to,
    }));
}

pub fn arena_state(peer: &Peer) -> ArenaState {
    rmp_serde::from_slice(&peer.game.serialize_state()).expect("arena state decodes")
}

pub fn cardinal_state(peer: &Peer) -> CardinalState {
    rmp_serde::from_slice(&peer.game.serialize_state()).expect("cardinal state decodes")
}

pub fn assert_clients_agree(session: &Session) {
    let views: Vec<Vec<u8>> = session.clients().iter().map(Peer::replicated_view).collect();
    for (i, view) in views.iter().enumerate().skip(1) {
        assert_eq!(
            &views[0],
            view,
            "client {i} diverged at tick {}",
            session.tick()
        );
    }
}

pub fn assert_all_agree(session: &Session) {
    let server = session.server().replicated_view();
    for peer in session.clients() {
        assert_eq!(
            server,
            peer.replicated_view(),
            "{} diverged from the server at tick {}",
            peer.user(),
            session.tick()
        );
    }
}
