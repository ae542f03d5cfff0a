#[allow(dead_code)]
mod common;

use bytes::Bytes;
use glam::Vec3;

use pong_server::config::Variant;
use pong_server::game_loop::Session;
use pong_server::scenes::lobby_position;

use common::{assert_all_agree, assert_clients_agree, config, registry, session, walk};

#[test]
fn cardinal_clients_never_diverge() {
    let mut session = session(Variant::Cardinal);
    walk(&mut session, "alice", Vec3::new(0.0, 0.0, 3.0));
    walk(&mut session, "bob", Vec3::new(3.0, 0.0, 0.0));
    for _ in 0..200 {
        session.step();
        assert_clients_agree(&session);
    }

    walk(&mut session, "alice", lobby_position(0));
    walk(&mut session, "bob", lobby_position(1));
    session.run(10);
    assert_all_agree(&session);
}

#[test]
fn arena_clients_never_diverge() {
    let mut session = session(Variant::Arena);
    walk(&mut session, "alice", Vec3::new(0.0, 0.0, -6.0));
    for _ in 0..120 {
        session.step();
        assert_clients_agree(&session);
    }
}

#[test]
fn arena_server_and_clients_settle_on_the_same_view() {
    let mut session = session(Variant::Arena);
    walk(&mut session, "alice", Vec3::new(0.0, 0.0, 6.0));
    session.run(10);
    assert_all_agree(&session);

    walk(&mut session, "alice", lobby_position(0));
    session.run(10);
    assert_all_agree(&session);
}

#[test]
fn identical_configs_replay_identically() {
    let seats = [
        (Variant::Arena, Vec3::new(0.0, 0.0, 6.0)),
        (Variant::Cardinal, Vec3::new(0.0, 0.0, 3.0)),
    ];
    for (variant, seat) in seats {
        let registry = registry();
        let config = config(variant);
        let mut a = Session::new(&registry, &config).expect("session a");
        let mut b = Session::new(&registry, &config).expect("session b");
        for session in [&mut a, &mut b] {
            walk(session, "alice", seat);
            session.run(90);
        }
        assert_eq!(
            a.server().game.serialize_state(),
            b.server().game.serialize_state(),
            "{variant} replay diverged"
        );
    }
}

#[test]
fn garbage_between_real_frames_never_panics() {
    let mut session = session(Variant::Cardinal);
    walk(&mut session, "bob", Vec3::new(0.0, 0.0, -3.0));
    let junk: [&'static [u8]; 4] = [&[], &[0x92], &[0xde, 0xad, 0xbe, 0xef], b"not msgpack"];
    for (i, frame) in junk.iter().cycle().take(40).enumerate() {
        session.relay_mut().publish_raw(Bytes::from_static(frame));
        session.step();
        assert_clients_agree(&session);
        assert!(session.relay_mut().stats().dropped as usize > i);
    }
}
