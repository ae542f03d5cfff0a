pub mod error;
pub mod game_trait;
pub mod ids;
pub mod net;
pub mod physics;
pub mod scene;
pub mod time;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use glam::Vec3;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::game_trait::{LocalPeer, PongGame, TickContext};
    use crate::ids::{EntityUuid, UserId};
    use crate::net::actions::{MoveAction, PongAction};
    use crate::net::bus::{ActionBus, ActionEnvelope};
    use crate::scene::{AvatarRig, EntityId, EntityRecord, Marker, Scene, Transform};
    use crate::time::SimClock;

    /// One peer's world, driven by hand in tests.
    pub struct PeerHarness {
        pub scene: Scene,
        pub bus: ActionBus,
        pub peer: LocalPeer,
        pub clock: SimClock,
        pub rng: StdRng,
    }

    impl PeerHarness {
        pub fn new(peer: LocalPeer, scene: Scene) -> Self {
            Self {
                scene,
                bus: ActionBus::new(peer.user_id.clone()),
                peer,
                clock: SimClock::default(),
                rng: StdRng::seed_from_u64(7),
            }
        }

        pub fn server(scene: Scene) -> Self {
            Self::new(LocalPeer::server(UserId::new("server")), scene)
        }

        pub fn client(user: &str, scene: Scene) -> Self {
            Self::new(LocalPeer::client(UserId::new(user)), scene)
        }

        pub fn ctx(&mut self) -> TickContext<'_> {
            TickContext {
                scene: &mut self.scene,
                bus: &mut self.bus,
                peer: &self.peer,
                clock: &self.clock,
                rng: &mut self.rng,
            }
        }

        /// Advance one tick and loop every dispatched action back into this
        /// peer's own queue. Returns the dispatched actions.
        pub fn step(&mut self, game: &mut dyn PongGame) -> Vec<PongAction> {
            self.clock.advance();
            self.scene
                .step(self.clock.timestep_secs(), self.clock.elapsed_seconds);
            game.tick(&mut self.ctx());
            let out = self.bus.take_outgoing();
            let actions = out.iter().map(|e| e.action.clone()).collect();
            for envelope in out {
                let _ = self.bus.deliver(envelope);
            }
            actions
        }

        /// Run `n` ticks, returning every dispatched action in order.
        pub fn run(&mut self, game: &mut dyn PongGame, n: usize) -> Vec<PongAction> {
            (0..n).flat_map(|_| self.step(game)).collect()
        }

        /// Queue an action as if it arrived from `from`.
        pub fn inject(&mut self, from: &str, action: PongAction) {
            let _ = self
                .bus
                .deliver(ActionEnvelope::world(UserId::new(from), action));
        }
    }

    /// Spawn an avatar for `user` standing at `position`, right hand raised.
    pub fn spawn_avatar(scene: &mut Scene, user: &str, position: Vec3) -> EntityId {
        let hand = Transform::from_position(position + Vec3::new(0.3, 1.2, 0.0));
        let rig = AvatarRig {
            left_hand: Some(Transform::from_position(position + Vec3::new(-0.3, 1.2, 0.0))),
            right_hand: Some(hand),
        };
        let record = EntityRecord::new(format!("avatar-{user}"), user)
            .with_marker(Marker::Avatar)
            .with_transform(Transform::from_position(position))
            .with_rig(rig)
            .with_owner(UserId::new(user))
            .with_collider(crate::physics::Collider::cuboid(Vec3::new(0.3, 0.9, 0.3)).groups(
                crate::physics::groups::AVATARS,
                crate::physics::groups::DEFAULT_MASK,
            ));
        scene
            .insert(record)
            .unwrap_or_else(|e| panic!("spawn avatar {user}: {e}"))
    }

    // ================================================================
    // Game Trait Contract Tests
    // ================================================================
    // Every PongGame implementation must pass these. Game crates call them
    // from their own #[cfg(test)] modules with a concrete game and scene.

    /// serialize_state → apply_state must be stable after one roundtrip.
    pub fn contract_state_roundtrip_preserves(game: &mut dyn PongGame) {
        let state_a = game.serialize_state();
        game.apply_state(&state_a);
        let state_b = game.serialize_state();
        game.apply_state(&state_b);
        let state_c = game.serialize_state();
        assert_eq!(
            state_b, state_c,
            "State must be stable after serialize→apply→serialize roundtrip"
        );
    }

    /// Garbage passed to apply_state must leave the state untouched.
    pub fn contract_garbage_state_is_ignored(game: &mut dyn PongGame) {
        let before = game.serialize_state();
        game.apply_state(&[0xc1, 0xff, 0x00]);
        assert_eq!(before, game.serialize_state());
    }

    /// A move for an entity that does not exist must not panic or change state.
    pub fn contract_move_for_missing_entity_is_harmless(
        game: &mut dyn PongGame,
        harness: &mut PeerHarness,
    ) {
        harness.step(game);
        let before = game.replicated_view();
        harness.inject(
            "server",
            PongAction::Move(MoveAction::position(EntityUuid::new("ghost"), Vec3::ZERO)),
        );
        game.tick(&mut harness.ctx());
        assert_eq!(before, game.replicated_view());
    }

    /// Two peers fed identical scenes and seeds must stay bit-identical.
    pub fn contract_ticks_are_deterministic(
        mut make: impl FnMut() -> (Box<dyn PongGame>, PeerHarness),
        ticks: usize,
    ) {
        let (mut game_a, mut peer_a) = make();
        let (mut game_b, mut peer_b) = make();
        let out_a = peer_a.run(game_a.as_mut(), ticks);
        let out_b = peer_b.run(game_b.as_mut(), ticks);
        assert_eq!(out_a, out_b, "dispatched actions diverged");
        assert_eq!(game_a.serialize_state(), game_b.serialize_state());
    }
}
