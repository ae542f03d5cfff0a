//! In-process stand-in for the transport: every frame published during a
//! tick reaches every peer, in publish order, before the next tick.

use std::collections::VecDeque;

use bytes::Bytes;

use pong_core::net::bus::ActionEnvelope;
use pong_core::net::protocol::{ProtocolError, decode_envelope, encode_envelope};

use crate::peer::Peer;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    pub frames: u64,
    pub bytes: u64,
    pub dropped: u64,
}

#[derive(Debug, Default)]
pub struct Relay {
    pending: VecDeque<Bytes>,
    stats: RelayStats,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode an envelope and queue it for fan-out.
    pub fn publish(&mut self, envelope: &ActionEnvelope) -> Result<(), ProtocolError> {
        let data = encode_envelope(envelope)?;
        self.publish_raw(Bytes::from(data));
        Ok(())
    }

    /// Queue an already-encoded frame as-is.
    pub fn publish_raw(&mut self, frame: Bytes) {
        self.pending.push_back(frame);
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> RelayStats {
        self.stats
    }

    /// Deliver every queued frame to every peer. Frames that fail to decode
    /// are dropped for everyone. Returns the number of frames delivered.
    pub fn flush(&mut self, peers: &mut [Peer]) -> usize {
        let mut delivered = 0;
        while let Some(frame) = self.pending.pop_front() {
            let envelope = match decode_envelope(&frame) {
                Ok(envelope) => envelope,
                Err(e) => {
                    tracing::warn!(len = frame.len(), error = %e, "dropping undecodable frame");
                    self.stats.dropped += 1;
                    continue;
                },
            };
            for peer in peers.iter_mut() {
                if let Err(e) = peer.deliver(envelope.clone()) {
                    tracing::warn!(peer = %peer.user(), error = %e, "peer rejected frame");
                }
            }
            self.stats.frames += 1;
            self.stats.bytes += frame.len() as u64;
            delivered += 1;
        }
        delivered
    }
}
