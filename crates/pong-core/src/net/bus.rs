use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ids::UserId;

use super::actions::PongAction;
use super::protocol::Topic;

/// An action plus the peer that dispatched it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEnvelope {
    #[serde(skip)]
    pub topic: Topic,
    pub from: UserId,
    pub action: PongAction,
}

impl ActionEnvelope {
    pub fn world(from: UserId, action: PongAction) -> Self {
        Self {
            topic: Topic::World,
            from,
            action,
        }
    }
}

/// Per-peer action queue pair.
///
/// Dispatched actions wait in `outgoing` until the transport collects them;
/// nothing is applied locally at dispatch time. Delivered actions (including
/// our own, echoed back) wait in `incoming` until the next tick drains them.
#[derive(Debug)]
pub struct ActionBus {
    local: UserId,
    outgoing: VecDeque<ActionEnvelope>,
    incoming: VecDeque<ActionEnvelope>,
}

impl ActionBus {
    pub fn new(local: UserId) -> Self {
        Self {
            local,
            outgoing: VecDeque::new(),
            incoming: VecDeque::new(),
        }
    }

    pub fn local_user(&self) -> &UserId {
        &self.local
    }

    /// Validate and queue an action for replication to every peer.
    pub fn dispatch(&mut self, action: PongAction) -> Result<(), ValidationError> {
        action.validate()?;
        tracing::trace!(from = %self.local, kind = action.type_name(), "dispatch");
        self.outgoing
            .push_back(ActionEnvelope::world(self.local.clone(), action));
        Ok(())
    }

    /// Log locally and replicate the line to every peer.
    pub fn netlog(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::info!(from = %self.local, "{line}");
        if let Err(e) = self.dispatch(PongAction::log(line)) {
            tracing::warn!(error = %e, "log line not replicated");
        }
    }

    pub fn take_outgoing(&mut self) -> Vec<ActionEnvelope> {
        self.outgoing.drain(..).collect()
    }

    pub fn pending_outgoing(&self) -> usize {
        self.outgoing.len()
    }

    /// Accept an action from the transport. Invalid payloads are dropped.
    pub fn deliver(&mut self, envelope: ActionEnvelope) -> Result<(), ValidationError> {
        envelope.action.validate()?;
        self.incoming.push_back(envelope);
        Ok(())
    }

    pub fn drain_incoming(&mut self) -> Vec<ActionEnvelope> {
        self.incoming.drain(..).collect()
    }
}
