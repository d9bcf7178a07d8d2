//! Two-lane bounded outbound queue.
//!
//! Every session owns one of these. Acks and state snapshots live in
//! separate lanes with different overflow policy: a stale snapshot is
//! worthless (a fresher one is coming), so the state lane drops its
//! oldest entry; an ack must never be silently lost, so the ack lane
//! has a hard cap that marks the queue overflowed and forces the
//! session down instead.

use std::collections::VecDeque;

use winsync_proto::ServerMessage;

/// Max buffered state snapshots per session before drop-oldest kicks in.
pub const MAX_PENDING_STATES: usize = 8;

/// Max buffered acks per session. Hitting this means the client has
/// stopped reading entirely; the session is disconnected.
pub const MAX_PENDING_ACKS: usize = 64;

/// Outcome of a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Push {
    /// Message queued normally.
    Queued,
    /// Message queued, oldest pending state dropped to make room.
    DroppedOldestState,
    /// Ack lane full. The message was not queued and the queue is now
    /// poisoned; the session must be torn down.
    Overflow,
}

/// Per-session outbound buffer. Not thread-safe on its own; the
/// registry wraps it in a mutex.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    acks: VecDeque<ServerMessage>,
    states: VecDeque<ServerMessage>,
    overflowed: bool,
}

impl OutboundQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an ack. Returns [`Push::Overflow`] once the hard cap is
    /// hit; after that every push fails until the session is dropped.
    pub fn push_ack(&mut self, msg: ServerMessage) -> Push {
        if self.overflowed || self.acks.len() >= MAX_PENDING_ACKS {
            self.overflowed = true;
            return Push::Overflow;
        }
        self.acks.push_back(msg);
        Push::Queued
    }

    /// Queue a state snapshot, evicting the oldest pending one if the
    /// lane is full.
    pub fn push_state(&mut self, msg: ServerMessage) -> Push {
        if self.overflowed {
            return Push::Overflow;
        }
        let mut result = Push::Queued;
        if self.states.len() >= MAX_PENDING_STATES {
            self.states.pop_front();
            result = Push::DroppedOldestState;
        }
        self.states.push_back(msg);
        result
    }

    /// Next message to write. Acks always drain before states.
    pub fn pop(&mut self) -> Option<ServerMessage> {
        self.acks.pop_front().or_else(|| self.states.pop_front())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.acks.is_empty() && self.states.is_empty()
    }

    #[must_use]
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    #[must_use]
    pub fn pending_states(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn pending_acks(&self) -> usize {
        self.acks.len()
    }
}
