//! Snapshot fan-out.
//!
//! The authority keeps one [`Channel`] per connected peer in a
//! [`ChannelRegistry`]. After every accepted transition the [`Broadcaster`]
//! sends the complete session to the loopback channel (the host's own view)
//! and then to every open channel, including the one the triggering intent
//! came from.
//!
//! Sends to a closed channel are dropped. There is no retry or buffering.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::error::ChannelError;
use crate::protocol::Message;
use crate::state::{PeerId, Session};

/// Outbound half of an ordered, reliable, message-oriented link.
pub trait Channel: Send + Sync {
    fn is_open(&self) -> bool;

    fn send(&self, message: &Message) -> Result<(), ChannelError>;
}

/// Identifies one connection, so a late close from an old link cannot evict
/// the channel of a peer that has since reconnected from the same address.
pub type LinkId = u64;

/// A registered channel.
pub struct ChannelEntry {
    channel: Box<dyn Channel>,

    /// Connection this channel belongs to
    pub link: LinkId,

    /// When the channel was registered
    pub opened_at: DateTime<Utc>,
}

impl ChannelEntry {
    pub fn is_open(&self) -> bool {
        self.channel.is_open()
    }
}

/// Open channels keyed by peer.
#[derive(Default)]
pub struct ChannelRegistry {
    channels: BTreeMap<PeerId, ChannelEntry>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel, replacing any previous channel for the peer.
    pub fn add(&mut self, peer: PeerId, link: LinkId, channel: Box<dyn Channel>) {
        self.channels.insert(
            peer,
            ChannelEntry {
                channel,
                link,
                opened_at: Utc::now(),
            },
        );
    }

    /// Remove the peer's channel if it still belongs to `link`.
    pub fn remove(&mut self, peer: &PeerId, link: LinkId) -> Option<ChannelEntry> {
        match self.channels.get(peer) {
            Some(entry) if entry.link == link => self.channels.remove(peer),
            _ => None,
        }
    }

    pub fn get(&self, peer: &PeerId) -> Option<&ChannelEntry> {
        self.channels.get(peer)
    }

    pub fn contains(&self, peer: &PeerId) -> bool {
        self.channels.contains_key(peer)
    }

    pub fn peers(&self) -> impl Iterator<Item = &PeerId> {
        self.channels.keys()
    }

    pub fn open_count(&self) -> usize {
        self.channels.values().filter(|e| e.is_open()).count()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Authority-side snapshot fan-out.
pub struct Broadcaster {
    local_id: PeerId,
    loopback: Box<dyn Channel>,
    registry: ChannelRegistry,
}

impl Broadcaster {
    /// `loopback` carries snapshots to the authority's own view.
    pub fn new(local_id: PeerId, loopback: Box<dyn Channel>) -> Self {
        Self {
            local_id,
            loopback,
            registry: ChannelRegistry::new(),
        }
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn open(&mut self, peer: PeerId, link: LinkId, channel: Box<dyn Channel>) {
        debug!(peer = %peer, link, "channel opened");
        self.registry.add(peer, link, channel);
    }

    /// Returns `false` if the peer has no channel or has already reconnected
    /// on a newer link.
    pub fn close(&mut self, peer: &PeerId, link: LinkId) -> bool {
        let removed = self.registry.remove(peer, link).is_some();
        if removed {
            debug!(peer = %peer, link, "channel closed");
        }
        removed
    }

    /// Send `session` to the loopback and every open channel. Returns how
    /// many deliveries succeeded.
    pub fn broadcast(&self, session: &Session) -> usize {
        let message = Message::snapshot(session);
        let mut delivered = usize::from(deliver(&self.local_id, self.loopback.as_ref(), &message));
        for (peer, entry) in &self.registry.channels {
            if deliver(peer, entry.channel.as_ref(), &message) {
                delivered += 1;
            }
        }
        trace!(phase = %session.phase, delivered, "snapshot broadcast");
        delivered
    }
}

fn deliver(peer: &PeerId, channel: &dyn Channel, message: &Message) -> bool {
    if !channel.is_open() {
        trace!(peer = %peer, kind = message.kind(), "channel not open, message dropped");
        return false;
    }
    match channel.send(message) {
        Ok(()) => true,
        Err(err) => {
            debug!(peer = %peer, kind = message.kind(), error = %err, "send failed, message dropped");
            false
        }
    }
}
