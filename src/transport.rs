//! Transport boundary.
//!
//! Connection establishment lives outside this crate. What the session
//! layer needs from a transport is:
//!
//! - on the authority, an [`Incoming`] per accepted peer: the peer's
//!   address, an outbound [`Channel`], and a byte stream of inbound frames
//!   that ends when the link closes;
//! - on a participant, a [`Link`] to the authority with the same parts,
//!   produced by a [`Connector`].
//!
//! [`MemoryNetwork`] is an in-process transport built on tokio channels. It
//! backs the host's loopback view and the test suite.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::error::{ChannelError, ConnectError};
use crate::protocol::{codec, Message};
use crate::replication::Channel;
use crate::state::PeerId;

/// Inbound frames from one peer.
pub type Inbound = mpsc::UnboundedReceiver<Vec<u8>>;

/// A peer accepted by the authority.
pub struct Incoming {
    pub peer: PeerId,
    pub channel: Box<dyn Channel>,
    pub inbound: Inbound,
}

/// A participant's link to the authority.
pub struct Link {
    /// Our address as the authority sees it
    pub local_id: PeerId,
    pub outbound: Box<dyn Channel>,
    pub inbound: Inbound,
}

/// Opens links to an authority by session code.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, code: &PeerId) -> Result<Link, ConnectError>;
}

/// Channel that encodes messages onto an unbounded byte queue.
#[derive(Clone)]
pub struct ByteChannel {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl ByteChannel {
    /// A connected channel and the receiving end of its frames.
    pub fn pair() -> (Self, Inbound) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Channel for ByteChannel {
    fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    fn send(&self, message: &Message) -> Result<(), ChannelError> {
        let bytes = codec::encode(message)?;
        self.tx.send(bytes).map_err(|_| ChannelError::Closed)
    }
}

#[derive(Default)]
struct NetworkInner {
    listeners: HashMap<PeerId, mpsc::UnboundedSender<Incoming>>,
    next_port: u32,
}

/// In-process network of tokio channels.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    inner: Arc<Mutex<NetworkInner>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept connections addressed to `code`.
    pub async fn listen(&self, code: PeerId) -> mpsc::UnboundedReceiver<Incoming> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().await.listeners.insert(code, tx);
        rx
    }

    /// Connect from a fixed address, as a peer coming back would.
    pub async fn connect_as(&self, code: &PeerId, local_id: PeerId) -> Result<Link, ConnectError> {
        let inner = self.inner.lock().await;
        let listener = inner
            .listeners
            .get(code)
            .ok_or_else(|| ConnectError::Unreachable { code: code.clone() })?;

        let (to_authority, authority_inbound) = ByteChannel::pair();
        let (to_peer, peer_inbound) = ByteChannel::pair();

        let incoming = Incoming {
            peer: local_id.clone(),
            channel: Box::new(to_peer),
            inbound: authority_inbound,
        };
        if listener.send(incoming).is_err() {
            return Err(ConnectError::Unreachable { code: code.clone() });
        }
        debug!(code = %code, peer = %local_id, "memory link opened");

        Ok(Link {
            local_id,
            outbound: Box::new(to_authority),
            inbound: peer_inbound,
        })
    }

    async fn next_address(&self) -> PeerId {
        let mut inner = self.inner.lock().await;
        inner.next_port += 1;
        PeerId(format!("mem:{}", inner.next_port))
    }
}

#[async_trait]
impl Connector for MemoryNetwork {
    async fn connect(&self, code: &PeerId) -> Result<Link, ConnectError> {
        let local_id = self.next_address().await;
        self.connect_as(code, local_id).await
    }
}
