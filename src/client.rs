//! Participant facade.
//!
//! A [`SessionClient`] is what UI code talks to, on the host and on every
//! other participant alike. It exposes the latest session as a
//! [`watch`] channel and routes intents either straight into the local
//! authority (when hosting) or over the link to the remote one.
//!
//! Both routes read snapshots the same way: a pump task decodes frames,
//! overwrites a [`Replica`] and publishes the result. The host's frames come
//! from the authority's loopback channel, so its view runs through exactly
//! the code path every other participant's does.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::authority::{Authority, AuthorityHandle};
use crate::config::SessionConfig;
use crate::error::ClientError;
use crate::protocol::{codec, Intent, Message};
use crate::replication::Channel;
use crate::state::{normalize_name, Participant, PeerId, Replica, Round, Session};
use crate::transport::{ByteChannel, Connector, Inbound, Link};

/// Whether snapshots are still arriving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Connected,
    Disconnected,
}

enum Route {
    Local(AuthorityHandle),
    Remote(Box<dyn Channel>),
}

/// A participant's handle on a session.
pub struct SessionClient {
    local_id: PeerId,
    route: Route,
    session: watch::Receiver<Session>,
    status: watch::Receiver<LinkStatus>,
    pump: JoinHandle<()>,
}

impl SessionClient {
    /// Host a new session. `host_id` is the host's transport address and
    /// becomes the join code.
    ///
    /// Spawns the authority, so this must run inside a tokio runtime.
    pub fn create_session(
        host_id: PeerId,
        display_name: &str,
        avatar: &str,
        config: SessionConfig,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        let name =
            normalize_name(display_name, config.max_name_len).ok_or(ClientError::InvalidName)?;

        let (loopback, inbound) = ByteChannel::pair();
        let host = Participant::host(host_id.clone(), name, avatar.to_string());
        let handle = Authority::spawn(host, config, Box::new(loopback));
        info!(code = %host_id, "session created");

        Ok(Self::start(host_id, Route::Local(handle), inbound))
    }

    /// Connect to the session at `code` and join it.
    pub async fn join_session(
        connector: &dyn Connector,
        code: &PeerId,
        display_name: &str,
        avatar: &str,
    ) -> Result<Self, ClientError> {
        let link = connector.connect(code).await?;
        Self::join_with(link, display_name, avatar)
    }

    /// Join over an already open link.
    pub fn join_with(link: Link, display_name: &str, avatar: &str) -> Result<Self, ClientError> {
        if display_name.trim().is_empty() {
            return Err(ClientError::InvalidName);
        }
        let Link {
            local_id,
            outbound,
            inbound,
        } = link;

        outbound.send(&Message::Join {
            name: display_name.to_string(),
            avatar: avatar.to_string(),
        })?;
        info!(peer = %local_id, "join sent");

        Ok(Self::start(local_id, Route::Remote(outbound), inbound))
    }

    fn start(local_id: PeerId, route: Route, inbound: Inbound) -> Self {
        let (session_tx, session) = watch::channel(Session::default());
        let (status_tx, status) = watch::channel(LinkStatus::Connected);
        let pump = tokio::spawn(pump(local_id.clone(), inbound, session_tx, status_tx));
        Self {
            local_id,
            route,
            session,
            status,
            pump,
        }
    }

    /// Send an intent to the authority.
    ///
    /// A vote for the round this participant remixed is refused here. On a
    /// remote link a failed send is dropped like any other lost message.
    pub fn submit_intent(&self, intent: Intent) -> Result<(), ClientError> {
        if let Intent::Vote { round_index } = &intent {
            let session = self.session.borrow();
            if session
                .round(*round_index)
                .is_some_and(|round| round.is_assigned_to(&self.local_id))
            {
                return Err(ClientError::SelfVote);
            }
        }

        match &self.route {
            Route::Local(handle) => handle.submit(intent),
            Route::Remote(channel) => {
                let message = Message::from(intent);
                if let Err(err) = channel.send(&message) {
                    debug!(peer = %self.local_id, kind = message.kind(), error = %err, "intent dropped");
                }
                Ok(())
            }
        }
    }

    /// A receiver that wakes on every applied snapshot.
    pub fn on_session_changed(&self) -> watch::Receiver<Session> {
        self.session.clone()
    }

    /// Copy of the latest session.
    pub fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    pub fn link_status(&self) -> LinkStatus {
        *self.status.borrow()
    }

    pub fn on_link_status_changed(&self) -> watch::Receiver<LinkStatus> {
        self.status.clone()
    }

    /// The round this participant should be remixing, during `Remixing`.
    pub fn my_assigned_round(&self) -> Option<Round> {
        self.session.borrow().assignment_for(&self.local_id).cloned()
    }

    pub fn local_id(&self) -> &PeerId {
        &self.local_id
    }

    /// The local authority, when this client is hosting.
    pub fn authority(&self) -> Option<&AuthorityHandle> {
        match &self.route {
            Route::Local(handle) => Some(handle),
            Route::Remote(_) => None,
        }
    }

    pub fn is_authority(&self) -> bool {
        self.authority().is_some()
    }
}

/// Dropping the host's client ends the session for everyone.
impl Drop for SessionClient {
    fn drop(&mut self) {
        if let Route::Local(handle) = &self.route {
            handle.shutdown();
        }
        self.pump.abort();
    }
}

async fn pump(
    local_id: PeerId,
    mut inbound: Inbound,
    session_tx: watch::Sender<Session>,
    status_tx: watch::Sender<LinkStatus>,
) {
    let mut replica = Replica::new();
    while let Some(bytes) = inbound.recv().await {
        match codec::decode(&bytes) {
            Ok(Message::StateSnapshot { session }) => {
                replica.apply_snapshot(session);
                session_tx.send_replace(replica.session().clone());
            }
            Ok(other) => debug!(peer = %local_id, kind = other.kind(), "ignoring non-snapshot message"),
            Err(err) => warn!(peer = %local_id, error = %err, "malformed frame dropped"),
        }
    }

    info!(peer = %local_id, "link to authority lost");
    replica.reset();
    session_tx.send_replace(replica.session().clone());
    status_tx.send_replace(LinkStatus::Disconnected);
}
