//! The authority's event loop.
//!
//! One tokio task owns the [`SessionStore`] and the [`Broadcaster`]. Every
//! input (channel open/close, decoded intents, the host's own intents, and
//! elapsed timers) is funnelled through a single queue and handled to
//! completion before the next is read, so the session never sees concurrent
//! mutation and needs no locks.
//!
//! Delayed transitions run as separate sleeping tasks that post their
//! [`Deferred`] value back into the loop. They are tracked per session
//! generation; when the generation moves on (a new game or a return to the
//! lobby) the superseded tasks are aborted, and the engine ignores any that
//! slip through.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::engine::{Deferred, Event};
use crate::error::ClientError;
use crate::protocol::{codec, Intent, Message};
use crate::replication::{Broadcaster, Channel, LinkId};
use crate::state::{Participant, PeerId, SessionStore};
use crate::transport::{Inbound, Incoming};

/// Inputs to the authority loop.
pub enum AuthorityInput {
    Opened {
        peer: PeerId,
        link: LinkId,
        channel: Box<dyn Channel>,
    },
    Received {
        from: PeerId,
        link: LinkId,
        message: Message,
    },
    Closed {
        peer: PeerId,
        link: LinkId,
    },
    /// An intent from the host's own facade.
    Local(Intent),
    /// Stop accepting input and end the session once the queue drains.
    Shutdown,
}

/// Cloneable handle for feeding the authority loop.
#[derive(Clone)]
pub struct AuthorityHandle {
    host_id: PeerId,
    tx: mpsc::UnboundedSender<AuthorityInput>,
    next_link: Arc<AtomicU64>,
}

impl AuthorityHandle {
    pub fn host_id(&self) -> &PeerId {
        &self.host_id
    }

    /// Hand an intent from the host straight to the engine.
    pub fn submit(&self, intent: Intent) -> Result<(), ClientError> {
        self.tx
            .send(AuthorityInput::Local(intent))
            .map_err(|_| ClientError::AuthorityStopped)
    }

    /// End the session. Every participant's link closes once the inputs
    /// already queued have been handled.
    pub fn shutdown(&self) {
        let _ = self.tx.send(AuthorityInput::Shutdown);
    }

    /// Register an accepted peer and start reading its frames.
    ///
    /// The channel is registered before the first frame can be read, so a
    /// peer's first intent always finds its channel in place.
    pub fn accept(&self, incoming: Incoming) -> Result<(), ClientError> {
        let Incoming {
            peer,
            channel,
            inbound,
        } = incoming;
        let link = self.next_link.fetch_add(1, Ordering::Relaxed);

        self.tx
            .send(AuthorityInput::Opened {
                peer: peer.clone(),
                link,
                channel,
            })
            .map_err(|_| ClientError::AuthorityStopped)?;
        tokio::spawn(read_frames(peer, link, inbound, self.tx.clone()));
        Ok(())
    }

    /// Accept every peer arriving on `listener`.
    pub fn serve(&self, mut listener: mpsc::UnboundedReceiver<Incoming>) -> JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            while let Some(incoming) = listener.recv().await {
                if handle.accept(incoming).is_err() {
                    break;
                }
            }
        })
    }
}

async fn read_frames(
    peer: PeerId,
    link: LinkId,
    mut inbound: Inbound,
    tx: mpsc::UnboundedSender<AuthorityInput>,
) {
    while let Some(bytes) = inbound.recv().await {
        match codec::decode(&bytes) {
            Ok(message) => {
                let received = AuthorityInput::Received {
                    from: peer.clone(),
                    link,
                    message,
                };
                if tx.send(received).is_err() {
                    return;
                }
            }
            Err(err) => warn!(peer = %peer, error = %err, "malformed frame dropped"),
        }
    }
    let _ = tx.send(AuthorityInput::Closed { peer, link });
}

/// Owner of the canonical session.
pub struct Authority {
    store: SessionStore,
    broadcaster: Broadcaster,
    inbox: mpsc::UnboundedReceiver<AuthorityInput>,
    timer_tx: mpsc::UnboundedSender<Deferred>,
    timer_rx: mpsc::UnboundedReceiver<Deferred>,
    timers: HashMap<u64, Vec<JoinHandle<()>>>,
}

impl Authority {
    /// Build an authority hosted by `host`. `loopback` receives every
    /// snapshot for the host's own view.
    pub fn new(
        host: Participant,
        config: SessionConfig,
        loopback: Box<dyn Channel>,
    ) -> (Self, AuthorityHandle) {
        let host_id = host.id.clone();
        let (tx, inbox) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();

        let authority = Self {
            store: SessionStore::new(host, config),
            broadcaster: Broadcaster::new(host_id.clone(), loopback),
            inbox,
            timer_tx,
            timer_rx,
            timers: HashMap::new(),
        };
        let handle = AuthorityHandle {
            host_id,
            tx,
            next_link: Arc::new(AtomicU64::new(1)),
        };
        (authority, handle)
    }

    /// Build an authority and run it on its own task.
    pub fn spawn(
        host: Participant,
        config: SessionConfig,
        loopback: Box<dyn Channel>,
    ) -> AuthorityHandle {
        let (authority, handle) = Self::new(host, config, loopback);
        tokio::spawn(authority.run());
        handle
    }

    /// Process inputs until every handle is dropped.
    pub async fn run(mut self) {
        info!(code = %self.store.host_id(), "authority started");
        self.broadcaster.broadcast(self.store.session());

        loop {
            tokio::select! {
                input = self.inbox.recv() => match input {
                    Some(input) => self.handle(input),
                    None => break,
                },
                Some(deferred) = self.timer_rx.recv() => {
                    self.timers.remove(&deferred.generation);
                    let host = self.store.host_id().clone();
                    self.dispatch(Event::AssignmentElapsed(deferred), &host);
                }
            }
        }

        for handle in self.timers.drain().flat_map(|(_, handles)| handles) {
            handle.abort();
        }
        info!(code = %self.store.host_id(), "authority stopped");
    }

    fn handle(&mut self, input: AuthorityInput) {
        match input {
            AuthorityInput::Opened {
                peer,
                link,
                channel,
            } => self.broadcaster.open(peer, link, channel),
            AuthorityInput::Closed { peer, link } => {
                if self.broadcaster.close(&peer, link) {
                    self.dispatch(Event::Disconnected, &peer);
                }
            }
            AuthorityInput::Received {
                from,
                link,
                message,
            } => match Intent::try_from(message) {
                Ok(intent) => self.receive(intent, &from, link),
                Err(err) => warn!(peer = %from, error = %err, "message dropped"),
            },
            AuthorityInput::Local(intent) => {
                let host = self.store.host_id().clone();
                self.dispatch(Event::Intent(intent), &host);
            }
            AuthorityInput::Shutdown => {
                info!(code = %self.store.host_id(), "authority shutting down");
                self.inbox.close();
            }
        }
    }

    /// Dispatch a peer's intent. A peer whose first `Join` is refused is
    /// not in the session, so its channel is dropped rather than left open
    /// to receive snapshots.
    fn receive(&mut self, intent: Intent, from: &PeerId, link: LinkId) {
        let joining =
            matches!(intent, Intent::Join { .. }) && !self.store.session().has_participant(from);
        let accepted = self.dispatch(Event::Intent(intent), from);

        if joining && !accepted && self.broadcaster.close(from, link) {
            info!(peer = %from, phase = %self.store.session().phase, "join refused, link closed");
        }
    }

    /// Returns whether the event was accepted.
    fn dispatch(&mut self, event: Event, sender: &PeerId) -> bool {
        let generation = self.store.session().generation;
        let outcome = self.store.dispatch(event, sender);

        if self.store.session().generation != generation {
            self.cancel_superseded_timers();
        }
        if outcome.replicate {
            self.broadcaster.broadcast(self.store.session());
        }
        if let Some(deferred) = outcome.deferred {
            self.schedule(deferred);
        }
        outcome.replicate
    }

    fn schedule(&mut self, deferred: Deferred) {
        let generation = deferred.generation;
        debug!(
            generation,
            delay_ms = deferred.delay.as_millis() as u64,
            "remix phase scheduled"
        );

        let tx = self.timer_tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(deferred.delay).await;
            let _ = tx.send(deferred);
        });
        self.timers.entry(generation).or_default().push(task);
    }

    fn cancel_superseded_timers(&mut self) {
        let current = self.store.session().generation;
        self.timers.retain(|generation, tasks| {
            if *generation == current {
                return true;
            }
            debug!(generation = *generation, "cancelling superseded timers");
            for task in tasks.drain(..) {
                task.abort();
            }
            false
        });
    }
}
