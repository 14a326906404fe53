//! Owners of session values.
//!
//! - `SessionStore` holds the canonical session on the authority. The only
//!   way to change it is [`SessionStore::dispatch`], which runs the engine.
//! - `Replica` holds a participant's disposable copy. The only way to change
//!   it is to overwrite it with a snapshot.

use crate::config::SessionConfig;
use crate::engine::{self, Event, Outcome};

use super::participant::{Participant, PeerId};
use super::round::Round;
use super::session::Session;

/// Authority-side canonical session.
#[derive(Debug)]
pub struct SessionStore {
    session: Session,
    config: SessionConfig,
}

impl SessionStore {
    /// Open a lobby with `host` as its only participant.
    pub fn new(host: Participant, config: SessionConfig) -> Self {
        Self {
            session: Session::hosted_by(host),
            config,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn host_id(&self) -> &PeerId {
        &self.session.code
    }

    /// Run one event through the engine and keep the result.
    pub fn dispatch(&mut self, event: Event, sender: &PeerId) -> Outcome {
        let (next, outcome) = engine::transition(&self.session, event, sender, &self.config);
        self.session = next;
        outcome
    }
}

/// Participant-side session copy.
#[derive(Debug, Clone, Default)]
pub struct Replica {
    session: Session,
}

impl Replica {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Replace the local copy wholesale.
    pub fn apply_snapshot(&mut self, session: Session) {
        self.session = session;
    }

    /// Back to an empty lobby, as after losing the authority.
    pub fn reset(&mut self) {
        self.session = Session::default();
    }

    /// The round `id` is remixing, valid only during `Remixing`.
    pub fn assigned_round(&self, id: &PeerId) -> Option<&Round> {
        self.session.assignment_for(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Intent;
    use crate::state::Phase;
    use pretty_assertions::assert_eq;

    fn store() -> SessionStore {
        SessionStore::new(
            Participant::host("host".into(), "Host".into(), "owl".into()),
            SessionConfig::default(),
        )
    }

    #[test]
    fn test_store_dispatch() {
        let mut store = store();
        assert_eq!(store.host_id(), &PeerId::from("host"));

        let outcome = store.dispatch(
            Event::Intent(Intent::Join {
                name: "Guest".into(),
                avatar: "fox".into(),
            }),
            &"guest".into(),
        );
        assert!(outcome.replicate);
        assert_eq!(store.session().participant_count(), 2);

        let outcome = store.dispatch(Event::Intent(Intent::Vote { round_index: 0 }), &"guest".into());
        assert!(!outcome.replicate);
        assert_eq!(store.session().phase, Phase::Lobby);
    }

    #[test]
    fn test_replica_replaces_and_resets() {
        let store = store();
        let mut replica = Replica::new();
        assert_eq!(replica.session(), &Session::default());

        replica.apply_snapshot(store.session().clone());
        assert_eq!(replica.session(), store.session());

        replica.reset();
        assert_eq!(replica.session().phase, Phase::Lobby);
        assert_eq!(replica.session().participant_count(), 0);
    }
}
