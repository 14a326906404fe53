//! The session aggregate.
//!
//! A `Session` is the single value the authority owns and replicates. It is
//! always sent whole; participants replace their copy, they never merge.
//!
//! Participant order is join order and matters: remix assignment is a
//! rotation over list positions.

use serde::{Deserialize, Serialize};

use super::participant::{Participant, PeerId};
use super::phase::Phase;
use super::round::{self, Round};

/// Full replicated session state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Authority's transport address, used as the join code
    pub code: PeerId,

    /// Current phase
    pub phase: Phase,

    /// Participants in join order
    participants: Vec<Participant>,

    /// At most one round per author
    rounds: Vec<Round>,

    /// Index of the round being presented (`Presenting` only)
    pub cursor: usize,

    /// Bumped whenever a game starts or the session returns to the lobby
    pub generation: u64,
}

impl Session {
    /// Create a lobby hosted by `host`.
    pub fn hosted_by(host: Participant) -> Self {
        Self {
            code: host.id.clone(),
            participants: vec![host],
            ..Self::default()
        }
    }

    // Participants

    /// Append a participant. Returns `false` if the id is already present.
    pub fn add_participant(&mut self, participant: Participant) -> bool {
        if self.has_participant(&participant.id) {
            return false;
        }
        self.participants.push(participant);
        true
    }

    pub fn participant(&self, id: &PeerId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == id)
    }

    pub fn participant_mut(&mut self, id: &PeerId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| &p.id == id)
    }

    pub fn has_participant(&self, id: &PeerId) -> bool {
        self.participant(id).is_some()
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn host(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.is_host)
    }

    pub fn is_host(&self, id: &PeerId) -> bool {
        self.participant(id).is_some_and(|p| p.is_host)
    }

    /// Set a participant's connection marker. Returns `true` if it changed.
    pub fn set_connected(&mut self, id: &PeerId, connected: bool) -> bool {
        match self.participant_mut(id) {
            Some(p) if p.is_connected != connected => {
                p.is_connected = connected;
                true
            }
            _ => false,
        }
    }

    // Submission quorum

    pub fn mark_submitted(&mut self, id: &PeerId) {
        if let Some(p) = self.participant_mut(id) {
            p.has_submitted = true;
        }
    }

    pub fn has_submitted(&self, id: &PeerId) -> bool {
        self.participant(id).is_some_and(|p| p.has_submitted)
    }

    pub fn submitted_count(&self) -> usize {
        self.participants.iter().filter(|p| p.has_submitted).count()
    }

    /// Every current participant has submitted for this phase.
    pub fn all_submitted(&self) -> bool {
        !self.participants.is_empty() && self.participants.iter().all(|p| p.has_submitted)
    }

    pub fn clear_submissions(&mut self) {
        for p in &mut self.participants {
            p.has_submitted = false;
        }
    }

    // Rounds

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn round(&self, index: usize) -> Option<&Round> {
        self.rounds.get(index)
    }

    pub fn round_mut(&mut self, index: usize) -> Option<&mut Round> {
        self.rounds.get_mut(index)
    }

    pub fn round_by_author(&self, author: &PeerId) -> Option<&Round> {
        self.rounds.iter().find(|r| &r.author_id == author)
    }

    /// Insert a round, replacing any earlier round by the same author in place.
    pub fn upsert_round(&mut self, round: Round) {
        match self.rounds.iter_mut().find(|r| r.author_id == round.author_id) {
            Some(existing) => *existing = round,
            None => self.rounds.push(round),
        }
    }

    /// Index and round assigned to `id` for remixing.
    pub fn round_assigned_to(&self, id: &PeerId) -> Option<(usize, &Round)> {
        self.rounds
            .iter()
            .enumerate()
            .find(|(_, r)| r.is_assigned_to(id))
    }

    /// The round `id` should be remixing right now, if any.
    pub fn assignment_for(&self, id: &PeerId) -> Option<&Round> {
        if self.phase != Phase::Remixing {
            return None;
        }
        self.round_assigned_to(id).map(|(_, r)| r)
    }

    pub fn set_rounds(&mut self, rounds: Vec<Round>) {
        self.rounds = rounds;
    }

    pub fn clear_rounds(&mut self) {
        self.rounds.clear();
    }

    /// Assign every round to the participant after its author in join order,
    /// wrapping around. Returns the assigned rounds.
    pub fn assign_rotation(&mut self) -> Vec<Round> {
        let n = self.participants.len();
        for (i, author) in self.participants.iter().enumerate() {
            let remixer = self.participants[(i + 1) % n].id.clone();
            if let Some(round) = self.rounds.iter_mut().find(|r| r.author_id == author.id) {
                round.assignee_id = Some(remixer);
            }
        }
        self.rounds.clone()
    }

    /// Round indices, most votes first.
    pub fn ranking(&self) -> Vec<usize> {
        round::rank(&self.rounds)
    }

    /// Credit each round's votes to the participant who remixed it.
    pub fn award_votes(&mut self) {
        let credits: Vec<(PeerId, u32)> = self
            .rounds
            .iter()
            .filter_map(|r| r.assignee_id.clone().map(|id| (id, r.votes)))
            .collect();
        for (id, votes) in credits {
            if let Some(p) = self.participant_mut(&id) {
                p.score += votes;
            }
        }
    }

    /// Drop the finished game, keeping participants and their scores.
    pub fn reset_to_lobby(&mut self) {
        self.phase = Phase::Lobby;
        self.rounds.clear();
        self.cursor = 0;
        self.clear_submissions();
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn session_with(ids: &[&str]) -> Session {
        let mut iter = ids.iter();
        let host = iter.next().expect("at least one id");
        let mut session =
            Session::hosted_by(Participant::host((*host).into(), host.to_uppercase(), "cat".into()));
        for id in iter {
            session.add_participant(Participant::new((*id).into(), id.to_uppercase(), "cat".into()));
        }
        session
    }

    #[test]
    fn test_hosted_by() {
        let session = session_with(&["h"]);
        assert_eq!(session.code, PeerId::from("h"));
        assert_eq!(session.phase, Phase::Lobby);
        assert!(session.is_host(&"h".into()));
        assert_eq!(session.host().map(|p| p.name.as_str()), Some("H"));
    }

    #[test]
    fn test_add_participant_keeps_order_and_rejects_duplicates() {
        let mut session = session_with(&["a", "b", "c"]);
        assert!(!session.add_participant(Participant::new("b".into(), "again".into(), "x".into())));

        let ids: Vec<&str> = session.participants().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(session.participant(&"b".into()).map(|p| p.name.as_str()), Some("B"));
    }

    #[test]
    fn test_quorum() {
        let mut session = session_with(&["a", "b"]);
        assert!(!session.all_submitted());

        session.mark_submitted(&"a".into());
        assert_eq!(session.submitted_count(), 1);
        assert!(!session.all_submitted());

        session.mark_submitted(&"b".into());
        assert!(session.all_submitted());

        session.clear_submissions();
        assert_eq!(session.submitted_count(), 0);
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut session = session_with(&["a", "b"]);
        session.upsert_round(Round::new("first".into(), "a".into(), "A".into()));
        session.upsert_round(Round::new("other".into(), "b".into(), "B".into()));
        session.upsert_round(Round::new("second".into(), "a".into(), "A".into()));

        assert_eq!(session.rounds().len(), 2);
        assert_eq!(session.rounds()[0].fact, "second");
        assert_eq!(session.rounds()[1].fact, "other");
    }

    #[test]
    fn test_assign_rotation_follows_join_order() {
        let mut session = session_with(&["a", "b", "c"]);
        // Submission order differs from join order.
        session.upsert_round(Round::new("fc".into(), "c".into(), "C".into()));
        session.upsert_round(Round::new("fa".into(), "a".into(), "A".into()));
        session.upsert_round(Round::new("fb".into(), "b".into(), "B".into()));

        let assigned = session.assign_rotation();

        let pairs: Vec<(&str, &str)> = assigned
            .iter()
            .map(|r| (r.author_id.as_str(), r.assignee_id.as_ref().unwrap().as_str()))
            .collect();
        assert_eq!(pairs, vec![("c", "a"), ("a", "b"), ("b", "c")]);
        assert!(assigned.iter().all(|r| r.assignee_id.as_ref() != Some(&r.author_id)));
    }

    #[test]
    fn test_assignment_only_visible_while_remixing() {
        let mut session = session_with(&["a", "b"]);
        session.upsert_round(Round::new("fa".into(), "a".into(), "A".into()));
        session.upsert_round(Round::new("fb".into(), "b".into(), "B".into()));
        session.assign_rotation();

        session.phase = Phase::Assigning;
        assert!(session.assignment_for(&"b".into()).is_none());

        session.phase = Phase::Remixing;
        assert_eq!(session.assignment_for(&"b".into()).map(|r| r.fact.as_str()), Some("fa"));
    }

    #[test]
    fn test_set_connected_reports_change() {
        let mut session = session_with(&["a", "b"]);
        assert!(!session.set_connected(&"b".into(), true));
        assert!(session.set_connected(&"b".into(), false));
        assert!(!session.participant(&"b".into()).unwrap().is_connected);
        assert!(!session.set_connected(&"nobody".into(), false));
    }

    #[test]
    fn test_award_votes_and_reset() {
        let mut session = session_with(&["a", "b"]);
        session.upsert_round(Round::new("fa".into(), "a".into(), "A".into()));
        session.upsert_round(Round::new("fb".into(), "b".into(), "B".into()));
        session.assign_rotation();
        session.round_mut(0).unwrap().votes = 2;
        session.phase = Phase::Results;

        session.award_votes();
        assert_eq!(session.participant(&"b".into()).unwrap().score, 2);
        assert_eq!(session.participant(&"a".into()).unwrap().score, 0);

        let generation = session.generation;
        session.reset_to_lobby();
        assert_eq!(session.phase, Phase::Lobby);
        assert!(session.rounds().is_empty());
        assert_eq!(session.participant_count(), 2);
        assert_eq!(session.participant(&"b".into()).unwrap().score, 2);
        assert_eq!(session.generation, generation + 1);
    }
}
