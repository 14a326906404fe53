//! Session state machine.
//!
//! [`transition`] is a pure function of the current session, one event and
//! its sender. It never mutates its input: the caller gets back the next
//! session plus an [`Outcome`] saying whether to replicate and whether a
//! delayed transition must be scheduled.
//!
//! Invalid or out-of-phase events are not errors for the caller. They come
//! back as the unchanged session with `replicate == false`; the reason is
//! logged and otherwise dropped.
//!
//! # Delayed transitions
//!
//! When the last fact arrives the engine assigns remixers immediately, moves
//! to `Assigning`, and hands back a [`Deferred`] carrying the assignment it
//! just computed. The authority feeds that value back as
//! [`Event::AssignmentElapsed`] after the delay; the engine writes the
//! captured assignment and enters `Remixing` without recomputing anything.

use std::time::Duration;

use tracing::debug;

use crate::config::SessionConfig;
use crate::protocol::Intent;
use crate::state::{normalize_name, Artifact, Participant, PeerId, Phase, Round, Session};

/// Input to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A participant's request.
    Intent(Intent),
    /// The sender's channel closed.
    Disconnected,
    /// A previously scheduled delay ran out.
    AssignmentElapsed(Deferred),
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Intent(intent) => intent.kind(),
            Self::Disconnected => "Disconnected",
            Self::AssignmentElapsed(_) => "AssignmentElapsed",
        }
    }
}

/// A transition to run later, with its next state captured now.
#[derive(Debug, Clone, PartialEq)]
pub struct Deferred {
    pub delay: Duration,
    /// Session generation at scheduling time
    pub generation: u64,
    /// Rounds with remixers assigned
    pub assignment: Vec<Round>,
}

/// What the caller must do after a transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    /// Broadcast the new session to everyone
    pub replicate: bool,
    /// Schedule this transition
    pub deferred: Option<Deferred>,
}

/// Why an event was ignored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("{kind} is not accepted during {phase}")]
    WrongPhase { phase: Phase, kind: &'static str },
    #[error("sender has not joined")]
    UnknownSender,
    #[error("only the host may do this")]
    NotHost,
    #[error("session is full ({max} participants)")]
    SessionFull { max: usize },
    #[error("display name is empty")]
    InvalidName,
    #[error("need {need} participants to start, have {have}")]
    NotEnoughPlayers { have: usize, need: usize },
    #[error("fact is empty")]
    EmptyFact,
    #[error("fact is {len} characters, limit is {max}")]
    FactTooLong { len: usize, max: usize },
    #[error("sender has no round to remix")]
    NoAssignment,
    #[error("sender already submitted this phase")]
    AlreadySubmitted,
    #[error("round {index} does not exist")]
    NoSuchRound { index: usize },
    #[error("cannot vote for your own remix")]
    SelfVote,
    #[error("timer belongs to an earlier game")]
    StaleTimer,
    #[error("nothing changed")]
    NoChange,
}

/// Fold one event into `session`.
pub fn transition(
    session: &Session,
    event: Event,
    sender: &PeerId,
    config: &SessionConfig,
) -> (Session, Outcome) {
    let kind = event.kind();
    let mut next = session.clone();

    match apply(&mut next, event, sender, config) {
        Ok(deferred) => {
            debug!(peer = %sender, event = kind, phase = %next.phase, "event applied");
            let outcome = Outcome {
                replicate: true,
                deferred,
            };
            (next, outcome)
        }
        Err(rejection) => {
            debug!(peer = %sender, event = kind, phase = %session.phase, %rejection, "event ignored");
            (session.clone(), Outcome::default())
        }
    }
}

fn apply(
    session: &mut Session,
    event: Event,
    sender: &PeerId,
    config: &SessionConfig,
) -> Result<Option<Deferred>, Rejection> {
    match event {
        Event::Intent(intent) => apply_intent(session, intent, sender, config),
        Event::Disconnected => {
            require_participant(session, sender)?;
            if !session.set_connected(sender, false) {
                return Err(Rejection::NoChange);
            }
            Ok(None)
        }
        Event::AssignmentElapsed(deferred) => begin_remix(session, deferred),
    }
}

fn apply_intent(
    session: &mut Session,
    intent: Intent,
    sender: &PeerId,
    config: &SessionConfig,
) -> Result<Option<Deferred>, Rejection> {
    match (session.phase, intent) {
        (_, Intent::Join { name, avatar }) => join(session, sender, &name, avatar, config),
        (Phase::Lobby, Intent::StartGame) => start_game(session, sender, config),
        (Phase::Collecting, Intent::SubmitFact { text }) => {
            submit_fact(session, sender, &text, config)
        }
        (Phase::Remixing, Intent::SubmitArtifact { artifact }) => {
            submit_artifact(session, sender, artifact)
        }
        (Phase::Presenting, Intent::AdvancePresentation) => advance_presentation(session, sender),
        (Phase::Voting, Intent::Vote { round_index }) => vote(session, sender, round_index),
        (Phase::Results, Intent::ReturnToLobby) => return_to_lobby(session, sender),
        (phase, intent) => Err(Rejection::WrongPhase {
            phase,
            kind: intent.kind(),
        }),
    }
}

fn require_participant(session: &Session, sender: &PeerId) -> Result<(), Rejection> {
    if session.has_participant(sender) {
        Ok(())
    } else {
        Err(Rejection::UnknownSender)
    }
}

fn require_host(session: &Session, sender: &PeerId) -> Result<(), Rejection> {
    require_participant(session, sender)?;
    if session.is_host(sender) {
        Ok(())
    } else {
        Err(Rejection::NotHost)
    }
}

fn join(
    session: &mut Session,
    sender: &PeerId,
    name: &str,
    avatar: String,
    config: &SessionConfig,
) -> Result<Option<Deferred>, Rejection> {
    if session.has_participant(sender) {
        // Re-join: no new entry, the replicated snapshot brings them up to date.
        session.set_connected(sender, true);
        return Ok(None);
    }
    if session.phase != Phase::Lobby {
        return Err(Rejection::WrongPhase {
            phase: session.phase,
            kind: "Join",
        });
    }
    if session.participant_count() >= config.max_participants {
        return Err(Rejection::SessionFull {
            max: config.max_participants,
        });
    }
    let name = normalize_name(name, config.max_name_len).ok_or(Rejection::InvalidName)?;
    session.add_participant(Participant::new(sender.clone(), name, avatar));
    Ok(None)
}

fn start_game(
    session: &mut Session,
    sender: &PeerId,
    config: &SessionConfig,
) -> Result<Option<Deferred>, Rejection> {
    require_participant(session, sender)?;
    let have = session.participant_count();
    if have < config.min_players {
        return Err(Rejection::NotEnoughPlayers {
            have,
            need: config.min_players,
        });
    }

    session.phase = Phase::Collecting;
    session.generation += 1;
    session.cursor = 0;
    session.clear_rounds();
    session.clear_submissions();
    Ok(None)
}

fn submit_fact(
    session: &mut Session,
    sender: &PeerId,
    text: &str,
    config: &SessionConfig,
) -> Result<Option<Deferred>, Rejection> {
    let author_name = session
        .participant(sender)
        .ok_or(Rejection::UnknownSender)?
        .name
        .clone();

    let text = text.trim();
    if text.is_empty() {
        return Err(Rejection::EmptyFact);
    }
    let len = text.chars().count();
    if len > config.max_fact_len {
        return Err(Rejection::FactTooLong {
            len,
            max: config.max_fact_len,
        });
    }

    session.upsert_round(Round::new(text.to_string(), sender.clone(), author_name));
    session.mark_submitted(sender);
    if !session.all_submitted() {
        return Ok(None);
    }

    session.clear_submissions();
    let assignment = session.assign_rotation();
    session.phase = Phase::Assigning;
    Ok(Some(Deferred {
        delay: config.assignment_delay(),
        generation: session.generation,
        assignment,
    }))
}

fn begin_remix(session: &mut Session, deferred: Deferred) -> Result<Option<Deferred>, Rejection> {
    if deferred.generation != session.generation {
        return Err(Rejection::StaleTimer);
    }
    if session.phase != Phase::Assigning {
        return Err(Rejection::WrongPhase {
            phase: session.phase,
            kind: "AssignmentElapsed",
        });
    }
    session.set_rounds(deferred.assignment);
    session.phase = Phase::Remixing;
    Ok(None)
}

fn submit_artifact(
    session: &mut Session,
    sender: &PeerId,
    artifact: Artifact,
) -> Result<Option<Deferred>, Rejection> {
    require_participant(session, sender)?;
    if session.has_submitted(sender) {
        return Err(Rejection::AlreadySubmitted);
    }
    let index = session
        .round_assigned_to(sender)
        .map(|(index, _)| index)
        .ok_or(Rejection::NoAssignment)?;
    if let Some(round) = session.round_mut(index) {
        round.artifact = Some(artifact);
    }
    session.mark_submitted(sender);

    if session.all_submitted() {
        session.clear_submissions();
        session.phase = Phase::Presenting;
        session.cursor = 0;
    }
    Ok(None)
}

fn advance_presentation(
    session: &mut Session,
    sender: &PeerId,
) -> Result<Option<Deferred>, Rejection> {
    require_host(session, sender)?;
    if session.cursor + 1 < session.rounds().len() {
        session.cursor += 1;
    } else {
        session.phase = Phase::Voting;
        session.cursor = 0;
    }
    Ok(None)
}

fn vote(
    session: &mut Session,
    sender: &PeerId,
    round_index: usize,
) -> Result<Option<Deferred>, Rejection> {
    require_participant(session, sender)?;
    if session.has_submitted(sender) {
        return Err(Rejection::AlreadySubmitted);
    }
    let round = session
        .round_mut(round_index)
        .ok_or(Rejection::NoSuchRound { index: round_index })?;
    // Clients filter this too, but the authority cannot rely on that.
    if round.is_assigned_to(sender) {
        return Err(Rejection::SelfVote);
    }
    round.votes += 1;
    session.mark_submitted(sender);

    if session.all_submitted() {
        session.clear_submissions();
        session.award_votes();
        session.phase = Phase::Results;
    }
    Ok(None)
}

fn return_to_lobby(session: &mut Session, sender: &PeerId) -> Result<Option<Deferred>, Rejection> {
    require_host(session, sender)?;
    session.reset_to_lobby();
    Ok(None)
}
