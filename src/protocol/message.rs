//! Message envelope.
//!
//! `Message` is the shape on the wire: an adjacently tagged
//! `{"kind": ..., "payload": {...}}` object. `Intent` is the same vocabulary
//! minus `StateSnapshot`, which only the authority ever emits. Conversions
//! between the two are exhaustive, so a new kind has to be handled at every
//! dispatch site.

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::state::{Artifact, Session};

/// Envelope exchanged over every channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum Message {
    /// Enter or re-enter the session.
    Join {
        name: String,
        #[serde(rename = "avatarTag")]
        avatar: String,
    },
    /// Leave the lobby and start collecting facts.
    StartGame {},
    /// Submit or replace the sender's fact.
    SubmitFact { text: String },
    /// Deliver the remix for the sender's assignment.
    SubmitArtifact { artifact: Artifact },
    /// Vote for a presented round.
    Vote {
        #[serde(rename = "roundIndex")]
        round_index: usize,
    },
    /// Host only: next round, or on to voting after the last one.
    AdvancePresentation {},
    /// Host only: back to the lobby once results are shown.
    ReturnToLobby {},
    /// Full replacement of the receiver's session copy.
    StateSnapshot { session: Session },
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "Join",
            Self::StartGame {} => "StartGame",
            Self::SubmitFact { .. } => "SubmitFact",
            Self::SubmitArtifact { .. } => "SubmitArtifact",
            Self::Vote { .. } => "Vote",
            Self::AdvancePresentation {} => "AdvancePresentation",
            Self::ReturnToLobby {} => "ReturnToLobby",
            Self::StateSnapshot { .. } => "StateSnapshot",
        }
    }

    pub fn snapshot(session: &Session) -> Self {
        Self::StateSnapshot {
            session: session.clone(),
        }
    }
}

/// A participant's request to change shared state.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Join { name: String, avatar: String },
    StartGame,
    SubmitFact { text: String },
    SubmitArtifact { artifact: Artifact },
    Vote { round_index: usize },
    AdvancePresentation,
    ReturnToLobby,
}

impl Intent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "Join",
            Self::StartGame => "StartGame",
            Self::SubmitFact { .. } => "SubmitFact",
            Self::SubmitArtifact { .. } => "SubmitArtifact",
            Self::Vote { .. } => "Vote",
            Self::AdvancePresentation => "AdvancePresentation",
            Self::ReturnToLobby => "ReturnToLobby",
        }
    }
}

impl From<Intent> for Message {
    fn from(intent: Intent) -> Self {
        match intent {
            Intent::Join { name, avatar } => Message::Join { name, avatar },
            Intent::StartGame => Message::StartGame {},
            Intent::SubmitFact { text } => Message::SubmitFact { text },
            Intent::SubmitArtifact { artifact } => Message::SubmitArtifact { artifact },
            Intent::Vote { round_index } => Message::Vote { round_index },
            Intent::AdvancePresentation => Message::AdvancePresentation {},
            Intent::ReturnToLobby => Message::ReturnToLobby {},
        }
    }
}

impl TryFrom<Message> for Intent {
    type Error = CodecError;

    fn try_from(message: Message) -> Result<Self, Self::Error> {
        Ok(match message {
            Message::Join { name, avatar } => Intent::Join { name, avatar },
            Message::StartGame {} => Intent::StartGame,
            Message::SubmitFact { text } => Intent::SubmitFact { text },
            Message::SubmitArtifact { artifact } => Intent::SubmitArtifact { artifact },
            Message::Vote { round_index } => Intent::Vote { round_index },
            Message::AdvancePresentation {} => Intent::AdvancePresentation,
            Message::ReturnToLobby {} => Intent::ReturnToLobby,
            Message::StateSnapshot { .. } => {
                return Err(CodecError::NotAnIntent {
                    kind: "StateSnapshot",
                })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let value = serde_json::to_value(Message::Vote { round_index: 2 }).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"kind": "Vote", "payload": {"roundIndex": 2}})
        );

        let value = serde_json::to_value(Message::StartGame {}).unwrap();
        assert_eq!(value, serde_json::json!({"kind": "StartGame", "payload": {}}));
    }

    #[test]
    fn test_join_payload_names() {
        let value = serde_json::to_value(Message::Join {
            name: "Ana".into(),
            avatar: "fox".into(),
        })
        .unwrap();
        assert_eq!(value["payload"]["avatarTag"], "fox");
        assert_eq!(value["payload"]["name"], "Ana");
    }

    #[test]
    fn test_intent_conversion() {
        let intent = Intent::SubmitFact {
            text: "Octopuses have three hearts".into(),
        };
        let message = Message::from(intent.clone());
        assert_eq!(message.kind(), intent.kind());
        assert_eq!(Intent::try_from(message).unwrap(), intent);
    }

    #[test]
    fn test_snapshot_is_not_an_intent() {
        let message = Message::snapshot(&Session::default());
        assert!(matches!(
            Intent::try_from(message),
            Err(CodecError::NotAnIntent {
                kind: "StateSnapshot"
            })
        ));
    }
}
