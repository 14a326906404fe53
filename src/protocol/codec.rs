//! JSON codec for envelopes.
//!
//! Channels are message-oriented, so one encoded `Message` is one frame and
//! no length prefix is needed.

use crate::error::CodecError;

use super::message::Message;

pub fn encode(message: &Message) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(message).map_err(CodecError::Encode)
}

pub fn decode(bytes: &[u8]) -> Result<Message, CodecError> {
    serde_json::from_slice(bytes).map_err(CodecError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Artifact, Participant, Phase, Round, Session};
    use pretty_assertions::assert_eq;

    fn sample_session() -> Session {
        let mut session =
            Session::hosted_by(Participant::host("host".into(), "Host".into(), "owl".into()));
        session.add_participant(Participant::new("p2".into(), "Two".into(), "fox".into()));
        session.upsert_round(Round::new("fact1".into(), "host".into(), "Host".into()));
        session.upsert_round(Round::new("fact2".into(), "p2".into(), "Two".into()));
        session.assign_rotation();
        session.round_mut(0).unwrap().artifact =
            Some(Artifact::new(serde_json::json!({"layers": [{"kind": "text", "body": "hi"}]})));
        session.round_mut(0).unwrap().votes = 1;
        session.phase = Phase::Voting;
        session.generation = 3;
        session
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let session = sample_session();
        let bytes = encode(&Message::snapshot(&session)).unwrap();

        match decode(&bytes).unwrap() {
            Message::StateSnapshot { session: decoded } => assert_eq!(decoded, session),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_snapshot_fields_are_camel_case() {
        let bytes = encode(&Message::snapshot(&sample_session())).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let session = &value["payload"]["session"];

        let host = &session["participants"][0];
        assert_eq!(host["isHost"], serde_json::json!(true));
        assert_eq!(host["hasSubmitted"], serde_json::json!(false));
        assert_eq!(host["isConnected"], serde_json::json!(true));

        let round = &session["rounds"][0];
        assert_eq!(round["authorId"], serde_json::json!("host"));
        assert_eq!(round["authorName"], serde_json::json!("Host"));
        assert_eq!(round["assigneeId"], serde_json::json!("p2"));
        assert!(round.get("author_id").is_none());
    }

    #[test]
    fn test_decode_wire_intent() {
        let bytes = br#"{"kind":"SubmitFact","payload":{"text":"Honey never spoils"}}"#;
        assert_eq!(
            decode(bytes).unwrap(),
            Message::SubmitFact {
                text: "Honey never spoils".into()
            }
        );
    }

    #[test]
    fn test_decode_rejects_unknown_kind() {
        let bytes = br#"{"kind":"Teleport","payload":{}}"#;
        assert!(matches!(decode(bytes), Err(CodecError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode(b"\x00\x01"), Err(CodecError::Decode(_))));
    }
}
