//! Realtime play events carried on the `play:{sessionId}` broadcast channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::dto::session::SessionStatus;

/// SSE event name used for play events.
pub const PLAY_EVENT: &str = "play_event";

/// Raw `{ type, payload, timestamp }` frame as broadcast by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPlayEvent {
    /// Event type, e.g. `state_change`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific payload.
    #[serde(default)]
    pub payload: Value,
    /// Server timestamp, RFC 3339.
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Decoded play event relevant to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayEvent {
    /// The host changed the session status.
    StateChange {
        /// New status.
        status: SessionStatus,
    },
    /// A decision opened for voting.
    DecisionOpened {
        /// Decision identifier.
        decision_id: Uuid,
        /// Decision title, when broadcast.
        title: Option<String>,
        /// Whether the decision takes over the screen.
        blocking: bool,
    },
    /// A decision stopped accepting votes (closed or revealed).
    DecisionClosed {
        /// Decision identifier.
        decision_id: Uuid,
    },
    /// The host pushed story text to every screen.
    StoryShown {
        /// Optional heading.
        title: Option<String>,
        /// Story text.
        text: String,
    },
    /// The host withdrew the story overlay.
    StoryHidden,
    /// The host started a countdown.
    CountdownShown {
        /// Length of the countdown.
        duration_seconds: u32,
        /// Text shown under the counter.
        message: Option<String>,
    },
    /// The host skipped the running countdown.
    CountdownSkipped,
    /// Artifacts were revealed, snapshotted or changed.
    ArtifactsUpdated,
    /// A participant or the host raised a signal.
    SignalReceived {
        /// Channel the signal was raised on.
        channel: String,
        /// Optional note.
        message: Option<String>,
    },
}

#[derive(Deserialize)]
struct StateChangePayload {
    status: SessionStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DecisionPayload {
    action: String,
    decision_id: Uuid,
    #[serde(default)]
    title: Option<String>,
    #[serde(default = "default_blocking")]
    blocking: bool,
}

fn default_blocking() -> bool {
    true
}

#[derive(Deserialize)]
struct StoryPayload {
    action: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct CountdownPayload {
    action: String,
    #[serde(default)]
    duration: u32,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct SignalPayload {
    channel: String,
    #[serde(default)]
    message: Option<String>,
}

impl RawPlayEvent {
    /// Decode the frame into a [`PlayEvent`].
    ///
    /// Returns `Ok(None)` for event types and actions this client ignores.
    pub fn decode(self) -> serde_json::Result<Option<PlayEvent>> {
        let event = match self.kind.as_str() {
            "state_change" => {
                let payload: StateChangePayload = serde_json::from_value(self.payload)?;
                Some(PlayEvent::StateChange {
                    status: payload.status,
                })
            }
            "decision_update" => {
                let payload: DecisionPayload = serde_json::from_value(self.payload)?;
                match payload.action.as_str() {
                    "opened" => Some(PlayEvent::DecisionOpened {
                        decision_id: payload.decision_id,
                        title: payload.title,
                        blocking: payload.blocking,
                    }),
                    "closed" | "revealed" => Some(PlayEvent::DecisionClosed {
                        decision_id: payload.decision_id,
                    }),
                    _ => None,
                }
            }
            "story_overlay" => {
                let payload: StoryPayload = serde_json::from_value(self.payload)?;
                match payload.action.as_str() {
                    "show" => Some(PlayEvent::StoryShown {
                        title: payload.title,
                        text: payload.text,
                    }),
                    "hide" => Some(PlayEvent::StoryHidden),
                    _ => None,
                }
            }
            "countdown" => {
                let payload: CountdownPayload = serde_json::from_value(self.payload)?;
                match payload.action.as_str() {
                    "show" => Some(PlayEvent::CountdownShown {
                        duration_seconds: payload.duration,
                        message: payload.message,
                    }),
                    "skip" => Some(PlayEvent::CountdownSkipped),
                    _ => None,
                }
            }
            "artifact_update" => Some(PlayEvent::ArtifactsUpdated),
            "signal_received" => {
                let payload: SignalPayload = serde_json::from_value(self.payload)?;
                Some(PlayEvent::SignalReceived {
                    channel: payload.channel,
                    message: payload.message,
                })
            }
            _ => None,
        };

        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> Option<PlayEvent> {
        serde_json::from_str::<RawPlayEvent>(json)
            .unwrap()
            .decode()
            .unwrap()
    }

    #[test]
    fn decodes_state_change() {
        let event = decode(r#"{"type":"state_change","payload":{"status":"ended"},"timestamp":"2026-01-01T00:00:00Z"}"#);
        assert_eq!(
            event,
            Some(PlayEvent::StateChange {
                status: SessionStatus::Ended
            })
        );
    }

    #[test]
    fn decision_defaults_to_blocking() {
        let id = Uuid::new_v4();
        let json = format!(
            r#"{{"type":"decision_update","payload":{{"action":"opened","decisionId":"{id}"}}}}"#
        );
        assert_eq!(
            decode(&json),
            Some(PlayEvent::DecisionOpened {
                decision_id: id,
                title: None,
                blocking: true
            })
        );
    }

    #[test]
    fn revealed_decision_counts_as_closed() {
        let id = Uuid::new_v4();
        let json = format!(
            r#"{{"type":"decision_update","payload":{{"action":"revealed","decisionId":"{id}"}}}}"#
        );
        assert_eq!(decode(&json), Some(PlayEvent::DecisionClosed { decision_id: id }));
    }

    #[test]
    fn unknown_types_and_actions_are_ignored() {
        assert_eq!(decode(r#"{"type":"turn_update","payload":{}}"#), None);
        assert_eq!(
            decode(r#"{"type":"countdown","payload":{"action":"rewind"}}"#),
            None
        );
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let raw: RawPlayEvent =
            serde_json::from_str(r#"{"type":"state_change","payload":{"status":42}}"#).unwrap();
        assert!(raw.decode().is_err());
    }
}
