//! Named events exchanged with the backend.
//!
//! Inbound payloads are decoded permissively: unknown mode strings pass
//! through as `Other`, non-string text is kept as its JSON text, and the
//! backend's `{"data": ...}` wrapper is peeled off before dispatch.

use serde_json::{Value, json};

use super::protocol::SocketPacket;
use super::state::{Alert, AssistantMode, BackendStatus, UserPresence, VitalsSnapshot};

/// Event names used on the wire.
pub mod event_names {
    pub const CONNECT: &str = "connect";
    pub const DISCONNECT: &str = "disconnect";
    pub const BOT_MESSAGE: &str = "bot_message";
    pub const SAYRA_STATE: &str = "sayra_state";
    pub const SYSTEM_VITALS: &str = "system_vitals";
    pub const USER_TRANSCRIPTION: &str = "user_transcription";
    pub const SHOW_ALERT: &str = "show_alert";
    pub const USER_STATUS: &str = "user_status";
    pub const SYSTEM_STATUS: &str = "system_status";

    pub const VOICE_TRIGGER: &str = "voice_trigger";
    pub const USER_COMMAND: &str = "user_command";
}

/// Why the channel went offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Server sent a Socket.IO disconnect or rejected the connect.
    ServerDisconnect,
    /// The client closed the channel.
    ClientDisconnect,
    /// The websocket or Engine.IO session was closed.
    TransportClose,
    /// Reading or writing the websocket failed.
    TransportError,
    /// No ping within `pingInterval + pingTimeout`.
    PingTimeout,
}

impl DisconnectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ServerDisconnect => "io server disconnect",
            Self::ClientDisconnect => "io client disconnect",
            Self::TransportClose => "transport close",
            Self::TransportError => "transport error",
            Self::PingTimeout => "ping timeout",
        }
    }
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event received from the backend (or synthesized by the transport).
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Connect,
    Disconnect(DisconnectReason),
    BotMessage(String),
    SayraState(AssistantMode),
    SystemVitals(VitalsSnapshot),
    UserTranscription(String),
    ShowAlert(Alert),
    UserStatus(UserPresence),
    SystemStatus(BackendStatus),
    /// A known event whose payload could not be used.
    Malformed { name: String, payload: Value },
    /// An event this client does not handle.
    Unknown { name: String },
}

impl InboundEvent {
    /// Decodes one Socket.IO event into the local contract.
    ///
    /// Only the first argument is used as payload.
    pub fn from_wire(name: &str, args: Vec<Value>) -> Self {
        let payload = args.into_iter().next().map_or(Value::Null, unwrap_envelope);

        match name {
            event_names::CONNECT => InboundEvent::Connect,
            event_names::DISCONNECT => InboundEvent::Disconnect(DisconnectReason::ServerDisconnect),
            event_names::BOT_MESSAGE => InboundEvent::BotMessage(payload_text(&payload)),
            event_names::USER_TRANSCRIPTION => {
                InboundEvent::UserTranscription(payload_text(&payload))
            }
            event_names::SAYRA_STATE => {
                InboundEvent::SayraState(AssistantMode::from_wire(&payload_text(&payload)))
            }
            event_names::SYSTEM_VITALS => match VitalsSnapshot::from_payload(&payload) {
                Some(vitals) => InboundEvent::SystemVitals(vitals),
                None => InboundEvent::Malformed {
                    name: name.to_string(),
                    payload,
                },
            },
            event_names::SHOW_ALERT => InboundEvent::ShowAlert(Alert::from_payload(&payload)),
            event_names::USER_STATUS => {
                InboundEvent::UserStatus(UserPresence::from_wire(&payload_text(&payload)))
            }
            event_names::SYSTEM_STATUS => {
                InboundEvent::SystemStatus(BackendStatus::from_wire(&payload_text(&payload)))
            }
            _ => InboundEvent::Unknown {
                name: name.to_string(),
            },
        }
    }

    /// Wire name of this event.
    pub fn name(&self) -> &str {
        match self {
            InboundEvent::Connect => event_names::CONNECT,
            InboundEvent::Disconnect(_) => event_names::DISCONNECT,
            InboundEvent::BotMessage(_) => event_names::BOT_MESSAGE,
            InboundEvent::SayraState(_) => event_names::SAYRA_STATE,
            InboundEvent::SystemVitals(_) => event_names::SYSTEM_VITALS,
            InboundEvent::UserTranscription(_) => event_names::USER_TRANSCRIPTION,
            InboundEvent::ShowAlert(_) => event_names::SHOW_ALERT,
            InboundEvent::UserStatus(_) => event_names::USER_STATUS,
            InboundEvent::SystemStatus(_) => event_names::SYSTEM_STATUS,
            InboundEvent::Malformed { name, .. } | InboundEvent::Unknown { name } => name,
        }
    }
}

/// An event sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    /// Start listening. No payload.
    VoiceTrigger,
    /// Free-text command, already trimmed and non-empty.
    UserCommand { text: String },
}

impl OutboundEvent {
    /// Builds a command event, or `None` if `input` is blank.
    pub fn user_command(input: &str) -> Option<Self> {
        let text = input.trim();
        if text.is_empty() {
            return None;
        }
        Some(OutboundEvent::UserCommand {
            text: text.to_string(),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::VoiceTrigger => event_names::VOICE_TRIGGER,
            OutboundEvent::UserCommand { .. } => event_names::USER_COMMAND,
        }
    }

    /// Socket.IO event packet for this event.
    pub fn to_packet(&self) -> SocketPacket {
        match self {
            OutboundEvent::VoiceTrigger => SocketPacket::event(self.name(), Vec::new()),
            OutboundEvent::UserCommand { text } => {
                SocketPacket::event(self.name(), vec![json!({ "text": text })])
            }
        }
    }
}

/// Peels `{"data": x}` down to `x`.
fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.len() == 1 && map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Text form of a payload: strings verbatim, null as empty, anything else as JSON.
pub(crate) fn payload_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::state::AlertLevel;

    #[test]
    fn test_bot_message_string_payload() {
        let event = InboundEvent::from_wire("bot_message", vec![json!("Lights on.")]);
        assert_eq!(event, InboundEvent::BotMessage("Lights on.".to_string()));
    }

    #[test]
    fn test_data_envelope_is_unwrapped() {
        let event = InboundEvent::from_wire("bot_message", vec![json!({"data": "x"})]);
        assert_eq!(event, InboundEvent::BotMessage("x".to_string()));

        let event = InboundEvent::from_wire("sayra_state", vec![json!({"data": "listening"})]);
        assert_eq!(event, InboundEvent::SayraState(AssistantMode::Listening));
    }

    #[test]
    fn test_object_with_other_keys_is_not_unwrapped() {
        let event = InboundEvent::from_wire(
            "bot_message",
            vec![json!({"data": "x", "extra": true})],
        );
        let InboundEvent::BotMessage(text) = event else {
            panic!("expected bot_message");
        };
        assert!(text.contains("\"extra\""));
    }

    #[test]
    fn test_non_string_text_renders_as_json() {
        let event = InboundEvent::from_wire("user_transcription", vec![json!(42)]);
        assert_eq!(event, InboundEvent::UserTranscription("42".to_string()));

        let event = InboundEvent::from_wire("bot_message", vec![]);
        assert_eq!(event, InboundEvent::BotMessage(String::new()));
    }

    #[test]
    fn test_unknown_mode_passes_through() {
        let event = InboundEvent::from_wire("sayra_state", vec![json!("speaking")]);
        assert_eq!(
            event,
            InboundEvent::SayraState(AssistantMode::Other("speaking".to_string()))
        );
    }

    #[test]
    fn test_vitals_object_and_non_object() {
        let event = InboundEvent::from_wire(
            "system_vitals",
            vec![json!({"cpu": 42, "ram": "60", "battery": 80.5, "power": "Charging"})],
        );
        let InboundEvent::SystemVitals(vitals) = event else {
            panic!("expected vitals");
        };
        assert!((vitals.cpu - 42.0).abs() < f64::EPSILON);
        assert!((vitals.ram - 60.0).abs() < f64::EPSILON);
        assert!((vitals.battery - 80.5).abs() < f64::EPSILON);
        assert_eq!(vitals.power, "Charging");

        let event = InboundEvent::from_wire("system_vitals", vec![json!("high")]);
        assert!(matches!(event, InboundEvent::Malformed { .. }));
        assert_eq!(event.name(), "system_vitals");
    }

    #[test]
    fn test_wrapped_vitals_decode_as_vitals() {
        let event = InboundEvent::from_wire(
            "system_vitals",
            vec![json!({"data": {"cpu": "12%", "ram": 48, "battery": 91, "power": "Battery"}})],
        );
        let InboundEvent::SystemVitals(vitals) = event else {
            panic!("expected vitals, got {event:?}");
        };
        assert!((vitals.cpu - 12.0).abs() < f64::EPSILON);
        assert!((vitals.ram - 48.0).abs() < f64::EPSILON);
        assert!((vitals.battery - 91.0).abs() < f64::EPSILON);
        assert_eq!(vitals.power, "Battery");
        assert!(!vitals.is_charging());
    }

    #[test]
    fn test_show_alert_payload() {
        let event = InboundEvent::from_wire(
            "show_alert",
            vec![json!({"type": "warning", "message": "Take a break"})],
        );
        assert_eq!(
            event,
            InboundEvent::ShowAlert(Alert {
                level: AlertLevel::Warning,
                message: "Take a break".to_string(),
            })
        );
    }

    #[test]
    fn test_presence_and_backend_status() {
        assert_eq!(
            InboundEvent::from_wire("user_status", vec![json!("away")]),
            InboundEvent::UserStatus(UserPresence::Away)
        );
        assert_eq!(
            InboundEvent::from_wire("system_status", vec![json!("shutting_down")]),
            InboundEvent::SystemStatus(BackendStatus::ShuttingDown)
        );
    }

    #[test]
    fn test_unknown_event_name() {
        let event = InboundEvent::from_wire("telemetry", vec![json!({"a": 1})]);
        assert_eq!(
            event,
            InboundEvent::Unknown {
                name: "telemetry".to_string()
            }
        );
    }

    #[test]
    fn test_user_command_trims_and_rejects_blank() {
        assert_eq!(OutboundEvent::user_command(""), None);
        assert_eq!(OutboundEvent::user_command("   \t"), None);
        assert_eq!(
            OutboundEvent::user_command("  open vs code "),
            Some(OutboundEvent::UserCommand {
                text: "open vs code".to_string()
            })
        );
    }

    #[test]
    fn test_outbound_frames() {
        assert_eq!(
            OutboundEvent::VoiceTrigger.to_packet().to_frame(),
            r#"42["voice_trigger"]"#
        );
        let command = OutboundEvent::user_command("lights").unwrap();
        assert_eq!(
            command.to_packet().to_frame(),
            r#"42["user_command",{"text":"lights"}]"#
        );
    }
}
