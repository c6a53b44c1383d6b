//! Wire protocol for the session channel.
//!
//! The backend speaks Socket.IO v5 on top of Engine.IO v4. Over the
//! websocket transport every text frame is one Engine.IO packet:
//!
//! ```text
//! +------+---------------------------+
//! | type | payload (rest of frame)   |
//! +------+---------------------------+
//!   '0' open      handshake JSON
//!   '1' close
//!   '2' ping      optional probe text
//!   '3' pong      echo of ping text
//!   '4' message   Socket.IO packet
//!   '5' upgrade
//!   '6' noop
//! ```
//!
//! A Socket.IO packet inside a `message` is encoded as:
//!
//! ```text
//! <type>[<attachments>-][<namespace>,][<ack id>][<json>]
//! ```
//!
//! e.g. `2["bot_message","Lights on."]` or `0` for a connect request.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

/// Engine.IO protocol revision spoken by this client.
pub const ENGINE_IO_VERSION: u8 = 4;

/// Namespace used for every packet.
pub const DEFAULT_NAMESPACE: &str = "/";

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Empty packet")]
    Empty,

    #[error("Unknown Engine.IO packet type: {0:?}")]
    UnknownEnginePacket(char),

    #[error("Unknown Socket.IO packet type: {0:?}")]
    UnknownSocketPacket(char),

    #[error("Invalid handshake: {0}")]
    InvalidHandshake(#[source] serde_json::Error),

    #[error("Invalid packet payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),

    #[error("Invalid attachment count in {0:?}")]
    InvalidAttachments(String),

    #[error("Invalid ack id in {0:?}")]
    InvalidAckId(String),
}

// ============================================================================
// Engine.IO
// ============================================================================

/// Engine.IO packet types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePacketType {
    Open,
    Close,
    Ping,
    Pong,
    Message,
    Upgrade,
    Noop,
}

impl EnginePacketType {
    /// Parse packet type from its wire digit.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Self::Open),
            '1' => Some(Self::Close),
            '2' => Some(Self::Ping),
            '3' => Some(Self::Pong),
            '4' => Some(Self::Message),
            '5' => Some(Self::Upgrade),
            '6' => Some(Self::Noop),
            _ => None,
        }
    }

    /// Convert to wire digit.
    pub fn as_char(self) -> char {
        match self {
            Self::Open => '0',
            Self::Close => '1',
            Self::Ping => '2',
            Self::Pong => '3',
            Self::Message => '4',
            Self::Upgrade => '5',
            Self::Noop => '6',
        }
    }
}

/// Handshake sent by the server in the `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

impl Handshake {
    /// How long the connection may stay silent before it is considered dead.
    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

/// A parsed Engine.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    /// Decode one text frame.
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let mut chars = frame.chars();
        let first = chars.next().ok_or(ProtocolError::Empty)?;
        let kind =
            EnginePacketType::from_char(first).ok_or(ProtocolError::UnknownEnginePacket(first))?;
        let payload = chars.as_str();

        let packet = match kind {
            EnginePacketType::Open => {
                let handshake =
                    serde_json::from_str(payload).map_err(ProtocolError::InvalidHandshake)?;
                EnginePacket::Open(handshake)
            }
            EnginePacketType::Close => EnginePacket::Close,
            EnginePacketType::Ping => EnginePacket::Ping(payload.to_string()),
            EnginePacketType::Pong => EnginePacket::Pong(payload.to_string()),
            EnginePacketType::Message => EnginePacket::Message(payload.to_string()),
            EnginePacketType::Upgrade => EnginePacket::Upgrade,
            EnginePacketType::Noop => EnginePacket::Noop,
        };

        Ok(packet)
    }

    /// Encode into a text frame.
    ///
    /// Clients never send `open`; it encodes as a bare type digit.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        out.push(self.kind().as_char());
        match self {
            EnginePacket::Ping(data) | EnginePacket::Pong(data) | EnginePacket::Message(data) => {
                out.push_str(data);
            }
            EnginePacket::Open(_)
            | EnginePacket::Close
            | EnginePacket::Upgrade
            | EnginePacket::Noop => {}
        }
        out
    }

    pub fn kind(&self) -> EnginePacketType {
        match self {
            EnginePacket::Open(_) => EnginePacketType::Open,
            EnginePacket::Close => EnginePacketType::Close,
            EnginePacket::Ping(_) => EnginePacketType::Ping,
            EnginePacket::Pong(_) => EnginePacketType::Pong,
            EnginePacket::Message(_) => EnginePacketType::Message,
            EnginePacket::Upgrade => EnginePacketType::Upgrade,
            EnginePacket::Noop => EnginePacketType::Noop,
        }
    }
}

// ============================================================================
// Socket.IO
// ============================================================================

/// Socket.IO packet types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketPacketType {
    Connect,
    Disconnect,
    Event,
    Ack,
    ConnectError,
    BinaryEvent,
    BinaryAck,
}

impl SocketPacketType {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Self::Connect),
            '1' => Some(Self::Disconnect),
            '2' => Some(Self::Event),
            '3' => Some(Self::Ack),
            '4' => Some(Self::ConnectError),
            '5' => Some(Self::BinaryEvent),
            '6' => Some(Self::BinaryAck),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Connect => '0',
            Self::Disconnect => '1',
            Self::Event => '2',
            Self::Ack => '3',
            Self::ConnectError => '4',
            Self::BinaryEvent => '5',
            Self::BinaryAck => '6',
        }
    }

    fn is_binary(self) -> bool {
        matches!(self, Self::BinaryEvent | Self::BinaryAck)
    }
}

/// A parsed Socket.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketPacket {
    pub kind: SocketPacketType,
    pub namespace: String,
    pub attachments: Option<u32>,
    pub ack_id: Option<u64>,
    pub data: Option<Value>,
}

impl SocketPacket {
    fn new(kind: SocketPacketType, data: Option<Value>) -> Self {
        Self {
            kind,
            namespace: DEFAULT_NAMESPACE.to_string(),
            attachments: None,
            ack_id: None,
            data,
        }
    }

    /// Connect request for the default namespace.
    pub fn connect() -> Self {
        Self::new(SocketPacketType::Connect, None)
    }

    /// Disconnect from the default namespace.
    pub fn disconnect() -> Self {
        Self::new(SocketPacketType::Disconnect, None)
    }

    /// Event packet: `["name", ...args]`.
    pub fn event(name: &str, args: Vec<Value>) -> Self {
        let mut items = Vec::with_capacity(args.len() + 1);
        items.push(Value::String(name.to_string()));
        items.extend(args);
        Self::new(SocketPacketType::Event, Some(Value::Array(items)))
    }

    /// Splits an event packet into its name and arguments.
    ///
    /// Returns `None` for non-event packets or events without a string name.
    pub fn into_event(self) -> Option<(String, Vec<Value>)> {
        if !matches!(
            self.kind,
            SocketPacketType::Event | SocketPacketType::BinaryEvent
        ) {
            return None;
        }
        let Some(Value::Array(items)) = self.data else {
            return None;
        };
        let mut items = items.into_iter();
        let Some(Value::String(name)) = items.next() else {
            return None;
        };
        Some((name, items.collect()))
    }

    /// Decode the payload of an Engine.IO `message` packet.
    pub fn decode(input: &str) -> Result<Self, ProtocolError> {
        let mut chars = input.chars();
        let first = chars.next().ok_or(ProtocolError::Empty)?;
        let kind =
            SocketPacketType::from_char(first).ok_or(ProtocolError::UnknownSocketPacket(first))?;
        let mut rest = chars.as_str();

        let attachments = if kind.is_binary() {
            let (count, tail) = rest
                .split_once('-')
                .ok_or_else(|| ProtocolError::InvalidAttachments(input.to_string()))?;
            rest = tail;
            Some(
                count
                    .parse()
                    .map_err(|_| ProtocolError::InvalidAttachments(input.to_string()))?,
            )
        } else {
            None
        };

        let namespace = if rest.starts_with('/') {
            match rest.split_once(',') {
                Some((ns, tail)) => {
                    rest = tail;
                    ns.to_string()
                }
                None => {
                    let ns = rest.to_string();
                    rest = "";
                    ns
                }
            }
        } else {
            DEFAULT_NAMESPACE.to_string()
        };

        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        let ack_id = if digits > 0 {
            let (id, tail) = rest.split_at(digits);
            rest = tail;
            Some(
                id.parse()
                    .map_err(|_| ProtocolError::InvalidAckId(input.to_string()))?,
            )
        } else {
            None
        };

        let data = if rest.is_empty() {
            None
        } else {
            Some(serde_json::from_str(rest).map_err(ProtocolError::InvalidPayload)?)
        };

        Ok(Self {
            kind,
            namespace,
            attachments,
            ack_id,
            data,
        })
    }

    /// Encode into the payload of an Engine.IO `message` packet.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        out.push(self.kind.as_char());
        if let Some(count) = self.attachments {
            out.push_str(&count.to_string());
            out.push('-');
        }
        if self.namespace != DEFAULT_NAMESPACE {
            out.push_str(&self.namespace);
            out.push(',');
        }
        if let Some(id) = self.ack_id {
            out.push_str(&id.to_string());
        }
        if let Some(data) = &self.data {
            out.push_str(&data.to_string());
        }
        out
    }

    /// Wraps this packet in an Engine.IO `message` frame.
    pub fn to_frame(&self) -> String {
        EnginePacket::Message(self.encode()).encode()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decode_open_handshake() {
        let frame = r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
        let EnginePacket::Open(handshake) = EnginePacket::decode(frame).unwrap() else {
            panic!("expected open packet");
        };
        assert_eq!(handshake.sid, "lv_VI97HAXpY6yYWAAAC");
        assert_eq!(handshake.max_payload, Some(1_000_000));
        assert_eq!(handshake.liveness_timeout(), Duration::from_secs(45));
    }

    #[test]
    fn test_decode_open_with_bad_json_is_error() {
        let err = EnginePacket::decode("0{not json").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidHandshake(_)));
    }

    #[test]
    fn test_ping_is_answered_with_matching_pong() {
        let EnginePacket::Ping(probe) = EnginePacket::decode("2").unwrap() else {
            panic!("expected ping");
        };
        assert_eq!(EnginePacket::Pong(probe).encode(), "3");

        let EnginePacket::Ping(probe) = EnginePacket::decode("2probe").unwrap() else {
            panic!("expected ping");
        };
        assert_eq!(EnginePacket::Pong(probe).encode(), "3probe");
    }

    #[test]
    fn test_unknown_engine_packet() {
        assert!(matches!(
            EnginePacket::decode("9"),
            Err(ProtocolError::UnknownEnginePacket('9'))
        ));
        assert!(matches!(EnginePacket::decode(""), Err(ProtocolError::Empty)));
    }

    #[test]
    fn test_decode_event_frame() {
        let EnginePacket::Message(inner) =
            EnginePacket::decode(r#"42["bot_message","Lights on."]"#).unwrap()
        else {
            panic!("expected message");
        };
        let packet = SocketPacket::decode(&inner).unwrap();
        assert_eq!(packet.kind, SocketPacketType::Event);
        assert_eq!(packet.namespace, "/");
        assert_eq!(packet.ack_id, None);

        let (name, args) = packet.into_event().unwrap();
        assert_eq!(name, "bot_message");
        assert_eq!(args, vec![json!("Lights on.")]);
    }

    #[test]
    fn test_decode_connect_ack_with_sid() {
        let packet = SocketPacket::decode(r#"0{"sid":"wZX3oN0bSVIhsaknAAAI"}"#).unwrap();
        assert_eq!(packet.kind, SocketPacketType::Connect);
        assert_eq!(packet.data, Some(json!({"sid": "wZX3oN0bSVIhsaknAAAI"})));
    }

    #[test]
    fn test_decode_namespace_and_ack_id() {
        let packet = SocketPacket::decode(r#"2/admin,12["ping",1]"#).unwrap();
        assert_eq!(packet.namespace, "/admin");
        assert_eq!(packet.ack_id, Some(12));
        let (name, args) = packet.into_event().unwrap();
        assert_eq!(name, "ping");
        assert_eq!(args, vec![json!(1)]);
    }

    #[test]
    fn test_decode_binary_event_attachments() {
        let packet =
            SocketPacket::decode(r#"51-["upload",{"_placeholder":true,"num":0}]"#).unwrap();
        assert_eq!(packet.kind, SocketPacketType::BinaryEvent);
        assert_eq!(packet.attachments, Some(1));

        assert!(matches!(
            SocketPacket::decode(r#"5["upload"]"#),
            Err(ProtocolError::InvalidAttachments(_))
        ));
    }

    #[test]
    fn test_disconnect_packet_has_no_data() {
        let packet = SocketPacket::decode("1").unwrap();
        assert_eq!(packet.kind, SocketPacketType::Disconnect);
        assert_eq!(packet.data, None);
        assert!(packet.into_event().is_none());
    }

    #[test]
    fn test_event_without_string_name_is_not_an_event() {
        let packet = SocketPacket::decode("2[42]").unwrap();
        assert!(packet.into_event().is_none());
    }

    #[test]
    fn test_encode_client_frames() {
        assert_eq!(SocketPacket::connect().to_frame(), "40");
        assert_eq!(SocketPacket::disconnect().to_frame(), "41");
        assert_eq!(
            SocketPacket::event("voice_trigger", vec![]).to_frame(),
            r#"42["voice_trigger"]"#
        );
        assert_eq!(
            SocketPacket::event("user_command", vec![json!({"text": "open vs code"})]).to_frame(),
            r#"42["user_command",{"text":"open vs code"}]"#
        );
    }
}
