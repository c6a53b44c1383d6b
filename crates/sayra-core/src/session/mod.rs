//! Session channel: the named-event contract with the backend.

mod channel;
mod events;
mod protocol;
mod state;
mod transport;

pub use channel::SessionChannel;
pub use events::{DisconnectReason, InboundEvent, OutboundEvent, event_names};
pub use protocol::{EnginePacket, Handshake, ProtocolError, SocketPacket, SocketPacketType};
pub use state::{
    Alert, AlertLevel, AssistantMode, BackendStatus, ConnectionStatus, ConversationLog, LogEntry,
    LogOrigin, ModeState, SessionState, UserPresence, VitalsSnapshot,
};
pub use transport::{ChannelError, socket_url};
