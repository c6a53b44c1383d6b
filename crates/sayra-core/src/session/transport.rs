//! Websocket transport task.
//!
//! One task owns the socket for the whole session:
//!
//! ```text
//!              outbound mpsc                     websocket
//! ┌─────────┐ ─────────────▸ ┌───────────────┐ ◂───────────▸ ┌─────────┐
//! │   UI    │                │ transport task │               │ backend │
//! └─────────┘ ◂───────────── └───────────────┘               └─────────┘
//!              inbound mpsc
//! ```
//!
//! - Emits made while offline are held in a bounded backlog and flushed
//!   after the next connect.
//! - Every connect and disconnect is reported as an inbound event.
//! - Reconnection follows the configured backoff until cancelled.

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::events::{DisconnectReason, InboundEvent, OutboundEvent};
use super::protocol::{
    ENGINE_IO_VERSION, EnginePacket, Handshake, ProtocolError, SocketPacket, SocketPacketType,
};
use crate::config::{ReconnectConfig, SessionConfig};

/// Connect timeout, matching the stock Socket.IO client.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(20);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Errors while establishing a session.
///
/// These stay inside the transport; the UI only sees `disconnect`.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("WebSocket error: {0}")]
    WebSocket(Box<tungstenite::Error>),

    #[error("Handshake timed out after {}s", HANDSHAKE_TIMEOUT.as_secs())]
    HandshakeTimeout,

    #[error("Unexpected packet during handshake: {0}")]
    Handshake(String),

    #[error("Connection rejected by server: {0}")]
    Rejected(String),

    #[error("Connection closed")]
    Closed,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl From<tungstenite::Error> for ChannelError {
    fn from(err: tungstenite::Error) -> Self {
        ChannelError::WebSocket(Box::new(err))
    }
}

/// Builds the websocket URL for an `http(s)`/`ws(s)` endpoint.
///
/// An endpoint without a path gets the default `/socket.io/` path.
///
/// # Errors
/// Returns an error if the endpoint does not parse or has another scheme.
pub fn socket_url(endpoint: &str) -> Result<Url, ChannelError> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| ChannelError::InvalidEndpoint(format!("{endpoint}: {e}")))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ChannelError::InvalidEndpoint(format!(
                "{endpoint}: unsupported scheme {other:?}"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| ChannelError::InvalidEndpoint(endpoint.to_string()))?;

    if url.path().is_empty() || url.path() == "/" {
        url.set_path("/socket.io/");
    }
    url.query_pairs_mut()
        .append_pair("EIO", &ENGINE_IO_VERSION.to_string())
        .append_pair("transport", "websocket");

    Ok(url)
}

/// Outbound events held while offline. Oldest are dropped past `max`.
#[derive(Debug)]
struct Backlog {
    events: VecDeque<OutboundEvent>,
    max: usize,
}

impl Backlog {
    fn new(max: usize) -> Self {
        Self {
            events: VecDeque::new(),
            max,
        }
    }

    fn push(&mut self, event: OutboundEvent) {
        if self.max == 0 {
            warn!(event = event.name(), "Offline buffer disabled, dropping emit");
            return;
        }
        if self.events.len() >= self.max
            && let Some(dropped) = self.events.pop_front()
        {
            warn!(event = dropped.name(), "Offline buffer full, dropping oldest emit");
        }
        self.events.push_back(event);
    }

    fn pop(&mut self) -> Option<OutboundEvent> {
        self.events.pop_front()
    }

    fn requeue(&mut self, event: OutboundEvent) {
        self.events.push_front(event);
    }

    fn len(&self) -> usize {
        self.events.len()
    }

    fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Reconnect attempt counter, reset on every successful connect.
struct Backoff<'a> {
    policy: &'a ReconnectConfig,
    attempt: u32,
}

impl<'a> Backoff<'a> {
    fn new(policy: &'a ReconnectConfig) -> Self {
        Self { policy, attempt: 0 }
    }

    fn reset(&mut self) {
        self.attempt = 0;
    }

    fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        reconnect_delay(self.policy, self.attempt)
    }
}

/// Delay before reconnect `attempt` (1-based), jittered and capped.
fn reconnect_delay(policy: &ReconnectConfig, attempt: u32) -> Duration {
    let mut rng = rand::thread_rng();
    let roll = rng.gen_range(0.0..1.0);
    let add = rng.gen_bool(0.5);
    jitter(
        policy.base_delay(attempt),
        policy.randomization_factor,
        roll,
        add,
    )
    .min(Duration::from_millis(policy.delay_max_ms))
}

fn jitter(base: Duration, factor: f64, roll: f64, add: bool) -> Duration {
    let deviation = base.mul_f64(factor.clamp(0.0, 1.0) * roll.clamp(0.0, 1.0));
    if add {
        base.saturating_add(deviation)
    } else {
        base.saturating_sub(deviation)
    }
}

/// An open Socket.IO session.
struct Connection {
    sink: WsSink,
    source: WsSource,
    handshake: Handshake,
}

/// Runs the transport until cancelled or reconnection gives up.
pub(crate) async fn run(
    config: SessionConfig,
    mut outbound_rx: mpsc::UnboundedReceiver<OutboundEvent>,
    inbound_tx: mpsc::UnboundedSender<InboundEvent>,
    cancel: CancellationToken,
) {
    let url = match socket_url(&config.endpoint) {
        Ok(url) => url,
        Err(e) => {
            warn!("Session channel not started: {e}");
            return;
        }
    };
    info!(%url, "Session channel starting");

    let mut backlog = Backlog::new(config.max_buffered);
    let mut backoff = Backoff::new(&config.reconnect);

    loop {
        let Some(opened) = open_buffering(&url, &mut outbound_rx, &mut backlog, &cancel).await
        else {
            break;
        };

        match opened {
            Ok(conn) => {
                backoff.reset();
                info!(sid = %conn.handshake.sid, "Session channel connected");
                if inbound_tx.send(InboundEvent::Connect).is_err() {
                    break;
                }

                let reason = drive(conn, &mut outbound_rx, &inbound_tx, &mut backlog, &cancel).await;
                info!(%reason, "Session channel disconnected");
                let _ = inbound_tx.send(InboundEvent::Disconnect(reason));

                // The stock client does not retry after an explicit disconnect.
                if matches!(
                    reason,
                    DisconnectReason::ClientDisconnect | DisconnectReason::ServerDisconnect
                ) {
                    break;
                }
            }
            Err(e) => warn!("Session channel connect failed: {e}"),
        }

        if !config.reconnect.enabled {
            info!("Reconnection disabled, session channel stopped");
            break;
        }

        let delay = backoff.next_delay();
        debug!(
            attempt = backoff.attempt,
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect"
        );
        if !wait_offline(delay, &mut outbound_rx, &mut backlog, &cancel).await {
            break;
        }
    }

    if !backlog.is_empty() {
        debug!(dropped = backlog.len(), "Discarding buffered emits");
    }
}

/// Sleeps for `delay`, buffering emits. Returns false if the channel closed.
async fn wait_offline(
    delay: Duration,
    outbound_rx: &mut mpsc::UnboundedReceiver<OutboundEvent>,
    backlog: &mut Backlog,
    cancel: &CancellationToken,
) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            () = &mut sleep => return true,
            () = cancel.cancelled() => return false,
            msg = outbound_rx.recv() => match msg {
                Some(event) => backlog.push(event),
                None => return false,
            },
        }
    }
}

/// Runs [`open`] under the handshake timeout while buffering emits.
/// Returns `None` when cancelled or when the channel handle is gone.
async fn open_buffering(
    url: &Url,
    outbound_rx: &mut mpsc::UnboundedReceiver<OutboundEvent>,
    backlog: &mut Backlog,
    cancel: &CancellationToken,
) -> Option<Result<Connection, ChannelError>> {
    let handshake = tokio::time::timeout(HANDSHAKE_TIMEOUT, open(url));
    tokio::pin!(handshake);

    loop {
        tokio::select! {
            () = cancel.cancelled() => return None,
            result = &mut handshake => {
                return Some(result.unwrap_or(Err(ChannelError::HandshakeTimeout)));
            }
            msg = outbound_rx.recv() => match msg {
                Some(event) => backlog.push(event),
                None => return None,
            },
        }
    }
}

/// Opens the websocket and completes the Engine.IO and Socket.IO handshakes.
async fn open(url: &Url) -> Result<Connection, ChannelError> {
    let (ws, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;
    let (mut sink, mut source) = ws.split();

    let handshake = match next_packet(&mut source).await? {
        EnginePacket::Open(handshake) => handshake,
        other => {
            return Err(ChannelError::Handshake(format!(
                "expected open, got {:?}",
                other.kind()
            )));
        }
    };
    debug!(
        sid = %handshake.sid,
        ping_interval = handshake.ping_interval,
        ping_timeout = handshake.ping_timeout,
        "Engine.IO open"
    );

    sink.send(Message::Text(SocketPacket::connect().to_frame()))
        .await?;

    loop {
        match next_packet(&mut source).await? {
            EnginePacket::Ping(data) => {
                sink.send(Message::Text(EnginePacket::Pong(data).encode()))
                    .await?;
            }
            EnginePacket::Message(payload) => {
                let packet = SocketPacket::decode(&payload)?;
                match packet.kind {
                    SocketPacketType::Connect => {
                        return Ok(Connection {
                            sink,
                            source,
                            handshake,
                        });
                    }
                    SocketPacketType::ConnectError => {
                        let detail = packet.data.map(|d| d.to_string()).unwrap_or_default();
                        return Err(ChannelError::Rejected(detail));
                    }
                    other => debug!(kind = ?other, "Ignoring packet before connect"),
                }
            }
            EnginePacket::Close => return Err(ChannelError::Closed),
            other => debug!(kind = ?other.kind(), "Ignoring packet during handshake"),
        }
    }
}

/// Reads the next Engine.IO packet, skipping websocket control frames.
async fn next_packet(source: &mut WsSource) -> Result<EnginePacket, ChannelError> {
    loop {
        match source.next().await {
            Some(Ok(Message::Text(text))) => return Ok(EnginePacket::decode(&text)?),
            Some(Ok(Message::Close(_))) | None => return Err(ChannelError::Closed),
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

async fn send_event(sink: &mut WsSink, event: &OutboundEvent) -> Result<(), tungstenite::Error> {
    let frame = event.to_packet().to_frame();
    debug!(%frame, "Emit");
    sink.send(Message::Text(frame)).await
}

/// Pumps an open session until it ends, returning why.
async fn drive(
    conn: Connection,
    outbound_rx: &mut mpsc::UnboundedReceiver<OutboundEvent>,
    inbound_tx: &mpsc::UnboundedSender<InboundEvent>,
    backlog: &mut Backlog,
    cancel: &CancellationToken,
) -> DisconnectReason {
    let Connection {
        mut sink,
        mut source,
        handshake,
    } = conn;

    while let Some(event) = backlog.pop() {
        if let Err(e) = send_event(&mut sink, &event).await {
            warn!("Flushing buffered emit failed: {e}");
            backlog.requeue(event);
            return DisconnectReason::TransportError;
        }
    }

    let liveness = handshake.liveness_timeout();
    let deadline = tokio::time::sleep(liveness);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                let _ = sink.send(Message::Text(SocketPacket::disconnect().to_frame())).await;
                let _ = sink.close().await;
                return DisconnectReason::ClientDisconnect;
            }

            () = &mut deadline => {
                warn!(timeout_ms = liveness.as_millis() as u64, "No ping from server");
                return DisconnectReason::PingTimeout;
            }

            msg = outbound_rx.recv() => {
                let Some(event) = msg else {
                    let _ = sink.close().await;
                    return DisconnectReason::ClientDisconnect;
                };
                if let Err(e) = send_event(&mut sink, &event).await {
                    warn!("Emit failed: {e}");
                    backlog.push(event);
                    return DisconnectReason::TransportError;
                }
            }

            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let packet = match EnginePacket::decode(&text) {
                        Ok(packet) => packet,
                        Err(e) => {
                            warn!("Dropping undecodable frame: {e}");
                            continue;
                        }
                    };
                    match packet {
                        EnginePacket::Ping(data) => {
                            deadline
                                .as_mut()
                                .reset(tokio::time::Instant::now() + liveness);
                            if let Err(e) = sink.send(Message::Text(EnginePacket::Pong(data).encode())).await {
                                warn!("Pong failed: {e}");
                                return DisconnectReason::TransportError;
                            }
                        }
                        EnginePacket::Message(payload) => {
                            if let Some(reason) = dispatch(&payload, inbound_tx) {
                                return reason;
                            }
                        }
                        EnginePacket::Close => return DisconnectReason::TransportClose,
                        EnginePacket::Open(_)
                        | EnginePacket::Pong(_)
                        | EnginePacket::Upgrade
                        | EnginePacket::Noop => {}
                    }
                }
                Some(Ok(Message::Close(_))) | None => return DisconnectReason::TransportClose,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket read failed: {e}");
                    return DisconnectReason::TransportError;
                }
            },
        }
    }
}

/// Handles one Socket.IO packet. Returns a reason if the session ended.
fn dispatch(
    payload: &str,
    inbound_tx: &mpsc::UnboundedSender<InboundEvent>,
) -> Option<DisconnectReason> {
    let packet = match SocketPacket::decode(payload) {
        Ok(packet) => packet,
        Err(e) => {
            warn!("Dropping undecodable packet: {e}");
            return None;
        }
    };

    match packet.kind {
        SocketPacketType::Event | SocketPacketType::BinaryEvent => {
            let Some((name, args)) = packet.into_event() else {
                warn!("Dropping event without a name");
                return None;
            };
            debug!(event = %name, "Inbound event");
            if inbound_tx.send(InboundEvent::from_wire(&name, args)).is_err() {
                return Some(DisconnectReason::ClientDisconnect);
            }
            None
        }
        SocketPacketType::Disconnect | SocketPacketType::ConnectError => {
            Some(DisconnectReason::ServerDisconnect)
        }
        SocketPacketType::Connect | SocketPacketType::Ack | SocketPacketType::BinaryAck => {
            debug!(kind = ?packet.kind, "Ignoring packet");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_url_from_http_endpoint() {
        let url = socket_url("http://localhost:8080").unwrap();
        assert_eq!(
            url.as_str(),
            "ws://localhost:8080/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn test_socket_url_keeps_custom_path_and_tls() {
        let url = socket_url("https://sayra.local/custom/").unwrap();
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.path(), "/custom/");
    }

    #[test]
    fn test_socket_url_rejects_other_schemes() {
        assert!(matches!(
            socket_url("ftp://localhost"),
            Err(ChannelError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            socket_url("not a url"),
            Err(ChannelError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_jitter_bounds() {
        let base = Duration::from_millis(1000);
        assert_eq!(jitter(base, 0.5, 0.0, true), base);
        assert_eq!(jitter(base, 0.5, 1.0, true), Duration::from_millis(1500));
        assert_eq!(jitter(base, 0.5, 1.0, false), Duration::from_millis(500));
        assert_eq!(jitter(base, 0.0, 0.9, false), base);
    }

    #[test]
    fn test_reconnect_delay_stays_within_cap() {
        let policy = ReconnectConfig::default();
        for attempt in 1..20 {
            let delay = reconnect_delay(&policy, attempt);
            assert!(delay <= Duration::from_millis(policy.delay_max_ms));
            assert!(delay >= policy.base_delay(attempt).mul_f64(0.5));
        }
    }

    #[test]
    fn test_backoff_restarts_from_base_after_reset() {
        let policy = ReconnectConfig {
            enabled: true,
            delay_ms: 100,
            delay_max_ms: 10_000,
            randomization_factor: 0.0,
        };
        let mut backoff = Backoff::new(&policy);
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(400));

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_backlog_drops_oldest() {
        let mut backlog = Backlog::new(2);
        backlog.push(OutboundEvent::VoiceTrigger);
        backlog.push(OutboundEvent::UserCommand {
            text: "a".to_string(),
        });
        backlog.push(OutboundEvent::UserCommand {
            text: "b".to_string(),
        });

        assert_eq!(backlog.len(), 2);
        assert_eq!(
            backlog.pop(),
            Some(OutboundEvent::UserCommand {
                text: "a".to_string()
            })
        );
    }
}
