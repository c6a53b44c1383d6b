//! Session state slots and the inbound dispatch table.
//!
//! Everything the view renders lives in [`SessionState`]. It changes only
//! through [`SessionState::apply`] (inbound events) and the two user actions
//! ([`SessionState::request_voice_capture`], [`SessionState::submit_command`]).

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use serde_json::Value;

use super::events::{InboundEvent, OutboundEvent, payload_text};

/// Transport-level connection status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    Online,
    #[default]
    Offline,
}

impl ConnectionStatus {
    pub fn is_online(self) -> bool {
        self == ConnectionStatus::Online
    }
}

/// What the assistant is doing.
///
/// Backend values are not validated; anything unrecognized is kept as `Other`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AssistantMode {
    #[default]
    Idle,
    Listening,
    Processing,
    Other(String),
}

impl AssistantMode {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "idle" => AssistantMode::Idle,
            "listening" => AssistantMode::Listening,
            "processing" => AssistantMode::Processing,
            other => AssistantMode::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AssistantMode::Idle => "idle",
            AssistantMode::Listening => "listening",
            AssistantMode::Processing => "processing",
            AssistantMode::Other(value) => value,
        }
    }

    /// Listening and processing animate the orb.
    pub fn is_active(&self) -> bool {
        matches!(self, AssistantMode::Listening | AssistantMode::Processing)
    }
}

/// Two-phase mode: a local intent shown until the backend confirms a mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeState {
    confirmed: AssistantMode,
    intent: Option<AssistantMode>,
}

impl ModeState {
    /// Mode to display: the pending intent, else the confirmed mode.
    pub fn current(&self) -> &AssistantMode {
        self.intent.as_ref().unwrap_or(&self.confirmed)
    }

    pub fn confirmed(&self) -> &AssistantMode {
        &self.confirmed
    }

    pub fn is_pending(&self) -> bool {
        self.intent.is_some()
    }

    pub fn set_intent(&mut self, mode: AssistantMode) {
        self.intent = Some(mode);
    }

    /// Server wins: sets the confirmed mode and drops any intent.
    pub fn confirm(&mut self, mode: AssistantMode) {
        self.confirmed = mode;
        self.intent = None;
    }
}

/// Latest host vitals reported by the backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VitalsSnapshot {
    pub cpu: f64,
    pub ram: f64,
    pub battery: f64,
    pub power: String,
}

impl VitalsSnapshot {
    /// Reads a snapshot from an object payload.
    ///
    /// Fields may be numbers or numeric strings; missing ones default.
    /// Returns `None` if the payload is not an object.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let map = payload.as_object()?;
        Some(Self {
            cpu: percentage(map.get("cpu")),
            ram: percentage(map.get("ram")),
            battery: percentage(map.get("battery")),
            power: map.get("power").map(payload_text).unwrap_or_default(),
        })
    }

    pub fn is_charging(&self) -> bool {
        self.power.eq_ignore_ascii_case("charging")
    }
}

fn percentage(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s
            .trim()
            .trim_end_matches('%')
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Who produced a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOrigin {
    User,
    Assistant,
}

/// One conversation log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub origin: LogOrigin,
    pub text: String,
    /// Local wall-clock time, `HH:MM:SS`.
    pub timestamp: String,
}

impl LogEntry {
    pub fn new(origin: LogOrigin, text: impl Into<String>, at: DateTime<Local>) -> Self {
        Self {
            origin,
            text: text.into(),
            timestamp: at.format("%H:%M:%S").to_string(),
        }
    }
}

/// Append-only conversation log, optionally bounded.
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    evicted: u64,
}

impl ConversationLog {
    /// A capacity of 0 keeps every entry.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
            evicted: 0,
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        if self.capacity > 0 && self.entries.len() >= self.capacity {
            self.entries.pop_front();
            self.evicted += 1;
        }
        self.entries.push_back(entry);
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LogEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries dropped so far to stay within capacity.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}

/// Severity carried by `show_alert`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
    Other(String),
}

impl AlertLevel {
    pub fn from_wire(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "" | "info" => AlertLevel::Info,
            "warning" | "warn" => AlertLevel::Warning,
            "error" => AlertLevel::Error,
            _ => AlertLevel::Other(value.to_string()),
        }
    }
}

/// Last alert pushed by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
}

impl Alert {
    /// Reads `{type, message}`; a bare string becomes an info alert.
    pub fn from_payload(payload: &Value) -> Self {
        match payload {
            Value::Object(map) => Self {
                level: AlertLevel::from_wire(
                    &map.get("type").map(payload_text).unwrap_or_default(),
                ),
                message: map.get("message").map(payload_text).unwrap_or_default(),
            },
            other => Self {
                level: AlertLevel::Info,
                message: payload_text(other),
            },
        }
    }
}

/// User presence reported by the backend's camera monitor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UserPresence {
    #[default]
    Unknown,
    Active,
    Away,
    Other(String),
}

impl UserPresence {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "active" => UserPresence::Active,
            "away" => UserPresence::Away,
            other => UserPresence::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            UserPresence::Unknown => "unknown",
            UserPresence::Active => "active",
            UserPresence::Away => "away",
            UserPresence::Other(value) => value,
        }
    }
}

/// Backend lifecycle status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BackendStatus {
    #[default]
    Unknown,
    Online,
    ShuttingDown,
    Other(String),
}

impl BackendStatus {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "online" => BackendStatus::Online,
            "shutting_down" => BackendStatus::ShuttingDown,
            other => BackendStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            BackendStatus::Unknown => "unknown",
            BackendStatus::Online => "online",
            BackendStatus::ShuttingDown => "shutting down",
            BackendStatus::Other(value) => value,
        }
    }
}

/// All session slots consumed by the view.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub status: ConnectionStatus,
    pub mode: ModeState,
    pub vitals: VitalsSnapshot,
    pub log: ConversationLog,
    /// Last bot message; `None` until the first one arrives.
    pub toast: Option<String>,
    pub alert: Option<Alert>,
    pub presence: UserPresence,
    pub backend: BackendStatus,
    /// Last command handed to the channel.
    pub last_command: Option<String>,
}

impl SessionState {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            log: ConversationLog::new(log_capacity),
            ..Self::default()
        }
    }

    /// Mode to display.
    pub fn mode(&self) -> &AssistantMode {
        self.mode.current()
    }

    pub fn apply(&mut self, event: &InboundEvent) {
        self.apply_at(event, Local::now());
    }

    /// Applies one inbound event, stamping log entries with `now`.
    pub fn apply_at(&mut self, event: &InboundEvent, now: DateTime<Local>) {
        match event {
            InboundEvent::Connect => {
                self.status = ConnectionStatus::Online;
            }
            InboundEvent::Disconnect(reason) => {
                tracing::debug!(%reason, "session offline");
                self.status = ConnectionStatus::Offline;
            }
            InboundEvent::BotMessage(text) => {
                self.toast = Some(text.clone());
                self.mode.confirm(AssistantMode::Idle);
                self.log
                    .push(LogEntry::new(LogOrigin::Assistant, text.clone(), now));
            }
            InboundEvent::SayraState(mode) => {
                self.mode.confirm(mode.clone());
            }
            InboundEvent::SystemVitals(vitals) => {
                self.vitals = vitals.clone();
            }
            InboundEvent::UserTranscription(text) => {
                self.log.push(LogEntry::new(LogOrigin::User, text.clone(), now));
            }
            InboundEvent::ShowAlert(alert) => {
                self.alert = Some(alert.clone());
            }
            InboundEvent::UserStatus(presence) => {
                self.presence = presence.clone();
            }
            InboundEvent::SystemStatus(status) => {
                self.backend = status.clone();
            }
            InboundEvent::Malformed { name, payload } => {
                tracing::warn!(event = %name, %payload, "Ignoring malformed payload");
            }
            InboundEvent::Unknown { name } => {
                tracing::debug!(event = %name, "Ignoring unhandled event");
            }
        }
    }

    /// Optimistically switches to listening and returns the trigger to emit.
    ///
    /// No debounce and no connection check.
    pub fn request_voice_capture(&mut self) -> OutboundEvent {
        self.mode.set_intent(AssistantMode::Listening);
        OutboundEvent::VoiceTrigger
    }

    /// Returns the command event for `input`, or `None` if it is blank.
    pub fn submit_command(&mut self, input: &str) -> Option<OutboundEvent> {
        let event = OutboundEvent::user_command(input)?;
        if let OutboundEvent::UserCommand { text } = &event {
            self.last_command = Some(text.clone());
        }
        Some(event)
    }
}
