//! Event types and structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A discrete occurrence in the messaging backend that is eligible for
/// webhook notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier for this event instance.
    pub id: String,
    /// The event kind (wire name).
    pub kind: EventKind,
    /// Device the event originated from, if any.
    pub device_id: Option<String>,
    /// Timestamp when the event occurred.
    pub occurred_at: DateTime<Utc>,
    /// Event-specific payload.
    pub data: EventData,
}

impl Event {
    /// Creates a new event with the given kind and payload.
    pub fn new(kind: EventKind, data: EventData) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            device_id: None,
            occurred_at: Utc::now(),
            data,
        }
    }

    /// Creates an event from a wire name and an arbitrary JSON payload.
    ///
    /// Recognized names get their typed payload when the JSON matches;
    /// anything else is carried as an opaque payload.
    pub fn from_wire(name: impl AsRef<str>, payload: Value) -> Self {
        let kind = EventKind::from_wire(name.as_ref());
        let data = EventData::from_wire(&kind, payload);
        Self::new(kind, data)
    }

    /// Sets the originating device.
    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Sets the occurrence timestamp.
    pub fn with_occurred_at(mut self, at: DateTime<Utc>) -> Self {
        self.occurred_at = at;
        self
    }

    /// Returns the wire name for this event.
    pub fn wire_name(&self) -> &str {
        self.kind.wire_name()
    }

    /// Returns the event-specific fields as a JSON object, for merging into
    /// the transport payload.
    pub fn payload_fields(&self) -> Value {
        self.data.to_fields()
    }
}

/// The kinds of events crossing the webhook boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ConnectionUpdate,
    MessageReceived,
    MessageSent,
    QrCode,
    AuthState,
    DeviceError,
    DeviceBanned,
    WebhookTest,
    /// Unrecognized event name, kept verbatim for forward compatibility.
    #[serde(untagged)]
    Other(String),
}

impl EventKind {
    /// Parses a wire event name.
    pub fn from_wire(name: &str) -> Self {
        match name {
            "connection_update" => EventKind::ConnectionUpdate,
            "message_received" => EventKind::MessageReceived,
            "message_sent" => EventKind::MessageSent,
            "qr_code" => EventKind::QrCode,
            "auth_state" => EventKind::AuthState,
            "device_error" => EventKind::DeviceError,
            "device_banned" => EventKind::DeviceBanned,
            "webhook_test" => EventKind::WebhookTest,
            other => EventKind::Other(other.to_string()),
        }
    }

    /// Returns the wire name.
    pub fn wire_name(&self) -> &str {
        match self {
            EventKind::ConnectionUpdate => "connection_update",
            EventKind::MessageReceived => "message_received",
            EventKind::MessageSent => "message_sent",
            EventKind::QrCode => "qr_code",
            EventKind::AuthState => "auth_state",
            EventKind::DeviceError => "device_error",
            EventKind::DeviceBanned => "device_banned",
            EventKind::WebhookTest => "webhook_test",
            EventKind::Other(name) => name,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Event-specific payload, keyed by event kind.
///
/// Unrecognized shapes fall back to [`EventData::Opaque`] so new backend
/// event types flow through the engine without a schema change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventData {
    Connection(ConnectionUpdate),
    Message(MessagePayload),
    Qr(QrCode),
    Auth(AuthState),
    Error(DeviceError),
    Banned(DeviceBanned),
    Test(TestData),
    Opaque(Value),
}

impl EventData {
    /// Builds typed data for a recognized kind, falling back to opaque JSON
    /// when the payload does not match the expected shape.
    pub fn from_wire(kind: &EventKind, payload: Value) -> Self {
        fn parse<T: for<'de> Deserialize<'de>>(v: &Value) -> Option<T> {
            serde_json::from_value(v.clone()).ok()
        }

        let typed = match kind {
            EventKind::ConnectionUpdate => parse(&payload).map(EventData::Connection),
            EventKind::MessageReceived | EventKind::MessageSent => {
                parse(&payload).map(EventData::Message)
            }
            EventKind::QrCode => parse(&payload).map(EventData::Qr),
            EventKind::AuthState => parse(&payload).map(EventData::Auth),
            EventKind::DeviceError => parse(&payload).map(EventData::Error),
            EventKind::DeviceBanned => parse(&payload).map(EventData::Banned),
            EventKind::WebhookTest => parse(&payload).map(EventData::Test),
            EventKind::Other(_) => None,
        };

        typed.unwrap_or(EventData::Opaque(payload))
    }

    /// Serializes the payload to a JSON object for the transport body.
    ///
    /// Non-object payloads are wrapped under a `data` key so the body stays
    /// a flat object.
    pub fn to_fields(&self) -> Value {
        let value = serde_json::to_value(self).unwrap_or(Value::Null);
        match value {
            Value::Object(_) => value,
            other => serde_json::json!({ "data": other }),
        }
    }
}

/// Connection state change for a device session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionUpdate {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// An inbound or outbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// A refreshed pairing QR code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrCode {
    pub qr: String,
}

/// Authentication state change for a device session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthState {
    pub state: String,
}

/// An error raised by a device session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceError {
    pub message: String,
}

/// A device banned by the upstream network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceBanned {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Sample payload carried by test deliveries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestData {
    pub test_data: Value,
}
