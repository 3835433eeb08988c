//! # msgbridge Events
//!
//! Event model for the msgbridge messaging backend:
//! - Device/session events (connection changes, messages, QR refresh,
//!   auth-state changes, errors, bans)
//! - Typed payloads with an opaque-JSON fallback for unrecognized events
//!
//! ## Example
//!
//! ```rust,ignore
//! use msgbridge_events::Event;
//!
//! let event = Event::from_wire(
//!     "message_received",
//!     serde_json::json!({"message_id": "m1", "from": "+15550001111"}),
//! )
//! .with_device("device-42");
//! ```

mod event;

pub use event::{
    AuthState, ConnectionUpdate, DeviceBanned, DeviceError, Event, EventData, EventKind,
    MessagePayload, QrCode, TestData,
};
