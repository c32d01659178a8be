//! # Inbound Messages
//!
//! The `/ws` channel carries two payload shapes, both JSON text frames:
//!
//! - **State snapshot**: a top-level object keyed by spot id, with no `type`
//!   key. It fully replaces the client's view of occupancy.
//! - **Notification event**: `{"type": "notification", "data": {...}}`.
//!
//! Anything else on the channel (other `type`s, non-JSON, binary frames) is
//! classified as [`InboundMessage::Unknown`] and dropped by the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The `type` tag that marks a notification event.
pub const NOTIFICATION_TAG: &str = "notification";

/// Occupancy keyed by spot id, iterated in spot-name order.
pub type SpotMap = BTreeMap<String, SpotStatus>;

/// Reservation attached to a spot in a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reservation {
    /// Unix seconds at which the reservation lapses.
    pub expires_at: Option<f64>,
    /// Plate the spot is reserved for.
    pub plate: Option<String>,
}

impl Reservation {
    /// `expires_at` as a UTC timestamp.
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        let secs = self.expires_at?;
        DateTime::from_timestamp(secs.trunc() as i64, (secs.fract() * 1e9) as u32)
    }
}

/// Status of a single spot.
///
/// Every field is optional on the wire; missing flags read as `false`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotStatus {
    /// A vehicle is detected in the spot.
    pub occupied: bool,
    /// The spot is reserved (statically or by an active reservation).
    pub reserved: bool,
    /// The detected plate is not allowed in this spot.
    pub violation: bool,
    /// Last recognised plate, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plate: Option<String>,
    /// Occupancy classifier probability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prob: Option<f64>,
    /// Plates allowed to park here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorized: Option<Vec<String>>,
    /// Active reservation, if one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation: Option<Reservation>,
    /// OCR confidence of `plate`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plate_conf: Option<f64>,
    /// Unix seconds at which `plate` was read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plate_timestamp: Option<f64>,
}

/// Category of a notification, from its `notification_type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    /// An unauthorised vehicle was detected in a spot.
    ViolationAlert,
    /// A reserved spot was taken by someone else.
    ReservationViolation,
    /// A fine was issued.
    Fine,
    /// A payment went through.
    Payment,
    /// Anything the client does not know about.
    #[default]
    #[serde(other)]
    Other,
}

impl NotificationCategory {
    /// Alertable categories go through the dedup window before surfacing.
    pub fn is_alertable(self) -> bool {
        matches!(
            self,
            NotificationCategory::ViolationAlert | NotificationCategory::ReservationViolation
        )
    }

    /// Single-character icon used by the inbox list.
    pub fn icon(self) -> char {
        match self {
            NotificationCategory::ViolationAlert | NotificationCategory::ReservationViolation => '!',
            NotificationCategory::Fine | NotificationCategory::Payment => '$',
            NotificationCategory::Other => 'i',
        }
    }
}

/// Payload of a `{"type": "notification"}` message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationEvent {
    /// Headline.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Wire name `notification_type`.
    #[serde(rename = "notification_type")]
    pub category: NotificationCategory,
    /// Spot the event is about.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spot: Option<String>,
    /// Plate of the offending vehicle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intruder_plate: Option<String>,
    /// ISO-8601 event time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Backend fields this client does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NotificationEvent {
    /// Dedup key: identifies the real-world thing the event is about
    /// (spot + plate), not the message itself.
    pub fn subject_key(&self) -> String {
        format!(
            "{}-{}",
            self.spot.as_deref().unwrap_or_default(),
            self.intruder_plate.as_deref().unwrap_or_default()
        )
    }

    /// Tag for desktop notifications, so the OS replaces rather than stacks
    /// alerts about the same spot.
    pub fn alert_tag(&self) -> String {
        format!("violation-{}", self.spot.as_deref().unwrap_or_default())
    }

    /// `timestamp` parsed as RFC 3339.
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.timestamp.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }
}

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Full occupancy state.
    Snapshot(SpotMap),
    /// A discrete notification.
    Notification(NotificationEvent),
    /// Not for this consumer.
    Unknown,
}

impl InboundMessage {
    /// Classifies a text frame. Never fails: unparseable input is `Unknown`.
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Self::from_value(value),
            Err(_) => InboundMessage::Unknown,
        }
    }

    /// Classifies an already-decoded JSON value.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut object) = value else {
            return InboundMessage::Unknown;
        };

        // A `type` key, whatever its value, rules out the snapshot shape.
        if let Some(tag) = object.remove("type") {
            if tag.as_str() != Some(NOTIFICATION_TAG) {
                return InboundMessage::Unknown;
            }
            return match object.remove("data") {
                Some(data @ Value::Object(_)) => serde_json::from_value(data)
                    .map(InboundMessage::Notification)
                    .unwrap_or(InboundMessage::Unknown),
                _ => InboundMessage::Unknown,
            };
        }

        serde_json::from_value::<SpotMap>(Value::Object(object))
            .map(InboundMessage::Snapshot)
            .unwrap_or(InboundMessage::Unknown)
    }
}
