//! # Realtime Module
//!
//! Everything one mounted view needs to stay in sync with the parking backend
//! over its `/ws` channel.
//!
//! ## Contained Modules:
//! - **`client`**: [`RealtimeSyncClient`], the connection lifecycle owner.
//! - **`state`**: the three-state [`ConnectionState`] machine.
//! - **`message`**: classification of inbound frames into snapshots,
//!   notifications, or noise.
//! - **`reconcile`**: routes classified messages through dedup into the log.
//! - **`dedup`**: the [`DedupWindow`] that keeps repeated violations quiet.
//! - **`inbox`**: the capped [`NotificationLog`] behind the bell UI.
//! - **`transport`**: the connector seam and its tokio-tungstenite implementation.
//! - **`endpoint`**: `{ws|wss}://<host>/ws` derivation from the page origin.
//! - **`view`**: [`OccupancyView`], the last known occupancy map.

/// The client that owns one live-update connection.
pub mod client;
/// Time-windowed suppression of repeated alerts.
pub mod dedup;
/// Realtime endpoint derivation.
pub mod endpoint;
/// Error types for the realtime layer.
pub mod error;
/// The capped notification log behind the inbox UI.
pub mod inbox;
/// Inbound payload types and classification.
pub mod message;
/// Message routing through dedup and into the log.
pub mod reconcile;
/// Connection state machine.
pub mod state;
/// Transport seam and the WebSocket implementation.
pub mod transport;
/// Occupancy view state.
pub mod view;

// --- Public API Re-exports ---
pub use client::{RealtimeSyncClient, SyncConfig};
pub use dedup::DedupWindow;
pub use endpoint::{ws_url_for_host, ws_url_for_origin};
pub use error::{Result, SyncError};
pub use inbox::{age_label, badge_label, LoggedNotification, NotificationLog};
pub use message::{
    InboundMessage, NotificationCategory, NotificationEvent, Reservation, SpotMap, SpotStatus,
};
pub use reconcile::{Reconciler, Routed};
pub use state::ConnectionState;
pub use transport::{Connector, Frame, Transport, WsConnector};
pub use view::OccupancyView;
