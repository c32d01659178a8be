//! # lib_parksync
//!
//! Client-side synchronisation for the parking dashboard and mobile app.
//!
//! The library keeps one live-update channel per mounted view, turns the
//! backend's pushes into typed occupancy snapshots and notifications, and
//! makes sure a single real-world violation never pops up twice within the
//! dedup window.
//!
//! ## Feature gates
//! - **`realtime`** (default): [`realtime::RealtimeSyncClient`] and the
//!   types it owns.
//! - **`retrieve`**: REST collaborators for the notification inbox
//!   (list, mark-as-read, mark-all-read, clear).
//! - **`full`**: everything.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Live-update channel, message classification, alert dedup and the inbox log.
#[cfg(feature = "realtime")]
pub mod realtime;
/// HTTP collaborators with retry middleware.
#[cfg(feature = "retrieve")]
pub mod retrieve;

#[cfg(feature = "realtime")]
pub use realtime::{
    ConnectionState, NotificationCategory, NotificationEvent, NotificationLog,
    RealtimeSyncClient, SpotMap, SpotStatus, SyncConfig, SyncError,
};
