//! # Retrieval Module
//!
//! REST collaborators that sit next to the live channel.
//!
//! ## Contained Modules:
//!
//! - **`ky_http`**: a generic `ApiClient` on `reqwest` + `reqwest-middleware`
//!   with exponential-backoff retries and Bearer authentication.
//! - **`notifications`**: the notification inbox endpoints (list, mark one
//!   read, mark all read, clear) and the conversion of stored rows into
//!   [`crate::realtime::LoggedNotification`] entries for backfill.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Generic HTTP API client with retry middleware.
pub mod ky_http;
/// Notification inbox endpoints.
pub mod notifications;

pub use ky_http::{ApiClient, ApiResponse};
pub use notifications::{NotificationsApi, RetrieveError, StoredNotification};
