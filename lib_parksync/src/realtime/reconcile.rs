//! # Reconciler
//!
//! Decides what a classified message means for the view:
//!
//! 1. Snapshots pass straight through, unfiltered.
//! 2. Alertable notifications consult the [`DedupWindow`] by subject key.
//!    A suppressed event is still logged but does not surface.
//! 3. Other categories always surface.
//! 4. Every notification is logged, whatever the dedup outcome.
//!
//! The reconciler holds no connection state; the client runs it once per
//! inbound frame, in arrival order.

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use super::dedup::DedupWindow;
use super::inbox::NotificationLog;
use super::message::{InboundMessage, NotificationEvent, SpotMap};

/// Outcome of routing one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    /// Replace the occupancy view with this map.
    Snapshot(SpotMap),
    /// Logged and surfaced as a visible alert.
    Alert(NotificationEvent),
    /// Logged only; a recent alert already covers this subject.
    Suppressed {
        /// The subject key that was still inside its window.
        subject_key: String,
    },
    /// Noise on the channel.
    Ignored,
}

/// Per-client routing state.
#[derive(Debug, Default)]
pub struct Reconciler {
    dedup: DedupWindow,
}

impl Reconciler {
    /// Creates a reconciler around an existing dedup window.
    pub fn new(dedup: DedupWindow) -> Self {
        Self { dedup }
    }

    /// Routes `message`, recording notifications into `log`.
    ///
    /// `now` drives dedup expiry; `received_at` stamps log entries whose
    /// event carries no timestamp.
    pub fn route(
        &mut self,
        message: InboundMessage,
        log: &mut NotificationLog,
        now: Instant,
        received_at: DateTime<Utc>,
    ) -> Routed {
        match message {
            InboundMessage::Snapshot(spots) => Routed::Snapshot(spots),
            InboundMessage::Notification(event) => self.route_notification(event, log, now, received_at),
            InboundMessage::Unknown => Routed::Ignored,
        }
    }

    /// Read access to the dedup window.
    pub fn dedup(&self) -> &DedupWindow {
        &self.dedup
    }

    fn route_notification(
        &mut self,
        event: NotificationEvent,
        log: &mut NotificationLog,
        now: Instant,
        received_at: DateTime<Utc>,
    ) -> Routed {
        if event.category.is_alertable() {
            let subject_key = event.subject_key();
            if !self.dedup.admit(&subject_key, now) {
                log.record(event, false, received_at);
                return Routed::Suppressed { subject_key };
            }
        }
        log.record(event.clone(), true, received_at);
        Routed::Alert(event)
    }
}
