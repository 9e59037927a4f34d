//! # LogWriter: renders lifecycle events through `tracing`
//!
//! ## Example output
//! ```text
//! INFO  connected provider="hosted" connection=1
//! WARN  subscription dropped max_value=180.0 reason="not_connected"
//! WARN  provider lost provider="hosted" connection=1
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let provider = e.provider.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::Connecting => debug!(seq = e.seq, "connecting"),
            EventKind::Connected => {
                info!(seq = e.seq, provider, connection = ?e.connection, "connected")
            }
            EventKind::ConnectionFailed => warn!(seq = e.seq, reason, "connection failed"),
            EventKind::Disconnected => {
                info!(seq = e.seq, connection = ?e.connection, "disconnected")
            }
            EventKind::ProviderLost => {
                warn!(seq = e.seq, provider, connection = ?e.connection, "provider lost")
            }
            EventKind::Subscribed => info!(
                seq = e.seq,
                max_value = ?e.max_value,
                generation = ?e.generation,
                "subscribed"
            ),
            EventKind::SubscriptionDropped => {
                warn!(seq = e.seq, max_value = ?e.max_value, reason, "subscription dropped")
            }
            EventKind::Unsubscribed => debug!(seq = e.seq, "unsubscribed"),
            EventKind::GenerationFailed => {
                warn!(seq = e.seq, generation = ?e.generation, reason, "generation failed")
            }
            EventKind::ShutdownRequested => info!(seq = e.seq, "shutdown requested"),
            EventKind::ShutdownComplete => info!(seq = e.seq, "shutdown complete"),
            EventKind::SubscriberOverflow => {
                warn!(seq = e.seq, subscriber = provider, reason, "subscriber overflow")
            }
            EventKind::SubscriberPanicked => {
                warn!(seq = e.seq, subscriber = provider, reason, "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
