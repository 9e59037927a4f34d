//! # Lifecycle events emitted by the coordinator and its collaborators.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Connection events**: bind attempts and link transitions
//! - **Subscription events**: generation tasks started, replaced, stopped or failed
//! - **Runtime events**: shutdown and subscriber health
//!
//! The [`Event`] struct carries optional metadata such as the provider name,
//! connection id, generation id and max value.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use gaugelink::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::Subscribed)
//!     .with_max_value(180.0)
//!     .with_generation(3);
//!
//! assert_eq!(ev.kind, EventKind::Subscribed);
//! assert_eq!(ev.max_value, Some(180.0));
//! assert_eq!(ev.generation, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Connection events ===
    /// A connection attempt started.
    ///
    /// Sets:
    /// - `at`, `seq`
    Connecting,

    /// The provider acknowledged the bind; the link is live.
    ///
    /// Sets:
    /// - `provider`: provider name
    /// - `connection`: connection id
    Connected,

    /// A connection attempt failed.
    ///
    /// Sets:
    /// - `reason`: error label
    ConnectionFailed,

    /// The link went from connected to idle (requested or unsolicited).
    ///
    /// Sets:
    /// - `connection`: connection id
    Disconnected,

    /// The provider hosting the signal source terminated unexpectedly.
    ///
    /// Sets:
    /// - `provider`: provider name
    /// - `connection`: connection id
    ProviderLost,

    // === Subscription events ===
    /// A generation task was started for a new subscription.
    ///
    /// Sets:
    /// - `max_value`: subscription parameter
    /// - `generation`: generation id
    Subscribed,

    /// A subscribe request was dropped because no connection was available.
    ///
    /// Sets:
    /// - `max_value`: requested parameter
    SubscriptionDropped,

    /// The active subscription was stopped.
    Unsubscribed,

    /// A generation task terminated with an error.
    ///
    /// Sets:
    /// - `generation`: generation id
    /// - `reason`: error label
    GenerationFailed,

    // === Runtime events ===
    /// Coordinator shutdown requested.
    ShutdownRequested,

    /// Coordinator shutdown finished (generation and link torn down).
    ShutdownComplete,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `provider`: subscriber name
    /// - `reason`: "full" or "closed"
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `provider`: subscriber name
    /// - `reason`: panic info
    SubscriberPanicked,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Provider (or subscriber) name, if applicable.
    pub provider: Option<Arc<str>>,
    /// Connection id, if applicable.
    pub connection: Option<u64>,
    /// Generation id, if applicable.
    pub generation: Option<u64>,
    /// Subscription max value, if applicable.
    pub max_value: Option<f32>,
    /// Human-readable reason (error labels, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            provider: None,
            connection: None,
            generation: None,
            max_value: None,
            reason: None,
        }
    }

    /// Attaches a provider name.
    #[inline]
    pub fn with_provider(mut self, name: impl Into<Arc<str>>) -> Self {
        self.provider = Some(name.into());
        self
    }

    /// Attaches a connection id.
    #[inline]
    pub fn with_connection(mut self, id: u64) -> Self {
        self.connection = Some(id);
        self
    }

    /// Attaches a generation id.
    #[inline]
    pub fn with_generation(mut self, id: u64) -> Self {
        self.generation = Some(id);
        self
    }

    /// Attaches a subscription max value.
    #[inline]
    pub fn with_max_value(mut self, max_value: f32) -> Self {
        self.max_value = Some(max_value);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_provider(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_provider(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
