//! Error types used by the gaugelink core.
//!
//! - [`ConnectError`]: failures of the connection lifecycle.
//! - [`GenerationError`]: a generation task could not continue.
//! - [`CommandQueueError`]: a command was submitted after shutdown.
//! - [`UiError`]: the UI execution context is gone.
//!
//! All of them provide `as_label` (stable snake_case label for logs/events).

use thiserror::Error;

/// # Errors produced by the connection lifecycle.
///
/// All variants are recoverable: the connection manager is left in a
/// well-defined state (`Idle` for every variant except `AlreadyConnecting`
/// and `InvalidState`, which leave the state untouched).
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectError {
    /// Neither the primary nor the fallback provider could be bound.
    #[error("no signal source provider available")]
    Unavailable,

    /// Another connection attempt is already in flight.
    #[error("connection attempt already in flight")]
    AlreadyConnecting,

    /// The requested transition is not permitted from the current state.
    #[error("invalid connection state for this operation")]
    InvalidState,

    /// The provider did not acknowledge the bind in time.
    #[error("timed out waiting for provider acknowledgement")]
    Timeout,
}

impl ConnectError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    ///
    /// # Example
    /// ```
    /// use gaugelink::ConnectError;
    ///
    /// assert_eq!(ConnectError::Timeout.as_label(), "connect_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConnectError::Unavailable => "connect_unavailable",
            ConnectError::AlreadyConnecting => "connect_already_connecting",
            ConnectError::InvalidState => "connect_invalid_state",
            ConnectError::Timeout => "connect_timeout",
        }
    }
}

/// # Errors produced by a generation task.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationError {
    /// The host of the signal source is gone; the task cannot continue.
    #[error("signal source provider died")]
    ProviderDied,
}

impl GenerationError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            GenerationError::ProviderDied => "generation_provider_died",
        }
    }
}

/// # Errors produced when submitting coordinator commands.
///
/// This is a lifecycle error on the caller side; it is returned, never absorbed.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandQueueError {
    /// The command intake is closed (coordinator stopped or never started).
    #[error("command queue closed")]
    Closed,

    /// The command queue is full (only returned by non-blocking submission).
    #[error("command queue full")]
    Full,
}

impl CommandQueueError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            CommandQueueError::Closed => "command_queue_closed",
            CommandQueueError::Full => "command_queue_full",
        }
    }
}

/// # Errors produced when switching to the UI execution context.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiError {
    /// The UI loop has terminated and no longer accepts jobs.
    #[error("ui context closed")]
    Closed,
}

impl UiError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            UiError::Closed => "ui_closed",
        }
    }
}
