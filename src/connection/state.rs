//! # Connection state machine.
//!
//! ```text
//! Idle ──connect──► Connecting ──bind ok──► AwaitingCallback ──ack──► Connected
//!  ▲                    │                         │                      │
//!  └──── no provider ───┘◄── timeout / refused ───┘◄─ disconnect / died ─┘
//! ```
//!
//! Every transition is a single compare-and-set on an [`AtomicU8`]; a caller
//! that loses the race observes the actual state and fails.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of the link to the signal source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// No link and no attempt in flight.
    Idle = 0,
    /// Resolving a provider and issuing the bind.
    Connecting = 1,
    /// Bind issued; waiting for the provider acknowledgement.
    AwaitingCallback = 2,
    /// Link is live.
    Connected = 3,
}

impl ConnectionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ConnectionState::Idle,
            1 => ConnectionState::Connecting,
            2 => ConnectionState::AwaitingCallback,
            _ => ConnectionState::Connected,
        }
    }

    /// True while a connect attempt is in flight.
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::AwaitingCallback
        )
    }
}

/// Atomic cell holding a [`ConnectionState`].
#[derive(Debug)]
pub(crate) struct AtomicState(AtomicU8);

impl AtomicState {
    pub(crate) fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub(crate) fn load(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves `from → to`; on failure returns the state actually observed.
    pub(crate) fn transition(
        &self,
        from: ConnectionState,
        to: ConnectionState,
    ) -> Result<(), ConnectionState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(ConnectionState::from_u8)
    }
}
