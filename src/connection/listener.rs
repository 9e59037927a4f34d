use crate::connection::ConnectionHandle;
use crate::error::ConnectError;

/// Why a live link went back to idle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    /// `disconnect()` was called.
    Requested,
    /// The provider host terminated without being asked to.
    ProviderDied,
}

/// Callbacks invoked by [`ConnectionManager`](crate::ConnectionManager), once per transition.
///
/// Callbacks run on the task that caused the transition and must not block.
pub trait ConnectionListener: Send + Sync + 'static {
    /// `AwaitingCallback → Connected`.
    fn on_connected(&self, handle: &ConnectionHandle);

    /// A started attempt ended without a link (`Unavailable` or `Timeout`).
    fn on_connection_failed(&self, error: ConnectError);

    /// `Connected → Idle`.
    fn on_disconnected(&self, connection: u64, reason: DisconnectReason);
}
