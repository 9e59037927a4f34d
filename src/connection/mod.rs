//! Connection lifecycle: state machine, link handle, listener callbacks and the manager.

mod handle;
mod listener;
mod manager;
mod state;

pub use handle::ConnectionHandle;
pub use listener::{ConnectionListener, DisconnectReason};
pub use manager::ConnectionManager;
pub use state::ConnectionState;

pub(crate) use state::AtomicState;
