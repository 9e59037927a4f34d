use std::sync::Arc;

use crate::source::{Link, SignalSource};

/// A live link to a signal source, as returned by `connect()`.
///
/// Cheap to clone. It stays usable after the manager drops the link; sources
/// of a dead host fail with `ProviderDied` when opened.
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    pub(crate) id: u64,
    pub(crate) provider: Arc<str>,
    pub(crate) source: Arc<dyn SignalSource>,
    pub(crate) link: Link,
}

impl ConnectionHandle {
    /// Connection id, unique per manager.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Name of the provider that served this link.
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// The bound signal source.
    pub fn source(&self) -> &Arc<dyn SignalSource> {
        &self.source
    }

    /// False once the provider host died or the link was released.
    pub fn is_alive(&self) -> bool {
        !self.link.is_dead() && !self.link.is_released()
    }
}
