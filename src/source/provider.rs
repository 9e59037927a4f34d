//! # Provider binding.
//!
//! A [`Provider`] is one strategy for reaching a signal source. Binding is
//! two-phase, like a service bind on a platform with remote services:
//!
//! ```text
//! bind() ──► None                      (provider cannot be located / refuses)
//!        └─► Some(PendingBind)
//!              ├─ ack: acknowledge(source) ──► client becomes Connected
//!              │        dropped              ──► connection failure
//!              └─ link: kill()    (provider side, host terminated)
//!                       release() (client side, unbind)
//! ```

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::source::SignalSource;

/// A strategy for locating and binding a signal source.
///
/// `bind` must not block; the acknowledgement may arrive later from any task.
pub trait Provider: Send + Sync + 'static {
    /// Returns a stable, human-readable provider name.
    fn name(&self) -> &str;

    /// Starts binding. Returns `None` when the provider cannot be bound at all.
    fn bind(&self) -> Option<PendingBind>;
}

/// Liveness link shared by a provider and the client of one binding.
///
/// - `dead` is fired by the provider when its host terminates.
/// - `released` is fired by the client when it unbinds.
#[derive(Clone, Debug, Default)]
pub struct Link {
    dead: CancellationToken,
    released: CancellationToken,
}

impl Link {
    /// Creates a standalone link.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a link that dies together with `host`.
    pub fn child_of(host: &CancellationToken) -> Self {
        Self {
            dead: host.child_token(),
            released: CancellationToken::new(),
        }
    }

    /// Provider side: the host of this binding is gone.
    pub fn kill(&self) {
        self.dead.cancel();
    }

    /// Client side: the binding is no longer used.
    pub fn release(&self) {
        self.released.cancel();
    }

    pub fn is_dead(&self) -> bool {
        self.dead.is_cancelled()
    }

    pub fn is_released(&self) -> bool {
        self.released.is_cancelled()
    }

    /// Completes once the provider has killed the link.
    pub async fn died(&self) {
        self.dead.cancelled().await
    }

    /// Completes once the client has released the link.
    pub async fn released(&self) {
        self.released.cancelled().await
    }
}

/// A bind in progress: the acknowledgement receiver plus the liveness link.
#[derive(Debug)]
pub struct PendingBind {
    pub(crate) ack: oneshot::Receiver<Arc<dyn SignalSource>>,
    pub(crate) link: Link,
}

impl PendingBind {
    /// Creates a pending bind and the acknowledgement half kept by the provider.
    pub fn new(link: Link) -> (Self, BindAck) {
        let (tx, rx) = oneshot::channel();
        (Self { ack: rx, link }, BindAck { tx })
    }

    /// The liveness link of this binding.
    pub fn link(&self) -> &Link {
        &self.link
    }
}

/// Provider half of a [`PendingBind`].
///
/// Dropping it without calling [`acknowledge`](Self::acknowledge) refuses the bind.
#[derive(Debug)]
pub struct BindAck {
    tx: oneshot::Sender<Arc<dyn SignalSource>>,
}

impl BindAck {
    /// Delivers the bound source to the client.
    ///
    /// Returns `false` if the client already gave up waiting.
    pub fn acknowledge(self, source: Arc<dyn SignalSource>) -> bool {
        self.tx.send(source).is_ok()
    }
}
