//! # ConnectionManager: lifecycle of the link to the signal source.
//!
//! ## Strategy
//! Providers are tried in order (primary first, then fallback). The first one
//! whose `bind()` succeeds is awaited for its acknowledgement; a later provider
//! is never tried once a bind was issued.
//!
//! ## Concurrency rules
//! - `connect()` while another attempt is in flight fails fast with
//!   `AlreadyConnecting`; while connected, with `InvalidState`.
//! - `disconnect()` while an attempt is in flight fails with `InvalidState`;
//!   while idle it is a no-op.
//! - The acknowledgement wait holds no lock; the in-flight attempt is modelled
//!   by the `AwaitingCallback` state.
//! - `Connected → Idle` happens exactly once per link, whether requested or
//!   caused by the provider dying, so `on_disconnected` fires exactly once.
//!
//! ## Cancellation
//! Dropping a `connect()` future mid-wait resets the state to `Idle` and
//! releases the pending link.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::connection::{
    AtomicState, ConnectionHandle, ConnectionListener, ConnectionState, DisconnectReason,
};
use crate::error::ConnectError;
use crate::source::{Link, PendingBind, Provider, SignalSource};

struct Inner {
    state: AtomicState,
    providers: Vec<Arc<dyn Provider>>,
    listener: Arc<dyn ConnectionListener>,
    active: Mutex<Option<ConnectionHandle>>,
    next_id: AtomicU64,
    connect_timeout: Option<Duration>,
}

/// Owns the connection state machine. Cheap to clone (shared inner state).
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    /// Creates an idle manager.
    ///
    /// - `providers`: binding strategies in priority order
    /// - `connect_timeout`: bound on the acknowledgement wait (`None` = unbounded)
    pub fn new(
        providers: Vec<Arc<dyn Provider>>,
        listener: Arc<dyn ConnectionListener>,
        connect_timeout: Option<Duration>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: AtomicState::new(ConnectionState::Idle),
                providers,
                listener,
                active: Mutex::new(None),
                next_id: AtomicU64::new(1),
                connect_timeout,
            }),
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.inner.state.load()
    }

    /// The live link, if connected.
    pub fn current(&self) -> Option<ConnectionHandle> {
        self.inner.active.lock().clone()
    }

    /// Establishes a link, falling back through the providers in order.
    ///
    /// ### Errors
    /// - `AlreadyConnecting`: another attempt is in flight (no callback)
    /// - `InvalidState`: already connected (no callback)
    /// - `Unavailable`: no provider could be bound, refused the bind or died
    ///   before acknowledging (`on_connection_failed`)
    /// - `Timeout`: no acknowledgement within the configured bound (`on_connection_failed`)
    pub async fn connect(&self) -> Result<ConnectionHandle, ConnectError> {
        use ConnectionState::*;
        let inner = &self.inner;

        if let Err(actual) = inner.state.transition(Idle, Connecting) {
            debug!(state = ?actual, "connect rejected");
            return Err(if actual.is_pending() {
                ConnectError::AlreadyConnecting
            } else {
                ConnectError::InvalidState
            });
        }

        let Some((provider, pending)) = inner.bind_first() else {
            warn!("no signal source provider could be bound");
            let _ = inner.state.transition(Connecting, Idle);
            inner.listener.on_connection_failed(ConnectError::Unavailable);
            return Err(ConnectError::Unavailable);
        };

        let PendingBind { ack, link } = pending;
        if inner.state.transition(Connecting, AwaitingCallback).is_err() {
            link.release();
            return Err(ConnectError::InvalidState);
        }

        let mut guard = PendingGuard {
            state: &inner.state,
            link: &link,
            armed: true,
        };
        let outcome = inner.await_ack(ack, &link).await;

        match outcome {
            Ok(source) => {
                let handle = ConnectionHandle {
                    id: inner.next_id.fetch_add(1, Ordering::Relaxed),
                    provider: Arc::from(provider.name()),
                    source,
                    link: link.clone(),
                };
                {
                    let mut active = inner.active.lock();
                    if inner.state.transition(AwaitingCallback, Connected).is_err() {
                        return Err(ConnectError::InvalidState);
                    }
                    *active = Some(handle.clone());
                }
                guard.armed = false;

                debug!(provider = %handle.provider, connection = handle.id, "connected");
                inner.listener.on_connected(&handle);
                self.watch(handle.id, link.clone());
                Ok(handle)
            }
            Err(err) => {
                warn!(provider = provider.name(), error = %err, "connection attempt failed");
                drop(guard);
                inner.listener.on_connection_failed(err);
                Err(err)
            }
        }
    }

    /// Drops the live link.
    ///
    /// No-op when idle; `InvalidState` while a connect attempt is in flight.
    pub fn disconnect(&self) -> Result<(), ConnectError> {
        let taken = {
            let mut active = self.inner.active.lock();
            match self.inner.state.load() {
                ConnectionState::Idle => None,
                ConnectionState::Connecting | ConnectionState::AwaitingCallback => {
                    debug!("disconnect rejected: connect in flight");
                    return Err(ConnectError::InvalidState);
                }
                ConnectionState::Connected => {
                    match self
                        .inner
                        .state
                        .transition(ConnectionState::Connected, ConnectionState::Idle)
                    {
                        Ok(()) => active.take(),
                        Err(_) => None,
                    }
                }
            }
        };

        match taken {
            Some(handle) => {
                debug!(connection = handle.id, "disconnecting");
                handle.link.release();
                self.inner
                    .listener
                    .on_disconnected(handle.id, DisconnectReason::Requested);
            }
            None => trace!("disconnect: not connected"),
        }
        Ok(())
    }

    /// Marks link `connection` as lost because its provider died.
    ///
    /// Returns `true` if this call performed the `Connected → Idle` transition.
    pub fn mark_lost(&self, connection: u64) -> bool {
        self.inner.on_provider_lost(connection)
    }

    /// Watches an established link for unsolicited termination.
    fn watch(&self, connection: u64, link: Link) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::select! {
                _ = link.released() => {}
                _ = link.died() => {
                    inner.on_provider_lost(connection);
                }
            }
        });
    }
}

impl Inner {
    fn bind_first(&self) -> Option<(&Arc<dyn Provider>, PendingBind)> {
        for provider in &self.providers {
            match provider.bind() {
                Some(pending) => {
                    trace!(provider = provider.name(), "bind issued");
                    return Some((provider, pending));
                }
                None => debug!(provider = provider.name(), "bind failed, trying next provider"),
            }
        }
        None
    }

    async fn await_ack(
        &self,
        ack: oneshot::Receiver<Arc<dyn SignalSource>>,
        link: &Link,
    ) -> Result<Arc<dyn SignalSource>, ConnectError> {
        let wait = async {
            tokio::select! {
                biased;
                _ = link.died() => Err(ConnectError::Unavailable),
                res = ack => res.map_err(|_| ConnectError::Unavailable),
            }
        };
        match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .unwrap_or(Err(ConnectError::Timeout)),
            None => wait.await,
        }
    }

    fn on_provider_lost(&self, connection: u64) -> bool {
        let taken = {
            let mut active = self.active.lock();
            match active.as_ref() {
                Some(h) if h.id == connection => {
                    match self
                        .state
                        .transition(ConnectionState::Connected, ConnectionState::Idle)
                    {
                        Ok(()) => active.take(),
                        Err(_) => None,
                    }
                }
                _ => None,
            }
        };

        match taken {
            Some(handle) => {
                warn!(provider = %handle.provider, connection, "provider died");
                handle.link.release();
                self.listener
                    .on_disconnected(connection, DisconnectReason::ProviderDied);
                true
            }
            None => false,
        }
    }
}

/// Resets `AwaitingCallback → Idle` unless disarmed.
struct PendingGuard<'a> {
    state: &'a AtomicState,
    link: &'a Link,
    armed: bool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.link.release();
            let _ = self
                .state
                .transition(ConnectionState::AwaitingCallback, ConnectionState::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::source::{BindAck, LocalProvider, ProviderHost};

    #[derive(Default)]
    struct Counting {
        connected: AtomicUsize,
        failed: Mutex<Vec<ConnectError>>,
        disconnected: Mutex<Vec<(u64, DisconnectReason)>>,
    }

    impl ConnectionListener for Counting {
        fn on_connected(&self, _handle: &ConnectionHandle) {
            self.connected.fetch_add(1, Ordering::SeqCst);
        }

        fn on_connection_failed(&self, error: ConnectError) {
            self.failed.lock().push(error);
        }

        fn on_disconnected(&self, connection: u64, reason: DisconnectReason) {
            self.disconnected.lock().push((connection, reason));
        }
    }

    /// Provider that never binds.
    struct Missing;

    impl Provider for Missing {
        fn name(&self) -> &str {
            "missing"
        }

        fn bind(&self) -> Option<PendingBind> {
            None
        }
    }

    /// Provider that binds and parks the acknowledgement for the test to drive.
    #[derive(Default)]
    struct Parked {
        acks: Mutex<Vec<BindAck>>,
    }

    impl Provider for Parked {
        fn name(&self) -> &str {
            "parked"
        }

        fn bind(&self) -> Option<PendingBind> {
            let (pending, ack) = PendingBind::new(Link::new());
            self.acks.lock().push(ack);
            Some(pending)
        }
    }

    fn manager(
        providers: Vec<Arc<dyn Provider>>,
        timeout: Option<Duration>,
    ) -> (ConnectionManager, Arc<Counting>) {
        let listener = Arc::new(Counting::default());
        (
            ConnectionManager::new(providers, listener.clone(), timeout),
            listener,
        )
    }

    #[tokio::test]
    async fn falls_back_when_primary_is_missing() {
        let (mgr, listener) = manager(vec![Arc::new(Missing), LocalProvider::arc()], None);

        let handle = mgr.connect().await.expect("fallback connects");
        assert_eq!(handle.provider(), "local");
        assert_eq!(mgr.state(), ConnectionState::Connected);
        assert_eq!(listener.connected.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unavailable_when_no_provider_binds() {
        let (mgr, listener) = manager(vec![Arc::new(Missing), Arc::new(Missing)], None);

        assert_eq!(mgr.connect().await.unwrap_err(), ConnectError::Unavailable);
        assert_eq!(mgr.state(), ConnectionState::Idle);
        assert_eq!(*listener.failed.lock(), vec![ConnectError::Unavailable]);
    }

    #[tokio::test]
    async fn second_caller_fails_fast_while_pending() {
        let parked = Arc::new(Parked::default());
        let (mgr, _listener) = manager(vec![parked.clone()], None);

        let first = tokio::spawn({
            let mgr = mgr.clone();
            async move { mgr.connect().await }
        });
        while mgr.state() != ConnectionState::AwaitingCallback {
            tokio::task::yield_now().await;
        }

        assert_eq!(
            mgr.connect().await.unwrap_err(),
            ConnectError::AlreadyConnecting
        );
        assert_eq!(mgr.disconnect(), Err(ConnectError::InvalidState));

        let ack = parked.acks.lock().pop().expect("parked ack");
        assert!(ack.acknowledge(Arc::new(Flat)));
        let handle = first.await.expect("join").expect("connected");
        assert_eq!(handle.provider(), "parked");
        assert_eq!(mgr.connect().await.unwrap_err(), ConnectError::InvalidState);
    }

    #[tokio::test]
    async fn refused_bind_is_unavailable() {
        let parked = Arc::new(Parked::default());
        let (mgr, listener) = manager(vec![parked.clone()], None);

        let attempt = tokio::spawn({
            let mgr = mgr.clone();
            async move { mgr.connect().await }
        });
        while parked.acks.lock().is_empty() {
            tokio::task::yield_now().await;
        }
        parked.acks.lock().clear();

        assert_eq!(
            attempt.await.expect("join").unwrap_err(),
            ConnectError::Unavailable
        );
        assert_eq!(mgr.state(), ConnectionState::Idle);
        assert_eq!(*listener.failed.lock(), vec![ConnectError::Unavailable]);
    }

    #[tokio::test(start_paused = true)]
    async fn ack_wait_is_bounded() {
        let parked = Arc::new(Parked::default());
        let (mgr, listener) = manager(vec![parked.clone()], Some(Duration::from_secs(5)));

        assert_eq!(mgr.connect().await.unwrap_err(), ConnectError::Timeout);
        assert_eq!(mgr.state(), ConnectionState::Idle);
        assert_eq!(*listener.failed.lock(), vec![ConnectError::Timeout]);
        assert_eq!(listener.connected.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dropped_connect_resets_to_idle() {
        let parked = Arc::new(Parked::default());
        let (mgr, _listener) = manager(vec![parked.clone()], None);

        let attempt = tokio::spawn({
            let mgr = mgr.clone();
            async move { mgr.connect().await }
        });
        while mgr.state() != ConnectionState::AwaitingCallback {
            tokio::task::yield_now().await;
        }
        attempt.abort();
        let _ = attempt.await;

        assert_eq!(mgr.state(), ConnectionState::Idle);
        let acks = std::mem::take(&mut *parked.acks.lock());
        assert!(acks.into_iter().all(|ack| !ack.acknowledge(Arc::new(Flat))));
    }

    #[tokio::test]
    async fn disconnect_fires_once() {
        let (mgr, listener) = manager(vec![LocalProvider::arc()], None);
        let handle = mgr.connect().await.expect("connect");

        assert_eq!(mgr.disconnect(), Ok(()));
        assert_eq!(mgr.disconnect(), Ok(()));

        assert_eq!(mgr.state(), ConnectionState::Idle);
        assert!(mgr.current().is_none());
        assert!(!handle.is_alive());
        assert_eq!(
            *listener.disconnected.lock(),
            vec![(handle.id(), DisconnectReason::Requested)]
        );
    }

    #[tokio::test]
    async fn provider_death_returns_to_idle_and_allows_reconnect() {
        let host = ProviderHost::new("hosted");
        let (mgr, listener) = manager(vec![host.provider()], None);
        let first = mgr.connect().await.expect("connect");

        host.kill();
        while mgr.state() != ConnectionState::Idle {
            tokio::task::yield_now().await;
        }
        assert!(!mgr.mark_lost(first.id()));
        assert_eq!(mgr.disconnect(), Ok(()));
        assert_eq!(
            *listener.disconnected.lock(),
            vec![(first.id(), DisconnectReason::ProviderDied)]
        );

        host.revive();
        let second = mgr.connect().await.expect("reconnect");
        assert_ne!(second.id(), first.id());
        assert_eq!(listener.connected.load(Ordering::SeqCst), 2);
    }

    /// Source that never yields.
    struct Flat;

    impl SignalSource for Flat {
        fn name(&self) -> &str {
            "flat"
        }

        fn open(&self, _max_value: f32) -> Result<crate::source::SampleStream, crate::GenerationError> {
            Ok(Box::pin(futures::stream::pending()))
        }
    }
}
