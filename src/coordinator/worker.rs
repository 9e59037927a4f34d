//! # Worker: the single consumer of coordinator commands.
//!
//! Owns every piece of mutable lifecycle state (live link, subscription) and
//! processes one input at a time:
//!
//! ```text
//! loop (biased):
//!   ├─ fault notice  ─► GenerationFailed, stop session, mark link lost
//!   ├─ lost link     ─► drop link, stop session
//!   └─ command       ─► handle(cmd) to completion (including replace's join)
//! on intake closed:  stop session, disconnect
//! ```
//!
//! Notices take priority over commands so a subscribe is never bound to a link
//! the worker already knows to be dead.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::coordinator::Command;
use crate::connection::{ConnectionHandle, ConnectionManager};
use crate::dispatch::LastValue;
use crate::error::ConnectError;
use crate::events::{Bus, Event, EventKind};
use crate::session::{GenerationFault, SampleListener, SignalSession};

/// The current pairing of a max value with a generation task.
///
/// A subscription becomes inactive when its generation fails or its link is
/// lost. It stays visible (inactive) until the next subscribe or unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Subscription {
    max_value: f32,
    active: bool,
    generation: u64,
}

impl Subscription {
    pub fn max_value(&self) -> f32 {
        self.max_value
    }

    /// True while the generation task is expected to deliver values.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Subscription status written by the worker, read by the coordinator.
pub(crate) type SharedSubscription = Arc<RwLock<Option<Subscription>>>;

pub(crate) struct Worker {
    connections: ConnectionManager,
    session: SignalSession,
    faults: mpsc::UnboundedReceiver<GenerationFault>,
    lost: mpsc::UnboundedReceiver<u64>,
    link: Option<ConnectionHandle>,
    subscription: SharedSubscription,
    last_value: Arc<LastValue>,
    bus: Bus,
}

impl Worker {
    pub(crate) fn new(
        connections: ConnectionManager,
        lost: mpsc::UnboundedReceiver<u64>,
        subscription: SharedSubscription,
        last_value: Arc<LastValue>,
        bus: Bus,
    ) -> Self {
        let (session, faults) = SignalSession::new();
        Self {
            connections,
            session,
            faults,
            lost,
            link: None,
            subscription,
            last_value,
            bus,
        }
    }

    /// Processes commands until the intake is closed and drained.
    pub(crate) async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        debug!("coordinator worker started");
        loop {
            tokio::select! {
                biased;
                Some(fault) = self.faults.recv() => self.on_fault(fault).await,
                Some(connection) = self.lost.recv() => self.on_link_lost(connection).await,
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.handle(cmd).await,
                    None => break,
                },
            }
        }

        self.session.stop().await;
        if let Err(e) = self.connections.disconnect() {
            warn!(error = %e, "disconnect on worker exit failed");
        }
        debug!("coordinator worker stopped");
    }

    async fn handle(&mut self, cmd: Command) {
        debug!(command = cmd.label(), "processing command");
        match cmd {
            Command::ConnectService => self.connect().await,
            Command::SubscribeDataSource { max_value } => self.subscribe(max_value).await,
            Command::UnsubscribeDataSource => self.unsubscribe().await,
            Command::DisconnectService { done } => {
                self.disconnect().await;
                let _ = done.send(());
            }
        }
    }

    async fn connect(&mut self) {
        self.bus.publish(Event::new(EventKind::Connecting));
        match self.connections.connect().await {
            Ok(handle) => {
                info!(provider = handle.provider(), connection = handle.id(), "service connected");
                self.link = Some(handle);
            }
            Err(ConnectError::InvalidState) => debug!("connect ignored: already connected"),
            Err(e) => warn!(error = %e, "connect failed; staying disconnected"),
        }
    }

    async fn subscribe(&mut self, max_value: f32) {
        let Some(link) = self.link.as_ref().filter(|l| l.is_alive()) else {
            warn!(max_value, "subscribe dropped: not connected");
            self.bus.publish(
                Event::new(EventKind::SubscriptionDropped)
                    .with_max_value(max_value)
                    .with_reason("not_connected"),
            );
            return;
        };
        let source = Arc::clone(link.source());

        let epoch = self.last_value.begin_epoch();
        let cell = Arc::clone(&self.last_value);
        let listener: SampleListener = Arc::new(move |v| cell.store(epoch, v));

        let generation = self.session.replace(&source, max_value, listener).await;
        *self.subscription.write() = Some(Subscription {
            max_value,
            active: true,
            generation,
        });
        self.bus.publish(
            Event::new(EventKind::Subscribed)
                .with_max_value(max_value)
                .with_generation(generation),
        );
    }

    async fn unsubscribe(&mut self) {
        self.session.stop().await;
        let discarded = self.subscription.write().take();
        if let Some(sub) = discarded {
            debug!(generation = sub.generation, active = sub.active, "subscription discarded");
            self.bus.publish(
                Event::new(EventKind::Unsubscribed)
                    .with_max_value(sub.max_value)
                    .with_generation(sub.generation),
            );
        }
    }

    async fn disconnect(&mut self) {
        self.unsubscribe().await;
        match self.connections.disconnect() {
            Ok(()) => {}
            Err(e) => warn!(error = %e, "disconnect rejected"),
        }
        self.link = None;
    }

    async fn on_fault(&mut self, fault: GenerationFault) {
        let current = (*self.subscription.read())
            .is_some_and(|s| s.active && s.generation == fault.generation);
        if !current {
            debug!(generation = fault.generation, "ignoring fault of superseded generation");
            return;
        }

        warn!(generation = fault.generation, error = %fault.error, "generation failed");
        self.bus.publish(
            Event::new(EventKind::GenerationFailed)
                .with_generation(fault.generation)
                .with_max_value(fault.max_value)
                .with_reason(fault.error.as_label()),
        );
        self.deactivate().await;
        if let Some(link) = self.link.take() {
            self.connections.mark_lost(link.id());
        }
    }

    async fn on_link_lost(&mut self, connection: u64) {
        if self.link.as_ref().is_none_or(|l| l.id() != connection) {
            return;
        }
        warn!(connection, "link lost; subscription stopped");
        self.link = None;
        self.deactivate().await;
    }

    async fn deactivate(&mut self) {
        self.session.stop().await;
        if let Some(sub) = self.subscription.write().as_mut() {
            sub.active = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast;

    use super::*;
    use crate::connection::ConnectionState;
    use crate::coordinator::notifier::Notifier;
    use crate::error::GenerationError;
    use crate::source::LocalProvider;

    fn worker() -> (Worker, ConnectionManager, SharedSubscription, broadcast::Receiver<Event>) {
        let bus = Bus::new(64);
        let rx = bus.subscribe();
        let (lost_tx, lost_rx) = mpsc::unbounded_channel();
        let connections = ConnectionManager::new(
            vec![LocalProvider::arc()],
            Arc::new(Notifier::new(bus.clone(), lost_tx)),
            None,
        );
        let subscription: SharedSubscription = Arc::new(RwLock::new(None));
        let worker = Worker::new(
            connections.clone(),
            lost_rx,
            Arc::clone(&subscription),
            Arc::new(LastValue::default()),
            bus,
        );
        (worker, connections, subscription, rx)
    }

    fn snapshot(subscription: &SharedSubscription) -> Option<Subscription> {
        *subscription.read()
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<EventKind> {
        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        kinds
    }

    fn fault(generation: u64) -> GenerationFault {
        GenerationFault {
            generation,
            max_value: 80.0,
            error: GenerationError::ProviderDied,
        }
    }

    #[tokio::test]
    async fn superseded_fault_leaves_subscription_and_link_alone() {
        let (mut worker, connections, subscription, mut rx) = worker();
        worker.connect().await;
        worker.subscribe(180.0).await;
        let superseded = snapshot(&subscription).expect("subscribed").generation();
        worker.subscribe(80.0).await;
        drain(&mut rx);

        worker.on_fault(fault(superseded)).await;

        assert!(drain(&mut rx).is_empty());
        assert_eq!(connections.state(), ConnectionState::Connected);
        let current = snapshot(&subscription).expect("still subscribed");
        assert!(current.is_active());
        assert_eq!(current.max_value(), 80.0);
        assert_ne!(current.generation(), superseded);
        assert!(worker.link.is_some());

        worker.disconnect().await;
    }

    #[tokio::test]
    async fn current_fault_deactivates_and_drops_link() {
        let (mut worker, connections, subscription, mut rx) = worker();
        worker.connect().await;
        worker.subscribe(80.0).await;
        let generation = snapshot(&subscription).expect("subscribed").generation();
        drain(&mut rx);

        worker.on_fault(fault(generation)).await;

        assert_eq!(
            drain(&mut rx),
            vec![EventKind::GenerationFailed, EventKind::ProviderLost]
        );
        assert_eq!(connections.state(), ConnectionState::Idle);
        assert!(connections.current().is_none());
        assert!(worker.link.is_none());
        let failed = snapshot(&subscription).expect("kept until resubscribed");
        assert!(!failed.is_active());
        assert_eq!(failed.generation(), generation);

        // A repeated notice for the same generation is ignored.
        worker.on_fault(fault(generation)).await;
        assert!(drain(&mut rx).is_empty());
    }
}
