use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::connection::{ConnectionHandle, ConnectionListener, DisconnectReason};
use crate::error::ConnectError;
use crate::events::{Bus, Event, EventKind};

/// Turns connection callbacks into bus events and worker notices.
///
/// Unsolicited disconnects are forwarded to the worker so it can drop the
/// subscription bound to the dead link.
pub(crate) struct Notifier {
    bus: Bus,
    lost: mpsc::UnboundedSender<u64>,
    provider: Mutex<Option<(u64, Arc<str>)>>,
}

impl Notifier {
    pub(crate) fn new(bus: Bus, lost: mpsc::UnboundedSender<u64>) -> Self {
        Self {
            bus,
            lost,
            provider: Mutex::new(None),
        }
    }
}

impl ConnectionListener for Notifier {
    fn on_connected(&self, handle: &ConnectionHandle) {
        let name: Arc<str> = Arc::from(handle.provider());
        *self.provider.lock() = Some((handle.id(), Arc::clone(&name)));
        self.bus.publish(
            Event::new(EventKind::Connected)
                .with_provider(name)
                .with_connection(handle.id()),
        );
    }

    fn on_connection_failed(&self, error: ConnectError) {
        self.bus
            .publish(Event::new(EventKind::ConnectionFailed).with_reason(error.as_label()));
    }

    fn on_disconnected(&self, connection: u64, reason: DisconnectReason) {
        let provider = {
            let mut slot = self.provider.lock();
            match slot.as_ref() {
                Some((id, _)) if *id == connection => slot.take().map(|(_, name)| name),
                _ => None,
            }
        };

        let kind = match reason {
            DisconnectReason::Requested => EventKind::Disconnected,
            DisconnectReason::ProviderDied => {
                let _ = self.lost.send(connection);
                EventKind::ProviderLost
            }
        };
        let mut ev = Event::new(kind).with_connection(connection);
        if let Some(name) = provider {
            ev = ev.with_provider(name);
        }
        self.bus.publish(ev);
    }
}
