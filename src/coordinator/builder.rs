use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::{
    config::Config,
    connection::ConnectionManager,
    coordinator::{
        CommandHandle, SubscriptionCoordinator,
        coordinator::Pending,
        notifier::Notifier,
        worker::Worker,
    },
    dispatch::{DisplaySurface, LastValue, UiContext, ViewSlot},
    events::Bus,
    source::Provider,
    subscribers::Subscribe,
};

/// Builder for a [`SubscriptionCoordinator`].
///
/// Nothing is spawned until [`SubscriptionCoordinator::start`].
pub struct CoordinatorBuilder {
    cfg: Config,
    ui: UiContext,
    primary: Option<Arc<dyn Provider>>,
    fallback: Option<Arc<dyn Provider>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    view: Option<Arc<dyn DisplaySurface>>,
}

impl CoordinatorBuilder {
    pub fn new(cfg: Config, ui: UiContext) -> Self {
        Self {
            cfg,
            ui,
            primary: None,
            fallback: None,
            subscribers: Vec::new(),
            view: None,
        }
    }

    /// Sets the provider tried first on every connect.
    pub fn with_primary(mut self, provider: Arc<dyn Provider>) -> Self {
        self.primary = Some(provider);
        self
    }

    /// Sets the provider tried when the primary cannot be bound.
    pub fn with_fallback(mut self, provider: Arc<dyn Provider>) -> Self {
        self.fallback = Some(provider);
        self
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive lifecycle events through dedicated workers with
    /// bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Attaches a display surface up front.
    pub fn with_view(mut self, view: Arc<dyn DisplaySurface>) -> Self {
        self.view = Some(view);
        self
    }

    pub fn build(self) -> Arc<SubscriptionCoordinator> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let (lost_tx, lost_rx) = mpsc::unbounded_channel();

        let providers: Vec<Arc<dyn Provider>> =
            self.primary.into_iter().chain(self.fallback).collect();
        let connections = ConnectionManager::new(
            providers,
            Arc::new(Notifier::new(bus.clone(), lost_tx)),
            self.cfg.connect_timeout(),
        );

        let last_value = Arc::new(LastValue::default());
        let subscription = Arc::new(RwLock::new(None));
        let (tx, commands) = mpsc::channel(self.cfg.command_capacity_clamped());
        let worker = Worker::new(
            connections.clone(),
            lost_rx,
            Arc::clone(&subscription),
            Arc::clone(&last_value),
            bus.clone(),
        );

        let view = ViewSlot::new();
        if let Some(surface) = self.view {
            view.attach(surface);
        }

        Arc::new(SubscriptionCoordinator::new_internal(
            self.cfg,
            bus,
            CommandHandle::new(tx),
            Pending {
                worker,
                commands,
                subscribers: self.subscribers,
            },
            view,
            self.ui,
            last_value,
            subscription,
            connections,
        ))
    }
}
