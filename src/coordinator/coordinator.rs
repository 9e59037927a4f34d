//! # SubscriptionCoordinator: public entry point of the core.
//!
//! Wires the command worker, the dispatch loop and the event fan-out together
//! and owns their lifecycle.
//!
//! ```text
//! start():
//!   Bus.subscribe() ─► fan-out task ─► SubscriberSet::emit(&Event)
//!   spawn Worker::run(commands)
//!   spawn DispatchLoop::run(cfg.dispatch_interval, scope.child_token())
//!   submit ConnectService
//!
//! stop():
//!   publish ShutdownRequested
//!   cancel + join dispatch loop
//!   submit UnsubscribeDataSource, DisconnectService ─► await completion
//!   close intake ─► worker drains and exits ─► join
//!   publish ShutdownComplete
//!   cancel scope ─► fan-out drains ─► SubscriberSet::shutdown()
//! ```
//!
//! ## Rules
//! - `start()` on a running coordinator is a no-op; after `stop()` it fails with `Closed`.
//! - `stop()` runs once; a second call fails with `Closed`.
//! - Views can be attached and detached at any time, running or not.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::coordinator::worker::{SharedSubscription, Subscription, Worker};
use crate::coordinator::{Command, CommandHandle, CoordinatorBuilder};
use crate::dispatch::{DispatchLoop, DisplaySurface, LastValue, Reading, UiContext, ViewSlot};
use crate::error::CommandQueueError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{Subscribe, SubscriberSet};

pub(crate) struct Pending {
    pub(crate) worker: Worker,
    pub(crate) commands: mpsc::Receiver<Command>,
    pub(crate) subscribers: Vec<Arc<dyn Subscribe>>,
}

struct Running {
    scope: CancellationToken,
    dispatch_token: CancellationToken,
    worker: JoinHandle<()>,
    dispatch: JoinHandle<()>,
    fanout: JoinHandle<()>,
}

enum Lifecycle {
    Ready(Box<Pending>),
    Running(Running),
    Stopped,
}

/// Serializes subscription lifecycle requests and drives value delivery.
pub struct SubscriptionCoordinator {
    cfg: Config,
    bus: Bus,
    intake: CommandHandle,
    lifecycle: Mutex<Lifecycle>,
    view: ViewSlot,
    ui: UiContext,
    last_value: Arc<LastValue>,
    subscription: SharedSubscription,
    connections: ConnectionManager,
}

impl SubscriptionCoordinator {
    /// Returns a builder bound to `cfg` and the UI execution context.
    pub fn builder(cfg: Config, ui: UiContext) -> CoordinatorBuilder {
        CoordinatorBuilder::new(cfg, ui)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        intake: CommandHandle,
        pending: Pending,
        view: ViewSlot,
        ui: UiContext,
        last_value: Arc<LastValue>,
        subscription: SharedSubscription,
        connections: ConnectionManager,
    ) -> Self {
        Self {
            cfg,
            bus,
            intake,
            lifecycle: Mutex::new(Lifecycle::Ready(Box::new(pending))),
            view,
            ui,
            last_value,
            subscription,
            connections,
        }
    }

    /// Spawns the worker, the dispatch loop and the event fan-out, then
    /// requests a connection.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(&self) -> Result<(), CommandQueueError> {
        {
            let mut lifecycle = self.lifecycle.lock();
            let pending = match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
                Lifecycle::Ready(pending) => pending,
                running @ Lifecycle::Running(_) => {
                    *lifecycle = running;
                    debug!("start ignored: already running");
                    return Ok(());
                }
                Lifecycle::Stopped => return Err(CommandQueueError::Closed),
            };
            *lifecycle = Lifecycle::Running(self.spawn(*pending));
        }

        info!(
            dispatch_interval = ?self.cfg.dispatch_interval_clamped(),
            "coordinator started"
        );
        self.intake.submit(Command::ConnectService).await
    }

    fn spawn(&self, pending: Pending) -> Running {
        let Pending {
            worker,
            commands,
            subscribers,
        } = pending;

        let scope = CancellationToken::new();
        let dispatch_token = scope.child_token();

        let fanout = self.spawn_fanout(subscribers, scope.clone());
        let worker = tokio::spawn(worker.run(commands));
        let dispatch = DispatchLoop::new(
            Arc::clone(&self.last_value),
            self.view.clone(),
            self.ui.clone(),
        );
        let dispatch = tokio::spawn(
            dispatch.run(self.cfg.dispatch_interval_clamped(), dispatch_token.clone()),
        );

        Running {
            scope,
            dispatch_token,
            worker,
            dispatch,
            fanout,
        }
    }

    /// Subscribes to the bus and forwards events to the subscriber set until `scope` is cancelled.
    fn spawn_fanout(
        &self,
        subscribers: Vec<Arc<dyn Subscribe>>,
        scope: CancellationToken,
    ) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        let set = SubscriberSet::new(subscribers, self.bus.clone());

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    ev = rx.recv() => match ev {
                        Ok(ev) => set.emit(&ev),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "event fan-out lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = scope.cancelled() => {
                        while let Ok(ev) = rx.try_recv() {
                            set.emit(&ev);
                        }
                        break;
                    }
                }
            }
            set.shutdown().await;
        })
    }

    /// Tears down generation and link, then stops every task.
    ///
    /// ### Errors
    /// `Closed` if the coordinator was already stopped.
    pub async fn stop(&self) -> Result<(), CommandQueueError> {
        let running = {
            let mut lifecycle = self.lifecycle.lock();
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
                Lifecycle::Running(running) => running,
                Lifecycle::Ready(_) => {
                    self.intake.close();
                    debug!("coordinator stopped before start");
                    return Ok(());
                }
                Lifecycle::Stopped => return Err(CommandQueueError::Closed),
            }
        };

        self.bus.publish(Event::new(EventKind::ShutdownRequested));

        running.dispatch_token.cancel();
        if let Err(e) = running.dispatch.await {
            warn!(error = %e, "dispatch loop ended abnormally");
        }

        let (disconnect, done) = Command::disconnect();
        let drained = match self.intake.submit(Command::UnsubscribeDataSource).await {
            Ok(()) => self.intake.submit(disconnect).await,
            Err(e) => Err(e),
        };
        match drained {
            Ok(()) => {
                if done.await.is_err() {
                    warn!("worker exited before completing disconnect");
                }
            }
            Err(e) => warn!(error = %e, "could not drain teardown commands"),
        }

        self.intake.close();
        if let Err(e) = running.worker.await {
            warn!(error = %e, "coordinator worker ended abnormally");
        }

        self.bus.publish(Event::new(EventKind::ShutdownComplete));
        info!("coordinator stopped");

        running.scope.cancel();
        let _ = running.fanout.await;
        Ok(())
    }

    /// Requests a subscription with a new max value.
    pub async fn on_max_value_changed(&self, max_value: f32) -> Result<(), CommandQueueError> {
        self.intake
            .submit(Command::SubscribeDataSource { max_value })
            .await
    }

    /// Handle for submitting raw commands.
    pub fn handle(&self) -> CommandHandle {
        self.intake.clone()
    }

    /// Attaches the display surface; returns the one it replaces.
    pub fn attach_view(&self, view: Arc<dyn DisplaySurface>) -> Option<Arc<dyn DisplaySurface>> {
        self.view.attach(view)
    }

    pub fn detach_view(&self) -> Option<Arc<dyn DisplaySurface>> {
        self.view.detach()
    }

    /// Receiver of every lifecycle event published from now on.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Current content of the shared value cell.
    pub fn last_value(&self) -> Reading {
        self.last_value.load()
    }

    /// Current subscription, if any; inactive after a failure until resubscribed.
    pub fn subscription(&self) -> Option<Subscription> {
        *self.subscription.read()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connections.state()
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.lifecycle.lock(), Lifecycle::Running(_))
    }
}
