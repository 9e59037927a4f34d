use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};

use crate::error::CommandQueueError;

/// Lifecycle request processed by the coordinator worker, one at a time.
#[derive(Debug)]
pub enum Command {
    /// Establish the link to the signal source.
    ConnectService,
    /// Start (or replace) the subscription with the given max value.
    SubscribeDataSource { max_value: f32 },
    /// Stop the active subscription; valid in any connection state.
    UnsubscribeDataSource,
    /// Stop generation, drop the link, then fire `done` (always, exactly once).
    DisconnectService { done: oneshot::Sender<()> },
}

impl Command {
    /// Builds a `DisconnectService` command and the receiver of its completion.
    pub fn disconnect() -> (Self, oneshot::Receiver<()>) {
        let (done, rx) = oneshot::channel();
        (Command::DisconnectService { done }, rx)
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Command::ConnectService => "connect_service",
            Command::SubscribeDataSource { .. } => "subscribe_data_source",
            Command::UnsubscribeDataSource => "unsubscribe_data_source",
            Command::DisconnectService { .. } => "disconnect_service",
        }
    }
}

/// Handle for submitting commands to a coordinator.
///
/// Every clone shares one intake. Once the intake is closed (coordinator
/// stopped), submission fails with [`CommandQueueError::Closed`].
#[derive(Clone, Debug)]
pub struct CommandHandle {
    intake: Arc<RwLock<Option<mpsc::Sender<Command>>>>,
}

impl CommandHandle {
    pub(crate) fn new(tx: mpsc::Sender<Command>) -> Self {
        Self {
            intake: Arc::new(RwLock::new(Some(tx))),
        }
    }

    fn sender(&self) -> Result<mpsc::Sender<Command>, CommandQueueError> {
        self.intake.read().clone().ok_or(CommandQueueError::Closed)
    }

    /// Submits a command, waiting for queue space.
    pub async fn submit(&self, cmd: Command) -> Result<(), CommandQueueError> {
        self.sender()?
            .send(cmd)
            .await
            .map_err(|_| CommandQueueError::Closed)
    }

    /// Submits without waiting; fails with `Full` when the queue is at capacity.
    pub fn try_submit(&self, cmd: Command) -> Result<(), CommandQueueError> {
        self.sender()?.try_send(cmd).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => CommandQueueError::Full,
            mpsc::error::TrySendError::Closed(_) => CommandQueueError::Closed,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.intake.read().as_ref().is_none_or(|tx| tx.is_closed())
    }

    /// Closes the intake. Commands already queued are still processed.
    pub(crate) fn close(&self) {
        self.intake.write().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closed_intake_rejects_commands() {
        let (tx, mut rx) = mpsc::channel(1);
        let handle = CommandHandle::new(tx);

        handle.submit(Command::ConnectService).await.expect("open");
        assert_eq!(
            handle.try_submit(Command::UnsubscribeDataSource),
            Err(CommandQueueError::Full)
        );

        handle.close();
        assert!(handle.is_closed());
        assert_eq!(
            handle.submit(Command::ConnectService).await,
            Err(CommandQueueError::Closed)
        );
        assert!(matches!(rx.recv().await, Some(Command::ConnectService)));
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn labels_are_stable() {
        let (cmd, _rx) = Command::disconnect();
        assert_eq!(cmd.label(), "disconnect_service");
        assert_eq!(
            Command::SubscribeDataSource { max_value: 1.0 }.label(),
            "subscribe_data_source"
        );
    }
}
