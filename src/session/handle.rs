use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::GenerationError;

/// Handle to one running generation task.
#[derive(Debug)]
pub(crate) struct GenerationHandle {
    pub(crate) id: u64,
    pub(crate) max_value: f32,
    token: CancellationToken,
    join: JoinHandle<Result<(), GenerationError>>,
}

impl GenerationHandle {
    pub(crate) fn new(
        id: u64,
        max_value: f32,
        token: CancellationToken,
        join: JoinHandle<Result<(), GenerationError>>,
    ) -> Self {
        Self {
            id,
            max_value,
            token,
            join,
        }
    }

    /// Cancels the task and waits until it has fully terminated.
    ///
    /// Once this returns the task delivers no further samples.
    pub(crate) async fn cancel_and_join(self) {
        self.token.cancel();
        match self.join.await {
            Ok(_) => {}
            Err(e) if e.is_panic() => {
                warn!(generation = self.id, "generation task panicked");
            }
            Err(_) => {}
        }
    }
}
