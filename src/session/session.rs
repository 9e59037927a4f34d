//! # SignalSession: at most one live generation task.
//!
//! ```text
//! replace(source, max, listener)
//!   └─ lock current
//!        ├─ previous.cancel_and_join()   (awaited: no overlap)
//!        └─ spawn generation task ──► stream.next() ──► listener(sample)
//!                                          │
//!                                          └─ Err(ProviderDied) ──► fault channel
//! ```
//!
//! ## Rules
//! - The previous task has terminated before the next one is spawned.
//! - After `stop()` returns, the listener is never invoked again.
//! - Concurrent `replace()` calls are serialized by an async mutex.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::StreamExt;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::GenerationError;
use crate::session::GenerationHandle;
use crate::source::SignalSource;

/// Callback receiving every sample of the live generation.
pub type SampleListener = Arc<dyn Fn(f32) + Send + Sync>;

/// A generation task that ended with an error.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationFault {
    pub generation: u64,
    pub max_value: f32,
    pub error: GenerationError,
}

/// Owns the single live generation task.
pub struct SignalSession {
    current: Mutex<Option<GenerationHandle>>,
    next_id: AtomicU64,
    faults: mpsc::UnboundedSender<GenerationFault>,
}

impl SignalSession {
    /// Creates an idle session and the receiver for generation faults.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<GenerationFault>) {
        let (faults, rx) = mpsc::unbounded_channel();
        (
            Self {
                current: Mutex::new(None),
                next_id: AtomicU64::new(1),
                faults,
            },
            rx,
        )
    }

    /// Cancels and joins the live task, then starts generating from `source`.
    ///
    /// Returns the id of the new generation. If `source` cannot be opened the
    /// previous task is still stopped and the fault is reported on the fault
    /// channel.
    pub async fn replace(
        &self,
        source: &Arc<dyn SignalSource>,
        max_value: f32,
        on_sample: SampleListener,
    ) -> u64 {
        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            trace!(generation = previous.id, "joining previous generation");
            previous.cancel_and_join().await;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let stream = match source.open(max_value) {
            Ok(stream) => stream,
            Err(error) => {
                warn!(generation = id, source = source.name(), %error, "failed to open source");
                let _ = self.faults.send(GenerationFault {
                    generation: id,
                    max_value,
                    error,
                });
                return id;
            }
        };

        let token = CancellationToken::new();
        let join = tokio::spawn(generate(
            id,
            max_value,
            stream,
            token.clone(),
            on_sample,
            self.faults.clone(),
        ));
        debug!(generation = id, max_value, source = source.name(), "generation started");
        *current = Some(GenerationHandle::new(id, max_value, token, join));
        id
    }

    /// Cancels and joins the live task. Returns `false` if none was running.
    pub async fn stop(&self) -> bool {
        let previous = self.current.lock().await.take();
        match previous {
            Some(handle) => {
                let id = handle.id;
                handle.cancel_and_join().await;
                debug!(generation = id, "generation stopped");
                true
            }
            None => false,
        }
    }

    /// Starts generating, or stops when no listener is given.
    ///
    /// Returns the new generation id, or `None` after a stop.
    pub async fn provide_data(
        &self,
        source: &Arc<dyn SignalSource>,
        max_value: f32,
        on_sample: Option<SampleListener>,
    ) -> Option<u64> {
        match on_sample {
            Some(listener) => Some(self.replace(source, max_value, listener).await),
            None => {
                self.stop().await;
                None
            }
        }
    }

    /// Id and max value of the live generation.
    pub async fn current(&self) -> Option<(u64, f32)> {
        self.current
            .lock()
            .await
            .as_ref()
            .map(|h| (h.id, h.max_value))
    }
}

async fn generate(
    id: u64,
    max_value: f32,
    mut stream: crate::source::SampleStream,
    token: CancellationToken,
    on_sample: SampleListener,
    faults: mpsc::UnboundedSender<GenerationFault>,
) -> Result<(), GenerationError> {
    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(()),
            next = stream.next() => next,
        };
        match next {
            Some(Ok(value)) => {
                if token.is_cancelled() {
                    return Ok(());
                }
                on_sample(value);
            }
            Some(Err(error)) => {
                if !token.is_cancelled() {
                    warn!(generation = id, %error, "generation failed");
                    let _ = faults.send(GenerationFault {
                        generation: id,
                        max_value,
                        error,
                    });
                }
                return Err(error);
            }
            None => {
                trace!(generation = id, "sample stream ended");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::stream;
    use parking_lot::Mutex as SyncMutex;

    use super::*;
    use crate::source::SampleStream;

    /// Emits `max_value` every millisecond; fails after `fail_after` samples if set.
    struct Constant {
        fail_after: Option<usize>,
    }

    impl SignalSource for Constant {
        fn name(&self) -> &str {
            "constant"
        }

        fn open(&self, max_value: f32) -> Result<SampleStream, GenerationError> {
            let fail_after = self.fail_after;
            Ok(Box::pin(stream::unfold(0usize, move |n| async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                match fail_after {
                    Some(limit) if n >= limit => {
                        if n == limit {
                            Some((Err(GenerationError::ProviderDied), n + 1))
                        } else {
                            None
                        }
                    }
                    _ => Some((Ok(max_value), n + 1)),
                }
            })))
        }
    }

    fn constant() -> Arc<dyn SignalSource> {
        Arc::new(Constant { fail_after: None })
    }

    fn recorder() -> (SampleListener, Arc<SyncMutex<Vec<f32>>>) {
        let seen = Arc::new(SyncMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (Arc::new(move |v| sink.lock().push(v)), seen)
    }

    #[tokio::test]
    async fn replace_stops_previous_before_starting_next() {
        let (session, _faults) = SignalSession::new();
        let source = constant();
        let (listener, seen) = recorder();

        session.replace(&source, 50.0, listener.clone()).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        session.replace(&source, 30.0, listener).await;
        let cut = seen.lock().len();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let seen = seen.lock();
        assert!(seen[..cut].iter().all(|v| *v == 50.0));
        assert!(seen[cut..].iter().all(|v| *v == 30.0));
        assert!(seen.len() > cut);
    }

    #[tokio::test]
    async fn nothing_is_delivered_after_stop() {
        let (session, _faults) = SignalSession::new();
        let (listener, seen) = recorder();

        session.replace(&constant(), 10.0, listener).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(session.stop().await);
        let frozen = seen.lock().len();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(seen.lock().len(), frozen);
        assert!(!session.stop().await);
        assert!(session.current().await.is_none());
    }

    #[tokio::test]
    async fn stream_error_is_reported_as_fault() {
        let (session, mut faults) = SignalSession::new();
        let source: Arc<dyn SignalSource> = Arc::new(Constant {
            fail_after: Some(3),
        });
        let (listener, seen) = recorder();

        let id = session.replace(&source, 7.0, listener).await;
        let fault = faults.recv().await.expect("fault");

        assert_eq!(
            fault,
            GenerationFault {
                generation: id,
                max_value: 7.0,
                error: GenerationError::ProviderDied,
            }
        );
        assert_eq!(seen.lock().len(), 3);
    }

    #[tokio::test]
    async fn provide_data_without_listener_stops() {
        let (session, _faults) = SignalSession::new();
        let (listener, _seen) = recorder();
        let source = constant();

        let id = session.provide_data(&source, 5.0, Some(listener)).await;
        assert_eq!(session.current().await, id.map(|id| (id, 5.0)));

        assert_eq!(session.provide_data(&source, 5.0, None).await, None);
        assert!(session.current().await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_replaces_leave_one_generation() {
        let session = Arc::new(SignalSession::new().0);
        let source = constant();
        let live = Arc::new(SyncMutex::new(std::collections::HashSet::new()));

        let mut joins = Vec::new();
        for i in 0..8 {
            let session = Arc::clone(&session);
            let source = Arc::clone(&source);
            let live = Arc::clone(&live);
            joins.push(tokio::spawn(async move {
                let listener: SampleListener = Arc::new(move |v| {
                    live.lock().insert(v.to_bits());
                });
                session.replace(&source, i as f32, listener).await
            }));
        }
        for j in joins {
            j.await.expect("join");
        }

        let (_, max) = session.current().await.expect("one live generation");
        live.lock().clear();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let live = live.lock();
        assert_eq!(live.len(), 1);
        assert!(live.contains(&max.to_bits()));
    }
}
