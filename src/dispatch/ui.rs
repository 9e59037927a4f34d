//! # UI execution context.
//!
//! [`UiContext`] posts jobs to a single consumer, the [`UiLoop`], which runs them
//! one by one on whatever thread drives it. Display surfaces are only touched
//! from inside such jobs.
//!
//! ```text
//! dispatch task ── post(job) ──► [unbounded queue] ──► UiLoop::run (ui thread) ──► job()
//!               ◄── oneshot result ────────────────────────────────────────────┘
//! ```
//!
//! The loop ends once every [`UiContext`] clone has been dropped.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread;

use tokio::sync::{mpsc, oneshot};
use tracing::{trace, warn};

use crate::error::UiError;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Sending half of the UI execution context. Cheap to clone.
#[derive(Clone, Debug)]
pub struct UiContext {
    tx: mpsc::UnboundedSender<Job>,
}

/// Receiving half; owned by the UI thread.
#[derive(Debug)]
pub struct UiLoop {
    rx: mpsc::UnboundedReceiver<Job>,
}

impl UiContext {
    /// Creates a context and the loop that must be driven by the UI thread.
    pub fn new() -> (Self, UiLoop) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, UiLoop { rx })
    }

    /// Creates a context driven by a new named thread.
    pub fn spawn(name: impl Into<String>) -> std::io::Result<(Self, thread::JoinHandle<()>)> {
        let (ctx, ui_loop) = Self::new();
        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(move || ui_loop.run())?;
        Ok((ctx, handle))
    }

    /// Queues `job` without waiting for it.
    pub fn post(&self, job: impl FnOnce() + Send + 'static) -> Result<(), UiError> {
        self.tx.send(Box::new(job)).map_err(|_| UiError::Closed)
    }

    /// Runs `job` on the UI context and waits for its result.
    ///
    /// Fails with `Closed` if the loop is gone or the job panicked.
    pub async fn run<R, F>(&self, job: F) -> Result<R, UiError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let (done, result) = oneshot::channel();
        self.post(move || {
            let _ = done.send(job());
        })?;
        result.await.map_err(|_| UiError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl UiLoop {
    /// Runs jobs until every context is dropped. Blocks the calling thread.
    ///
    /// Must not be called from inside an async runtime.
    pub fn run(mut self) {
        trace!("ui loop started");
        while let Some(job) = self.rx.blocking_recv() {
            execute(job);
        }
        trace!("ui loop finished");
    }

    /// Runs every job queued so far without blocking; returns how many ran.
    pub fn drain(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            execute(job);
            ran += 1;
        }
        ran
    }
}

fn execute(job: Job) {
    if catch_unwind(AssertUnwindSafe(job)).is_err() {
        warn!("ui job panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn jobs_run_on_the_ui_thread() {
        let (ui, thread) = UiContext::spawn("ui-test").expect("spawn ui thread");

        let name = ui
            .run(|| thread::current().name().map(str::to_owned))
            .await
            .expect("ui alive");
        assert_eq!(name.as_deref(), Some("ui-test"));

        drop(ui);
        tokio::task::spawn_blocking(move || thread.join())
            .await
            .expect("join")
            .expect("ui thread exits cleanly");
    }

    #[test]
    fn drain_runs_queued_jobs_in_order() {
        let (ui, mut ui_loop) = UiContext::new();
        let seen = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
        for i in 0..3 {
            let seen = seen.clone();
            ui.post(move || seen.lock().push(i)).expect("open");
        }

        assert_eq!(ui_loop.drain(), 3);
        assert_eq!(*seen.lock(), vec![0, 1, 2]);
        assert_eq!(ui_loop.drain(), 0);
    }

    #[tokio::test]
    async fn closed_loop_is_reported() {
        let (ui, ui_loop) = UiContext::new();
        drop(ui_loop);

        assert!(ui.is_closed());
        assert_eq!(ui.post(|| {}), Err(UiError::Closed));
        assert_eq!(ui.run(|| 1).await, Err(UiError::Closed));
    }
}
