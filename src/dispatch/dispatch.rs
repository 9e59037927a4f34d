//! # DispatchLoop: change-only forwarding to the display surface.
//!
//! ```text
//! every tick:
//!   LastValue.load() ── stale epoch? ──► skip
//!                    └─ same bits as last forward? ──► skip
//!                    └─ ui.run(|| view.get()?.update_value(v)).await
//! ```
//!
//! ## Rules
//! - Only readings of the current epoch are forwarded.
//! - A value is forwarded only if it differs (bitwise) from the previous forward.
//! - The view slot and the cancellation token are read inside the UI job, so a
//!   detach or a cancel is seen by the very next dispatch.
//! - Cancellation is observed while waiting for a tick and while waiting for
//!   the UI job, so the loop exits even if the UI thread never runs the job.
//!   A job that runs late re-checks the token and does nothing.
//! - The loop also exits when the UI context is gone.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::dispatch::{LastValue, UiContext, ViewSlot};
use crate::error::UiError;

/// Polls a [`LastValue`] and forwards changes to the attached view.
pub struct DispatchLoop {
    cell: Arc<LastValue>,
    view: ViewSlot,
    ui: UiContext,
    previous: u32,
}

impl DispatchLoop {
    /// Creates a loop; the value currently in `cell` counts as already forwarded.
    pub fn new(cell: Arc<LastValue>, view: ViewSlot, ui: UiContext) -> Self {
        let previous = cell.load().value.to_bits();
        Self {
            cell,
            view,
            ui,
            previous,
        }
    }

    /// Reads the cell once. Returns the value to forward, if any.
    pub fn poll(&mut self) -> Option<f32> {
        let reading = self.cell.load();
        if reading.epoch != self.cell.current_epoch() {
            return None;
        }
        let bits = reading.value.to_bits();
        if bits == self.previous {
            return None;
        }
        self.previous = bits;
        Some(reading.value)
    }

    /// Delivers `value` to the attached view on the UI context.
    ///
    /// Returns `Ok(false)` when nothing was attached or `token` was cancelled
    /// before the job ran.
    pub async fn forward(&self, value: f32, token: &CancellationToken) -> Result<bool, UiError> {
        let view = self.view.clone();
        let token = token.clone();
        self.ui
            .run(move || {
                if token.is_cancelled() {
                    return false;
                }
                match view.get() {
                    Some(surface) => {
                        surface.update_value(value);
                        true
                    }
                    None => false,
                }
            })
            .await
    }

    /// Runs until `token` is cancelled or the UI context closes.
    pub async fn run(mut self, interval: Duration, token: CancellationToken) {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!(?interval, "dispatch loop started");

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let Some(value) = self.poll() else { continue };
            let forwarded = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                res = self.forward(value, &token) => res,
            };
            match forwarded {
                Ok(delivered) => trace!(value, delivered, "dispatched"),
                Err(e) => {
                    warn!(error = %e, "ui context closed, stopping dispatch");
                    break;
                }
            }
        }
        debug!("dispatch loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::dispatch::DisplaySurface;

    #[derive(Default)]
    struct Screen {
        values: Mutex<Vec<f32>>,
        threads: Mutex<Vec<Option<String>>>,
    }

    impl DisplaySurface for Screen {
        fn update_value(&self, value: f32) {
            self.values.lock().push(value);
            self.threads
                .lock()
                .push(std::thread::current().name().map(str::to_owned));
        }
    }

    fn setup() -> (Arc<LastValue>, ViewSlot, Arc<Screen>, UiContext, crate::dispatch::UiLoop) {
        let cell = Arc::new(LastValue::new(0.0));
        let view = ViewSlot::new();
        let screen = Arc::new(Screen::default());
        view.attach(screen.clone());
        let (ui, ui_loop) = UiContext::new();
        (cell, view, screen, ui, ui_loop)
    }

    #[test]
    fn forwards_only_changes() {
        let (cell, view, _screen, ui, _ui_loop) = setup();
        let mut dispatch = DispatchLoop::new(cell.clone(), view, ui);
        let epoch = cell.begin_epoch();

        let mut forwarded = Vec::new();
        for v in [5.0, 5.0, 5.0, 7.2, 7.2, 9.0] {
            cell.store(epoch, v);
            forwarded.extend(dispatch.poll());
        }
        assert_eq!(forwarded, vec![5.0, 7.2, 9.0]);
    }

    #[test]
    fn stale_epoch_is_not_forwarded() {
        let (cell, view, _screen, ui, _ui_loop) = setup();
        let mut dispatch = DispatchLoop::new(cell.clone(), view, ui);

        let old = cell.begin_epoch();
        let new = cell.begin_epoch();
        cell.store(old, 50.0);
        assert_eq!(dispatch.poll(), None);

        cell.store(new, 30.0);
        assert_eq!(dispatch.poll(), Some(30.0));
    }

    #[test]
    fn initial_value_is_not_forwarded() {
        let (cell, view, _screen, ui, _ui_loop) = setup();
        let mut dispatch = DispatchLoop::new(cell, view, ui);
        assert_eq!(dispatch.poll(), None);
    }

    #[tokio::test]
    async fn detach_is_seen_by_next_forward() {
        let (cell, view, screen, ui, mut ui_loop) = setup();
        let dispatch = DispatchLoop::new(cell, view.clone(), ui);
        let token = CancellationToken::new();

        let pending = dispatch.forward(1.0, &token);
        view.detach();
        tokio::pin!(pending);
        assert!(futures::poll!(pending.as_mut()).is_pending());
        ui_loop.drain();

        assert_eq!(pending.await, Ok(false));
        assert!(screen.values.lock().is_empty());
    }

    #[tokio::test]
    async fn cancel_interrupts_forward_waiting_on_ui() {
        let (cell, view, screen, ui, mut ui_loop) = setup();
        let token = CancellationToken::new();
        let dispatch = DispatchLoop::new(cell.clone(), view, ui);
        let task = tokio::spawn(dispatch.run(Duration::from_millis(1), token.clone()));

        let epoch = cell.begin_epoch();
        cell.store(epoch, 12.0);
        time::sleep(Duration::from_millis(20)).await;
        assert!(!task.is_finished());

        token.cancel();
        time::timeout(Duration::from_secs(1), task)
            .await
            .expect("loop exits without the ui running its job")
            .expect("dispatch task");

        ui_loop.drain();
        assert!(screen.values.lock().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_forwards_on_ui_thread_until_cancelled() {
        let cell = Arc::new(LastValue::new(0.0));
        let view = ViewSlot::new();
        let screen = Arc::new(Screen::default());
        view.attach(screen.clone());
        let (ui, ui_thread) = UiContext::spawn("gauge-ui").expect("ui thread");

        let token = CancellationToken::new();
        let dispatch = DispatchLoop::new(cell.clone(), view, ui);
        let task = tokio::spawn(dispatch.run(Duration::from_millis(1), token.clone()));

        let epoch = cell.begin_epoch();
        cell.store(epoch, 42.0);
        for _ in 0..200 {
            if !screen.values.lock().is_empty() {
                break;
            }
            time::sleep(Duration::from_millis(5)).await;
        }

        token.cancel();
        task.await.expect("dispatch task");
        cell.store(epoch, 43.0);
        time::sleep(Duration::from_millis(10)).await;

        assert_eq!(*screen.values.lock(), vec![42.0]);
        assert_eq!(
            *screen.threads.lock(),
            vec![Some("gauge-ui".to_owned())]
        );
        tokio::task::spawn_blocking(move || ui_thread.join())
            .await
            .expect("join")
            .expect("ui thread");
    }
}
