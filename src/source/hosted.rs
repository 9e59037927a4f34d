//! # Hosted provider.
//!
//! [`ProviderHost`] stands for a signal source living in a separate host
//! (another process on the real device). The host can be started, killed and
//! revived; [`HostedProvider`] is the primary binding strategy for it.
//!
//! ```text
//! ProviderHost ── running token ──┬─► Link::child_of(token)   (per binding)
//!                                 └─► Waveform::shared_stream (per subscription)
//! kill()  → token cancelled → links die, open streams yield ProviderDied
//! revive()→ fresh token     → binds succeed again
//! ```
//!
//! The bind acknowledgement is delivered from a separate task after
//! `ack_delay`, like a remote callback.
//!
//! A host owns one dual-sine generator for its whole lifetime: a new
//! subscription continues the sequence where the previous one stopped, with
//! the new max value. `revive()` starts over with a fresh generator.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::GenerationError;
use crate::source::{Link, PendingBind, Provider, SampleStream, SignalSource, Waveform};

struct HostState {
    running: Option<CancellationToken>,
    generator: Arc<Mutex<Waveform>>,
}

struct HostInner {
    name: Arc<str>,
    ack_delay: Duration,
    state: Mutex<HostState>,
}

/// Handle to a (simulated) signal source host.
#[derive(Clone)]
pub struct ProviderHost {
    inner: Arc<HostInner>,
}

impl ProviderHost {
    /// Creates a running host.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self::with_ack_delay(name, Duration::ZERO)
    }

    /// Creates a running host that acknowledges binds after `ack_delay`.
    pub fn with_ack_delay(name: impl Into<Arc<str>>, ack_delay: Duration) -> Self {
        Self {
            inner: Arc::new(HostInner {
                name: name.into(),
                ack_delay,
                state: Mutex::new(HostState {
                    running: Some(CancellationToken::new()),
                    generator: fresh_generator(),
                }),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.lock().running.is_some()
    }

    /// Terminates the host: every binding dies and open streams fail.
    ///
    /// Returns `false` if the host was not running.
    pub fn kill(&self) -> bool {
        let token = self.inner.state.lock().running.take();
        match token {
            Some(token) => {
                tracing::debug!(host = %self.inner.name, "host killed");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Restarts a killed host. Returns `false` if it was already running.
    pub fn revive(&self) -> bool {
        let mut state = self.inner.state.lock();
        if state.running.is_some() {
            return false;
        }
        state.running = Some(CancellationToken::new());
        state.generator = fresh_generator();
        tracing::debug!(host = %self.inner.name, "host revived");
        true
    }

    /// Returns the binding strategy for this host.
    pub fn provider(&self) -> Arc<HostedProvider> {
        Arc::new(HostedProvider {
            host: self.clone(),
        })
    }

    fn running(&self) -> Option<(CancellationToken, Arc<Mutex<Waveform>>)> {
        let state = self.inner.state.lock();
        state
            .running
            .clone()
            .map(|token| (token, Arc::clone(&state.generator)))
    }
}

fn fresh_generator() -> Arc<Mutex<Waveform>> {
    Arc::new(Mutex::new(Waveform::dual_sine(0.0)))
}

/// Primary binding strategy: binds only while its host is running.
pub struct HostedProvider {
    host: ProviderHost,
}

impl Provider for HostedProvider {
    fn name(&self) -> &str {
        self.host.name()
    }

    fn bind(&self) -> Option<PendingBind> {
        let Some((token, generator)) = self.host.running() else {
            tracing::debug!(host = %self.host.name(), "host not running, cannot bind");
            return None;
        };

        let (pending, ack) = PendingBind::new(Link::child_of(&token));
        let source = Arc::new(HostedSource {
            name: Arc::clone(&self.host.inner.name),
            scope: token.clone(),
            generator,
        });
        let delay = self.host.inner.ack_delay;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => drop(ack),
                _ = tokio::time::sleep(delay) => {
                    ack.acknowledge(source);
                }
            }
        });
        Some(pending)
    }
}

/// Source served by a running [`ProviderHost`].
struct HostedSource {
    name: Arc<str>,
    scope: CancellationToken,
    generator: Arc<Mutex<Waveform>>,
}

impl SignalSource for HostedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, max_value: f32) -> Result<SampleStream, GenerationError> {
        if self.scope.is_cancelled() {
            return Err(GenerationError::ProviderDied);
        }
        Ok(Waveform::shared_stream(
            &self.generator,
            max_value,
            self.scope.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    async fn killed_host_refuses_binds_until_revived() {
        let host = ProviderHost::new("hosted");
        let provider = host.provider();

        assert!(host.kill());
        assert!(!host.kill());
        assert!(provider.bind().is_none());

        assert!(host.revive());
        assert!(!host.revive());
        let pending = provider.bind().expect("bind after revive");
        let source = pending.ack.await.expect("acknowledged");
        assert_eq!(source.name(), "hosted");
    }

    #[tokio::test]
    async fn kill_fails_links_and_streams() {
        let host = ProviderHost::new("hosted");
        let pending = host.provider().bind().expect("bind");
        let link = pending.link().clone();
        let source = pending.ack.await.expect("acknowledged");
        let mut samples = source.open(100.0).expect("open");

        host.kill();

        assert!(link.is_dead());
        assert_eq!(
            samples.next().await,
            Some(Err(GenerationError::ProviderDied))
        );
        assert!(matches!(
            source.open(100.0),
            Err(GenerationError::ProviderDied)
        ));
    }

    #[tokio::test]
    async fn sequence_continues_across_subscriptions_until_revive() {
        let host = ProviderHost::new("hosted");
        let source = host
            .provider()
            .bind()
            .expect("bind")
            .ack
            .await
            .expect("acknowledged");

        let mut reference = Waveform::dual_sine(100.0);
        let first_two: Vec<f32> = (0..2).map(|_| reference.next_sample()).collect();

        let a = source.open(100.0).expect("open").next().await;
        let b = source.open(100.0).expect("open").next().await;
        assert_eq!(a, Some(Ok(first_two[0])));
        assert_eq!(b, Some(Ok(first_two[1])));

        host.kill();
        host.revive();
        let revived = host
            .provider()
            .bind()
            .expect("bind")
            .ack
            .await
            .expect("acknowledged");
        let c = revived.open(100.0).expect("open").next().await;
        assert_eq!(c, Some(Ok(first_two[0])));
    }
}
