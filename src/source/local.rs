//! # In-process provider.
//!
//! [`LocalProvider`] is the fallback strategy: it is always available,
//! acknowledges a bind immediately and serves a rectified sine
//! ([`Waveform::rectified`]).

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::GenerationError;
use crate::source::{Link, PendingBind, Provider, SampleStream, SignalSource, Waveform};

const LOCAL_NAME: &str = "local";

/// In-process provider; never dies on its own.
#[derive(Debug, Default)]
pub struct LocalProvider {
    scope: CancellationToken,
}

impl LocalProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the provider and returns it as a shared handle.
    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Provider for LocalProvider {
    fn name(&self) -> &str {
        LOCAL_NAME
    }

    fn bind(&self) -> Option<PendingBind> {
        let (pending, ack) = PendingBind::new(Link::child_of(&self.scope));
        ack.acknowledge(Arc::new(LocalSource {
            scope: self.scope.clone(),
        }));
        tracing::trace!(provider = LOCAL_NAME, "local bind acknowledged");
        Some(pending)
    }
}

/// Source served by [`LocalProvider`].
#[derive(Debug)]
struct LocalSource {
    scope: CancellationToken,
}

impl SignalSource for LocalSource {
    fn name(&self) -> &str {
        LOCAL_NAME
    }

    fn open(&self, max_value: f32) -> Result<SampleStream, GenerationError> {
        Ok(Waveform::rectified(max_value).into_stream(self.scope.clone()))
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    async fn bind_is_acknowledged_immediately() {
        let provider = LocalProvider::new();
        let pending = provider.bind().expect("local provider always binds");
        assert!(!pending.link().is_dead());

        let source = pending.ack.await.expect("acknowledged");
        assert_eq!(source.name(), "local");

        let mut samples = source.open(50.0).expect("open");
        let v = samples.next().await.expect("sample").expect("ok");
        assert!((0.0..=50.0).contains(&v));
    }
}
