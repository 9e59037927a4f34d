//! # Signal source abstraction.
//!
//! A [`SignalSource`] is the bound side of a provider: given a max value it
//! opens a stream of scalar samples. The stream is polled by exactly one
//! generation task (see [`SignalSession`](crate::SignalSession)), which
//! drops it on cancellation.

use std::pin::Pin;

use futures::Stream;

use crate::error::GenerationError;

/// Boxed stream of samples produced for one subscription.
///
/// `Err(ProviderDied)` is terminal; the stream ends after yielding it.
pub type SampleStream = Pin<Box<dyn Stream<Item = Result<f32, GenerationError>> + Send>>;

/// A bound source of scalar samples.
pub trait SignalSource: Send + Sync + 'static {
    /// Returns a stable, human-readable source name.
    fn name(&self) -> &str;

    /// Opens a sample stream parameterized by `max_value`.
    ///
    /// Fails with `ProviderDied` when the host is already gone.
    fn open(&self, max_value: f32) -> Result<SampleStream, GenerationError>;
}

impl std::fmt::Debug for dyn SignalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalSource")
            .field("name", &self.name())
            .finish()
    }
}
