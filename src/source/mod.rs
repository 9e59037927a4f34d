//! Signal sources and the providers that bind them.
//!
//! - [`Provider`], [`PendingBind`], [`BindAck`], [`Link`]: two-phase binding
//! - [`SignalSource`], [`SampleStream`]: the bound side
//! - [`Waveform`]: built-in sample generators
//! - [`LocalProvider`]: in-process fallback
//! - [`ProviderHost`], [`HostedProvider`]: primary, killable host

mod hosted;
mod local;
mod provider;
#[allow(clippy::module_inception)]
mod source;
mod waveform;

pub use hosted::{HostedProvider, ProviderHost};
pub use local::LocalProvider;
pub use provider::{BindAck, Link, PendingBind, Provider};
pub use source::{SampleStream, SignalSource};
pub use waveform::{WaveShape, Waveform};
