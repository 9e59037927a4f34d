//! Generation lifecycle: one cancellable task per subscription.

mod handle;
#[allow(clippy::module_inception)]
mod session;

pub(crate) use handle::GenerationHandle;
pub use session::{GenerationFault, SampleListener, SignalSession};
