//! Event subscribers.
//!
//! - [`Subscribe`]: extension point for custom event handlers
//! - [`SubscriberSet`]: non-blocking fan-out with per-subscriber queues
//! - [`LogWriter`]: built-in subscriber that renders events through `tracing`

mod log;
mod set;
mod subscriber;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
