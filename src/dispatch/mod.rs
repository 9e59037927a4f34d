//! Delivery of sampled values to the display surface.

#[allow(clippy::module_inception)]
mod dispatch;
mod last_value;
mod surface;
mod ui;

pub use dispatch::DispatchLoop;
pub use last_value::{LastValue, Reading};
pub use surface::{DisplaySurface, ViewSlot};
pub use ui::{UiContext, UiLoop};
