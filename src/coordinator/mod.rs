//! Command-serializing coordinator: intake, worker, lifecycle and builder.

mod builder;
mod command;
#[allow(clippy::module_inception)]
mod coordinator;
mod notifier;
mod worker;

pub use builder::CoordinatorBuilder;
pub use command::{Command, CommandHandle};
pub use coordinator::SubscriptionCoordinator;
pub use worker::Subscription;
