//! # gaugelink
//!
//! **gaugelink** is the subscription and connection core of a gauge display.
//!
//! It links to a pluggable signal source, serializes lifecycle requests that
//! may arrive from any thread, keeps at most one value generation task alive
//! per subscription, and forwards changed values to a display surface on a
//! dedicated UI execution context.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  UI / system events
//!        │ on_max_value_changed / handle().submit(Command)
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  SubscriptionCoordinator                                          │
//! │  - CommandHandle (bounded intake, closed on stop)                 │
//! │  - Worker (single consumer, owns link + subscription)             │
//! │  - DispatchLoop (polls LastValue, forwards on the UI context)     │
//! │  - Bus + SubscriberSet (lifecycle events)                         │
//! └──────┬───────────────────────────┬───────────────────────┬────────┘
//!        ▼                           ▼                       │
//! ┌──────────────────┐       ┌──────────────────┐            │
//! │ConnectionManager │       │  SignalSession   │            │
//! │ CAS state machine│       │ cancel + join,   │            │
//! │ primary→fallback │       │ then spawn       │            │
//! └──────┬───────────┘       └──────┬───────────┘            │
//!        │ bind / ack / link        │ SampleStream           │
//!        ▼                          ▼                        ▼
//! ┌───────────────────────────────────────┐     ┌────────────────────┐
//! │ Provider ─► SignalSource              │     │ LastValue          │
//! │ (HostedProvider, LocalProvider)       │────►│ (epoch, f32) cell  │
//! └───────────────────────────────────────┘     └─────────┬──────────┘
//!                                                          ▼
//!                                        UiContext ─► DisplaySurface::update_value
//! ```
//!
//! ### Connection lifecycle
//! ```text
//! Idle ──connect──► Connecting ──bind──► AwaitingCallback ──ack──► Connected
//!  ▲                    │                      │                      │
//!  └────────────────────┴──── failure ─────────┘◄── disconnect/died ──┘
//! ```
//!
//! ## Features
//! | Area              | Description                                                 | Key types / traits                                  |
//! |-------------------|-------------------------------------------------------------|-----------------------------------------------------|
//! | **Coordinator**   | Serialized lifecycle commands, start/stop, view attachment. | [`SubscriptionCoordinator`], [`Command`]             |
//! | **Connection**    | Atomic state machine with provider fallback.                | [`ConnectionManager`], [`ConnectionListener`]        |
//! | **Generation**    | Single-flight sample generation with join-on-replace.      | [`SignalSession`]                                    |
//! | **Dispatch**      | Change-only forwarding on the UI context.                   | [`DispatchLoop`], [`UiContext`], [`DisplaySurface`]  |
//! | **Sources**       | Provider binding and built-in waveforms.                    | [`Provider`], [`SignalSource`], [`ProviderHost`]     |
//! | **Subscriber API**| Hook into lifecycle events.                                 | [`Subscribe`], [`LogWriter`]                         |
//! | **Errors**        | Typed errors with stable labels.                            | [`ConnectError`], [`CommandQueueError`]              |
//! | **Configuration** | Centralized runtime settings.                               | [`Config`]                                           |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use gaugelink::{Config, DisplaySurface, Gauge, LocalProvider, SubscriptionCoordinator, UiContext};
//!
//! struct Print;
//!
//! impl DisplaySurface for Print {
//!     fn update_value(&self, v: f32) {
//!         let _ = v;
//!     }
//! }
//!
//! #[tokio::main(flavor = "multi_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (ui, ui_thread) = UiContext::spawn("gauge-ui")?;
//!
//!     let coordinator = SubscriptionCoordinator::builder(Config::default(), ui)
//!         .with_fallback(LocalProvider::arc())
//!         .with_view(Arc::new(Print))
//!         .build();
//!
//!     coordinator.start().await?;
//!     coordinator.on_max_value_changed(Gauge::Speedometer.max_value()).await?;
//!     tokio::time::sleep(std::time::Duration::from_millis(50)).await;
//!     coordinator.stop().await?;
//!
//!     drop(coordinator);
//!     let _ = ui_thread.join();
//!     Ok(())
//! }
//! ```

mod config;
mod connection;
mod coordinator;
mod dispatch;
mod error;
mod gauge;
mod session;
mod source;

pub mod events;
pub mod subscribers;

// ---- Public re-exports ----

pub use config::Config;
pub use connection::{
    ConnectionHandle, ConnectionListener, ConnectionManager, ConnectionState, DisconnectReason,
};
pub use coordinator::{
    Command, CommandHandle, CoordinatorBuilder, Subscription, SubscriptionCoordinator,
};
pub use dispatch::{DispatchLoop, DisplaySurface, LastValue, Reading, UiContext, UiLoop, ViewSlot};
pub use error::{CommandQueueError, ConnectError, GenerationError, UiError};
pub use events::{Bus, Event, EventKind};
pub use gauge::Gauge;
pub use session::{GenerationFault, SampleListener, SignalSession};
pub use source::{
    BindAck, HostedProvider, LocalProvider, Link, PendingBind, Provider, ProviderHost,
    SampleStream, SignalSource, WaveShape, Waveform,
};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
