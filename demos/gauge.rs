//! # Example: gauge
//!
//! Drives a coordinator the way a gauge UI would.
//!
//! Shows how to:
//! - Build a [`SubscriptionCoordinator`] with a hosted primary and a local fallback.
//! - Render values on a dedicated UI thread through [`DisplaySurface`].
//! - Switch gauges, survive a provider crash and reconnect.
//!
//! ## Flow
//! ```text
//! start() ──► ConnectService ──► hosted provider
//! Speedometer (180) ─► Tachometer (80)
//! host.kill() ──► ProviderLost ──► ConnectService ──► local fallback
//! host.revive(), Disconnect + Connect ──► hosted provider again
//! stop() (or Ctrl-C)
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=gaugelink=debug cargo run --example gauge
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use gaugelink::{
    Command, Config, DisplaySurface, Gauge, LocalProvider, LogWriter, ProviderHost, Subscribe,
    SubscriptionCoordinator, UiContext,
};

/// Prints every value it receives, tagged with the rendering thread.
struct Needle;

impl DisplaySurface for Needle {
    fn update_value(&self, value: f32) {
        let thread = std::thread::current();
        println!(
            "[{}] needle -> {value:6.1}",
            thread.name().unwrap_or("<unnamed>")
        );
    }
}

async fn show(coordinator: &SubscriptionCoordinator, gauge: Gauge) -> anyhow::Result<()> {
    println!("== {} (max {}) ==", gauge.label(), gauge.max_value());
    coordinator.on_max_value_changed(gauge.max_value()).await?;
    tokio::time::sleep(Duration::from_millis(600)).await;
    Ok(())
}

async fn scenario(coordinator: &SubscriptionCoordinator, host: &ProviderHost) -> anyhow::Result<()> {
    let mut gauge = Gauge::default();
    show(coordinator, gauge).await?;
    gauge = gauge.toggle();
    show(coordinator, gauge).await?;

    println!("== killing host '{}' ==", host.name());
    host.kill();
    tokio::time::sleep(Duration::from_millis(100)).await;
    coordinator.handle().submit(Command::ConnectService).await?;
    show(coordinator, gauge).await?;

    println!("== reviving host '{}' ==", host.name());
    host.revive();
    let (disconnect, done) = Command::disconnect();
    coordinator.handle().submit(disconnect).await?;
    done.await?;
    coordinator.handle().submit(Command::ConnectService).await?;
    show(coordinator, gauge.toggle()).await?;
    Ok(())
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let (ui, ui_thread) = UiContext::spawn("gauge-ui")?;
    let host = ProviderHost::with_ack_delay("hosted", Duration::from_millis(20));

    let mut cfg = Config::default();
    cfg.dispatch_interval = Duration::from_millis(5);

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let coordinator = SubscriptionCoordinator::builder(cfg, ui)
        .with_primary(host.provider())
        .with_fallback(LocalProvider::arc())
        .with_subscribers(subs)
        .with_view(Arc::new(Needle))
        .build();

    coordinator.start().await?;
    tokio::select! {
        res = scenario(&coordinator, &host) => res?,
        _ = tokio::signal::ctrl_c() => println!("interrupted"),
    }
    coordinator.stop().await?;

    drop(coordinator);
    tokio::task::spawn_blocking(move || ui_thread.join())
        .await?
        .map_err(|_| anyhow::anyhow!("ui thread panicked"))?;
    Ok(())
}
