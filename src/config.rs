//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for the coordinator runtime.
//!
//! ## Sentinel values
//! - `connect_timeout = 0s` → wait for the provider acknowledgement indefinitely
//! - `command_capacity = 0` / `bus_capacity = 0` → clamped to 1
//! - `dispatch_interval < 1ms` → clamped to 1ms

use std::time::Duration;

/// Smallest dispatch interval accepted by the runtime.
const MIN_DISPATCH_INTERVAL: Duration = Duration::from_millis(1);

/// Global configuration for the coordinator runtime.
///
/// ## Field semantics
/// - `dispatch_interval`: period of the LastValue polling loop
/// - `connect_timeout`: bound on the bind acknowledgement wait (`0s` = unbounded)
/// - `command_capacity`: size of the coordinator command queue
/// - `bus_capacity`: event bus ring buffer size
///
/// ## Notes
/// All fields are public. Prefer the helper accessors over sprinkling sentinel
/// checks across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Period of the dispatch loop that polls the last sampled value.
    ///
    /// Recommended range is 1ms..10ms.
    pub dispatch_interval: Duration,

    /// Maximum time `connect()` waits for the provider acknowledgement.
    ///
    /// - `Duration::ZERO` = wait indefinitely
    /// - `> 0` = fail with `ConnectError::Timeout` after this long
    pub connect_timeout: Duration,

    /// Capacity of the coordinator command queue.
    ///
    /// When full, `submit()` waits and `try_submit()` fails.
    pub command_capacity: usize,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,
}

impl Config {
    /// Returns the connect acknowledgement timeout as an `Option`.
    ///
    /// - `None` → wait indefinitely
    /// - `Some(d)` → bounded wait
    #[inline]
    pub fn connect_timeout(&self) -> Option<Duration> {
        if self.connect_timeout == Duration::ZERO {
            None
        } else {
            Some(self.connect_timeout)
        }
    }

    /// Returns the dispatch interval clamped to a minimum of 1ms.
    #[inline]
    pub fn dispatch_interval_clamped(&self) -> Duration {
        self.dispatch_interval.max(MIN_DISPATCH_INTERVAL)
    }

    /// Returns the command queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn command_capacity_clamped(&self) -> usize {
        self.command_capacity.max(1)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `dispatch_interval = 1ms`
    /// - `connect_timeout = 5s`
    /// - `command_capacity = 10`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            dispatch_interval: Duration::from_millis(1),
            connect_timeout: Duration::from_secs(5),
            command_capacity: 10,
            bus_capacity: 1024,
        }
    }
}
