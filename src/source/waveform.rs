//! # Waveform generators.
//!
//! Pure sample sequences served by the built-in providers:
//!
//! | Shape       | Interval | Step                   | Sample                                   |
//! |-------------|----------|------------------------|------------------------------------------|
//! | `Rectified` | 10ms     | `phase += 0.01`        | `max · |sin(phase)|`, wraps past π/2 + 2π |
//! | `DualSine`  | 100ms    | `x += 10`              | `max · (sin(2πx/500) + sin(πx/300)) / 2`  |
//!
//! Negative `DualSine` values are skipped: [`Waveform::next_sample`] keeps
//! stepping until it finds a non-negative one (bounded by one full period).
//!
//! Pacing differs per shape: `Rectified` waits one interval before every
//! sample, `DualSine` emits its first sample immediately and waits after each.
//! A `DualSine` generator can be shared between streams
//! ([`Waveform::shared_stream`]) so the sequence continues across
//! subscriptions instead of restarting at `x = 0`.

use std::f32::consts::PI;
use std::sync::Arc;
use std::time::Duration;

use futures::stream;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::GenerationError;
use crate::source::SampleStream;

const RECTIFIED_INTERVAL: Duration = Duration::from_millis(10);
const RECTIFIED_STEP: f32 = 0.01;
const RECTIFIED_WRAP: f32 = PI / 2.0 + 2.0 * PI;

const DUAL_SINE_INTERVAL: Duration = Duration::from_millis(100);
const DUAL_SINE_STEP: f32 = 10.0;
const DUAL_SINE_PERIOD_A: f32 = 500.0;
const DUAL_SINE_PERIOD_B: f32 = 300.0;
/// Steps in one full period of the combined wave (lcm(500, 600) / 10).
const DUAL_SINE_PERIOD_STEPS: usize = 300;

/// Shape of a [`Waveform`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaveShape {
    /// Rectified sine served by the in-process provider.
    Rectified,
    /// Average of two sines served by the hosted provider.
    DualSine,
}

/// Stateful sample generator.
#[derive(Clone, Debug)]
pub struct Waveform {
    shape: WaveShape,
    max_value: f32,
    position: f32,
}

impl Waveform {
    pub fn rectified(max_value: f32) -> Self {
        Self {
            shape: WaveShape::Rectified,
            max_value,
            position: 0.0,
        }
    }

    pub fn dual_sine(max_value: f32) -> Self {
        Self {
            shape: WaveShape::DualSine,
            max_value,
            position: 0.0,
        }
    }

    pub fn shape(&self) -> WaveShape {
        self.shape
    }

    pub fn max_value(&self) -> f32 {
        self.max_value
    }

    /// Rescales later samples; the position is kept.
    pub fn set_max_value(&mut self, max_value: f32) {
        self.max_value = max_value;
    }

    /// True if the first sample of a stream is emitted without waiting.
    pub fn emits_immediately(&self) -> bool {
        matches!(self.shape, WaveShape::DualSine)
    }

    /// Delay between two consecutive samples.
    pub fn interval(&self) -> Duration {
        match self.shape {
            WaveShape::Rectified => RECTIFIED_INTERVAL,
            WaveShape::DualSine => DUAL_SINE_INTERVAL,
        }
    }

    /// Advances one step and returns the raw value (may be negative for `DualSine`).
    pub fn step(&mut self) -> f32 {
        match self.shape {
            WaveShape::Rectified => {
                self.position += RECTIFIED_STEP;
                if self.position > RECTIFIED_WRAP {
                    self.position = 0.0;
                }
                self.max_value * self.position.sin().abs()
            }
            WaveShape::DualSine => {
                self.position += DUAL_SINE_STEP;
                let x = self.position;
                let wave = ((2.0 * PI * x / DUAL_SINE_PERIOD_A).sin()
                    + (PI * x / DUAL_SINE_PERIOD_B).sin())
                    / 2.0;
                self.max_value * wave
            }
        }
    }

    /// Returns the next deliverable sample, skipping negative values.
    ///
    /// Falls back to `0.0` if a whole period yields nothing deliverable.
    pub fn next_sample(&mut self) -> f32 {
        for _ in 0..DUAL_SINE_PERIOD_STEPS {
            let value = self.step();
            if value >= 0.0 || value.is_nan() {
                return value;
            }
        }
        0.0
    }

    /// Turns the waveform into a paced sample stream.
    ///
    /// When `host` is cancelled the stream yields `Err(ProviderDied)` once and ends.
    pub fn into_stream(self, host: CancellationToken) -> SampleStream {
        paced(Arc::new(Mutex::new(self)), host)
    }

    /// Opens a paced stream over a generator shared with earlier streams.
    ///
    /// `max_value` applies from the next sample on; the position carries over.
    pub fn shared_stream(
        shared: &Arc<Mutex<Waveform>>,
        max_value: f32,
        host: CancellationToken,
    ) -> SampleStream {
        shared.lock().set_max_value(max_value);
        paced(Arc::clone(shared), host)
    }
}

#[derive(Clone, Copy)]
enum Pace {
    Immediate,
    Wait,
    Done,
}

fn paced(wave: Arc<Mutex<Waveform>>, host: CancellationToken) -> SampleStream {
    let (interval, start) = {
        let w = wave.lock();
        let start = if w.emits_immediately() {
            Pace::Immediate
        } else {
            Pace::Wait
        };
        (w.interval(), start)
    };

    Box::pin(stream::unfold(
        (wave, host, start),
        move |(wave, host, pace)| async move {
            match pace {
                Pace::Done => return None,
                Pace::Immediate if host.is_cancelled() => {
                    return Some((Err(GenerationError::ProviderDied), (wave, host, Pace::Done)));
                }
                Pace::Immediate => {}
                Pace::Wait => {
                    tokio::select! {
                        biased;
                        _ = host.cancelled() => {
                            return Some((
                                Err(GenerationError::ProviderDied),
                                (wave, host, Pace::Done),
                            ));
                        }
                        _ = tokio::time::sleep(interval) => {}
                    }
                }
            }
            let value = wave.lock().next_sample();
            Some((Ok(value), (wave, host, Pace::Wait)))
        },
    ))
}
