//! Gauge presets: which max value the UI feeds to the coordinator.

/// A gauge face the UI can show.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Gauge {
    /// Speed in km/h.
    #[default]
    Speedometer,
    /// Engine speed in hundreds of rpm.
    Tachometer,
}

impl Gauge {
    /// Max value of the scale; passed to `on_max_value_changed` when the gauge is shown.
    ///
    /// # Example
    /// ```
    /// use gaugelink::Gauge;
    ///
    /// assert_eq!(Gauge::Speedometer.max_value(), 180.0);
    /// assert_eq!(Gauge::Speedometer.toggle(), Gauge::Tachometer);
    /// ```
    pub fn max_value(self) -> f32 {
        match self {
            Gauge::Speedometer => 180.0,
            Gauge::Tachometer => 80.0,
        }
    }

    /// The other gauge.
    pub fn toggle(self) -> Self {
        match self {
            Gauge::Speedometer => Gauge::Tachometer,
            Gauge::Tachometer => Gauge::Speedometer,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Gauge::Speedometer => "speedometer",
            Gauge::Tachometer => "tachometer",
        }
    }
}
