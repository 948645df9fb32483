//! Acquisition modes and the unit conversions for the interval and velocity registers.

use core::time::Duration;

/// Hardware default of the interval register, 10 Hz.
pub(crate) const DEFAULT_INTERVAL_VALUE: u8 = 0xc8;
/// Smallest interval register value for proper operation.
pub(crate) const MIN_INTERVAL_VALUE: u8 = 0x02;
pub(crate) const MAX_INTERVAL_VALUE: u8 = 0xff;

/// Interval used when the custom interval bit is clear (100 ms).
pub const DEFAULT_ACQUISITION_INTERVAL: Duration =
    Duration::from_millis((DEFAULT_INTERVAL_VALUE >> 1) as u64);
/// Shortest interval accepted by [`set_continuous_mode`](crate::LidarLite::set_continuous_mode).
pub const MIN_ACQUISITION_INTERVAL: Duration =
    Duration::from_millis((MIN_INTERVAL_VALUE >> 1) as u64);
/// Longest interval accepted by [`set_continuous_mode`](crate::LidarLite::set_continuous_mode).
pub const MAX_ACQUISITION_INTERVAL: Duration =
    Duration::from_millis((MAX_INTERVAL_VALUE >> 1) as u64);

/// Acquisition count that makes the sensor measure forever.
pub const INFINITE_ACQUISITIONS: u8 = 0xff;

/// Measurement setup applied with [`configure`](crate::LidarLite::configure).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionMode {
    /// Single distance acquisition at the default interval
    DistanceOnly,
    /// Repeated distance acquisitions, `count` of them ([`INFINITE_ACQUISITIONS`] for no
    /// limit) separated by `interval`
    Continuous {
        /// Number of acquisitions after each acquire command
        count: u8,
        /// Delay between two acquisitions
        interval: Duration,
    },
    /// Single acquisition with velocity measured over `window`
    DistanceAndVelocity {
        /// Time between the two distance samples used for velocity
        window: Duration,
    },
}

impl AcquisitionMode {
    /// Interval requested by the mode.
    #[must_use]
    pub fn interval(&self) -> Duration {
        match *self {
            AcquisitionMode::DistanceOnly => DEFAULT_ACQUISITION_INTERVAL,
            AcquisitionMode::Continuous { interval, .. } => interval,
            AcquisitionMode::DistanceAndVelocity { window } => window,
        }
    }

    /// Whether velocity mode must be enabled.
    #[must_use]
    pub fn velocity(&self) -> bool {
        matches!(self, AcquisitionMode::DistanceAndVelocity { .. })
    }

    /// Value written to the acquisition count register.
    #[must_use]
    pub fn count(&self) -> u8 {
        match *self {
            AcquisitionMode::Continuous { count, .. } => count,
            _ => 0,
        }
    }
}

/// Translates an interval into half-millisecond register units.
///
/// Returns `None` when the value falls outside the range the sensor supports.
#[must_use]
pub fn encode_interval(interval: Duration) -> Option<u8> {
    let raw = interval.as_nanos() * 2 / 1_000_000;
    if raw < u128::from(MIN_INTERVAL_VALUE) || raw > u128::from(MAX_INTERVAL_VALUE) {
        return None;
    }
    u8::try_from(raw).ok()
}

/// Inverse of [`encode_interval`].
#[must_use]
pub fn decode_interval(raw: u8) -> Duration {
    Duration::from_micros(u64::from(raw) * 500)
}

/// Converts the raw velocity register into cm/s.
///
/// The register is read as a byte but holds a signed value; `scale` is the interval register
/// value the measurement was taken with.
#[must_use]
#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
pub fn decode_velocity(raw: u8, scale: u8) -> i16 {
    // |raw * scale / 20| <= 128 * 255 / 20, always fits
    (i32::from(raw as i8) * i32::from(scale) / 20) as i16
}
