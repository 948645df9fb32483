use crate::status::HealthDetail;

/// Error type for LIDAR-Lite operations.
///
/// Bus errors are passed through unmodified; the driver never retries a failed transfer
/// outside of the status polling loop.
///
/// # Examples
///
/// ```rust,no_run
/// use lidar_lite::{Error, LidarLite};
///
/// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
/// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
/// let mut lidar = LidarLite::new(i2c, delay);
///
/// match lidar.read_distance() {
///     Ok(reading) => println!("Distance: {} cm", reading.value),
///     Err(Error::Timeout) => println!("Sensor stayed busy"),
///     Err(Error::MeasurementError | Error::SignalNotValid) => println!("Invalid measurement"),
///     Err(e) => println!("Failed: {e}"),
/// }
/// ```
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E: core::fmt::Debug> {
    /// I2C communication error from the underlying hardware
    I2cError(E),
    /// The sensor did not leave the busy state within the wait timeout
    Timeout,
    /// The requested acquisition interval cannot be encoded
    InvalidInterval,
    /// The sensor reported degraded health; the reading may still be usable
    Unhealthy(HealthDetail),
    /// The sensor detected an error during the measurement
    MeasurementError,
    /// The received signal is not valid
    SignalNotValid,
}

impl<E: core::fmt::Debug> Error<E> {
    /// Returns `true` for the advisory health condition, which does not invalidate a reading.
    #[must_use]
    pub fn is_soft(&self) -> bool {
        matches!(self, Error::Unhealthy(_))
    }
}

impl<E: core::fmt::Debug> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::I2cError(e) => write!(f, "I2C error: {e:?}"),
            Error::Timeout => f.write_str("timed out waiting for non-busy status"),
            Error::InvalidInterval => f.write_str("measurement interval is not achievable"),
            Error::Unhealthy(detail) => write!(f, "unhealthy: {detail}"),
            Error::MeasurementError => f.write_str("error detected during measurement"),
            Error::SignalNotValid => f.write_str("received signal is not valid"),
        }
    }
}

impl<E: core::fmt::Debug> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Error::I2cError(error)
    }
}
