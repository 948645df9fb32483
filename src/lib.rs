//! # LIDAR-Lite Optical Ranging Sensor Driver
//!
//! This crate provides a `no_std` driver for the Garmin/PulsedLight LIDAR-Lite optical distance
//! sensor. It is blocking by default; enable the `async` feature to get the same API on top of
//! `embedded-hal-async`.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use lidar_lite::LidarLite;
//!
//! let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
//! let delay = embedded_hal_mock::eh1::delay::NoopDelay;
//! let mut lidar = LidarLite::new(i2c, delay);
//!
//! lidar.reset().unwrap();
//! lidar.set_distance_only_mode().unwrap();
//!
//! let reading = lidar.get_distance().unwrap();
//! println!("Distance: {} cm", reading.value);
//! if !reading.health.is_healthy() {
//!     println!("Sensor health is degraded: {:?}", reading.health);
//! }
//! ```
//!
//! ## Sharing
//!
//! Every operation takes `&mut self`: a register sequence must never interleave with another one
//! on the same sensor. To use the sensor from several tasks, put the whole driver behind a mutex.
#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod fmt; // <-- must be first module!

mod error;
mod mode;
mod register;
mod status;
mod timing;

use core::time::Duration;

#[cfg(not(feature = "async"))]
use embedded_hal::{delay::DelayNs, i2c::I2c};
#[cfg(feature = "async")]
use embedded_hal_async::{delay::DelayNs, i2c::I2c};

pub use error::Error;
pub use mode::{
    decode_interval, decode_velocity, encode_interval, AcquisitionMode,
    DEFAULT_ACQUISITION_INTERVAL, INFINITE_ACQUISITIONS, MAX_ACQUISITION_INTERVAL,
    MIN_ACQUISITION_INTERVAL,
};
pub use register::Register;
pub use status::{Condition, Health, HealthDetail, Status};
pub use timing::Backoff;

use mode::DEFAULT_INTERVAL_VALUE;
use register::{command, control, power};
use timing::{as_delay_us, Clock};

/// Default 7-bit I2C address of the sensor.
pub const DEFAULT_ADDRESS: u8 = 0x62;

/// Default time to wait for the sensor to leave the busy state.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Pause between two attempts of [`LidarLite::get_distance`].
const RETRY_DELAY: Duration = Duration::from_millis(1);

/// Hardware and software revision of the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Version {
    /// Hardware revision (register 0x41)
    pub hardware: u8,
    /// Software revision (register 0x4f)
    pub software: u8,
}

/// A value read from the sensor together with the health reported while it was measured.
///
/// Degraded health does not invalidate the value, but it should be surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement<T> {
    /// The decoded value: cm for distance, cm/s for velocity
    pub value: T,
    /// Health status at the time of the measurement
    pub health: Health,
}

impl<T> Measurement<T> {
    /// Returns the value, or [`Error::Unhealthy`] if the sensor reported degraded health.
    ///
    /// # Errors
    ///
    /// * `Err(Error::Unhealthy(detail))` - If the health was degraded
    pub fn checked<E: core::fmt::Debug>(self) -> Result<T, Error<E>> {
        match self.health {
            Health::Healthy => Ok(self.value),
            Health::Degraded(detail) => Err(Error::Unhealthy(detail)),
        }
    }
}

/// LIDAR-Lite optical ranging sensor driver.
///
/// The driver owns the I2C bus, the delay provider and the device address. Time spent waiting
/// is measured by adding up the delays the driver issues, so the wait timeout does not include
/// the duration of the bus transfers themselves.
pub struct LidarLite<I2C, D> {
    /// I2C interface for communication with the sensor
    i2c: I2C,
    /// I2C address of the sensor
    address: u8,
    /// Delay implementation for polling backoff
    delay: D,
    /// Upper bound for every polling loop
    wait_timeout: Duration,
    clock: Clock,
}

impl<I2C, D> LidarLite<I2C, D> {
    /// Creates a new driver for a sensor at [`DEFAULT_ADDRESS`].
    ///
    /// No bus traffic happens here; call [`reset`](Self::reset) to bring the sensor into a known
    /// state.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use lidar_lite::LidarLite;
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
    ///
    /// let mut lidar = LidarLite::new(i2c, delay);
    /// ```
    ///
    /// # Default Configuration
    ///
    /// - **I2C Address**: 0x62
    /// - **Wait Timeout**: 2 seconds
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self::with_address(i2c, delay, DEFAULT_ADDRESS)
    }

    /// Creates a new driver for a sensor at `address`.
    pub fn with_address(i2c: I2C, delay: D, address: u8) -> Self {
        Self {
            i2c,
            address,
            delay,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            clock: Clock::default(),
        }
    }

    /// I2C address the driver talks to.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Current wait timeout.
    pub fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }

    /// Sets how long the driver waits for the sensor to leave the busy state.
    ///
    /// This bounds the worst-case latency of every operation that polls the status register,
    /// and of the whole retry loop in [`get_distance`](Self::get_distance).
    pub fn set_wait_timeout(&mut self, timeout: Duration) {
        self.wait_timeout = timeout;
    }

    /// Consumes the driver and returns the I2C bus and the delay provider.
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), keep_self),
    async(feature = "async", keep_self)
)]
impl<I2C, E, D> LidarLite<I2C, D>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
    D: DelayNs,
{
    /// Resets the sensor.
    ///
    /// Wakes the sensor, re-loads the FPGA from internal flash (self-test, all registers back
    /// to their defaults) and waits until the sensor is no longer busy.
    ///
    /// # Errors
    ///
    /// * `Err(Error::Timeout)` - If the sensor stayed busy for the whole wait timeout
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn reset(&mut self) -> Result<(), Error<E>> {
        // a sleeping sensor may not acknowledge the transfer that wakes it
        if self.wake().await.is_err() {
            debug!("Wake request was not acknowledged");
        }
        info!("Resetting sensor");
        self.write_byte(Register::Command, command::RESET).await?;
        self.wait_ready_for_command().await
    }

    /// Puts the sensor into sleep mode. The next bus transfer wakes it up.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn sleep(&mut self) -> Result<(), Error<E>> {
        debug!("Putting sensor to sleep");
        self.write_byte(Register::PowerControl, power::SLEEP).await
    }

    /// Wakes the sensor from sleep mode.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn wake(&mut self) -> Result<(), Error<E>> {
        self.write_byte(Register::PowerControl, power::AWAKE).await
    }

    /// Reads the status register once, without waiting.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn status(&mut self) -> Result<Status, Error<E>> {
        let status = Status::from_bits_retain(self.read_byte(Register::Status).await?);
        trace!("Status: {:?}", status);
        Ok(status)
    }

    /// Reads the hardware and software revision.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use lidar_lite::LidarLite;
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
    /// let mut lidar = LidarLite::new(i2c, delay);
    ///
    /// let version = lidar.version().unwrap();
    /// println!("hw {} sw {}", version.hardware, version.software);
    /// ```
    pub async fn version(&mut self) -> Result<Version, Error<E>> {
        let hardware = self.read_byte(Register::HardwareVersion).await?;
        let software = self.read_byte(Register::SoftwareVersion).await?;
        Ok(Version { hardware, software })
    }

    /// Sets the sensor to single distance acquisitions at the default interval.
    ///
    /// Call sequence: `set_distance_only_mode()`, `acquire(..)`, `read_distance()`.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn set_distance_only_mode(&mut self) -> Result<(), Error<E>> {
        self.configure(AcquisitionMode::DistanceOnly).await
    }

    /// Prepares the sensor for continuous distance measurement.
    ///
    /// After one [`acquire`](Self::acquire) the sensor takes `count` measurements, one every
    /// `interval`; pass [`INFINITE_ACQUISITIONS`] to never stop. Read the results in a loop with
    /// [`read_distance`](Self::read_distance).
    ///
    /// # Arguments
    ///
    /// * `count` - Number of acquisitions, `0xFF` for unbounded
    /// * `interval` - Delay between acquisitions, between [`MIN_ACQUISITION_INTERVAL`] and
    ///   [`MAX_ACQUISITION_INTERVAL`] or exactly [`DEFAULT_ACQUISITION_INTERVAL`]
    ///
    /// # Errors
    ///
    /// * `Err(Error::InvalidInterval)` - If the interval cannot be encoded; nothing is written
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use core::time::Duration;
    /// use lidar_lite::{LidarLite, INFINITE_ACQUISITIONS};
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
    /// let mut lidar = LidarLite::new(i2c, delay);
    ///
    /// lidar.set_continuous_mode(INFINITE_ACQUISITIONS, Duration::from_millis(20)).unwrap();
    /// lidar.acquire(true).unwrap();
    /// for _ in 0..10 {
    ///     let reading = lidar.read_distance().unwrap();
    ///     println!("Distance: {} cm", reading.value);
    /// }
    /// ```
    pub async fn set_continuous_mode(
        &mut self,
        count: u8,
        interval: Duration,
    ) -> Result<(), Error<E>> {
        self.configure(AcquisitionMode::Continuous { count, interval })
            .await
    }

    /// Prepares the sensor for a distance and velocity measurement.
    ///
    /// Velocity is derived from two distance samples `window` apart. Shorter windows make the
    /// velocity less precise.
    ///
    /// Call sequence: `set_distance_and_velocity_mode(..)`, `acquire(..)`, `read_distance()`,
    /// `read_velocity()`.
    ///
    /// # Errors
    ///
    /// * `Err(Error::InvalidInterval)` - If the window cannot be encoded; nothing is written
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn set_distance_and_velocity_mode(
        &mut self,
        window: Duration,
    ) -> Result<(), Error<E>> {
        self.configure(AcquisitionMode::DistanceAndVelocity { window })
            .await
    }

    /// Applies an acquisition mode: interval and velocity bit first, then the acquisition count.
    ///
    /// A failure part way leaves the sensor in an unknown mode; apply the whole mode again.
    ///
    /// # Errors
    ///
    /// * `Err(Error::InvalidInterval)` - If the interval cannot be encoded; nothing is written
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn configure(&mut self, mode: AcquisitionMode) -> Result<(), Error<E>> {
        debug!(
            "Configuring acquisition: count {}, velocity {}",
            mode.count(),
            mode.velocity()
        );
        self.set_acquisition_interval(mode.interval(), mode.velocity())
            .await?;
        self.set_acquisition_count(mode.count()).await
    }

    /// Sets the acquisition interval and enables or disables velocity mode.
    ///
    /// The default interval clears the custom interval bit and leaves the interval register
    /// untouched. Any other interval is written to the interval register in half-millisecond
    /// units before the custom interval bit is set.
    ///
    /// # Errors
    ///
    /// * `Err(Error::InvalidInterval)` - If the interval is outside the supported range; no
    ///   register is written in that case
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn set_acquisition_interval(
        &mut self,
        interval: Duration,
        velocity: bool,
    ) -> Result<(), Error<E>> {
        let custom = if interval == DEFAULT_ACQUISITION_INTERVAL {
            None
        } else if let Some(raw) = encode_interval(interval) {
            Some(raw)
        } else {
            error!("Invalid acquisition interval: {} us", as_delay_us(interval));
            return Err(Error::InvalidInterval);
        };

        let mut mode_control = self.read_byte(Register::ModeControl).await?;
        if velocity {
            mode_control |= control::VELOCITY_MODE;
        } else {
            mode_control &= !control::VELOCITY_MODE;
        }

        match custom {
            None => {
                self.write_byte(
                    Register::ModeControl,
                    mode_control & !control::CUSTOM_INTERVAL,
                )
                .await
            }
            Some(raw) => {
                self.write_byte(Register::MeasurementInterval, raw).await?;
                self.write_byte(
                    Register::ModeControl,
                    mode_control | control::CUSTOM_INTERVAL,
                )
                .await
            }
        }
    }

    /// Sets how many acquisitions follow one acquire command.
    ///
    /// `0` is a single shot, [`INFINITE_ACQUISITIONS`] never stops.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn set_acquisition_count(&mut self, count: u8) -> Result<(), Error<E>> {
        self.write_byte(Register::AcquisitionCount, count).await
    }

    /// Reads back the acquisition interval currently in effect.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn acquisition_interval(&mut self) -> Result<Duration, Error<E>> {
        let raw = self.interval_value().await?;
        Ok(decode_interval(raw))
    }

    /// Instructs the sensor to take a measurement.
    ///
    /// With `stabilize_preamp` the sensor runs DC correction first. That is slower, but it is
    /// needed roughly once every 100 acquisitions to stay accurate.
    ///
    /// # Errors
    ///
    /// * `Err(Error::Timeout)` - If the sensor stayed busy for the whole wait timeout
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn acquire(&mut self, stabilize_preamp: bool) -> Result<(), Error<E>> {
        self.wait_ready_for_command().await?;
        let command = if stabilize_preamp {
            command::ACQUIRE_STABILIZED
        } else {
            command::ACQUIRE
        };
        self.write_byte(Register::Command, command).await
    }

    /// Waits for the acquisition to complete and reads the distance in cm.
    ///
    /// Degraded health still returns the value, with the detail in
    /// [`Measurement::health`].
    ///
    /// # Errors
    ///
    /// * `Err(Error::MeasurementError)` - If the sensor detected an error; nothing is read
    /// * `Err(Error::SignalNotValid)` - If the return signal is not valid; nothing is read
    /// * `Err(Error::Timeout)` - If the sensor stayed busy for the whole wait timeout
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn read_distance(&mut self) -> Result<Measurement<u16>, Error<E>> {
        let health = self.wait_acquisition_ready().await?;
        let value = self.read_word(Register::Distance).await?;
        Ok(Measurement { value, health })
    }

    /// Waits for the acquisition to complete and reads the velocity in cm/s.
    ///
    /// The raw register is signed and scaled by the interval the measurement was taken with:
    /// the interval register when the custom interval bit is set, the default otherwise.
    ///
    /// # Errors
    ///
    /// Same as [`read_distance`](Self::read_distance).
    pub async fn read_velocity(&mut self) -> Result<Measurement<i16>, Error<E>> {
        let health = self.wait_acquisition_ready().await?;
        let scale = self.interval_value().await?;
        let raw = self.read_byte(Register::Velocity).await?;
        Ok(Measurement {
            value: decode_velocity(raw, scale),
            health,
        })
    }

    /// Takes a single distance measurement, retrying until it succeeds or the wait timeout
    /// runs out.
    ///
    /// Each attempt is `acquire(true)` followed by `read_distance()`; failed attempts are one
    /// millisecond apart. A reading with degraded health is retried as well, and returned if
    /// it is the last attempt.
    ///
    /// # Errors
    ///
    /// The error of the last attempt, or `Err(Error::I2cError(E))` if the acquisition count
    /// could not be reset.
    pub async fn get_distance(&mut self) -> Result<Measurement<u16>, Error<E>> {
        let deadline = self.clock.deadline(self.wait_timeout);
        self.set_acquisition_count(0).await?;
        loop {
            let attempt = self.measure_distance().await;
            if matches!(&attempt, Ok(reading) if reading.health.is_healthy()) {
                return attempt;
            }
            if deadline.expired(self.clock) {
                warn!("Giving up on distance measurement");
                return attempt;
            }
            self.pause(RETRY_DELAY).await;
        }
    }

    async fn measure_distance(&mut self) -> Result<Measurement<u16>, Error<E>> {
        self.acquire(true).await?;
        self.read_distance().await
    }

    /// Interval register value in effect: the register itself when the custom interval bit is
    /// set, the hardware default otherwise.
    async fn interval_value(&mut self) -> Result<u8, Error<E>> {
        let mode_control = self.read_byte(Register::ModeControl).await?;
        if mode_control & control::CUSTOM_INTERVAL == 0 {
            return Ok(DEFAULT_INTERVAL_VALUE);
        }
        self.read_byte(Register::MeasurementInterval).await
    }

    /// Polls the status register with exponential backoff until the busy bit clears.
    ///
    /// Bus errors count as "not ready" until the timeout; the last one is returned instead of
    /// [`Error::Timeout`] if the loop gives up right after it.
    async fn wait_ready_status(&mut self) -> Result<Status, Error<E>> {
        let deadline = self.clock.deadline(self.wait_timeout);
        let mut backoff = Backoff::default();
        loop {
            let failure = match self.status().await {
                Ok(status) if status.is_ready() => return Ok(status),
                Ok(_) => Error::Timeout,
                Err(e) => e,
            };
            if deadline.expired(self.clock) {
                warn!("Timed out waiting for non-busy status");
                return Err(failure);
            }
            self.pause(backoff.next_delay()).await;
        }
    }

    async fn wait_ready_for_command(&mut self) -> Result<(), Error<E>> {
        self.wait_ready_status().await?;
        Ok(())
    }

    async fn wait_acquisition_ready(&mut self) -> Result<Health, Error<E>> {
        let status = self.wait_ready_status().await?;
        match Condition::classify(status) {
            Condition::Ready => Ok(Health::Healthy),
            Condition::Degraded => {
                let detail = self.health_detail().await;
                warn!("Sensor health degraded: {:?}", detail);
                Ok(Health::Degraded(detail))
            }
            Condition::ErrorDetected => {
                error!("Error detected during measurement");
                Err(Error::MeasurementError)
            }
            Condition::SignalNotValid => {
                debug!("Received signal is not valid");
                Err(Error::SignalNotValid)
            }
        }
    }

    /// Failed subsystems, or an empty set if the detail register cannot be read.
    async fn health_detail(&mut self) -> HealthDetail {
        match self.read_byte(Register::HealthStatus).await {
            Ok(bits) => HealthDetail::from_bits_truncate(bits),
            Err(_) => {
                debug!("Health detail unavailable");
                HealthDetail::empty()
            }
        }
    }

    async fn pause(&mut self, duration: Duration) {
        self.delay.delay_us(as_delay_us(duration)).await;
        self.clock.advance(duration);
    }

    /// Writes a single byte to a sensor register.
    ///
    /// This is a low-level function; most applications should use the higher-level functions
    /// instead.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use lidar_lite::{LidarLite, Register};
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
    /// let mut lidar = LidarLite::new(i2c, delay);
    ///
    /// // Maximum acquisition count, register 0x02
    /// lidar.write_byte(0x02u8, 0x80).unwrap();
    /// lidar.write_byte(Register::AcquisitionCount, 0).unwrap();
    /// ```
    pub async fn write_byte<R>(&mut self, register_address: R, value: u8) -> Result<(), Error<E>>
    where
        R: Into<u8>,
    {
        let reg: u8 = register_address.into();
        self.i2c.write(self.address, &[reg, value]).await?;
        Ok(())
    }

    /// Reads a single byte from a sensor register.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn read_byte<R>(&mut self, register_address: R) -> Result<u8, Error<E>>
    where
        R: Into<u8>,
    {
        let reg: u8 = register_address.into();
        let mut read_buffer = [0u8; 1];
        self.i2c
            .write_read(self.address, &[reg], &mut read_buffer)
            .await?;
        Ok(read_buffer[0])
    }

    /// Reads a 16-bit word, high byte first, starting at a sensor register.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn read_word<R>(&mut self, register_address: R) -> Result<u16, Error<E>>
    where
        R: Into<u8>,
    {
        let reg: u8 = register_address.into();
        let mut read_buffer = [0u8; 2];
        self.i2c
            .write_read(self.address, &[reg], &mut read_buffer)
            .await?;
        Ok(u16::from_be_bytes(read_buffer))
    }
}
