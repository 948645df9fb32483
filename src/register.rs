//! Register map of the LIDAR-Lite sensor.

/// Register addresses for the LIDAR-Lite sensor.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// Device command register (0x00)
    Command = 0x00,
    /// System status register (0x01)
    Status = 0x01,
    /// Acquisition mode control register (0x04)
    ModeControl = 0x04,
    /// Velocity measurement output (0x09), signed
    Velocity = 0x09,
    /// Number of acquisitions to repeat (0x11)
    AcquisitionCount = 0x11,
    /// Hardware revision (0x41)
    HardwareVersion = 0x41,
    /// Delay between automatic measurements, also the velocity scale (0x45)
    MeasurementInterval = 0x45,
    /// Detailed health flags (0x48)
    HealthStatus = 0x48,
    /// Software revision (0x4f)
    SoftwareVersion = 0x4f,
    /// Power state control (0x65)
    PowerControl = 0x65,
    /// Distance measurement, high byte first with auto-increment (0x8f)
    Distance = 0x8f,
}

impl From<Register> for u8 {
    fn from(r: Register) -> Self {
        r as u8
    }
}

/// Values written to [`Register::Command`].
pub(crate) mod command {
    /// Reload the FPGA from flash and reset every register to its default
    pub const RESET: u8 = 0x00;
    /// Take a distance measurement without DC correction
    pub const ACQUIRE: u8 = 0x03;
    /// Take a distance measurement with preamp/DC stabilization
    pub const ACQUIRE_STABILIZED: u8 = 0x04;
}

/// Bits of [`Register::ModeControl`].
pub(crate) mod control {
    /// Use the interval register instead of the hardware default
    pub const CUSTOM_INTERVAL: u8 = 1 << 5;
    pub const VELOCITY_MODE: u8 = 1 << 7;
}

/// Values written to [`Register::PowerControl`].
pub(crate) mod power {
    pub const AWAKE: u8 = 0x80;
    /// Device sleep; the sensor wakes up on the next bus transaction
    pub const SLEEP: u8 = 0x84;
}
