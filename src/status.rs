//! Status register bits and the health classification built on top of them.

use bitflags::bitflags;

bitflags! {
    /// Contents of the status register (0x01).
    ///
    /// The register is read fresh on every poll; a `Status` value describes a single read.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        /// An acquisition is in progress
        const BUSY = 1 << 0;
        /// The reference signal reached maximum strength before the acquisition count
        const REFERENCE_OVERFLOW = 1 << 1;
        /// The return signal reached maximum strength before the acquisition count
        const SIGNAL_OVERFLOW = 1 << 2;
        /// Correlation peak is at or below the correlation record threshold
        const SIGNAL_NOT_VALID = 1 << 3;
        /// Secondary return detected above the correlation noise floor
        const SECONDARY_RETURN = 1 << 4;
        /// Preamp works, transmit power is active and a reference pulse was stored
        const HEALTHY = 1 << 5;
        /// An error was detected and the measurement is invalid
        const ERROR_DETECTED = 1 << 6;
        /// Eye-safety limit reached
        const EYE_SAFETY_ACTIVATED = 1 << 7;
    }
}

bitflags! {
    /// Detailed health flags (register 0x48), one bit per failed subsystem.
    ///
    /// An empty set still means the device is unhealthy, only the cause is unknown.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HealthDetail: u8 {
        /// No valid reference signal
        const REFERENCE_SIGNAL = 1 << 0;
        /// Transmit power is not active
        const TRANSMIT_POWER = 1 << 1;
        /// DC level of the preamplifier is out of range
        const DC_PREAMP = 1 << 2;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Status {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Status({=u8:08b})", self.bits());
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for HealthDetail {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "HealthDetail({=u8:08b})", self.bits());
    }
}

impl Status {
    /// Returns `true` when no acquisition is in progress.
    #[must_use]
    pub fn is_ready(self) -> bool {
        !self.contains(Status::BUSY)
    }
}

impl core::fmt::Display for HealthDetail {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_empty() {
            return f.write_str("failed to reach healthy status");
        }
        let mut first = true;
        for (name, flag) in [
            ("reference signal", HealthDetail::REFERENCE_SIGNAL),
            ("transmit power", HealthDetail::TRANSMIT_POWER),
            ("DC/preamplifier", HealthDetail::DC_PREAMP),
        ] {
            if self.contains(flag) {
                if !first {
                    f.write_str(", ")?;
                }
                write!(f, "{name} failure")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Health attached to a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Health {
    /// The device reported healthy status
    Healthy,
    /// The device reported degraded health; the value may still be usable
    Degraded(HealthDetail),
}

impl Health {
    /// Returns `true` when the device reported healthy status.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        matches!(self, Health::Healthy)
    }
}

/// Outcome of interpreting a non-busy status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Condition {
    /// Healthy and the measurement is valid
    Ready,
    /// Healthy bit clear; the detail register should be consulted
    Degraded,
    /// Error detected, the measurement must not be trusted
    ErrorDetected,
    /// Correlation peak too low, the measurement must not be trusted
    SignalNotValid,
}

impl Condition {
    /// Classifies a status value.
    ///
    /// Checks run in the order healthy, error detected, signal not valid and the last
    /// condition found wins, so both fatal conditions override degraded health and
    /// `SignalNotValid` overrides `ErrorDetected`.
    #[must_use]
    pub fn classify(status: Status) -> Self {
        let mut condition = Condition::Ready;
        if !status.contains(Status::HEALTHY) {
            condition = Condition::Degraded;
        }
        if status.contains(Status::ERROR_DETECTED) {
            condition = Condition::ErrorDetected;
        }
        if status.contains(Status::SIGNAL_NOT_VALID) {
            condition = Condition::SignalNotValid;
        }
        condition
    }

    /// Returns `true` when the measurement must be discarded.
    #[must_use]
    pub fn is_fatal(self) -> bool {
        matches!(self, Condition::ErrorDetected | Condition::SignalNotValid)
    }
}
