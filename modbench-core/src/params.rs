use crate::{ParameterError, HOLDING_REGISTER_BASE, INPUT_REGISTER_BASE, MAX_REGISTERS_PER_READ};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Which register table a run polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterType {
    /// Read-only input registers (function code 0x04).
    #[default]
    Input,
    /// Holding registers (function code 0x03).
    Holding,
}

impl RegisterType {
    fn map_base(&self) -> u32 {
        match self {
            RegisterType::Input => INPUT_REGISTER_BASE,
            RegisterType::Holding => HOLDING_REGISTER_BASE,
        }
    }

    /// Convert a configured address into the 0-based address sent on the wire.
    ///
    /// Addresses at or above the register-map base of this table (30001 for input, 40001 for
    /// holding) are treated as 1-based map notation and shifted down. Anything smaller is assumed
    /// to already be a protocol address.
    pub fn protocol_address(&self, configured: u32) -> Result<u16, ParameterError> {
        let base = self.map_base();
        let addr = if configured >= base {
            configured - base
        } else {
            configured
        };
        u16::try_from(addr).map_err(|_| ParameterError::InvalidAddress(configured))
    }
}

impl fmt::Display for RegisterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterType::Input => write!(f, "input"),
            RegisterType::Holding => write!(f, "holding"),
        }
    }
}

/// Spacing between request issue times at `frequency_hz`.
///
/// Rejects frequencies whose period is not a positive, representable [`Duration`].
pub fn poll_interval(frequency_hz: f64) -> Result<Duration, ParameterError> {
    if !frequency_hz.is_finite() || frequency_hz <= 0. {
        return Err(ParameterError::InvalidFrequency(frequency_hz));
    }
    match Duration::try_from_secs_f64(1. / frequency_hz) {
        Ok(period) if !period.is_zero() => Ok(period),
        _ => Err(ParameterError::InvalidFrequency(frequency_hz)),
    }
}

/// Inputs shared by every run of a test matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseParameters {
    /// 0-based protocol address of the first register.
    pub start_address: u16,
    pub register_type: RegisterType,
    pub duration: Duration,
}

impl BaseParameters {
    pub fn for_combination(&self, frequency_hz: f64, register_count: u16) -> RunParameters {
        RunParameters {
            frequency_hz,
            register_count,
            start_address: self.start_address,
            register_type: self.register_type,
            duration: self.duration,
        }
    }
}

/// Immutable input to a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunParameters {
    pub frequency_hz: f64,
    pub register_count: u16,
    /// 0-based protocol address of the first register.
    pub start_address: u16,
    pub register_type: RegisterType,
    pub duration: Duration,
}

impl RunParameters {
    pub fn validate(&self) -> Result<(), ParameterError> {
        poll_interval(self.frequency_hz)?;
        if self.register_count == 0 || self.register_count > MAX_REGISTERS_PER_READ {
            return Err(ParameterError::InvalidRegisterCount(self.register_count));
        }
        Ok(())
    }

    /// Target spacing between request issue times.
    pub fn interval(&self) -> Result<Duration, ParameterError> {
        poll_interval(self.frequency_hz)
    }
}

impl fmt::Display for RunParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}Hz, {} {} registers @ {}, {}",
            self.frequency_hz,
            self.register_count,
            self.register_type,
            self.start_address,
            humantime::format_duration(self.duration),
        )
    }
}
