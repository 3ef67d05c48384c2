use crate::{ErrorKind, FatalRunError, RegisterType, RunParameters};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Latency distribution of the successful requests of a run, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub mean_ms: f64,
    pub median_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    /// Population standard deviation.
    pub stddev_ms: f64,
    pub samples: u64,
}

/// Failed request counts per error kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBreakdown {
    pub timeout: u64,
    pub connection: u64,
    pub protocol: u64,
}

impl ErrorBreakdown {
    pub fn count(&mut self, kind: ErrorKind) {
        match kind {
            ErrorKind::Timeout => self.timeout += 1,
            ErrorKind::Connection => self.connection += 1,
            ErrorKind::Protocol => self.protocol += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.timeout + self.connection + self.protocol
    }
}

/// Reduced result of one (frequency, register count) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub frequency_hz: f64,
    pub register_count: u16,
    pub start_address: u16,
    pub register_type: RegisterType,
    pub duration_secs: f64,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Fraction of successful requests, `0.` for an empty run.
    pub success_rate: f64,
    /// No request was issued, so `success_rate` carries no information.
    pub empty_run: bool,
    /// `None` when no request succeeded.
    pub latency: Option<LatencyStats>,
    pub dropout_count: u64,
    pub max_consecutive_failures: u64,
    pub errors: ErrorBreakdown,
    /// Set when the run could not be carried out at all.
    pub fatal_error: Option<String>,
}

impl SummaryRecord {
    /// Degenerate record for a run that never issued a request.
    pub fn fatal(params: &RunParameters, error: &FatalRunError) -> Self {
        Self {
            frequency_hz: params.frequency_hz,
            register_count: params.register_count,
            start_address: params.start_address,
            register_type: params.register_type,
            duration_secs: params.duration.as_secs_f64(),
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            success_rate: 0.,
            empty_run: true,
            latency: None,
            dropout_count: 0,
            max_consecutive_failures: 0,
            errors: ErrorBreakdown::default(),
            fatal_error: Some(error.to_string()),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal_error.is_some()
    }

    pub fn success_percent(&self) -> f64 {
        self.success_rate * 100.
    }
}

impl fmt::Display for SummaryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(error) = &self.fatal_error {
            return write!(f, "FAILED: {error}");
        }

        write!(
            f,
            "Success={:.1}% ({}/{}), ",
            self.success_percent(),
            self.successful_requests,
            self.total_requests,
        )?;
        match &self.latency {
            Some(latency) => write!(
                f,
                "AvgLatency={:.2}ms, MedLatency={:.2}ms, ",
                latency.mean_ms, latency.median_ms
            )?,
            None => write!(f, "AvgLatency=-, MedLatency=-, ")?,
        }
        write!(
            f,
            "Dropouts={}, MaxFails={}",
            self.dropout_count, self.max_consecutive_failures
        )
    }
}
