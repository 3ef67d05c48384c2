use crate::TransportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Timeout,
    Connection,
    Protocol,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Connection => write!(f, "connection"),
            ErrorKind::Protocol => write!(f, "protocol"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// The device answered with the requested number of registers.
    Success { registers: u16 },
    Failure { kind: ErrorKind, detail: String },
}

/// Result of one request within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Issue time, measured on the monotonic clock from the start of the run.
    pub offset: Duration,
    /// Time from issue until the response arrived or the request failed.
    pub latency: Duration,
    pub status: OutcomeStatus,
}

impl Outcome {
    pub fn success(offset: Duration, latency: Duration, registers: u16) -> Self {
        Self {
            offset,
            latency,
            status: OutcomeStatus::Success { registers },
        }
    }

    pub fn failure(offset: Duration, latency: Duration, error: &TransportError) -> Self {
        Self {
            offset,
            latency,
            status: OutcomeStatus::Failure {
                kind: error.kind(),
                detail: error.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Success { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.status {
            OutcomeStatus::Success { .. } => None,
            OutcomeStatus::Failure { kind, .. } => Some(*kind),
        }
    }

    pub fn error_detail(&self) -> Option<&str> {
        match &self.status {
            OutcomeStatus::Success { .. } => None,
            OutcomeStatus::Failure { detail, .. } => Some(detail),
        }
    }

    pub fn latency_ms(&self) -> f64 {
        self.latency.as_nanos() as f64 / 1e6
    }
}
