use crate::ErrorKind;
use std::time::Duration;
use thiserror::Error;

/// Error returned by a transport for a single connect or read.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::Timeout(_) => ErrorKind::Timeout,
            TransportError::Connection(_) => ErrorKind::Connection,
            TransportError::Protocol(_) => ErrorKind::Protocol,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("Frequency must be a positive, finite number of Hz; got {0}")]
    InvalidFrequency(f64),

    #[error("Register count must be between 1 and 125; got {0}")]
    InvalidRegisterCount(u16),

    #[error("Address {0} does not map to a 16-bit protocol address")]
    InvalidAddress(u32),
}

/// A run that could not be carried out at all.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FatalRunError {
    #[error("Unable to connect: {0}")]
    Connect(#[source] TransportError),

    #[error("Invalid run parameters: {0}")]
    InvalidParameters(#[from] ParameterError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unable to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<ParameterError> for ConfigError {
    fn from(err: ParameterError) -> Self {
        Self::Invalid(err.to_string())
    }
}
