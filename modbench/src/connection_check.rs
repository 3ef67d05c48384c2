//! One-shot connectivity check: connect and read a few block sizes before committing to a
//! long matrix.
use crate::transport::{Connector, Transport};
use modbench_core::{RegisterType, TransportError};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn};

const SHOWN_VALUES: usize = 3;

/// Result of reading one block size during a connection check.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockReading {
    pub count: u16,
    pub latency: Duration,
    /// The first few register values, or the read error.
    pub result: Result<Vec<u16>, TransportError>,
}

impl BlockReading {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

impl fmt::Display for BlockReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(values) => write!(
                f,
                "Reading {} registers: OK in {:.2}ms, first values {:?}",
                self.count,
                self.latency.as_secs_f64() * 1e3,
                values
            ),
            Err(err) => write!(f, "Reading {} registers: FAILED: {err}", self.count),
        }
    }
}

/// Connect once and read each of `counts` registers starting at `address`.
///
/// Only a connection failure is returned as an error; individual read failures are reported in
/// the readings.
#[instrument(skip(connector, counts))]
pub async fn check_connection<C: Connector>(
    connector: &C,
    register_type: RegisterType,
    address: u16,
    counts: &[u16],
) -> Result<Vec<BlockReading>, TransportError> {
    let mut client = connector.connect().await?;
    let mut readings = Vec::with_capacity(counts.len());

    for count in counts {
        let start = Instant::now();
        let result = client
            .read_registers(register_type, address, *count)
            .await
            .map(|mut values| {
                values.truncate(SHOWN_VALUES);
                values
            });
        let reading = BlockReading {
            count: *count,
            latency: start.elapsed(),
            result,
        };
        debug!("{reading}");
        readings.push(reading);
    }

    Ok(readings)
}
