//! Poll scheduler: drives one run at a fixed request rate.
use crate::recorder::{OutcomeRecorder, OutcomeSequence};
use crate::transport::{Connector, Transport};
use modbench_core::{FatalRunError, Outcome, ParameterError, RunParameters, TransportError};
use std::time::Duration;
use tokio::time::Instant;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

mod timer;

use timer::Timer;

/// Issues one request per tick of a fixed-rate grid for the configured duration.
///
/// Requests are strictly serialized: the next request is not issued until the previous one has
/// returned. The loop stops on elapsed time, not on request count; a request issued before the
/// deadline is always allowed to finish and is recorded.
#[derive(Debug, Clone)]
pub struct PollScheduler {
    params: RunParameters,
    interval: Duration,
}

impl PollScheduler {
    pub fn new(params: RunParameters) -> Result<Self, ParameterError> {
        params.validate()?;
        let interval = params.interval()?;
        Ok(Self { params, interval })
    }

    pub fn params(&self) -> &RunParameters {
        &self.params
    }

    #[instrument(name = "run", skip_all, fields(frequency_hz = self.params.frequency_hz, register_count = self.params.register_count))]
    pub async fn run<T: Transport>(&self, client: &mut T) -> OutcomeSequence {
        let params = &self.params;
        info!("Starting run: {params}");

        let mut recorder = OutcomeRecorder::new(params.clone());
        let mut timer = Timer::new(self.interval);
        debug!("Polling every {timer}");

        // NOTE: This loop is time-sensitive. Nothing but the request itself may be awaited here.
        // Waiting for a tick never runs past the deadline; a request already in flight does.
        while let Some(offset) = timer.tick_within(params.duration).await {

            let outcome = poll_once(client, params, offset).await;
            trace!(
                "Request {} at {:?}: success={} latency={:?}",
                recorder.len() + 1,
                offset,
                outcome.is_success(),
                outcome.latency,
            );

            #[cfg(feature = "metrics")]
            record_metrics(params, &outcome);

            recorder.record(outcome);
        }

        let sequence = recorder.finish();
        info!(
            "Run complete: {} requests, {} failed, {} dropouts",
            sequence.len(),
            sequence.failures(),
            sequence.dropouts().dropout_count(),
        );
        sequence
    }
}

/// Validate, connect and run. Only errors that prevent the run from starting escape.
pub async fn connect_and_run<C: Connector>(
    connector: &C,
    params: &RunParameters,
) -> Result<OutcomeSequence, FatalRunError> {
    let scheduler = PollScheduler::new(params.clone())?;
    let mut client = connector
        .connect()
        .await
        .map_err(FatalRunError::Connect)?;
    Ok(scheduler.run(&mut client).await)
}

async fn poll_once<T: Transport>(
    client: &mut T,
    params: &RunParameters,
    offset: Duration,
) -> Outcome {
    let issued = Instant::now();
    let res = client
        .read_registers(
            params.register_type,
            params.start_address,
            params.register_count,
        )
        .await;
    let latency = issued.elapsed();

    let res = res.and_then(|values| {
        if values.len() == params.register_count as usize {
            Ok(())
        } else {
            Err(TransportError::Protocol(format!(
                "expected {} registers, received {}",
                params.register_count,
                values.len()
            )))
        }
    });

    match res {
        Ok(()) => Outcome::success(offset, latency, params.register_count),
        Err(err) => {
            debug!("Request failed after {latency:?}: {err}");
            Outcome::failure(offset, latency, &err)
        }
    }
}

#[cfg(feature = "metrics")]
fn record_metrics(params: &RunParameters, outcome: &Outcome) {
    let frequency = params.frequency_hz.to_string();
    let registers = params.register_count.to_string();

    metrics::histogram!(
        "modbench.request.latency",
        "frequency_hz" => frequency.clone(),
        "register_count" => registers.clone()
    )
    .record(outcome.latency_ms());

    if outcome.is_success() {
        metrics::counter!(
            "modbench.request.success",
            "frequency_hz" => frequency,
            "register_count" => registers
        )
        .increment(1);
    } else {
        metrics::counter!(
            "modbench.request.error",
            "frequency_hz" => frequency,
            "register_count" => registers
        )
        .increment(1);
    }
}
