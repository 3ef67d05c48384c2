//! Test matrix runner.
//!
//! Runs every (frequency, register count) combination one after the other and collects one
//! [`SummaryRecord`] per combination. A combination that cannot run at all becomes a degenerate
//! record; the matrix always carries on to the next combination.
use crate::recorder::OutcomeSequence;
use crate::scheduler::connect_and_run;
use crate::stats::summarize;
use crate::transport::Connector;
use modbench_core::{BaseParameters, RunParameters, SummaryRecord};
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

/// Sink for per-run progress. Both hooks default to doing nothing.
pub trait Progress {
    /// `index` is 1-based.
    fn run_started(&mut self, _index: usize, _total: usize, _params: &RunParameters) {}

    fn run_finished(&mut self, _index: usize, _total: usize, _summary: &SummaryRecord) {}
}

impl Progress for () {}

/// Reports progress through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl Progress for LogProgress {
    fn run_started(&mut self, index: usize, total: usize, params: &RunParameters) {
        info!("Test {index}/{total}: {params}");
    }

    fn run_finished(&mut self, index: usize, total: usize, summary: &SummaryRecord) {
        if summary.is_fatal() {
            warn!(
                "Test {index}/{total} ({}Hz, {} registers) failed: {summary}",
                summary.frequency_hz, summary.register_count
            );
        } else {
            info!(
                "Test {index}/{total} ({}Hz, {} registers) done: {summary}",
                summary.frequency_hz, summary.register_count
            );
        }
    }
}

/// Everything a matrix produced, in enumeration order.
#[derive(Debug, Clone, Default)]
pub struct MatrixReport {
    pub summaries: Vec<SummaryRecord>,
    /// Raw outcomes of every run that started; empty unless capture was enabled.
    pub outcomes: Vec<OutcomeSequence>,
}

/// Runs the cross product of frequencies and register counts.
///
/// # Example
/// ```no_run
/// use modbench::prelude::*;
/// use std::time::Duration;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let connector = ModbusTcpConnector::new("192.168.1.10", 502, 1, Duration::from_secs(3));
///     let base = BaseParameters {
///         start_address: 0,
///         register_type: RegisterType::Input,
///         duration: Duration::from_secs(60),
///     };
///
///     let report = MatrixRunner::new(connector, base)
///         .frequencies(&[1., 10.])
///         .register_counts(&[1, 50])
///         .run()
///         .await;
///
///     println!("{}", SummaryTable::new(&report.summaries));
/// }
/// ```
pub struct MatrixRunner<C, P = LogProgress> {
    connector: C,
    base: BaseParameters,
    frequencies: Vec<f64>,
    register_counts: Vec<u16>,
    capture_outcomes: bool,
    progress: P,
}

impl<C: Connector> MatrixRunner<C> {
    pub fn new(connector: C, base: BaseParameters) -> Self {
        Self {
            connector,
            base,
            frequencies: vec![],
            register_counts: vec![],
            capture_outcomes: false,
            progress: LogProgress,
        }
    }
}

impl<C: Connector, P: Progress> MatrixRunner<C, P> {
    pub fn frequencies(mut self, frequencies: &[f64]) -> Self {
        self.frequencies = frequencies.to_vec();
        self
    }

    pub fn register_counts(mut self, register_counts: &[u16]) -> Self {
        self.register_counts = register_counts.to_vec();
        self
    }

    /// Keep every run's raw outcomes in the report (detailed logging).
    pub fn capture_outcomes(mut self, capture: bool) -> Self {
        self.capture_outcomes = capture;
        self
    }

    pub fn progress<Q: Progress>(self, progress: Q) -> MatrixRunner<C, Q> {
        MatrixRunner {
            connector: self.connector,
            base: self.base,
            frequencies: self.frequencies,
            register_counts: self.register_counts,
            capture_outcomes: self.capture_outcomes,
            progress,
        }
    }

    /// Run parameters in execution order: frequencies outer, register counts inner.
    pub fn combinations(&self) -> Vec<RunParameters> {
        self.frequencies
            .iter()
            .flat_map(|freq| {
                self.register_counts
                    .iter()
                    .map(move |count| self.base.for_combination(*freq, *count))
            })
            .collect()
    }

    #[instrument(name = "matrix", skip_all)]
    pub async fn run(mut self) -> MatrixReport {
        let combinations = self.combinations();
        let total = combinations.len();
        info!("Running {total} tests");

        let mut report = MatrixReport {
            summaries: Vec::with_capacity(total),
            outcomes: vec![],
        };

        for (i, params) in combinations.iter().enumerate() {
            let index = i + 1;
            self.progress.run_started(index, total, params);

            let summary = match connect_and_run(&self.connector, params).await {
                Ok(sequence) => {
                    let summary = summarize(params, &sequence, sequence.dropouts());
                    if self.capture_outcomes {
                        report.outcomes.push(sequence);
                    }
                    summary
                }
                Err(err) => {
                    error!("Run {index}/{total} could not start: {err}");
                    SummaryRecord::fatal(params, &err)
                }
            };

            self.progress.run_finished(index, total, &summary);
            report.summaries.push(summary);
        }

        info!("All {total} tests complete");
        report
    }
}

/// Run every combination and return the summaries in enumeration order.
pub async fn run_all<C: Connector>(
    connector: C,
    frequencies: &[f64],
    register_counts: &[u16],
    base: BaseParameters,
) -> Vec<SummaryRecord> {
    MatrixRunner::new(connector, base)
        .frequencies(frequencies)
        .register_counts(register_counts)
        .run()
        .await
        .summaries
}
