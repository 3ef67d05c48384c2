//! Reduction of a completed run into a [`SummaryRecord`].
use crate::dropout::DropoutDetector;
use crate::recorder::OutcomeSequence;
use modbench_core::{ErrorBreakdown, LatencyStats, RunParameters, SummaryRecord};

/// Summarize one run. Pure; the sequence is only read.
///
/// Latency statistics only consider successful requests so that a fixed timeout does not drag
/// the distribution; with no successes they are `None`.
pub fn summarize(
    params: &RunParameters,
    sequence: &OutcomeSequence,
    dropouts: &DropoutDetector,
) -> SummaryRecord {
    let total = sequence.len() as u64;
    let mut errors = ErrorBreakdown::default();
    let mut latencies = Vec::with_capacity(sequence.len());

    for outcome in sequence.outcomes() {
        match outcome.error_kind() {
            None => latencies.push(outcome.latency_ms()),
            Some(kind) => errors.count(kind),
        }
    }

    let successful = latencies.len() as u64;
    let success_rate = if total == 0 {
        0.
    } else {
        successful as f64 / total as f64
    };

    SummaryRecord {
        frequency_hz: params.frequency_hz,
        register_count: params.register_count,
        start_address: params.start_address,
        register_type: params.register_type,
        duration_secs: params.duration.as_secs_f64(),
        total_requests: total,
        successful_requests: successful,
        failed_requests: total - successful,
        success_rate,
        empty_run: total == 0,
        latency: latency_stats(&latencies),
        dropout_count: dropouts.dropout_count(),
        max_consecutive_failures: dropouts.max_consecutive_failures(),
        errors,
        fatal_error: None,
    }
}

/// Distribution of latencies given in milliseconds.
pub fn latency_stats(latencies_ms: &[f64]) -> Option<LatencyStats> {
    if latencies_ms.is_empty() {
        return None;
    }

    let mean = statistical::mean(latencies_ms);
    let (min, max) = latencies_ms
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
            (lo.min(*x), hi.max(*x))
        });

    Some(LatencyStats {
        mean_ms: mean,
        median_ms: statistical::median(latencies_ms),
        min_ms: min,
        max_ms: max,
        stddev_ms: statistical::population_standard_deviation(latencies_ms, Some(mean)),
        samples: latencies_ms.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::OutcomeRecorder;
    use modbench_core::{Outcome, RegisterType, TransportError};
    use std::time::Duration;

    const EPSILON: f64 = 1e-9;

    fn params() -> RunParameters {
        RunParameters {
            frequency_hz: 2.,
            register_count: 10,
            start_address: 100,
            register_type: RegisterType::Holding,
            duration: Duration::from_secs(5),
        }
    }

    /// `S`/`F` pattern; successes take `latencies_ms` in order, failures a 3s timeout.
    fn sequence(pattern: &str, latencies_ms: &[u64]) -> OutcomeSequence {
        let timeout = TransportError::Timeout(Duration::from_secs(3));
        let mut recorder = OutcomeRecorder::new(params());
        let mut latencies = latencies_ms.iter();
        for (i, c) in pattern.chars().enumerate() {
            let offset = Duration::from_millis(500 * i as u64);
            let outcome = if c == 'S' {
                let ms = latencies.next().copied().unwrap_or(1);
                Outcome::success(offset, Duration::from_millis(ms), 10)
            } else {
                Outcome::failure(offset, Duration::from_secs(3), &timeout)
            };
            recorder.record(outcome);
        }
        recorder.finish()
    }

    fn summarize_seq(seq: &OutcomeSequence) -> SummaryRecord {
        summarize(seq.params(), seq, seq.dropouts())
    }

    #[test]
    fn mixed_run() {
        let seq = sequence("SSFFSFFFS", &[10, 20, 30, 40]);
        let record = summarize_seq(&seq);

        assert_eq!(record.total_requests, 9);
        assert_eq!(record.successful_requests, 4);
        assert_eq!(record.failed_requests, 5);
        assert!((record.success_rate - 4. / 9.).abs() < EPSILON);
        assert_eq!(record.dropout_count, 2);
        assert_eq!(record.max_consecutive_failures, 3);
        assert_eq!(record.errors.timeout, 5);
        assert!(!record.empty_run);
        assert!(!record.is_fatal());

        // Timeouts are excluded from the distribution.
        let latency = record.latency.unwrap();
        assert_eq!(latency.samples, 4);
        assert!((latency.mean_ms - 25.).abs() < EPSILON);
        assert!((latency.median_ms - 25.).abs() < EPSILON);
        assert!((latency.min_ms - 10.).abs() < EPSILON);
        assert!((latency.max_ms - 40.).abs() < EPSILON);
        assert!((latency.stddev_ms - 125f64.sqrt()).abs() < EPSILON);
    }

    #[test]
    fn odd_count_median_is_middle_value() {
        let stats = latency_stats(&[5., 1., 3.]).unwrap();
        assert_eq!(stats.median_ms, 3.);
        assert_eq!(stats.min_ms, 1.);
        assert_eq!(stats.max_ms, 5.);
    }

    #[test]
    fn single_sample_has_zero_spread() {
        let stats = latency_stats(&[7.5]).unwrap();
        assert_eq!(stats.mean_ms, 7.5);
        assert_eq!(stats.median_ms, 7.5);
        assert_eq!(stats.stddev_ms, 0.);
    }

    #[test]
    fn all_failures_have_no_latency() {
        let record = summarize_seq(&sequence("FFFF", &[]));
        assert_eq!(record.success_rate, 0.);
        assert!(record.latency.is_none());
        assert_eq!(record.dropout_count, 1);
        assert_eq!(record.max_consecutive_failures, 4);
        assert!(!record.empty_run);
    }

    #[test]
    fn empty_run_is_flagged() {
        let record = summarize_seq(&sequence("", &[]));
        assert!(record.empty_run);
        assert_eq!(record.total_requests, 0);
        assert_eq!(record.success_rate, 0.);
        assert!(record.latency.is_none());
        assert_eq!(record.max_consecutive_failures, 0);
    }

    #[test]
    fn carries_run_parameters() {
        let record = summarize_seq(&sequence("S", &[3]));
        assert_eq!(record.frequency_hz, 2.);
        assert_eq!(record.register_count, 10);
        assert_eq!(record.start_address, 100);
        assert_eq!(record.register_type, RegisterType::Holding);
        assert_eq!(record.duration_secs, 5.);
        assert_eq!(record.success_rate, 1.);
    }

    #[test]
    fn success_rate_stays_in_bounds() {
        for pattern in ["S", "F", "SF", "FFS", "SSSSF", "FSFSFSF"] {
            let record = summarize_seq(&sequence(pattern, &[]));
            let successes = pattern.chars().filter(|c| *c == 'S').count() as f64;
            assert!((0. ..=1.).contains(&record.success_rate));
            assert!((record.success_rate - successes / pattern.len() as f64).abs() < EPSILON);
        }
    }
}
