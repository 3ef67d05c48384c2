use crate::dropout::DropoutDetector;
use chrono::{DateTime, Utc};
use modbench_core::{Outcome, RunParameters};

/// Append-only log of the outcomes of one run.
///
/// The recorder has a single writer, the scheduler, and folds every outcome into its
/// [`DropoutDetector`] as it is appended.
#[derive(Debug)]
pub struct OutcomeRecorder {
    params: RunParameters,
    started_at: DateTime<Utc>,
    outcomes: Vec<Outcome>,
    dropouts: DropoutDetector,
}

impl OutcomeRecorder {
    pub fn new(params: RunParameters) -> Self {
        let expected = (params.duration.as_secs_f64() * params.frequency_hz).ceil();
        // NOTE: Capacity is only a hint and is capped.
        let capacity = if expected.is_finite() {
            (expected as usize).min(1 << 20)
        } else {
            0
        };

        Self {
            params,
            started_at: Utc::now(),
            outcomes: Vec::with_capacity(capacity),
            dropouts: DropoutDetector::new(),
        }
    }

    pub fn record(&mut self, outcome: Outcome) {
        self.dropouts.observe(outcome.is_success());
        self.outcomes.push(outcome);
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn dropouts(&self) -> &DropoutDetector {
        &self.dropouts
    }

    /// Close the run. The returned sequence is read-only.
    pub fn finish(self) -> OutcomeSequence {
        OutcomeSequence {
            params: self.params,
            started_at: self.started_at,
            outcomes: self.outcomes,
            dropouts: self.dropouts,
        }
    }
}

/// The completed, ordered outcomes of one run. Order is issue order.
#[derive(Debug, Clone)]
pub struct OutcomeSequence {
    params: RunParameters,
    started_at: DateTime<Utc>,
    outcomes: Vec<Outcome>,
    dropouts: DropoutDetector,
}

impl OutcomeSequence {
    pub fn params(&self) -> &RunParameters {
        &self.params
    }

    /// Wall-clock time the run started at; outcome offsets are relative to it.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn dropouts(&self) -> &DropoutDetector {
        &self.dropouts
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failures(&self) -> usize {
        self.len() - self.successes()
    }
}
