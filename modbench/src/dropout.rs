use modbench_core::{Outcome, DROPOUT_THRESHOLD};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum State {
    #[default]
    Idle,
    Counting(u64),
}

/// Streaming detector for runs of consecutive failures.
///
/// A dropout episode is a maximal run of at least two consecutive failed requests. Each episode
/// is counted once, at the moment its length reaches two; longer runs only raise
/// [`max_consecutive_failures`](Self::max_consecutive_failures).
///
/// The detector is a plain value. Feed it outcomes in issue order either online with
/// [`observe`](Self::observe) or all at once with [`from_outcomes`](Self::from_outcomes); both
/// give the same result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropoutDetector {
    state: State,
    dropout_count: u64,
    max_run_length: u64,
}

impl DropoutDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next detector state after one more outcome.
    #[must_use]
    pub fn step(self, success: bool) -> Self {
        let mut next = self;
        if success {
            next.state = State::Idle;
            return next;
        }

        let run_length = match self.state {
            State::Idle => 1,
            State::Counting(n) => n + 1,
        };
        next.state = State::Counting(run_length);
        if run_length == DROPOUT_THRESHOLD {
            next.dropout_count += 1;
        }
        next.max_run_length = next.max_run_length.max(run_length);
        next
    }

    pub fn observe(&mut self, success: bool) {
        *self = self.step(success);
    }

    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a Outcome>) -> Self {
        outcomes
            .into_iter()
            .fold(Self::new(), |detector, outcome| {
                detector.step(outcome.is_success())
            })
    }

    pub fn dropout_count(&self) -> u64 {
        self.dropout_count
    }

    pub fn max_consecutive_failures(&self) -> u64 {
        self.max_run_length
    }

    /// Length of the failure run still open at the last observed outcome.
    pub fn current_run_length(&self) -> u64 {
        match self.state {
            State::Idle => 0,
            State::Counting(n) => n,
        }
    }
}
