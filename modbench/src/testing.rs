//! Scripted transports for unit tests.
use crate::transport::{Connector, Transport};
use modbench_core::{RegisterType, TransportError};
use rand_distr::{Distribution, SkewNormal};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub(crate) enum Step {
    /// Answer with the requested registers after the given latency.
    Respond(Duration),
    /// Answer with fewer registers than requested.
    Short(Duration),
    Fail(Duration, TransportError),
}

impl Step {
    fn latency(&self) -> Duration {
        match self {
            Step::Respond(d) | Step::Short(d) | Step::Fail(d, _) => *d,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Fallback {
    Fixed(Step),
    /// Successful responses with skew-normal latency (mean, std) in seconds.
    Noisy(f64, f64),
}

#[derive(Debug, Clone)]
pub(crate) struct ScriptedTransport {
    script: VecDeque<Step>,
    fallback: Fallback,
    pub calls: Vec<(RegisterType, u16, u16)>,
}

impl ScriptedTransport {
    /// Runs `script` in order, then keeps answering after `latency`.
    pub fn new(script: Vec<Step>, latency: Duration) -> Self {
        Self {
            script: script.into(),
            fallback: Fallback::Fixed(Step::Respond(latency)),
            calls: vec![],
        }
    }

    pub fn constant(latency: Duration) -> Self {
        Self::new(vec![], latency)
    }

    /// `S`/`F` pattern; successes answer after `latency`, failures time out after `latency`.
    pub fn pattern(pattern: &str, latency: Duration) -> Self {
        let script = pattern
            .chars()
            .map(|c| match c {
                'S' => Step::Respond(latency),
                _ => Step::Fail(latency, TransportError::Timeout(latency)),
            })
            .collect();
        Self::new(script, latency)
    }

    pub fn noisy(mean: Duration, std: Duration) -> Self {
        Self {
            script: VecDeque::new(),
            fallback: Fallback::Noisy(mean.as_secs_f64(), std.as_secs_f64()),
            calls: vec![],
        }
    }

    fn next_step(&mut self) -> Step {
        if let Some(step) = self.script.pop_front() {
            return step;
        }
        match &self.fallback {
            Fallback::Fixed(step) => step.clone(),
            Fallback::Noisy(mean, std) => {
                let normal = SkewNormal::new(*mean, *std, 20.).unwrap();
                let v: f64 = normal.sample(&mut rand::thread_rng()).max(0.);
                Step::Respond(Duration::from_secs_f64(v))
            }
        }
    }
}

impl Transport for ScriptedTransport {
    async fn read_registers(
        &mut self,
        register_type: RegisterType,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        self.calls.push((register_type, address, count));
        let step = self.next_step();
        tokio::time::sleep(step.latency()).await;
        match step {
            Step::Respond(_) => Ok((0..count).map(|i| address.wrapping_add(i)).collect()),
            Step::Short(_) => Ok(vec![0; count.saturating_sub(1) as usize]),
            Step::Fail(_, err) => Err(err),
        }
    }
}

/// Hands out prepared connections in order; once exhausted, connects to fast devices.
#[derive(Debug, Default)]
pub(crate) struct ScriptedConnector {
    plans: Mutex<VecDeque<Result<ScriptedTransport, TransportError>>>,
    pub connects: Mutex<usize>,
}

impl ScriptedConnector {
    pub fn new(plans: Vec<Result<ScriptedTransport, TransportError>>) -> Self {
        Self {
            plans: Mutex::new(plans.into()),
            connects: Mutex::new(0),
        }
    }
}

impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    async fn connect(&self) -> Result<ScriptedTransport, TransportError> {
        *self.connects.lock().unwrap() += 1;
        let plan = self.plans.lock().unwrap().pop_front();
        plan.unwrap_or_else(|| Ok(ScriptedTransport::constant(Duration::from_millis(1))))
    }
}
