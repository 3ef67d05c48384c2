//! In-process stand-in for a register-serving device.
//!
//! A [`MockDevice`] describes how the device behaves: response latency, scripted or random
//! failures, a request rate ceiling and refused connections. [`MockDevice::build`] turns it into
//! a [`MockConnector`] that plugs into the benchmark engine in place of a real Modbus TCP
//! connection.
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use modbench::transport::{Connector, Transport};
use modbench_core::{RegisterType, TransportError, DEFAULT_TIMEOUT, MAX_REGISTERS_PER_READ};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use rand_distr::{Distribution, SkewNormal};
use std::collections::{BTreeSet, VecDeque};
use std::num::NonZeroU32;
use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc, Mutex, PoisonError,
};
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// How the device answers one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Ok,
    /// Never answers; the request times out.
    Timeout,
    /// Answers with a "server device busy" exception.
    Exception,
    /// Drops the connection.
    Disconnect,
}

impl Reply {
    /// `S`, `T`, `E` and `D` map to [`Ok`](Reply::Ok), [`Timeout`](Reply::Timeout),
    /// [`Exception`](Reply::Exception) and [`Disconnect`](Reply::Disconnect).
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'S' => Some(Reply::Ok),
            'T' => Some(Reply::Timeout),
            'E' => Some(Reply::Exception),
            'D' => Some(Reply::Disconnect),
            _ => None,
        }
    }
}

/// Behaviour of a simulated device.
#[derive(Debug, Clone)]
pub struct MockDevice {
    latency: Duration,
    jitter: Duration,
    timeout: Duration,
    failure_rate: f64,
    max_rps: Option<NonZeroU32>,
    script: Vec<Reply>,
    refused: BTreeSet<usize>,
    seed: u64,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(5),
            jitter: Duration::ZERO,
            timeout: DEFAULT_TIMEOUT,
            failure_rate: 0.,
            max_rps: None,
            script: vec![],
            refused: BTreeSet::new(),
            seed: 0,
        }
    }
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Response latency. With a non-zero `jitter` latencies follow a right-skewed distribution
    /// around `mean`.
    pub fn latency(mut self, mean: Duration, jitter: Duration) -> Self {
        self.latency = mean;
        self.jitter = jitter;
        self
    }

    /// How long an unanswered request takes to fail.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Probability in `[0, 1]` that an unscripted request times out.
    pub fn failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = if rate.is_nan() { 0. } else { rate.clamp(0., 1.) };
        self
    }

    /// Requests above this rate are answered with an exception. Zero removes the ceiling.
    pub fn max_rps(mut self, rps: u32) -> Self {
        self.max_rps = NonZeroU32::new(rps);
        self
    }

    /// Replies used, in order and across connections, before falling back to random behaviour.
    /// Characters other than `S`, `T`, `E` and `D` are skipped.
    pub fn pattern(mut self, pattern: &str) -> Self {
        self.script.extend(pattern.chars().filter_map(Reply::from_char));
        self
    }

    /// Refuse the `nth` connection attempt (1-based).
    pub fn refuse_connection(mut self, nth: usize) -> Self {
        self.refused.insert(nth);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> MockConnector {
        let latency = SkewNormal::new(self.latency.as_secs_f64(), self.jitter.as_secs_f64(), 20.)
            .ok()
            .filter(|_| !self.jitter.is_zero());
        let limiter = self
            .max_rps
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));

        MockConnector {
            shared: Arc::new(Shared {
                script: Mutex::new(self.script.iter().copied().collect()),
                rng: Mutex::new(SmallRng::seed_from_u64(self.seed)),
                latency,
                limiter,
                connects: AtomicUsize::new(0),
                served: AtomicU64::new(0),
                device: self,
            }),
        }
    }
}

struct Shared {
    device: MockDevice,
    script: Mutex<VecDeque<Reply>>,
    rng: Mutex<SmallRng>,
    latency: Option<SkewNormal<f64>>,
    limiter: Option<DefaultDirectRateLimiter>,
    connects: AtomicUsize,
    served: AtomicU64,
}

impl std::fmt::Debug for Shared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared")
            .field("device", &self.device)
            .field("connects", &self.connects)
            .field("served", &self.served)
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn next_reply(&self) -> Reply {
        let scripted = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        if let Some(reply) = scripted {
            return reply;
        }

        if let Some(limiter) = &self.limiter {
            if limiter.check().is_err() {
                trace!("Rate ceiling exceeded");
                return Reply::Exception;
            }
        }

        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        if self.device.failure_rate > 0. && rng.gen_bool(self.device.failure_rate) {
            Reply::Timeout
        } else {
            Reply::Ok
        }
    }

    fn sample_latency(&self) -> Duration {
        match &self.latency {
            Some(dist) => {
                let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
                let secs: f64 = dist.sample(&mut *rng);
                Duration::from_secs_f64(secs.max(0.))
            }
            None => self.device.latency,
        }
    }
}

/// Opens connections to a [`MockDevice`]. Clones share the same device state.
#[derive(Debug, Clone)]
pub struct MockConnector {
    shared: Arc<Shared>,
}

impl MockConnector {
    /// Connection attempts so far, including refused ones.
    pub fn connects(&self) -> usize {
        self.shared.connects.load(Ordering::Relaxed)
    }

    /// Requests received so far.
    pub fn served(&self) -> u64 {
        self.shared.served.load(Ordering::Relaxed)
    }
}

impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(&self) -> Result<MockTransport, TransportError> {
        let nth = self.shared.connects.fetch_add(1, Ordering::Relaxed) + 1;
        if self.shared.device.refused.contains(&nth) {
            debug!("Refusing connection {nth}");
            return Err(TransportError::Connection("connection refused".to_string()));
        }

        debug!("Accepted connection {nth}");
        Ok(MockTransport {
            shared: self.shared.clone(),
            connected: true,
        })
    }
}

/// One open connection to a [`MockDevice`].
#[derive(Debug)]
pub struct MockTransport {
    shared: Arc<Shared>,
    connected: bool,
}

/// Value held by a register. Input registers are distinguishable from holding registers.
pub fn register_value(register_type: RegisterType, address: u16) -> u16 {
    match register_type {
        RegisterType::Input => address ^ 0x8000,
        RegisterType::Holding => address,
    }
}

impl Transport for MockTransport {
    async fn read_registers(
        &mut self,
        register_type: RegisterType,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        if !self.connected {
            return Err(TransportError::Connection("not connected".to_string()));
        }

        self.shared.served.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("mock-device.requests").increment(1);

        let latency = self.shared.sample_latency();
        if count == 0 || count > MAX_REGISTERS_PER_READ {
            tokio::time::sleep(latency).await;
            return Err(TransportError::Protocol(
                "exception response: IllegalDataValue".to_string(),
            ));
        }
        if u32::from(address) + u32::from(count) > u32::from(u16::MAX) + 1 {
            tokio::time::sleep(latency).await;
            return Err(TransportError::Protocol(
                "exception response: IllegalDataAddress".to_string(),
            ));
        }

        match self.shared.next_reply() {
            Reply::Ok => {
                tokio::time::sleep(latency).await;
                Ok((0..count)
                    .map(|i| register_value(register_type, address + i))
                    .collect())
            }
            Reply::Timeout => {
                let timeout = self.shared.device.timeout;
                tokio::time::sleep(timeout).await;
                Err(TransportError::Timeout(timeout))
            }
            Reply::Exception => {
                tokio::time::sleep(latency).await;
                Err(TransportError::Protocol(
                    "exception response: ServerDeviceBusy".to_string(),
                ))
            }
            Reply::Disconnect => {
                self.connected = false;
                Err(TransportError::Connection(
                    "connection reset by peer".to_string(),
                ))
            }
        }
    }
}
