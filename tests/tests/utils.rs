use mock_device::{MockConnector, MockDevice};
use modbench_core::{BaseParameters, RegisterType};
use std::time::Duration;

#[allow(unused)]
pub fn base(duration: Duration) -> BaseParameters {
    BaseParameters {
        start_address: 100,
        register_type: RegisterType::Holding,
        duration,
    }
}

/// Answers every request after exactly `latency_ms`.
#[allow(unused)]
pub fn steady_device(latency_ms: u64) -> MockDevice {
    MockDevice::new()
        .latency(Duration::from_millis(latency_ms), Duration::ZERO)
        .timeout(Duration::from_millis(50))
}

#[allow(unused)]
pub fn steady(latency_ms: u64) -> MockConnector {
    steady_device(latency_ms).build()
}
