use crate::RunArgs;
use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use mock_device::{MockConnector, MockDevice};
use modbench::export::{Exporter, SummaryTable};
use modbench::matrix::{MatrixReport, MatrixRunner};
use modbench::transport::{Connector, ModbusTcpConnector};
use modbench_core::{BaseParameters, BenchConfig};
use std::time::Duration;
use tracing::{info, warn};

pub(crate) async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = BenchConfig::load(&args.config)
        .with_context(|| format!("Unable to load {}", args.config.display()))?;
    let mut base = config.base_parameters()?;

    if let Some(duration) = args.duration {
        info!(
            "Quick test: each run lasts {} instead of {}",
            humantime::format_duration(duration),
            humantime::format_duration(base.duration)
        );
        base.duration = duration;
    }

    if let Some(addr) = args.prometheus {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Unable to start the Prometheus exporter")?;
        info!("Serving metrics on http://{addr}/metrics");
    }

    let total = config.run_count();
    info!(
        "Running {total} tests of {} each (about {} in total)",
        humantime::format_duration(base.duration),
        humantime::format_duration(session_length(base.duration, total))
    );

    let report = if args.mock {
        warn!("Polling a simulated device, no traffic is sent to {}", config.modbus.host);
        run_matrix(simulated_device(&config), &config, base).await
    } else {
        info!(
            "Target {}:{} (unit {}), {} registers from address {}",
            config.modbus.host,
            config.modbus.port,
            config.modbus.unit_id,
            base.register_type,
            base.start_address
        );
        run_matrix(ModbusTcpConnector::from_config(&config), &config, base).await
    };

    let fatal = report.summaries.iter().filter(|s| s.is_fatal()).count();
    if fatal > 0 {
        warn!("{fatal} of {total} tests could not start");
    }

    println!("\n{}", SummaryTable::new(&report.summaries));

    Exporter::from_config(&config.output)
        .export(&report)
        .context("Unable to export results")?;

    Ok(())
}

async fn run_matrix<C: Connector>(
    connector: C,
    config: &BenchConfig,
    base: BaseParameters,
) -> MatrixReport {
    MatrixRunner::new(connector, base)
        .frequencies(&config.test.frequencies)
        .register_counts(&config.test.register_counts)
        .capture_outcomes(config.output.save_detailed_logs)
        .run()
        .await
}

/// A device that answers in about 10ms and occasionally stops responding.
pub(crate) fn simulated_device(config: &BenchConfig) -> MockConnector {
    MockDevice::new()
        .latency(Duration::from_millis(10), Duration::from_millis(4))
        .timeout(config.timeout())
        .failure_rate(0.005)
        .build()
}

/// Estimated wall time of a whole session, saturating on overflow.
fn session_length(per_run: Duration, runs: usize) -> Duration {
    per_run.saturating_mul(u32::try_from(runs).unwrap_or(u32::MAX))
}
