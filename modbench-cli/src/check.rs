use crate::run::simulated_device;
use crate::CheckArgs;
use anyhow::{bail, Context};
use modbench::connection_check::{check_connection, BlockReading};
use modbench::transport::{Connector, ModbusTcpConnector};
use modbench_core::{BaseParameters, BenchConfig, DEFAULT_CHECK_COUNTS};
use tracing::{info, warn};

pub(crate) async fn check(args: CheckArgs) -> anyhow::Result<()> {
    let config = BenchConfig::load(&args.config)
        .with_context(|| format!("Unable to load {}", args.config.display()))?;
    let base = config.base_parameters()?;

    info!(
        "Testing connection to {}:{} (unit {})",
        config.modbus.host, config.modbus.port, config.modbus.unit_id
    );

    let readings = if args.mock {
        run_check(&simulated_device(&config), &base).await?
    } else {
        run_check(&ModbusTcpConnector::from_config(&config), &base).await?
    };

    for reading in &readings {
        println!("{reading}");
    }

    let failed = readings.iter().filter(|r| !r.is_ok()).count();
    if failed > 0 {
        warn!("{failed} of {} reads failed", readings.len());
        bail!("Device is reachable but {failed} reads failed");
    }

    info!("Connection OK");
    Ok(())
}

async fn run_check<C: Connector>(
    connector: &C,
    base: &BaseParameters,
) -> anyhow::Result<Vec<BlockReading>> {
    check_connection(
        connector,
        base.register_type,
        base.start_address,
        &DEFAULT_CHECK_COUNTS,
    )
    .await
    .context("Connection failed")
}
