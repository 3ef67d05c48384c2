use super::{Connector, Transport};
use modbench_core::{RegisterType, TransportError};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio_modbus::client::{tcp, Context, Reader};
use tokio_modbus::Slave;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Connects to a Modbus TCP device.
#[derive(Debug, Clone)]
pub struct ModbusTcpConnector {
    host: String,
    port: u16,
    unit_id: u8,
    timeout: Duration,
}

impl ModbusTcpConnector {
    pub fn new(host: &str, port: u16, unit_id: u8, timeout: Duration) -> Self {
        Self {
            host: host.to_string(),
            port,
            unit_id,
            timeout,
        }
    }

    pub fn from_config(config: &modbench_core::BenchConfig) -> Self {
        Self::new(
            &config.modbus.host,
            config.modbus.port,
            config.modbus.unit_id,
            config.timeout(),
        )
    }

    async fn resolve(&self) -> Result<SocketAddr, TransportError> {
        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(io_error)?
            .next()
            .ok_or_else(|| {
                TransportError::Connection(format!("{} did not resolve to an address", self.host))
            })
    }
}

impl Connector for ModbusTcpConnector {
    type Transport = ModbusTcpTransport;

    async fn connect(&self) -> Result<ModbusTcpTransport, TransportError> {
        let addr = self.resolve().await?;
        debug!("Connecting to {addr} (unit {})", self.unit_id);

        let ctx = tokio::time::timeout(self.timeout, tcp::connect_slave(addr, Slave(self.unit_id)))
            .await
            .map_err(|_| TransportError::Connection(format!("connect to {addr} timed out")))?
            .map_err(io_error)?;

        info!("Connected to {addr}");
        Ok(ModbusTcpTransport {
            ctx,
            timeout: self.timeout,
        })
    }
}

/// An open Modbus TCP client connection.
pub struct ModbusTcpTransport {
    ctx: Context,
    timeout: Duration,
}

impl Transport for ModbusTcpTransport {
    async fn read_registers(
        &mut self,
        register_type: RegisterType,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        let timeout = self.timeout;
        let ctx = &mut self.ctx;
        let read = async move {
            match register_type {
                RegisterType::Input => ctx.read_input_registers(address, count).await,
                RegisterType::Holding => ctx.read_holding_registers(address, count).await,
            }
        };

        match tokio::time::timeout(timeout, read).await {
            Err(_) => Err(TransportError::Timeout(timeout)),
            Ok(Err(tokio_modbus::Error::Transport(err))) => Err(io_error(err)),
            Ok(Err(tokio_modbus::Error::Protocol(err))) => {
                Err(TransportError::Protocol(err.to_string()))
            }
            Ok(Ok(Err(exception))) => Err(TransportError::Protocol(format!(
                "exception response: {exception:?}"
            ))),
            Ok(Ok(Ok(values))) => Ok(values),
        }
    }
}

fn io_error(err: io::Error) -> TransportError {
    match err.kind() {
        io::ErrorKind::TimedOut => TransportError::Timeout(Duration::ZERO),
        _ => TransportError::Connection(err.to_string()),
    }
}
