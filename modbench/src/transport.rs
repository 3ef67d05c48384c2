//! Contract between the measurement engine and the device being polled.
//!
//! The engine never looks at frames or transaction ids. It asks a [`Connector`] for a fresh
//! connection at the start of each run and then issues blocking-style register reads through the
//! returned [`Transport`], one at a time.
use modbench_core::{RegisterType, TransportError};
use std::future::Future;

mod modbus;

pub use modbus::{ModbusTcpConnector, ModbusTcpTransport};

/// An open connection to one device.
pub trait Transport: Send {
    /// Read `count` registers starting at the 0-based protocol `address`.
    ///
    /// Implementations bound the call with their configured timeout and report expiry as
    /// [`TransportError::Timeout`].
    fn read_registers(
        &mut self,
        register_type: RegisterType,
        address: u16,
        count: u16,
    ) -> impl Future<Output = Result<Vec<u16>, TransportError>> + Send;
}

/// Opens connections to one device.
pub trait Connector: Send + Sync {
    type Transport: Transport;

    fn connect(&self) -> impl Future<Output = Result<Self::Transport, TransportError>> + Send;
}

impl<C: Connector> Connector for &C {
    type Transport = C::Transport;

    fn connect(&self) -> impl Future<Output = Result<Self::Transport, TransportError>> + Send {
        (**self).connect()
    }
}
