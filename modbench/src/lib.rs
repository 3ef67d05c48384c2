#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod connection_check;
pub mod dropout;
pub mod export;
pub mod matrix;
pub mod recorder;
pub mod scheduler;
pub mod stats;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use dropout::DropoutDetector;
pub use matrix::{run_all, MatrixReport, MatrixRunner};
pub use recorder::{OutcomeRecorder, OutcomeSequence};
pub use scheduler::{connect_and_run, PollScheduler};

pub mod prelude {
    pub use crate::export::{Exporter, SummaryTable};
    pub use crate::matrix::{LogProgress, MatrixReport, MatrixRunner, Progress};
    pub use crate::connection_check::check_connection;
    pub use crate::transport::{Connector, ModbusTcpConnector, Transport};

    pub use modbench_core::{
        BaseParameters, BenchConfig, RegisterType, RunParameters, SummaryRecord, TransportError,
    };
}
