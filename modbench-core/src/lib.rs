//! Shared data model for modbench.
//!
//! Everything in here is plain data: run parameters, per-request outcomes, summary records, the
//! error taxonomy and the YAML configuration. The measurement engine lives in the `modbench` crate.
mod config;
mod constants;
mod error;
mod outcome;
mod params;
mod stats;

pub use config::*;
pub use constants::*;
pub use error::*;
pub use outcome::*;
pub use params::*;
pub use stats::*;
