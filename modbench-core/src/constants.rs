use std::time::Duration;

/// Default Modbus TCP port.
pub const DEFAULT_PORT: u16 = 502;

/// Default unit (slave) identifier.
pub const DEFAULT_UNIT_ID: u8 = 1;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Largest register quantity a single read request may ask for.
pub const MAX_REGISTERS_PER_READ: u16 = 125;

/// First address of the input register block in 1-based register-map notation.
pub const INPUT_REGISTER_BASE: u32 = 30_001;

/// First address of the holding register block in 1-based register-map notation.
pub const HOLDING_REGISTER_BASE: u32 = 40_001;

/// Register counts read by the connection check.
pub const DEFAULT_CHECK_COUNTS: [u16; 4] = [1, 5, 10, 20];

/// A run of at least this many consecutive failures is a dropout episode.
pub const DROPOUT_THRESHOLD: u64 = 2;

pub const DEFAULT_OUTPUT_DIRECTORY: &str = "results";
