//! Logging setup.
//!
//! The engine logs through the `log` facade everywhere; this module only
//! centralizes initializing `env_logger` in the host binary.

mod init;

pub use init::{LoggingConfig, init_logging};
