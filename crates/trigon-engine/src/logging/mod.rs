//! Logging utilities.
//!
//! Centralizes logger initialization. Only the standard `log` facade is
//! imposed on the rest of the crate.

mod init;

pub use init::{LoggingConfig, init_logging};
