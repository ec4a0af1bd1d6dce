//! CLI Module
//!
//! Exit codes for the `serial-sim` binary.

pub mod exit_codes;

pub use exit_codes::{exit_code_description, CliResult, ExitCodes};
