//! CLI Exit Codes
//!
//! The simulator runs until interrupted; these codes only describe how it
//! stopped.

use crate::config::ConfigError;
use std::process::ExitCode;

/// Exit code constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodes;

impl ExitCodes {
    /// Success
    pub const SUCCESS: u8 = 0;

    /// General error
    pub const ERROR: u8 = 1;

    /// Permission denied
    pub const PERMISSION_DENIED: u8 = 7;

    /// Configuration error
    pub const CONFIG_ERROR: u8 = 8;
}

/// CLI operation result
#[derive(Debug)]
pub enum CliResult {
    /// Success with optional message
    Success(Option<String>),

    /// Error with code and message
    Error(u8, String),
}

impl CliResult {
    pub fn success() -> Self {
        Self::Success(None)
    }

    pub fn error(code: u8, msg: impl Into<String>) -> Self {
        Self::Error(code, msg.into())
    }

    /// Classify a startup error from the binary
    pub fn from_error(err: &anyhow::Error) -> Self {
        let code = if err.downcast_ref::<ConfigError>().is_some() {
            ExitCodes::CONFIG_ERROR
        } else if let Some(io) = err.downcast_ref::<std::io::Error>() {
            match io.kind() {
                std::io::ErrorKind::PermissionDenied => ExitCodes::PERMISSION_DENIED,
                _ => ExitCodes::ERROR,
            }
        } else {
            ExitCodes::ERROR
        };

        Self::Error(code, format!("{err:#}"))
    }

    /// Get exit code
    pub fn code(&self) -> u8 {
        match self {
            Self::Success(_) => ExitCodes::SUCCESS,
            Self::Error(code, _) => *code,
        }
    }

    /// Get message
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(Some(msg)) => Some(msg),
            Self::Error(_, msg) => Some(msg),
            _ => None,
        }
    }

    /// Convert to ExitCode
    pub fn to_exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    /// Is success?
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// One-line report naming the exit code and its meaning
    pub fn summary(&self) -> String {
        let code = self.code();
        match self.message() {
            Some(msg) => format!("{} (exit {}): {}", exit_code_description(code), code, msg),
            None => format!("{} (exit {})", exit_code_description(code), code),
        }
    }
}

impl From<anyhow::Result<()>> for CliResult {
    fn from(result: anyhow::Result<()>) -> Self {
        match result {
            Ok(()) => Self::success(),
            Err(err) => Self::from_error(&err),
        }
    }
}

/// Exit code description
pub fn exit_code_description(code: u8) -> &'static str {
    match code {
        0 => "Success",
        1 => "General error",
        7 => "Permission denied",
        8 => "Configuration error",
        _ => "Unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_result() {
        let success = CliResult::success();
        assert!(success.is_success());
        assert_eq!(success.code(), 0);

        let error = CliResult::error(8, "bad config");
        assert!(!error.is_success());
        assert_eq!(error.code(), 8);
        assert_eq!(error.message(), Some("bad config"));
    }

    #[test]
    fn test_config_error_code() {
        let err = anyhow::Error::new(ConfigError::Invalid("port_timeout".into()));
        let result = CliResult::from_error(&err);
        assert_eq!(result.code(), ExitCodes::CONFIG_ERROR);
        assert_eq!(exit_code_description(result.code()), "Configuration error");
        assert_eq!(
            result.summary(),
            "Configuration error (exit 8): Invalid configuration: port_timeout"
        );
    }

    #[test]
    fn test_summary() {
        assert_eq!(CliResult::success().summary(), "Success (exit 0)");
        assert_eq!(
            CliResult::error(ExitCodes::PERMISSION_DENIED, "log dir").summary(),
            "Permission denied (exit 7): log dir"
        );
        assert_eq!(exit_code_description(2), "Unknown error");
    }

    #[test]
    fn test_io_error_code() {
        let err = anyhow::Error::new(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "log dir"));
        assert_eq!(CliResult::from_error(&err).code(), ExitCodes::PERMISSION_DENIED);

        let other: anyhow::Result<()> = Err(anyhow::anyhow!("something else"));
        assert_eq!(CliResult::from(other).code(), ExitCodes::ERROR);
        assert!(CliResult::from(Ok(())).is_success());
    }
}
