//! Line-oriented transport layer
//!
//! Every active slot talks to its device through a [`LinePort`]: read one
//! line with a bounded timeout, or write raw bytes. [`SerialLinePort`] is the
//! serial implementation; tests substitute their own ports.

mod serial;

pub use serial::{list_ports, PortSettings, SerialLinePort, SerialParity};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Transport error types
#[derive(Error, Debug)]
pub enum PortError {
    /// Device does not exist
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Open failed for another reason
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Electrical settings the driver cannot express
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Port went away
    #[error("Disconnected")]
    Disconnected,
}

/// An open, line-oriented link to one device
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinePort: Send {
    /// Read the next line, terminator included.
    ///
    /// Returns whatever arrived before the read timeout expired; an empty
    /// buffer means nothing arrived and is not an error.
    async fn read_line(&mut self) -> Result<Bytes, PortError>;

    /// Write `data` out of the port and flush it
    async fn write_all(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Human readable description of the link
    fn connection_info(&self) -> String;
}
