//! # Serial Sim Core Library
//!
//! Records lines arriving on up to four serial ports and replays them later:
//! - Device discovery by regular expression, slots A–D in device path order
//! - Per-slot electrical settings (baud, data bits, parity, stop bits)
//! - Collection mode: append every received line to `port_X.txt`
//! - Transmission mode: send line N of every log each interval
//! - Per-port fault isolation
//!
//! ## Example
//!
//! ```rust,no_run
//! use serial_sim_core::{LineStore, PortLoop, PortRegistry, SimConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SimConfig::load(None)?.config;
//!     let registry = PortRegistry::new(
//!         config.device_pattern()?,
//!         config.slot_settings(),
//!         config.port_timeout(),
//!     );
//!
//!     let mut ports = registry.open().ports;
//!     let store = LineStore::new(&config.mode.log_dir);
//!     let mut port_loop = PortLoop::new(&mut ports, &store, config.operating_mode(), config.tx_interval());
//!
//!     port_loop.run(&CancellationToken::new()).await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod core;

// Re-exports for convenience
pub use crate::cli::{CliResult, ExitCodes};
pub use crate::config::{ConfigError, SimConfig};
pub use crate::core::line_store::LineStore;
pub use crate::core::port_loop::{LoopStats, Mode, PassReport, PortEvent, PortFault, PortLoop, ReplayCursor};
pub use crate::core::registry::{ActivePort, ActivePortSet, PortDescriptor, PortRegistry, SetupFault};
pub use crate::core::slot::Slot;
pub use crate::core::transport::{LinePort, PortError, PortSettings, SerialParity};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
