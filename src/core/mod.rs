//! Core module containing the main functionality of Serial Sim
//!
//! This module provides:
//! - Logical port slots
//! - Line-oriented serial transport
//! - Device discovery and the port registry
//! - Per-slot line logs
//! - The port-handling loop (collection and transmission)

pub mod discovery;
pub mod line_store;
pub mod port_loop;
pub mod registry;
pub mod slot;
pub mod transport;
