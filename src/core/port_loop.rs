//! Port-handling loop
//!
//! The loop runs in one of two modes, fixed at startup:
//!
//! - **Collection**: every pass reads one line (or nothing, on timeout) from
//!   each active port and appends it to that port's line log.
//! - **Transmission**: every pass sends line `cursor` of each port's log back
//!   out of the same port, then advances the single shared cursor and waits
//!   for the transmission interval.
//!
//! Ports are visited sequentially in slot order. A fault on one port is
//! reported and the pass moves on to the next port; nothing inside the loop
//! stops it except the shutdown token.

use super::line_store::{line_text, LineStore};
use super::registry::{ActivePort, ActivePortSet};
use super::slot::Slot;
use super::transport::PortError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Read lines from the ports into their logs
    Collection,
    /// Replay logged lines out of the ports
    Transmission,
}

impl Mode {
    /// Mode selected by the `data_collection` flag
    pub fn from_data_collection(enabled: bool) -> Self {
        if enabled {
            Mode::Collection
        } else {
            Mode::Transmission
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Collection => write!(f, "data collection"),
            Mode::Transmission => write!(f, "data transmission"),
        }
    }
}

/// Line index replayed on the next transmission pass, shared by all ports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReplayCursor(usize);

impl ReplayCursor {
    /// Current line index
    pub fn position(self) -> usize {
        self.0
    }

    fn advance(&mut self) {
        self.0 += 1;
    }
}

/// Where in a pass a port fault happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultStage {
    /// Reading from the port
    Read,
    /// Writing to the port
    Write,
    /// Reading or writing the line log
    Log,
}

impl fmt::Display for FaultStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultStage::Read => write!(f, "read"),
            FaultStage::Write => write!(f, "write"),
            FaultStage::Log => write!(f, "line log"),
        }
    }
}

/// I/O failure on one port during a pass; recovered by skipping the port
#[derive(Error, Debug)]
#[error("{slot}: {stage} error: {source}{}", line_suffix(.line))]
pub struct PortFault {
    /// Port that failed
    pub slot: Slot,
    /// Stage that failed
    pub stage: FaultStage,
    /// Line being logged or sent, when there was one
    pub line: Option<String>,
    /// Underlying error
    #[source]
    pub source: PortError,
}

fn line_suffix(line: &Option<String>) -> String {
    line.as_ref().map(|l| format!(" (line: {l})")).unwrap_or_default()
}

impl PortFault {
    fn new(slot: Slot, stage: FaultStage, source: impl Into<PortError>) -> Self {
        Self {
            slot,
            stage,
            line: None,
            source: source.into(),
        }
    }

    fn with_line(mut self, line: impl Into<String>) -> Self {
        self.line = Some(line.into());
        self
    }
}

/// Per-port outcome of a pass
#[derive(Debug)]
pub enum PortEvent {
    /// A line was read from the port
    Received {
        /// Source port
        slot: Slot,
        /// Line without terminator
        line: String,
    },
    /// A logged line was written to the port
    Sent {
        /// Destination port
        slot: Slot,
        /// Line without terminator
        line: String,
    },
    /// The port faulted
    Fault(PortFault),
}

impl PortEvent {
    /// Port the event belongs to
    pub fn slot(&self) -> Slot {
        match self {
            PortEvent::Received { slot, .. } | PortEvent::Sent { slot, .. } => *slot,
            PortEvent::Fault(fault) => fault.slot,
        }
    }

    fn log(&self) {
        match self {
            PortEvent::Received { .. } | PortEvent::Sent { .. } => info!("{}", self),
            PortEvent::Fault(_) => warn!("Serial port error: {}", self),
        }
    }
}

impl fmt::Display for PortEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortEvent::Received { slot, line } => write!(f, "{slot}: {line}"),
            PortEvent::Sent { slot, line } => write!(f, "{slot} <- {line}"),
            PortEvent::Fault(fault) => write!(f, "{fault}"),
        }
    }
}

/// Everything that happened in one pass, in port order
#[derive(Debug, Default)]
pub struct PassReport {
    /// Pass number, starting at 1
    pub pass: u64,
    /// Cursor used by a transmission pass
    pub cursor: Option<ReplayCursor>,
    /// Events in the order they happened
    pub events: Vec<PortEvent>,
}

impl PassReport {
    fn push(&mut self, event: PortEvent) {
        event.log();
        self.events.push(event);
    }

    /// Lines received this pass
    pub fn received(&self) -> Vec<(Slot, &str)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                PortEvent::Received { slot, line } => Some((*slot, line.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Lines sent this pass
    pub fn sent(&self) -> Vec<(Slot, &str)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                PortEvent::Sent { slot, line } => Some((*slot, line.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Faults raised this pass
    pub fn faults(&self) -> impl Iterator<Item = &PortFault> {
        self.events.iter().filter_map(|e| match e {
            PortEvent::Fault(fault) => Some(fault),
            _ => None,
        })
    }
}

/// Totals over the life of a loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Completed passes
    pub passes: u64,
    /// Lines appended to logs
    pub lines_collected: u64,
    /// Lines written to ports
    pub lines_sent: u64,
    /// Port faults reported
    pub faults: u64,
}

/// The port-handling scheduler
pub struct PortLoop<'a> {
    ports: &'a mut ActivePortSet,
    store: &'a LineStore,
    mode: Mode,
    interval: Duration,
    cursor: ReplayCursor,
    stats: LoopStats,
}

impl<'a> PortLoop<'a> {
    /// Create a loop over `ports`; `interval` is the pause between
    /// transmission passes
    pub fn new(ports: &'a mut ActivePortSet, store: &'a LineStore, mode: Mode, interval: Duration) -> Self {
        Self {
            ports,
            store,
            mode,
            interval,
            cursor: ReplayCursor::default(),
            stats: LoopStats::default(),
        }
    }

    /// Mode this loop runs in
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Current replay cursor
    pub fn cursor(&self) -> ReplayCursor {
        self.cursor
    }

    /// Totals so far
    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Whether there are no ports to serve
    pub fn is_idle(&self) -> bool {
        self.ports.is_empty()
    }

    /// Run one pass of the configured mode
    pub async fn pass(&mut self) -> PassReport {
        let mut report = PassReport {
            pass: self.stats.passes + 1,
            ..PassReport::default()
        };

        match self.mode {
            Mode::Collection => {
                for port in self.ports.iter_mut() {
                    Self::collect(port, self.store, &mut report, &mut self.stats).await;
                }
            }
            Mode::Transmission => {
                let cursor = self.cursor;
                report.cursor = Some(cursor);
                for port in self.ports.iter_mut() {
                    Self::transmit(port, self.store, cursor, &mut report, &mut self.stats).await;
                }
                self.cursor.advance();
            }
        }

        self.stats.passes += 1;
        self.stats.faults += report.faults().count() as u64;
        report
    }

    /// Run passes until `shutdown` is cancelled.
    ///
    /// Collection passes follow each other immediately; transmission passes
    /// are separated by the interval. The token is checked between passes.
    pub async fn run(&mut self, shutdown: &CancellationToken) -> LoopStats {
        if self.is_idle() {
            warn!("No active ports; the {} loop will spin without doing any work", self.mode);
        }

        match self.mode {
            Mode::Collection => info!("Commencing data read cycle on {} port(s)", self.ports.len()),
            Mode::Transmission => info!(
                "Commencing data transmission cycle on {} port(s), interval {:?}",
                self.ports.len(),
                self.interval
            ),
        }

        while !shutdown.is_cancelled() {
            self.pass().await;

            match self.mode {
                // Reads are bounded by the port timeout; just let other tasks in
                Mode::Collection => tokio::task::yield_now().await,
                Mode::Transmission => {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.interval) => {}
                    }
                }
            }
        }

        info!(
            "Stopped after {} pass(es): {} line(s) collected, {} line(s) sent, {} fault(s)",
            self.stats.passes, self.stats.lines_collected, self.stats.lines_sent, self.stats.faults
        );
        self.stats
    }

    async fn collect(port: &mut ActivePort, store: &LineStore, report: &mut PassReport, stats: &mut LoopStats) {
        let slot = port.slot();

        let data = match port.link_mut().read_line().await {
            Ok(data) => data,
            Err(e) => {
                report.push(PortEvent::Fault(PortFault::new(slot, FaultStage::Read, e)));
                return;
            }
        };

        // Timed out with nothing buffered
        if data.is_empty() {
            return;
        }

        let line = line_text(&data);
        let appended = store.append(slot, &data);
        report.push(PortEvent::Received {
            slot,
            line: line.clone(),
        });

        match appended {
            Ok(()) => stats.lines_collected += 1,
            Err(e) => report.push(PortEvent::Fault(
                PortFault::new(slot, FaultStage::Log, e).with_line(line),
            )),
        }
    }

    async fn transmit(
        port: &mut ActivePort,
        store: &LineStore,
        cursor: ReplayCursor,
        report: &mut PassReport,
        stats: &mut LoopStats,
    ) {
        let slot = port.slot();

        let raw = match store.line_at(slot, cursor.position()) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("{}: nothing to send at line {}", slot, cursor.position());
                return;
            }
            Err(e) => {
                report.push(PortEvent::Fault(PortFault::new(slot, FaultStage::Log, e)));
                return;
            }
        };

        let line = line_text(&raw);
        match port.link_mut().write_all(&raw).await {
            Ok(_) => {
                stats.lines_sent += 1;
                report.push(PortEvent::Sent { slot, line });
            }
            Err(e) => report.push(PortEvent::Fault(
                PortFault::new(slot, FaultStage::Write, e).with_line(line),
            )),
        }
    }
}
