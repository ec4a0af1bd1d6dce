//! Port registry
//!
//! Turns the discovered device list into the [`ActivePortSet`]: the first
//! matching device goes to slot A, the second to B and so on up to D. A slot
//! that cannot be opened is logged and left out; it never affects the others.

use super::discovery::{matching_paths, DevicePattern, DeviceSource, SystemDevices};
use super::slot::Slot;
use super::transport::{LinePort, PortError, PortSettings, SerialLinePort};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Identity and electrical configuration of one opened slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescriptor {
    /// Logical slot
    pub slot: Slot,
    /// Device path
    pub path: String,
    /// Electrical settings
    pub settings: PortSettings,
    /// Per-read timeout
    pub timeout: Duration,
}

/// An opened slot: its descriptor plus the live link
pub struct ActivePort {
    descriptor: PortDescriptor,
    link: Box<dyn LinePort>,
}

impl ActivePort {
    /// Pair a descriptor with its open link
    pub fn new(descriptor: PortDescriptor, link: Box<dyn LinePort>) -> Self {
        Self { descriptor, link }
    }

    /// Descriptor of this port
    pub fn descriptor(&self) -> &PortDescriptor {
        &self.descriptor
    }

    /// Slot of this port
    pub fn slot(&self) -> Slot {
        self.descriptor.slot
    }

    /// Live link
    pub fn link_mut(&mut self) -> &mut dyn LinePort {
        self.link.as_mut()
    }

    /// Link description for diagnostics
    pub fn connection_info(&self) -> String {
        self.link.connection_info()
    }
}

impl fmt::Debug for ActivePort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivePort")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Errors building an [`ActivePortSet`]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// More ports than slots
    #[error("at most {max} ports can be active, got {0}", max = Slot::COUNT)]
    TooManyPorts(usize),

    /// A slot was used twice
    #[error("{0} assigned more than once")]
    DuplicateSlot(Slot),
}

/// Ordered set of up to four opened ports, in discovery order
#[derive(Debug, Default)]
pub struct ActivePortSet {
    ports: Vec<ActivePort>,
}

impl ActivePortSet {
    /// Build a set, keeping the given order
    pub fn from_ports(ports: Vec<ActivePort>) -> Result<Self, RegistryError> {
        if ports.len() > Slot::COUNT {
            return Err(RegistryError::TooManyPorts(ports.len()));
        }

        let mut seen = [false; Slot::COUNT];
        for port in &ports {
            let index = port.slot().index();
            if seen[index] {
                return Err(RegistryError::DuplicateSlot(port.slot()));
            }
            seen[index] = true;
        }

        Ok(Self { ports })
    }

    /// Number of active ports
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// Whether no port is active
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Active slots in order
    pub fn slots(&self) -> Vec<Slot> {
        self.ports.iter().map(ActivePort::slot).collect()
    }

    /// Iterate ports in order
    pub fn iter(&self) -> impl Iterator<Item = &ActivePort> {
        self.ports.iter()
    }

    /// Iterate ports mutably in order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ActivePort> {
        self.ports.iter_mut()
    }
}

/// Opens a descriptor into a live link
pub trait PortOpener {
    /// Open the device described by `descriptor`
    fn open(&self, descriptor: &PortDescriptor) -> Result<Box<dyn LinePort>, PortError>;
}

/// Opens real serial ports
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialOpener;

impl PortOpener for SerialOpener {
    fn open(&self, descriptor: &PortDescriptor) -> Result<Box<dyn LinePort>, PortError> {
        let port = SerialLinePort::open(&descriptor.path, &descriptor.settings, descriptor.timeout)?;
        Ok(Box::new(port))
    }
}

/// Why a slot could not be set up
#[derive(Error, Debug)]
pub enum SetupFaultKind {
    /// The device refused to open
    #[error("open failed: {0}")]
    OpenFailed(#[source] PortError),

    /// No electrical settings were configured for the slot
    #[error("no electrical settings configured")]
    MissingSettings,
}

/// A slot that was left out of the active set
#[derive(Error, Debug)]
#[error("{slot} ({path}): {kind}")]
pub struct SetupFault {
    /// Slot that failed
    pub slot: Slot,
    /// Device assigned to it
    pub path: String,
    /// Cause
    #[source]
    pub kind: SetupFaultKind,
}

/// Result of opening the registry
#[derive(Debug, Default)]
pub struct RegistryOutcome {
    /// Matching device paths, sorted
    pub discovered: Vec<String>,
    /// Successfully opened ports
    pub ports: ActivePortSet,
    /// Slots left out
    pub faults: Vec<SetupFault>,
}

/// Discovers devices and opens them into slots
pub struct PortRegistry<S = SystemDevices, O = SerialOpener> {
    source: S,
    opener: O,
    pattern: DevicePattern,
    settings: [Option<PortSettings>; Slot::COUNT],
    timeout: Duration,
}

impl PortRegistry {
    /// Registry over the host's serial ports
    pub fn new(
        pattern: DevicePattern,
        settings: [Option<PortSettings>; Slot::COUNT],
        timeout: Duration,
    ) -> Self {
        Self::with_backends(SystemDevices, SerialOpener, pattern, settings, timeout)
    }
}

impl<S: DeviceSource, O: PortOpener> PortRegistry<S, O> {
    /// Registry with explicit device source and opener
    pub fn with_backends(
        source: S,
        opener: O,
        pattern: DevicePattern,
        settings: [Option<PortSettings>; Slot::COUNT],
        timeout: Duration,
    ) -> Self {
        Self {
            source,
            opener,
            pattern,
            settings,
            timeout,
        }
    }

    /// Matching device paths in slot assignment order.
    ///
    /// Enumeration failure is logged and yields no devices.
    pub fn discover(&self) -> Vec<String> {
        match self.source.devices() {
            Ok(devices) => matching_paths(devices, &self.pattern),
            Err(e) => {
                warn!("Serial port enumeration failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Discover devices and open up to four of them
    pub fn open(&self) -> RegistryOutcome {
        let discovered = self.discover();
        info!(
            "Available serial ports matching '{}': {:?}",
            self.pattern.as_str(),
            discovered
        );

        let mut ports = Vec::new();
        let mut faults = Vec::new();

        for (slot, path) in Slot::ALL.into_iter().zip(discovered.iter()) {
            match self.open_slot(slot, path) {
                Ok(port) => ports.push(port),
                Err(fault) => {
                    warn!("Serial port setup error: {}", fault);
                    faults.push(fault);
                }
            }
        }

        // Slots are distinct and at most four by construction
        let ports = ActivePortSet { ports };

        info!("Serial ports set up: {:?}", ports.slots());
        for port in ports.iter() {
            info!("{} {}", port.slot(), port.connection_info());
        }

        RegistryOutcome {
            discovered,
            ports,
            faults,
        }
    }

    fn open_slot(&self, slot: Slot, path: &str) -> Result<ActivePort, SetupFault> {
        let fault = |kind| SetupFault {
            slot,
            path: path.to_string(),
            kind,
        };

        let settings = self.settings[slot.index()].ok_or_else(|| fault(SetupFaultKind::MissingSettings))?;

        let descriptor = PortDescriptor {
            slot,
            path: path.to_string(),
            settings,
            timeout: self.timeout,
        };

        let link = self
            .opener
            .open(&descriptor)
            .map_err(|e| fault(SetupFaultKind::OpenFailed(e)))?;

        Ok(ActivePort::new(descriptor, link))
    }
}
