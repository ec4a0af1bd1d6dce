//! Collection and transmission runs against scripted ports

use async_trait::async_trait;
use bytes::Bytes;
use serial_sim_core::core::discovery::{DeviceInfo, DevicePattern, DeviceSource};
use serial_sim_core::core::registry::PortOpener;
use serial_sim_core::{
    ActivePort, ActivePortSet, LinePort, LineStore, Mode, PortDescriptor, PortError, PortLoop, PortRegistry,
    PortSettings, Slot,
};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Read outcome scripted for one attempt
#[derive(Clone, Copy)]
enum Read {
    Line(&'static str),
    Timeout,
    Fault,
}

#[derive(Clone, Default)]
struct Wire(Arc<Mutex<Vec<Vec<u8>>>>);

impl Wire {
    fn written(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .map(|d| String::from_utf8_lossy(d).into_owned())
            .collect()
    }
}

struct ScriptedPort {
    reads: VecDeque<Read>,
    wire: Wire,
    fail_writes: bool,
}

impl ScriptedPort {
    fn reading(reads: &[Read]) -> Self {
        Self {
            reads: reads.iter().copied().collect(),
            wire: Wire::default(),
            fail_writes: false,
        }
    }

    fn writing(wire: &Wire) -> Self {
        Self {
            reads: VecDeque::new(),
            wire: wire.clone(),
            fail_writes: false,
        }
    }
}

#[async_trait]
impl LinePort for ScriptedPort {
    async fn read_line(&mut self) -> Result<Bytes, PortError> {
        match self.reads.pop_front().unwrap_or(Read::Timeout) {
            Read::Line(line) => Ok(Bytes::from(format!("{line}\r\n"))),
            Read::Timeout => Ok(Bytes::new()),
            Read::Fault => Err(PortError::IoError(io::Error::new(io::ErrorKind::Other, "framing error"))),
        }
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<usize, PortError> {
        if self.fail_writes {
            return Err(PortError::Disconnected);
        }
        self.wire.0.lock().unwrap().push(data.to_vec());
        Ok(data.len())
    }

    fn connection_info(&self) -> String {
        "scripted".to_string()
    }
}

fn port(slot: Slot, link: ScriptedPort) -> ActivePort {
    ActivePort::new(
        PortDescriptor {
            slot,
            path: format!("/dev/ttyUSB{}", slot.index()),
            settings: PortSettings::default(),
            timeout: Duration::from_millis(20),
        },
        Box::new(link),
    )
}

async fn collect(store: &LineStore, ports: Vec<ActivePort>, passes: usize) -> Vec<String> {
    let mut ports = ActivePortSet::from_ports(ports).unwrap();
    let mut port_loop = PortLoop::new(&mut ports, store, Mode::Collection, Duration::ZERO);

    let mut diagnostics = Vec::new();
    for _ in 0..passes {
        let report = port_loop.pass().await;
        diagnostics.extend(report.events.iter().map(ToString::to_string));
    }
    diagnostics
}

#[tokio::test]
async fn collected_lines_replay_to_their_origin_port() {
    let dir = TempDir::new().unwrap();
    let store = LineStore::new(dir.path());

    collect(
        &store,
        vec![port(
            Slot::A,
            ScriptedPort::reading(&[Read::Line("L0"), Read::Timeout, Read::Line("L1"), Read::Line("L2")]),
        )],
        4,
    )
    .await;
    assert_eq!(store.lines(Slot::A).unwrap(), vec!["L0", "L1", "L2"]);

    let wire = Wire::default();
    let mut ports = ActivePortSet::from_ports(vec![port(Slot::A, ScriptedPort::writing(&wire))]).unwrap();
    let mut port_loop = PortLoop::new(&mut ports, &store, Mode::Transmission, Duration::from_secs(10));

    for _ in 0..4 {
        port_loop.pass().await;
    }

    assert_eq!(wire.written(), vec!["L0\r\n", "L1\r\n", "L2\r\n"]);
    assert_eq!(port_loop.stats().lines_sent, 3);
    assert_eq!(port_loop.stats().passes, 4);
}

#[tokio::test]
async fn collection_appends_across_runs() {
    let dir = TempDir::new().unwrap();
    let store = LineStore::new(dir.path());

    collect(&store, vec![port(Slot::B, ScriptedPort::reading(&[Read::Line("first")]))], 1).await;
    collect(
        &store,
        vec![port(Slot::B, ScriptedPort::reading(&[Read::Line("second"), Read::Line("third")]))],
        2,
    )
    .await;

    assert_eq!(store.lines(Slot::B).unwrap(), vec!["first", "second", "third"]);
}

#[tokio::test]
async fn collection_pass_is_deterministic() {
    let script_a = [Read::Line("a1"), Read::Fault, Read::Line("a2")];
    let script_b = [Read::Timeout, Read::Line("b1"), Read::Line("b2")];

    let mut runs = Vec::new();
    for _ in 0..2 {
        let dir = TempDir::new().unwrap();
        let store = LineStore::new(dir.path());
        let diagnostics = collect(
            &store,
            vec![
                port(Slot::A, ScriptedPort::reading(&script_a)),
                port(Slot::B, ScriptedPort::reading(&script_b)),
            ],
            3,
        )
        .await;
        runs.push((diagnostics, store.lines(Slot::A).unwrap(), store.lines(Slot::B).unwrap()));
    }

    assert_eq!(runs[0], runs[1]);
    assert_eq!(
        runs[0].0,
        vec![
            "port_A: a1",
            "port_A: read error: I/O error: framing error",
            "port_B: b1",
            "port_A: a2",
            "port_B: b2",
        ]
    );
}

#[tokio::test]
async fn write_fault_is_isolated_to_its_port() {
    let dir = TempDir::new().unwrap();
    let store = LineStore::new(dir.path());
    store.append(Slot::A, b"a0").unwrap();
    store.append(Slot::B, b"b0").unwrap();

    let wire = Wire::default();
    let mut failing = ScriptedPort::writing(&wire);
    failing.fail_writes = true;

    let mut ports =
        ActivePortSet::from_ports(vec![port(Slot::A, failing), port(Slot::B, ScriptedPort::writing(&wire))]).unwrap();
    let mut port_loop = PortLoop::new(&mut ports, &store, Mode::Transmission, Duration::from_secs(10));
    let report = port_loop.pass().await;

    assert_eq!(report.faults().map(|f| f.slot).collect::<Vec<_>>(), vec![Slot::A]);
    assert_eq!(wire.written(), vec!["b0\n"]);
}

struct Devices(Vec<&'static str>);

impl DeviceSource for Devices {
    fn devices(&self) -> Result<Vec<DeviceInfo>, PortError> {
        Ok(self.0.iter().map(|p| DeviceInfo::new(*p)).collect())
    }
}

struct ScriptedOpener;

impl PortOpener for ScriptedOpener {
    fn open(&self, descriptor: &PortDescriptor) -> Result<Box<dyn LinePort>, PortError> {
        if descriptor.path.ends_with('1') {
            return Err(PortError::PortNotFound(descriptor.path.clone()));
        }
        let line: &'static str = match descriptor.slot {
            Slot::A => "from A",
            Slot::B => "from B",
            Slot::C => "from C",
            Slot::D => "from D",
        };
        Ok(Box::new(ScriptedPort::reading(&[Read::Line(line)])))
    }
}

#[tokio::test]
async fn registry_output_drives_the_loop() {
    let registry = PortRegistry::with_backends(
        Devices(vec!["/dev/ttyACM2", "/dev/ttyACM1", "/dev/ttyACM0", "/dev/ttyS0"]),
        ScriptedOpener,
        DevicePattern::new("ttyACM").unwrap(),
        [Some(PortSettings::default()); Slot::COUNT],
        Duration::from_millis(20),
    );
    let outcome = registry.open();

    assert_eq!(outcome.discovered, vec!["/dev/ttyACM0", "/dev/ttyACM1", "/dev/ttyACM2"]);
    assert_eq!(outcome.faults.len(), 1);
    assert_eq!(outcome.faults[0].slot, Slot::B);

    let dir = TempDir::new().unwrap();
    let store = LineStore::new(dir.path());
    let mut ports = outcome.ports;
    assert_eq!(ports.slots(), vec![Slot::A, Slot::C]);

    let mut port_loop = PortLoop::new(&mut ports, &store, Mode::Collection, Duration::ZERO);
    let report = port_loop.pass().await;

    assert_eq!(report.received(), vec![(Slot::A, "from A"), (Slot::C, "from C")]);
    assert!(!store.exists(Slot::B));
}
