//! Logical port slots A–D

use std::fmt;

/// One of the four logical port positions, assigned in discovery order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    /// First discovered device
    A,
    /// Second discovered device
    B,
    /// Third discovered device
    C,
    /// Fourth discovered device
    D,
}

impl Slot {
    /// Maximum number of slots
    pub const COUNT: usize = 4;

    /// All slots in assignment order
    pub const ALL: [Slot; Self::COUNT] = [Slot::A, Slot::B, Slot::C, Slot::D];

    /// Slot for the n-th discovered device (0-based)
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Zero-based position of this slot
    pub fn index(self) -> usize {
        match self {
            Slot::A => 0,
            Slot::B => 1,
            Slot::C => 2,
            Slot::D => 3,
        }
    }

    /// Port name used in diagnostics and configuration (`port_A`)
    pub fn name(self) -> &'static str {
        match self {
            Slot::A => "port_A",
            Slot::B => "port_B",
            Slot::C => "port_C",
            Slot::D => "port_D",
        }
    }

    /// Line log file name (`port_A.txt`)
    pub fn log_file_name(self) -> String {
        format!("{}.txt", self.name())
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
