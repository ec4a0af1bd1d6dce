//! Serial port transport implementation

use super::{LinePort, PortError};
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::fmt;
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::time::Duration;

/// Serial port parity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SerialParity {
    /// No parity
    #[default]
    None,
    /// Odd parity
    Odd,
    /// Even parity
    Even,
}

impl SerialParity {
    /// Single letter form used in `8N1` style notation
    pub fn letter(self) -> &'static str {
        match self {
            SerialParity::None => "N",
            SerialParity::Odd => "O",
            SerialParity::Even => "E",
        }
    }
}

impl std::str::FromStr for SerialParity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "n" => Ok(Self::None),
            "odd" | "o" => Ok(Self::Odd),
            "even" | "e" => Ok(Self::Even),
            other => Err(format!("unsupported parity '{other}'")),
        }
    }
}

impl TryFrom<String> for SerialParity {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SerialParity> for String {
    fn from(parity: SerialParity) -> Self {
        parity.letter().to_string()
    }
}

/// Electrical settings for one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSettings {
    /// Baud rate
    pub baud: u32,
    /// Data bits (5, 6, 7, 8)
    pub bytesize: u8,
    /// Parity
    pub parity: SerialParity,
    /// Stop bits (1, 2)
    pub stopbits: u8,
}

impl PortSettings {
    /// Create settings with 8N1 framing
    pub fn new(baud: u32) -> Self {
        Self {
            baud,
            bytesize: 8,
            parity: SerialParity::None,
            stopbits: 1,
        }
    }

    /// Set data bits
    #[must_use]
    pub fn bytesize(mut self, bits: u8) -> Self {
        self.bytesize = bits;
        self
    }

    /// Set parity
    #[must_use]
    pub fn parity(mut self, parity: SerialParity) -> Self {
        self.parity = parity;
        self
    }

    /// Set stop bits
    #[must_use]
    pub fn stopbits(mut self, bits: u8) -> Self {
        self.stopbits = bits;
        self
    }

    /// Check the settings can be handed to the serial driver
    pub fn validate(&self) -> Result<(), PortError> {
        if self.baud == 0 {
            return Err(PortError::InvalidConfiguration(
                "baud must be greater than zero".to_string(),
            ));
        }
        self.data_bits()?;
        self.stop_bits()?;
        Ok(())
    }

    fn data_bits(&self) -> Result<DataBits, PortError> {
        match self.bytesize {
            5 => Ok(DataBits::Five),
            6 => Ok(DataBits::Six),
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            other => Err(PortError::InvalidConfiguration(format!(
                "bytesize must be 5-8, got {other}"
            ))),
        }
    }

    fn stop_bits(&self) -> Result<StopBits, PortError> {
        match self.stopbits {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            other => Err(PortError::InvalidConfiguration(format!(
                "stopbits must be 1 or 2, got {other}"
            ))),
        }
    }

    fn driver_parity(&self) -> Parity {
        match self.parity {
            SerialParity::Odd => Parity::Odd,
            SerialParity::Even => Parity::Even,
            SerialParity::None => Parity::None,
        }
    }
}

impl Default for PortSettings {
    fn default() -> Self {
        Self::new(9600)
    }
}

impl fmt::Display for PortSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} baud ({}{}{})",
            self.baud,
            self.bytesize,
            self.parity.letter(),
            self.stopbits
        )
    }
}

/// Serial port opened for line reads
pub struct SerialLinePort {
    path: String,
    settings: PortSettings,
    reader: BufReader<Box<dyn SerialPort>>,
}

impl SerialLinePort {
    /// Open `path` with the given settings; flow control is always off
    pub fn open(path: &str, settings: &PortSettings, timeout: Duration) -> Result<Self, PortError> {
        let port = serialport::new(path, settings.baud)
            .data_bits(settings.data_bits()?)
            .stop_bits(settings.stop_bits()?)
            .parity(settings.driver_parity())
            .flow_control(FlowControl::None)
            .timeout(timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => PortError::PortNotFound(path.to_string()),
                serialport::ErrorKind::Io(ErrorKind::NotFound) => {
                    PortError::PortNotFound(path.to_string())
                }
                serialport::ErrorKind::Io(ErrorKind::PermissionDenied) => {
                    PortError::PermissionDenied(path.to_string())
                }
                serialport::ErrorKind::InvalidInput => {
                    PortError::InvalidConfiguration(e.to_string())
                }
                _ => PortError::ConnectionFailed(e.to_string()),
            })?;

        Ok(Self {
            path: path.to_string(),
            settings: *settings,
            reader: BufReader::new(port),
        })
    }
}

#[async_trait]
impl LinePort for SerialLinePort {
    async fn read_line(&mut self) -> Result<Bytes, PortError> {
        let mut line = Vec::new();

        // A timeout leaves whatever arrived so far in `line`
        match self.reader.read_until(b'\n', &mut line) {
            Ok(_) => {}
            Err(ref e) if e.kind() == ErrorKind::TimedOut => {}
            Err(e) => return Err(PortError::IoError(e)),
        }

        Ok(Bytes::from(line))
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let port = self.reader.get_mut();
        port.write_all(data)?;
        port.flush()?;
        Ok(data.len())
    }

    fn connection_info(&self) -> String {
        format!("{} @ {}", self.path, self.settings)
    }
}

/// List available serial ports
pub fn list_ports() -> Result<Vec<serialport::SerialPortInfo>, PortError> {
    serialport::available_ports().map_err(|e| PortError::IoError(e.into()))
}
