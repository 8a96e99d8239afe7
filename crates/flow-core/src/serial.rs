use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{DataBits, Parity, SerialPort, StopBits};

use crate::io_ext::{ReadClose, WriteClose};

/// Line settings for a serial endpoint, validated once up front so a typo
/// in the config surfaces before any port is opened.
#[derive(Debug, Clone, Copy)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub read_timeout: Duration,
}

impl SerialSettings {
    pub fn parse(
        baud: u32,
        parity: &str,
        data_bits: u8,
        two_stop_bits: bool,
        read_timeout_ms: u64,
    ) -> io::Result<Self> {
        if baud == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "baud rate must be set and greater than 0",
            ));
        }
        if data_bits == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "data length must be set and greater than 0",
            ));
        }
        let parity = match parity.to_lowercase().as_str() {
            "" => Parity::None,
            "even" => Parity::Even,
            "odd" => Parity::Odd,
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("parity must be 'even' or 'odd', got '{other}'"),
                ))
            }
        };
        let data_bits = match data_bits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            8 => DataBits::Eight,
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("unsupported data bits value {other}"),
                ))
            }
        };
        let stop_bits = if two_stop_bits {
            StopBits::Two
        } else {
            StopBits::One
        };

        Ok(Self {
            baud_rate: baud,
            data_bits,
            parity,
            stop_bits,
            read_timeout: Duration::from_millis(read_timeout_ms),
        })
    }
}

/// Lists the names of the serial ports currently visible to the OS. Errors
/// from the underlying enumeration are logged by the caller and treated as
/// "no ports available" rather than propagated, matching how port
/// enumeration failures are non-fatal in practice (a missing driver
/// shouldn't take down the whole listing).
pub fn list_ports() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(_) => Vec::new(),
    }
}

fn open(channel: &str, settings: &SerialSettings) -> io::Result<Box<dyn SerialPort>> {
    serialport::new(channel, settings.baud_rate)
        .data_bits(settings.data_bits)
        .parity(settings.parity)
        .stop_bits(settings.stop_bits)
        .timeout(settings.read_timeout)
        .open()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
}

/// One open serial connection, split into an independent reader and writer
/// handle via [`SerialPort::try_clone`] the same way a TCP stream would be
/// cloned for full-duplex use. A read that returns zero bytes with no
/// error (the underlying library's behaviour when a read times out, rather
/// than returning a timeout error) is normalized to EOF so the forwarder's
/// copy loop never blocks forever waiting for a byte that was never coming
/// this pass.
pub struct SerialReader {
    port: Box<dyn SerialPort>,
}

impl SerialReader {
    pub fn open(channel: &str, settings: &SerialSettings) -> io::Result<(Self, SerialWriter)> {
        let port = open(channel, settings)?;
        let writer_port = port.try_clone().map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok((Self { port }, SerialWriter { port: writer_port }))
    }
}

impl Read for SerialReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.port.read(buf) {
            Ok(0) => Ok(0),
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }
}

impl ReadClose for SerialReader {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct SerialWriter {
    port: Box<dyn SerialPort>,
}

impl Write for SerialWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl WriteClose for SerialWriter {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_baud_rate() {
        let err = SerialSettings::parse(0, "", 8, false, 100).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn rejects_zero_data_bits() {
        let err = SerialSettings::parse(9600, "", 0, false, 100).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn rejects_invalid_parity() {
        let err = SerialSettings::parse(9600, "garbage", 8, false, 100).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn accepts_valid_settings() {
        let settings = SerialSettings::parse(115_200, "even", 8, true, 50).unwrap();
        assert_eq!(settings.baud_rate, 115_200);
        assert!(matches!(settings.parity, Parity::Even));
        assert!(matches!(settings.stop_bits, StopBits::Two));
    }
}
