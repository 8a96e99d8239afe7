use std::io::{self, Read, Write};
use std::net::UdpSocket;
use std::time::Duration;

use crate::io_ext::{ReadClose, WriteClose};

/// How long a read blocks waiting for a datagram before giving up and
/// reporting EOF for this pass. Short enough that the forwarder loop's
/// idle-timeout and shutdown checks stay responsive.
pub const SOCKET_READ_DEADLINE: Duration = Duration::from_millis(10);

/// A bound UDP socket used as a reader. Each `read` waits up to
/// [`SOCKET_READ_DEADLINE`] for an incoming datagram; a timeout is reported
/// as EOF (`Ok(0)`) rather than an error, since on a socket there's nothing
/// wrong with the sender simply not having spoken yet.
pub struct UdpReader {
    socket: UdpSocket,
}

impl UdpReader {
    pub fn bind(addr: &str, port: u16) -> io::Result<Self> {
        let socket = UdpSocket::bind((addr, port))?;
        Ok(Self { socket })
    }
}

impl Read for UdpReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket.set_read_timeout(Some(SOCKET_READ_DEADLINE))?;
        match self.socket.recv(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }
}

impl ReadClose for UdpReader {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A UDP socket connected to a fixed peer, used as a writer.
pub struct UdpWriter {
    socket: UdpSocket,
}

impl UdpWriter {
    pub fn connect(addr: &str, port: u16) -> io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect((addr, port))?;
        Ok(Self { socket })
    }
}

impl Write for UdpWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.socket.send(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl WriteClose for UdpWriter {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_write_then_read() {
        let port = portpicker::pick_unused_port().expect("no free port");
        let mut reader = UdpReader::bind("127.0.0.1", port).unwrap();
        let mut writer = UdpWriter::connect("127.0.0.1", port).unwrap();

        writer.write_all(b"ping").unwrap();

        let mut buf = [0u8; 16];
        let n = read_until_nonzero(&mut reader, &mut buf);
        assert_eq!(&buf[..n], b"ping");
    }

    #[test]
    fn read_times_out_to_eof_when_nothing_sent() {
        let port = portpicker::pick_unused_port().expect("no free port");
        let mut reader = UdpReader::bind("127.0.0.1", port).unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    fn read_until_nonzero(reader: &mut UdpReader, buf: &mut [u8]) -> usize {
        for _ in 0..50 {
            let n = reader.read(buf).unwrap();
            if n > 0 {
                return n;
            }
        }
        panic!("no data received");
    }
}
