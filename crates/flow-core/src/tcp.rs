use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use crate::io_ext::{ReadClose, WriteClose};
use crate::queued_reader::QueuedReader;
use crate::udp::SOCKET_READ_DEADLINE;

/// A listening TCP socket that fans multiple inbound connections into one
/// reader. Every `read` first sweeps for newly-arrived connections (waiting
/// up to [`SOCKET_READ_DEADLINE`] per sweep), then round-robins a read
/// attempt across the live peer list via [`QueuedReader`], dropping any
/// peer whose connection reached EOF. Peers are removed after the sweep,
/// not during it, so removing one doesn't shift the index of a peer still
/// waiting to be read this pass.
pub struct TcpFanIn {
    listener: TcpListener,
    peers: Vec<TcpStream>,
}

impl TcpFanIn {
    pub fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener,
            peers: Vec::new(),
        })
    }

    fn accept_waiting_connections(&mut self) {
        let deadline = Instant::now() + SOCKET_READ_DEADLINE;
        loop {
            match self.listener.accept() {
                Ok((stream, _addr)) => self.peers.push(stream),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return;
                    }
                }
                Err(_) => return,
            }
        }
    }
}

impl Read for TcpFanIn {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.accept_waiting_connections();

        if self.peers.is_empty() {
            return Ok(0);
        }

        let mut removable = Vec::new();
        let result = {
            let mut queued = QueuedReader::new(std::mem::take(&mut self.peers));
            queued.set_pre_read(|stream: &mut TcpStream| {
                let _ = stream.set_read_timeout(Some(SOCKET_READ_DEADLINE));
            });
            queued.set_on_eof(|i, _stream| removable.push(i));
            let result = queued.read(buf);
            self.peers = queued.into_readers();
            result
        };

        removable.sort_unstable();
        for &i in removable.iter().rev() {
            self.peers.remove(i);
        }

        result
    }
}

impl ReadClose for TcpFanIn {
    fn close(&mut self) -> io::Result<()> {
        let mut first_err = None;
        for peer in &self.peers {
            if let Err(e) = peer.shutdown(std::net::Shutdown::Both) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// A single outbound TCP connection used as a writer.
pub struct TcpWriter {
    stream: TcpStream,
}

impl TcpWriter {
    pub fn connect(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        Ok(Self { stream })
    }
}

impl Write for TcpWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl WriteClose for TcpWriter {
    fn close(&mut self) -> io::Result<()> {
        self.stream.shutdown(std::net::Shutdown::Both)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn read_times_out_to_eof_with_no_peers() {
        let port = portpicker::pick_unused_port().expect("no free port");
        let mut fan_in = TcpFanIn::bind(("127.0.0.1", port)).unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(fan_in.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn accepts_peer_and_reads_its_bytes() {
        let port = portpicker::pick_unused_port().expect("no free port");
        let mut fan_in = TcpFanIn::bind(("127.0.0.1", port)).unwrap();

        let handle = thread::spawn(move || {
            let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
            stream.write_all(b"hello").unwrap();
            thread::sleep(Duration::from_millis(50));
        });

        let mut buf = [0u8; 16];
        let n = read_until_nonzero(&mut fan_in, &mut buf);
        assert_eq!(&buf[..n], b"hello");
        handle.join().unwrap();
    }

    fn read_until_nonzero(fan_in: &mut TcpFanIn, buf: &mut [u8]) -> usize {
        for _ in 0..200 {
            let n = fan_in.read(buf).unwrap();
            if n > 0 {
                return n;
            }
        }
        panic!("no data received");
    }
}
