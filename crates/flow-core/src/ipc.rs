use std::io::{self, Read, Write};
use std::time::Instant;

use interprocess::local_socket::traits::{Listener as _, Stream as _};
use interprocess::local_socket::{
    GenericNamespaced, ListenerNonblockingMode, ListenerOptions, Stream, ToNsName,
};

use crate::io_ext::{ReadClose, WriteClose};
use crate::queued_reader::QueuedReader;
use crate::udp::SOCKET_READ_DEADLINE;

/// A named local-socket listener that fans multiple inbound clients into
/// one reader, the IPC counterpart of [`crate::tcp::TcpFanIn`]: accept any
/// waiting clients, then round-robin a read across the live client list,
/// dropping any client that reaches EOF.
pub struct IpcFanIn {
    listener: interprocess::local_socket::Listener,
    clients: Vec<Stream>,
}

impl IpcFanIn {
    pub fn bind(channel: &str) -> io::Result<Self> {
        let name = channel
            .to_ns_name::<GenericNamespaced>()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let listener = ListenerOptions::new()
            .name(name)
            .reclaim_name(true)
            .create_sync()?;
        listener.set_nonblocking(ListenerNonblockingMode::Both)?;
        Ok(Self {
            listener,
            clients: Vec::new(),
        })
    }

    fn accept_waiting_connections(&mut self) {
        let deadline = Instant::now() + SOCKET_READ_DEADLINE;
        loop {
            match self.listener.accept() {
                Ok(stream) => self.clients.push(stream),
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

impl Read for IpcFanIn {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.accept_waiting_connections();

        if self.clients.is_empty() {
            return Ok(0);
        }

        let mut removable = Vec::new();
        let result = {
            let mut queued = QueuedReader::new(std::mem::take(&mut self.clients));
            queued.set_pre_read(|stream: &mut Stream| {
                let _ = stream.set_nonblocking(true);
            });
            queued.set_on_eof(|i, _stream| removable.push(i));
            let result = queued.read(buf);
            self.clients = queued.into_readers();
            result
        };

        removable.sort_unstable();
        for &i in removable.iter().rev() {
            self.clients.remove(i);
        }

        result
    }
}

impl ReadClose for IpcFanIn {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A single outbound local-socket connection used as a writer.
pub struct IpcWriter {
    stream: Stream,
}

impl IpcWriter {
    pub fn connect(channel: &str) -> io::Result<Self> {
        let name = channel
            .to_ns_name::<GenericNamespaced>()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let stream = Stream::connect(name)?;
        Ok(Self { stream })
    }
}

impl Write for IpcWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl WriteClose for IpcWriter {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}
