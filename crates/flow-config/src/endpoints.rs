use std::io;

use flow_core::io_ext::{BoxedReader, BoxedWriter};
use flow_core::ipc::{IpcFanIn, IpcWriter};
use flow_core::model::EndpointModel;
use flow_core::serial::{self, SerialReader, SerialSettings, SerialWriter};
use flow_core::sync_file::{SyncFile, SyncFileHandle};
use flow_core::tcp::{TcpFanIn, TcpWriter};
use flow_core::udp::{UdpReader, UdpWriter};
use flow_core::{FlowError, Result};

use crate::schema::{Config, FileConfig, IpcConfig, PortConfig, Protocol, SocketConfig};

/// Builds one boxed [`EndpointModel`] per declared node, in the order the
/// config lists files, then ports, then sockets, then ipcs. Uniqueness of
/// IDs (including collisions with `stdin`/`stdout`) is enforced downstream
/// by [`flow_core::registry::EndpointRegistry::new`].
pub fn build_endpoints(config: &Config) -> Vec<Box<dyn EndpointModel>> {
    let mut endpoints: Vec<Box<dyn EndpointModel>> = Vec::new();
    for file in &config.nodes.files {
        endpoints.push(Box::new(FileEndpoint::new(file.clone())));
    }
    for port in &config.nodes.ports {
        endpoints.push(Box::new(PortEndpoint::new(port.clone())));
    }
    for socket in &config.nodes.sockets {
        endpoints.push(Box::new(SocketEndpoint::new(socket.clone())));
    }
    for ipc in &config.nodes.ipcs {
        endpoints.push(Box::new(IpcEndpoint::new(ipc.clone())));
    }
    endpoints
}

fn open_err(id: &str, source: io::Error) -> FlowError {
    FlowError::EndpointOpen {
        id: id.to_string(),
        source,
    }
}

/// A file node: both sides resolve to clones of the same [`SyncFileHandle`]
/// so writing through one edge is visible to a reader on another, opened
/// lazily on whichever side is requested first.
pub struct FileEndpoint {
    config: FileConfig,
    handle: Option<SyncFileHandle>,
}

impl FileEndpoint {
    pub fn new(config: FileConfig) -> Self {
        Self {
            config,
            handle: None,
        }
    }

    fn ensure_open(&mut self) -> io::Result<SyncFileHandle> {
        if let Some(handle) = &self.handle {
            return Ok(handle.clone());
        }
        let file = SyncFile::open(&self.config.path, self.config.trunc)?;
        let handle = SyncFileHandle::new(file);
        self.handle = Some(handle.clone());
        Ok(handle)
    }
}

impl EndpointModel for FileEndpoint {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn validate(&mut self) -> Result<()> {
        if !self.config.path.exists() {
            std::fs::File::create(&self.config.path)
                .map_err(|e| open_err(&self.config.id, e))?;
        }
        Ok(())
    }

    fn open_reader(&mut self) -> Result<BoxedReader> {
        let handle = self
            .ensure_open()
            .map_err(|e| open_err(&self.config.id, e))?;
        Ok(Box::new(handle))
    }

    fn open_writer(&mut self) -> Result<BoxedWriter> {
        let handle = self
            .ensure_open()
            .map_err(|e| open_err(&self.config.id, e))?;
        Ok(Box::new(handle))
    }
}

/// A TCP or UDP socket node. The reader and writer sides are independent
/// sockets (a fan-in listener for the reader, a dialed connection for the
/// writer), so the same address and port can be wired as both a reader
/// and a writer endpoint within one config.
pub struct SocketEndpoint {
    config: SocketConfig,
}

impl SocketEndpoint {
    pub fn new(config: SocketConfig) -> Self {
        Self { config }
    }
}

impl EndpointModel for SocketEndpoint {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn validate(&mut self) -> Result<()> {
        Ok(())
    }

    fn open_reader(&mut self) -> Result<BoxedReader> {
        match self.config.protocol {
            Protocol::Tcp => {
                let fan_in = TcpFanIn::bind((self.config.address.as_str(), self.config.port))
                    .map_err(|e| open_err(&self.config.id, e))?;
                Ok(Box::new(fan_in))
            }
            Protocol::Udp => {
                let reader = UdpReader::bind(&self.config.address, self.config.port)
                    .map_err(|e| open_err(&self.config.id, e))?;
                Ok(Box::new(reader))
            }
        }
    }

    fn open_writer(&mut self) -> Result<BoxedWriter> {
        match self.config.protocol {
            Protocol::Tcp => {
                let writer = TcpWriter::connect((self.config.address.as_str(), self.config.port))
                    .map_err(|e| open_err(&self.config.id, e))?;
                Ok(Box::new(writer))
            }
            Protocol::Udp => {
                let writer = UdpWriter::connect(&self.config.address, self.config.port)
                    .map_err(|e| open_err(&self.config.id, e))?;
                Ok(Box::new(writer))
            }
        }
    }
}

/// An IPC node: a named local-socket channel, server-side fan-in for the
/// reader, client dial for the writer. The IPC counterpart of
/// [`SocketEndpoint`].
pub struct IpcEndpoint {
    config: IpcConfig,
}

impl IpcEndpoint {
    pub fn new(config: IpcConfig) -> Self {
        Self { config }
    }
}

impl EndpointModel for IpcEndpoint {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn validate(&mut self) -> Result<()> {
        Ok(())
    }

    fn open_reader(&mut self) -> Result<BoxedReader> {
        let fan_in =
            IpcFanIn::bind(&self.config.channel).map_err(|e| open_err(&self.config.id, e))?;
        Ok(Box::new(fan_in))
    }

    fn open_writer(&mut self) -> Result<BoxedWriter> {
        let writer =
            IpcWriter::connect(&self.config.channel).map_err(|e| open_err(&self.config.id, e))?;
        Ok(Box::new(writer))
    }
}

/// A serial port node. Unlike the socket/IPC nodes, both sides come from a
/// single underlying handle (`SerialPort::try_clone`), so whichever side is
/// requested first opens the port and the two halves are handed out
/// independently as each is asked for exactly once.
pub struct PortEndpoint {
    config: PortConfig,
    reader: Option<SerialReader>,
    writer: Option<SerialWriter>,
}

impl PortEndpoint {
    pub fn new(config: PortConfig) -> Self {
        Self {
            config,
            reader: None,
            writer: None,
        }
    }

    fn settings(&self) -> io::Result<SerialSettings> {
        SerialSettings::parse(
            self.config.mode.baud_rate,
            &self.config.mode.parity,
            self.config.mode.data_bits,
            self.config.mode.stop_bits >= 2,
            self.config.read_timeout_ms,
        )
    }

    fn ensure_open(&mut self) -> io::Result<()> {
        if self.reader.is_some() || self.writer.is_some() {
            return Ok(());
        }
        let settings = self.settings()?;
        let (reader, writer) = SerialReader::open(&self.config.channel, &settings)?;
        self.reader = Some(reader);
        self.writer = Some(writer);
        Ok(())
    }
}

impl EndpointModel for PortEndpoint {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn validate(&mut self) -> Result<()> {
        self.settings()
            .map_err(|e| FlowError::ConfigValidation(format!("{}: {e}", self.config.id)))?;
        let available = serial::list_ports();
        if !available.iter().any(|p| p == &self.config.channel) {
            return Err(FlowError::ConfigValidation(format!(
                "serial port [{}] not found among available ports: {available:?}",
                self.config.channel
            )));
        }
        Ok(())
    }

    fn open_reader(&mut self) -> Result<BoxedReader> {
        self.ensure_open().map_err(|e| open_err(&self.config.id, e))?;
        let reader = self.reader.take().ok_or_else(|| {
            open_err(
                &self.config.id,
                io::Error::new(io::ErrorKind::Other, "serial reader already taken"),
            )
        })?;
        Ok(Box::new(reader))
    }

    fn open_writer(&mut self) -> Result<BoxedWriter> {
        self.ensure_open().map_err(|e| open_err(&self.config.id, e))?;
        let writer = self.writer.take().ok_or_else(|| {
            open_err(
                &self.config.id,
                io::Error::new(io::ErrorKind::Other, "serial writer already taken"),
            )
        })?;
        Ok(Box::new(writer))
    }
}
