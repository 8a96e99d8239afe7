pub mod error;
pub mod forwarder;
pub mod io_ext;
pub mod ipc;
pub mod model;
pub mod plan;
pub mod queued_reader;
pub mod registry;
pub mod serial;
pub mod stdio;
pub mod sync_file;
pub mod tcp;
pub mod timed_writer;
pub mod udp;

pub use error::{FlowError, Result};
pub use forwarder::{ForwarderLoop, StopReason};
pub use io_ext::{BoxedReader, BoxedWriter, ReadClose, WriteClose};
pub use model::{is_reserved, EndpointModel, STDIN_ID, STDOUT_ID};
pub use plan::{ConnectionRecord, ConnectionWriter};
pub use registry::{Edge, EndpointRegistry};
pub use sync_file::{SyncFile, SyncFileHandle};
