use crate::error::Result;
use crate::io_ext::{BoxedReader, BoxedWriter};

/// Reserved endpoint ID for the process's standard input.
pub const STDIN_ID: &str = "stdin";
/// Reserved endpoint ID for the process's standard output.
pub const STDOUT_ID: &str = "stdout";

/// True if `id` collides with one of the two reserved stream names.
pub fn is_reserved(id: &str) -> bool {
    id == STDIN_ID || id == STDOUT_ID
}

/// The capability set every concrete endpoint kind exposes: an ID, a
/// validation/pre-open step, and lazy reader/writer construction. Concrete
/// variants are tagged structs implementing this trait rather than an
/// inheritance hierarchy.
///
/// Not every endpoint supports both sides (declared node kinds do; the
/// reserved `stdin`/`stdout` entries are pre-seeded directly by the
/// registry and never go through this trait), but the trait itself is
/// uniform so the registry can treat all declared nodes identically.
pub trait EndpointModel: Send {
    /// The endpoint's declared ID.
    fn id(&self) -> &str;

    /// Filesystem creation, serial-port presence checks, or other
    /// pre-flight work. A no-op for endpoint kinds with nothing to check.
    fn validate(&mut self) -> Result<()>;

    /// Open (or return the already-open) read side.
    fn open_reader(&mut self) -> Result<BoxedReader>;

    /// Open (or return the already-open) write side.
    fn open_writer(&mut self) -> Result<BoxedWriter>;
}
