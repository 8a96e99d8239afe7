use std::io::{self, Read, Write};

/// A byte-source that can be explicitly closed. Implementors are the
/// reader side of an [`Endpoint`].
///
/// [`Endpoint`]: crate::model::EndpointModel
pub trait ReadClose: Read + Send {
    fn close(&mut self) -> io::Result<()>;
}

/// A byte-sink that can be explicitly closed. Implementors are the writer
/// side of an [`Endpoint`].
///
/// [`Endpoint`]: crate::model::EndpointModel
pub trait WriteClose: Write + Send {
    fn close(&mut self) -> io::Result<()>;
}

pub type BoxedReader = Box<dyn ReadClose>;
pub type BoxedWriter = Box<dyn WriteClose>;
