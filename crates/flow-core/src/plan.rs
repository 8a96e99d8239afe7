use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use crate::io_ext::{BoxedWriter, WriteClose};

/// A cloneable handle onto a writer shared between potentially several
/// connection records, e.g. a writer that receives the fan-in output of
/// more than one reader.
#[derive(Clone)]
pub struct SharedWriter(pub Rc<RefCell<BoxedWriter>>);

impl SharedWriter {
    pub fn new(writer: BoxedWriter) -> Self {
        Self(Rc::new(RefCell::new(writer)))
    }

    /// Identity of the underlying writer, stable across clones, so callers
    /// closing a set of [`ConnectionRecord`]s can tell that two records
    /// share one fan-in target and close it only once.
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn close(&self) -> io::Result<()> {
        self.0.borrow_mut().close()
    }
}

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.borrow_mut().flush()
    }
}

/// The write side of a [`crate::plan::ConnectionRecord`]: either a single
/// writer, or a fan-out across several.
pub enum ConnectionWriter {
    Single(SharedWriter),
    FanOut(FanOutWriter),
}

impl ConnectionWriter {
    /// Every [`SharedWriter`] reachable from this record's write side, for
    /// callers that need to close each underlying sink exactly once (a
    /// fan-out has several; a shared fan-in target may also be reachable
    /// from another record's `Single` variant with the same identity).
    pub fn members(&self) -> Vec<&SharedWriter> {
        match self {
            ConnectionWriter::Single(w) => vec![w],
            ConnectionWriter::FanOut(f) => f.members().iter().map(|(_, w)| w).collect(),
        }
    }
}

impl Write for ConnectionWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            ConnectionWriter::Single(w) => w.write(buf),
            ConnectionWriter::FanOut(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            ConnectionWriter::Single(w) => w.flush(),
            ConnectionWriter::FanOut(w) => w.flush(),
        }
    }
}

/// Writes the same bytes to every member writer, in declaration order,
/// stopping at the first one that errors rather than retrying or skipping
/// it. A partial fan-out is reported as a failure for the whole write.
pub struct FanOutWriter {
    writers: Vec<(String, SharedWriter)>,
}

impl FanOutWriter {
    pub fn new(writers: Vec<(String, SharedWriter)>) -> Self {
        Self { writers }
    }

    pub fn writer_ids(&self) -> Vec<String> {
        self.writers.iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn members(&self) -> &[(String, SharedWriter)] {
        &self.writers
    }
}

impl Write for FanOutWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for (_, w) in &mut self.writers {
            w.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        for (_, w) in &mut self.writers {
            w.flush()?;
        }
        Ok(())
    }
}

/// One resolved reader → fan-out-writer edge, ready for the forwarder loop
/// to repeatedly copy across.
pub struct ConnectionRecord {
    pub reader_id: String,
    pub reader: crate::io_ext::BoxedReader,
    pub writer: ConnectionWriter,
    pub writer_ids: Vec<String>,
}

impl ConnectionRecord {
    pub fn new(
        reader_id: String,
        reader: crate::io_ext::BoxedReader,
        writer: ConnectionWriter,
        writer_ids: Vec<String>,
    ) -> Self {
        Self {
            reader_id,
            reader,
            writer,
            writer_ids,
        }
    }
}
