use std::io::{self, Read, Write};

use crate::io_ext::{ReadClose, WriteClose};
use crate::timed_writer::TimedWriter;

/// Adapts [`std::io::Stdin`] to [`ReadClose`]. Closing is a no-op: the
/// handle is shared process-wide and nothing else in this crate ever owns
/// it exclusively.
pub struct StdinReader(io::Stdin);

impl StdinReader {
    pub fn new() -> Self {
        Self(io::stdin())
    }
}

impl Default for StdinReader {
    fn default() -> Self {
        Self::new()
    }
}

impl Read for StdinReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl ReadClose for StdinReader {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Adapts [`std::io::Stdout`] to [`WriteClose`] so it can sit underneath a
/// [`TimedWriter`]. Closing is a no-op for the same reason as [`StdinReader`].
pub struct StdoutSink(io::Stdout);

impl StdoutSink {
    pub fn new() -> Self {
        Self(io::stdout())
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for StdoutSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl WriteClose for StdoutSink {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Builds the reserved `stdout` endpoint's writer: the process's real
/// standard output, flushed after every write, never closed.
pub fn stdout_writer() -> TimedWriter<StdoutSink> {
    TimedWriter::stdout(StdoutSink::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdout_sink_close_is_a_no_op() {
        let mut sink = StdoutSink::new();
        assert!(WriteClose::close(&mut sink).is_ok());
    }
}
