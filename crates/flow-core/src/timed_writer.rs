use std::io::{self, BufWriter, Write};

use crate::io_ext::WriteClose;

/// Wraps a sink in a [`BufWriter`] and flushes after every `write` call, so
/// a slow or bursty reader still shows up promptly on the other end instead
/// of sitting in an application-level buffer. If both the write and the
/// forced flush fail, the write's error is the one reported.
///
/// `close` closes the wrapped sink, except when it wraps the process's
/// standard output: that handle is shared process-wide and closing it
/// would take stdout away from anything else still using it, so `close`
/// degrades to a flush in that one case.
pub struct TimedWriter<W: WriteClose> {
    inner: BufWriter<W>,
    is_stdout: bool,
}

impl<W: WriteClose> TimedWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner: BufWriter::new(inner),
            is_stdout: false,
        }
    }

    pub fn stdout(inner: W) -> Self {
        Self {
            inner: BufWriter::new(inner),
            is_stdout: true,
        }
    }
}

impl<W: WriteClose> Write for TimedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let result = self.inner.write(buf);
        let flush_result = self.inner.flush();
        match result {
            Ok(n) => flush_result.map(|_| n),
            Err(e) => Err(e),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: WriteClose> WriteClose for TimedWriter<W> {
    fn close(&mut self) -> io::Result<()> {
        self.inner.flush()?;
        if self.is_stdout {
            return Ok(());
        }
        self.inner.get_mut().close()
    }
}
