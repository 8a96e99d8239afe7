use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::FlowError;
use crate::plan::ConnectionRecord;

/// Reasons the forwarder loop can stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Signalled,
    IdleTimeout,
}

/// Repeatedly copies each connection record in declaration order, tracking
/// the last time any record moved a non-zero number of bytes. Stops when
/// either `shutdown` is set (an OS signal was received) or, if
/// `idle_timeout` is non-zero, that many seconds pass without any record
/// producing data.
pub struct ForwarderLoop {
    records: Vec<ConnectionRecord>,
    idle_timeout: Option<Duration>,
    shutdown: Arc<AtomicBool>,
}

impl ForwarderLoop {
    pub fn new(
        records: Vec<ConnectionRecord>,
        idle_timeout_seconds: u64,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        let idle_timeout = if idle_timeout_seconds > 0 {
            Some(Duration::from_secs(idle_timeout_seconds))
        } else {
            None
        };
        Self {
            records,
            idle_timeout,
            shutdown,
        }
    }

    /// Drives the copy loop until shutdown or idle-timeout. Returns which
    /// one ended it.
    pub fn run(&mut self) -> StopReason {
        tracing::info!(
            records = self.records.len(),
            idle_timeout_seconds = self.idle_timeout.map(|d| d.as_secs()).unwrap_or(0),
            "forwarder loop starting"
        );

        let mut buf = vec![0u8; 8192];
        let mut last_activity = Instant::now();

        loop {
            for record in &mut self.records {
                match copy_all(&mut *record.reader, &mut record.writer, &mut buf) {
                    Ok(0) => {}
                    Ok(_) => {
                        last_activity = Instant::now();
                    }
                    Err(e) => {
                        let e = FlowError::CopyError {
                            reader_id: record.reader_id.clone(),
                            writer_ids: record.writer_ids.clone(),
                            source: e,
                        };
                        tracing::warn!(error = %e, "continuing with remaining records");
                    }
                }
            }

            if self.shutdown.load(Ordering::SeqCst) {
                tracing::info!("forwarder loop stopping: shutdown signalled");
                return StopReason::Signalled;
            }

            if let Some(timeout) = self.idle_timeout {
                if last_activity.elapsed() >= timeout {
                    tracing::info!("forwarder loop stopping: idle timeout reached");
                    return StopReason::IdleTimeout;
                }
            }
        }
    }

    /// Reclaims the connection records after [`Self::run`] returns, so the
    /// caller can close every endpoint, writers first and then readers.
    pub fn into_records(self) -> Vec<ConnectionRecord> {
        self.records
    }
}

/// Reads into `buf` and writes the exact bytes read, repeating until the
/// reader reports end-of-stream for this pass. Every reader endpoint in
/// this crate translates a quiet period into end-of-stream via its own
/// deadline, so this returns promptly even when nothing arrived.
fn copy_all<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    buf: &mut [u8],
) -> std::io::Result<u64> {
    let mut total = 0u64;
    loop {
        let n = reader.read(buf)?;
        if n == 0 {
            return Ok(total);
        }
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io_ext::{ReadClose, WriteClose};
    use crate::plan::{ConnectionWriter, SharedWriter};
    use std::cell::RefCell;
    use std::io;
    use std::rc::Rc;

    struct ScriptedReader {
        chunks: Vec<Vec<u8>>,
    }

    impl Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.chunks.is_empty() {
                return Ok(0);
            }
            let chunk = self.chunks.remove(0);
            buf[..chunk.len()].copy_from_slice(&chunk);
            Ok(chunk.len())
        }
    }

    impl ReadClose for ScriptedReader {
        fn close(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct RecordingWriter(Rc<RefCell<Vec<u8>>>);

    impl Write for RecordingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl WriteClose for RecordingWriter {
        fn close(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn copy_all_drains_until_reader_reports_eof() {
        let mut reader = ScriptedReader {
            chunks: vec![b"ab".to_vec(), b"cd".to_vec()],
        };
        let mut out = Vec::new();
        let written = copy_all(&mut reader, &mut out, &mut [0u8; 16]).unwrap();
        assert_eq!(written, 4);
        assert_eq!(out, b"abcd");
    }

    #[test]
    fn stops_on_shutdown_signal_between_passes() {
        let buf = Rc::new(RefCell::new(Vec::new()));
        let record = crate::plan::ConnectionRecord::new(
            "r".into(),
            Box::new(ScriptedReader { chunks: vec![] }),
            ConnectionWriter::Single(SharedWriter::new(Box::new(RecordingWriter(buf)))),
            vec!["w".into()],
        );
        let shutdown = Arc::new(AtomicBool::new(true));
        let mut loop_ = ForwarderLoop::new(vec![record], 0, shutdown);
        assert_eq!(loop_.run(), StopReason::Signalled);
    }

    #[test]
    fn stops_on_idle_timeout_when_nothing_moves() {
        let buf = Rc::new(RefCell::new(Vec::new()));
        let record = crate::plan::ConnectionRecord::new(
            "r".into(),
            Box::new(ScriptedReader { chunks: vec![] }),
            ConnectionWriter::Single(SharedWriter::new(Box::new(RecordingWriter(buf)))),
            vec!["w".into()],
        );
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut loop_ = ForwarderLoop::new(vec![record], 0, shutdown.clone());
        // Force the idle window to something the test can actually wait out.
        loop_.idle_timeout = Some(Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(loop_.run(), StopReason::IdleTimeout);
    }
}
