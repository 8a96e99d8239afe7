use std::io::{self, ErrorKind, Read};

/// Classifies the outcome of one inner read so [`QueuedReader`] knows
/// whether to hand the result back to its caller or move on to the next
/// reader in the queue.
enum ReadOutcome {
    Success(usize),
    Eof,
    Timeout,
    Other(io::Error),
}

fn classify(result: io::Result<usize>) -> ReadOutcome {
    match result {
        Ok(0) => ReadOutcome::Eof,
        Ok(n) => ReadOutcome::Success(n),
        Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
            ReadOutcome::Timeout
        }
        Err(e) => ReadOutcome::Other(e),
    }
}

type PreReadHook<'a, R> = Box<dyn FnMut(&mut R) + 'a>;
type ErrorHook<'a, R> = Box<dyn FnMut(usize, &mut R) + 'a>;

/// Round-robins reads across a fixed list of readers, similar in spirit to
/// [`std::io::Chain`] but built for endpoints that time out rather than
/// terminate: a timeout or an EOF on one reader just advances to the next,
/// instead of ending the stream. Any other error is returned immediately.
/// If every reader in the list times out or reaches EOF on this pass,
/// `read` reports EOF (`Ok(0)`) so callers drive this the same way they'd
/// drive any other source that currently has nothing to offer.
///
/// Hooks borrow for `'a`, which in practice is the lifetime of one `read`
/// call: callers build a fresh `QueuedReader` around their peer list each
/// time, wire up hooks that close over local state (an index list to
/// prune, say), and let it drop once that read returns.
pub struct QueuedReader<'a, R: Read> {
    readers: Vec<R>,
    pre_read: Option<PreReadHook<'a, R>>,
    on_eof: Option<ErrorHook<'a, R>>,
    on_timeout: Option<ErrorHook<'a, R>>,
}

impl<'a, R: Read> QueuedReader<'a, R> {
    pub fn new(readers: Vec<R>) -> Self {
        Self {
            readers,
            pre_read: None,
            on_eof: None,
            on_timeout: None,
        }
    }

    /// Called immediately before each read attempt; typically used to set a
    /// fresh deadline on the reader about to be polled.
    pub fn set_pre_read<F>(&mut self, f: F)
    where
        F: FnMut(&mut R) + 'a,
    {
        self.pre_read = Some(Box::new(f));
    }

    /// Called with the index and reader that just reached EOF.
    pub fn set_on_eof<F>(&mut self, f: F)
    where
        F: FnMut(usize, &mut R) + 'a,
    {
        self.on_eof = Some(Box::new(f));
    }

    /// Called with the index and reader that just timed out.
    pub fn set_on_timeout<F>(&mut self, f: F)
    where
        F: FnMut(usize, &mut R) + 'a,
    {
        self.on_timeout = Some(Box::new(f));
    }

    pub fn readers(&self) -> &[R] {
        &self.readers
    }

    pub fn readers_mut(&mut self) -> &mut Vec<R> {
        &mut self.readers
    }

    pub fn into_readers(self) -> Vec<R> {
        self.readers
    }
}

impl<'a, R: Read> Read for QueuedReader<'a, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        for i in 0..self.readers.len() {
            if let Some(hook) = &mut self.pre_read {
                hook(&mut self.readers[i]);
            }

            match classify(self.readers[i].read(buf)) {
                ReadOutcome::Success(n) => return Ok(n),
                ReadOutcome::Other(e) => return Err(e),
                ReadOutcome::Timeout => {
                    if let Some(hook) = &mut self.on_timeout {
                        hook(i, &mut self.readers[i]);
                    }
                }
                ReadOutcome::Eof => {
                    if let Some(hook) = &mut self.on_eof {
                        hook(i, &mut self.readers[i]);
                    }
                }
            }
        }
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct ScriptedReader {
        steps: Vec<io::Result<usize>>,
    }

    impl Read for ScriptedReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            if self.steps.is_empty() {
                return Ok(0);
            }
            self.steps.remove(0)
        }
    }

    fn err(kind: ErrorKind) -> io::Result<usize> {
        Err(io::Error::new(kind, "boom"))
    }

    #[test]
    fn returns_first_successful_read() {
        let mut qr = QueuedReader::new(vec![
            ScriptedReader {
                steps: vec![err(ErrorKind::WouldBlock)],
            },
            ScriptedReader {
                steps: vec![Ok(3)],
            },
        ]);
        let mut buf = [0u8; 8];
        assert_eq!(qr.read(&mut buf).unwrap(), 3);
    }

    #[test]
    fn eof_advances_to_next_reader() {
        let mut qr = QueuedReader::new(vec![
            ScriptedReader { steps: vec![Ok(0)] },
            ScriptedReader { steps: vec![Ok(5)] },
        ]);
        let mut buf = [0u8; 8];
        assert_eq!(qr.read(&mut buf).unwrap(), 5);
    }

    #[test]
    fn all_timeouts_report_eof() {
        let mut qr = QueuedReader::new(vec![
            ScriptedReader {
                steps: vec![err(ErrorKind::TimedOut)],
            },
            ScriptedReader {
                steps: vec![err(ErrorKind::WouldBlock)],
            },
        ]);
        let mut buf = [0u8; 8];
        assert_eq!(qr.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn hard_error_returns_immediately() {
        let mut qr = QueuedReader::new(vec![
            ScriptedReader {
                steps: vec![err(ErrorKind::PermissionDenied)],
            },
            ScriptedReader {
                steps: vec![Ok(5)],
            },
        ]);
        let mut buf = [0u8; 8];
        let result = qr.read(&mut buf);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), ErrorKind::PermissionDenied);
    }

    #[test]
    fn pre_read_hook_runs_before_every_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let mut qr = QueuedReader::new(vec![
            ScriptedReader { steps: vec![Ok(0)] },
            ScriptedReader { steps: vec![Ok(1)] },
        ]);
        qr.set_pre_read(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        let mut buf = [0u8; 8];
        qr.read(&mut buf).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
