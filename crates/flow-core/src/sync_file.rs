use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::io_ext::{ReadClose, WriteClose};

/// A single file handle shared between a reader and a writer side.
///
/// Every access is serialized through one mutex so that a write landing
/// between two reads (or vice versa) can never tear a read buffer or lose
/// bytes to a racing seek. `write` always seeks to the current end of file,
/// writes there, then restores whatever read position was in effect before
/// the write, so a reader tailing the file never has its cursor disturbed
/// by writes happening on the same endpoint.
pub struct SyncFile {
    file: Mutex<File>,
}

impl SyncFile {
    /// Opens `path` for read and write, creating it if it doesn't exist.
    /// `truncate` mirrors the config-level `Trunc` flag: append mode by
    /// default, truncate-on-open when set.
    pub fn open<P: AsRef<Path>>(path: P, truncate: bool) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(truncate)
            .open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl Read for SyncFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut file = self.file.lock().unwrap();
        file.read(buf)
    }
}

impl Write for SyncFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self.file.lock().unwrap();
        let current_pos = file.stream_position()?;
        file.seek(SeekFrom::End(0))?;
        let result = file.write(buf);
        file.seek(SeekFrom::Start(current_pos))?;
        result
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut file = self.file.lock().unwrap();
        file.flush()
    }
}

impl ReadClose for SyncFile {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl WriteClose for SyncFile {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A cloneable handle onto one [`SyncFile`], so a single opened file can
/// back both a reader endpoint and a writer endpoint at once (the one
/// config node's `Reader()` and `Writer()` resolving to the same
/// underlying handle, the way the file endpoint does it).
#[derive(Clone)]
pub struct SyncFileHandle(Arc<Mutex<SyncFile>>);

impl SyncFileHandle {
    pub fn new(file: SyncFile) -> Self {
        Self(Arc::new(Mutex::new(file)))
    }
}

impl Read for SyncFileHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.lock().unwrap().read(buf)
    }
}

impl Write for SyncFileHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock().unwrap().flush()
    }
}

impl ReadClose for SyncFileHandle {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl WriteClose for SyncFileHandle {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}
