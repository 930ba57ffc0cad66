use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Destination for a job's console output.
///
/// Everything appended between capture start and finalize is kept in emission
/// order, without deduplication or truncation.
pub trait LogSink {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogSink for Vec<u8> {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

impl<S: LogSink + ?Sized> LogSink for &mut S {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).append(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Adapts any `Write` (stdout, a socket, a buffer) into a sink.
#[derive(Debug)]
pub struct WriteSink<W: Write> {
    inner: W,
}

impl<W: Write> WriteSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> LogSink for WriteSink<W> {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Append-only log file.
#[derive(Debug)]
pub struct FileLogSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileLogSink {
    /// Open `path` for appending, creating it when missing.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    /// Create `path` empty, discarding any previous content.
    pub fn create(path: &Path) -> io::Result<Self> {
        File::create(path)?;
        Self::open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and fsync; used before the log is measured.
    pub fn sync(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()
    }
}

impl LogSink for FileLogSink {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Duplicates every append into two sinks (console and log file, usually).
#[derive(Debug)]
pub struct TeeSink<A, B> {
    first: A,
    second: B,
}

impl<A: LogSink, B: LogSink> TeeSink<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    pub fn into_parts(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A: LogSink, B: LogSink> LogSink for TeeSink<A, B> {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.first.append(bytes)?;
        self.second.append(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.first.flush()?;
        self.second.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sink_appends_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        {
            let mut sink = FileLogSink::create(&path).unwrap();
            sink.append(b"one\n").unwrap();
            sink.append(b"two\n").unwrap();
            sink.flush().unwrap();
        }
        {
            let mut sink = FileLogSink::open(&path).unwrap();
            sink.append(b"three\n").unwrap();
            sink.sync().unwrap();
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo\nthree\n");
    }

    #[test]
    fn tee_duplicates_every_append() {
        let mut tee = TeeSink::new(Vec::new(), WriteSink::new(Vec::new()));
        tee.append(b"a").unwrap();
        tee.append(b"b").unwrap();
        let (first, second) = tee.into_parts();
        assert_eq!(first, b"ab");
        assert_eq!(second.into_inner(), b"ab");
    }
}
