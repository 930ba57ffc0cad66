use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Streams a log one line at a time, decoding invalid UTF-8 with replacement
/// characters. Line numbers start at 1.
pub(crate) struct LossyLines {
    reader: BufReader<File>,
    buf: Vec<u8>,
    line_no: usize,
}

impl LossyLines {
    pub(crate) fn open(path: &Path) -> io::Result<Self> {
        Ok(Self {
            reader: BufReader::new(File::open(path)?),
            buf: Vec::new(),
            line_no: 0,
        })
    }

    /// Next line including its terminator, or `None` at end of file.
    pub(crate) fn next_raw(&mut self) -> io::Result<Option<(usize, String)>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        Ok(Some((self.line_no, String::from_utf8_lossy(&self.buf).into_owned())))
    }
}

impl Iterator for LossyLines {
    type Item = io::Result<(usize, String)>;

    /// Lines with the `\n` / `\r\n` terminator stripped.
    fn next(&mut self) -> Option<Self::Item> {
        match self.next_raw() {
            Ok(Some((line_no, mut text))) => {
                let trimmed = text.trim_end_matches(['\r', '\n']).len();
                text.truncate(trimmed);
                Some(Ok((line_no, text)))
            }
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_utf8_is_replaced_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        std::fs::write(&path, b"ok\r\nbad \xff byte\nlast").unwrap();

        let lines: Vec<(usize, String)> = LossyLines::open(&path)
            .unwrap()
            .collect::<io::Result<_>>()
            .unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], (1, "ok".to_string()));
        assert_eq!(lines[1], (2, "bad \u{FFFD} byte".to_string()));
        assert_eq!(lines[2], (3, "last".to_string()));
    }
}
