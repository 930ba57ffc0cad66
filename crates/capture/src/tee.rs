use crate::sink::LogSink;
use crate::Result;
use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Run `command`, streaming its stdout and stderr line by line into `sink`
/// and, when `echo` is set, back to this process's console.
///
/// The child's exit status is returned untouched. If the sink starts failing,
/// capture stops with a warning while the command keeps running.
pub fn run_teed(command: &mut Command, sink: &mut dyn LogSink, echo: bool) -> Result<ExitStatus> {
    let mut child = command
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let (tx, rx) = mpsc::channel::<(Stream, Vec<u8>)>();
    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_reader(stdout, Stream::Stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_reader(stderr, Stream::Stderr, tx.clone()));
    }
    drop(tx);

    let mut sink_failed = false;
    for (stream, line) in rx {
        if !sink_failed {
            if let Err(err) = sink.append(&line) {
                log::warn!("Log capture failed, continuing without it: {err}");
                sink_failed = true;
            }
        }
        if echo {
            let written = match stream {
                Stream::Stdout => std::io::stdout().lock().write_all(&line),
                Stream::Stderr => std::io::stderr().lock().write_all(&line),
            };
            if let Err(err) = written {
                log::debug!("Console echo failed: {err}");
            }
        }
    }

    for reader in readers {
        if reader.join().is_err() {
            log::warn!("Output reader thread panicked");
        }
    }

    let status = child.wait()?;
    if !sink_failed {
        if let Err(err) = sink.flush() {
            log::warn!("Failed to flush captured log: {err}");
        }
    }
    Ok(status)
}

fn spawn_reader<R: Read + Send + 'static>(
    reader: R,
    stream: Stream,
    tx: Sender<(Stream, Vec<u8>)>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        loop {
            let mut line = Vec::new();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send((stream, line)).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    log::warn!("Failed to read child {stream:?}: {err}");
                    break;
                }
            }
        }
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn captures_both_streams_and_keeps_exit_code() {
        let mut sink: Vec<u8> = Vec::new();
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo out-line; echo err-line 1>&2; exit 3");
        let status = run_teed(&mut cmd, &mut sink, false).unwrap();

        assert_eq!(status.code(), Some(3));
        let captured = String::from_utf8(sink).unwrap();
        assert!(captured.contains("out-line\n"));
        assert!(captured.contains("err-line\n"));
    }

    #[test]
    fn preserves_order_within_one_stream() {
        let mut sink: Vec<u8> = Vec::new();
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("for i in 1 2 3 4 5; do echo line-$i; done");
        run_teed(&mut cmd, &mut sink, false).unwrap();
        assert_eq!(
            String::from_utf8(sink).unwrap(),
            "line-1\nline-2\nline-3\nline-4\nline-5\n"
        );
    }
}
