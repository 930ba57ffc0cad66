use anyhow::{Context as AnyhowContext, Result};
use ciscope_inspect::InspectError;
use ciscope_protocol::serialize_json_pretty;
use serde::Serialize;
use std::io::{self, Read, Write};
use std::path::Path;

pub(crate) mod capture;
pub(crate) mod diff;
pub(crate) mod index;
pub(crate) mod inspect;

/// Exit code used when an inspection is refused or fails.
pub(crate) const EXIT_FAILURE: i32 = 1;

pub(crate) fn print_stdout(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| {
            if text.ends_with('\n') {
                Ok(())
            } else {
                stdout.write_all(b"\n")
            }
        })
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

/// Print `value` as JSON, or as the markdown produced by `render`.
pub(crate) fn emit<T: Serialize>(json: bool, value: &T, render: impl FnOnce(&T) -> String) -> Result<()> {
    if json {
        print_stdout(&serialize_json_pretty(value)?)
    } else {
        print_stdout(&render(value))
    }
}

/// Report an inspection error. A job missing from the index is an expected
/// state and exits 0; everything else exits non-zero.
pub(crate) fn report_inspect_error(json: bool, err: &InspectError) -> Result<()> {
    if json {
        print_stdout(&serialize_json_pretty(&err.to_envelope())?)?;
    } else if matches!(err, InspectError::JobNotFound { .. }) {
        print_stdout(&err.to_string())?;
    } else {
        eprintln!("Error: {err}");
    }
    if matches!(err, InspectError::JobNotFound { .. }) {
        return Ok(());
    }
    std::process::exit(EXIT_FAILURE);
}

/// Read a file, or stdin when `path` is `-`.
pub(crate) fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(String::from_utf8_lossy(&buf).into_owned());
    }
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
