use crate::bundle::{BundleMetadata, Conclusion, JobBundle};
use crate::layout::{is_valid_folder_name, job_folder_name, BundlePaths};
use crate::sink::{FileLogSink, LogSink};
use crate::{CaptureError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Exclusive handle on one job's bundle between initialize and finalize.
///
/// `finalize` consumes the handle, so one process can finalize a bundle at
/// most once.
#[derive(Debug)]
pub struct CaptureHandle {
    job_name: String,
    folder: String,
    results_dir: PathBuf,
    paths: BundlePaths,
    sink: FileLogSink,
    created_at: DateTime<Utc>,
}

/// Start capturing `job_name` under `results_dir`.
///
/// Creates the bundle folder, an empty log with a start marker line, and
/// placeholder metadata. Any previous bundle for the same job is replaced.
pub fn initialize_capture(results_dir: &Path, job_name: &str) -> Result<CaptureHandle> {
    let job_name = job_name.trim();
    let folder = job_folder_name(job_name);
    if !is_valid_folder_name(&folder) {
        return Err(CaptureError::InvalidJobName(job_name.to_string()));
    }

    let paths = BundlePaths::new(results_dir.join(&folder));
    std::fs::create_dir_all(&paths.dir)?;

    let created_at = Utc::now();
    let mut sink = FileLogSink::create(&paths.log)?;
    let marker = format!(
        "=== capture started: job={job_name} at {} ===\n",
        created_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    sink.append(marker.as_bytes())?;
    sink.flush()?;

    BundleMetadata::placeholder(job_name, created_at).write(&paths.metadata)?;
    log::info!("Capture initialized for job '{job_name}' at {}", paths.dir.display());

    Ok(CaptureHandle {
        job_name: job_name.to_string(),
        folder,
        results_dir: results_dir.to_path_buf(),
        paths,
        sink,
        created_at,
    })
}

impl CaptureHandle {
    /// Reopen a bundle started by an earlier process (a later CI step).
    pub fn open(results_dir: &Path, job_name: &str) -> Result<Self> {
        let job_name = job_name.trim();
        let folder = job_folder_name(job_name);
        if !is_valid_folder_name(&folder) {
            return Err(CaptureError::InvalidJobName(job_name.to_string()));
        }
        let paths = BundlePaths::new(results_dir.join(&folder));
        if !paths.log.is_file() {
            return Err(CaptureError::NotInitialized {
                job_name: job_name.to_string(),
                dir: paths.dir,
            });
        }

        let created_at = match BundleMetadata::read(&paths.metadata) {
            Ok(meta) if meta.is_finalized() => {
                return Err(CaptureError::AlreadyFinalized(job_name.to_string()));
            }
            Ok(meta) => meta.created_at,
            Err(err) => {
                log::warn!("Placeholder metadata unreadable for '{job_name}': {err}");
                Utc::now()
            }
        };

        let sink = FileLogSink::open(&paths.log)?;
        Ok(Self {
            job_name: job_name.to_string(),
            folder,
            results_dir: results_dir.to_path_buf(),
            paths,
            sink,
            created_at,
        })
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn bundle_dir(&self) -> &Path {
        &self.paths.dir
    }

    pub fn log_path(&self) -> &Path {
        &self.paths.log
    }

    pub fn sink(&mut self) -> &mut FileLogSink {
        &mut self.sink
    }

    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        self.sink.append(bytes)?;
        Ok(())
    }

    /// Close the capture: measure the log once, copy the summary, then write
    /// the final metadata. Metadata is written only after the log is synced.
    ///
    /// A failed summary copy is logged and ignored.
    pub fn finalize(
        mut self,
        conclusion: Conclusion,
        summary_source: Option<&Path>,
    ) -> Result<JobBundle> {
        if let Ok(existing) = BundleMetadata::read(&self.paths.metadata) {
            if existing.is_finalized() {
                return Err(CaptureError::AlreadyFinalized(self.job_name));
            }
        }

        let marker = format!("=== capture finished: conclusion={conclusion} ===\n");
        self.sink.append(marker.as_bytes())?;
        self.sink.sync()?;
        drop(self.sink);

        let size_bytes = std::fs::metadata(&self.paths.log)?.len();
        let line_count = count_lines(&self.paths.log)?;

        if let Some(source) = summary_source {
            copy_summary(source, &self.paths.summary);
        }

        let metadata = BundleMetadata {
            job_name: self.job_name.clone(),
            conclusion: Some(conclusion),
            size_bytes,
            line_count,
            created_at: self.created_at,
            finalized_at: Some(Utc::now()),
        };
        metadata.write(&self.paths.metadata)?;
        log::info!(
            "Capture finalized for job '{}': {conclusion}, {size_bytes} bytes, {line_count} lines",
            self.job_name
        );

        JobBundle::from_metadata(&self.results_dir, &self.folder, metadata)
            .ok_or_else(|| CaptureError::AlreadyFinalized(self.job_name.clone()))
    }
}

fn copy_summary(source: &Path, dest: &Path) {
    if !source.is_file() {
        log::debug!("No summary at {}", source.display());
        return;
    }
    if let Err(err) = std::fs::copy(source, dest) {
        log::warn!(
            "Failed to copy summary {} -> {}: {err}",
            source.display(),
            dest.display()
        );
    }
}

/// Number of lines in a file; a trailing fragment without a newline counts as a line.
pub fn count_lines(path: &Path) -> std::io::Result<u64> {
    let mut reader = BufReader::new(std::fs::File::open(path)?);
    let mut buf = [0u8; 64 * 1024];
    let mut lines = 0u64;
    let mut last = None;
    loop {
        let read = reader.read(&mut buf)?;
        if read == 0 {
            break;
        }
        lines += buf[..read].iter().filter(|&&b| b == b'\n').count() as u64;
        last = Some(buf[read - 1]);
    }
    if matches!(last, Some(b) if b != b'\n') {
        lines += 1;
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn initialize_writes_marker_and_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let handle = initialize_capture(dir.path(), "core-ci").unwrap();
        let log = std::fs::read_to_string(handle.log_path()).unwrap();
        assert!(log.starts_with("=== capture started: job=core-ci at "));

        let meta = BundleMetadata::read(&handle.bundle_dir().join("metadata.json")).unwrap();
        assert_eq!(meta.job_name, "core-ci");
        assert_eq!(meta.conclusion, None);
        assert_eq!(meta.size_bytes, 0);
    }

    #[test]
    fn finalize_measures_log_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut handle = initialize_capture(dir.path(), "lint").unwrap();
        handle.append(b"step one\nstep two\n").unwrap();
        let bundle = handle.finalize(Conclusion::Failure, None).unwrap();

        let on_disk = std::fs::read(&bundle.log_path).unwrap();
        assert_eq!(bundle.size_bytes, on_disk.len() as u64);
        // start marker + two lines + finish marker
        assert_eq!(bundle.line_count, 4);
        assert_eq!(bundle.conclusion, Conclusion::Failure);
        assert!(bundle.summary_path.is_none());

        let meta = BundleMetadata::read(&dir.path().join("lint/metadata.json")).unwrap();
        assert_eq!(meta.size_bytes, bundle.size_bytes);
        assert!(meta.finalized_at.is_some());
    }

    #[test]
    fn finalize_copies_summary_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let summary = dir.path().join("step_summary.md");
        std::fs::write(&summary, "## Tests\n- 3 failed\n").unwrap();

        let handle = initialize_capture(&dir.path().join("results"), "tests").unwrap();
        let bundle = handle.finalize(Conclusion::Failure, Some(&summary)).unwrap();
        let copied = bundle.summary_path.expect("summary copied");
        assert_eq!(std::fs::read_to_string(copied).unwrap(), "## Tests\n- 3 failed\n");
    }

    #[test]
    fn missing_summary_source_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let handle = initialize_capture(dir.path(), "docs").unwrap();
        let bundle = handle
            .finalize(Conclusion::Success, Some(&dir.path().join("nope.md")))
            .unwrap();
        assert!(!bundle.has_summary());
    }

    #[test]
    fn reopened_bundle_cannot_be_finalized_twice() {
        let dir = tempfile::tempdir().unwrap();
        drop(initialize_capture(dir.path(), "build").unwrap());

        let mut reopened = CaptureHandle::open(dir.path(), "build").unwrap();
        reopened.append(b"compiling\n").unwrap();
        let first = reopened.finalize(Conclusion::Success, None).unwrap();

        let err = CaptureHandle::open(dir.path(), "build").unwrap_err();
        assert!(matches!(err, CaptureError::AlreadyFinalized(_)));

        let meta = BundleMetadata::read(&dir.path().join("build/metadata.json")).unwrap();
        assert_eq!(meta.size_bytes, first.size_bytes);
    }

    #[test]
    fn open_without_initialize_reports_not_initialized() {
        let dir = tempfile::tempdir().unwrap();
        let err = CaptureHandle::open(dir.path(), "ghost").unwrap_err();
        assert!(matches!(err, CaptureError::NotInitialized { .. }));
    }

    #[test]
    fn invalid_job_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            initialize_capture(dir.path(), "   ").unwrap_err(),
            CaptureError::InvalidJobName(_)
        ));
        assert!(matches!(
            initialize_capture(dir.path(), "..").unwrap_err(),
            CaptureError::InvalidJobName(_)
        ));
    }

    #[test]
    fn count_lines_handles_missing_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, "a\nb\nc").unwrap();
        assert_eq!(count_lines(&path).unwrap(), 3);
        std::fs::write(&path, "").unwrap();
        assert_eq!(count_lines(&path).unwrap(), 0);
        std::fs::write(&path, "a\n").unwrap();
        assert_eq!(count_lines(&path).unwrap(), 1);
    }
}
