//! Day-batched CSV output with a resumable checkpoint sidecar.
//!
//! Rows for the current day are buffered in memory and appended to the
//! period's CSV only at day boundaries. After every append the file is
//! synced and `<csv>.checkpoint` is rewritten atomically (tmp → rename)
//! with the last flushed window end and the file length at that point.
//! A resumed writer truncates any bytes past that length, so an append
//! interrupted before its checkpoint landed is simply redone.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::CrawlError;
use crate::period::{SubInterval, is_day_boundary};
use crate::record::{CSV_HEADER, Record};

/// Progress marker persisted next to the CSV
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub period: String,
    /// End of the last window whose rows are on disk; `None` before the first flush
    pub flushed_through: Option<NaiveDateTime>,
    pub rows: usize,
    /// CSV length in bytes covered by this checkpoint
    pub bytes: u64,
}

/// Owns one period's output file and its in-memory day buffer
#[derive(Debug)]
pub struct CheckpointWriter {
    path: PathBuf,
    checkpoint_path: PathBuf,
    checkpoint: Checkpoint,
    buffer: Vec<Record>,
    flushes: usize,
}

fn checkpoint_path_for(csv_path: &Path) -> PathBuf {
    let mut name = csv_path.as_os_str().to_owned();
    name.push(".checkpoint");
    PathBuf::from(name)
}

fn csv_writer<W: Write>(inner: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(inner)
}

impl CheckpointWriter {
    /// Start a fresh output file with just the header row
    pub fn create(path: &Path, period: &str) -> Result<Self, CrawlError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(path)?;
        {
            let mut writer = csv_writer(&file);
            writer.write_record(CSV_HEADER)?;
            writer.flush()?;
        }
        file.sync_all()?;
        let bytes = file.metadata()?.len();

        let this = Self {
            path: path.to_path_buf(),
            checkpoint_path: checkpoint_path_for(path),
            checkpoint: Checkpoint {
                period: period.to_string(),
                flushed_through: None,
                rows: 0,
                bytes,
            },
            buffer: Vec::new(),
            flushes: 0,
        };
        this.save_checkpoint()?;
        log::debug!("Created {}", path.display());
        Ok(this)
    }

    /// Reopen `path` if it has a checkpoint for `period`, otherwise [`create`](Self::create).
    pub fn resume_or_create(path: &Path, period: &str) -> Result<Self, CrawlError> {
        let checkpoint_path = checkpoint_path_for(path);
        if !path.exists() || !checkpoint_path.exists() {
            return Self::create(path, period);
        }

        let raw = fs::read_to_string(&checkpoint_path)?;
        let checkpoint: Checkpoint = serde_json::from_str(&raw).map_err(|e| {
            CrawlError::Checkpoint(format!("{}: {e}", checkpoint_path.display()))
        })?;
        if checkpoint.period != period {
            return Err(CrawlError::Checkpoint(format!(
                "{} belongs to period {}, not {period}",
                checkpoint_path.display(),
                checkpoint.period
            )));
        }

        let file = OpenOptions::new().write(true).open(path)?;
        let len = file.metadata()?.len();
        if len < checkpoint.bytes {
            return Err(CrawlError::Checkpoint(format!(
                "{} is shorter ({len} bytes) than its checkpoint ({} bytes)",
                path.display(),
                checkpoint.bytes
            )));
        }
        if len > checkpoint.bytes {
            log::warn!(
                "{}: discarding {} bytes written after the last checkpoint",
                path.display(),
                len - checkpoint.bytes
            );
            file.set_len(checkpoint.bytes)?;
            file.sync_all()?;
        }

        log::info!(
            "Resuming {} ({} rows, flushed through {})",
            path.display(),
            checkpoint.rows,
            checkpoint
                .flushed_through
                .map_or("nothing".to_string(), |t| t.to_string())
        );
        Ok(Self {
            path: path.to_path_buf(),
            checkpoint_path,
            checkpoint,
            buffer: Vec::new(),
            flushes: 0,
        })
    }

    /// Buffer records in arrival order
    pub fn accumulate(&mut self, records: impl IntoIterator<Item = Record>) {
        self.buffer.extend(records);
    }

    /// Flush if `current` is the last window of its day.
    ///
    /// Returns the number of rows written, or `None` when no flush happened.
    pub fn maybe_flush(
        &mut self,
        current: &SubInterval,
        next: Option<&SubInterval>,
    ) -> Result<Option<usize>, CrawlError> {
        if !is_day_boundary(current, next) {
            return Ok(None);
        }
        self.flush(current.end).map(Some)
    }

    /// Append the buffer, sync, record `through` in the checkpoint, clear the buffer
    pub fn flush(&mut self, through: NaiveDateTime) -> Result<usize, CrawlError> {
        let file = OpenOptions::new().append(true).open(&self.path)?;
        {
            let mut writer = csv_writer(&file);
            for record in &self.buffer {
                writer.write_record(record.fields())?;
            }
            writer.flush()?;
        }
        file.sync_data()?;

        let written = self.buffer.len();
        self.checkpoint.rows += written;
        self.checkpoint.bytes = file.metadata()?.len();
        self.checkpoint.flushed_through = Some(through);
        self.save_checkpoint()?;

        self.buffer.clear();
        self.flushes += 1;
        log::info!("Saved {written} rows to {}", self.path.display());
        Ok(written)
    }

    /// Write the checkpoint to a synced temp file in the same directory,
    /// rename it over the old one, then sync the directory entry.
    fn save_checkpoint(&self) -> Result<(), CrawlError> {
        let json = serde_json::to_string_pretty(&self.checkpoint)
            .map_err(|e| CrawlError::Checkpoint(e.to_string()))?;

        let parent = self
            .checkpoint_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.checkpoint_path).map_err(|e| e.error)?;

        // The rename is only durable once the directory is synced
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows waiting for the next flush
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Rows on disk, including those from before a resume
    pub fn rows_written(&self) -> usize {
        self.checkpoint.rows
    }

    /// Flushes performed by this writer instance
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    pub fn flushed_through(&self) -> Option<NaiveDateTime> {
        self.checkpoint.flushed_through
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn record(login: &str) -> Record {
        Record {
            login: login.to_string(),
            location: "Lisbon, Portugal".to_string(),
            bio: "says \"hi\"".to_string(),
            created_at: "2030-02-01T00:00:00Z".to_string(),
        }
    }

    fn window(day: u32, h: u32, m: u32, s: u32, end_h: u32, end_m: u32, end_s: u32) -> SubInterval {
        let date = NaiveDate::from_ymd_opt(2030, 2, day).unwrap();
        SubInterval {
            start: date.and_hms_opt(h, m, s).unwrap(),
            end: date.and_hms_opt(end_h, end_m, end_s).unwrap(),
        }
    }

    #[test]
    fn create_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/out.csv");
        let writer = CheckpointWriter::create(&path, "2030-02").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "login,location,bio,createdAt\n");
        assert_eq!(writer.rows_written(), 0);
        assert!(checkpoint_path_for(&path).exists());
    }

    #[test]
    fn flush_only_at_day_end() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let mut writer = CheckpointWriter::create(&path, "2030-02").unwrap();

        let morning = window(1, 0, 0, 0, 11, 59, 59);
        let evening = window(1, 12, 0, 0, 23, 59, 59);
        let next_day = window(2, 0, 0, 0, 11, 59, 59);

        writer.accumulate([record("a")]);
        assert_eq!(writer.maybe_flush(&morning, Some(&evening)).unwrap(), None);
        assert_eq!(writer.buffered(), 1);

        writer.accumulate([record("b")]);
        assert_eq!(writer.maybe_flush(&evening, Some(&next_day)).unwrap(), Some(2));
        assert_eq!(writer.buffered(), 0);
        assert_eq!(writer.flushes(), 1);
        assert_eq!(writer.flushed_through(), Some(evening.end));

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "login,location,bio,createdAt\n\
             a,\"Lisbon, Portugal\",\"says \"\"hi\"\"\",2030-02-01T00:00:00Z\n\
             b,\"Lisbon, Portugal\",\"says \"\"hi\"\"\",2030-02-01T00:00:00Z\n"
        );
    }

    #[test]
    fn final_window_always_flushes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let mut writer = CheckpointWriter::create(&path, "2030-02-01").unwrap();

        writer.accumulate([record("a")]);
        let only = window(1, 0, 0, 0, 23, 59, 59);
        assert_eq!(writer.maybe_flush(&only, None).unwrap(), Some(1));
    }

    #[test]
    fn empty_day_still_advances_checkpoint() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let mut writer = CheckpointWriter::create(&path, "2030-02").unwrap();

        let through = window(1, 0, 0, 0, 23, 59, 59).end;
        assert_eq!(writer.flush(through).unwrap(), 0);
        assert_eq!(writer.flushed_through(), Some(through));
    }

    #[test]
    fn checkpoint_replaced_without_leftovers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let mut writer = CheckpointWriter::create(&path, "2030-02").unwrap();
        for day in 1..=3 {
            writer.accumulate([record(&format!("u{day}"))]);
            writer.flush(window(day, 0, 0, 0, 23, 59, 59).end).unwrap();
        }

        let mut names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, ["out.csv", "out.csv.checkpoint"]);

        let raw = fs::read_to_string(checkpoint_path_for(&path)).unwrap();
        let saved: Checkpoint = serde_json::from_str(&raw).unwrap();
        assert_eq!(saved.rows, 3);
        assert_eq!(saved.bytes, fs::metadata(&path).unwrap().len());
        assert_eq!(saved.flushed_through, Some(window(3, 0, 0, 0, 23, 59, 59).end));
    }

    #[test]
    fn resume_keeps_rows_and_drops_unchecked_tail() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let through = window(1, 0, 0, 0, 23, 59, 59).end;
        {
            let mut writer = CheckpointWriter::create(&path, "2030-02").unwrap();
            writer.accumulate([record("a"), record("b")]);
            writer.flush(through).unwrap();
        }
        let committed = fs::read_to_string(&path).unwrap();

        // simulate a crash between append and checkpoint update
        let mut f = OpenOptions::new().append(true).open(&path).unwrap();
        f.write_all(b"partial,row\n").unwrap();
        drop(f);

        let mut writer = CheckpointWriter::resume_or_create(&path, "2030-02").unwrap();
        assert_eq!(writer.rows_written(), 2);
        assert_eq!(writer.flushed_through(), Some(through));
        assert_eq!(fs::read_to_string(&path).unwrap(), committed);

        writer.accumulate([record("c")]);
        writer.flush(window(2, 0, 0, 0, 23, 59, 59).end).unwrap();
        assert_eq!(writer.rows_written(), 3);
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("login,location").count(), 1);
        assert_eq!(content.lines().count(), 4);
    }

    #[test]
    fn resume_without_checkpoint_creates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "stale\n").unwrap();

        let writer = CheckpointWriter::resume_or_create(&path, "2030-02").unwrap();
        assert_eq!(writer.flushed_through(), None);
        assert_eq!(fs::read_to_string(&path).unwrap(), "login,location,bio,createdAt\n");
    }

    #[test]
    fn resume_rejects_other_period() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        CheckpointWriter::create(&path, "2030-02").unwrap();

        assert!(matches!(
            CheckpointWriter::resume_or_create(&path, "2030-03"),
            Err(CrawlError::Checkpoint(_))
        ));
    }

    #[test]
    fn resume_rejects_truncated_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        {
            let mut writer = CheckpointWriter::create(&path, "2030-02").unwrap();
            writer.accumulate([record("a")]);
            writer.flush(window(1, 0, 0, 0, 23, 59, 59).end).unwrap();
        }
        fs::write(&path, "login\n").unwrap();

        assert!(matches!(
            CheckpointWriter::resume_or_create(&path, "2030-02"),
            Err(CrawlError::Checkpoint(_))
        ));
    }
}
