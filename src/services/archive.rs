//! Archival Sink
//!
//! Best-effort side channel that records every inbound submission as a
//! JSON line, independent of admission decisions. Failures here are fully
//! isolated: logged and discarded, never visible to the intake path. The
//! oversight identity can pull the whole log as one gzip bundle.

use chrono::{DateTime, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

use crate::domain::{ContentPayload, Origin, Submitter};
use crate::error::Result;

const LOG_FILE: &str = "submissions.jsonl";

#[derive(Serialize)]
struct ArchiveRecord<'a> {
    received_at: DateTime<Utc>,
    origin: &'a Origin,
    submitter: &'a Submitter,
    content: &'a ContentPayload,
}

pub struct ArchiveSink {
    dir: PathBuf,
}

impl ArchiveSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Fire-and-forget: any failure is logged and dropped.
    pub fn record(
        &self,
        origin: &Origin,
        submitter: &Submitter,
        content: &ContentPayload,
        now: DateTime<Utc>,
    ) {
        let record = ArchiveRecord {
            received_at: now,
            origin,
            submitter,
            content,
        };
        if let Err(e) = self.append(&record) {
            debug!(error = %e, "archive write failed (ignored)");
        }
    }

    fn append(&self, record: &ArchiveRecord<'_>) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(LOG_FILE))?;
        let line = serde_json::to_string(record).map_err(std::io::Error::other)?;
        writeln!(file, "{}", line)
    }

    /// Gzip the whole archive log into a single bundle. An absent log
    /// exports as an empty bundle.
    pub fn export_bundle(&self) -> Result<Vec<u8>> {
        let raw = match fs::read(self.dir.join(LOG_FILE)) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw)?;
        Ok(encoder.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::TempDir;

    fn sample() -> (Origin, Submitter, ContentPayload) {
        (
            Origin {
                chat_id: 1,
                message_id: 2,
            },
            Submitter {
                id: 1,
                username: None,
            },
            ContentPayload::Text {
                text: "psst".to_string(),
            },
        )
    }

    #[test]
    fn test_record_appends_json_lines() {
        let dir = TempDir::new().unwrap();
        let sink = ArchiveSink::new(dir.path());
        let (origin, submitter, content) = sample();

        sink.record(&origin, &submitter, &content, Utc::now());
        sink.record(&origin, &submitter, &content, Utc::now());

        let raw = fs::read_to_string(dir.path().join(LOG_FILE)).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["content"]["text"], "psst");
    }

    #[test]
    fn test_export_bundle_roundtrip() {
        let dir = TempDir::new().unwrap();
        let sink = ArchiveSink::new(dir.path());
        let (origin, submitter, content) = sample();
        sink.record(&origin, &submitter, &content, Utc::now());

        let bundle = sink.export_bundle().unwrap();
        let mut decoder = GzDecoder::new(bundle.as_slice());
        let mut text = String::new();
        decoder.read_to_string(&mut text).unwrap();
        assert!(text.contains("psst"));
    }

    #[test]
    fn test_export_with_no_log_is_empty() {
        let dir = TempDir::new().unwrap();
        let sink = ArchiveSink::new(dir.path().join("never-written"));
        let bundle = sink.export_bundle().unwrap();

        let mut decoder = GzDecoder::new(bundle.as_slice());
        let mut text = String::new();
        decoder.read_to_string(&mut text).unwrap();
        assert!(text.is_empty());
    }
}
