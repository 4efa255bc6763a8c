//! Durable best-record sink.
//!
//! On every new record the sink overwrites a single human-readable summary
//! line (the format operators grep for) and a JSON checkpoint next to it.
//! Writes are best-effort: a failed write warns and moves on, it never
//! rolls back the in-memory record.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::types::BestRecord;

/// File-backed sink for the best record found so far.
#[derive(Debug)]
pub struct RecordSink {
    path: PathBuf,
}

impl RecordSink {
    /// Create the sink, ensuring its parent directory exists.
    ///
    /// Directory creation is the one fallible step surfaced to the caller:
    /// an unusable sink location should fail at startup, not silently
    /// swallow every record later.
    pub fn new(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the summary line and JSON checkpoint. Best-effort.
    pub fn write(&mut self, record: &BestRecord, line: &str) {
        if let Err(err) = fs::write(&self.path, line) {
            eprintln!(
                "warning: failed to write record to {}: {err}",
                self.path.display()
            );
        }

        let json_path = self.path.with_extension("json");
        match serde_json::to_string_pretty(record) {
            Ok(json) => {
                if let Err(err) = fs::write(&json_path, json) {
                    eprintln!(
                        "warning: failed to write checkpoint to {}: {err}",
                        json_path.display()
                    );
                }
            }
            Err(err) => eprintln!("warning: failed to serialize record: {err}"),
        }
    }
}
