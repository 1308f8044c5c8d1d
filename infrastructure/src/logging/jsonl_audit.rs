//! JSONL file writer for compliance audit events.
//!
//! Each [`AuditEvent`] is serialized as a single JSON line with its `event`
//! tag and timestamps, appended to the file via a buffered writer. The
//! trail is the durable record behind redaction and rejection decisions, so
//! every write is flushed.

use bidbridge_application::ports::audit_log::{AuditEvent, ComplianceAuditLog};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// JSONL audit log that writes one JSON object per line.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes on `Drop`.
pub struct JsonlAuditLog {
    writer: Mutex<BufWriter<std::fs::File>>,
    path: PathBuf,
}

impl JsonlAuditLog {
    /// Create a new audit log appending to the given path.
    ///
    /// Creates the file (and parent directories) if they don't exist.
    /// Returns `None` if the file cannot be opened.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create audit log directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open audit log file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    /// Get the path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ComplianceAuditLog for JsonlAuditLog {
    fn record(&self, event: AuditEvent) {
        let Ok(line) = serde_json::to_string(&event) else {
            warn!("Could not serialize audit event; dropping it");
            return;
        };

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
            // Flush every event - the trail must survive a crash
            let _ = writer.flush();
        }
    }
}

impl Drop for JsonlAuditLog {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}
