//! File-backed audit log.
//!
//! Appends one JSON line per record to a dedicated audit file. A mutex keeps
//! concurrent records from interleaving. The file is opened lazily so a
//! missing parent directory surfaces at first write, not construction.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::domain::foundation::DomainError;
use crate::ports::{AuditLog, AuditRecord};

/// Audit log writing JSON lines to a file.
#[derive(Debug)]
pub struct FileAuditLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileAuditLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl AuditLog for FileAuditLog {
    async fn record(&self, record: AuditRecord) -> Result<(), DomainError> {
        let mut line =
            serde_json::to_string(&record).map_err(DomainError::storage_unavailable)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let open = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await;
        let mut file = match open {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent)
                        .await
                        .map_err(DomainError::storage_unavailable)?;
                }
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)
                    .await
                    .map_err(DomainError::storage_unavailable)?
            }
            Err(e) => return Err(DomainError::storage_unavailable(e)),
        };
        file.write_all(line.as_bytes())
            .await
            .map_err(DomainError::storage_unavailable)
    }
}

/// Audit log that drops every record. Used by tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditLog;

#[async_trait]
impl AuditLog for NoopAuditLog {
    async fn record(&self, _record: AuditRecord) -> Result<(), DomainError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{AuditOperation, AuditOutcome};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn records_append_one_json_line_each() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let log = FileAuditLog::new(&path);

        log.record(AuditRecord::new(AuditOperation::Handshake, AuditOutcome::Ok))
            .await
            .unwrap();
        log.record(AuditRecord::new(AuditOperation::Question, AuditOutcome::Denied))
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: AuditRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.operation, AuditOperation::Question);
        assert_eq!(second.outcome, AuditOutcome::Denied);
    }

    #[tokio::test]
    async fn missing_parent_directory_is_created() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("audit.jsonl");
        let log = FileAuditLog::new(&path);
        log.record(AuditRecord::new(AuditOperation::Close, AuditOutcome::Ok))
            .await
            .unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn concurrent_records_do_not_interleave() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let log = Arc::new(FileAuditLog::new(&path));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let log = Arc::clone(&log);
            handles.push(tokio::spawn(async move {
                log.record(AuditRecord::new(AuditOperation::Answer, AuditOutcome::Ok))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 16);
        for line in contents.lines() {
            serde_json::from_str::<AuditRecord>(line).unwrap();
        }
    }
}
