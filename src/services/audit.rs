use crate::error::{AppError, AppResult};
use crate::models::{utc_now, AuditEntry, AuditFilter, AuditLog};
use crate::repositories::{AuditRepository, Page};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// One line of the file mirror
#[derive(Serialize)]
struct AuditLine<'a> {
    timestamp: NaiveDateTime,
    #[serde(flatten)]
    entry: &'a AuditEntry,
}

/// Daily `audit_YYYY-MM-DD.log` files, opened lazily and rotated at midnight UTC
struct AuditFileMirror {
    directory: PathBuf,
    current: Mutex<Option<(NaiveDate, File)>>,
}

impl AuditFileMirror {
    fn new(directory: PathBuf) -> AppResult<Self> {
        std::fs::create_dir_all(&directory)
            .map_err(|e| AppError::Config(format!("Failed to create audit log directory: {}", e)))?;
        info!("Audit file mirror enabled: {:?}", directory);
        Ok(Self {
            directory,
            current: Mutex::new(None),
        })
    }

    fn file_for(directory: &Path, date: NaiveDate) -> std::io::Result<File> {
        let path = directory.join(format!("audit_{}.log", date.format("%Y-%m-%d")));
        OpenOptions::new().create(true).append(true).open(path)
    }

    async fn append(&self, timestamp: NaiveDateTime, entry: &AuditEntry) -> AppResult<()> {
        let json = serde_json::to_string(&AuditLine { timestamp, entry })?;
        let date = timestamp.date();

        let mut current = self.current.lock().await;
        let stale = !matches!(current.as_ref(), Some((day, _)) if *day == date);
        if stale {
            let file = Self::file_for(&self.directory, date)
                .map_err(|e| AppError::Message(format!("Failed to open audit log file: {}", e)))?;
            *current = Some((date, file));
        }

        if let Some((_, file)) = current.as_mut() {
            writeln!(file, "{}", json)
                .and_then(|_| file.flush())
                .map_err(|e| AppError::Message(format!("Failed to write audit log: {}", e)))?;
        }
        Ok(())
    }
}

/// Audit trail for mutating operations
///
/// Recording never fails the caller: storage problems are logged and dropped.
pub struct AuditService {
    repo: Arc<AuditRepository>,
    mirror: Option<AuditFileMirror>,
}

impl AuditService {
    pub fn new(repo: Arc<AuditRepository>, log_directory: Option<PathBuf>) -> AppResult<Self> {
        let mirror = log_directory.map(AuditFileMirror::new).transpose()?;
        Ok(Self { repo, mirror })
    }

    pub async fn record(&self, entry: AuditEntry) {
        if let Err(e) = self.repo.insert(&entry).await {
            warn!(
                action = %entry.action,
                resource = entry.resource_type,
                "Failed to store audit record: {}",
                e
            );
        }

        if let Some(mirror) = &self.mirror {
            if let Err(e) = mirror.append(utc_now(), &entry).await {
                warn!("Failed to mirror audit record: {}", e);
            }
        }
    }

    pub async fn list(&self, filter: &AuditFilter, page: Page) -> AppResult<Vec<AuditLog>> {
        Ok(self.repo.list(filter, page).await?)
    }
}
