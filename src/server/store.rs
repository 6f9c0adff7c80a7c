use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::server::validation::ValidStep1;

/// One accepted submission. Records are only ever appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub id: Uuid,
    pub aadhaar_number: String,
    pub entrepreneur_name: String,
    pub valid: bool,
    pub created_at: DateTime<Utc>,
}

impl SubmissionRecord {
    pub fn accepted(submission: ValidStep1) -> Self {
        Self {
            id: Uuid::new_v4(),
            aadhaar_number: submission.aadhaar_number,
            entrepreneur_name: submission.entrepreneur_name,
            valid: true,
            created_at: Utc::now(),
        }
    }
}

/// Append-only storage for accepted submissions.
pub trait SubmissionStore: Send + Sync {
    fn insert(&self, record: SubmissionRecord) -> Result<SubmissionRecord, PersistenceError>;
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Default)]
pub struct MemorySubmissionStore {
    records: Mutex<Vec<SubmissionRecord>>,
}

impl MemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<SubmissionRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl SubmissionStore for MemorySubmissionStore {
    fn insert(&self, record: SubmissionRecord) -> Result<SubmissionRecord, PersistenceError> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| PersistenceError::Unavailable(format!("store lock poisoned: {}", e)))?;
        records.push(record.clone());
        Ok(record)
    }
}

// ============================================================================
// JSON-lines file store
// ============================================================================

/// Appends each record as one JSON line.
pub struct JsonlSubmissionStore {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlSubmissionStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| PersistenceError::Io {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SubmissionStore for JsonlSubmissionStore {
    fn insert(&self, record: SubmissionRecord) -> Result<SubmissionRecord, PersistenceError> {
        let json = serde_json::to_string(&record).map_err(|source| PersistenceError::Encode {
            what: "submission record".into(),
            source,
        })?;

        let mut file = self
            .file
            .lock()
            .map_err(|e| PersistenceError::Unavailable(format!("store lock poisoned: {}", e)))?;

        writeln!(file, "{}", json)
            .and_then(|_| file.flush())
            .map_err(|source| PersistenceError::Io {
                path: self.path.clone(),
                source,
            })?;

        Ok(record)
    }
}
