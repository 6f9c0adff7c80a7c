use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use sha1::{Digest, Sha1};

/// One stage of an extraction run, as recorded in the run trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Navigate,
    Fields,
    ValidationRules,
    Structure,
    Persist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Ok,
    Failed,
}

#[derive(Debug, Serialize)]
pub struct RunEvent {
    pub timestamp_ms: u128,
    pub run_id: String,
    pub stage: Stage,
    pub status: StageStatus,

    pub count: Option<usize>,
    pub digest: Option<String>,
    pub error: Option<String>,
}

impl RunEvent {
    pub fn now(run_id: &str, stage: Stage) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            run_id: run_id.to_string(),
            stage,
            status: StageStatus::Ok,
            count: None,
            digest: None,
            error: None,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_digest(mut self, digest: impl ToString) -> Self {
        self.digest = Some(digest.to_string());
        self
    }

    pub fn failed(mut self, error: impl ToString) -> Self {
        self.status = StageStatus::Failed;
        self.error = Some(error.to_string());
        self
    }
}

/// Hex SHA-1 of a serialized value; unchanged input gives an unchanged digest.
pub fn digest_of<T: Serialize>(value: &T) -> Option<String> {
    let bytes = serde_json::to_vec(value).ok()?;

    let mut hasher = Sha1::new();
    hasher.update(&bytes);
    Some(format!("{:x}", hasher.finalize()))
}
