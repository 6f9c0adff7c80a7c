use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

/// Which wait of the document loader ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// Navigation until network quiescence.
    Navigation,
    /// Waiting for the first form-bearing element.
    ReadySelector,
}

impl std::fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadPhase::Navigation => write!(f, "navigation"),
            LoadPhase::ReadySelector => write!(f, "ready selector"),
        }
    }
}

/// Failures talking to the browser driver process.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to spawn {script} (is Node.js installed?): {source}")]
    Spawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Browser driver I/O failed: {0}")]
    Io(String),

    #[error("JSON parse error ({context}): {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON serialize error ({context}): {source}")]
    JsonSerialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Driver command '{command}' failed: {error}")]
    Protocol { command: String, error: String },

    #[error("Driver gave no response to '{command}' within {limit_ms} ms")]
    Timeout { command: String, limit_ms: u64 },
}

/// The target document never became ready.
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("Timed out after {limit_ms} ms waiting for {phase}")]
    Timeout { phase: LoadPhase, limit_ms: u64 },

    #[error("Could not reach {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// An in-document evaluation could not run.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Document evaluation '{query}' failed: {reason}")]
    Evaluation { query: String, reason: String },

    #[error("No document is loaded")]
    NotLoaded,

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Writing or reading a persisted artifact failed.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not encode {what}: {source}")]
    Encode {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Per-field messages produced when submitted values fail their constraints.
///
/// Keys are field ids on the client and body member names on the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("Validation failed for {} field(s)", .errors.len())]
pub struct ValidationError {
    pub errors: BTreeMap<String, String>,
}

impl ValidationError {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.insert(field.into(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }
}

/// Any failure of a whole extraction run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
