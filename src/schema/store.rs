use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::PersistenceError;
use crate::schema::schema_model::FormSchema;

pub const DEFAULT_SCHEMA_PATH: &str = "udyam-form-data.json";

/// Write `schema` as pretty JSON, replacing any previous artifact in one step.
///
/// The document is written to a sibling temp file which is then renamed over
/// `path`, so readers see either the old artifact or the new one.
pub fn write_schema(path: &Path, schema: &FormSchema) -> Result<(), PersistenceError> {
    let json = serde_json::to_string_pretty(schema).map_err(|e| PersistenceError::Encode {
        what: "form schema".into(),
        source: e,
    })?;

    let temp = temp_path(path);
    let result = write_then_rename(&temp, path, json.as_bytes());
    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result
}

fn write_then_rename(temp: &Path, path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    let io_err = |p: &Path, source: std::io::Error| PersistenceError::Io {
        path: p.to_path_buf(),
        source,
    };

    let mut file = fs::File::create(temp).map_err(|e| io_err(temp, e))?;
    file.write_all(bytes).map_err(|e| io_err(temp, e))?;
    file.sync_all().map_err(|e| io_err(temp, e))?;
    drop(file);
    fs::rename(temp, path).map_err(|e| io_err(path, e))
}

pub fn load_schema(path: &Path) -> Result<FormSchema, PersistenceError> {
    let content = fs::read_to_string(path).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| PersistenceError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_SCHEMA_PATH.to_string());
    path.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()))
}
