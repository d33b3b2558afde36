use std::fs;

use camino::Utf8Path;
use tracing::{info, warn};

use crate::error::DashError;
use crate::model::Activity;

/// Where the pipeline caches the table between live fetches.
pub const DEFAULT_CACHE_PATH: &str = "data/activities.csv";

/// Writes the full table as CSV, header row first, overwriting whatever is
/// at `path`. The write goes through a temp file and a rename so a crashed
/// run never leaves a half-written cache behind.
pub fn save(rows: &[Activity], path: &Utf8Path) -> Result<(), DashError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .map_err(|err| DashError::CacheWrite(err.to_string()))?;
    }
    let content = writer
        .into_inner()
        .map_err(|err| DashError::CacheWrite(err.to_string()))?;

    write_bytes_atomic(path, &content)?;
    info!(path = %path, rows = rows.len(), "activity cache written");
    Ok(())
}

/// Reads the cached table back. A missing or unreadable file is a cache
/// miss, not an error: the caller gets an empty table and decides whether
/// to trigger a live fetch.
pub fn load(path: &Utf8Path) -> Vec<Activity> {
    if !path.as_std_path().exists() {
        return Vec::new();
    }

    let mut reader = match csv::Reader::from_path(path.as_std_path()) {
        Ok(reader) => reader,
        Err(err) => {
            warn!(path = %path, error = %err, "activity cache unreadable, treating as empty");
            return Vec::new();
        }
    };

    let mut rows = Vec::new();
    for record in reader.deserialize::<Activity>() {
        match record {
            Ok(row) => rows.push(row),
            Err(err) => {
                warn!(path = %path, error = %err, "activity cache corrupt, treating as empty");
                return Vec::new();
            }
        }
    }
    rows
}

fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), DashError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| DashError::Filesystem(err.to_string()))?;
    }
    let tmp_path = path.with_extension("csv.tmp");
    fs::write(tmp_path.as_std_path(), content)
        .map_err(|err| DashError::Filesystem(err.to_string()))?;
    fs::rename(tmp_path.as_std_path(), path.as_std_path())
        .map_err(|err| DashError::Filesystem(err.to_string()))?;
    Ok(())
}
