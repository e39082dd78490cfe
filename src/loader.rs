//! Dataset loading and exact-duplicate removal.
//!
//! Files are read as JSON Lines (one object per line) or as a single top-level
//! JSON array, gzip-compressed or not. Rows are compared in full before they
//! are narrowed to [`AdRecord`], so two exports that differ only in a field
//! the report never looks at are still kept apart.

use anyhow::{Context, Result, bail};
use flate2::read::GzDecoder;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::fetch::auth::ApiKey;
use crate::fetch::{BasicClient, HttpClient, fetch_bytes};
use crate::record::AdRecord;

/// Where the dataset lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    /// A directory of record files, or a single file.
    Local(PathBuf),
    /// An `http://` or `https://` URL to a single record file.
    Remote(String),
}

impl DatasetSource {
    /// Interprets a CLI argument as a URL when it has an HTTP scheme, and as a
    /// filesystem path otherwise.
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            DatasetSource::Remote(raw.to_string())
        } else {
            DatasetSource::Local(PathBuf::from(raw))
        }
    }
}

impl fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetSource::Local(path) => write!(f, "{}", path.display()),
            DatasetSource::Remote(url) => write!(f, "{url}"),
        }
    }
}

/// Counters gathered while loading, reported alongside the aggregates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub files_read: usize,
    pub rows_read: usize,
    pub duplicates_removed: usize,
}

impl LoadStats {
    pub fn rows_kept(&self) -> usize {
        self.rows_read - self.duplicates_removed
    }
}

/// The deduplicated dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<AdRecord>,
    pub stats: LoadStats,
}

/// Loads and deduplicates the dataset at `source`.
///
/// `token`, when set, is sent as a bearer credential for remote sources.
#[tracing::instrument(skip(source, token), fields(source = %source))]
pub async fn load_dataset(source: &DatasetSource, token: Option<&str>) -> Result<Dataset> {
    match source {
        DatasetSource::Local(path) => load_local(path),
        DatasetSource::Remote(url) => {
            let client = BasicClient::new()?;
            match token {
                Some(token) => load_remote(&ApiKey::bearer(client, token)?, url).await,
                None => load_remote(&client, url).await,
            }
        }
    }
}

/// Loads every record file under `path` (or `path` itself if it is a file).
pub fn load_local(path: &Path) -> Result<Dataset> {
    let files = if path.is_dir() {
        list_dataset_files(path)?
    } else {
        vec![path.to_path_buf()]
    };

    let mut rows = Vec::new();
    for file in &files {
        let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
        let parsed = parse_documents(&file.display().to_string(), &bytes)?;
        debug!(file = %file.display(), rows = parsed.len(), "Read dataset file");
        rows.extend(parsed);
    }

    build_dataset(files.len(), rows)
}

/// Downloads a single record file and loads it.
pub async fn load_remote<C: HttpClient>(client: &C, url: &str) -> Result<Dataset> {
    let bytes = fetch_bytes(client, url).await?;
    let rows = parse_documents(url, &bytes)?;
    build_dataset(1, rows)
}

fn build_dataset(files_read: usize, rows: Vec<Value>) -> Result<Dataset> {
    let rows_read = rows.len();
    let unique = dedup_rows(rows);
    let stats = LoadStats {
        files_read,
        rows_read,
        duplicates_removed: rows_read - unique.len(),
    };
    let records = records_from_rows(unique)?;

    info!(
        files = stats.files_read,
        rows = stats.rows_read,
        duplicates = stats.duplicates_removed,
        kept = records.len(),
        "Dataset loaded"
    );

    Ok(Dataset { records, stats })
}

/// Lists the data files directly inside `dir`, sorted by name.
///
/// Subdirectories and hidden or marker files (names starting with `.` or `_`,
/// such as `_SUCCESS`) are skipped.
pub fn list_dataset_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with('.') || name.starts_with('_') {
            continue;
        }
        files.push(entry.path());
    }

    files.sort();
    Ok(files)
}

/// Parses one file's contents into JSON objects.
///
/// `name` is only used for error messages and for the `.gz` check; gzip
/// content is also recognized by its magic bytes.
///
/// # Errors
///
/// Any line that is not a JSON object aborts the load with its line number.
pub fn parse_documents(name: &str, bytes: &[u8]) -> Result<Vec<Value>> {
    let text = if name.ends_with(".gz") || bytes.starts_with(&[0x1f, 0x8b]) {
        let mut decoded = String::new();
        GzDecoder::new(bytes)
            .read_to_string(&mut decoded)
            .with_context(|| format!("{name}: invalid gzip stream"))?;
        decoded
    } else {
        String::from_utf8(bytes.to_vec()).with_context(|| format!("{name}: not valid UTF-8"))?
    };

    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    if trimmed.starts_with('[') {
        let values: Vec<Value> =
            serde_json::from_str(trimmed).with_context(|| format!("{name}: malformed JSON array"))?;
        for (idx, value) in values.iter().enumerate() {
            if !value.is_object() {
                bail!("{name}: element {} is not a JSON object", idx);
            }
        }
        return Ok(values);
    }

    let mut values = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim_start_matches('\u{feff}');
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("{name}:{}: malformed JSON record", idx + 1))?;
        if !value.is_object() {
            bail!("{name}:{}: record is not a JSON object", idx + 1);
        }
        values.push(value);
    }

    Ok(values)
}

/// Removes rows that are equal in every field, keeping first occurrences.
///
/// Object keys are compared without regard to their order in the source, and
/// a key holding `null` matches the same key being absent, at any depth.
pub fn dedup_rows(rows: Vec<Value>) -> Vec<Value> {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.into_iter()
        .filter(|row| seen.insert(dedup_key(row)))
        .collect()
}

/// Canonical encoding of a row for duplicate detection.
fn dedup_key(row: &Value) -> String {
    // serde_json objects are key-sorted, so the encoding is order-independent
    without_null_fields(row).to_string()
}

fn without_null_fields(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), without_null_fields(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(without_null_fields).collect()),
        other => other.clone(),
    }
}

/// Narrows raw rows into typed records.
///
/// # Errors
///
/// A known field holding the wrong JSON type (for example a numeric
/// `page_name`) is a hard input-format error.
pub fn records_from_rows(rows: Vec<Value>) -> Result<Vec<AdRecord>> {
    rows.into_iter()
        .enumerate()
        .map(|(idx, row)| {
            serde_json::from_value(row).with_context(|| format!("record {idx} does not match the ad schema"))
        })
        .collect()
}
