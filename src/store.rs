//! # Dataset Store
//!
//! One JSON file per category holding an ordered array of [`DatasetRecord`]s.
//! The subject field is named per category (`"animal"`, `"tool"`, ...); the
//! remaining fields are `openscad_code`, `renders`, and an optional `error`.
//!
//! ## Schema
//!
//! The current schema is a top-level array. An older layout wrapped that
//! array in an object (`{"animals": [...]}`); it is recognized once at load
//! time and migrated in memory, and the next [`DatasetStore::flush`] writes
//! the array layout back.
//!
//! Every flush writes the whole store to a temporary file next to the target
//! and renames it into place, so a crash never leaves a truncated store.

use serde::Serialize;
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{DatasetError, DatasetResult};

pub const CODE_FIELD: &str = "openscad_code";
pub const RENDERS_FIELD: &str = "renders";
pub const ERROR_FIELD: &str = "error";

/// Error text recorded when the generation service produced nothing usable
pub const GENERATION_FAILED: &str = "generation failed";

/// Result of one processed subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRecord {
    pub subject: String,
    pub generated_code: String,
    pub render_ok: bool,
    pub error: Option<String>,
}

impl DatasetRecord {
    pub fn generated(subject: impl Into<String>, code: impl Into<String>, render_ok: bool) -> Self {
        Self {
            subject: subject.into(),
            generated_code: code.into(),
            render_ok,
            error: None,
        }
    }

    pub fn generation_failed(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            generated_code: String::new(),
            render_ok: false,
            error: Some(GENERATION_FAILED.to_string()),
        }
    }

    /// Whether this record counts as a failure for retry purposes
    pub fn is_failure(&self) -> bool {
        !self.render_ok || self.error.is_some()
    }

    /// Whether this record may take the place of `existing` for the same
    /// subject. A failed attempt never displaces a working record.
    pub fn supersedes(&self, existing: &DatasetRecord) -> bool {
        !self.is_failure() || existing.is_failure()
    }

    pub fn to_json(&self, subject_key: &str) -> Value {
        let mut object = Map::new();
        object.insert(subject_key.to_string(), Value::String(self.subject.clone()));
        object.insert(
            CODE_FIELD.to_string(),
            Value::String(self.generated_code.clone()),
        );
        object.insert(RENDERS_FIELD.to_string(), Value::Bool(self.render_ok));
        if let Some(ref error) = self.error {
            object.insert(ERROR_FIELD.to_string(), Value::String(error.clone()));
        }
        Value::Object(object)
    }

    /// Parse one stored record. Only a missing or non-string subject is
    /// fatal; absent code and flags fall back to the failed-record defaults.
    pub fn from_json(value: &Value, subject_key: &str) -> Result<Self, String> {
        let object = value
            .as_object()
            .ok_or_else(|| "record is not a JSON object".to_string())?;

        let subject = object
            .get(subject_key)
            .and_then(Value::as_str)
            .ok_or_else(|| format!("record has no string field '{subject_key}'"))?;

        Ok(Self {
            subject: subject.to_string(),
            generated_code: object
                .get(CODE_FIELD)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            render_ok: object
                .get(RENDERS_FIELD)
                .and_then(Value::as_bool)
                .unwrap_or(false),
            error: object
                .get(ERROR_FIELD)
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

/// Store layouts found on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreSchema {
    /// Record array wrapped in a single-key object
    Wrapped,
    /// Top-level record array
    Array,
}

impl StoreSchema {
    pub const CURRENT: StoreSchema = StoreSchema::Array;
}

/// Read a store file as raw record values, migrating older layouts.
/// Returns `Ok(None)` when the file does not exist.
pub fn read_record_values(path: &Path) -> DatasetResult<Option<(Vec<Value>, StoreSchema)>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(DatasetError::read(path, e)),
    };

    let text = raw.strip_prefix('\u{feff}').unwrap_or(&raw);
    if text.trim().is_empty() {
        warn!(path = %path.display(), "Store file is empty, treating it as a new store");
        return Ok(Some((Vec::new(), StoreSchema::CURRENT)));
    }

    let document: Value = serde_json::from_str(text)
        .map_err(|e| DatasetError::malformed(path, format!("invalid JSON: {e}")))?;

    migrate(document)
        .map(Some)
        .map_err(|reason| DatasetError::malformed(path, reason))
}

fn migrate(document: Value) -> Result<(Vec<Value>, StoreSchema), String> {
    match document {
        Value::Array(records) => Ok((records, StoreSchema::Array)),
        Value::Object(mut object) => {
            let array_keys: Vec<String> = object
                .iter()
                .filter(|(_, v)| v.is_array())
                .map(|(k, _)| k.clone())
                .collect();
            match array_keys.as_slice() {
                [key] => match object.remove(key) {
                    Some(Value::Array(records)) => Ok((records, StoreSchema::Wrapped)),
                    _ => Err(format!("wrapped store key '{key}' is not an array")),
                },
                [] => Err("store object does not wrap a record array".to_string()),
                _ => Err(format!(
                    "store object wraps several arrays ({}), cannot pick one",
                    array_keys.join(", ")
                )),
            }
        }
        _ => Err("store must be a JSON array of records".to_string()),
    }
}

/// Ordered, subject-unique collection of records backed by one JSON file
#[derive(Debug, Clone)]
pub struct DatasetStore {
    path: PathBuf,
    subject_key: String,
    records: Vec<DatasetRecord>,
    loaded_schema: Option<StoreSchema>,
}

impl DatasetStore {
    /// Empty store that will be written to `path` on first flush
    pub fn new(path: impl Into<PathBuf>, subject_key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            subject_key: subject_key.into(),
            records: Vec::new(),
            loaded_schema: None,
        }
    }

    /// Load the store at `path`, or start an empty one when it does not exist.
    /// A file that exists but cannot be parsed is malformed input; it is never
    /// replaced by an empty store.
    pub fn load(path: impl Into<PathBuf>, subject_key: impl Into<String>) -> DatasetResult<Self> {
        let mut store = Self::new(path, subject_key);

        let Some((values, schema)) = read_record_values(&store.path)? else {
            debug!(path = %store.path.display(), "No existing store, starting empty");
            return Ok(store);
        };

        if schema != StoreSchema::CURRENT {
            info!(
                path = %store.path.display(),
                from = ?schema,
                "Migrating store to the array layout"
            );
        }

        for (index, value) in values.iter().enumerate() {
            let record = DatasetRecord::from_json(value, &store.subject_key).map_err(|reason| {
                DatasetError::malformed(&store.path, format!("record {index}: {reason}"))
            })?;
            match store.position(&record.subject) {
                Some(position) => {
                    let keep_later = record.supersedes(&store.records[position]);
                    warn!(
                        subject = %record.subject,
                        keep_later,
                        "Duplicate subject in store, merged into its first position"
                    );
                    if keep_later {
                        store.records[position] = record;
                    }
                }
                None => store.records.push(record),
            }
        }

        store.loaded_schema = Some(schema);
        debug!(
            path = %store.path.display(),
            records = store.len(),
            "Loaded existing store"
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[DatasetRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Layout the store was read from, `None` for a fresh store
    pub fn loaded_schema(&self) -> Option<StoreSchema> {
        self.loaded_schema
    }

    pub fn get(&self, subject: &str) -> Option<&DatasetRecord> {
        self.records.iter().find(|r| r.subject == subject)
    }

    fn position(&self, subject: &str) -> Option<usize> {
        self.records.iter().position(|r| r.subject == subject)
    }

    /// Append a record. An existing record for the same subject is removed
    /// first and returned, so each subject appears once and the order of the
    /// store stays the order in which subjects were processed.
    pub fn insert(&mut self, record: DatasetRecord) -> Option<DatasetRecord> {
        let displaced = self
            .position(&record.subject)
            .map(|index| self.records.remove(index));
        self.records.push(record);
        displaced
    }

    pub fn stats(&self) -> StoreStats {
        let rendered = self.records.iter().filter(|r| r.render_ok).count();
        StoreStats {
            total: self.records.len(),
            rendered,
            failed: self.records.len() - rendered,
        }
    }

    pub fn to_json(&self) -> Value {
        Value::Array(
            self.records
                .iter()
                .map(|r| r.to_json(&self.subject_key))
                .collect(),
        )
    }

    /// Write the whole store to disk
    pub fn flush(&self) -> DatasetResult<()> {
        write_json_atomic(&self.path, &self.to_json())
    }
}

/// Record counts of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StoreStats {
    pub total: usize,
    pub rendered: usize,
    pub failed: usize,
}

/// Serialize `value` as pretty JSON and atomically replace `path` with it
pub fn write_json_atomic<T>(path: &Path, value: &T) -> DatasetResult<()>
where
    T: Serialize + ?Sized,
{
    let bytes = serde_json::to_vec_pretty(value)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| DatasetError::persistence(path, e))?;

    let mut temp = tempfile::Builder::new()
        .prefix(".scad-dataset-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| DatasetError::persistence(path, e))?;
    temp.write_all(&bytes)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| DatasetError::persistence(path, e))?;
    temp.persist(path)
        .map_err(|e| DatasetError::persistence(path, e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> DatasetStore {
        DatasetStore::new(dir.path().join("animal_openscad_dataset.json"), "animal")
    }

    #[test]
    fn test_record_json_layout() {
        let record = DatasetRecord::generated("cat", "cube(1);", true);
        assert_eq!(
            record.to_json("animal"),
            json!({"animal": "cat", "openscad_code": "cube(1);", "renders": true})
        );

        let failed = DatasetRecord::generation_failed("dog");
        assert_eq!(
            failed.to_json("animal"),
            json!({"animal": "dog", "openscad_code": "", "renders": false, "error": "generation failed"})
        );
    }

    #[test]
    fn test_record_key_order_is_stable() {
        let record = DatasetRecord::generation_failed("dog");
        let text = serde_json::to_string(&record.to_json("animal")).unwrap();
        assert_eq!(
            text,
            r#"{"animal":"dog","openscad_code":"","renders":false,"error":"generation failed"}"#
        );
    }

    #[test]
    fn test_record_from_json_requires_subject() {
        let value = json!({"openscad_code": "cube(1);", "renders": true});
        assert!(DatasetRecord::from_json(&value, "animal").is_err());

        let partial = json!({"animal": "cat"});
        let record = DatasetRecord::from_json(&partial, "animal").unwrap();
        assert_eq!(record.generated_code, "");
        assert!(!record.render_ok);
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = DatasetStore::load(temp_dir.path().join("none.json"), "animal").unwrap();
        assert!(store.is_empty());
        assert_eq!(store.loaded_schema(), None);
    }

    #[test]
    fn test_flush_then_load_preserves_order() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = store_in(&temp_dir);
        store.insert(DatasetRecord::generated("zebra", "cube(2);", true));
        store.insert(DatasetRecord::generated("ant", "sphere(1);", false));
        store.flush().unwrap();

        let loaded = DatasetStore::load(store.path(), "animal").unwrap();
        assert_eq!(loaded.records(), store.records());
        assert_eq!(loaded.loaded_schema(), Some(StoreSchema::Array));
    }

    #[test]
    fn test_insert_replaces_existing_subject() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = store_in(&temp_dir);
        store.insert(DatasetRecord::generation_failed("cat"));
        store.insert(DatasetRecord::generated("dog", "cube(1);", true));

        let displaced = store.insert(DatasetRecord::generated("cat", "cube(3);", true));
        assert_eq!(displaced, Some(DatasetRecord::generation_failed("cat")));
        assert_eq!(store.len(), 2);
        let order: Vec<&str> = store.records().iter().map(|r| r.subject.as_str()).collect();
        assert_eq!(order, vec!["dog", "cat"]);
    }

    #[test]
    fn test_duplicate_subjects_keep_first_position() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("dupes.json");
        std::fs::write(
            &path,
            json!([
                {"animal": "a", "openscad_code": "old();", "renders": false},
                {"animal": "b", "openscad_code": "cube(1);", "renders": true},
                {"animal": "a", "openscad_code": "new();", "renders": true}
            ])
            .to_string(),
        )
        .unwrap();

        let store = DatasetStore::load(&path, "animal").unwrap();
        let order: Vec<&str> = store.records().iter().map(|r| r.subject.as_str()).collect();
        assert_eq!(order, vec!["a", "b"]);
        assert_eq!(store.get("a").unwrap().generated_code, "new();");

        store.flush().unwrap();
        let reloaded = DatasetStore::load(&path, "animal").unwrap();
        assert_eq!(reloaded.records(), store.records());
    }

    #[test]
    fn test_duplicate_failure_does_not_displace_working_record() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("dupes.json");
        std::fs::write(
            &path,
            json!([
                {"animal": "a", "openscad_code": "good();", "renders": true},
                {"animal": "b", "openscad_code": "cube(1);", "renders": true},
                {"animal": "a", "openscad_code": "", "renders": false, "error": "generation failed"}
            ])
            .to_string(),
        )
        .unwrap();

        let store = DatasetStore::load(&path, "animal").unwrap();
        assert_eq!(
            store.records(),
            &[
                DatasetRecord::generated("a", "good();", true),
                DatasetRecord::generated("b", "cube(1);", true),
            ]
        );
    }

    #[test]
    fn test_supersedes() {
        let working = DatasetRecord::generated("a", "cube(1);", true);
        let broken = DatasetRecord::generated("a", "bad();", false);
        let failed = DatasetRecord::generation_failed("a");

        assert!(working.supersedes(&failed));
        assert!(working.supersedes(&working));
        assert!(failed.supersedes(&broken));
        assert!(!failed.supersedes(&working));
        assert!(!broken.supersedes(&working));
    }

    #[test]
    fn test_wrapped_layout_is_migrated() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("legacy.json");
        std::fs::write(
            &path,
            json!({"animals": [{"animal": "cat", "openscad_code": "cube(1);", "renders": true}]})
                .to_string(),
        )
        .unwrap();

        let store = DatasetStore::load(&path, "animal").unwrap();
        assert_eq!(store.loaded_schema(), Some(StoreSchema::Wrapped));
        assert_eq!(store.len(), 1);

        store.flush().unwrap();
        let on_disk: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(on_disk.is_array());
    }

    #[test]
    fn test_corrupt_store_is_malformed_and_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, "[{\"animal\": \"cat\"").unwrap();

        let result = DatasetStore::load(&path, "animal");
        assert!(matches!(result, Err(DatasetError::MalformedInput { .. })));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[{\"animal\": \"cat\"");
    }

    #[test]
    fn test_wrong_subject_key_is_malformed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fruit.json");
        std::fs::write(&path, json!([{"fruit": "apple"}]).to_string()).unwrap();

        assert!(DatasetStore::load(&path, "animal").is_err());
    }

    #[test]
    fn test_flush_into_missing_directory_creates_it() {
        let temp_dir = TempDir::new().unwrap();
        let store = DatasetStore::new(temp_dir.path().join("a/b/store.json"), "animal");
        store.flush().unwrap();
        assert!(temp_dir.path().join("a/b/store.json").is_file());
    }

    #[test]
    fn test_flush_failure_is_persistence_error() {
        let temp_dir = TempDir::new().unwrap();
        // a regular file where the parent directory should be
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let store = DatasetStore::new(blocker.join("store.json"), "animal");

        assert!(matches!(
            store.flush(),
            Err(DatasetError::Persistence { .. })
        ));
    }

    #[test]
    fn test_stats() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = store_in(&temp_dir);
        store.insert(DatasetRecord::generated("a", "x", true));
        store.insert(DatasetRecord::generated("b", "y", false));
        store.insert(DatasetRecord::generation_failed("c"));

        assert_eq!(
            store.stats(),
            StoreStats {
                total: 3,
                rendered: 1,
                failed: 2
            }
        );
    }
}
