//! Loading column and record fixtures from JSON files

use column_runtime::cache::FieldMap;
use column_runtime::host::memory::MemoryRecord;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One column as an extension would register it
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnSpec {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub tooltip: String,
    pub template: serde_json::Value,
    #[serde(default)]
    pub options: serde_json::Value,
}

/// One sample record: stored properties plus optionally its derived fields
#[derive(Debug, Clone, Deserialize)]
pub struct RecordSpec {
    pub id: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Absent means the decoder cannot produce fields for this record
    #[serde(default)]
    pub derived: Option<FieldMap>,
}

impl RecordSpec {
    pub fn to_memory_record(&self) -> MemoryRecord {
        self.properties
            .iter()
            .fold(MemoryRecord::new(self.id.clone()), |record, (name, value)| {
                record.with_property(name, value.clone())
            })
    }
}

pub fn load_columns(path: &Path) -> Result<Vec<ColumnSpec>, InputError> {
    load(path)
}

pub fn load_records(path: &Path) -> Result<Vec<RecordSpec>, InputError> {
    load(path)
}

fn load<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, InputError> {
    let contents = std::fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| InputError::Json {
        path: path.display().to_string(),
        source,
    })
}
