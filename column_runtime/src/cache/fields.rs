use column_template::template::{select_index, FieldLookup};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Derived fields of one record: lowercase name -> ordered values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "HashMap<String, Vec<String>>", into = "HashMap<String, Vec<String>>")]
pub struct FieldMap {
    fields: HashMap<String, Vec<String>>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value; repeated names accumulate in arrival order
    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        self.fields
            .entry(name.to_lowercase())
            .or_default()
            .push(value.into());
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    pub fn values(&self, name: &str) -> &[String] {
        self.fields
            .get(&name.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn get(&self, name: &str, index: i64) -> Option<&str> {
        select_index(self.values(name), index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<HashMap<String, Vec<String>>> for FieldMap {
    fn from(raw: HashMap<String, Vec<String>>) -> Self {
        let mut map = Self::new();
        for (name, values) in raw {
            for value in values {
                map.push(&name, value);
            }
        }
        map
    }
}

impl From<FieldMap> for HashMap<String, Vec<String>> {
    fn from(map: FieldMap) -> Self {
        map.fields
    }
}

impl FieldLookup for FieldMap {
    fn lookup(&self, name: &str, index: i64) -> String {
        self.get(name, index).unwrap_or_default().to_string()
    }
}
