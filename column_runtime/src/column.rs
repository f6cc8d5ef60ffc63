//! Column definitions as registered by callers

use column_template::template::{ParseNode, Template, TemplateError};
use serde::{Deserialize, Serialize};

/// Where a column's template reads its fields from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldSource {
    /// Cheap stored record properties, read synchronously
    #[default]
    Direct,
    /// Expensive fields produced by the host decoder and cached per record
    CachedDerived,
}

/// Registration options
///
/// The structured form is `{"sortNumeric": bool, "fieldSource": "direct"}`.
/// The older `useDBHeaders` flag is still read when `fieldSource` is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnOptions {
    pub sort_numeric: bool,
    pub field_source: FieldSource,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOptions {
    #[serde(default)]
    sort_numeric: bool,
    field_source: Option<FieldSource>,
    #[serde(rename = "useDBHeaders")]
    use_db_headers: Option<bool>,
}

impl<'de> Deserialize<'de> for ColumnOptions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawOptions::deserialize(deserializer)?;
        let field_source = match (raw.field_source, raw.use_db_headers) {
            (Some(source), _) => source,
            (None, Some(false)) => FieldSource::CachedDerived,
            (None, _) => FieldSource::Direct,
        };
        Ok(Self {
            sort_numeric: raw.sort_numeric,
            field_source,
        })
    }
}

impl ColumnOptions {
    pub fn numeric(mut self) -> Self {
        self.sort_numeric = true;
        self
    }

    pub fn derived(mut self) -> Self {
        self.field_source = FieldSource::CachedDerived;
        self
    }
}

/// A registered computed column
///
/// Immutable once registered; re-registering the id replaces it wholesale.
#[derive(Debug, Clone)]
pub struct ColumnDefinition {
    pub id: String,
    pub label: String,
    pub tooltip: String,
    pub template: Template,
    pub options: ColumnOptions,
}

impl ColumnDefinition {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        tooltip: impl Into<String>,
        root: ParseNode,
        options: ColumnOptions,
        max_depth: usize,
    ) -> Result<Self, TemplateError> {
        Ok(Self {
            id: id.into(),
            label: label.into(),
            tooltip: tooltip.into(),
            template: Template::new(root, max_depth)?,
            options,
        })
    }

    pub fn sort_numeric(&self) -> bool {
        self.options.sort_numeric
    }

    pub fn field_source(&self) -> FieldSource {
        self.options.field_source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(value: serde_json::Value) -> ColumnOptions {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_options_defaults() {
        assert_eq!(options(json!({})), ColumnOptions::default());
        assert_eq!(
            options(json!({"sortNumeric": true, "fieldSource": "cachedDerived"})),
            ColumnOptions::default().numeric().derived()
        );
    }

    #[test]
    fn test_legacy_source_flag() {
        assert_eq!(
            options(json!({"useDBHeaders": false})).field_source,
            FieldSource::CachedDerived
        );
        assert_eq!(
            options(json!({"useDBHeaders": true})).field_source,
            FieldSource::Direct
        );
        // The explicit key wins
        assert_eq!(
            options(json!({"useDBHeaders": false, "fieldSource": "direct"})).field_source,
            FieldSource::Direct
        );
    }

    #[test]
    fn test_unknown_source_rejected() {
        let result = serde_json::from_value::<ColumnOptions>(json!({"fieldSource": "remote"}));
        assert!(result.is_err());
    }
}
