//! Per-view column handler
//!
//! The object a view's data source calls back into for every row of a
//! registered column: display text, sort key and sort kind.

use crate::cache::FieldCache;
use crate::column::{ColumnDefinition, FieldSource};
use crate::host::{DataSource, Record, ViewHost};
use column_template::config::constants::view::PLACEHOLDER_ROW_FLAG;
use column_template::sort_key::{encode_order_preserving, NON_NUMERIC_SORT_KEY};
use column_template::template::FieldLookup;
use column_template::log_error;
use std::rc::{Rc, Weak};

/// Sort key of one row, in the form the column sorts by
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum RowSortKey {
    Numeric(u32),
    Text(String),
}

pub struct ColumnHandler {
    definition: Rc<ColumnDefinition>,
    view: Weak<dyn ViewHost>,
    cache: FieldCache,
}

impl ColumnHandler {
    pub fn new(definition: Rc<ColumnDefinition>, view: Weak<dyn ViewHost>, cache: FieldCache) -> Self {
        Self {
            definition,
            view,
            cache,
        }
    }

    pub fn column_id(&self) -> &str {
        &self.definition.id
    }

    pub fn definition(&self) -> &Rc<ColumnDefinition> {
        &self.definition
    }

    /// Display text of `row`; empty for placeholder rows and while derived
    /// fields are still pending
    pub fn value_for_row(&self, row: usize) -> String {
        self.with_row(row, |record, view| self.text(record, view))
            .unwrap_or_default()
    }

    pub fn sort_key_for_row(&self, row: usize) -> RowSortKey {
        let text = self.value_for_row(row);
        if self.is_numeric() {
            RowSortKey::Numeric(encode_order_preserving(&text))
        } else {
            RowSortKey::Text(text)
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.definition.sort_numeric()
    }

    /// Inverse of [`is_numeric`](Self::is_numeric), for hosts that ask
    /// "is this a string column"
    pub fn is_string(&self) -> bool {
        !self.is_numeric()
    }

    /// Display text of a record that is not addressed by row
    pub fn text_for_record(&self, record: &Rc<dyn Record>) -> String {
        match self.view.upgrade() {
            Some(view) => self.text(record, &view),
            None => String::new(),
        }
    }

    /// Text sort key; empty for numeric columns
    pub fn sort_string_for_record(&self, record: &Rc<dyn Record>) -> String {
        if self.is_numeric() {
            String::new()
        } else {
            self.text_for_record(record)
        }
    }

    /// Numeric sort key; the sentinel for text columns
    pub fn sort_long_for_record(&self, record: &Rc<dyn Record>) -> u32 {
        if self.is_numeric() {
            encode_order_preserving(&self.text_for_record(record))
        } else {
            NON_NUMERIC_SORT_KEY
        }
    }

    fn with_row<T>(&self, row: usize, f: impl FnOnce(&Rc<dyn Record>, &Rc<dyn ViewHost>) -> T) -> Option<T> {
        let view = self.view.upgrade()?;
        let source = view.data_source()?;
        if is_placeholder(source.as_ref(), row) {
            return None;
        }
        let record = source.record_at(row)?;
        Some(f(&record, &view))
    }

    fn text(&self, record: &Rc<dyn Record>, view: &Rc<dyn ViewHost>) -> String {
        match self.definition.field_source() {
            FieldSource::Direct => self.evaluate(&DirectFields(record.as_ref())),
            FieldSource::CachedDerived => match self.cache.fields_for(record, view) {
                Some(fields) => self.evaluate(fields.as_ref()),
                None => String::new(),
            },
        }
    }

    fn evaluate(&self, lookup: &dyn FieldLookup) -> String {
        let template = &self.definition.template;
        let evaluation = template.evaluate(lookup);
        for err in template.take_unreported(evaluation.errors) {
            log_error!(
                err.code(),
                "Column template error",
                "column" => &self.definition.id,
                "error" => &err
            );
        }
        evaluation.value
    }
}

fn is_placeholder(source: &dyn DataSource, row: usize) -> bool {
    source.row_flags(row) & PLACEHOLDER_ROW_FLAG != 0
}

/// Stored properties seen as fields
///
/// A stored property holds one already-joined value, so the field index does
/// not select anything here; every index yields the whole property.
struct DirectFields<'a>(&'a dyn Record);

impl FieldLookup for DirectFields<'_> {
    fn lookup(&self, name: &str, _index: i64) -> String {
        self.0.property(name).unwrap_or_default()
    }
}
