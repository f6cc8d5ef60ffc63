//! Host-side interfaces
//!
//! Everything the runtime needs from the surrounding application: records,
//! view data sources, views, the derived-field decoder, the persisted element
//! attribute store and a delayed-task scheduler. The runtime is single
//! threaded; handles are shared with `Rc` and held weakly where the host owns
//! the lifetime.

pub mod memory;

use crate::cache::FieldMap;
use crate::element::ColumnElement;
use crate::handler::ColumnHandler;
use column_template::config::constants::host::ORDINAL_PROPERTY_MIN_VERSION;
use column_template::logging::codes::{self, Code};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Stable identity of a record, used as the field cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identity of a live view instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u64);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view-{}", self.0)
    }
}

/// Handle of a scheduled task, used to cancel it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

pub type Task = Box<dyn FnOnce()>;

/// Completion callback of a field derivation
pub type DerivationCallback = Box<dyn FnOnce(Result<FieldMap, DeriveError>)>;

/// Failure reported by a host operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("View has no data source yet")]
    ViewNotReady,

    #[error("Column element '{0}' is not present")]
    ElementMissing(String),

    #[error("Host rejected the operation: {reason}")]
    Rejected { reason: String },
}

/// Why a derived field map could not be produced
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeriveError {
    #[error("Record content could not be decoded: {reason}")]
    DecodeFailed { reason: String },

    #[error("Derivation timed out")]
    TimedOut,

    #[error("Record is no longer available")]
    RecordUnavailable,
}

impl DeriveError {
    pub fn code(&self) -> Code {
        match self {
            Self::DecodeFailed { .. } => codes::cache::DERIVATION_FAILED,
            Self::TimedOut => codes::cache::DERIVATION_TIMED_OUT,
            Self::RecordUnavailable => codes::cache::RECORD_UNAVAILABLE,
        }
    }
}

/// A record shown in a view
pub trait Record {
    fn id(&self) -> RecordId;

    /// Cheap stored property, the Direct field source. Names are lowercase.
    fn property(&self, name: &str) -> Option<String>;
}

/// Row-level access to the records of one view
pub trait DataSource {
    fn row_count(&self) -> usize;

    fn row_flags(&self, row: usize) -> u32;

    fn record_at(&self, row: usize) -> Option<Rc<dyn Record>>;

    fn add_column_handler(&self, column_id: &str, handler: Rc<ColumnHandler>)
        -> Result<(), HostError>;

    fn remove_column_handler(&self, column_id: &str) -> Result<(), HostError>;

    /// Invalidate rows `first..=last` so the view re-queries their values
    fn note_change(&self, first: usize, last: usize);
}

/// One live view instance
pub trait ViewHost {
    fn id(&self) -> ViewId;

    /// Document the view lives in; keys persisted element attributes
    fn document_url(&self) -> String;

    /// `None` until the view's data source is ready
    fn data_source(&self) -> Option<Rc<dyn DataSource>>;

    fn append_column_element(&self, element: ColumnElement) -> Result<(), HostError>;

    /// `Ok(false)` when no element with that id exists
    fn remove_column_element(&self, column_id: &str) -> Result<bool, HostError>;
}

/// Produces the expensive derived fields of a record
///
/// Implementations may call `done` synchronously or at any later point, but
/// at most once.
pub trait FieldDeriver {
    fn derive(&self, record: Rc<dyn Record>, done: DerivationCallback);
}

/// Persisted per-document column element attributes
pub trait AttributeStore {
    fn attribute_names(&self, document: &str, column_id: &str) -> Vec<String>;

    fn value(&self, document: &str, column_id: &str, attribute: &str) -> Option<String>;
}

/// Delayed task execution on the runtime's own thread
pub trait Scheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TaskId;

    /// Cancelling a task that already ran or was cancelled is a no-op
    fn cancel(&self, task: TaskId);
}

/// Host behaviour that depends on the host version, resolved once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilities {
    /// Restore the element ordinal as a property instead of an attribute
    pub ordinal_as_property: bool,
}

impl HostCapabilities {
    /// Only a version whose leading integer is below the threshold keeps the
    /// attribute form; anything unparseable is treated as a current host
    pub fn from_version(version: &str) -> Self {
        let digits: String = version
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        let ordinal_as_property = match digits.parse::<u32>() {
            Ok(major) => major >= ORDINAL_PROPERTY_MIN_VERSION,
            Err(_) => true,
        };

        Self {
            ordinal_as_property,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_from_version() {
        assert!(HostCapabilities::from_version("115.3.1").ordinal_as_property);
        assert!(HostCapabilities::from_version("74").ordinal_as_property);
        assert!(!HostCapabilities::from_version("68.12.0").ordinal_as_property);
        assert!(HostCapabilities::from_version("nightly").ordinal_as_property);
    }

    #[test]
    fn test_derive_error_codes() {
        assert_eq!(DeriveError::TimedOut.code().as_str(), "C002");
        assert_eq!(DeriveError::RecordUnavailable.code().as_str(), "C003");
    }

    #[test]
    fn test_ids_display() {
        assert_eq!(ViewId(3).to_string(), "view-3");
        assert_eq!(RecordId::from("msg-1").to_string(), "msg-1");
    }
}
