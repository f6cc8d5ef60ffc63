//! # Column Runtime
//!
//! Binds column templates to live views: the shared field cache for derived
//! record fields, debounced view refreshes, per-view column handlers, and the
//! coordinator that keeps every live view in sync with the registered columns.

pub mod cache;
pub mod column;
pub mod coordinator;
pub mod element;
pub mod handler;
pub mod host;
pub mod refresh;

#[cfg(test)]
mod test_logging;

pub use column::{ColumnDefinition, ColumnOptions, FieldSource};
pub use coordinator::{ColumnCoordinator, CoordinatorContext, CoordinatorError};
pub use handler::{ColumnHandler, RowSortKey};

pub mod prelude {
    pub use crate::cache::{FieldCache, FieldMap, FieldState};
    pub use crate::column::{ColumnDefinition, ColumnOptions, FieldSource};
    pub use crate::coordinator::{
        AttachmentAction, AttachmentFailure, AttachmentTarget, ColumnCoordinator,
        CoordinatorContext, CoordinatorError,
    };
    pub use crate::element::ColumnElement;
    pub use crate::handler::{ColumnHandler, RowSortKey};
    pub use crate::host::{
        AttributeStore, DataSource, DeriveError, FieldDeriver, HostCapabilities, HostError,
        Record, RecordId, Scheduler, TaskId, ViewHost, ViewId,
    };
    pub use crate::refresh::RefreshDebouncer;
}
