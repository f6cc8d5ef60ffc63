// src/coordinator/error.rs
//! Error types for column registration and view lifecycle transitions

use crate::host::{HostError, ViewId};
use column_template::logging::codes::{self, Code};
use column_template::template::TemplateError;
use std::fmt;

/// Which per-view object a host operation touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentTarget {
    Handler,
    Element,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentAction {
    Attach,
    Detach,
}

/// One host operation that failed during a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFailure {
    pub column_id: String,
    pub view_id: ViewId,
    pub target: AttachmentTarget,
    pub action: AttachmentAction,
    pub error: HostError,
}

impl AttachmentFailure {
    pub fn code(&self) -> Code {
        match (self.target, self.action) {
            (AttachmentTarget::Handler, AttachmentAction::Attach) => {
                codes::registry::HANDLER_ATTACH_FAILED
            }
            (AttachmentTarget::Handler, AttachmentAction::Detach) => {
                codes::registry::HANDLER_DETACH_FAILED
            }
            (AttachmentTarget::Element, AttachmentAction::Attach) => {
                codes::registry::ELEMENT_ATTACH_FAILED
            }
            (AttachmentTarget::Element, AttachmentAction::Detach) => {
                codes::registry::ELEMENT_DETACH_FAILED
            }
        }
    }
}

impl fmt::Display for AttachmentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self.action {
            AttachmentAction::Attach => "attach",
            AttachmentAction::Detach => "detach",
        };
        let target = match self.target {
            AttachmentTarget::Handler => "handler",
            AttachmentTarget::Element => "element",
        };
        write!(
            f,
            "{} {} '{}' on {}: {}",
            action, target, self.column_id, self.view_id, self.error
        )
    }
}

/// Coordinator transition errors
///
/// `Attachment` is reported after the transition has run to completion for
/// every view; the coordinator's bookkeeping already reflects what succeeded.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("Invalid column '{column_id}': {reason}")]
    InvalidColumn { column_id: String, reason: String },

    #[error("Template for column '{column_id}' rejected: {source}")]
    Template {
        column_id: String,
        #[source]
        source: TemplateError,
    },

    #[error("Invalid options for column '{column_id}': {source}")]
    Options {
        column_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} host operation(s) failed: {}", .failures.len(), describe(.failures))]
    Attachment { failures: Vec<AttachmentFailure> },
}

impl CoordinatorError {
    pub fn code(&self) -> Code {
        match self {
            Self::InvalidColumn { .. } | Self::Options { .. } => codes::registry::INVALID_COLUMN,
            Self::Template { source, .. } => source.code(),
            Self::Attachment { failures } => failures
                .first()
                .map(AttachmentFailure::code)
                .unwrap_or(codes::system::INTERNAL_ERROR),
        }
    }

    /// Host failures carried by an `Attachment` error
    pub fn failures(&self) -> &[AttachmentFailure] {
        match self {
            Self::Attachment { failures } => failures,
            _ => &[],
        }
    }
}

fn describe(failures: &[AttachmentFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// `Ok` when nothing failed
pub(crate) fn collect(failures: Vec<AttachmentFailure>) -> Result<(), CoordinatorError> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(CoordinatorError::Attachment { failures })
    }
}
