//! Error types for template parsing, validation and evaluation

use crate::logging::codes::{self, Code};

/// Template configuration errors
///
/// During evaluation these are collected as diagnostics and never abort the
/// evaluation of sibling nodes. At registration time they reject the template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, thiserror::Error)]
pub enum TemplateError {
    #[error("Unsupported template node kind")]
    UnsupportedNode,

    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Regex pattern '{pattern}' failed while matching: {reason}")]
    MatchFailed { pattern: String, reason: String },

    #[error("Unsupported regex flag '{flag}' in '{flags}'")]
    UnsupportedFlag { flags: String, flag: char },

    #[error("Template nesting depth {depth} exceeds limit of {limit}")]
    DepthExceeded { depth: usize, limit: usize },

    #[error("Template has {count} nodes, limit is {limit}")]
    TooManyNodes { count: usize, limit: usize },

    #[error("Template could not be parsed: {reason}")]
    Parse { reason: String },
}

impl TemplateError {
    /// Logging code for this error
    pub fn code(&self) -> Code {
        match self {
            Self::UnsupportedNode => codes::template::UNSUPPORTED_NODE,
            Self::InvalidPattern { .. } | Self::MatchFailed { .. } => {
                codes::template::INVALID_PATTERN
            }
            Self::UnsupportedFlag { .. } => codes::template::UNSUPPORTED_FLAG,
            Self::DepthExceeded { .. } | Self::TooManyNodes { .. } => {
                codes::template::LIMIT_EXCEEDED
            }
            Self::Parse { .. } => codes::template::PARSE_FAILURE,
        }
    }
}

impl From<serde_json::Error> for TemplateError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            reason: err.to_string(),
        }
    }
}
