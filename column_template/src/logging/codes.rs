//! Consolidated error codes and classification system
//!
//! Single source of truth for every code the column crates log, together with
//! the behavioral metadata attached to each error code.

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// CODE WRAPPER TYPE
// ============================================================================

/// Universal code wrapper for both error and success codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code(&'static str);

impl Code {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ERROR CLASSIFICATION TYPES
// ============================================================================

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

/// Complete metadata for an error code
#[derive(Debug, Clone)]
pub struct ErrorMetadata {
    pub code: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub recoverable: bool,
    pub description: &'static str,
    pub recommended_action: &'static str,
}

impl ErrorMetadata {
    pub fn new(
        code: &'static str,
        category: &'static str,
        severity: Severity,
        recoverable: bool,
        description: &'static str,
        recommended_action: &'static str,
    ) -> Self {
        Self {
            code,
            category,
            severity,
            recoverable,
            description,
            recommended_action,
        }
    }
}

// ============================================================================
// CODE CONSTANTS
// ============================================================================

/// System error codes
pub mod system {
    use super::Code;

    pub const INTERNAL_ERROR: Code = Code::new("SYS001");
    pub const CONFIGURATION_INVALID: Code = Code::new("SYS003");
}

/// Template configuration error codes
pub mod template {
    use super::Code;

    pub const UNSUPPORTED_NODE: Code = Code::new("T001");
    pub const INVALID_PATTERN: Code = Code::new("T002");
    pub const UNSUPPORTED_FLAG: Code = Code::new("T003");
    pub const LIMIT_EXCEEDED: Code = Code::new("T004");
    pub const PARSE_FAILURE: Code = Code::new("T005");
}

/// Field cache error codes
pub mod cache {
    use super::Code;

    pub const DERIVATION_FAILED: Code = Code::new("C001");
    pub const DERIVATION_TIMED_OUT: Code = Code::new("C002");
    pub const RECORD_UNAVAILABLE: Code = Code::new("C003");
}

/// Column registry error codes
pub mod registry {
    use super::Code;

    pub const HANDLER_ATTACH_FAILED: Code = Code::new("R001");
    pub const HANDLER_DETACH_FAILED: Code = Code::new("R002");
    pub const ELEMENT_ATTACH_FAILED: Code = Code::new("R003");
    pub const ELEMENT_DETACH_FAILED: Code = Code::new("R004");
    pub const INVALID_COLUMN: Code = Code::new("R005");
    pub const UNKNOWN_COLUMN: Code = Code::new("R006");
}

/// Success codes
pub mod success {
    use super::Code;

    pub const SYSTEM_INITIALIZATION_COMPLETED: Code = Code::new("I001");
    pub const COLUMN_REGISTERED: Code = Code::new("I002");
    pub const COLUMN_UNREGISTERED: Code = Code::new("I003");
    pub const VIEW_ATTACHED: Code = Code::new("I004");
    pub const FIELDS_DERIVED: Code = Code::new("I005");
    pub const SHUTDOWN_COMPLETED: Code = Code::new("I006");
}

// ============================================================================
// ERROR METADATA REGISTRY
// ============================================================================

static ERROR_REGISTRY: OnceLock<HashMap<&'static str, ErrorMetadata>> = OnceLock::new();

fn get_error_registry() -> &'static HashMap<&'static str, ErrorMetadata> {
    ERROR_REGISTRY.get_or_init(|| {
        let entries = [
            ErrorMetadata::new(
                "SYS001",
                "System",
                Severity::Critical,
                false,
                "Critical internal error",
                "File a bug report with the logged context",
            ),
            ErrorMetadata::new(
                "SYS003",
                "System",
                Severity::High,
                true,
                "Runtime configuration rejected",
                "Fix the offending configuration value or environment variable",
            ),
            ErrorMetadata::new(
                "T001",
                "Template",
                Severity::Medium,
                true,
                "Template contains a node kind the evaluator does not support",
                "Use one of literal, header, replace, regex, concat, first",
            ),
            ErrorMetadata::new(
                "T002",
                "Template",
                Severity::Medium,
                true,
                "Regular expression pattern failed to compile",
                "Correct the pattern; the node evaluates to an empty string meanwhile",
            ),
            ErrorMetadata::new(
                "T003",
                "Template",
                Severity::Medium,
                true,
                "Regular expression flags are not supported",
                "Restrict flags to g, i, m, s and u",
            ),
            ErrorMetadata::new(
                "T004",
                "Template",
                Severity::High,
                true,
                "Template exceeds the configured depth or size limit",
                "Flatten the template or raise the configured limit",
            ),
            ErrorMetadata::new(
                "T005",
                "Template",
                Severity::High,
                true,
                "Template or column options could not be parsed",
                "Check the structured template value passed at registration",
            ),
            ErrorMetadata::new(
                "C001",
                "FieldCache",
                Severity::Low,
                true,
                "Record field derivation failed",
                "Record is cached with no derived fields",
            ),
            ErrorMetadata::new(
                "C002",
                "FieldCache",
                Severity::Low,
                true,
                "Record field derivation timed out",
                "Record is cached with no derived fields",
            ),
            ErrorMetadata::new(
                "C003",
                "FieldCache",
                Severity::Low,
                true,
                "Record could not be retrieved for derivation",
                "Record is cached with no derived fields",
            ),
            ErrorMetadata::new(
                "R001",
                "Registry",
                Severity::High,
                true,
                "Column handler could not be attached to a view",
                "Retry once the view's data source is ready",
            ),
            ErrorMetadata::new(
                "R002",
                "Registry",
                Severity::Medium,
                true,
                "Column handler could not be detached from a view",
                "The view may already be tearing down",
            ),
            ErrorMetadata::new(
                "R003",
                "Registry",
                Severity::High,
                true,
                "Column element could not be added to a view",
                "Check that the view's column container exists",
            ),
            ErrorMetadata::new(
                "R004",
                "Registry",
                Severity::Medium,
                true,
                "Column element could not be removed from a view",
                "The view may already be tearing down",
            ),
            ErrorMetadata::new(
                "R005",
                "Registry",
                Severity::High,
                true,
                "Column definition rejected",
                "Provide a non-empty id and a valid template",
            ),
            ErrorMetadata::new(
                "R006",
                "Registry",
                Severity::Low,
                true,
                "Unregistration requested for an unknown column id",
                "No action needed",
            ),
        ];

        entries.into_iter().map(|meta| (meta.code, meta)).collect()
    })
}

// ============================================================================
// CLASSIFICATION FUNCTIONS
// ============================================================================

pub fn get_error_metadata(code: &str) -> Option<&'static ErrorMetadata> {
    get_error_registry().get(code)
}

pub fn get_severity(code: &str) -> Severity {
    get_error_metadata(code)
        .map(|meta| meta.severity)
        .unwrap_or(Severity::Low)
}

pub fn is_recoverable(code: &str) -> bool {
    get_error_metadata(code)
        .map(|meta| meta.recoverable)
        .unwrap_or(true)
}

pub fn get_description(code: &str) -> &'static str {
    get_error_metadata(code)
        .map(|meta| meta.description)
        .unwrap_or("Unknown error")
}

pub fn get_action(code: &str) -> &'static str {
    get_error_metadata(code)
        .map(|meta| meta.recommended_action)
        .unwrap_or("No specific action available")
}

pub fn get_category(code: &str) -> &'static str {
    match get_error_metadata(code) {
        Some(meta) => meta.category,
        None if code.starts_with('I') => "Success",
        None => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_error_code_has_metadata() {
        let codes = [
            system::INTERNAL_ERROR,
            system::CONFIGURATION_INVALID,
            template::UNSUPPORTED_NODE,
            template::INVALID_PATTERN,
            template::UNSUPPORTED_FLAG,
            template::LIMIT_EXCEEDED,
            template::PARSE_FAILURE,
            cache::DERIVATION_FAILED,
            cache::DERIVATION_TIMED_OUT,
            cache::RECORD_UNAVAILABLE,
            registry::HANDLER_ATTACH_FAILED,
            registry::HANDLER_DETACH_FAILED,
            registry::ELEMENT_ATTACH_FAILED,
            registry::ELEMENT_DETACH_FAILED,
            registry::INVALID_COLUMN,
            registry::UNKNOWN_COLUMN,
        ];

        for code in codes {
            assert!(
                get_error_metadata(code.as_str()).is_some(),
                "missing metadata for {}",
                code
            );
        }
    }

    #[test]
    fn test_classification() {
        assert_eq!(get_category("T002"), "Template");
        assert_eq!(get_severity("SYS001"), Severity::Critical);
        assert!(!is_recoverable("SYS001"));
        assert_eq!(get_category(success::COLUMN_REGISTERED.as_str()), "Success");
        assert_eq!(get_description("nope"), "Unknown error");
    }
}
