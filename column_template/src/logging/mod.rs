//! Global logging module for the column crates
//!
//! Provides a process-wide logging service with code-tagged events and a
//! small macro interface. Logging before initialization is silently dropped.

pub mod codes;
pub mod events;
pub mod macros;
pub mod service;

use crate::config::runtime::RuntimeConfig;
use std::sync::{Arc, OnceLock};

// Re-export main types
pub use codes::Code;
pub use events::{LogEvent, LogLevel};
pub use service::{
    create_configured_service, FacadeLogger, Logger, LoggingService, MemoryLogger,
    StructuredLogger,
};

// ============================================================================
// GLOBAL STATE
// ============================================================================

static GLOBAL_LOGGER: OnceLock<Arc<LoggingService>> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Global logger already initialized")]
    AlreadyInitialized,

    #[error("Configuration validation failed: {0}")]
    InvalidConfiguration(#[from] crate::config::ConfigError),
}

// ============================================================================
// INITIALIZATION
// ============================================================================

/// Initialize global logging from runtime preferences
pub fn init_global_logging(config: &RuntimeConfig) -> Result<(), LoggingError> {
    config.validate()?;

    let logging_service = Arc::new(service::create_configured_service(config));
    GLOBAL_LOGGER
        .set(logging_service.clone())
        .map_err(|_| LoggingError::AlreadyInitialized)?;

    logging_service.log_event(LogEvent::success(
        codes::success::SYSTEM_INITIALIZATION_COMPLETED,
        "Global logging system initialized",
    ));

    Ok(())
}

/// Initialize with custom service (binaries and tests)
pub fn init_global_logging_with_service(service: Arc<LoggingService>) -> Result<(), LoggingError> {
    GLOBAL_LOGGER
        .set(service)
        .map_err(|_| LoggingError::AlreadyInitialized)
}

pub fn is_initialized() -> bool {
    GLOBAL_LOGGER.get().is_some()
}

pub fn try_get_global_logger() -> Option<&'static LoggingService> {
    GLOBAL_LOGGER.get().map(|service| service.as_ref())
}

// ============================================================================
// MACRO SUPPORT FUNCTIONS
// ============================================================================

fn emit(mut event: LogEvent, context: Vec<(&str, &str)>) {
    let Some(logger) = try_get_global_logger() else {
        return;
    };

    for (key, value) in context {
        event = event.with_context(key, value);
    }
    logger.log_event(event);
}

/// Log error with context (used by log_error! macro)
pub fn log_error_with_context(code: Code, message: &str, context: Vec<(&str, &str)>) {
    emit(LogEvent::error(code, message), context);
}

/// Log warning with context (used by log_warning! macro)
pub fn log_warning_with_context(code: Code, message: &str, context: Vec<(&str, &str)>) {
    emit(LogEvent::warning(code, message), context);
}

/// Log success with context (used by log_success! macro)
pub fn log_success_with_context(code: Code, message: &str, context: Vec<(&str, &str)>) {
    emit(LogEvent::success(code, message), context);
}

/// Log info with context (used by log_info! macro)
pub fn log_info_with_context(message: &str, context: Vec<(&str, &str)>) {
    emit(LogEvent::info(message), context);
}

/// Log debug with context (used by log_debug! macro)
pub fn log_debug_with_context(message: &str, context: Vec<(&str, &str)>) {
    emit(LogEvent::debug(message), context);
}
