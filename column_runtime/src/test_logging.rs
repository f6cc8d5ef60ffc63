//! Captures global log events for tests
//!
//! The global logging service can be installed once per process, so every
//! test shares one memory logger and filters events by its own context.

use column_template::logging::{self, Code, LogEvent, LogLevel, LoggingService, MemoryLogger};
use std::sync::{Arc, OnceLock};

static CAPTURE: OnceLock<Arc<MemoryLogger>> = OnceLock::new();

/// The shared memory logger, installed as the global service on first use
pub(crate) fn captured() -> Arc<MemoryLogger> {
    CAPTURE
        .get_or_init(|| {
            let memory = Arc::new(MemoryLogger::new());
            let service = LoggingService::new(memory.clone(), LogLevel::Debug);
            let _ = logging::init_global_logging_with_service(Arc::new(service));
            memory
        })
        .clone()
}

/// Events logged with `code` whose context has `key` set to `value`
pub(crate) fn events_with(code: Code, key: &str, value: &str) -> Vec<LogEvent> {
    captured()
        .get_events_with_code(code)
        .into_iter()
        .filter(|event| event.context.get(key).map(String::as_str) == Some(value))
        .collect()
}
