//! Logging service implementation

use super::codes::Code;
use super::events::{LogEvent, LogLevel};
use crate::config::runtime::RuntimeConfig;
use std::sync::{Arc, Mutex};

/// Simple logger trait
pub trait Logger: Send + Sync {
    fn log(&self, event: &LogEvent);
}

/// Main logging service with a minimum level filter
pub struct LoggingService {
    logger: Arc<dyn Logger>,
    min_level: LogLevel,
}

impl LoggingService {
    pub fn new(logger: Arc<dyn Logger>, min_level: LogLevel) -> Self {
        Self { logger, min_level }
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    /// Check if level should be logged
    pub fn should_log(&self, level: LogLevel) -> bool {
        level <= self.min_level
    }

    pub fn log_event(&self, event: LogEvent) {
        if self.should_log(event.level) {
            self.logger.log(&event);
        }
    }

    pub fn log_error(&self, error_code: Code, message: &str) {
        self.log_event(LogEvent::error(error_code, message));
    }

    pub fn log_warning(&self, warning_code: Code, message: &str) {
        self.log_event(LogEvent::warning(warning_code, message));
    }

    pub fn log_info(&self, message: &str) {
        self.log_event(LogEvent::info(message));
    }
}

/// Create a service according to runtime preferences
///
/// Structured logging writes JSON lines to stderr; otherwise events go to
/// the `log` facade and whatever backend the binary installed.
pub fn create_configured_service(config: &RuntimeConfig) -> LoggingService {
    let min_level = config.min_log_level.to_events_log_level();
    let logger: Arc<dyn Logger> = if config.structured_logging {
        Arc::new(StructuredLogger)
    } else {
        Arc::new(FacadeLogger)
    };

    LoggingService::new(logger, min_level)
}

/// Structured logger emitting one JSON object per line
///
/// Lines go to stderr so they never mix with a binary's regular output.
pub struct StructuredLogger;

impl StructuredLogger {
    pub fn line(event: &LogEvent) -> String {
        // Fall back to the plain format if JSON serialization fails
        event.format_json().unwrap_or_else(|_| event.format())
    }
}

impl Logger for StructuredLogger {
    fn log(&self, event: &LogEvent) {
        eprintln!("{}", Self::line(event));
    }
}

/// Forwards events to the `log` facade so binaries can pick a backend
pub struct FacadeLogger;

impl Logger for FacadeLogger {
    fn log(&self, event: &LogEvent) {
        let level = match event.level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
        };
        log::log!(target: "columns", level, "{}", event.format());
    }
}

/// Memory logger for testing
#[derive(Default)]
pub struct MemoryLogger {
    events: Mutex<Vec<LogEvent>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_events(&self) -> Vec<LogEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn get_events_with_code(&self, code: Code) -> Vec<LogEvent> {
        self.get_events()
            .into_iter()
            .filter(|e| e.code == code)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl Logger for MemoryLogger {
    fn log(&self, event: &LogEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
