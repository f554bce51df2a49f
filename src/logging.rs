//! Logger handle threaded through a load.
//!
//! There is no process-wide logger. A [`Logger`] is carried by the
//! [`Loader`](crate::Loader) and handed to the locator, merge and field
//! processor. It outputs to:
//! - tracing, always (a no-op unless the host installs a subscriber)
//! - a user callback, if one is configured

use std::fmt;
use std::sync::{
    Arc,
    atomic::{AtomicU8, Ordering},
};
use tracing::Level;

/// Severity of a log message, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Atomic level filter that can be adjusted while a logger is shared.
///
/// The level is stored as a u8: 0=Trace, 1=Debug, 2=Info, 3=Warning, 4=Error
pub struct LogLevelFilter(AtomicU8);

impl LogLevelFilter {
    /// Create a new filter with the given minimum level.
    pub fn new(level: LogLevel) -> Self {
        Self(AtomicU8::new(level_to_u8(level)))
    }

    /// Get the current minimum level.
    pub fn get(&self) -> LogLevel {
        u8_to_level(self.0.load(Ordering::Relaxed))
    }

    /// Set the minimum level.
    pub fn set(&self, level: LogLevel) {
        self.0.store(level_to_u8(level), Ordering::Relaxed);
    }

    /// Check if a message at the given level should be logged.
    pub fn should_log(&self, level: LogLevel) -> bool {
        level_to_u8(level) >= self.0.load(Ordering::Relaxed)
    }
}

impl Default for LogLevelFilter {
    fn default() -> Self {
        Self::new(LogLevel::Debug)
    }
}

impl fmt::Debug for LogLevelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LogLevelFilter").field(&self.get()).finish()
    }
}

fn level_to_u8(level: LogLevel) -> u8 {
    match level {
        LogLevel::Trace => 0,
        LogLevel::Debug => 1,
        LogLevel::Info => 2,
        LogLevel::Warning => 3,
        LogLevel::Error => 4,
    }
}

fn u8_to_level(val: u8) -> LogLevel {
    match val {
        0 => LogLevel::Trace,
        1 => LogLevel::Debug,
        2 => LogLevel::Info,
        3 => LogLevel::Warning,
        4 => LogLevel::Error,
        _ => LogLevel::Debug,
    }
}

/// Convert a [`LogLevel`] to a tracing [`Level`].
pub fn log_level_to_tracing(level: LogLevel) -> Level {
    match level {
        LogLevel::Trace => Level::TRACE,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Info => Level::INFO,
        LogLevel::Warning => Level::WARN,
        LogLevel::Error => Level::ERROR,
    }
}

/// Callback receiving every message that passes the level filter.
pub type LogCallback = Arc<dyn Fn(LogLevel, &str) + Send + Sync>;

/// Cloneable logger handle.
#[derive(Clone)]
pub struct Logger {
    /// User sink (optional).
    callback: Option<LogCallback>,
    /// Minimum level to log.
    level_filter: Arc<LogLevelFilter>,
    /// Logger name/category.
    name: Option<String>,
}

impl Logger {
    /// Create a new logger with default settings.
    pub fn new() -> Self {
        Self {
            callback: None,
            level_filter: Arc::new(LogLevelFilter::default()),
            name: None,
        }
    }

    /// Send every message that passes the filter to `callback` as well.
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(LogLevel, &str) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Set the level filter.
    pub fn with_level_filter(mut self, filter: Arc<LogLevelFilter>) -> Self {
        self.level_filter = filter;
        self
    }

    /// Shorthand for a fresh filter at `level`.
    pub fn with_level(self, level: LogLevel) -> Self {
        self.with_level_filter(Arc::new(LogLevelFilter::new(level)))
    }

    /// Set the logger name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The shared level filter.
    pub fn level_filter(&self) -> &Arc<LogLevelFilter> {
        &self.level_filter
    }

    /// Log a message to all configured endpoints.
    pub fn log(&self, level: LogLevel, message: &str) {
        if !self.level_filter.should_log(level) {
            return;
        }

        match log_level_to_tracing(level) {
            Level::ERROR => match self.name {
                Some(ref name) => tracing::error!(logger = %name, "{}", message),
                None => tracing::error!("{}", message),
            },
            Level::WARN => match self.name {
                Some(ref name) => tracing::warn!(logger = %name, "{}", message),
                None => tracing::warn!("{}", message),
            },
            Level::INFO => match self.name {
                Some(ref name) => tracing::info!(logger = %name, "{}", message),
                None => tracing::info!("{}", message),
            },
            Level::DEBUG => match self.name {
                Some(ref name) => tracing::debug!(logger = %name, "{}", message),
                None => tracing::debug!("{}", message),
            },
            Level::TRACE => match self.name {
                Some(ref name) => tracing::trace!(logger = %name, "{}", message),
                None => tracing::trace!("{}", message),
            },
        }

        if let Some(ref callback) = self.callback {
            callback(level, message);
        }
    }

    pub fn trace(&self, msg: &str) {
        self.log(LogLevel::Trace, msg);
    }

    pub fn debug(&self, msg: &str) {
        self.log(LogLevel::Debug, msg);
    }

    pub fn info(&self, msg: &str) {
        self.log(LogLevel::Info, msg);
    }

    pub fn warning(&self, msg: &str) {
        self.log(LogLevel::Warning, msg);
    }

    pub fn error(&self, msg: &str) {
        self.log(LogLevel::Error, msg);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level_filter", &self.level_filter)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}
