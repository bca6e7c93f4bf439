//! FFI logging backend that routes logs to the host app via callback
//!
//! Installs a `log` backend whose records are forwarded to a UniFFI
//! `LogCallback`, so Rust logs reach the host platform's logging (logcat
//! on Android). Until a callback is registered, records are dropped.

use std::sync::{Arc, OnceLock, RwLock};

use log::{Level, Log, Metadata, Record, SetLoggerError};

use super::types::{FfiLogLevel, LogCallback};

static FFI_LOGGER: OnceLock<FfiLogger> = OnceLock::new();

struct LoggerState {
    callback: Option<Arc<dyn LogCallback>>,
    max_level: Level,
}

struct FfiLogger {
    state: RwLock<LoggerState>,
}

impl FfiLogger {
    fn new(max_level: Level) -> Self {
        Self {
            state: RwLock::new(LoggerState {
                callback: None,
                max_level,
            }),
        }
    }
}

impl Log for FfiLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.state
            .read()
            .is_ok_and(|s| s.callback.is_some() && metadata.level() <= s.max_level)
    }

    fn log(&self, record: &Record) {
        let Ok(state) = self.state.read() else {
            return;
        };
        if record.level() > state.max_level {
            return;
        }
        if let Some(ref callback) = state.callback {
            callback.on_log(
                FfiLogLevel::from(record.level()),
                record.target().to_string(),
                format!("{}", record.args()),
            );
        }
    }

    fn flush(&self) {}
}

/// Install the FFI logger as the global `log` backend.
///
/// Call once at startup; the callback is registered separately via
/// [`set_log_callback`]. Fails if another logger is already installed.
pub fn init_ffi_logger(max_level: Level) -> Result<(), SetLoggerError> {
    let logger = FFI_LOGGER.get_or_init(|| FfiLogger::new(max_level));
    log::set_logger(logger)?;
    log::set_max_level(max_level.to_level_filter());
    Ok(())
}

/// Register (or, with `None`, remove) the callback receiving log records.
/// Thread-safe; may be called at any time after [`init_ffi_logger`].
pub fn set_log_callback(callback: Option<Arc<dyn LogCallback>>) {
    if let Some(logger) = FFI_LOGGER.get()
        && let Ok(mut state) = logger.state.write()
    {
        state.callback = callback;
    }
}

/// Change the maximum level forwarded to the callback
pub fn set_log_level(level: Level) {
    if let Some(logger) = FFI_LOGGER.get() {
        if let Ok(mut state) = logger.state.write() {
            state.max_level = level;
        }
        log::set_max_level(level.to_level_filter());
    }
}
