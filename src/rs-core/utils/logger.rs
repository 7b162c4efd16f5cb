use std::sync::atomic::{AtomicU8, Ordering};

#[cfg(target_arch = "wasm32")]
use crate::bindings::{jsLog, LogLevel};

static MAX_LOG_LEVEL: AtomicU8 = AtomicU8::new(LoggerLevel::Info as u8);

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub enum LoggerLevel {
    None = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
}

/// Process-wide logger.
///
/// On WebAssembly targets, logs are forwarded to the JavaScript-side through `jsLog`. Everywhere
/// else they are emitted as `tracing` events.
pub struct Logger {}

impl Logger {
    pub fn set_logger_level(new_level: LoggerLevel) {
        MAX_LOG_LEVEL.store(new_level as u8, Ordering::Relaxed);
    }

    #[inline(always)]
    fn enabled(level: LoggerLevel) -> bool {
        MAX_LOG_LEVEL.load(Ordering::Relaxed) >= level as u8
    }

    pub fn info(text: &str) {
        if Self::enabled(LoggerLevel::Info) {
            emit(LoggerLevel::Info, text);
        }
    }

    pub fn error(text: &str) {
        if Self::enabled(LoggerLevel::Error) {
            emit(LoggerLevel::Error, text);
        }
    }

    pub fn warn(text: &str) {
        if Self::enabled(LoggerLevel::Warn) {
            emit(LoggerLevel::Warn, text);
        }
    }

    pub fn debug(text: &str) {
        if Self::enabled(LoggerLevel::Debug) {
            emit(LoggerLevel::Debug, text);
        }
    }

    pub fn lazy_info(func: &dyn Fn() -> String) {
        if Self::enabled(LoggerLevel::Info) {
            emit(LoggerLevel::Info, &func());
        }
    }

    pub fn lazy_error(func: &dyn Fn() -> String) {
        if Self::enabled(LoggerLevel::Error) {
            emit(LoggerLevel::Error, &func());
        }
    }

    pub fn lazy_warn(func: &dyn Fn() -> String) {
        if Self::enabled(LoggerLevel::Warn) {
            emit(LoggerLevel::Warn, &func());
        }
    }

    pub fn lazy_debug(func: &dyn Fn() -> String) {
        if Self::enabled(LoggerLevel::Debug) {
            emit(LoggerLevel::Debug, &func());
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn emit(level: LoggerLevel, text: &str) {
    let level = match level {
        LoggerLevel::None => return,
        LoggerLevel::Error => LogLevel::Error,
        LoggerLevel::Warn => LogLevel::Warn,
        LoggerLevel::Info => LogLevel::Info,
        LoggerLevel::Debug => LogLevel::Debug,
    };
    jsLog(level, text);
}

#[cfg(not(target_arch = "wasm32"))]
fn emit(level: LoggerLevel, text: &str) {
    match level {
        LoggerLevel::None => {}
        LoggerLevel::Error => tracing::error!("{}", text),
        LoggerLevel::Warn => tracing::warn!("{}", text),
        LoggerLevel::Info => tracing::info!("{}", text),
        LoggerLevel::Debug => tracing::debug!("{}", text),
    }
}
