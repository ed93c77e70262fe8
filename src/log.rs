//! Leveled file logging for the race service.
//!
//! Lines go to `~/.aoc-race/race.log`, truncated at every start so one log
//! covers one server process. Levels:
//! - ERROR: a request or runner could not complete
//! - WARN: recoverable surprises (unparseable source pages, stale runners)
//! - INFO: race lifecycle (start, unlock, finish, reset)
//! - DEBUG: stage events, submission verdicts, lock hand-offs
//! - TRACE: raw headless output and HTTP bodies
//!
//! Debug mode is enabled with `--debug` or `AOC_RACE_DEBUG=1`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

const LOG_FILE: &str = "race.log";
const DEBUG_ENV: &str = "AOC_RACE_DEBUG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

fn debug_from_env() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Initialize logging under `~/.aoc-race`.
///
/// Without a home directory logging stays disabled; the service still runs.
pub fn init(debug: bool) {
    if let Some(dir) = dirs::home_dir().map(|h| h.join(".aoc-race")) {
        init_in(&dir, debug);
    }
}

/// Initialize logging into an explicit directory.
pub fn init_in(dir: &Path, debug: bool) {
    let level = if debug || debug_from_env() {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);

    let _ = std::fs::create_dir_all(dir);
    let path = dir.join(LOG_FILE);
    let _ = std::fs::write(&path, "");
    LOG_PATH.set(path).ok();
}

/// Path of the active log file, if logging was initialized.
pub fn log_path() -> Option<&'static Path> {
    LOG_PATH.get().map(PathBuf::as_path)
}

pub fn set_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);
}

pub fn level() -> LogLevel {
    LogLevel::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

pub fn log_at(level: LogLevel, msg: &str) {
    if level > self::level() {
        return;
    }

    if let Some(path) = LOG_PATH.get() {
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let timestamp = chrono::Local::now().format("%H:%M:%S%.3f");
            let _ = writeln!(file, "[{}] [{}] {}", timestamp, level.as_str(), msg);
        }
    }
}

pub fn error(msg: &str) {
    log_at(LogLevel::Error, msg);
}

pub fn warn(msg: &str) {
    log_at(LogLevel::Warn, msg);
}

pub fn info(msg: &str) {
    log_at(LogLevel::Info, msg);
}

pub fn debug(msg: &str) {
    log_at(LogLevel::Debug, msg);
}

pub fn trace(msg: &str) {
    log_at(LogLevel::Trace, msg);
}

/// Log at INFO level.
#[macro_export]
macro_rules! rlog {
    ($($arg:tt)*) => {
        $crate::log::info(&format!($($arg)*))
    };
}

#[macro_export]
macro_rules! rlog_error {
    ($($arg:tt)*) => {
        $crate::log::error(&format!($($arg)*))
    };
}

#[macro_export]
macro_rules! rlog_warn {
    ($($arg:tt)*) => {
        $crate::log::warn(&format!($($arg)*))
    };
}

#[macro_export]
macro_rules! rlog_debug {
    ($($arg:tt)*) => {
        $crate::log::debug(&format!($($arg)*))
    };
}

#[macro_export]
macro_rules! rlog_trace {
    ($($arg:tt)*) => {
        $crate::log::trace(&format!($($arg)*))
    };
}
