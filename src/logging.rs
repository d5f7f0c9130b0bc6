//! Structured logging module for the context injector
//!
//! Every line goes out as a `tracing` event and, once `init_logging` has been
//! given a directory, is appended to a daily file there. Categories:
//! - PLATFORM: Platform detection results
//! - PROFILE: Profile selection, switching, load and save
//! - COMMAND: #tag directives found in user text
//! - LOCATOR: Input search attempts and exhaustion diagnostics
//! - INJECTION: Pass lifecycle and content writes
//! - STORAGE: Persistence store activity
//! - ERROR: Degraded outcomes (malformed data, failed saves)

use chrono::{Local, Utc};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use once_cell::sync::Lazy;

/// Log categories for structured logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    Platform,
    Profile,
    Command,
    Locator,
    Injection,
    Storage,
    Error,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Platform => "PLATFORM",
            LogCategory::Profile => "PROFILE",
            LogCategory::Command => "COMMAND",
            LogCategory::Locator => "LOCATOR",
            LogCategory::Injection => "INJECTION",
            LogCategory::Storage => "STORAGE",
            LogCategory::Error => "ERROR",
        }
    }
}

/// Directory receiving daily log files; `None` until `init_logging` runs
static LOG_DIR: Lazy<Mutex<Option<PathBuf>>> = Lazy::new(|| Mutex::new(None));

/// Days of log files kept by `cleanup_old_logs`
const LOG_RETENTION_DAYS: i64 = 7;

fn current_log_dir() -> Option<PathBuf> {
    LOG_DIR.lock().ok().and_then(|dir| dir.clone())
}

const LOG_FILE_PREFIX: &str = "context-injector-";
const LOG_FILE_SUFFIX: &str = ".log";

/// Get today's log file path inside `dir`
fn log_file_path(dir: &Path) -> PathBuf {
    let today = Local::now().format("%Y-%m-%d").to_string();
    dir.join(format!("{}{}{}", LOG_FILE_PREFIX, today, LOG_FILE_SUFFIX))
}

/// Initialize the file sink - creates the log directory if needed
pub fn init_logging(log_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)?;
    }

    if let Ok(mut dir) = LOG_DIR.lock() {
        *dir = Some(log_dir.to_path_buf());
    }

    log(LogCategory::Injection, None, "Context injector logging initialized");

    Ok(())
}

/// Format one log line; pass ids are shortened to their first 8 characters
pub fn format_line(category: LogCategory, pass_id: Option<&str>, message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let pass_context = pass_id
        .map(|id| format!("pass={} | ", &id[..8.min(id.len())]))
        .unwrap_or_default();

    format!(
        "[{}] [{}] {}{}\n",
        timestamp,
        category.as_str(),
        pass_context,
        message
    )
}

/// Log a message with category and optional pass context
pub fn log(category: LogCategory, pass_id: Option<&str>, message: &str) {
    let pass = pass_id.unwrap_or("-");
    match category {
        LogCategory::Error => tracing::warn!(category = category.as_str(), pass, "{}", message),
        LogCategory::Locator => tracing::debug!(category = category.as_str(), pass, "{}", message),
        _ => tracing::info!(category = category.as_str(), pass, "{}", message),
    }

    let Some(dir) = current_log_dir() else {
        return;
    };

    let log_line = format_line(category, pass_id, message);
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path(&dir))
    {
        let _ = file.write_all(log_line.as_bytes());
    }
}

/// Log a platform detection event
pub fn log_platform(pass_id: Option<&str>, message: &str) {
    log(LogCategory::Platform, pass_id, message);
}

/// Log a profile selection, switch, load or save
pub fn log_profile(pass_id: Option<&str>, message: &str) {
    log(LogCategory::Profile, pass_id, message);
}

/// Log a #tag directive
pub fn log_command(pass_id: Option<&str>, message: &str) {
    log(LogCategory::Command, pass_id, message);
}

/// Log an input search attempt or diagnostic
pub fn log_locator(pass_id: Option<&str>, message: &str) {
    log(LogCategory::Locator, pass_id, message);
}

/// Log a pass lifecycle event
pub fn log_injection(pass_id: Option<&str>, message: &str) {
    log(LogCategory::Injection, pass_id, message);
}

/// Log persistence store activity
pub fn log_storage(message: &str) {
    log(LogCategory::Storage, None, message);
}

/// Log a degraded outcome
pub fn log_error(pass_id: Option<&str>, message: &str) {
    log(LogCategory::Error, pass_id, message);
}

/// Daily files written by `log`; anything else in the directory is left alone
fn is_log_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with(LOG_FILE_PREFIX) && name.ends_with(LOG_FILE_SUFFIX))
        .unwrap_or(false)
}

/// Clean up old log files (keep last 7 days)
pub fn cleanup_old_logs() -> Result<usize, Box<dyn std::error::Error>> {
    match current_log_dir() {
        Some(log_dir) => cleanup_logs_in(&log_dir),
        None => Ok(0),
    }
}

/// Remove our own log files older than the retention window from `log_dir`
pub fn cleanup_logs_in(log_dir: &Path) -> Result<usize, Box<dyn std::error::Error>> {
    let mut deleted = 0;

    if !log_dir.exists() {
        return Ok(0);
    }

    let cutoff = Utc::now() - chrono::Duration::days(LOG_RETENTION_DAYS);

    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !is_log_file(&path) {
            continue;
        }

        if let Ok(metadata) = entry.metadata() {
            if let Ok(modified) = metadata.modified() {
                let modified_time: chrono::DateTime<Utc> = modified.into();
                if modified_time < cutoff && fs::remove_file(&path).is_ok() {
                    deleted += 1;
                }
            }
        }
    }

    Ok(deleted)
}
