/// File sink for log output
///
/// Appends plain-text (ANSI-free) log lines to the process log file. All
/// writes are best-effort: a broken file sink must never take down logging
/// or the process.
use crate::paths;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

static LOG_FILE: Lazy<Mutex<Option<File>>> = Lazy::new(|| Mutex::new(None));
static FILE_LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);

/// Open the log file for appending
///
/// Called once from logger::init() after directories exist. Failure is
/// reported on stderr and file logging stays off; console output continues.
pub fn init_file_logging() {
    let path = paths::get_log_file_path();
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => {
            *LOG_FILE.lock() = Some(file);
        }
        Err(e) => {
            FILE_LOGGING_ENABLED.store(false, Ordering::Relaxed);
            eprintln!("Log file {} unavailable: {}", path.display(), e);
        }
    }
}

/// Enable or disable the file sink once the config file has been applied
pub fn set_file_logging_enabled(enabled: bool) {
    FILE_LOGGING_ENABLED.store(enabled, Ordering::Relaxed);
}

/// Append one line to the log file, if the sink is open and enabled
pub fn write_to_file(line: &str) {
    if !FILE_LOGGING_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let mut guard = LOG_FILE.lock();
    if let Some(file) = guard.as_mut() {
        let _ = writeln!(file, "{}", line);
    }
}
