//! Session logger, the backend behind the `log` macros used across the crate.
//!
//! Every record goes to stderr and to a session file that is **truncated at
//! each launch**, so it only ever holds the most recent session.
//!
//! Log location:
//!   Windows:  `%APPDATA%\wafer-die-mesh\session.log`
//!   Linux:    `~/.local/share/wafer-die-mesh/session.log`
//!   macOS:    `~/Library/Application Support/wafer-die-mesh/session.log`

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{LevelFilter, Log, Metadata, Record};

static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();
static LOGGER: SessionLogger = SessionLogger;

struct SessionLogger;

impl Log for SessionLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "{} - {} - {} - {}",
            timestamp(),
            record.level(),
            record.target(),
            record.args()
        );
        eprintln!("{line}");
        write_line(&line);
    }

    fn flush(&self) {
        if let Some(mutex) = LOG_FILE.get() {
            if let Ok(mut file) = mutex.lock() {
                let _ = file.flush();
            }
        }
    }
}

/// Silently ignores I/O errors so that logging never takes the app down.
fn write_line(line: &str) {
    if let Some(mutex) = LOG_FILE.get() {
        if let Ok(mut file) = mutex.lock() {
            let _ = writeln!(file, "{line}");
        }
    }
}

/// Install the logger. Call once, before the first log record.
///
/// * Creates (or truncates) the session file; failing that, logs to stderr only.
/// * Installs a panic hook that mirrors the panic message into the file.
pub fn init(level: LevelFilter) -> Option<PathBuf> {
    if log::set_logger(&LOGGER).is_err() {
        return None;
    }
    log::set_max_level(level);

    let path = data_dir().join("wafer-die-mesh").join("session.log");
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let opened = OpenOptions::new().create(true).write(true).truncate(true).open(&path);
    match opened {
        Ok(f) => {
            let _ = LOG_FILE.set(Mutex::new(f));
        }
        Err(e) => {
            eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
            return None;
        }
    }

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write_line(&format!("{} - PANIC - {}", timestamp(), info));
        prev(info);
    }));

    Some(path)
}

/// Platform data directory (without the app sub-folder).
fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join("Library").join("Application Support");
        }
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from(".")
}

/// HH:MM:SS (UTC) within the current day.
fn timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => {
            let secs = d.as_secs();
            format!("{:02}:{:02}:{:02}", (secs % 86400) / 3600, (secs % 3600) / 60, secs % 60)
        }
        Err(_) => "??:??:??".to_string(),
    }
}
