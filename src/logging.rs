//! Structured JSONL logging to file plus compact output on stderr.
//!
//! - **JSONL to file** (~/.quicklaunch/logs/quicklaunch.jsonl) for tooling
//! - **Compact to stderr** for humans
//!
//! ```rust,ignore
//! let _guard = quicklaunch::logging::init();
//! tracing::info!(event_type = "index", entries = 12, "Catalog rebuilt");
//! ```
//!
//! Callback failures caught by the gateway are additionally kept in a small
//! in-memory ring so a host can show them without reading the log file.

use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use parking_lot::Mutex;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_NAME: &str = "quicklaunch.jsonl";
const MAX_FAILURES: usize = 50;

static FAILURES: OnceLock<Mutex<VecDeque<CallbackFailure>>> = OnceLock::new();

/// Guard that must be kept alive for the duration of the program.
/// Dropping it flushes and closes the log file.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// One caught action/validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackFailure {
    /// "action" or "validation"
    pub kind: &'static str,
    pub command: String,
    pub message: String,
}

/// Initialize file + stderr logging.
///
/// `RUST_LOG` overrides the default `info` filter. If the log file cannot be
/// opened only the stderr layer is installed.
pub fn init() -> LoggingGuard {
    init_with_path(&log_path())
}

fn init_with_path(log_path: &Path) -> LoggingGuard {
    if let Some(parent) = log_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("[LOGGING] Failed to create log directory: {}", e);
        }
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (json_layer, file_guard) = match OpenOptions::new().create(true).append(true).open(log_path) {
        Ok(file) => {
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .json()
                .with_writer(non_blocking_file)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .with_span_events(FmtSpan::NONE);
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!("[LOGGING] Failed to open log file: {}", e);
            (None, None)
        }
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .compact();

    // A subscriber may already be installed (tests, embedding hosts)
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(stderr_layer)
        .try_init();

    tracing::info!(
        event_type = "app_lifecycle",
        action = "started",
        log_path = %log_path.display(),
        file_logging = file_guard.is_some(),
        "Logging initialized"
    );

    LoggingGuard {
        _file_guard: file_guard,
    }
}

fn log_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".quicklaunch").join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join("quicklaunch-logs"))
}

/// Path of the JSONL log file
pub fn log_path() -> PathBuf {
    log_dir().join(LOG_FILE_NAME)
}

/// Remember a callback failure (oldest entries are evicted).
pub fn record_failure(kind: &'static str, command: &str, message: &str) {
    let buffer = FAILURES.get_or_init(|| Mutex::new(VecDeque::with_capacity(MAX_FAILURES)));
    let mut buf = buffer.lock();
    if buf.len() >= MAX_FAILURES {
        buf.pop_front();
    }
    buf.push_back(CallbackFailure {
        kind,
        command: command.to_string(),
        message: message.to_string(),
    });
}

/// Recent callback failures, oldest first
pub fn recent_failures() -> Vec<CallbackFailure> {
    FAILURES
        .get()
        .map(|buffer| buffer.lock().iter().cloned().collect())
        .unwrap_or_default()
}

/// Log a callback duration, warning when it crossed the threshold.
pub fn log_slow_callback(kind: &'static str, command: &str, duration_ms: u64, threshold_ms: u64) {
    if duration_ms > threshold_ms {
        tracing::warn!(
            event_type = "performance",
            kind = kind,
            command = command,
            duration_ms = duration_ms,
            threshold_ms = threshold_ms,
            "Slow {} callback for '{}': {}ms (threshold: {}ms)",
            kind,
            command,
            duration_ms,
            threshold_ms
        );
    } else {
        tracing::trace!(
            event_type = "performance",
            kind = kind,
            command = command,
            duration_ms = duration_ms,
            "Callback completed"
        );
    }
}
