use thiserror::Error;
use tracing::{error, warn};

/// Error severity for host display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,     // informational
    Warning,  // recoverable
    Error,    // operation failed
    Critical, // requires user action
}

/// Domain-specific errors for the command index
#[derive(Error, Debug)]
pub enum IndexError {
    /// Wrong shape or type at a public entry point. Always returned to the
    /// caller, never swallowed.
    #[error("Invalid argument '{argument}': {reason}")]
    InvalidArgument { argument: String, reason: String },

    #[error("Failed to parse protocol message: {0}")]
    ProtocolParse(#[from] serde_json::Error),

    #[error("Usage tracking failed for '{path}': {source}")]
    Tracking {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IndexError {
    /// Shorthand used by the validation paths.
    pub fn invalid(argument: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument: argument.into(),
            reason: reason.into(),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidArgument { .. } => ErrorSeverity::Error,
            Self::ProtocolParse(_) => ErrorSeverity::Warning,
            Self::Tracking { .. } => ErrorSeverity::Warning,
            Self::Config(_) => ErrorSeverity::Warning,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidArgument { argument, reason } => {
                format!("Argument '{}' {}", argument, reason)
            }
            Self::ProtocolParse(e) => format!("Invalid message format: {}", e),
            Self::Tracking { path, .. } => format!("Could not access usage data at {}", path),
            Self::Config(msg) => format!("Configuration issue: {}", msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;

/// Extension trait for silent error logging with caller location tracking.
/// Use when the operation is recoverable and the caller doesn't need to know.
///
/// # Examples
///
/// ```ignore
/// use quicklaunch::error::ResultExt;
///
/// // Keep running with an empty usage map if the file is corrupt
/// let tracking = store.load().warn_on_err();
/// ```
pub trait ResultExt<T> {
    /// Log error with caller location and return None. Use for recoverable failures.
    fn log_err(self) -> Option<T>;
    /// Log as warning with caller location and return None. Use for expected failures.
    fn warn_on_err(self) -> Option<T>;
}

impl<T, E: std::fmt::Debug> ResultExt<T> for std::result::Result<T, E> {
    #[track_caller]
    fn log_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                error!(
                    error = ?error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation failed"
                );
                None
            }
        }
    }

    #[track_caller]
    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                warn!(
                    error = ?error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation had warning"
                );
                None
            }
        }
    }
}

/// Render a caught panic payload as text for logs.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_message() {
        let err = IndexError::invalid("maxResults", "must be a non-negative integer");
        assert_eq!(
            err.to_string(),
            "Invalid argument 'maxResults': must be a non-negative integer"
        );
        assert_eq!(err.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_log_err_returns_none_on_error() {
        let result: std::result::Result<u32, &str> = Err("boom");
        assert_eq!(result.log_err(), None);
        let result: std::result::Result<u32, &str> = Ok(7);
        assert_eq!(result.warn_on_err(), Some(7));
    }

    #[test]
    fn test_panic_message_variants() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(boxed.as_ref()), "non-string panic payload");
    }
}
