//! Execution gateway: runs externally supplied callbacks in isolation.
//!
//! Actions and validations are arbitrary host code. Whatever they do (return
//! an error, panic, unwind out of the call) the gateway turns it into a plain
//! value for the caller and logs the failure. Calls cannot be cancelled; calls
//! slower than the configured threshold are reported.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::config::DEFAULT_SLOW_CALLBACK_MS;
use crate::error::panic_message;
use crate::logging;

/// State reported by a validation callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandState {
    Enabled,
    Grayed,
    /// Enabled and currently toggled on
    Checked,
}

impl CommandState {
    pub fn is_enabled(self) -> bool {
        !matches!(self, CommandState::Grayed)
    }
}

/// The executable part of a command.
///
/// `Ok(true)` means the command ran. `Ok(false)` is a clean refusal and an
/// error is a failure; neither counts as a use.
pub trait Action {
    fn perform(&self) -> anyhow::Result<bool>;
}

impl<F> Action for F
where
    F: Fn() -> anyhow::Result<bool>,
{
    fn perform(&self) -> anyhow::Result<bool> {
        self()
    }
}

/// Availability check for a command.
pub trait Validation {
    fn check(&self) -> anyhow::Result<CommandState>;
}

impl<F> Validation for F
where
    F: Fn() -> anyhow::Result<CommandState>,
{
    fn check(&self) -> anyhow::Result<CommandState> {
        self()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExecutionGateway {
    slow_threshold: Duration,
}

impl Default for ExecutionGateway {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_SLOW_CALLBACK_MS))
    }
}

impl ExecutionGateway {
    pub fn new(slow_threshold: Duration) -> Self {
        Self { slow_threshold }
    }

    /// Run an action. Never panics; any failure yields `false`.
    pub fn invoke(&self, command: &str, action: &dyn Action) -> bool {
        let started = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| action.perform()));
        self.report_duration("action", command, started);

        match outcome {
            Ok(Ok(success)) => {
                debug!(command = command, success = success, "Action finished");
                success
            }
            Ok(Err(e)) => {
                error!(command = command, error = %e, "Action failed");
                logging::record_failure("action", command, &format!("{:#}", e));
                false
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(command = command, panic = %message, "Action panicked");
                logging::record_failure("action", command, &message);
                false
            }
        }
    }

    /// Run a validation. `None` means the state is unknown because the
    /// callback failed.
    pub fn validate(&self, command: &str, validation: &dyn Validation) -> Option<bool> {
        let started = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| validation.check()));
        self.report_duration("validation", command, started);

        match outcome {
            Ok(Ok(state)) => Some(state.is_enabled()),
            Ok(Err(e)) => {
                warn!(command = command, error = %e, "Validation failed, state unknown");
                logging::record_failure("validation", command, &format!("{:#}", e));
                None
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(command = command, panic = %message, "Validation panicked, state unknown");
                logging::record_failure("validation", command, &message);
                None
            }
        }
    }

    fn report_duration(&self, kind: &'static str, command: &str, started: Instant) {
        let elapsed = started.elapsed();
        logging::log_slow_callback(
            kind,
            command,
            elapsed.as_millis() as u64,
            self.slow_threshold.as_millis() as u64,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_invoke_success_and_refusal() {
        let gateway = ExecutionGateway::default();
        assert!(gateway.invoke("ok", &|| -> anyhow::Result<bool> { Ok(true) }));
        assert!(!gateway.invoke("refused", &|| -> anyhow::Result<bool> { Ok(false) }));
    }

    #[test]
    fn test_invoke_error_is_caught() {
        let gateway = ExecutionGateway::default();
        let action = || -> anyhow::Result<bool> { anyhow::bail!("disk on fire") };
        assert!(!gateway.invoke("gateway-error-test", &action));
        assert!(logging::recent_failures()
            .iter()
            .any(|f| f.command == "gateway-error-test" && f.message.contains("disk on fire")));
    }

    #[test]
    fn test_invoke_panic_is_caught() {
        let gateway = ExecutionGateway::default();
        let action = || -> anyhow::Result<bool> { panic!("early exit from callback") };
        assert!(!gateway.invoke("panicky", &action));
    }

    #[test]
    fn test_invoke_runs_action_once() {
        let gateway = ExecutionGateway::default();
        let calls = Cell::new(0);
        let action = || -> anyhow::Result<bool> {
            calls.set(calls.get() + 1);
            Ok(true)
        };
        gateway.invoke("counted", &action);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_validate_states() {
        let gateway = ExecutionGateway::default();
        let enabled = || -> anyhow::Result<CommandState> { Ok(CommandState::Enabled) };
        let grayed = || -> anyhow::Result<CommandState> { Ok(CommandState::Grayed) };
        let checked = || -> anyhow::Result<CommandState> { Ok(CommandState::Checked) };
        assert_eq!(gateway.validate("e", &enabled), Some(true));
        assert_eq!(gateway.validate("g", &grayed), Some(false));
        assert_eq!(gateway.validate("c", &checked), Some(true));
    }

    #[test]
    fn test_validate_failure_is_unknown() {
        let gateway = ExecutionGateway::default();
        let failing = || -> anyhow::Result<CommandState> { anyhow::bail!("no model open") };
        let panicking = || -> anyhow::Result<CommandState> { panic!("boom") };
        assert_eq!(gateway.validate("failing", &failing), None);
        assert_eq!(gateway.validate("panicking", &panicking), None);
    }
}
