use std::fmt;

/// Pass-through to the host test-reporting facility.
///
/// The engine invokes [`fail`](Self::fail) when an expectation times out or
/// an ordered call mismatches, and [`mark_helper`](Self::mark_helper) on
/// entry to expectation internals so hosts that attribute failures to stack
/// frames can skip them. Both are pass-through: the engine's own failure
/// signal is always the returned [`Error`](crate::Error).
///
/// Implement this to bridge into a custom harness; the built-ins are
/// [`LogReporter`] (default) and [`PanicReporter`].
pub trait FailureReporter: Send + Sync {
    /// Report a test failure with the given message.
    fn fail(&self, message: &str);

    /// Mark the current frame as test-helper plumbing. No-op by default.
    fn mark_helper(&self) {}
}

/// Default reporter: emits the failure via `tracing::error!` and relies on
/// the propagated [`Error`](crate::Error) to fail the test.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl FailureReporter for LogReporter {
    fn fail(&self, message: &str) {
        tracing::error!(target: "understudy", "{message}");
    }
}

/// Abort-on-failure reporter: panics with the failure message, for suites
/// that treat any expectation failure as immediately fatal.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanicReporter;

impl FailureReporter for PanicReporter {
    fn fail(&self, message: &str) {
        panic!("{message}");
    }
}

impl fmt::Debug for dyn FailureReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureReporter").finish_non_exhaustive()
    }
}
