use std::fmt;

/// The tagged result delivered through a call's response handoff.
///
/// Exactly one `Outcome` is ever delivered per [`Call`](crate::Call); the
/// consuming signatures of [`Call::respond`](crate::Call::respond) and the
/// [`CallGuard`](crate::CallGuard) responders make a second delivery
/// unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Outcome<V> {
    /// Normal completion with the member's return values.
    Return(Vec<V>),
    /// Abnormal termination. The value is relayed verbatim to the producer's
    /// call site and re-raised there; the engine never reports it as a test
    /// failure of its own.
    Abort(V),
}

/// Terminal state of one concurrently running code-under-test invocation,
/// as observed by [`Invocation`](crate::Invocation).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InvocationOutcome<V> {
    /// The invocation returned normally.
    Completed(Vec<V>),
    /// The invocation terminated by re-raising a relayed [`Outcome::Abort`]
    /// value.
    Aborted(V),
    /// The invocation panicked with a payload that is not a relayed abort
    /// value (e.g. a failed assertion inside the code under test). Carries
    /// the panic message when one could be extracted.
    Panicked(String),
}

impl<V> InvocationOutcome<V> {
    /// Whether the invocation completed normally.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// The return values, if the invocation completed normally.
    pub fn values(&self) -> Option<&[V]> {
        match self {
            Self::Completed(values) => Some(values),
            _ => None,
        }
    }
}

/// Panic payload used to re-raise an [`Outcome::Abort`] value at the
/// producer's call site.
///
/// [`CallerHandle::invoke`](crate::CallerHandle::invoke) raises this via
/// `std::panic::panic_any` when an abort outcome is delivered, so the
/// abnormal termination surfaces where the call was made rather than as a
/// separate reported failure. [`Invocation`](crate::Invocation) downcasts
/// the payload back into [`InvocationOutcome::Aborted`]; generated bindings
/// may do the same under `catch_unwind`.
pub struct RelayedAbort<V>(pub V);

impl<V: fmt::Debug> fmt::Debug for RelayedAbort<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelayedAbort({:?})", self.0)
    }
}

impl<V: fmt::Debug> fmt::Display for RelayedAbort<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "relayed abort: {:?}", self.0)
    }
}
