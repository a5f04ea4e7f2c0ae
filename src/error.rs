use std::time::Duration;

use tokio::sync::mpsc::error::SendError;

use crate::{Call, MemberName};

/// The single error type for all understudy operations.
///
/// Every fallible understudy API returns `understudy::Result<T>` (alias for
/// `Result<T, understudy::Error>`). Errors from lower layers (Tokio
/// channels, task joins) are mapped into variants of this enum so callers
/// only need to handle one error type.
///
/// Expectation failures ([`NoMatchingCall`](Self::NoMatchingCall),
/// [`UnexpectedCall`](Self::UnexpectedCall)) carry rendered call identities
/// so their `Display` output names both sides of the mismatch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("mailbox closed")]
    MailboxClosed,

    #[error("dispatcher stopped while waiting for a call")]
    DispatcherStopped,

    #[error("no call matching {expected} within {waited:?}")]
    NoMatchingCall { expected: String, waited: Duration },

    #[error("unexpected call: expected {expected}, got {actual} ({reason})")]
    UnexpectedCall {
        expected: String,
        actual: String,
        reason: String,
    },

    #[error("call to '{0}' was dropped before an outcome was delivered")]
    CallDropped(MemberName),

    #[error("producer for call to '{0}' is gone; outcome was not delivered")]
    CallAbandoned(MemberName),

    #[error("invocation still running after {0:?}")]
    InvocationPending(Duration),

    #[error("invocation task was cancelled")]
    InvocationCancelled,
}

impl<V> From<SendError<Call<V>>> for Error {
    fn from(_e: SendError<Call<V>>) -> Self {
        Error::MailboxClosed
    }
}
