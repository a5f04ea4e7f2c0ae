use std::fmt;

use tokio::sync::mpsc::Sender;

use crate::{Call, MemberName, Outcome, PendingCall, RelayedAbort, Result, Value};

/// Producer-side handle for submitting calls into a dispatcher.
///
/// Stand-in implementations hold one of these and route every member
/// invocation through it. Use it to:
/// - `invoke(member, args)`: submit a call and block until the test answers
/// - `submit(member, args)`: the lower-level split, returning the pending
///   response handoff for callers that manage the wait themselves
///
/// Handles are cheap to clone and independent of the test-facing surface;
/// see [`Dispatcher::caller`](crate::Dispatcher::caller) and
/// [`Mock::caller`](crate::Mock::caller).
#[derive(Clone)]
pub struct CallerHandle<V> {
    sender: Sender<Call<V>>,
}

impl<V: Value> CallerHandle<V> {
    pub(crate) fn new(sender: Sender<Call<V>>) -> Self {
        Self { sender }
    }

    /// Record a call and publish it to the dispatcher, without waiting for
    /// the outcome.
    ///
    /// Blocks only when the mailbox is full (backpressure).
    ///
    /// # Errors
    ///
    /// Returns [`Error::MailboxClosed`](crate::Error::MailboxClosed) if the
    /// dispatcher has shut down.
    pub async fn submit(
        &self,
        member: impl Into<MemberName>,
        args: Vec<V>,
    ) -> Result<PendingCall<V>> {
        let (call, pending) = Call::channel(member.into(), args);
        tracing::trace!(call = %call, "call submitted");
        self.sender.send(call).await?;
        Ok(pending)
    }

    /// Submit a call and block until the test script delivers its outcome.
    ///
    /// On [`Outcome::Return`] the return values are handed back to the
    /// caller. On [`Outcome::Abort`] the abort value is re-raised at this
    /// call site via `std::panic::panic_any(`[`RelayedAbort`]`)`. The
    /// engine relays the signal verbatim and never reports it as a test
    /// failure of its own.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MailboxClosed`](crate::Error::MailboxClosed) if the
    /// dispatcher has shut down, or
    /// [`Error::CallDropped`](crate::Error::CallDropped) if the call was
    /// discarded without a response.
    pub async fn invoke(&self, member: impl Into<MemberName>, args: Vec<V>) -> Result<Vec<V>> {
        let pending = self.submit(member, args).await?;
        match pending.outcome().await? {
            Outcome::Return(values) => Ok(values),
            Outcome::Abort(value) => std::panic::panic_any(RelayedAbort(value)),
        }
    }
}

impl<V> fmt::Debug for CallerHandle<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallerHandle")
            .field("mailbox_closed", &self.sender.is_closed())
            .finish_non_exhaustive()
    }
}
