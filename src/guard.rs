use std::fmt;

use crate::{Call, CallId, MemberName, Outcome, Result, Value};

/// Handle to a claimed call: inspect the arguments, then deliver exactly
/// one outcome.
///
/// Returned by awaiting an expectation ([`Mock::expect`](crate::Mock::expect)
/// / [`Mock::eventually`](crate::Mock::eventually)). The responders
/// [`ret`](Self::ret) and [`abort`](Self::abort) consume the guard, so a
/// second delivery is unrepresentable. Dropping a guard without responding
/// discards the call and unblocks its producer with
/// [`Error::CallDropped`](crate::Error::CallDropped); that is a
/// test-resource leak for the host framework to flag, so the engine logs a
/// warning and moves on.
///
/// # Example
///
/// ```ignore
/// let call = mock.expect("Add").args([Value::Int(2), Value::Int(3)]).await?;
/// assert_eq!(call.args().len(), 2);
/// call.ret([Value::Int(5)])?;
/// ```
pub struct CallGuard<V: Value> {
    call: Option<Call<V>>,
}

impl<V: Value> CallGuard<V> {
    pub(crate) fn new(call: Call<V>) -> Self {
        Self { call: Some(call) }
    }

    fn call(&self) -> &Call<V> {
        self.call
            .as_ref()
            .expect("call present until the guard is consumed")
    }

    /// Unique identifier of the claimed call.
    pub fn id(&self) -> CallId {
        self.call().id()
    }

    /// The capability member that was invoked.
    pub fn member(&self) -> &MemberName {
        self.call().member()
    }

    /// The arguments captured at invocation time.
    pub fn args(&self) -> &[V] {
        self.call().args()
    }

    /// Deliver a normal return, unblocking the producer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CallAbandoned`](crate::Error::CallAbandoned) if the
    /// producer task is gone.
    pub fn ret(mut self, values: impl Into<Vec<V>>) -> Result<()> {
        let call = self.call.take().expect("guard not yet consumed");
        call.respond(Outcome::Return(values.into()))
    }

    /// Deliver an abnormal termination. The value is re-raised at the
    /// producer's call site; see
    /// [`CallerHandle::invoke`](crate::CallerHandle::invoke).
    ///
    /// # Errors
    ///
    /// Returns [`Error::CallAbandoned`](crate::Error::CallAbandoned) if the
    /// producer task is gone.
    pub fn abort(mut self, value: V) -> Result<()> {
        let call = self.call.take().expect("guard not yet consumed");
        call.respond(Outcome::Abort(value))
    }
}

impl<V: Value> Drop for CallGuard<V> {
    fn drop(&mut self) {
        if let Some(call) = self.call.take() {
            tracing::warn!(call = %call, "call guard dropped without a response");
        }
    }
}

impl<V: Value> fmt::Debug for CallGuard<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallGuard").field("call", &self.call).finish()
    }
}
