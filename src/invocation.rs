use std::{
    any::Any,
    fmt,
    future::{Future, IntoFuture},
    time::Duration,
};

use tokio::{task::JoinHandle, time};

use crate::{Error, InvocationOutcome, RelayedAbort, Result, Value};

/// Tracks the terminal state of one concurrently running code-under-test
/// invocation.
///
/// [`spawn`](Self::spawn) launches the invocation as an independent Tokio
/// task; [`outcome`](Self::outcome) blocks until it completes normally or
/// terminates abnormally, then caches the result. Terminal states are
/// sticky: repeated queries return the cached outcome without re-blocking.
/// One tracker serves one logical consumer (`&mut self`); there is no
/// fan-out.
///
/// # Example
///
/// ```ignore
/// let mut invocation = Invocation::spawn(async move {
///     service.invoke("Transfer", vec![Value::Int(100)]).await.unwrap()
/// });
///
/// // ... drive expectations ...
///
/// match invocation.outcome().within(Duration::from_secs(1)).await? {
///     InvocationOutcome::Completed(values) => assert_eq!(values, vec![Value::Int(1)]),
///     other => panic!("unexpected outcome: {other:?}"),
/// }
/// ```
pub struct Invocation<V: Value> {
    state: State<V>,
}

enum State<V> {
    Running(JoinHandle<Vec<V>>),
    Done(InvocationOutcome<V>),
    Cancelled,
}

impl<V: Value> Invocation<V> {
    /// Launch the invocation as an independent concurrent task.
    ///
    /// Must be called within a Tokio runtime.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Vec<V>> + Send + 'static,
    {
        Self {
            state: State::Running(tokio::spawn(future)),
        }
    }

    /// Returns an awaitable builder for the invocation's terminal outcome.
    ///
    /// By default the wait has no deadline (the invocation must resolve
    /// before the test ends); bound it with
    /// [`within`](AwaitOutcome::within).
    pub fn outcome(&mut self) -> AwaitOutcome<'_, V> {
        AwaitOutcome {
            invocation: self,
            timeout: None,
        }
    }

    /// Whether a terminal outcome has already been observed.
    pub fn is_resolved(&self) -> bool {
        matches!(self.state, State::Done(_))
    }
}

impl<V: Value> fmt::Debug for Invocation<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            State::Running(_) => "running",
            State::Done(_) => "done",
            State::Cancelled => "cancelled",
        };
        f.debug_struct("Invocation").field("state", &state).finish()
    }
}

/// An awaitable outcome query. Created by [`Invocation::outcome`].
pub struct AwaitOutcome<'a, V: Value> {
    invocation: &'a mut Invocation<V>,
    timeout: Option<Duration>,
}

impl<'a, V: Value> AwaitOutcome<'a, V> {
    /// Bound the wait. On expiry the query fails with
    /// [`Error::InvocationPending`] without consuming the task; a later
    /// query can still resolve it.
    pub fn within(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    async fn run(self) -> Result<InvocationOutcome<V>> {
        match &mut self.invocation.state {
            State::Done(outcome) => Ok(outcome.clone()),
            State::Cancelled => Err(Error::InvocationCancelled),
            State::Running(handle) => {
                let joined = match self.timeout {
                    None => handle.await,
                    Some(deadline) => match time::timeout(deadline, &mut *handle).await {
                        Ok(joined) => joined,
                        Err(_elapsed) => return Err(Error::InvocationPending(deadline)),
                    },
                };
                match joined {
                    Ok(values) => {
                        let outcome = InvocationOutcome::Completed(values);
                        self.invocation.state = State::Done(outcome.clone());
                        Ok(outcome)
                    }
                    Err(join_err) if join_err.is_panic() => {
                        let outcome = resolve_panic::<V>(join_err.into_panic());
                        self.invocation.state = State::Done(outcome.clone());
                        Ok(outcome)
                    }
                    Err(_cancelled) => {
                        self.invocation.state = State::Cancelled;
                        Err(Error::InvocationCancelled)
                    }
                }
            }
        }
    }
}

/// Map a panic payload back into an outcome: a [`RelayedAbort`] payload is
/// an abnormal termination relayed through the engine; anything else is a
/// foreign panic in the code under test.
fn resolve_panic<V: Value>(payload: Box<dyn Any + Send>) -> InvocationOutcome<V> {
    match payload.downcast::<RelayedAbort<V>>() {
        Ok(abort) => InvocationOutcome::Aborted(abort.0),
        Err(payload) => InvocationOutcome::Panicked(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else {
        "opaque panic payload".to_string()
    }
}

impl<'a, V: Value> IntoFuture for AwaitOutcome<'a, V> {
    type Output = Result<InvocationOutcome<V>>;
    type IntoFuture = std::pin::Pin<Box<dyn Future<Output = Self::Output> + Send + 'a>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.run())
    }
}

impl<V: Value> fmt::Debug for AwaitOutcome<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwaitOutcome")
            .field("invocation", &self.invocation)
            .field("timeout", &self.timeout)
            .finish()
    }
}
