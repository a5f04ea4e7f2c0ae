use std::{fmt, sync::Arc};

use crate::{
    CallerHandle, Config, Dispatcher, FailureReporter, LogReporter, MemberName, Value,
    expect::{Expect, Mode},
};

/// Test-facing surface for one abstracted capability.
///
/// A `Mock` owns the capability's [`Dispatcher`] and the
/// [`FailureReporter`] used when expectations fail. Producer code (the
/// generated stand-in implementation) talks to the same dispatcher through
/// a [`CallerHandle`] from [`caller`](Self::caller); the test script claims
/// calls through [`expect`](Self::expect) and [`eventually`](Self::eventually).
///
/// Construct one `Mock` per capability per test and tear it down with
/// [`stop`](Self::stop) (or drop). There is no shared or global state
/// between mocks.
///
/// # Example
///
/// ```ignore
/// let mock = Mock::<CalcValue>::new();
/// let calc = mock.caller();
///
/// let under_test = tokio::spawn(async move {
///     calc.invoke("Add", vec![CalcValue::Int(2), CalcValue::Int(3)]).await
/// });
///
/// let call = mock.expect("Add").args([CalcValue::Int(2), CalcValue::Int(3)]).await?;
/// call.ret([CalcValue::Int(5)])?;
///
/// assert_eq!(under_test.await.unwrap()?, vec![CalcValue::Int(5)]);
/// mock.stop().await;
/// ```
pub struct Mock<V: Value> {
    dispatcher: Dispatcher<V>,
    reporter: Arc<dyn FailureReporter>,
}

impl<V: Value> Mock<V> {
    /// Create a mock with default configuration.
    ///
    /// Must be called within a Tokio runtime.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a mock with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            dispatcher: Dispatcher::with_config(config),
            reporter: Arc::new(LogReporter),
        }
    }

    /// Replace the failure reporter, e.g. with
    /// [`PanicReporter`](crate::PanicReporter) or a bridge into a custom
    /// harness.
    pub fn with_reporter(mut self, reporter: impl FailureReporter + 'static) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// Returns a producer-side handle for the stand-in implementation.
    pub fn caller(&self) -> CallerHandle<V> {
        self.dispatcher.caller()
    }

    /// Expect the *next* capability call to be to `member`.
    ///
    /// Ordered discipline: if the next call (queued or arriving) does not
    /// match, the expectation fails immediately, naming both the expected
    /// and the actual call. See [`Expect`] for argument specs and
    /// deadlines.
    pub fn expect(&self, member: impl Into<MemberName>) -> Expect<'_, V> {
        Expect::new(self, member.into(), Mode::Ordered)
    }

    /// Expect a call to `member` to arrive *eventually*.
    ///
    /// Non-matching calls are left queued for later expectations; the wait
    /// blocks until a match appears or the deadline expires.
    pub fn eventually(&self, member: impl Into<MemberName>) -> Expect<'_, V> {
        Expect::new(self, member.into(), Mode::Eventually)
    }

    /// Engine-level access to the underlying dispatcher, for tests that
    /// drive [`get_call`](Dispatcher::get_call) with a custom validator.
    pub fn dispatcher(&self) -> &Dispatcher<V> {
        &self.dispatcher
    }

    /// Tear the mock down: stops the dispatch loop and unblocks every
    /// pending producer and expectation with an error.
    pub async fn stop(self) {
        self.dispatcher.shutdown().await;
    }

    pub(crate) fn reporter(&self) -> &dyn FailureReporter {
        &*self.reporter
    }

    pub(crate) fn config(&self) -> &Config {
        self.dispatcher.config()
    }
}

impl<V: Value> Default for Mock<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Value> fmt::Debug for Mock<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mock")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, Invocation, InvocationOutcome};
    use std::time::Duration;

    #[derive(Clone, Debug, PartialEq)]
    enum TestValue {
        Int(i64),
        Text(String),
    }
    impl Value for TestValue {}

    fn int(n: i64) -> TestValue {
        TestValue::Int(n)
    }

    #[tokio::test]
    async fn add_call_round_trip() {
        let mock = Mock::<TestValue>::new();
        let calc = mock.caller();

        let producer =
            tokio::spawn(async move { calc.invoke("Add", vec![int(2), int(3)]).await });

        let call = mock
            .expect("Add")
            .args(vec![int(2), int(3)])
            .await
            .unwrap();
        assert_eq!(call.args(), &[int(2), int(3)]);
        call.ret([int(5)]).unwrap();

        assert_eq!(producer.await.unwrap().unwrap(), vec![int(5)]);
        mock.stop().await;
    }

    #[tokio::test]
    async fn abort_is_relayed_to_the_call_site() {
        let mock = Mock::<TestValue>::new();
        let calc = mock.caller();

        let mut invocation = Invocation::spawn(async move {
            // The abort surfaces as a panic at this call site; the
            // invocation tracker maps it back into an outcome.
            calc.invoke("Charge", vec![int(100)]).await.unwrap()
        });

        let call = mock.expect("Charge").await.unwrap();
        call.abort(TestValue::Text("card declined".into())).unwrap();

        let outcome = invocation.outcome().await.unwrap();
        assert_eq!(
            outcome,
            InvocationOutcome::Aborted(TestValue::Text("card declined".into()))
        );
        mock.stop().await;
    }

    #[tokio::test]
    async fn expectations_consume_calls_in_registration_order_across_producers() {
        let mock = Mock::<TestValue>::new();

        // Two producers race; the test consumes in the order it registers
        // expectations, not in arrival order.
        let first = {
            let caller = mock.caller();
            tokio::spawn(async move { caller.invoke("Write", vec![int(1)]).await })
        };
        let second = {
            let caller = mock.caller();
            tokio::spawn(async move { caller.invoke("Read", vec![]).await })
        };

        let read = mock.eventually("Read").await.unwrap();
        read.ret([int(9)]).unwrap();
        let write = mock.eventually("Write").await.unwrap();
        write.ret(Vec::new()).unwrap();

        assert_eq!(first.await.unwrap().unwrap(), Vec::<TestValue>::new());
        assert_eq!(second.await.unwrap().unwrap(), vec![int(9)]);
        mock.stop().await;
    }

    #[tokio::test]
    async fn stop_unblocks_a_pending_expectation() {
        let mock = Mock::<TestValue>::new();

        let (res, ()) = tokio::join!(
            async { mock.expect("Never").within(Duration::from_secs(5)).await },
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                mock.dispatcher().shutdown().await;
            }
        );

        assert_eq!(res.unwrap_err(), Error::DispatcherStopped);
    }
}
