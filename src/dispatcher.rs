use std::sync::Arc;
use std::time::Duration;

use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
    time,
};
use tokio_util::sync::CancellationToken;

use crate::{
    Call, CallValidator, CallerHandle, Config, Error, Result, Value,
    internal::{DispatchLoop, Registry},
};

/// The per-capability rendezvous engine matching submitted calls to waiting
/// consumers, or queuing them until a consumer asks.
///
/// A `Dispatcher` owns the backlog of unclaimed calls, the registry of
/// pending waiters, and a serializing dispatch-loop task fed by a bounded
/// mailbox. Producers submit through a [`CallerHandle`]; the test-script
/// consumer claims calls with [`get_call`](Self::get_call) (usually via the
/// [`Mock`](crate::Mock) façade rather than directly).
///
/// Construct one dispatcher per abstracted capability, owned by one test
/// context, and tear it down with that context ([`shutdown`](Self::shutdown)
/// or drop). There is no global registry.
///
/// # Ordering
///
/// Within one dispatcher, calls are matched or queued in strict arrival
/// order and waiters in strict registration order; both scans are
/// first-eligible-wins with no priority or randomization, so matching is
/// deterministic even under racing producers.
pub struct Dispatcher<V: Value> {
    config: Arc<Config>,
    registry: Arc<Mutex<Registry<V>>>,
    sender: mpsc::Sender<Call<V>>,
    cancel_token: CancellationToken,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl<V: Value> Dispatcher<V> {
    /// Create a dispatcher with default configuration and start its
    /// dispatch loop.
    ///
    /// Must be called within a Tokio runtime.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a dispatcher with the given configuration and start its
    /// dispatch loop.
    pub fn with_config(config: Config) -> Self {
        let config = Arc::new(config);
        let (tx, rx) = mpsc::channel::<Call<V>>(config.mailbox_capacity());
        let registry = Arc::new(Mutex::new(Registry::new()));
        let cancel_token = CancellationToken::new();

        let dispatch_loop = DispatchLoop::new(rx, registry.clone(), cancel_token.clone());
        let task = tokio::spawn(dispatch_loop.run());

        Self {
            config,
            registry,
            sender: tx,
            cancel_token,
            task: std::sync::Mutex::new(Some(task)),
        }
    }

    /// Returns a producer-side handle for submitting calls.
    ///
    /// Handles are cheap to clone; give one to every stand-in
    /// implementation that routes its members through this dispatcher.
    pub fn caller(&self) -> CallerHandle<V> {
        CallerHandle::new(self.sender.clone())
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    /// Claim the next call the validator accepts.
    ///
    /// Scans the backlog in arrival order first; if an already-queued call
    /// satisfies the validator it is removed and returned without blocking.
    /// Otherwise a waiter is registered and this call blocks until the
    /// dispatch loop hands it a matching call, the deadline expires, or the
    /// dispatcher shuts down. `None` waits indefinitely.
    ///
    /// The backlog scan and waiter registration happen under a single
    /// uninterrupted lock acquisition. An expired wait deregisters its
    /// waiter under the same lock and re-checks for a match that raced with
    /// expiry; the match wins over the timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::NoMatchingCall`] when the deadline expires, naming the
    ///   validator's description.
    /// - [`Error::DispatcherStopped`] when the dispatcher is torn down
    ///   while waiting.
    pub async fn get_call(
        &self,
        timeout: Option<Duration>,
        validator: CallValidator<V>,
    ) -> Result<Call<V>> {
        let expected = validator.description().to_string();

        let (waiter_id, mut slot) = {
            let mut registry = self.registry.lock().await;
            if let Some(call) = registry.claim(&validator) {
                tracing::debug!(call = %call, "claimed from backlog");
                return Ok(call);
            }
            registry.register(validator)
            // The lock is released here, after registration. A call routed
            // from this point on sees the waiter.
        };

        let Some(deadline) = timeout else {
            return slot.await.map_err(|_| Error::DispatcherStopped);
        };

        match time::timeout(deadline, &mut slot).await {
            Ok(Ok(call)) => Ok(call),
            Ok(Err(_)) => Err(Error::DispatcherStopped),
            Err(_elapsed) => {
                let still_pending = self.registry.lock().await.deregister(waiter_id);
                if !still_pending {
                    // The waiter matched concurrently with expiry; the call
                    // is already in the slot and must not be lost.
                    if let Ok(call) = slot.try_recv() {
                        tracing::debug!(call = %call, "late match preferred over timeout");
                        return Ok(call);
                    }
                }
                Err(Error::NoMatchingCall {
                    expected,
                    waited: deadline,
                })
            }
        }
    }

    /// Stop the dispatch loop and release every pending call and waiter.
    ///
    /// Waiting consumers observe [`Error::DispatcherStopped`]; producers
    /// blocked on unclaimed calls observe [`Error::CallDropped`]; further
    /// submissions observe [`Error::MailboxClosed`]. Idempotent.
    pub async fn shutdown(&self) {
        self.cancel_token.cancel();
        let task = self.task.lock().expect("dispatcher task slot poisoned").take();
        if let Some(task) = task {
            let _ = task.await;
        }
        self.registry.lock().await.clear();
    }
}

impl<V: Value> Default for Dispatcher<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Value> Drop for Dispatcher<V> {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

impl<V: Value> std::fmt::Debug for Dispatcher<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("stopped", &self.cancel_token.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[derive(Clone, Debug, PartialEq)]
    enum TestValue {
        Int(i64),
    }
    impl Value for TestValue {}

    fn int(n: i64) -> TestValue {
        TestValue::Int(n)
    }

    #[tokio::test]
    async fn queued_call_is_claimed_without_blocking() {
        let dispatcher = Dispatcher::<TestValue>::new();
        let caller = dispatcher.caller();

        let _pending = caller.submit("Add", vec![int(2), int(3)]).await.unwrap();
        // Let the loop route the call into the backlog.
        tokio::time::sleep(Duration::from_millis(10)).await;

        let call = dispatcher
            .get_call(Some(Duration::from_secs(1)), CallValidator::member("Add"))
            .await
            .unwrap();
        assert_eq!(call.member().as_str(), "Add");
        assert_eq!(call.args(), &[int(2), int(3)]);
    }

    #[tokio::test]
    async fn waiter_is_woken_by_a_later_submission() {
        let dispatcher = Arc::new(Dispatcher::<TestValue>::new());
        let caller = dispatcher.caller();

        let consumer = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .get_call(Some(Duration::from_secs(2)), CallValidator::member("Add"))
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        let _pending = caller.submit("Add", vec![int(1)]).await.unwrap();

        let call = consumer.await.unwrap().unwrap();
        assert_eq!(call.member().as_str(), "Add");
    }

    #[tokio::test]
    async fn calls_are_claimed_in_arrival_order() {
        let dispatcher = Dispatcher::<TestValue>::new();
        let caller = dispatcher.caller();

        let _p1 = caller.submit("Add", vec![int(1)]).await.unwrap();
        let _p2 = caller.submit("Add", vec![int(2)]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let first = dispatcher
            .get_call(Some(Duration::from_secs(1)), CallValidator::member("Add"))
            .await
            .unwrap();
        let second = dispatcher
            .get_call(Some(Duration::from_secs(1)), CallValidator::member("Add"))
            .await
            .unwrap();
        assert_eq!(first.args(), &[int(1)]);
        assert_eq!(second.args(), &[int(2)]);
    }

    #[tokio::test]
    async fn timeout_fires_after_the_deadline_and_names_the_expectation() {
        let dispatcher = Dispatcher::<TestValue>::new();

        let start = Instant::now();
        let err = dispatcher
            .get_call(
                Some(Duration::from_millis(100)),
                CallValidator::member("Add"),
            )
            .await
            .unwrap_err();
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(100), "fired early: {elapsed:?}");
        assert!(elapsed < Duration::from_millis(500), "fired late: {elapsed:?}");
        match err {
            Error::NoMatchingCall { expected, waited } => {
                assert_eq!(expected, "Add(..)");
                assert_eq!(waited, Duration::from_millis(100));
            }
            other => panic!("expected NoMatchingCall, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_matching_call_stays_available_for_a_later_validator() {
        let dispatcher = Dispatcher::<TestValue>::new();
        let caller = dispatcher.caller();

        let _p1 = caller.submit("Multiply", vec![int(5), int(6)]).await.unwrap();
        let _p2 = caller.submit("Add", vec![int(2), int(3)]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Claim Add first even though Multiply arrived first.
        let add = dispatcher
            .get_call(Some(Duration::from_secs(1)), CallValidator::member("Add"))
            .await
            .unwrap();
        assert_eq!(add.member().as_str(), "Add");

        // Multiply is still in the backlog for a later expectation.
        let mul = dispatcher
            .get_call(Some(Duration::from_secs(1)), CallValidator::member("Multiply"))
            .await
            .unwrap();
        assert_eq!(mul.member().as_str(), "Multiply");
    }

    // Regression test for the missed-wakeup race: if the backlog scan and
    // waiter registration released the lock in between, a call arriving in
    // the window would be enqueued with neither side noticing, and one of
    // the consumers below would time out despite a satisfying call existing.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn no_missed_wakeup_when_producers_and_consumers_race() {
        for _ in 0..50 {
            let dispatcher = Arc::new(Dispatcher::<TestValue>::new());

            // Each consumer rejects the first call it could see and accepts
            // only the other producer's call.
            let first = {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    dispatcher
                        .get_call(Some(Duration::from_secs(2)), CallValidator::member("B"))
                        .await
                })
            };
            let second = {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    dispatcher
                        .get_call(Some(Duration::from_secs(2)), CallValidator::member("A"))
                        .await
                })
            };

            let producer_a = {
                let caller = dispatcher.caller();
                tokio::spawn(async move { caller.submit("A", vec![]).await })
            };
            let producer_b = {
                let caller = dispatcher.caller();
                tokio::spawn(async move { caller.submit("B", vec![]).await })
            };

            let call_b = first.await.unwrap().unwrap();
            let call_a = second.await.unwrap().unwrap();
            assert_eq!(call_b.member().as_str(), "B");
            assert_eq!(call_a.member().as_str(), "A");
            producer_a.await.unwrap().unwrap();
            producer_b.await.unwrap().unwrap();
        }
    }

    #[tokio::test]
    async fn shutdown_unblocks_an_indefinite_wait() {
        let dispatcher = Arc::new(Dispatcher::<TestValue>::new());

        let consumer = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.get_call(None, CallValidator::member("Add")).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        dispatcher.shutdown().await;

        assert!(matches!(
            consumer.await.unwrap(),
            Err(Error::DispatcherStopped)
        ));
    }

    #[tokio::test]
    async fn shutdown_unblocks_a_backlogged_producer() {
        let dispatcher = Dispatcher::<TestValue>::new();
        let caller = dispatcher.caller();

        let pending = caller.submit("Add", vec![int(1)]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        dispatcher.shutdown().await;

        assert!(matches!(
            pending.outcome().await,
            Err(Error::CallDropped(_))
        ));
    }

    #[tokio::test]
    async fn submit_after_shutdown_reports_mailbox_closed() {
        let dispatcher = Dispatcher::<TestValue>::new();
        let caller = dispatcher.caller();

        dispatcher.shutdown().await;

        assert!(matches!(
            caller.submit("Add", vec![]).await,
            Err(Error::MailboxClosed)
        ));
    }
}
