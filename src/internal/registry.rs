use tokio::sync::oneshot;

use crate::{
    Call, CallValidator, Value,
    internal::{Waiter, WaiterId},
};

/// The dispatcher's shared mutable state: the backlog of unclaimed calls
/// and the registry of pending waiters.
///
/// A `Registry` lives behind one `tokio::sync::Mutex` per dispatcher; every
/// scan or mutation of either list happens under that lock. Both scans are
/// first-eligible-wins in arrival/registration order, which keeps matching
/// deterministic under concurrent producers.
///
/// Invariants: a call is in at most one of {backlog, in flight to a matched
/// waiter}; a waiter is in at most one of {registry, matched-and-removed}.
pub(crate) struct Registry<V> {
    backlog: Vec<Call<V>>,
    waiters: Vec<Waiter<V>>,
    next_waiter_id: u64,
}

impl<V: Value> Registry<V> {
    pub(crate) fn new() -> Self {
        Self {
            backlog: Vec::new(),
            waiters: Vec::new(),
            next_waiter_id: 0,
        }
    }

    /// Remove and return the first backlogged call the validator accepts.
    pub(crate) fn claim(&mut self, validator: &CallValidator<V>) -> Option<Call<V>> {
        let idx = self.backlog.iter().position(|call| validator.accepts(call))?;
        Some(self.backlog.remove(idx))
    }

    /// Register a waiter for the next call the validator accepts.
    ///
    /// Callers must invoke this under the same lock acquisition as the
    /// failed [`claim`](Self::claim) scan; releasing the lock in between
    /// opens a missed-wakeup window where a matching call can land in the
    /// backlog unseen by either side.
    pub(crate) fn register(
        &mut self,
        validator: CallValidator<V>,
    ) -> (WaiterId, oneshot::Receiver<Call<V>>) {
        let id = WaiterId(self.next_waiter_id);
        self.next_waiter_id += 1;
        let (tx, rx) = oneshot::channel();
        tracing::trace!(waiter = id.0, expected = validator.description(), "waiter registered");
        self.waiters.push(Waiter::new(id, validator, tx));
        (id, rx)
    }

    /// Remove a waiter after its deadline expired. Returns false if the
    /// waiter already matched (and was removed) in the interim.
    pub(crate) fn deregister(&mut self, id: WaiterId) -> bool {
        match self.waiters.iter().position(|w| w.id == id) {
            Some(idx) => {
                self.waiters.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Match an incoming call against the waiters in registration order, or
    /// append it to the backlog if none accepts it.
    ///
    /// A waiter whose consumer vanished without deregistering hands the
    /// call back, and the scan continues with the remaining waiters.
    pub(crate) fn route(&mut self, mut call: Call<V>) {
        let mut idx = 0;
        while idx < self.waiters.len() {
            if self.waiters[idx].accepts(&call) {
                let waiter = self.waiters.remove(idx);
                let waiter_id = waiter.id.0;
                match waiter.deliver(call) {
                    Ok(()) => {
                        tracing::debug!(waiter = waiter_id, "call delivered to waiter");
                        return;
                    }
                    Err(returned) => {
                        tracing::debug!(waiter = waiter_id, "matched waiter is gone; continuing scan");
                        call = returned;
                    }
                }
            } else {
                idx += 1;
            }
        }
        tracing::debug!(call = %call, "no matching waiter; call enqueued");
        self.backlog.push(call);
    }

    /// Drop every pending waiter and backlogged call. Waiting consumers
    /// observe `DispatcherStopped`; blocked producers observe `CallDropped`.
    pub(crate) fn clear(&mut self) {
        if !self.backlog.is_empty() || !self.waiters.is_empty() {
            tracing::debug!(
                backlog = self.backlog.len(),
                waiters = self.waiters.len(),
                "registry cleared on shutdown"
            );
        }
        self.backlog.clear();
        self.waiters.clear();
    }

    #[cfg(test)]
    pub(crate) fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    #[cfg(test)]
    pub(crate) fn waiter_count(&self) -> usize {
        self.waiters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    #[derive(Clone, Debug, PartialEq)]
    enum TestValue {
        Int(i64),
    }
    impl Value for TestValue {}

    fn call(member: &str, n: i64) -> Call<TestValue> {
        // The pending half is dropped: these tests route calls between
        // waiter slots and never deliver outcomes.
        let (call, _pending) = Call::channel(member.into(), vec![TestValue::Int(n)]);
        call
    }

    #[test]
    fn claim_takes_first_eligible_in_arrival_order() {
        let mut reg = Registry::new();
        reg.route(call("Add", 1));
        reg.route(call("Add", 2));
        reg.route(call("Mul", 3));

        let claimed = reg.claim(&CallValidator::member("Add")).unwrap();
        assert_eq!(claimed.args(), &[TestValue::Int(1)]);
        assert_eq!(reg.backlog_len(), 2);
    }

    #[test]
    fn claim_skips_non_matching_front() {
        let mut reg = Registry::new();
        reg.route(call("Mul", 1));
        reg.route(call("Add", 2));

        let claimed = reg.claim(&CallValidator::member("Add")).unwrap();
        assert_eq!(claimed.member().as_str(), "Add");
        // The non-matching call stays available.
        assert_eq!(reg.backlog_len(), 1);
    }

    #[test]
    fn route_prefers_first_registered_waiter() {
        let mut reg = Registry::new();
        let (_id1, mut rx1) = reg.register(CallValidator::member("Add"));
        let (_id2, mut rx2) = reg.register(CallValidator::member("Add"));

        reg.route(call("Add", 7));

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
        assert_eq!(reg.waiter_count(), 1);
    }

    #[test]
    fn route_skips_vanished_waiter() {
        let mut reg = Registry::new();
        let (_id1, rx1) = reg.register(CallValidator::member("Add"));
        let (_id2, mut rx2) = reg.register(CallValidator::member("Add"));
        drop(rx1);

        reg.route(call("Add", 7));

        assert!(rx2.try_recv().is_ok());
        assert_eq!(reg.waiter_count(), 0);
    }

    #[test]
    fn unmatched_call_lands_in_backlog() {
        let mut reg = Registry::new();
        let (_id, _rx) = reg.register(CallValidator::member("Mul"));

        reg.route(call("Add", 7));

        assert_eq!(reg.backlog_len(), 1);
        assert_eq!(reg.waiter_count(), 1);
    }

    #[test]
    fn deregister_reports_whether_the_waiter_was_still_pending() {
        let mut reg = Registry::new();
        let (id, mut rx) = reg.register(CallValidator::member("Add"));

        reg.route(call("Add", 7));

        // Matched in the interim: deregistration comes back false and the
        // call is sitting in the slot - the expired wait must prefer it.
        assert!(!reg.deregister(id));
        assert!(rx.try_recv().is_ok());

        let (id2, _rx2) = reg.register(CallValidator::member("Mul"));
        assert!(reg.deregister(id2));
    }
}
