use tokio::sync::oneshot;

use crate::{Call, CallValidator, Value};

/// Identifies one registered waiter for deregistration after a timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WaiterId(pub(crate) u64);

/// A pending consumer-side expectation: a validator plus the one-shot slot
/// the dispatch loop writes the matched call into.
pub(crate) struct Waiter<V> {
    pub(crate) id: WaiterId,
    validator: CallValidator<V>,
    slot: oneshot::Sender<Call<V>>,
}

impl<V: Value> Waiter<V> {
    pub(crate) fn new(
        id: WaiterId,
        validator: CallValidator<V>,
        slot: oneshot::Sender<Call<V>>,
    ) -> Self {
        Self {
            id,
            validator,
            slot,
        }
    }

    pub(crate) fn accepts(&self, call: &Call<V>) -> bool {
        self.validator.accepts(call)
    }

    /// Hand the matched call to the blocked consumer. Returns the call if
    /// the consumer is gone (its receiver was dropped without
    /// deregistering), so the dispatch loop can keep scanning.
    pub(crate) fn deliver(self, call: Call<V>) -> Result<(), Call<V>> {
        self.slot.send(call)
    }
}
