use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use tokio::sync::oneshot;

use crate::{CallId, Error, MemberName, Outcome, Result};

/// One recorded invocation of a capability member, pending a response.
///
/// A producer task creates the call (via
/// [`CallerHandle::submit`](crate::CallerHandle::submit)), publishes it to
/// the dispatcher's mailbox, and blocks on the matching [`PendingCall`]. The
/// dispatcher tracks the `Call` in its backlog or hands it to a matched
/// waiter; the test script then inspects the arguments and delivers exactly
/// one [`Outcome`] through [`respond`](Self::respond) (or the
/// [`CallGuard`](crate::CallGuard) wrappers), which unblocks the producer.
///
/// The member name and arguments are captured at invocation time and
/// immutable thereafter.
pub struct Call<V> {
    id: CallId,
    member: MemberName,
    args: Vec<V>,
    responder: Responder<V>,
}

impl<V> Call<V> {
    /// Create a call together with the producer-side half of its response
    /// handoff.
    pub(crate) fn channel(member: MemberName, args: Vec<V>) -> (Self, PendingCall<V>) {
        let (tx, rx) = oneshot::channel();
        let done = Arc::new(AtomicBool::new(false));
        let id = CallId::new();
        let call = Self {
            id,
            member: member.clone(),
            args,
            responder: Responder {
                tx,
                done: done.clone(),
            },
        };
        let pending = PendingCall {
            id,
            member,
            rx,
            done,
        };
        (call, pending)
    }

    /// Unique identifier for this call.
    #[inline]
    pub fn id(&self) -> CallId {
        self.id
    }

    /// The capability member this call invokes.
    #[inline]
    pub fn member(&self) -> &MemberName {
        &self.member
    }

    /// The arguments captured at invocation time.
    #[inline]
    pub fn args(&self) -> &[V] {
        &self.args
    }

    /// Whether an outcome has been delivered for this call.
    ///
    /// Idempotent; once true it stays true.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.responder.done.load(Ordering::Acquire)
    }

    /// Deliver the outcome for this call, unblocking the producer.
    ///
    /// Consuming `self` makes a second delivery unrepresentable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CallAbandoned`] if the producer task is gone (its
    /// [`PendingCall`] was dropped), in which case the outcome was not
    /// delivered.
    pub fn respond(self, outcome: Outcome<V>) -> Result<()> {
        let member = self.member;
        self.responder.deliver(outcome).map_err(|_| {
            tracing::warn!(member = %member, "outcome delivery failed: producer is gone");
            Error::CallAbandoned(member)
        })
    }
}

impl<V: fmt::Debug> fmt::Debug for Call<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("id", &self.id)
            .field("member", &self.member)
            .field("args", &self.args)
            .field("done", &self.is_done())
            .finish()
    }
}

impl<V: fmt::Debug> fmt::Display for Call<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.member)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg:?}")?;
        }
        write!(f, ")")
    }
}

/// The test-side half of a call's single-use response handoff.
struct Responder<V> {
    tx: oneshot::Sender<Outcome<V>>,
    done: Arc<AtomicBool>,
}

impl<V> Responder<V> {
    /// Send the outcome; the `done` flag is set only once the handoff
    /// succeeded.
    fn deliver(self, outcome: Outcome<V>) -> std::result::Result<(), Outcome<V>> {
        self.tx.send(outcome)?;
        self.done.store(true, Ordering::Release);
        Ok(())
    }
}

/// The producer-side half of a call's response handoff.
///
/// Returned by [`CallerHandle::submit`](crate::CallerHandle::submit). The
/// producer blocks on [`outcome`](Self::outcome) until the test script
/// delivers a response.
pub struct PendingCall<V> {
    id: CallId,
    member: MemberName,
    rx: oneshot::Receiver<Outcome<V>>,
    done: Arc<AtomicBool>,
}

impl<V> PendingCall<V> {
    /// Unique identifier of the submitted call.
    #[inline]
    pub fn id(&self) -> CallId {
        self.id
    }

    /// The capability member the call invokes.
    #[inline]
    pub fn member(&self) -> &MemberName {
        &self.member
    }

    /// Whether an outcome has been delivered for this call.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Block until the outcome is delivered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CallDropped`] if the call was dropped without a
    /// response (the dispatcher was torn down, or the test dropped its
    /// [`CallGuard`](crate::CallGuard) unresponded).
    pub async fn outcome(self) -> Result<Outcome<V>> {
        self.rx.await.map_err(|_| Error::CallDropped(self.member))
    }
}

impl<V> fmt::Debug for PendingCall<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCall")
            .field("id", &self.id)
            .field("member", &self.member)
            .field("done", &self.is_done())
            .finish()
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

    #[tokio::test]
    async fn outcome_reaches_producer_exactly_once() {
        let (call, pending) = Call::channel("Add".into(), vec![TestValue::Int(2)]);
        assert!(!call.is_done());
        assert!(!pending.is_done());

        call.respond(Outcome::Return(vec![TestValue::Int(5)]))
            .unwrap();
        assert!(pending.is_done());
        assert_eq!(
            pending.outcome().await.unwrap(),
            Outcome::Return(vec![TestValue::Int(5)])
        );
    }

    #[tokio::test]
    async fn dropped_call_unblocks_producer_with_error() {
        let (call, pending) = Call::<TestValue>::channel("Add".into(), vec![]);
        drop(call);
        assert!(matches!(
            pending.outcome().await,
            Err(Error::CallDropped(member)) if member.as_str() == "Add"
        ));
    }

    #[tokio::test]
    async fn respond_to_vanished_producer_is_an_error() {
        let (call, pending) = Call::<TestValue>::channel("Add".into(), vec![]);
        drop(pending);
        assert!(matches!(
            call.respond(Outcome::Return(vec![])),
            Err(Error::CallAbandoned(_))
        ));
    }

    #[test]
    fn display_names_member_and_args() {
        let (call, _pending) = Call::channel(
            "Add".into(),
            vec![TestValue::Int(2), TestValue::Int(3)],
        );
        assert_eq!(call.to_string(), "Add(Int(2), Int(3))");
    }
}
