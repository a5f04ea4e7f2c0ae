use std::{
    fmt,
    future::IntoFuture,
    sync::Arc,
    time::Duration,
};

use crate::{
    CallGuard, CallValidator, Error, MemberName, Mock, Result, Value,
    matcher::{ArgMatcher, ArgSpec},
};

/// Which consumption discipline an expectation uses.
pub(crate) enum Mode {
    /// Fail fast if the next capability call is not the expected one.
    Ordered,
    /// Leave non-matching calls queued and wait for a match.
    Eventually,
}

/// A pending expectation on one capability member.
///
/// Created by [`Mock::expect`] (ordered) or [`Mock::eventually`]
/// (order-independent). Configure the argument check and deadline, then
/// `.await` to claim the call:
///
/// ```ignore
/// // Exact arguments, default 1s deadline
/// let call = mock.expect("Add").args([Int(2), Int(3)]).await?;
///
/// // Per-position matchers and a custom deadline
/// let call = mock.eventually("Store")
///     .matching(vec![eq(Int(7)), any()])
///     .within(Duration::from_secs(3))
///     .await?;
/// ```
///
/// With no argument spec, any argument list for the member is accepted.
///
/// In ordered mode, a mismatching next call fails immediately with a
/// message naming the expected and actual call (and the matcher's mismatch
/// reason verbatim); the mismatched call is discarded, unblocking its
/// producer with [`Error::CallDropped`]. In eventually mode, non-matching
/// calls stay in the backlog for later expectations to claim.
pub struct Expect<'a, V: Value> {
    mock: &'a Mock<V>,
    member: MemberName,
    spec: ArgSpec<V>,
    mode: Mode,
    timeout: Option<Duration>,
}

impl<'a, V: Value> Expect<'a, V> {
    pub(crate) fn new(mock: &'a Mock<V>, member: MemberName, mode: Mode) -> Self {
        let timeout = Some(mock.config().default_timeout());
        Self {
            mock,
            member,
            spec: ArgSpec::Any,
            mode,
            timeout,
        }
    }

    /// Require component-wise equality against the given argument list.
    ///
    /// An arity mismatch is a non-match, not a fault.
    pub fn args(mut self, args: impl Into<Vec<V>>) -> Self {
        self.spec = ArgSpec::Exact(args.into());
        self
    }

    /// Require one [`ArgMatcher`] per argument position.
    pub fn matching(mut self, matchers: Vec<Box<dyn ArgMatcher<V>>>) -> Self {
        self.spec = ArgSpec::Matchers(matchers);
        self
    }

    /// Override the default deadline from [`Config`](crate::Config).
    pub fn within(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Wait without a deadline.
    pub fn indefinitely(mut self) -> Self {
        self.timeout = None;
        self
    }

    async fn run(self) -> Result<CallGuard<V>> {
        self.mock.reporter().mark_helper();
        match self.mode {
            Mode::Eventually => self.run_eventually().await,
            Mode::Ordered => self.run_ordered().await,
        }
    }

    async fn run_eventually(self) -> Result<CallGuard<V>> {
        let Expect {
            mock,
            member,
            spec,
            timeout,
            ..
        } = self;
        let spec = Arc::new(spec);
        let expected = format!("{member}{}", spec.describe());
        let validator = matching_validator(expected, member, spec);

        match mock.dispatcher().get_call(timeout, validator).await {
            Ok(call) => Ok(CallGuard::new(call)),
            Err(err) => {
                mock.reporter().fail(&err.to_string());
                Err(err)
            }
        }
    }

    async fn run_ordered(self) -> Result<CallGuard<V>> {
        let Expect {
            mock,
            member,
            spec,
            timeout,
            ..
        } = self;
        let spec = Arc::new(spec);
        let expected = format!("{member}{}", spec.describe());

        // Opt-in grace window: tolerate earlier non-matching traffic for a
        // bounded time, then fall back to fail-fast.
        if let Some(grace) = mock.config().ordered_grace() {
            let validator = matching_validator(expected.clone(), member.clone(), spec.clone());
            match mock.dispatcher().get_call(Some(grace), validator).await {
                Ok(call) => return Ok(CallGuard::new(call)),
                Err(Error::NoMatchingCall { .. }) => {}
                Err(err) => return Err(err),
            }
        }

        // Fail-fast: claim the next capability call unconditionally, then
        // compare it against the expectation.
        let validator = CallValidator::new(expected.clone(), |_| true);
        match mock.dispatcher().get_call(timeout, validator).await {
            Ok(call) => {
                let reason = if *call.member() != member {
                    Some("member mismatch".to_string())
                } else {
                    spec.check(call.args()).err().map(|m| m.reason)
                };
                let Some(reason) = reason else {
                    return Ok(CallGuard::new(call));
                };
                let err = Error::UnexpectedCall {
                    expected,
                    actual: call.to_string(),
                    reason,
                };
                mock.reporter().fail(&err.to_string());
                // `call` drops here unresponded, unblocking its producer
                // with CallDropped; the test is already failing.
                Err(err)
            }
            Err(err @ Error::NoMatchingCall { .. }) => {
                mock.reporter().fail(&err.to_string());
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}

fn matching_validator<V: Value>(
    expected: String,
    member: MemberName,
    spec: Arc<ArgSpec<V>>,
) -> CallValidator<V> {
    CallValidator::new(expected, move |call| {
        *call.member() == member && spec.check(call.args()).is_ok()
    })
}

impl<'a, V: Value> IntoFuture for Expect<'a, V> {
    type Output = Result<CallGuard<V>>;
    type IntoFuture = std::pin::Pin<Box<dyn std::future::Future<Output = Self::Output> + Send + 'a>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.run())
    }
}

impl<V: Value> fmt::Debug for Expect<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expect")
            .field("member", &self.member)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
