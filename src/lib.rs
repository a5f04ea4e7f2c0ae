#![cfg_attr(docsrs, feature(doc_cfg))]
//! # Understudy
//!
//! A rendezvous mock engine for Tokio.
//!
//! Understudy lets a test script observe and answer calls made by code
//! under test to its abstracted dependencies while that code runs
//! concurrently with the test. Producer tasks submit calls into a
//! per-capability [`Dispatcher`]; the test claims them (in strict order or
//! order-independently), inspects the arguments, injects an outcome, and
//! the blocked producer resumes. The engine guarantees exactly-once
//! delivery, deterministic first-eligible-wins matching, and timeout-safe
//! teardown: no call is lost, no outcome is delivered twice, and no wait
//! outlives its deadline.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use understudy::{Mock, Value};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! enum CalcValue {
//!     Int(i64),
//! }
//! impl Value for CalcValue {}
//!
//! #[tokio::main]
//! async fn main() -> understudy::Result {
//!     let mock = Mock::<CalcValue>::new();
//!     let calc = mock.caller();
//!
//!     // The code under test runs concurrently and calls into the mock.
//!     let under_test = tokio::spawn(async move {
//!         calc.invoke("Add", vec![CalcValue::Int(2), CalcValue::Int(3)]).await
//!     });
//!
//!     // The test claims the call, inspects it, and answers.
//!     let call = mock.expect("Add").args([CalcValue::Int(2), CalcValue::Int(3)]).await?;
//!     call.ret([CalcValue::Int(5)])?;
//!
//!     assert_eq!(under_test.await.unwrap()?, vec![CalcValue::Int(5)]);
//!     mock.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Core Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Value`] | Marker trait for the opaque argument/return values |
//! | [`Mock`] | Test-facing surface: expectations and teardown for one capability |
//! | [`CallerHandle`] | Producer-side handle: `submit` / `invoke` |
//! | [`Call`] | One recorded invocation, pending a response |
//! | [`Outcome`] | The answer: `Return(values)` or `Abort(value)` |
//! | [`CallGuard`] | A claimed call: inspect args, then `ret` or `abort` once |
//! | [`Dispatcher`] | The per-capability rendezvous engine under the façade |
//! | [`CallValidator`] | Predicate deciding which call a consumer claims |
//! | [`Invocation`] | Outcome tracker for the code under test itself |
//!
//! ## Ordered vs. Eventually
//!
//! [`Mock::expect`] consumes in strict order: if the next capability call
//! is not the expected one, the expectation fails immediately, naming both
//! the expected and the actual call. [`Mock::eventually`] is
//! order-independent: non-matching calls stay queued for later
//! expectations, which is how a test consumes calls in the order it
//! registers expectations regardless of which producer task won the race.
//!
//! ## Abnormal termination
//!
//! Injecting [`Outcome::Abort`] re-raises the value at the producer's call
//! site (as a [`RelayedAbort`] panic payload); the engine is a pure relay
//! and never converts it into a test failure. [`Invocation`] maps the
//! payload back into [`InvocationOutcome::Aborted`] for final assertions.
//!
//! ## Features
//!
//! - **`serde`** - serialization support for call identities and outcomes

mod call;
mod call_id;
mod config;
mod dispatcher;
mod error;
mod expect;
mod guard;
mod handle;
mod invocation;
mod member;
mod mock;
mod outcome;
mod reporter;
mod validator;
mod value;

pub mod matcher;

mod internal;

pub use call::{Call, PendingCall};
pub use call_id::CallId;
pub use config::Config;
pub use dispatcher::Dispatcher;
pub use error::Error;
pub use expect::Expect;
pub use guard::CallGuard;
pub use handle::CallerHandle;
pub use invocation::{AwaitOutcome, Invocation};
pub use matcher::ArgMatcher;
pub use member::MemberName;
pub use mock::Mock;
pub use outcome::{InvocationOutcome, Outcome, RelayedAbort};
pub use reporter::{FailureReporter, LogReporter, PanicReporter};
pub use validator::CallValidator;
pub use value::Value;

/// Convenience alias for `Result<T, understudy::Error>`.
pub type Result<T = ()> = std::result::Result<T, Error>;
