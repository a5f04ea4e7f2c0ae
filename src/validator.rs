use std::fmt;

use crate::{Call, MemberName, Value};

type Predicate<V> = Box<dyn Fn(&Call<V>) -> bool + Send>;

/// Predicate over candidate calls, used by
/// [`Dispatcher::get_call`](crate::Dispatcher::get_call) to decide which
/// call a consumer claims.
///
/// The description is what failure messages name when no matching call
/// arrives in time, so phrase it as the call being waited for (e.g.
/// `"Add(Int(2), Int(3))"`). The expectation façade builds validators
/// automatically; construct one directly only when driving the dispatcher
/// yourself.
///
/// # Example
///
/// ```ignore
/// let validator = CallValidator::new("a Flush call with no arguments", |call| {
///     call.member().as_str() == "Flush" && call.args().is_empty()
/// });
/// let call = dispatcher.get_call(Some(timeout), validator).await?;
/// ```
pub struct CallValidator<V> {
    description: String,
    predicate: Predicate<V>,
}

impl<V: Value> CallValidator<V> {
    /// Build a validator from a description and a predicate.
    pub fn new<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Call<V>) -> bool + Send + 'static,
    {
        Self {
            description: description.into(),
            predicate: Box::new(predicate),
        }
    }

    /// Accept any call.
    pub fn any() -> Self {
        Self::new("any call", |_| true)
    }

    /// Accept any call to the given member, regardless of arguments.
    pub fn member(name: impl Into<MemberName>) -> Self {
        let name = name.into();
        Self::new(format!("{name}(..)"), move |call| *call.member() == name)
    }

    /// Whether the given call satisfies this validator.
    #[inline]
    pub fn accepts(&self, call: &Call<V>) -> bool {
        (self.predicate)(call)
    }

    /// The human-readable description of the call being waited for.
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl<V> fmt::Debug for CallValidator<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallValidator")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}
