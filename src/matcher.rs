//! Argument matching for expectations.

use std::fmt;

use crate::Value;

/// Per-argument matcher capability used by predicate-based expectations.
///
/// This is the interop seam for external assertion libraries: anything that
/// can answer "does this value match?" and produce a mismatch reason can
/// drive an expectation. The engine's built-ins are [`eq`], [`any`] and
/// [`predicate`].
///
/// # Example
///
/// ```ignore
/// use understudy::matcher::{eq, any, predicate};
///
/// mock.expect("Store")
///     .matching(vec![
///         eq(Value::Key("user:1".into())),
///         predicate("a non-empty payload", |v| match v {
///             Value::Bytes(b) => !b.is_empty(),
///             _ => false,
///         }),
///     ])
///     .await?;
/// ```
pub trait ArgMatcher<V>: Send + Sync {
    /// Whether the given argument value satisfies this matcher.
    fn matches(&self, value: &V) -> bool;

    /// Human-readable description of what this matcher accepts.
    fn describe(&self) -> String;

    /// Mismatch reason for a rejected value, surfaced verbatim in
    /// ordered-mode failure messages.
    fn failure_reason(&self, actual: &V) -> String
    where
        V: fmt::Debug,
    {
        format!("{:?} does not match {}", actual, self.describe())
    }
}

/// Match an argument by exact equality.
pub fn eq<V: Value>(expected: V) -> Box<dyn ArgMatcher<V>> {
    Box::new(EqMatcher { expected })
}

/// Match any argument value.
pub fn any<V: Value>() -> Box<dyn ArgMatcher<V>> {
    Box::new(AnyMatcher)
}

/// Match an argument with a custom predicate.
///
/// The description appears in expectation and failure messages, so phrase
/// it as what the matcher accepts (e.g. `"a positive amount"`).
pub fn predicate<V, F>(description: impl Into<String>, f: F) -> Box<dyn ArgMatcher<V>>
where
    V: Value,
    F: Fn(&V) -> bool + Send + Sync + 'static,
{
    Box::new(PredicateMatcher {
        description: description.into(),
        f,
    })
}

struct EqMatcher<V> {
    expected: V,
}

impl<V: Value> ArgMatcher<V> for EqMatcher<V> {
    fn matches(&self, value: &V) -> bool {
        *value == self.expected
    }

    fn describe(&self) -> String {
        format!("{:?}", self.expected)
    }

    fn failure_reason(&self, actual: &V) -> String {
        format!("expected {:?}, got {:?}", self.expected, actual)
    }
}

struct AnyMatcher;

impl<V: Value> ArgMatcher<V> for AnyMatcher {
    fn matches(&self, _value: &V) -> bool {
        true
    }

    fn describe(&self) -> String {
        "_".to_string()
    }
}

struct PredicateMatcher<F> {
    description: String,
    f: F,
}

impl<V, F> ArgMatcher<V> for PredicateMatcher<F>
where
    V: Value,
    F: Fn(&V) -> bool + Send + Sync + 'static,
{
    fn matches(&self, value: &V) -> bool {
        (self.f)(value)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

/// How an expectation checks the argument list of a candidate call.
pub(crate) enum ArgSpec<V> {
    /// Accept any argument list.
    Any,
    /// Component-wise equality against a fixed argument list.
    Exact(Vec<V>),
    /// One matcher per argument position.
    Matchers(Vec<Box<dyn ArgMatcher<V>>>),
}

/// A rejected argument list, carrying the reason for the mismatch.
pub(crate) struct Mismatch {
    pub(crate) reason: String,
}

impl<V: Value> ArgSpec<V> {
    /// Check an argument list. Arity mismatch is a non-match, not a fault.
    pub(crate) fn check(&self, args: &[V]) -> Result<(), Mismatch> {
        match self {
            ArgSpec::Any => Ok(()),
            ArgSpec::Exact(expected) => {
                if expected.len() != args.len() {
                    return Err(Mismatch {
                        reason: format!(
                            "expected {} arguments, got {}",
                            expected.len(),
                            args.len()
                        ),
                    });
                }
                for (i, (want, got)) in expected.iter().zip(args).enumerate() {
                    if want != got {
                        return Err(Mismatch {
                            reason: format!("argument {i}: expected {want:?}, got {got:?}"),
                        });
                    }
                }
                Ok(())
            }
            ArgSpec::Matchers(matchers) => {
                if matchers.len() != args.len() {
                    return Err(Mismatch {
                        reason: format!(
                            "expected {} arguments, got {}",
                            matchers.len(),
                            args.len()
                        ),
                    });
                }
                for (i, (matcher, got)) in matchers.iter().zip(args).enumerate() {
                    if !matcher.matches(got) {
                        return Err(Mismatch {
                            reason: format!("argument {i}: {}", matcher.failure_reason(got)),
                        });
                    }
                }
                Ok(())
            }
        }
    }

    /// Render the expected argument list for messages, e.g. `(Int(2), _)`.
    pub(crate) fn describe(&self) -> String {
        match self {
            ArgSpec::Any => "(..)".to_string(),
            ArgSpec::Exact(expected) => {
                let parts: Vec<String> = expected.iter().map(|v| format!("{v:?}")).collect();
                format!("({})", parts.join(", "))
            }
            ArgSpec::Matchers(matchers) => {
                let parts: Vec<String> = matchers.iter().map(|m| m.describe()).collect();
                format!("({})", parts.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    enum TestValue {
        Int(i64),
        Text(String),
    }
    impl Value for TestValue {}

    #[test]
    fn eq_matches_equal_values() {
        let m = eq(TestValue::Int(5));
        assert!(m.matches(&TestValue::Int(5)));
        assert!(!m.matches(&TestValue::Int(6)));
        assert_eq!(
            m.failure_reason(&TestValue::Int(6)),
            "expected Int(5), got Int(6)"
        );
    }

    #[test]
    fn any_matches_everything() {
        let m = any::<TestValue>();
        assert!(m.matches(&TestValue::Int(0)));
        assert!(m.matches(&TestValue::Text("x".into())));
    }

    #[test]
    fn predicate_reports_its_description() {
        let m = predicate("a positive amount", |v| matches!(v, TestValue::Int(n) if *n > 0));
        assert!(m.matches(&TestValue::Int(1)));
        assert!(!m.matches(&TestValue::Int(-1)));
        assert_eq!(
            m.failure_reason(&TestValue::Int(-1)),
            "Int(-1) does not match a positive amount"
        );
    }

    #[test]
    fn exact_spec_arity_mismatch_is_a_non_match() {
        let spec = ArgSpec::Exact(vec![TestValue::Int(2), TestValue::Int(3)]);
        let err = spec.check(&[TestValue::Int(2)]).unwrap_err();
        assert_eq!(err.reason, "expected 2 arguments, got 1");
    }

    #[test]
    fn exact_spec_names_the_offending_position() {
        let spec = ArgSpec::Exact(vec![TestValue::Int(2), TestValue::Int(3)]);
        let err = spec
            .check(&[TestValue::Int(2), TestValue::Int(4)])
            .unwrap_err();
        assert_eq!(err.reason, "argument 1: expected Int(3), got Int(4)");
    }

    #[test]
    fn matcher_spec_surfaces_reason_verbatim() {
        let spec = ArgSpec::Matchers(vec![predicate("an even number", |v| {
            matches!(v, TestValue::Int(n) if n % 2 == 0)
        })]);
        let err = spec.check(&[TestValue::Int(3)]).unwrap_err();
        assert_eq!(
            err.reason,
            "argument 0: Int(3) does not match an even number"
        );
    }

    #[test]
    fn spec_descriptions_render_like_call_sites() {
        assert_eq!(ArgSpec::<TestValue>::Any.describe(), "(..)");
        assert_eq!(
            ArgSpec::Exact(vec![TestValue::Int(2), TestValue::Int(3)]).describe(),
            "(Int(2), Int(3))"
        );
        assert_eq!(
            ArgSpec::Matchers(vec![eq(TestValue::Int(2)), any()]).describe(),
            "(Int(2), _)"
        );
    }
}
