use std::{hash::Hash, sync::Arc};

/// Name of one capability member, the identity half of a [`Call`](crate::Call).
///
/// A dispatcher serves one abstracted capability; `MemberName` identifies
/// which of its members a producer invoked. Use it to:
///
/// - Name the member when submitting calls from a stand-in implementation
/// - Address expectations on the test side ([`Mock::expect`](crate::Mock::expect))
/// - Read the identity of a claimed call ([`CallGuard::member`](crate::CallGuard::member))
///
/// `MemberName` is cheap to clone. Equality uses string comparison with a
/// fast path for pointer equality when names share the same allocation.
#[derive(Debug, Clone, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemberName(Arc<str>);

impl MemberName {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// Returns the string representation of this member name.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for MemberName {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for MemberName {}

impl std::fmt::Display for MemberName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Hash for MemberName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl From<&str> for MemberName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for MemberName {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}
