use std::fmt;

/// Marker trait for the opaque argument and return values carried by calls.
///
/// Implement this for your value type (often an enum covering the argument
/// and return types of the mocked capability). Values must be
/// `Clone + Debug + PartialEq + Send + Sync + 'static` because they:
/// - Are compared component-wise by exact-match expectations (`PartialEq`)
/// - Appear in failure messages naming expected vs. actual calls (`Debug`)
/// - Cross task boundaries inside calls and outcomes (`Send`, `'static`)
/// - Are shared between the test script and producer tasks (`Sync`, `Clone`)
///
/// Binding generators typically emit one value enum per capability; for
/// hand-written tests a small enum is enough:
///
/// # Example
///
/// ```rust
/// use understudy::Value;
///
/// #[derive(Clone, Debug, PartialEq)]
/// enum CalcValue {
///     Int(i64),
///     Text(String),
/// }
///
/// impl Value for CalcValue {}
/// ```
pub trait Value: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {}
