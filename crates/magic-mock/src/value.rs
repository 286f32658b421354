//! Values flowing in and out of a mock
//!
//! [`Value`] is the tagged union of everything a test can hand to a mock
//! (seeds, assigned members, call arguments, return overrides) and everything
//! a mock hands back. Whether a value gets wrapped into a child node is decided
//! once, from its tag, at the moment it is stored.

use crate::meta::MockMeta;
use crate::node::MockNode;
use crate::result::MockError;
use std::fmt;
use std::rc::Rc;

/// Signature of a seed function: `(scope, arguments) -> result`
pub type NativeFn = dyn Fn(&Value, &[Value]) -> Value;

/// Shared handle to a seed function
///
/// Clones share the same function; equality is identity.
#[derive(Clone)]
pub struct Callable(Rc<NativeFn>);

impl Callable {
    /// Wrap a closure
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Value + 'static,
    {
        Self(Rc::new(f))
    }

    /// A function that ignores its input and returns undefined
    #[must_use]
    pub fn noop() -> Self {
        Self::new(|_, _| Value::Undefined)
    }

    /// Invoke with a calling context and arguments
    pub fn invoke(&self, scope: &Value, args: &[Value]) -> Value {
        (self.0)(scope, args)
    }

    /// Whether both handles refer to the same function
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callable(..)")
    }
}

/// A value seen by a mock
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value; also what reading a deleted member yields
    #[default]
    Undefined,
    /// Explicit null
    Null,
    /// Boolean
    Bool(bool),
    /// Number
    Number(f64),
    /// String
    String(String),
    /// Indexed sequence; wrapped into a node when stored as a member
    Array(Vec<Value>),
    /// Ordered mapping; wrapped into a node when stored as a member
    Object(Vec<(String, Value)>),
    /// Function; wrapped into a node when stored as a member
    Function(Callable),
    /// A mock node
    Mock(MockNode),
    /// Introspection API of a node, as returned for the meta-key
    Meta(MockMeta),
}

impl Value {
    /// Build an object from key/value pairs, keeping their order
    pub fn object<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Self>,
    {
        Self::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build an array
    pub fn array<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Self>,
    {
        Self::Array(items.into_iter().map(Into::into).collect())
    }

    /// Build a function value from a closure
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&Self, &[Self]) -> Self + 'static,
    {
        Self::Function(Callable::new(f))
    }

    /// Short name of the variant, used in error messages
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Function(_) => "function",
            Self::Mock(_) => "mock",
            Self::Meta(_) => "meta",
        }
    }

    /// Whether this value is stored verbatim rather than wrapped
    ///
    /// [`Value::Meta`] counts as primitive: it is an opaque handle.
    #[must_use]
    pub const fn is_primitive(&self) -> bool {
        !matches!(
            self,
            Self::Array(_) | Self::Object(_) | Self::Function(_) | Self::Mock(_)
        )
    }

    /// Is undefined
    #[must_use]
    pub const fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Borrow as string
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as number
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as boolean
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow as mock node
    #[must_use]
    pub const fn as_mock(&self) -> Option<&MockNode> {
        match self {
            Self::Mock(node) => Some(node),
            _ => None,
        }
    }

    /// Borrow as introspection API
    #[must_use]
    pub const fn as_meta(&self) -> Option<&MockMeta> {
        match self {
            Self::Meta(meta) => Some(meta),
            _ => None,
        }
    }

    /// Take the mock node out, if any
    #[must_use]
    pub fn into_mock(self) -> Option<MockNode> {
        match self {
            Self::Mock(node) => Some(node),
            _ => None,
        }
    }

    /// Take the introspection API out, if any
    #[must_use]
    pub fn into_meta(self) -> Option<MockMeta> {
        match self {
            Self::Meta(meta) => Some(meta),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    /// Structural for data, identity for functions, nodes and meta handles.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            (Self::Mock(a), Self::Mock(b)) => a.ptr_eq(b),
            (Self::Meta(a), Self::Meta(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Self::Undefined
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Self::String(s.clone())
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::array(items)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Undefined, Into::into)
    }
}

impl From<Callable> for Value {
    fn from(f: Callable) -> Self {
        Self::Function(f)
    }
}

impl From<MockNode> for Value {
    fn from(node: MockNode) -> Self {
        Self::Mock(node)
    }
}

impl From<&MockNode> for Value {
    fn from(node: &MockNode) -> Self {
        Self::Mock(node.clone())
    }
}

impl From<MockMeta> for Value {
    fn from(meta: MockMeta) -> Self {
        Self::Meta(meta)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => Self::array(items),
            serde_json::Value::Object(map) => Self::Object(
                map.into_iter().map(|(k, v)| (k, Self::from(v))).collect(),
            ),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = MockError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_f64().ok_or(MockError::TypeMismatch {
            expected: "number",
            found: value.kind(),
        })
    }
}

impl TryFrom<Value> for bool {
    type Error = MockError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_bool().ok_or(MockError::TypeMismatch {
            expected: "boolean",
            found: value.kind(),
        })
    }
}

impl TryFrom<Value> for String {
    type Error = MockError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(MockError::TypeMismatch {
                expected: "string",
                found: other.kind(),
            }),
        }
    }
}

impl TryFrom<Value> for MockNode {
    type Error = MockError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Mock(node) => Ok(node),
            other => Err(MockError::TypeMismatch {
                expected: "mock",
                found: other.kind(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_primitive_classification() {
        assert!(Value::Undefined.is_primitive());
        assert!(Value::Null.is_primitive());
        assert!(Value::from(false).is_primitive());
        assert!(Value::from(0).is_primitive());
        assert!(Value::from("").is_primitive());
        assert!(!Value::array(["a"]).is_primitive());
        assert!(!Value::object([("a", 1)]).is_primitive());
        assert!(!Value::function(|_, _| Value::Null).is_primitive());
        assert!(!Value::from(MockNode::new()).is_primitive());
    }

    #[test]
    fn test_json_conversion_keeps_shape() {
        let value = Value::from(json!({"a": [1, "two", null], "b": true}));
        let Value::Object(entries) = value else {
            panic!("expected object");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0],
            (
                "a".to_string(),
                Value::array([Value::from(1), Value::from("two"), Value::Null])
            )
        );
        assert_eq!(entries[1], ("b".to_string(), Value::Bool(true)));
    }

    #[test]
    fn test_function_equality_is_identity() {
        let f = Callable::new(|_, args| args.first().cloned().unwrap_or_default());
        let g = Callable::new(|_, args| args.first().cloned().unwrap_or_default());
        assert_eq!(Value::from(f.clone()), Value::from(f.clone()));
        assert_ne!(Value::from(f), Value::from(g));
    }

    #[test]
    fn test_mock_equality_is_identity() {
        let a = MockNode::new();
        let b = MockNode::new();
        assert_eq!(Value::from(&a), Value::from(a.clone()));
        assert_ne!(Value::from(&a), Value::from(&b));
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i32>), Value::Undefined);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }

    #[test]
    fn test_try_from_mismatch_reports_kinds() {
        let err = f64::try_from(Value::from("nope")).unwrap_err();
        assert!(matches!(
            err,
            MockError::TypeMismatch {
                expected: "number",
                found: "string"
            }
        ));
        assert_eq!(String::try_from(Value::from("ok")).unwrap(), "ok");
        assert!(bool::try_from(Value::Bool(true)).unwrap());
    }

    #[test]
    fn test_callable_invoke_passes_scope_and_args() {
        let f = Callable::new(|scope, args| {
            Value::from(format!("{}:{}", scope.kind(), args.len()))
        });
        assert_eq!(
            f.invoke(&Value::Null, &[Value::from(1), Value::from(2)]),
            Value::from("null:2")
        );
        assert_eq!(Callable::noop().invoke(&Value::Null, &[]), Value::Undefined);
    }
}
