//! Introspection API reached through the meta-key
//!
//! Every node answers the meta-key with a [`MockMeta`] handle over its own
//! call history and return override. Nothing here is shared between nodes:
//! the calls of `m.a` never show up on `m` or on `m.a.b`.

use crate::node::{MockNode, WeakNode};
use crate::value::Value;
use std::fmt;

/// Calling context as kept in a record
///
/// A node scope is held weakly: the record of `m.a.b(..)` must not keep `m.a`
/// alive, since `m.a` already owns `m.a.b`.
#[derive(Debug, Clone)]
enum RecordedScope {
    Value(Value),
    Node(WeakNode),
}

/// One recorded invocation
#[derive(Debug, Clone)]
pub struct CallRecord {
    scope: RecordedScope,
    /// Positional arguments, in order
    pub arguments: Vec<Value>,
}

impl PartialEq for CallRecord {
    fn eq(&self, other: &Self) -> bool {
        self.scope() == other.scope() && self.arguments == other.arguments
    }
}

impl CallRecord {
    /// Create a call record
    ///
    /// A [`Value::Mock`] scope is not owned by the record.
    #[must_use]
    pub fn new(scope: Value, arguments: Vec<Value>) -> Self {
        let scope = match scope {
            Value::Mock(node) => RecordedScope::Node(node.downgrade()),
            other => RecordedScope::Value(other),
        };
        Self { scope, arguments }
    }

    /// Calling context the node was invoked with
    ///
    /// A node scope that has since been dropped reads as
    /// [`Value::Undefined`].
    #[must_use]
    pub fn scope(&self) -> Value {
        match &self.scope {
            RecordedScope::Value(value) => value.clone(),
            RecordedScope::Node(weak) => weak.upgrade().map_or(Value::Undefined, Value::Mock),
        }
    }

    /// Argument at a position
    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.arguments.get(index)
    }
}

/// Introspection handle for one node
///
/// Cheap to clone. Holds the node alive while it exists.
#[derive(Clone)]
pub struct MockMeta {
    node: MockNode,
}

impl fmt::Debug for MockMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockMeta")
            .field("call_count", &self.call_count())
            .finish()
    }
}

impl MockMeta {
    pub(crate) const fn new(node: MockNode) -> Self {
        Self { node }
    }

    /// The node this handle inspects
    #[must_use]
    pub fn node(&self) -> MockNode {
        self.node.clone()
    }

    /// Whether both handles inspect the same node
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.node.ptr_eq(&other.node)
    }

    /// Snapshot of this node's calls, oldest first
    #[must_use]
    pub fn calls(&self) -> Vec<CallRecord> {
        self.node.with_calls(<[CallRecord]>::to_vec)
    }

    /// True iff the node was invoked at least once
    #[must_use]
    pub fn called(&self) -> bool {
        self.call_count() > 0
    }

    /// Number of recorded calls
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.node.with_calls(<[CallRecord]>::len)
    }

    /// Call record at a position
    #[must_use]
    pub fn call(&self, index: usize) -> Option<CallRecord> {
        self.node.with_calls(|calls| calls.get(index).cloned())
    }

    /// Most recent call record
    #[must_use]
    pub fn last_call(&self) -> Option<CallRecord> {
        self.node.with_calls(|calls| calls.last().cloned())
    }

    /// Make every later invocation return `value` verbatim
    ///
    /// Replaces any earlier override. There is no way to clear it.
    pub fn return_value(&self, value: impl Into<Value>) {
        self.node.set_return_override(value.into());
    }

    /// Assert at least one call was recorded
    ///
    /// # Panics
    ///
    /// Panics if the node was never called.
    pub fn assert_called(&self) {
        assert!(self.called(), "Expected mock to have been called, but it was not");
    }

    /// Assert no call was recorded
    ///
    /// # Panics
    ///
    /// Panics if the node was called.
    pub fn assert_not_called(&self) {
        let count = self.call_count();
        assert!(
            count == 0,
            "Expected mock not to have been called, but it was called {} time(s)",
            count
        );
    }

    /// Assert an exact number of calls
    ///
    /// # Panics
    ///
    /// Panics if the count differs.
    pub fn assert_call_count(&self, expected: usize) {
        let actual = self.call_count();
        assert_eq!(
            actual, expected,
            "Expected mock to have been called {} time(s), got {}",
            expected, actual
        );
    }

    /// Assert the most recent call had exactly these arguments
    ///
    /// # Panics
    ///
    /// Panics if there was no call or the arguments differ.
    pub fn assert_called_with<I>(&self, expected: I)
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let expected: Vec<Value> = expected.into_iter().map(Into::into).collect();
        match self.last_call() {
            Some(call) => assert_eq!(
                call.arguments, expected,
                "Last call arguments mismatch: expected {:?}, got {:?}",
                expected, call.arguments
            ),
            None => panic!("Expected mock to have been called with {expected:?}, but it was not called"),
        }
    }

    /// Assert exactly one call, with exactly these arguments
    ///
    /// # Panics
    ///
    /// Panics if the count is not one or the arguments differ.
    pub fn assert_called_once_with<I>(&self, expected: I)
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.assert_call_count(1);
        self.assert_called_with(expected);
    }

    /// Assert some call, not necessarily the last, had these arguments
    ///
    /// # Panics
    ///
    /// Panics if no recorded call matches.
    pub fn assert_any_call<I>(&self, expected: I)
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let expected: Vec<Value> = expected.into_iter().map(Into::into).collect();
        let found = self
            .node
            .with_calls(|calls| calls.iter().any(|call| call.arguments == expected));
        assert!(found, "No call matched arguments {:?}", expected);
    }
}
