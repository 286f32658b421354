//! The auto-vivifying mock node
//!
//! A [`MockNode`] is a handle to one node of a mock tree. The operations a
//! dynamic proxy would intercept are explicit methods here:
//!
//! | Operation   | Method                           |
//! |-------------|----------------------------------|
//! | read        | [`MockNode::get`]                |
//! | write       | [`MockNode::set`]                |
//! | delete      | [`MockNode::delete`]             |
//! | invoke      | [`MockNode::call`], [`MockNode::call_with`] |
//! | membership  | [`MockNode::has`]                |
//!
//! Each member key is in exactly one of three states, see [`KeyState`].
//!
//! ## Re-entrancy
//!
//! No borrow of a node is held while a seed function runs. A seed may call
//! its own node again, read its meta-key or rewrite members.

use crate::key::Key;
use crate::meta::{CallRecord, MockMeta};
use crate::options::{MockOptions, ScopeBinding};
use crate::result::{MockError, MockResult};
use crate::value::{Callable, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// State of a member key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    /// Never touched; the next read creates a child
    Unset,
    /// Holds a child node or a primitive
    Present,
    /// Explicitly deleted; reads yield undefined until the next write
    Deleted,
}

/// Content of a member, resolved once when the member is written
#[derive(Debug, Clone)]
enum Slot {
    /// Stored verbatim
    Primitive(Value),
    /// Child node wrapping a mapping, sequence, callable or node
    Child(MockNode),
    /// Tombstone left by a delete
    Deleted,
}

impl Slot {
    /// An assigned node becomes a fresh child delegating invocations to it,
    /// so every child has exactly one parent.
    fn wrap(value: Value, options: &Rc<MockOptions>) -> Self {
        match value {
            Value::Mock(assigned) => Self::Child(MockNode::delegating(assigned, options)),
            value => match MockNode::wrap(value, options) {
                Value::Mock(node) => Self::Child(node),
                primitive => Self::Primitive(primitive),
            },
        }
    }
}

/// Outcome of ensure-key resolution
enum Resolved {
    Present(Value),
    Deleted,
}

struct NodeState {
    seed: Callable,
    members: BTreeMap<Key, Slot>,
    calls: Vec<CallRecord>,
    return_override: Option<Value>,
    options: Rc<MockOptions>,
}

/// Handle to a node of a mock tree
///
/// Clones are handles to the same node; compare identity with
/// [`MockNode::ptr_eq`]. A handle read from a parent also remembers that
/// parent as its calling context (see [`ScopeBinding`]).
///
/// Nodes are single-threaded (`!Send`, `!Sync`).
#[derive(Clone)]
pub struct MockNode {
    inner: Rc<RefCell<NodeState>>,
    bound: Option<Weak<RefCell<NodeState>>>,
}

/// Non-owning handle to a node
#[derive(Debug, Clone)]
pub(crate) struct WeakNode(Weak<RefCell<NodeState>>);

impl WeakNode {
    pub(crate) fn upgrade(&self) -> Option<MockNode> {
        self.0.upgrade().map(|inner| MockNode { inner, bound: None })
    }
}

impl fmt::Debug for MockNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(state) => f
                .debug_struct("MockNode")
                .field("keys", &state.members.keys().collect::<Vec<_>>())
                .field("calls", &state.calls.len())
                .field("has_return_override", &state.return_override.is_some())
                .finish(),
            Err(_) => f.write_str("MockNode(<borrowed>)"),
        }
    }
}

impl Default for MockNode {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNode {
    /// Create a bare node with default options
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(MockOptions::default())
    }

    /// Create a bare node
    #[must_use]
    pub fn with_options(options: MockOptions) -> Self {
        Self::bare(Rc::new(options))
    }

    /// Create a node whose invocations run `seed`
    #[must_use]
    pub fn from_callable(seed: Callable, options: MockOptions) -> Self {
        Self::from_parts(seed, BTreeMap::new(), Rc::new(options))
    }

    pub(crate) fn bare(options: Rc<MockOptions>) -> Self {
        Self::from_parts(Callable::noop(), BTreeMap::new(), options)
    }

    fn from_parts(seed: Callable, members: BTreeMap<Key, Slot>, options: Rc<MockOptions>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(NodeState {
                seed,
                members,
                calls: Vec::new(),
                return_override: None,
                options,
            })),
            bound: None,
        }
    }

    fn delegating(assigned: Self, options: &Rc<MockOptions>) -> Self {
        let target = assigned.unbound();
        let seed = Callable::new(move |scope, args| target.call_with(scope.clone(), args.to_vec()));
        Self::from_parts(seed, BTreeMap::new(), Rc::clone(options))
    }

    /// Wrap a value under the given options.
    ///
    /// Sequences, mappings and functions become nodes (recursively), an
    /// existing node is kept as is at the top level and delegated to when
    /// nested, everything else comes back unchanged.
    pub(crate) fn wrap(value: Value, options: &Rc<MockOptions>) -> Value {
        match value {
            Value::Array(items) => {
                let members = items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| (Key::Index(i), Slot::wrap(item, options)))
                    .collect();
                Value::Mock(Self::from_parts(Callable::noop(), members, Rc::clone(options)))
            }
            Value::Object(entries) => {
                let members = entries
                    .into_iter()
                    .map(|(k, v)| (Key::from(k), Slot::wrap(v, options)))
                    .collect();
                Value::Mock(Self::from_parts(Callable::noop(), members, Rc::clone(options)))
            }
            Value::Function(seed) => {
                Value::Mock(Self::from_parts(seed, BTreeMap::new(), Rc::clone(options)))
            }
            other => other,
        }
    }

    /// Whether both handles refer to the same node
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> WeakNode {
        WeakNode(Rc::downgrade(&self.inner))
    }

    /// Options shared by this node's tree
    #[must_use]
    pub fn options(&self) -> MockOptions {
        MockOptions::clone(&self.inner.borrow().options)
    }

    /// Introspection API of this node
    ///
    /// Same handle `get(meta_key)` returns.
    #[must_use]
    pub fn meta(&self) -> MockMeta {
        MockMeta::new(self.unbound())
    }

    /// Read a member
    ///
    /// The meta-key yields [`Value::Meta`]. Otherwise: a present member is
    /// returned as stored, a deleted one yields [`Value::Undefined`], and an
    /// unset one is created as a bare child, stored, and returned. Reading
    /// the same key again returns the same child.
    pub fn get(&self, key: impl Into<Key>) -> Value {
        let key = key.into();
        if self.is_meta_key(&key) {
            return Value::Meta(self.meta());
        }
        match self.ensure_key(key) {
            Resolved::Present(value) => value,
            Resolved::Deleted => Value::Undefined,
        }
    }

    /// Write a member
    ///
    /// Primitives are stored verbatim. Sequences, mappings and functions are
    /// wrapped into a new child node. A node is wrapped too: the new child
    /// forwards its invocations to it, so both record the call, but members
    /// are not shared. Clears a deleted mark.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) {
        let key = key.into();
        let slot = {
            let options = Rc::clone(&self.inner.borrow().options);
            Slot::wrap(value.into(), &options)
        };
        tracing::trace!(key = %key, child = matches!(slot, Slot::Child(_)), "assigned member");
        let _previous = self.inner.borrow_mut().members.insert(key, slot);
    }

    /// Delete a member
    ///
    /// Later reads yield undefined and do not re-create the member until it
    /// is written again. Deleting twice, or deleting an unset key, is fine.
    pub fn delete(&self, key: impl Into<Key>) {
        let key = key.into();
        tracing::debug!(key = %key, "deleted member");
        let _previous = self.inner.borrow_mut().members.insert(key, Slot::Deleted);
    }

    /// Membership test
    ///
    /// Resolves like a read, so an unset key is created and reported
    /// present. A deleted key reports absent.
    pub fn has(&self, key: impl Into<Key>) -> bool {
        matches!(self.ensure_key(key.into()), Resolved::Present(_))
    }

    /// State of a member, without creating it
    #[must_use]
    pub fn key_state(&self, key: impl Into<Key>) -> KeyState {
        let key: Key = key.into();
        match self.inner.borrow().members.get(&key) {
            None => KeyState::Unset,
            Some(Slot::Deleted) => KeyState::Deleted,
            Some(Slot::Primitive(_) | Slot::Child(_)) => KeyState::Present,
        }
    }

    /// Present member keys in key order, indices first
    #[must_use]
    pub fn keys(&self) -> Vec<Key> {
        self.inner
            .borrow()
            .members
            .iter()
            .filter(|(_, slot)| !matches!(slot, Slot::Deleted))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Read a member that must be a node
    ///
    /// Resolves like [`MockNode::get`], including creating unset members,
    /// but fails instead of returning a non-node.
    pub fn child(&self, key: impl Into<Key>) -> MockResult<Self> {
        let key = key.into();
        if self.is_meta_key(&key) {
            return Err(MockError::MetaKey { key });
        }
        match self.ensure_key(key.clone()) {
            Resolved::Present(Value::Mock(node)) => Ok(node),
            Resolved::Present(other) => Err(MockError::NotANode {
                key,
                found: other.kind(),
            }),
            Resolved::Deleted => Err(MockError::Deleted { key }),
        }
    }

    /// Follow a chain of members, creating unset ones along the way
    pub fn path<I>(&self, keys: I) -> MockResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<Key>,
    {
        keys.into_iter()
            .try_fold(self.clone(), |node, key| node.child(key))
    }

    /// Invoke the node with its bound calling context
    ///
    /// The scope is the parent this handle was read from under
    /// [`ScopeBinding::Parent`], undefined otherwise.
    pub fn call<I>(&self, args: I) -> Value
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.call_with(self.bound_scope(), args)
    }

    /// Invoke the node with an explicit calling context
    ///
    /// The call is recorded first. With a return override set, the override
    /// is returned and the seed does not run. Otherwise the seed runs with
    /// `scope` and the arguments and its result is returned unchanged.
    pub fn call_with<I>(&self, scope: Value, args: I) -> Value
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let arguments: Vec<Value> = args.into_iter().map(Into::into).collect();
        let (seed, return_override) = {
            let mut state = self.inner.borrow_mut();
            state
                .calls
                .push(CallRecord::new(scope.clone(), arguments.clone()));
            tracing::trace!(
                node = ?Rc::as_ptr(&self.inner),
                args = arguments.len(),
                calls = state.calls.len(),
                "recorded call"
            );
            (state.seed.clone(), state.return_override.clone())
        };
        match return_override {
            Some(value) => value,
            None => seed.invoke(&scope, &arguments),
        }
    }

    pub(crate) fn with_calls<R>(&self, f: impl FnOnce(&[CallRecord]) -> R) -> R {
        f(&self.inner.borrow().calls)
    }

    pub(crate) fn set_return_override(&self, value: Value) {
        tracing::trace!(value = value.kind(), "set return override");
        self.inner.borrow_mut().return_override = Some(value);
    }

    fn is_meta_key(&self, key: &Key) -> bool {
        *key == self.inner.borrow().options.meta_key()
    }

    fn ensure_key(&self, key: Key) -> Resolved {
        let mut state = self.inner.borrow_mut();
        let slot = match state.members.get(&key) {
            Some(Slot::Primitive(value)) => return Resolved::Present(value.clone()),
            Some(Slot::Deleted) => return Resolved::Deleted,
            Some(Slot::Child(node)) => node.clone(),
            None => {
                let child = Self::bare(Rc::clone(&state.options));
                tracing::trace!(key = %key, "auto-vivified member");
                state.members.insert(key, Slot::Child(child.clone()));
                child
            }
        };
        let binding = state.options.scope_binding;
        drop(state);
        Resolved::Present(Value::Mock(self.bind(slot, binding)))
    }

    fn bind(&self, child: Self, binding: ScopeBinding) -> Self {
        Self {
            inner: child.inner,
            bound: match binding {
                ScopeBinding::Parent => Some(Rc::downgrade(&self.inner)),
                ScopeBinding::Detached => None,
            },
        }
    }

    fn unbound(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            bound: None,
        }
    }

    fn bound_scope(&self) -> Value {
        self.bound
            .as_ref()
            .and_then(Weak::upgrade)
            .map_or(Value::Undefined, |inner| {
                Value::Mock(Self { inner, bound: None })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use std::cell::Cell;

    #[test]
    fn test_unset_read_vivifies_once() {
        let m = MockNode::new();
        assert_eq!(m.key_state("a"), KeyState::Unset);
        let first = m.child("a").unwrap();
        let second = m.child("a").unwrap();
        assert!(first.ptr_eq(&second));
        assert_eq!(m.key_state("a"), KeyState::Present);
        assert_eq!(m.keys(), vec![Key::from("a")]);
    }

    #[test]
    fn test_deleted_read_is_undefined_without_mutation() {
        let m = MockNode::new();
        m.delete("gone");
        assert_eq!(m.get("gone"), Value::Undefined);
        assert_eq!(m.key_state("gone"), KeyState::Deleted);
        assert!(m.keys().is_empty());
    }

    #[test]
    fn test_delete_drops_existing_child() {
        let m = MockNode::new();
        let child = m.child("a").unwrap();
        m.delete("a");
        assert_eq!(m.get("a"), Value::Undefined);
        assert_eq!(Rc::strong_count(&child.inner), 1);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let m = MockNode::new();
        m.delete("a");
        m.delete("a");
        assert_eq!(m.key_state("a"), KeyState::Deleted);
    }

    #[test]
    fn test_set_clears_deleted_mark() {
        let m = MockNode::new();
        m.delete("a");
        m.set("a", 5);
        assert_eq!(m.key_state("a"), KeyState::Present);
        assert_eq!(m.get("a"), Value::from(5));
    }

    #[test]
    fn test_primitives_stored_verbatim_including_falsy() {
        let m = MockNode::new();
        m.set("zero", 0);
        m.set("empty", "");
        m.set("no", false);
        m.set("nothing", Value::Null);
        m.set("undef", Value::Undefined);
        assert_eq!(m.get("zero"), Value::from(0));
        assert_eq!(m.get("empty"), Value::from(""));
        assert_eq!(m.get("no"), Value::from(false));
        assert_eq!(m.get("nothing"), Value::Null);
        assert_eq!(m.get("undef"), Value::Undefined);
        assert!(m.has("undef"));
    }

    #[test]
    fn test_set_function_wraps_into_node() {
        let m = MockNode::new();
        m.set("double", Value::function(|_, args| {
            Value::from(args[0].as_f64().unwrap_or_default() * 2.0)
        }));
        let double = m.child("double").unwrap();
        assert_eq!(double.call(args![21]), Value::from(42.0));
        double.meta().assert_called_once_with(args![21]);
    }

    #[test]
    fn test_set_existing_node_wraps_and_delegates() {
        let m = MockNode::new();
        let assigned = MockNode::new();
        assigned.meta().return_value("from assigned");
        m.set("a", &assigned);

        let stored = m.child("a").unwrap();
        assert!(!stored.ptr_eq(&assigned));
        assert_eq!(stored.call(args![7]), Value::from("from assigned"));
        stored.meta().assert_called_once_with(args![7]);
        assigned.meta().assert_called_once_with(args![7]);
        assert_eq!(assigned.meta().last_call().unwrap().scope(), Value::from(&m));
    }

    #[test]
    fn test_set_existing_child_elsewhere_keeps_single_parent() {
        let m = MockNode::new();
        let a = m.child("a").unwrap();
        a.set("leaf", 1);
        m.set("b", &a);
        let b = m.child("b").unwrap();
        assert!(!b.ptr_eq(&a));
        assert_eq!(b.key_state("leaf"), KeyState::Unset);
        m.delete("a");
        drop(a);
        b.call(args![]);
        assert_eq!(b.meta().call_count(), 1);
    }

    #[test]
    fn test_called_path_is_freed_with_its_root() {
        let m = MockNode::new();
        let y = Rc::downgrade(&m.path(["x", "y"]).unwrap().inner);
        m.path(["x", "y", "z"]).unwrap().call(args!["p", "q"]);
        drop(m);
        assert!(y.upgrade().is_none());
    }

    #[test]
    fn test_scope_reads_undefined_once_parent_dropped() {
        let m = MockNode::new();
        let z = m.path(["x", "y", "z"]).unwrap();
        z.call(args![]);
        assert!(matches!(z.meta().last_call().unwrap().scope(), Value::Mock(_)));
        drop(m);
        assert_eq!(z.meta().last_call().unwrap().scope(), Value::Undefined);
    }

    #[test]
    fn test_meta_key_precedes_members() {
        let m = MockNode::new();
        m.set("mock", "shadowed");
        assert!(matches!(m.get("mock"), Value::Meta(_)));
        assert!(matches!(
            m.child("mock"),
            Err(MockError::MetaKey { .. })
        ));
    }

    #[test]
    fn test_has_vivifies_and_respects_deletion() {
        let m = MockNode::new();
        assert!(m.has("probe"));
        assert_eq!(m.key_state("probe"), KeyState::Present);
        m.delete("probe");
        assert!(!m.has("probe"));
        assert_eq!(m.key_state("probe"), KeyState::Deleted);
    }

    #[test]
    fn test_child_errors() {
        let m = MockNode::new();
        m.set("name", "x");
        m.delete("gone");
        assert!(matches!(
            m.child("name"),
            Err(MockError::NotANode { found: "string", .. })
        ));
        assert!(matches!(m.child("gone"), Err(MockError::Deleted { .. })));
    }

    #[test]
    fn test_path_creates_intermediate_nodes() {
        let m = MockNode::new();
        let z = m.path(["x", "y", "z"]).unwrap();
        assert!(z.ptr_eq(&m.child("x").unwrap().child("y").unwrap().child("z").unwrap()));
    }

    #[test]
    fn test_bare_call_returns_undefined() {
        let m = MockNode::new();
        assert_eq!(m.call(args![1, 2]), Value::Undefined);
    }

    #[test]
    fn test_override_skips_seed() {
        let ran = Rc::new(Cell::new(false));
        let seen = Rc::clone(&ran);
        let m = MockNode::from_callable(
            Callable::new(move |_, _| {
                seen.set(true);
                Value::from("seed")
            }),
            MockOptions::default(),
        );
        m.meta().return_value("override");
        assert_eq!(m.call(args!["ignored"]), Value::from("override"));
        assert!(!ran.get());
        m.meta().assert_call_count(1);
    }

    #[test]
    fn test_reentrant_seed_sees_its_own_call() {
        let m = MockNode::new();
        let inner = m.unbound();
        let observed = Rc::new(Cell::new(0));
        let out = Rc::clone(&observed);
        m.set("probe", Value::function(move |_, _| {
            out.set(inner.child("probe").map_or(0, |p| p.meta().call_count()));
            Value::Undefined
        }));
        m.child("probe").unwrap().call(args![]);
        assert_eq!(observed.get(), 1);
    }

    #[test]
    fn test_parent_binding_scope() {
        let m = MockNode::new();
        let a = m.child("a").unwrap();
        a.call(args![]);
        let call = a.meta().last_call().unwrap();
        assert_eq!(call.scope(), Value::from(&m));
    }

    #[test]
    fn test_detached_binding_scope() {
        let m = MockNode::with_options(
            MockOptions::new().with_scope_binding(ScopeBinding::Detached),
        );
        let a = m.child("a").unwrap();
        a.call(args![]);
        assert_eq!(a.meta().last_call().unwrap().scope(), Value::Undefined);
    }

    #[test]
    fn test_root_has_no_bound_scope() {
        let m = MockNode::new();
        m.call(args![]);
        assert_eq!(m.meta().last_call().unwrap().scope(), Value::Undefined);
    }

    #[test]
    fn test_explicit_scope_wins() {
        let m = MockNode::new();
        let a = m.child("a").unwrap();
        a.call_with(Value::from("ctx"), args![]);
        assert_eq!(a.meta().last_call().unwrap().scope(), Value::from("ctx"));
    }

    #[derive(Clone, Default)]
    struct CapturedLog(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLog {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_call_trace_identifies_node_and_arguments() {
        let log = CapturedLog::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(log.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            MockNode::new().call(args![1, 2]);
        });
        let out = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("recorded call"));
        assert!(out.contains("node=0x"));
        assert!(out.contains("args=2"));
    }

    #[test]
    fn test_debug_lists_keys_and_calls() {
        let m = MockNode::new();
        m.set("a", 1);
        m.call(args![]);
        let debug = format!("{m:?}");
        assert!(debug.contains("Name(\"a\")"));
        assert!(debug.contains("calls: 1"));
    }

    #[test]
    fn test_children_share_root_options() {
        let m = MockNode::with_options(MockOptions::new().with_meta_key("spy"));
        let deep = m.path(["a", "b"]).unwrap();
        assert_eq!(deep.options().meta_key, "spy");
        assert!(matches!(deep.get("spy"), Value::Meta(_)));
        assert!(matches!(deep.get("mock"), Value::Mock(_)));
    }
}
