//! magic-mock: Auto-Vivifying Test Doubles
//!
//! Build a stand-in from nothing, a function, an array or a mapping, then
//! read, write, delete, probe and invoke any member path on it. Every node
//! records its own calls for later assertions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  MockNode (one per member path)                  │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   seed ──────► invoked by call()/call_with() unless overridden   │
//! │   members ───► Key → Primitive | Child(MockNode) | Deleted       │
//! │   calls ─────► CallRecord { scope, arguments }, node-local       │
//! │   meta-key ──► MockMeta { calls, called, return_value, .. }      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use magic_mock::{args, create_mock, Value};
//!
//! let m = create_mock(()).into_mock().unwrap();
//! let z = m.path(["x", "y", "z"]).unwrap();
//! z.call(args!["p", "q"]);
//!
//! let meta = m.path(["x", "y", "z"]).unwrap().meta();
//! assert_eq!(meta.calls()[0].arguments, vec![Value::from("p"), Value::from("q")]);
//! assert!(!m.child("x").unwrap().meta().called());
//! ```

#![warn(missing_docs)]

mod key;
mod meta;
mod node;
mod options;
mod result;
mod value;

pub use key::Key;
pub use meta::{CallRecord, MockMeta};
pub use node::{KeyState, MockNode};
pub use options::{MockOptions, ScopeBinding, DEFAULT_META_KEY};
pub use result::{MockError, MockResult};
pub use value::{Callable, NativeFn, Value};

use std::rc::Rc;

/// Build an argument list from mixed values
///
/// ```rust
/// use magic_mock::{args, Value};
///
/// let a = args!["id", 7, true];
/// assert_eq!(a, vec![Value::from("id"), Value::from(7), Value::from(true)]);
/// assert!(args![].is_empty());
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($arg)),+]
    };
}

/// Create a mock with default options
///
/// See [`create_mock_with`].
pub fn create_mock(seed: impl Into<Value>) -> Value {
    create_mock_with(seed, MockOptions::default())
}

/// Create a mock from an optional seed
///
/// - `()` or [`Value::Undefined`]: a bare node
/// - [`Value::Function`]: a node that runs the function when called
/// - [`Value::Array`] or [`Value::Object`]: a callable node carrying the
///   entries as members, nested containers and functions wrapped recursively
/// - [`Value::Mock`]: that node, unchanged
///
/// Any other seed (numbers, strings, booleans, null) is returned as is and
/// has no mock behavior. This never fails.
pub fn create_mock_with(seed: impl Into<Value>, options: MockOptions) -> Value {
    let options = Rc::new(options);
    match seed.into() {
        Value::Undefined => Value::Mock(MockNode::bare(options)),
        seed => MockNode::wrap(seed, &options),
    }
}
