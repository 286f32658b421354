//! Member keys
//!
//! A member is addressed either by name or by index. Names that spell a
//! canonical array index are folded into [`Key::Index`], so `"0"` and `0`
//! reach the same member, the way property keys behave on an array.

use std::fmt;

/// Key of a member on a [`MockNode`](crate::MockNode)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    /// Indexed member (`node[3]`)
    Index(usize),
    /// Named member (`node.fetch`)
    Name(String),
}

impl Key {
    /// Create a named key, normalizing canonical indices
    #[must_use]
    pub fn name(name: &str) -> Self {
        parse_index(name).map_or_else(|| Self::Name(name.to_string()), Self::Index)
    }

    /// Create an indexed key
    #[must_use]
    pub const fn index(index: usize) -> Self {
        Self::Index(index)
    }

    /// Index value, if this is an indexed key
    #[must_use]
    pub const fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(i) => Some(*i),
            Self::Name(_) => None,
        }
    }

    /// Name value, if this is a named key
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Index(_) => None,
        }
    }
}

/// Digits only, no sign, no leading zero except for `"0"` itself.
fn parse_index(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    if bytes.len() > 1 && bytes[0] == b'0' {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Self::name(name)
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        match parse_index(&name) {
            Some(i) => Self::Index(i),
            None => Self::Name(name),
        }
    }
}

impl From<&String> for Key {
    fn from(name: &String) -> Self {
        Self::name(name)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}
