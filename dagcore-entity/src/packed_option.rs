//! An `Option<K>` that costs no more than `K` itself, for entity handles
//! that can reserve one value to mean "none".

use crate::ReservedValue;
use core::fmt;

/// Like `Option<K>`, but represented as a single `K` using its reserved
/// sentinel value for `None`. Useful when `K` appears in large, hot
/// arrays and the extra discriminant byte of a real `Option<K>` would
/// be wasteful.
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PackedOption<K: ReservedValue>(K);

impl<K: ReservedValue> PackedOption<K> {
    /// Is this `None`?
    pub fn is_none(&self) -> bool {
        self.0.is_reserved_value()
    }

    /// Is this `Some`?
    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    /// Expand into a normal `Option<K>`.
    pub fn expand(self) -> Option<K> {
        if self.is_none() {
            None
        } else {
            Some(self.0)
        }
    }

    /// Unwrap, panicking if this is `None`.
    pub fn unwrap(self) -> K {
        self.expand().expect("PackedOption::unwrap on a None value")
    }
}

impl<K: ReservedValue> From<K> for PackedOption<K> {
    fn from(key: K) -> Self {
        debug_assert!(
            !key.is_reserved_value(),
            "cannot wrap a reserved value in Some"
        );
        Self(key)
    }
}

impl<K: ReservedValue> From<Option<K>> for PackedOption<K> {
    fn from(opt: Option<K>) -> Self {
        match opt {
            Some(key) => key.into(),
            None => Self(K::reserved_value()),
        }
    }
}

impl<K: ReservedValue + fmt::Debug> fmt::Debug for PackedOption<K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.expand() {
            Some(key) => write!(f, "Some({key:?})"),
            None => write!(f, "None"),
        }
    }
}
