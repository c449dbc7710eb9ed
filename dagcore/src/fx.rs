//! Hash containers keyed with a faster, non-DoS-resistant hasher.
//!
//! Node handles and rule registrations never come from untrusted input,
//! so we trade away `HashMap`'s resistance to adversarial collisions for
//! the speed of `rustc_hash`'s FxHash.

pub use rustc_hash::{FxHashMap, FxHashSet};
