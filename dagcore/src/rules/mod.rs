//! A small built-in library of generic class rules, each configured
//! with the domain-specific predicates a concrete node type supplies,
//! rather than hard-coding any particular node kind.
//!
//! These cover the shapes of rewrite that show up across most pipeline
//! DAGs: flattening nested applications of an associative operator,
//! collapsing an operator with its own inverse, dropping a unary node
//! that is the identity at that arity, and a catch-all
//! predicate-driven replacement. Register them against whatever
//! [`Tag`](crate::rule::Tag) identifies the node kind or capability
//! they should fire for.

mod associative;
mod inverse;
mod replacement;
mod unary;

pub use associative::AssociativeClassReducer;
pub use inverse::InverseClassReducer;
pub use replacement::ReplacementReducer;
pub use unary::RemoveIfUnaryReducer;
