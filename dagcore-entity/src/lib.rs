//! Dense integer entity handles and the arenas keyed by them.
//!
//! This crate has no knowledge of any particular graph or IR; it only
//! provides the [`EntityRef`] trait and three small containers built on
//! top of it: [`PrimaryMap`], [`SecondaryMap`], and
//! [`packed_option::PackedOption`].

#![forbid(unsafe_code)]

mod entity_ref;
pub mod packed_option;
mod primary_map;
mod secondary_map;

pub use entity_ref::{EntityRef, ReservedValue};
pub use packed_option::PackedOption;
pub use primary_map::PrimaryMap;
pub use secondary_map::SecondaryMap;
