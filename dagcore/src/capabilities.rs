//! The small set of boolean facts a node may assert about itself.

use smallvec::SmallVec;

/// A capability, named as an ancestry tag so the rule registry's class
/// rule table can key on it the same way it keys on [`NodeKind`](crate::node::NodeKind).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    /// See [`NodeCapabilities::constant_result`].
    ConstantResult,
    /// See [`NodeCapabilities::always_constant_result`].
    AlwaysConstantResult,
    /// See [`NodeCapabilities::idempotent_preparer`].
    IdempotentPreparer,
    /// See [`NodeCapabilities::has_trivial_equality`].
    HasTrivialEquality,
}

/// Independent boolean flags a node contributes about itself. These are
/// contracts the node asserts; the reducer may rely on them but must
/// never infer one that the node didn't declare.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeCapabilities(u8);

impl NodeCapabilities {
    const CONSTANT_RESULT: u8 = 1 << 0;
    const ALWAYS_CONSTANT_RESULT: u8 = 1 << 1;
    const IDEMPOTENT_PREPARER: u8 = 1 << 2;
    const HAS_TRIVIAL_EQUALITY: u8 = 1 << 3;

    /// The empty set of capabilities.
    pub fn none() -> Self {
        Self(0)
    }

    fn with(self, bit: u8, value: bool) -> Self {
        if value {
            Self(self.0 | bit)
        } else {
            Self(self.0 & !bit)
        }
    }

    /// Does this node always produce the same result regardless of
    /// example index (but not necessarily regardless of its parents)?
    pub fn constant_result(self) -> bool {
        self.0 & Self::CONSTANT_RESULT != 0
    }

    /// Set the constant-result flag.
    pub fn with_constant_result(self, value: bool) -> Self {
        self.with(Self::CONSTANT_RESULT, value)
    }

    /// Does every instance of this node kind, regardless of
    /// configuration, always have a constant result?
    pub fn always_constant_result(self) -> bool {
        self.0 & Self::ALWAYS_CONSTANT_RESULT != 0
    }

    /// Set the always-constant-result flag.
    pub fn with_always_constant_result(self, value: bool) -> Self {
        self.with(Self::ALWAYS_CONSTANT_RESULT, value)
    }

    /// Does preparing this node twice with the same parent values
    /// always yield the same prepared projection?
    pub fn idempotent_preparer(self) -> bool {
        self.0 & Self::IDEMPOTENT_PREPARER != 0
    }

    /// Set the idempotent-preparer flag.
    pub fn with_idempotent_preparer(self, value: bool) -> Self {
        self.with(Self::IDEMPOTENT_PREPARER, value)
    }

    /// Does this node define value equality trivially, i.e. is it
    /// always safe for the reducer to compare two instances by
    /// `Node::value_eq` without risking an expensive or surprising
    /// comparison?
    pub fn has_trivial_equality(self) -> bool {
        self.0 & Self::HAS_TRIVIAL_EQUALITY != 0
    }

    /// Set the has-trivial-equality flag.
    pub fn with_has_trivial_equality(self, value: bool) -> Self {
        self.with(Self::HAS_TRIVIAL_EQUALITY, value)
    }

    /// The set of capability tags currently active, for ancestry
    /// lookups in the rule registry's class rule table.
    pub fn tags(self) -> SmallVec<[Capability; 4]> {
        let mut tags = SmallVec::new();
        if self.constant_result() {
            tags.push(Capability::ConstantResult);
        }
        if self.always_constant_result() {
            tags.push(Capability::AlwaysConstantResult);
        }
        if self.idempotent_preparer() {
            tags.push(Capability::IdempotentPreparer);
        }
        if self.has_trivial_equality() {
            tags.push(Capability::HasTrivialEquality);
        }
        tags
    }
}
