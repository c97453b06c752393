//! Closure forest.
//!
//! One [`ClosureScope`] per lexical scope of the method, indexed by the
//! analysis' [`ScopeId`]. Scopes whose representation is not
//! [`Representation::None`] get a synthesized environment record; the
//! `env_parent` links between those records form a forest.

use smallvec::SmallVec;

use enc_ir::{Anchor, FunctionId, ScopeId, VarId};

/// Physical form of a scope's environment record.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Representation {
    /// No record; the scope captures nothing.
    None,
    /// Struct living in the declaring frame, passed by reference.
    ValueRecord,
    /// Class instance with reference identity.
    HeapRecord,
}

impl Representation {
    pub fn as_str(self) -> &'static str {
        match self {
            Representation::None => "none",
            Representation::ValueRecord => "value-record",
            Representation::HeapRecord => "heap-record",
        }
    }
}

/// Where a lambda or local function is emitted.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum ClosureKind {
    /// Captures nothing, never converted: static method on the containing
    /// type.
    Static,
    /// Captures nothing, converted to a delegate: instance method on the
    /// per-type static container, invoked through its singleton.
    Singleton,
    /// Captures only the enclosing instance: instance method on the
    /// containing type.
    ThisOnly,
    /// Captures locals: hosted on its innermost heap environment, or static
    /// on the containing type when it only reaches value records.
    General,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ClosureScope {
    pub anchor: Anchor,
    /// Lexical parent.
    pub parent: Option<ScopeId>,
    /// Variables stored in this scope's record: the enclosing instance first,
    /// then variables in declaration order.
    pub captured: Vec<VarId>,
    pub representation: Representation,
    /// Nearest lexical ancestor that has a record.
    pub env_parent: Option<ScopeId>,
    /// The record holds a reference to `env_parent`'s record.
    pub link: bool,
    /// Functions declared directly in this scope.
    pub functions: Vec<FunctionId>,
    /// Functions emitted as methods on this scope's record.
    pub hosted: Vec<FunctionId>,
}

impl ClosureScope {
    pub fn has_record(&self) -> bool {
        self.representation != Representation::None
    }
}

/// Synthesized callable of one lambda or local function.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct LambdaTarget {
    pub function: FunctionId,
    pub kind: ClosureKind,
    /// Record the method is emitted on, for hosted [`ClosureKind::General`]
    /// functions.
    pub host: Option<ScopeId>,
    /// Records the function reads at call time, innermost first.
    pub chain: SmallVec<[ScopeId; 4]>,
    /// Value records passed as by-reference parameters, innermost first.
    pub struct_env_params: Vec<ScopeId>,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ClosureForest {
    pub(crate) scopes: Vec<ClosureScope>,
    pub(crate) targets: Vec<LambdaTarget>,
}

impl ClosureForest {
    #[inline]
    pub fn scope(&self, id: ScopeId) -> &ClosureScope {
        &self.scopes[id.index()]
    }

    #[inline]
    pub fn target(&self, function: FunctionId) -> &LambdaTarget {
        &self.targets[function.index()]
    }

    pub fn targets(&self) -> &[LambdaTarget] {
        &self.targets
    }

    /// Scopes that have a record, in scope order (parents first).
    pub fn environments(&self) -> impl Iterator<Item = ScopeId> + '_ {
        self.scopes
            .iter()
            .enumerate()
            .filter(|(_, s)| s.has_record())
            .map(|(i, _)| ScopeId::new(u32::try_from(i).unwrap_or(u32::MAX)))
    }

    pub fn environment_count(&self) -> usize {
        self.scopes.iter().filter(|s| s.has_record()).count()
    }

    /// Records whose `env_parent` is `parent`.
    pub fn env_children(&self, parent: Option<ScopeId>) -> Vec<ScopeId> {
        self.environments()
            .filter(|&s| self.scope(s).env_parent == parent)
            .collect()
    }

    /// Scope whose record stores `var`.
    pub fn env_of(&self, var: VarId) -> Option<ScopeId> {
        self.environments()
            .find(|&s| self.scope(s).captured.contains(&var))
    }
}
