//! Committed state carried from one generation to the next.
//!
//! A baseline is immutable once built. Computing a generation reads the
//! committed baseline and produces a complete replacement; nothing is updated
//! in place, so an aborted generation leaves the session exactly as it was.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use enc_closure::MethodClosures;
use enc_emit::{Manifest, RowLedger};
use enc_ir::{DebugId, DeclTree, Generation, StringInterner};
use enc_symbols::{MethodKey, TypeKey};

#[derive(Clone, Debug, Default)]
pub struct Baseline {
    pub(crate) generation: Option<Generation>,
    pub(crate) decls: Arc<DeclTree>,
    pub(crate) ledger: RowLedger,
    /// Debug id of every emitted user method.
    pub(crate) method_ids: FxHashMap<MethodKey, DebugId>,
    /// Closure records of every method that has any.
    pub(crate) closures: FxHashMap<MethodKey, MethodClosures>,
    /// Generation that created each type's static lambda container.
    pub(crate) static_containers: FxHashMap<TypeKey, Generation>,
}

impl Baseline {
    /// State before the cold build.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Last committed generation, `None` before the cold build.
    pub fn generation(&self) -> Option<Generation> {
        self.generation
    }

    /// The generation the next delta will be.
    pub fn next_generation(&self) -> Generation {
        self.generation.map_or(Generation::INITIAL, Generation::next)
    }

    pub fn decls(&self) -> &DeclTree {
        &self.decls
    }

    pub fn ledger(&self) -> &RowLedger {
        &self.ledger
    }

    pub fn method_id(&self, method: &MethodKey) -> Option<DebugId> {
        self.method_ids.get(method).copied()
    }

    pub fn closures(&self, method: &MethodKey) -> Option<&MethodClosures> {
        self.closures.get(method)
    }

    pub fn static_container(&self, owner: &TypeKey) -> Option<Generation> {
        self.static_containers.get(owner).copied()
    }

    pub fn manifest(&self, interner: &StringInterner) -> Manifest {
        Manifest::from_ledger(&self.ledger, interner)
    }
}
