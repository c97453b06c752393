//! Result of computing one generation.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use enc_closure::ClosurePlan;
use enc_emit::{Manifest, MetadataDelta};
use enc_ir::{Anchor, Generation, MethodDeclId};
use enc_symbols::SymbolMap;

use crate::Baseline;

/// Where a variable of a suspended frame lives after the delta.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Rebind {
    /// A field of a synthesized environment.
    EnvironmentField {
        /// Qualified name of the environment type.
        environment: String,
        field: String,
        /// Environment types enclosing it, outermost first.
        path: Vec<String>,
    },
    /// An ordinary local of the method frame.
    Local,
    /// The variable no longer exists.
    Removed,
}

/// A computed, not yet committed, generation.
#[derive(Clone, Debug)]
pub struct GenerationOutput {
    pub generation: Generation,
    pub delta: MetadataDelta,
    /// Every type after the delta, retired ones included.
    pub manifest: Manifest,
    pub symbols: SymbolMap,
    pub(crate) plans: FxHashMap<MethodDeclId, ClosurePlan>,
    pub(crate) rebinds: FxHashMap<MethodDeclId, FxHashMap<Anchor, Rebind>>,
    pub(crate) baseline: Arc<Baseline>,
}

impl GenerationOutput {
    /// Closure plan of an edited method.
    pub fn plan(&self, method: MethodDeclId) -> Option<&ClosurePlan> {
        self.plans.get(&method)
    }

    /// New home of the variable declared at `old_anchor` in the previous
    /// generation of `method`. `None` when `method` was not edited.
    pub fn rebind(&self, method: MethodDeclId, old_anchor: Anchor) -> Option<Rebind> {
        let table = self.rebinds.get(&method)?;
        Some(table.get(&old_anchor).cloned().unwrap_or(Rebind::Removed))
    }

    /// The baseline this generation commits.
    pub fn baseline(&self) -> &Arc<Baseline> {
        &self.baseline
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.delta.to_bytes()
    }
}
