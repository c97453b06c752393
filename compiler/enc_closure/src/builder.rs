//! Closure Tree Builder.
//!
//! Works bottom-up from the capture analysis:
//!
//! 1. Each function's *needs*: variables it or any nested function reads that
//!    are declared outside its own body.
//! 2. Hosting kind from the needs alone (nothing, only `this`, or more).
//! 3. Captured variables are stored in the record of their declaring scope;
//!    scopes that store nothing get no record and drop out of the chain.
//! 4. Records start as value records. Any record an escaping function
//!    reaches, and every record between it and the outermost one it reaches,
//!    becomes a heap record. This repeats until stable, since a local
//!    function that reaches a heap record is hosted on it and pulls its own
//!    chain onto the heap too.
//! 5. Hosts and link fields follow from the final representations.

use std::collections::BTreeSet;

use smallvec::SmallVec;

use enc_ir::{CaptureAnalysis, FunctionId, ScopeId, VarId, VariableKind};

use crate::stack::ensure_sufficient_stack;
use crate::tree::{ClosureForest, ClosureKind, ClosureScope, LambdaTarget, Representation};

/// Build the closure forest of one method body.
pub fn build_forest(analysis: &CaptureAnalysis) -> ClosureForest {
    let needs = function_needs(analysis);
    let kinds: Vec<ClosureKind> = analysis
        .function_ids()
        .map(|f| hosting_kind(analysis, f, &needs[f.index()]))
        .collect();

    let mut scopes: Vec<ClosureScope> = analysis
        .scope_ids()
        .map(|s| {
            let scope = analysis.scope(s);
            ClosureScope {
                anchor: scope.anchor,
                parent: scope.parent,
                captured: Vec::new(),
                representation: Representation::None,
                env_parent: None,
                link: false,
                functions: Vec::new(),
                hosted: Vec::new(),
            }
        })
        .collect();

    for f in analysis.function_ids() {
        scopes[analysis.function(f).scope.index()].functions.push(f);
    }

    // Captured variables go to their declaring scope.
    let mut stored: Vec<BTreeSet<VarId>> = vec![BTreeSet::new(); scopes.len()];
    for f in general_functions(&kinds) {
        for &v in &needs[f.index()] {
            stored[analysis.variable(v).scope.index()].insert(v);
        }
    }
    for (scope, vars) in scopes.iter_mut().zip(stored) {
        let (this, rest): (Vec<VarId>, Vec<VarId>) = vars
            .into_iter()
            .partition(|&v| analysis.variable(v).kind == VariableKind::This);
        scope.captured = this.into_iter().chain(rest).collect();
        if !scope.captured.is_empty() {
            scope.representation = Representation::ValueRecord;
        }
    }

    for s in analysis.scope_ids() {
        scopes[s.index()].env_parent = nearest_record(&scopes, scopes[s.index()].parent);
    }

    promote_to_heap(analysis, &needs, &kinds, &mut scopes);

    let mut targets = Vec::with_capacity(kinds.len());
    for f in analysis.function_ids() {
        let kind = kinds[f.index()];
        let mut target = LambdaTarget {
            function: f,
            kind,
            host: None,
            chain: SmallVec::new(),
            struct_env_params: Vec::new(),
        };
        if kind == ClosureKind::General {
            let chain = needed_records(analysis, &needs[f.index()]);
            let heap: Vec<ScopeId> = chain
                .iter()
                .copied()
                .filter(|&s| scopes[s.index()].representation == Representation::HeapRecord)
                .collect();
            if let (Some(&host), Some(&outermost)) = (heap.first(), heap.last()) {
                let path = record_path(&scopes, host, outermost);
                for &s in &path[..path.len() - 1] {
                    scopes[s.index()].link = true;
                }
                scopes[host.index()].hosted.push(f);
                target.host = Some(host);
                target.struct_env_params = chain
                    .iter()
                    .copied()
                    .filter(|s| !path.contains(s))
                    .collect();
            } else {
                target.struct_env_params = chain.to_vec();
            }
            target.chain = chain;
        }
        tracing::trace!(function = f.raw(), ?kind, host = ?target.host, "closure target");
        targets.push(target);
    }

    let forest = ClosureForest { scopes, targets };
    tracing::debug!(
        environments = forest.environment_count(),
        functions = forest.targets.len(),
        "built closure forest"
    );
    forest
}

fn general_functions(kinds: &[ClosureKind]) -> impl Iterator<Item = FunctionId> + '_ {
    kinds
        .iter()
        .enumerate()
        .filter(|(_, k)| **k == ClosureKind::General)
        .map(|(i, _)| FunctionId::new(u32::try_from(i).unwrap_or(u32::MAX)))
}

/// Variables each function reads from outside its own body, directly or
/// through nested functions.
fn function_needs(analysis: &CaptureAnalysis) -> Vec<BTreeSet<VarId>> {
    let mut needs = vec![BTreeSet::new(); analysis.function_ids().count()];
    for g in analysis.function_ids() {
        for &v in &analysis.function(g).captures {
            let mut current = Some(g);
            while let Some(h) = current {
                if analysis.declared_inside(v, h) {
                    break;
                }
                needs[h.index()].insert(v);
                current = analysis.function(h).parent;
            }
        }
    }
    needs
}

fn hosting_kind(analysis: &CaptureAnalysis, f: FunctionId, needs: &BTreeSet<VarId>) -> ClosureKind {
    let function = analysis.function(f);
    if needs.is_empty() {
        if function.converted {
            ClosureKind::Singleton
        } else {
            ClosureKind::Static
        }
    } else if needs
        .iter()
        .all(|&v| analysis.variable(v).kind == VariableKind::This)
    {
        ClosureKind::ThisOnly
    } else {
        ClosureKind::General
    }
}

/// Scopes whose records hold `needs`, innermost first.
fn needed_records(analysis: &CaptureAnalysis, needs: &BTreeSet<VarId>) -> SmallVec<[ScopeId; 4]> {
    let mut records: SmallVec<[ScopeId; 4]> = SmallVec::new();
    for &v in needs {
        let scope = analysis.variable(v).scope;
        if !records.contains(&scope) {
            records.push(scope);
        }
    }
    records.sort_by_key(|&s| std::cmp::Reverse(analysis.depth(s)));
    records
}

fn nearest_record(scopes: &[ClosureScope], mut current: Option<ScopeId>) -> Option<ScopeId> {
    while let Some(s) = current {
        if scopes[s.index()].has_record() {
            return Some(s);
        }
        current = scopes[s.index()].parent;
    }
    None
}

/// Records from `inner` up to `outer` inclusive, following `env_parent`.
fn record_path(scopes: &[ClosureScope], inner: ScopeId, outer: ScopeId) -> Vec<ScopeId> {
    ensure_sufficient_stack(|| {
        if inner == outer {
            return vec![inner];
        }
        match scopes[inner.index()].env_parent {
            Some(parent) => {
                let mut path = vec![inner];
                path.extend(record_path(scopes, parent, outer));
                path
            }
            None => vec![inner],
        }
    })
}

fn promote_to_heap(
    analysis: &CaptureAnalysis,
    needs: &[BTreeSet<VarId>],
    kinds: &[ClosureKind],
    scopes: &mut [ClosureScope],
) {
    loop {
        let mut changed = false;
        for f in general_functions(kinds) {
            let chain = needed_records(analysis, &needs[f.index()]);
            let required: Vec<ScopeId> = if analysis.function(f).converted {
                chain.to_vec()
            } else {
                chain
                    .iter()
                    .copied()
                    .filter(|&s| scopes[s.index()].representation == Representation::HeapRecord)
                    .collect()
            };
            let (Some(&inner), Some(&outer)) = (required.first(), required.last()) else {
                continue;
            };
            for s in record_path(scopes, inner, outer) {
                let scope = &mut scopes[s.index()];
                if scope.representation != Representation::HeapRecord {
                    scope.representation = Representation::HeapRecord;
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
}
