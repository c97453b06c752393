//! Computing one generation.
//!
//! 1. Match declarations and run the declaration checks.
//! 2. Resolve each edit to its baseline method. Abort here if any
//!    declaration or signature check failed.
//! 3. Per edited method, in parallel: build the closure forest and run the
//!    capture checks. Only a method that passes them is matched against its
//!    baseline records.
//! 4. Abort with every capture rude edit found, or merge single-threaded:
//!    names, rows, and the replacement baseline.

use std::borrow::Cow;
use std::sync::Arc;

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use enc_closure::{
    build_forest, closure_rude_edits, match_closures, ClosureForest, ClosurePlan, MethodClosures,
};
use enc_diagnostic::{EmitError, RudeEdit, RudeEditKind};
use enc_ir::{
    Anchor, CaptureAnalysis, DebugId, DeclTree, Generation, MethodDeclId, StringInterner,
    SyntaxMap, VariableKind,
};
use enc_symbols::{declaration_rude_edits, MethodKey, SymbolMatcher};

use crate::emit::Emitter;
use crate::output::{GenerationOutput, Rebind};
use crate::{Baseline, EmitOptions, GenerationInput, SemanticEdit};

/// An edit resolved against the baseline.
pub(crate) struct MethodJob<'a> {
    pub method: MethodDeclId,
    pub key: MethodKey,
    /// Key of the baseline method this one updates.
    pub old_key: Option<MethodKey>,
    pub syntax_map: Option<&'a SyntaxMap>,
    pub analysis: Option<&'a CaptureAnalysis>,
}

/// Analysis result of one edited method.
pub(crate) struct MethodWork {
    pub forest: ClosureForest,
    pub plan: ClosurePlan,
    pub rude: Vec<RudeEdit>,
}

pub(crate) fn prepare_generation(
    baseline: &Baseline,
    input: &GenerationInput,
    interner: &StringInterner,
    options: &EmitOptions,
) -> Result<GenerationOutput, EmitError> {
    let generation = baseline.next_generation();
    let _span = tracing::debug_span!("generation", %generation).entered();
    let new = &*input.decls;
    let old = baseline.decls();

    let matcher = SymbolMatcher::new(new, old);
    let symbols = matcher.match_all();
    let mut rude = declaration_rude_edits(&matcher, interner);

    let jobs = resolve_edits(&matcher, input, interner, &mut rude)?;
    if !rude.is_empty() {
        return Err(rejected(generation, rude));
    }

    let works = analyze(baseline, new, &jobs, interner, generation, options);
    for work in &works {
        rude.extend(work.rude.iter().cloned());
    }
    if !rude.is_empty() {
        return Err(rejected(generation, rude));
    }

    let mut emitter = Emitter::new(baseline, new, interner, generation, options);
    emitter.emit_declarations(&jobs)?;
    for (job, work) in jobs.iter().zip(&works) {
        emitter.emit_closures(job, &work.plan, &analysis_of(job))?;
    }
    let next = emitter.finish(Arc::clone(&input.decls), &jobs, &works)?;

    let mut plans = FxHashMap::default();
    let mut rebinds = FxHashMap::default();
    for (job, work) in jobs.iter().zip(works) {
        let empty = FxHashMap::default();
        let env_names = next.env_names.get(&job.method).unwrap_or(&empty);
        rebinds.insert(job.method, rebind_table(job, &work, env_names, interner));
        plans.insert(job.method, work.plan);
    }

    tracing::debug!(
        %generation,
        methods = jobs.len(),
        rows = next.delta.rows.len(),
        "generation prepared"
    );
    Ok(GenerationOutput {
        generation,
        manifest: next.manifest,
        delta: next.delta,
        symbols,
        plans,
        rebinds,
        baseline: Arc::new(next.baseline),
    })
}

fn rejected(generation: Generation, rude: Vec<RudeEdit>) -> EmitError {
    tracing::debug!(%generation, count = rude.len(), "generation rejected");
    EmitError::RudeEdits(rude)
}

fn resolve_edits<'a>(
    matcher: &SymbolMatcher<'_>,
    input: &'a GenerationInput,
    interner: &StringInterner,
    rude: &mut Vec<RudeEdit>,
) -> Result<Vec<MethodJob<'a>>, EmitError> {
    let new = matcher.new_tree();
    let old = matcher.old_tree();
    let mut jobs = Vec::with_capacity(input.edits.len());

    for edit in &input.edits {
        let method = edit.method();
        let Some(decl) = new.get_method(method) else {
            return Err(EmitError::UnknownMethod(format!("#{}", method.raw())));
        };
        let key = MethodKey::of(new, method);

        let (old_key, syntax_map) = match edit {
            SemanticEdit::Update {
                old: Some(old_id),
                syntax_map,
                ..
            } => {
                if old.get_method(*old_id).is_none() {
                    return Err(EmitError::UnknownMethod(format!(
                        "{} (baseline #{})",
                        key.qualified_name(interner),
                        old_id.raw()
                    )));
                }
                let old_key = MethodKey::of(old, *old_id);
                if old_key != key {
                    rude.push(RudeEdit::new(
                        RudeEditKind::ChangingMethodSignature,
                        decl.span,
                        key.qualified_name(interner),
                    ));
                }
                (Some(old_key), syntax_map.as_ref())
            }
            SemanticEdit::Update {
                old: None,
                syntax_map,
                ..
            } => {
                let counterpart = matcher.map_method(method).map(|o| MethodKey::of(old, o));
                if counterpart.is_none() {
                    tracing::debug!(
                        method = %key.qualified_name(interner),
                        "update without counterpart, treated as insertion"
                    );
                }
                (counterpart, syntax_map.as_ref())
            }
            SemanticEdit::Insert { .. } => (None, None),
        };

        jobs.push(MethodJob {
            method,
            key,
            old_key,
            syntax_map,
            analysis: input.analyses.get(&method),
        });
    }
    Ok(jobs)
}

fn analyze(
    baseline: &Baseline,
    new: &DeclTree,
    jobs: &[MethodJob<'_>],
    interner: &StringInterner,
    generation: Generation,
    options: &EmitOptions,
) -> Vec<MethodWork> {
    let run = |job: &MethodJob<'_>| analyze_method(baseline, new, job, interner, generation);

    if !options.parallel || jobs.len() < 2 {
        return jobs.iter().map(run).collect();
    }

    rayon::ThreadPoolBuilder::new()
        .num_threads(options.threads.unwrap_or(0))
        .build_scoped(rayon::ThreadBuilder::run, |pool| {
            pool.install(|| jobs.par_iter().map(run).collect::<Vec<_>>())
        })
        .unwrap_or_else(|e| {
            tracing::warn!("failed to create thread pool ({e}), analyzing sequentially");
            jobs.iter().map(run).collect()
        })
}

fn analyze_method(
    baseline: &Baseline,
    new: &DeclTree,
    job: &MethodJob<'_>,
    interner: &StringInterner,
    generation: Generation,
) -> MethodWork {
    let empty = MethodClosures::default();
    let previous = job
        .old_key
        .as_ref()
        .and_then(|k| baseline.closures(k))
        .unwrap_or(&empty);
    let analysis = analysis_of(job);

    let forest = build_forest(&analysis);
    let name = job.key.qualified_name(interner);
    let span = new.method(job.method).span;
    let rude = closure_rude_edits(&analysis, &forest, previous, job.syntax_map, &name, span);
    // A rejected method is never matched.
    let plan = if rude.is_empty() {
        match_closures(&analysis, &forest, previous, job.syntax_map, generation)
    } else {
        ClosurePlan::default()
    };

    tracing::debug!(
        method = %name,
        environments = plan.envs.len(),
        lambdas = plan.lambdas.len(),
        rude = rude.len(),
        "analyzed method"
    );
    MethodWork { forest, plan, rude }
}

/// The job's analysis, or an empty one for a method without nested functions.
fn analysis_of<'a>(job: &MethodJob<'a>) -> Cow<'a, CaptureAnalysis> {
    match job.analysis {
        Some(analysis) => Cow::Borrowed(analysis),
        None => Cow::Owned(CaptureAnalysis::empty(Anchor::new(0))),
    }
}

fn rebind_table(
    job: &MethodJob<'_>,
    work: &MethodWork,
    env_names: &FxHashMap<DebugId, String>,
    interner: &StringInterner,
) -> FxHashMap<Anchor, Rebind> {
    let analysis = analysis_of(job);
    let mut table = FxHashMap::default();

    for v in analysis.var_ids() {
        let variable = analysis.variable(v);
        let old_anchor = match job.syntax_map {
            Some(map) => map.map(variable.anchor),
            None => Some(variable.anchor),
        };
        let Some(old_anchor) = old_anchor else {
            continue;
        };

        let home = work
            .forest
            .env_of(v)
            .and_then(|scope| work.plan.env_for_scope(scope));
        let rebind = match home {
            Some(env) => {
                let mut path = Vec::new();
                let mut parent = env.record.parent;
                while let Some(id) = parent {
                    path.extend(env_names.get(&id).cloned());
                    parent = work.plan.env(id).and_then(|p| p.record.parent);
                }
                path.reverse();
                let field = match variable.kind {
                    VariableKind::This => enc_emit::names::THIS_FIELD.to_owned(),
                    VariableKind::Parameter | VariableKind::Local => {
                        interner.lookup(variable.name).to_owned()
                    }
                };
                Rebind::EnvironmentField {
                    environment: env_names.get(&env.id()).cloned().unwrap_or_default(),
                    field,
                    path,
                }
            }
            None => Rebind::Local,
        };
        table.insert(old_anchor, rebind);
    }
    table
}
