//! Closure Matcher.
//!
//! Diffs a method's new closure forest against the records the previous
//! generation left in the baseline.
//!
//! Environments are paired by anchor first and by exact shape second, then
//! classified parent-first:
//!
//! | Change | Condition | Effect |
//! |---|---|---|
//! | Unchanged | same parent, representation, and fields | type reused |
//! | Extended | same parent and representation, strict field superset of a heap record | fields appended |
//! | Superseded | fields lost, value record grown, representation changed, or reparented | new type, old retired |
//! | New | no counterpart | new type |
//!
//! Lambdas are classified on their own: a lambda keeps its method only when
//! its kind, host record, and by-reference records are all unchanged.

use rustc_hash::FxHashMap;

use enc_ir::{
    CaptureAnalysis, DebugId, FunctionId, Generation, Name, Primitive, ScopeId, SyntaxMap,
    VariableKind,
};
use enc_symbols::structural::{match_shapes, RecordShape};
use enc_symbols::SigType;

use crate::preflight::to_old;
use crate::stack::ensure_sufficient_stack;
use crate::{ClosureForest, EnvField, EnvRecord, LambdaRecord, MethodClosures, Representation};

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum EnvChange {
    Unchanged,
    /// The last `added` fields are new.
    Extended { added: usize },
    Superseded { previous: DebugId },
    New,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct EnvPlan {
    pub scope: ScopeId,
    pub record: EnvRecord,
    pub change: EnvChange,
}

impl EnvPlan {
    pub fn id(&self) -> DebugId {
        self.record.id
    }

    /// The type already exists in the baseline.
    pub fn is_reused(&self) -> bool {
        matches!(self.change, EnvChange::Unchanged | EnvChange::Extended { .. })
    }

    /// Fields that need new rows.
    pub fn added_fields(&self) -> &[EnvField] {
        let fields = &self.record.fields;
        match self.change {
            EnvChange::Unchanged => &[],
            EnvChange::Extended { added } => &fields[fields.len().saturating_sub(added)..],
            EnvChange::Superseded { .. } | EnvChange::New => fields,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum LambdaChange {
    /// Same method; only the body is recompiled.
    Reused,
    /// Moved to a new method; the old one is retired.
    Rehosted { previous: DebugId },
    New,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct LambdaPlan {
    pub function: FunctionId,
    pub record: LambdaRecord,
    pub change: LambdaChange,
}

impl LambdaPlan {
    pub fn id(&self) -> DebugId {
        self.record.id
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum RetireReason {
    /// The lambda no longer exists.
    Deleted,
    /// The lambda moved to a new method.
    Rehosted,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct RetiredLambda {
    pub record: LambdaRecord,
    pub reason: RetireReason,
}

/// Matching result for one method.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct ClosurePlan {
    pub envs: Vec<EnvPlan>,
    pub lambdas: Vec<LambdaPlan>,
    /// Superseded and vanished environments. Their types stay in the module.
    pub retired_envs: Vec<EnvRecord>,
    pub retired_lambdas: Vec<RetiredLambda>,
    /// Records to carry into the next baseline.
    pub closures: MethodClosures,
}

impl ClosurePlan {
    pub fn env_for_scope(&self, scope: ScopeId) -> Option<&EnvPlan> {
        self.envs.iter().find(|e| e.scope == scope)
    }

    pub fn env(&self, id: DebugId) -> Option<&EnvPlan> {
        self.envs.iter().find(|e| e.record.id == id)
    }

    pub fn lambda(&self, function: FunctionId) -> Option<&LambdaPlan> {
        self.lambdas.iter().find(|l| l.function == function)
    }

    /// No synthesized type, field, or method changes shape.
    pub fn is_shape_stable(&self) -> bool {
        self.envs.iter().all(|e| e.change == EnvChange::Unchanged)
            && self.lambdas.iter().all(|l| l.change == LambdaChange::Reused)
            && self.retired_envs.is_empty()
            && self.retired_lambdas.is_empty()
    }
}

/// Match one method's closures against its previous records.
///
/// `syntax_map` translates new anchors into the previous generation; without
/// one, equal anchors denote the same node.
pub fn match_closures(
    analysis: &CaptureAnalysis,
    forest: &ClosureForest,
    previous: &MethodClosures,
    syntax_map: Option<&SyntaxMap>,
    generation: Generation,
) -> ClosurePlan {
    let mut matcher = ClosureMatcher {
        analysis,
        forest,
        previous,
        syntax_map,
        generation,
        counterpart: FxHashMap::default(),
        plan_index: FxHashMap::default(),
        envs: Vec::new(),
        next_closure_ordinal: previous.next_closure_ordinal,
    };
    matcher.pair_environments();
    matcher.plan_children(None);

    let mut retired_envs: Vec<EnvRecord> = Vec::new();
    for plan in &matcher.envs {
        if let EnvChange::Superseded { previous: old_id } = plan.change {
            if let Some(old) = previous.env(old_id) {
                retired_envs.push(old.clone());
            }
        }
    }
    let claimed: Vec<usize> = matcher.counterpart.values().copied().collect();
    for (i, old) in previous.envs.iter().enumerate() {
        if !claimed.contains(&i) {
            retired_envs.push(old.clone());
        }
    }
    retired_envs.sort_by_key(|e| e.id);

    let (lambdas, retired_lambdas, next_lambda_ordinal) = matcher.plan_lambdas();

    let mut envs = matcher.envs;
    envs.sort_by_key(|e| e.scope);
    let closures = MethodClosures {
        envs: envs.iter().map(|e| e.record.clone()).collect(),
        lambdas: lambdas.iter().map(|l| l.record.clone()).collect(),
        next_closure_ordinal: matcher.next_closure_ordinal,
        next_lambda_ordinal,
    };

    tracing::debug!(
        environments = envs.len(),
        lambdas = lambdas.len(),
        retired_envs = retired_envs.len(),
        retired_lambdas = retired_lambdas.len(),
        "matched closures"
    );

    ClosurePlan {
        envs,
        lambdas,
        retired_envs,
        retired_lambdas,
        closures,
    }
}

struct ClosureMatcher<'a> {
    analysis: &'a CaptureAnalysis,
    forest: &'a ClosureForest,
    previous: &'a MethodClosures,
    syntax_map: Option<&'a SyntaxMap>,
    generation: Generation,
    /// New scope to index of its counterpart in `previous.envs`.
    counterpart: FxHashMap<ScopeId, usize>,
    plan_index: FxHashMap<ScopeId, usize>,
    envs: Vec<EnvPlan>,
    next_closure_ordinal: u32,
}

impl ClosureMatcher<'_> {
    fn pair_environments(&mut self) {
        let mut claimed = vec![false; self.previous.envs.len()];
        let mut unpaired = Vec::new();

        for scope in self.forest.environments() {
            let anchor = to_old(self.syntax_map, self.forest.scope(scope).anchor);
            let found = anchor.and_then(|a| {
                self.previous
                    .envs
                    .iter()
                    .enumerate()
                    .position(|(i, e)| !claimed[i] && e.anchor == a)
            });
            match found {
                Some(i) => {
                    claimed[i] = true;
                    self.counterpart.insert(scope, i);
                }
                None => unpaired.push(scope),
            }
        }

        if unpaired.is_empty() {
            return;
        }

        for representation in [Representation::ValueRecord, Representation::HeapRecord] {
            let new: Vec<ScopeId> = unpaired
                .iter()
                .copied()
                .filter(|&s| self.forest.scope(s).representation == representation)
                .collect();
            let mut old: Vec<usize> = (0..self.previous.envs.len())
                .filter(|&i| {
                    !claimed[i] && self.previous.envs[i].representation == representation
                })
                .collect();
            old.sort_by_key(|&i| self.previous.envs[i].id.ordinal);

            let new_shapes: Vec<RecordShape> =
                new.iter().map(|&s| self.shape_of_scope(s)).collect();
            let old_shapes: Vec<RecordShape> = old
                .iter()
                .map(|&i| shape_of_fields(&self.previous.envs[i].fields))
                .collect();

            for (k, m) in match_shapes(&new_shapes, &old_shapes, false)
                .into_iter()
                .enumerate()
            {
                if let Some((j, _)) = m {
                    claimed[old[j]] = true;
                    self.counterpart.insert(new[k], old[j]);
                    tracing::trace!(scope = new[k].raw(), "environment paired by shape");
                }
            }
        }
    }

    fn shape_of_scope(&self, scope: ScopeId) -> RecordShape {
        let env = self.forest.scope(scope);
        let mut elements: Vec<(Name, SigType)> = env
            .captured
            .iter()
            .map(|&v| {
                let variable = self.analysis.variable(v);
                let name = match variable.kind {
                    VariableKind::This => Name::EMPTY,
                    VariableKind::Parameter | VariableKind::Local => variable.name,
                };
                (name, SigType::lower(&variable.ty))
            })
            .collect();
        if env.link {
            elements.push(link_element());
        }
        RecordShape::new(elements)
    }

    /// Plan every record whose `env_parent` is `parent`, parents first.
    fn plan_children(&mut self, parent: Option<ScopeId>) {
        ensure_sufficient_stack(|| {
            for child in self.forest.env_children(parent) {
                self.plan_env(child);
                self.plan_children(Some(child));
            }
        });
    }

    fn plan_env(&mut self, scope: ScopeId) {
        let env = self.forest.scope(scope);
        let parent_plan = env.env_parent.and_then(|p| self.plan_of(p));
        let parent_id = parent_plan.map(EnvPlan::id);

        let mut fields: Vec<EnvField> = env
            .captured
            .iter()
            .map(|&v| {
                let variable = self.analysis.variable(v);
                match variable.kind {
                    VariableKind::This => EnvField::This {
                        ty: variable.ty.clone(),
                    },
                    VariableKind::Parameter | VariableKind::Local => EnvField::Variable {
                        name: variable.name,
                        ty: variable.ty.clone(),
                        anchor: variable.anchor,
                    },
                }
            })
            .collect();
        if env.link {
            if let Some(parent) = parent_id {
                fields.push(EnvField::Link { parent });
            }
        }

        let old = self
            .counterpart
            .get(&scope)
            .map(|&i| &self.previous.envs[i]);

        let (id, fields, change, shape) = match old {
            None => {
                let id = DebugId::new(self.next_closure_ordinal, self.generation);
                self.next_closure_ordinal += 1;
                (id, fields, EnvChange::New, self.generation)
            }
            Some(old) => {
                // A new parent without a counterpart is `Some(None)`, which
                // never equals the old parent even when that was `None`.
                let parent_counterpart = env.env_parent.map(|p| {
                    self.counterpart
                        .get(&p)
                        .map(|&i| self.previous.envs[i].id)
                });
                let reparented = match parent_counterpart {
                    None => old.parent.is_some(),
                    Some(None) => true,
                    Some(counterpart) => counterpart != old.parent,
                };
                let retyped = old.representation != env.representation;
                let kept = old
                    .fields
                    .iter()
                    .all(|f| fields.iter().any(|n| n.same_slot(f)));
                // Suspended frames hold value records inline, so their layout
                // cannot grow.
                let grown_value = env.representation == Representation::ValueRecord
                    && fields
                        .iter()
                        .any(|n| !old.fields.iter().any(|f| f.same_slot(n)));

                if reparented || retyped || !kept || grown_value {
                    tracing::trace!(
                        scope = scope.raw(),
                        reparented,
                        retyped,
                        kept,
                        grown_value,
                        "environment superseded"
                    );
                    let id = DebugId::new(old.id.ordinal, self.generation);
                    (
                        id,
                        fields,
                        EnvChange::Superseded { previous: old.id },
                        self.generation,
                    )
                } else {
                    // Existing fields keep their order; anchors are refreshed.
                    let mut merged: Vec<EnvField> = old
                        .fields
                        .iter()
                        .map(|f| {
                            fields
                                .iter()
                                .find(|n| n.same_slot(f))
                                .cloned()
                                .unwrap_or_else(|| f.clone())
                        })
                        .collect();
                    let added: Vec<EnvField> = fields
                        .into_iter()
                        .filter(|n| !old.fields.iter().any(|f| f.same_slot(n)))
                        .collect();
                    let count = added.len();
                    merged.extend(added);
                    if count == 0 {
                        (old.id, merged, EnvChange::Unchanged, old.shape)
                    } else {
                        (
                            old.id,
                            merged,
                            EnvChange::Extended { added: count },
                            self.generation,
                        )
                    }
                }
            }
        };

        tracing::trace!(scope = scope.raw(), %id, ?change, "environment planned");
        self.plan_index.insert(scope, self.envs.len());
        self.envs.push(EnvPlan {
            scope,
            record: EnvRecord {
                anchor: env.anchor,
                id,
                representation: env.representation,
                parent: parent_id,
                fields,
                shape,
            },
            change,
        });
    }

    fn plan_of(&self, scope: ScopeId) -> Option<&EnvPlan> {
        self.plan_index.get(&scope).map(|&i| &self.envs[i])
    }

    fn plan_lambdas(&self) -> (Vec<LambdaPlan>, Vec<RetiredLambda>, u32) {
        let mut next_ordinal = self.previous.next_lambda_ordinal;
        let mut claimed = vec![false; self.previous.lambdas.len()];
        let mut plans = Vec::new();
        let mut retired = Vec::new();

        for f in self.analysis.function_ids() {
            let function = self.analysis.function(f);
            let target = self.forest.target(f);
            let host = target.host.and_then(|h| self.plan_of(h)).map(EnvPlan::id);
            let struct_envs: Vec<DebugId> = target
                .struct_env_params
                .iter()
                .filter_map(|&s| self.plan_of(s))
                .map(EnvPlan::id)
                .collect();

            let old = to_old(self.syntax_map, function.anchor).and_then(|a| {
                self.previous
                    .lambdas
                    .iter()
                    .enumerate()
                    .position(|(i, l)| !claimed[i] && l.anchor == a)
            });

            let (id, change) = match old {
                Some(i) => {
                    claimed[i] = true;
                    let old = &self.previous.lambdas[i];
                    let reusable = old.kind == target.kind
                        && old.function_kind == function.kind
                        && old.host == host
                        && old.struct_envs == struct_envs;
                    if reusable {
                        (old.id, LambdaChange::Reused)
                    } else {
                        retired.push(RetiredLambda {
                            record: old.clone(),
                            reason: RetireReason::Rehosted,
                        });
                        (
                            DebugId::new(old.id.ordinal, self.generation),
                            LambdaChange::Rehosted { previous: old.id },
                        )
                    }
                }
                None => {
                    let id = DebugId::new(next_ordinal, self.generation);
                    next_ordinal += 1;
                    (id, LambdaChange::New)
                }
            };

            tracing::trace!(function = f.raw(), %id, ?change, kind = ?target.kind, "lambda planned");
            plans.push(LambdaPlan {
                function: f,
                record: LambdaRecord {
                    anchor: function.anchor,
                    id,
                    function_kind: function.kind,
                    local_name: function.name,
                    kind: target.kind,
                    host,
                    struct_envs,
                    params: function.params.clone(),
                    ret: function.ret.clone(),
                },
                change,
            });
        }

        for (i, old) in self.previous.lambdas.iter().enumerate() {
            if !claimed[i] {
                retired.push(RetiredLambda {
                    record: old.clone(),
                    reason: RetireReason::Deleted,
                });
            }
        }
        retired.sort_by_key(|r| r.record.id);

        (plans, retired, next_ordinal)
    }
}

/// Link fields compare by presence only; their target is checked through the
/// parent relation.
fn link_element() -> (Name, SigType) {
    (Name::EMPTY, SigType::Primitive(Primitive::Object))
}

fn shape_of_fields(fields: &[EnvField]) -> RecordShape {
    RecordShape::new(
        fields
            .iter()
            .map(|f| match f {
                EnvField::This { ty } => (Name::EMPTY, SigType::lower(ty)),
                EnvField::Variable { name, ty, .. } => (*name, SigType::lower(ty)),
                EnvField::Link { .. } => link_element(),
            })
            .collect(),
    )
}
