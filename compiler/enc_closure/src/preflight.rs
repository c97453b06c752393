//! Pre-flight capture checks.
//!
//! Compares the new capture analysis with the previous generation's closure
//! records before any matching happens, so that an edit which would
//! invalidate a live environment is rejected early.

use enc_diagnostic::{RudeEdit, RudeEditKind};
use enc_ir::{Anchor, CaptureAnalysis, Span, SyntaxMap};
use enc_symbols::{SigParam, SigType};

use crate::{ClosureForest, EnvField, MethodClosures};

/// Translate a new anchor to the previous generation's anchor space.
pub(crate) fn to_old(syntax_map: Option<&SyntaxMap>, anchor: Anchor) -> Option<Anchor> {
    match syntax_map {
        Some(map) => map.map(anchor),
        None => Some(anchor),
    }
}

/// Rude edits in one method's closures. `method` names the method in
/// diagnostics and `span` locates it.
pub fn closure_rude_edits(
    analysis: &CaptureAnalysis,
    forest: &ClosureForest,
    previous: &MethodClosures,
    syntax_map: Option<&SyntaxMap>,
    method: &str,
    span: Span,
) -> Vec<RudeEdit> {
    let mut edits = Vec::new();
    let mut report = |kind| edits.push(RudeEdit::new(kind, span, method));

    for scope in forest.environments() {
        let env = forest.scope(scope);
        for &var in &env.captured {
            let variable = analysis.variable(var);
            let Some(old_anchor) = to_old(syntax_map, variable.anchor) else {
                continue;
            };
            let Some((old_env, old_field)) = previous.field_of_variable(old_anchor) else {
                continue;
            };
            if let EnvField::Variable { name, ty, .. } = old_field {
                if *name != variable.name {
                    report(RudeEditKind::RenamingCapturedVariable);
                }
                if SigType::lower(ty) != SigType::lower(&variable.ty) {
                    report(RudeEditKind::ChangingCapturedVariableType);
                }
            }
            if to_old(syntax_map, env.anchor) != Some(old_env.anchor) {
                report(RudeEditKind::ChangingCapturedVariableScope);
            }
        }
    }

    for f in analysis.function_ids() {
        let function = analysis.function(f);
        let Some(old) = to_old(syntax_map, function.anchor)
            .and_then(|anchor| previous.lambda_by_anchor(anchor))
        else {
            continue;
        };
        if old.function_kind != function.kind {
            report(RudeEditKind::SwitchBetweenLambdaAndLocalFunction);
            continue;
        }
        let old_params: Vec<SigParam> = old.params.iter().map(SigParam::lower).collect();
        let new_params: Vec<SigParam> = function.params.iter().map(SigParam::lower).collect();
        if old_params != new_params {
            report(RudeEditKind::ChangingLambdaParameters);
        }
        if SigType::lower(&old.ret) != SigType::lower(&function.ret) {
            report(RudeEditKind::ChangingLambdaReturnType);
        }
    }

    if !edits.is_empty() {
        tracing::debug!(method, count = edits.len(), "closure rude edits");
    }
    edits
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use enc_ir::{
        CaptureAnalysisBuilder, DebugId, FunctionKind, Generation, ParamDecl, Primitive,
        StringInterner, TypeRef,
    };

    use super::*;
    use crate::{build_forest, ClosureKind, EnvRecord, LambdaRecord, Representation};

    const ROOT: enc_ir::ScopeId = CaptureAnalysis::ROOT;

    fn int() -> TypeRef {
        TypeRef::prim(Primitive::I32)
    }

    fn previous(interner: &StringInterner) -> MethodClosures {
        MethodClosures {
            envs: vec![EnvRecord {
                anchor: Anchor::new(0),
                id: DebugId::new(0, Generation::INITIAL),
                representation: Representation::HeapRecord,
                parent: None,
                fields: vec![EnvField::Variable {
                    name: interner.intern("x"),
                    ty: int(),
                    anchor: Anchor::new(1),
                }],
                shape: Generation::INITIAL,
            }],
            lambdas: vec![LambdaRecord {
                anchor: Anchor::new(5),
                id: DebugId::new(0, Generation::INITIAL),
                function_kind: FunctionKind::Lambda,
                local_name: enc_ir::Name::EMPTY,
                kind: ClosureKind::General,
                host: Some(DebugId::new(0, Generation::INITIAL)),
                struct_envs: Vec::new(),
                params: Vec::new(),
                ret: int(),
            }],
            next_closure_ordinal: 1,
            next_lambda_ordinal: 1,
        }
    }

    fn check(analysis: &CaptureAnalysis, previous: &MethodClosures) -> Vec<RudeEditKind> {
        let forest = build_forest(analysis);
        closure_rude_edits(analysis, &forest, previous, None, "C.F", Span::DUMMY)
            .into_iter()
            .map(|e| e.kind)
            .collect()
    }

    #[test]
    fn test_unchanged_closure_is_clean() {
        let interner = StringInterner::new();
        let mut b = CaptureAnalysisBuilder::new(Anchor::new(0));
        let x = b.local(ROOT, interner.intern("x"), int(), Anchor::new(1));
        let f = b.lambda(ROOT, Anchor::new(5), int());
        b.capture(f, x);
        assert!(check(&b.finish(), &previous(&interner)).is_empty());
    }

    #[test]
    fn test_renamed_and_retyped_capture() {
        let interner = StringInterner::new();
        let mut b = CaptureAnalysisBuilder::new(Anchor::new(0));
        let x = b.local(
            ROOT,
            interner.intern("renamed"),
            TypeRef::prim(Primitive::I64),
            Anchor::new(1),
        );
        let f = b.lambda(ROOT, Anchor::new(5), int());
        b.capture(f, x);
        assert_eq!(
            check(&b.finish(), &previous(&interner)),
            vec![
                RudeEditKind::RenamingCapturedVariable,
                RudeEditKind::ChangingCapturedVariableType,
            ]
        );
    }

    #[test]
    fn test_capture_moved_to_other_scope() {
        let interner = StringInterner::new();
        let mut b = CaptureAnalysisBuilder::new(Anchor::new(0));
        let block = b.scope(ROOT, Anchor::new(3));
        let x = b.local(block, interner.intern("x"), int(), Anchor::new(1));
        let f = b.lambda(block, Anchor::new(5), int());
        b.capture(f, x);
        assert_eq!(
            check(&b.finish(), &previous(&interner)),
            vec![RudeEditKind::ChangingCapturedVariableScope]
        );
    }

    #[test]
    fn test_lambda_signature_and_kind_changes() {
        let interner = StringInterner::new();
        let mut b = CaptureAnalysisBuilder::new(Anchor::new(0));
        let f = b.lambda(ROOT, Anchor::new(5), TypeRef::prim(Primitive::String));
        b.param(f, ParamDecl::new(interner.intern("p"), int()));
        assert_eq!(
            check(&b.finish(), &previous(&interner)),
            vec![
                RudeEditKind::ChangingLambdaParameters,
                RudeEditKind::ChangingLambdaReturnType,
            ]
        );

        let mut b = CaptureAnalysisBuilder::new(Anchor::new(0));
        b.local_function(ROOT, interner.intern("G"), Anchor::new(5), int());
        assert_eq!(
            check(&b.finish(), &previous(&interner)),
            vec![RudeEditKind::SwitchBetweenLambdaAndLocalFunction]
        );
    }
}
