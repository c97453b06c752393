//! Rejected generations.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use enc_diagnostic::{EmitError, ErrorCode, RudeEditKind};
use enc_emit::TableIndex;
use enc_ir::{
    Anchor, CaptureAnalysis, CaptureAnalysisBuilder, Generation, StringInterner, SyntaxMap,
};
use enc_session::{GenerationInput, SemanticEdit};

use crate::common::{cold_build, edit_f, int, one_lambda, program, program_variant, session};

/// `F() { int w; () => w; }` with `w` at the anchor `x` used to have.
fn renamed_capture(interner: &StringInterner) -> CaptureAnalysis {
    let mut b = CaptureAnalysisBuilder::new(Anchor::new(0));
    let w = b.local(CaptureAnalysis::ROOT, interner.intern("w"), int(), Anchor::new(1));
    let lambda = b.lambda(CaptureAnalysis::ROOT, Anchor::new(10), int());
    b.capture(lambda, w);
    b.finish()
}

fn kinds(err: &EmitError) -> Vec<RudeEditKind> {
    err.rude_edits().iter().map(|e| e.kind).collect()
}

#[test]
fn test_rude_edit_leaves_baseline_untouched() {
    let interner = StringInterner::shared();
    let mut session = session(&interner);
    cold_build(&mut session, Some(one_lambda(&interner, &["x"])));
    let before = Arc::clone(session.baseline());

    let err = session
        .apply(&edit_f(&interner, renamed_capture(&interner)))
        .expect_err("renaming a captured variable is rude");

    assert!(err.is_rude_edit());
    assert_eq!(kinds(&err), [RudeEditKind::RenamingCapturedVariable]);
    assert_eq!(err.code(), ErrorCode::E0101);
    assert!(Arc::ptr_eq(session.baseline(), &before));
    assert_eq!(session.baseline().generation(), Some(Generation::INITIAL));

    // The same session still accepts a valid edit as generation 1.
    let output = session
        .apply(&edit_f(&interner, one_lambda(&interner, &["x", "y"])))
        .expect("valid edit");
    assert_eq!(output.generation, Generation::new(1));
}

#[test]
fn test_declaration_rude_edit_skips_capture_checks() {
    let interner = StringInterner::shared();
    let mut session = session(&interner);
    cold_build(&mut session, Some(one_lambda(&interner, &["x"])));

    let edited = program_variant(&interner, Some("Base"), false);
    let f = edited.f;
    let input = GenerationInput::new(edited.decls)
        .with_edit(SemanticEdit::update(f))
        .with_analysis(f, renamed_capture(&interner));
    let err = session.prepare(&input).expect_err("rude");

    // The renamed capture is never looked at.
    assert_eq!(kinds(&err), [RudeEditKind::BaseTypeUpdate]);
    assert_eq!(err.to_diagnostics().len(), 1);
}

#[test]
fn test_every_declaration_rude_edit_is_reported() {
    let interner = StringInterner::shared();
    let mut session = session(&interner);
    cold_build(&mut session, None);

    let old_f = program(&interner).f;
    let edited = program_variant(&interner, Some("Base"), true);
    let input = GenerationInput::new(edited.decls)
        .with_edit(SemanticEdit::update_of(edited.f, old_f, SyntaxMap::new()));
    let err = session.prepare(&input).expect_err("rude");

    let found = kinds(&err);
    assert!(found.contains(&RudeEditKind::BaseTypeUpdate));
    assert!(found.contains(&RudeEditKind::ChangingMethodSignature));
    assert_eq!(err.to_diagnostics().len(), found.len());
}

#[test]
fn test_asserted_update_with_new_signature_is_rude() {
    let interner = StringInterner::shared();
    let mut session = session(&interner);
    cold_build(&mut session, None);

    let old_f = program(&interner).f;
    let edited = program_variant(&interner, None, true);
    let input = GenerationInput::new(edited.decls)
        .with_edit(SemanticEdit::update_of(edited.f, old_f, SyntaxMap::new()));
    let err = session.prepare(&input).expect_err("rude");

    assert!(kinds(&err).contains(&RudeEditKind::ChangingMethodSignature));
}

#[test]
fn test_update_without_counterpart_is_an_insertion() {
    let interner = StringInterner::shared();
    let mut session = session(&interner);
    cold_build(&mut session, None);

    let edited = program_variant(&interner, None, true);
    let input = GenerationInput::new(edited.decls).with_edit(SemanticEdit::update(edited.f));
    let output = session.apply(&input).expect("insertion");

    assert_eq!(output.delta.added_count(TableIndex::MethodDef), 1);
    assert_eq!(output.delta.added_count(TableIndex::Param), 1);
    assert!(output.delta.updated_methods().is_empty());
    let program = output.manifest.get("App.Program").expect("program");
    let overloads = program.methods.iter().filter(|m| m.name == "F").count();
    assert_eq!(overloads, 2);
}

#[test]
fn test_stale_generation_cannot_be_committed() {
    let interner = StringInterner::shared();
    let mut session = session(&interner);
    cold_build(&mut session, None);

    let input = edit_f(&interner, one_lambda(&interner, &["x"]));
    let first = session.prepare(&input).expect("first");
    let second = session.prepare(&input).expect("second");
    session.commit(&first).expect("commit");

    let err = session.commit(&second).expect_err("stale");
    assert_eq!(
        err,
        EmitError::GenerationOutOfOrder {
            baseline: Generation::new(1),
            found: Generation::new(1),
        }
    );
}

#[test]
fn test_edit_of_missing_method_is_internal_error() {
    let interner = StringInterner::shared();
    let mut session = session(&interner);
    cold_build(&mut session, None);

    let input = GenerationInput::new(program(&interner).decls)
        .with_edit(SemanticEdit::insert(enc_ir::MethodDeclId::new(42)));
    let err = session.prepare(&input).expect_err("unknown method");

    assert!(!err.is_rude_edit());
    assert!(err.code().is_internal());
}
