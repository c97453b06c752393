//! Where the variables of a suspended frame of `F` live after a delta.

use pretty_assertions::assert_eq;

use enc_ir::{Anchor, StringInterner};
use enc_session::{GenerationInput, Rebind, SemanticEdit};

use crate::common::{
    cold_build, edit_f, locals_only, nested, nested_scopes, one_lambda, one_lambda_at, program,
    session, shift_map,
};

fn field(environment: &str, field: &str, path: &[&str]) -> Rebind {
    Rebind::EnvironmentField {
        environment: nested(environment),
        field: field.to_owned(),
        path: path.iter().map(|p| nested(p)).collect(),
    }
}

#[test]
fn test_captured_variable_lives_in_its_environment() {
    let interner = StringInterner::shared();
    let mut session = session(&interner);
    cold_build(&mut session, Some(one_lambda(&interner, &["x"])));

    let output = session
        .apply(&edit_f(&interner, one_lambda(&interner, &["x"])))
        .expect("generation 1");
    let program = program(&interner);

    assert_eq!(
        output.rebind(program.f, Anchor::new(1)),
        Some(field("<>c__DisplayClass0_0", "x", &[]))
    );
    assert_eq!(output.rebind(program.f, Anchor::new(2)), Some(Rebind::Local));
    assert_eq!(output.rebind(program.f, Anchor::new(99)), Some(Rebind::Removed));
    assert_eq!(output.rebind(program.g, Anchor::new(1)), None);
}

#[test]
fn test_variable_no_longer_captured_becomes_local() {
    let interner = StringInterner::shared();
    let mut session = session(&interner);
    cold_build(&mut session, Some(one_lambda(&interner, &["x"])));

    let output = session
        .apply(&edit_f(&interner, locals_only(&interner)))
        .expect("generation 1");
    let f = program(&interner).f;

    assert_eq!(output.rebind(f, Anchor::new(1)), Some(Rebind::Local));
    assert_eq!(output.rebind(f, Anchor::new(2)), Some(Rebind::Local));
    // `z` is gone from the new body.
    assert_eq!(output.rebind(f, Anchor::new(3)), Some(Rebind::Removed));
}

#[test]
fn test_rebind_follows_syntax_map() {
    let interner = StringInterner::shared();
    let mut session = session(&interner);
    cold_build(&mut session, Some(one_lambda(&interner, &["x"])));

    let program = program(&interner);
    let f = program.f;
    let input = GenerationInput::new(program.decls)
        .with_edit(SemanticEdit::update_of(f, f, shift_map(100)))
        .with_analysis(f, one_lambda_at(&interner, &["x"], 100));
    let output = session.apply(&input).expect("generation 1");

    // Keyed by the anchors of the suspended frame, which are the old ones.
    assert_eq!(
        output.rebind(f, Anchor::new(1)),
        Some(field("<>c__DisplayClass0_0", "x", &[]))
    );
    assert_eq!(output.rebind(f, Anchor::new(101)), Some(Rebind::Removed));
    assert!(output.plan(f).is_some_and(|p| p.is_shape_stable()));
}

#[test]
fn test_nested_environment_reports_enclosing_path() {
    let interner = StringInterner::shared();
    let mut session = session(&interner);
    cold_build(&mut session, Some(nested_scopes(&interner, true)));

    let output = session
        .apply(&edit_f(&interner, nested_scopes(&interner, true)))
        .expect("generation 1");
    let f = program(&interner).f;

    assert_eq!(
        output.rebind(f, Anchor::new(31)),
        Some(field(
            "<>c__DisplayClass0_1",
            "z",
            &["<>c__DisplayClass0_0"]
        ))
    );
    assert_eq!(
        output.rebind(f, Anchor::new(21)),
        Some(field("<>c__DisplayClass0_0", "y", &[]))
    );
}
