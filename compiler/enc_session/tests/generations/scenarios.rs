//! Environment creation, growth, supersession, flattening, and elision.

use pretty_assertions::assert_eq;

use enc_closure::{EnvChange, LambdaChange};
use enc_emit::{EncLogEntry, RowOperation, TableIndex, Token};
use enc_ir::{DebugId, Generation, StringInterner};
use enc_session::GenerationOutput;

use crate::common::{
    cold_build, edit_f, nested, nested_scopes, one_lambda, program, session, siblings,
};

fn field_names(output: &GenerationOutput, ty: &str) -> Vec<String> {
    let ty = output
        .manifest
        .get(&nested(ty))
        .unwrap_or_else(|| panic!("{ty} missing from manifest:\n{}", output.manifest));
    ty.fields.iter().map(|f| f.name.clone()).collect()
}

fn method_names(output: &GenerationOutput, ty: &str) -> Vec<String> {
    let ty = output
        .manifest
        .get(&nested(ty))
        .unwrap_or_else(|| panic!("{ty} missing from manifest:\n{}", output.manifest));
    ty.methods.iter().map(|m| m.name.clone()).collect()
}

fn retired(output: &GenerationOutput, ty: &str) -> bool {
    output.manifest.get(&nested(ty)).is_some_and(|t| t.retired)
}

#[test]
fn test_cold_build_emits_user_declarations_only() {
    let interner = StringInterner::shared();
    let mut session = session(&interner);
    let output = cold_build(&mut session, None);

    assert_eq!(output.generation, Generation::INITIAL);
    assert_eq!(output.delta.added_count(TableIndex::TypeDef), 2);
    assert_eq!(output.delta.added_count(TableIndex::MethodDef), 2);
    assert!(output.delta.updated_methods().is_empty());

    let module = output.delta.row(Token::new(TableIndex::TypeDef, 1));
    assert!(module.is_some_and(|r| matches!(
        &r.data,
        enc_emit::RowData::TypeDef { name, .. } if name == "<Module>"
    )));

    assert_eq!(output.manifest.len(), 1);
    let program = output.manifest.get("App.Program").expect("program type");
    assert!(!program.synthesized);
    let methods: Vec<&str> = program.methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(methods, ["F", "G"]);
    assert_eq!(session.baseline().generation(), Some(Generation::INITIAL));
}

#[test]
fn test_lambda_added_to_plain_method() {
    let interner = StringInterner::shared();
    let mut session = session(&interner);
    cold_build(&mut session, None);

    let output = session
        .apply(&edit_f(&interner, one_lambda(&interner, &["x"])))
        .expect("generation 1");
    let delta = &output.delta;

    assert_eq!(delta.added_count(TableIndex::TypeDef), 1);
    assert_eq!(delta.added_count(TableIndex::NestedClass), 1);
    assert_eq!(delta.added_count(TableIndex::Field), 1);
    assert_eq!(delta.added_count(TableIndex::MethodDef), 1);

    // Only F's own body is replaced.
    let modified: Vec<Token> = delta.rows.iter().filter(|r| !r.added).map(|r| r.token()).collect();
    assert_eq!(modified, [Token::new(TableIndex::MethodDef, 1)]);

    let env = "<>c__DisplayClass0_0#1";
    assert_eq!(field_names(&output, env), ["x"]);
    assert_eq!(method_names(&output, env), ["<F>b__0_0#1"]);

    // The field is attached to the new type before its own row record.
    let env_row = delta.rows_in(TableIndex::TypeDef).next().expect("env row").row;
    let field = Token::new(TableIndex::Field, 1);
    let attach = delta
        .enc_log
        .iter()
        .position(|e| {
            *e == EncLogEntry {
                token: Token::new(TableIndex::TypeDef, env_row),
                operation: RowOperation::AddField { type_def: env_row },
            }
        })
        .expect("attach entry");
    assert_eq!(
        delta.enc_log[attach + 1],
        EncLogEntry {
            token: field,
            operation: RowOperation::Default,
        }
    );
}

#[test]
fn test_dropped_capture_supersedes_environment() {
    let interner = StringInterner::shared();
    let mut session = session(&interner);
    cold_build(&mut session, None);
    session
        .apply(&edit_f(&interner, one_lambda(&interner, &["x"])))
        .expect("generation 1");

    let output = session
        .apply(&edit_f(&interner, one_lambda(&interner, &["z"])))
        .expect("generation 2");

    let plan = output.plan(program(&interner).f).expect("plan of F");
    assert_eq!(
        plan.envs[0].change,
        EnvChange::Superseded {
            previous: DebugId::new(0, Generation::new(1)),
        }
    );
    assert_eq!(
        plan.lambdas[0].change,
        LambdaChange::Rehosted {
            previous: DebugId::new(0, Generation::new(1)),
        }
    );

    assert_eq!(field_names(&output, "<>c__DisplayClass0_0#2"), ["z"]);
    assert_eq!(method_names(&output, "<>c__DisplayClass0_0#2"), ["<F>b__0_0#2"]);
    assert!(!retired(&output, "<>c__DisplayClass0_0#2"));

    // The superseded type keeps its rows, unreferenced.
    assert!(retired(&output, "<>c__DisplayClass0_0#1"));
    assert_eq!(field_names(&output, "<>c__DisplayClass0_0#1"), ["x"]);
    let old = output
        .manifest
        .get(&nested("<>c__DisplayClass0_0#1"))
        .and_then(|t| t.method("<F>b__0_0#1"))
        .expect("old lambda");
    assert!(old.retired);
}

#[test]
fn test_capture_free_lambda_moves_to_static_container() {
    let interner = StringInterner::shared();
    let mut session = session(&interner);
    cold_build(&mut session, None);
    session
        .apply(&edit_f(&interner, one_lambda(&interner, &["x"])))
        .expect("generation 1");

    let output = session
        .apply(&edit_f(&interner, one_lambda(&interner, &[])))
        .expect("generation 2");

    assert_eq!(field_names(&output, "<>c#2"), ["<>9", "<>9__0_0#2"]);
    assert_eq!(method_names(&output, "<>c#2"), ["<F>b__0_0#2"]);
    assert!(retired(&output, "<>c__DisplayClass0_0#1"));
    assert_eq!(
        session.baseline().static_container(&enc_symbols::TypeKey::top_level(
            &[interner.intern("App")],
            interner.intern("Program"),
        )),
        Some(Generation::new(2))
    );
}

#[test]
fn test_grown_capture_set_extends_environment() {
    let interner = StringInterner::shared();
    let mut session = session(&interner);
    cold_build(&mut session, Some(one_lambda(&interner, &["x"])));

    let output = session
        .apply(&edit_f(&interner, one_lambda(&interner, &["x", "y"])))
        .expect("generation 1");
    let delta = &output.delta;

    assert_eq!(delta.added_count(TableIndex::TypeDef), 0);
    assert_eq!(delta.added_count(TableIndex::Field), 1);
    assert_eq!(delta.added_count(TableIndex::MethodDef), 0);

    let env = "<>c__DisplayClass0_0";
    assert_eq!(field_names(&output, env), ["x", "y"]);
    assert_eq!(method_names(&output, env), ["<F>b__0_0"]);
    let ty = output.manifest.get(&nested(env)).expect("env");
    assert_eq!(ty.created, Generation::INITIAL);
    assert_eq!(ty.shape, Generation::new(1));

    // F and the reused lambda get new bodies; the lambda row is unchanged.
    assert_eq!(delta.updated_methods(), [1, 3]);
}

#[test]
fn test_unchanged_shape_only_replaces_bodies() {
    let interner = StringInterner::shared();
    let mut session = session(&interner);
    cold_build(&mut session, Some(one_lambda(&interner, &["x", "y"])));
    let before = session.baseline().manifest(&interner);

    let output = session
        .apply(&edit_f(&interner, one_lambda(&interner, &["x", "y"])))
        .expect("generation 1");

    assert!(output.delta.rows.iter().all(|r| !r.added));
    assert!(output
        .delta
        .rows
        .iter()
        .all(|r| r.table == TableIndex::MethodDef));
    assert_eq!(output.delta.updated_methods(), [1, 3]);
    assert!(output
        .plan(program(&interner).f)
        .is_some_and(enc_closure::ClosurePlan::is_shape_stable));
    assert_eq!(output.manifest, before);
}

#[test]
fn test_sibling_scopes_get_independent_environments() {
    let interner = StringInterner::shared();
    let mut session = session(&interner);
    let output = cold_build(&mut session, Some(siblings(&interner)));

    assert_eq!(field_names(&output, "<>c__DisplayClass0_0"), ["a"]);
    assert_eq!(field_names(&output, "<>c__DisplayClass0_1"), ["b"]);
    assert_eq!(method_names(&output, "<>c__DisplayClass0_0"), ["<F>b__0_0"]);
    assert_eq!(method_names(&output, "<>c__DisplayClass0_1"), ["<F>b__0_1"]);

    let plan = output.plan(program(&interner).f).expect("plan of F");
    assert_eq!(plan.envs.len(), 2);
    assert!(plan.envs.iter().all(|e| e.record.parent.is_none()));
}

#[test]
fn test_scope_without_captures_is_elided() {
    let interner = StringInterner::shared();
    let mut session = session(&interner);
    let cold = cold_build(&mut session, Some(nested_scopes(&interner, true)));

    assert_eq!(field_names(&cold, "<>c__DisplayClass0_0"), ["y"]);
    assert_eq!(
        field_names(&cold, "<>c__DisplayClass0_1"),
        ["z", "<>8__locals0"]
    );

    let output = session
        .apply(&edit_f(&interner, nested_scopes(&interner, false)))
        .expect("generation 1");

    let plan = output.plan(program(&interner).f).expect("plan of F");
    assert_eq!(plan.envs.len(), 1);
    assert!(plan.envs[0].record.parent.is_none());
    assert_eq!(plan.retired_envs.len(), 2);

    assert_eq!(field_names(&output, "<>c__DisplayClass0_1#1"), ["z"]);
    assert!(retired(&output, "<>c__DisplayClass0_0"));
    assert!(retired(&output, "<>c__DisplayClass0_1"));
}

#[test]
fn test_scope_gaining_new_parent_is_superseded() {
    let interner = StringInterner::shared();
    let mut session = session(&interner);
    let cold = cold_build(&mut session, Some(nested_scopes(&interner, false)));
    assert_eq!(field_names(&cold, "<>c__DisplayClass0_0"), ["z"]);

    let output = session
        .apply(&edit_f(&interner, nested_scopes(&interner, true)))
        .expect("generation 1");

    let plan = output.plan(program(&interner).f).expect("plan of F");
    assert_eq!(plan.envs.len(), 2);
    let outer = plan
        .envs
        .iter()
        .find(|e| e.record.parent.is_none())
        .expect("outer record");
    let inner = plan
        .envs
        .iter()
        .find(|e| e.record.parent.is_some())
        .expect("inner record");
    assert_eq!(outer.change, EnvChange::New);
    assert_eq!(
        inner.change,
        EnvChange::Superseded {
            previous: DebugId::new(0, Generation::INITIAL)
        }
    );
    assert_eq!(inner.record.parent, Some(outer.id()));
    assert!(matches!(
        plan.lambdas[0].change,
        LambdaChange::Rehosted { .. }
    ));

    assert_eq!(field_names(&output, "<>c__DisplayClass0_1#1"), ["y"]);
    assert_eq!(
        field_names(&output, "<>c__DisplayClass0_0#1"),
        ["z", "<>8__locals1#1"]
    );
    assert!(retired(&output, "<>c__DisplayClass0_0"));
}
