//! Retired lambdas and the sentinel exception.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use enc_emit::{DeltaRow, MethodBody, RowData, TableIndex, Token};
use enc_ir::StringInterner;
use enc_session::{
    sentinel_key, EditSession, EmitOptions, GenerationOutput, TRAP_DELETED, TRAP_REHOSTED,
};

use crate::common::{cold_build, edit_f, locals_only, nested, one_lambda, session};

const SENTINEL: &str = "System.Runtime.CompilerServices.HotReloadException";

fn body_of(output: &GenerationOutput, row: u32) -> Option<MethodBody> {
    match output.delta.row(Token::new(TableIndex::MethodDef, row)) {
        Some(DeltaRow {
            data: RowData::MethodDef { body, .. },
            ..
        }) => Some(*body),
        _ => None,
    }
}

#[test]
fn test_deleted_lambda_throws() {
    let interner = StringInterner::shared();
    let mut session = session(&interner);
    cold_build(&mut session, Some(one_lambda(&interner, &["x"])));

    let output = session
        .apply(&edit_f(&interner, locals_only(&interner)))
        .expect("generation 1");

    // F's new body and the trap on the old lambda.
    assert_eq!(output.delta.updated_methods(), [1, 3]);
    assert_eq!(
        body_of(&output, 3),
        Some(MethodBody::Trap { code: TRAP_DELETED })
    );

    let env = output
        .manifest
        .get(&nested("<>c__DisplayClass0_0"))
        .expect("old environment");
    assert!(env.retired);
    assert!(env.method("<F>b__0_0").is_some_and(|m| m.retired));

    let sentinel = output.manifest.get(SENTINEL).expect("sentinel type");
    assert!(sentinel.synthesized);
    assert!(sentinel.field("Code").is_some());
    assert!(sentinel.method(".ctor").is_some());
    assert!(session
        .baseline()
        .ledger()
        .type_row(&sentinel_key(&interner))
        .is_some());
}

#[test]
fn test_rehosted_lambda_throws_with_its_own_code() {
    let interner = StringInterner::shared();
    let mut session = session(&interner);
    cold_build(&mut session, Some(one_lambda(&interner, &["x"])));

    let output = session
        .apply(&edit_f(&interner, one_lambda(&interner, &["z"])))
        .expect("generation 1");

    assert_eq!(
        body_of(&output, 3),
        Some(MethodBody::Trap {
            code: TRAP_REHOSTED
        })
    );
    assert_ne!(TRAP_DELETED, TRAP_REHOSTED);
}

#[test]
fn test_sentinel_is_emitted_once() {
    let interner = StringInterner::shared();
    let mut session = session(&interner);
    cold_build(&mut session, Some(one_lambda(&interner, &["x"])));

    let first = session
        .apply(&edit_f(&interner, one_lambda(&interner, &["z"])))
        .expect("generation 1");
    assert_eq!(first.delta.added_count(TableIndex::TypeDef), 2);

    let second = session
        .apply(&edit_f(&interner, locals_only(&interner)))
        .expect("generation 2");
    assert_eq!(second.delta.added_count(TableIndex::TypeDef), 0);
    assert_eq!(second.delta.added_count(TableIndex::MethodDef), 0);

    let trapped: Vec<MethodBody> = second
        .delta
        .rows_in(TableIndex::MethodDef)
        .filter_map(|r| match r.data {
            RowData::MethodDef { body, .. } => Some(body),
            _ => None,
        })
        .filter(|b| matches!(b, MethodBody::Trap { .. }))
        .collect();
    assert_eq!(trapped, [MethodBody::Trap { code: TRAP_DELETED }]);
}

#[test]
fn test_traps_can_be_disabled() {
    let interner = StringInterner::shared();
    let options = EmitOptions {
        emit_traps: false,
        ..EmitOptions::sequential()
    };
    let mut session = EditSession::new(Arc::clone(&interner), options);
    cold_build(&mut session, Some(one_lambda(&interner, &["x"])));

    let output = session
        .apply(&edit_f(&interner, locals_only(&interner)))
        .expect("generation 1");

    assert_eq!(output.delta.updated_methods(), [1]);
    assert!(!output.manifest.contains_type(SENTINEL));
    // The old lambda is still retired, just left with its last body.
    let env = output
        .manifest
        .get(&nested("<>c__DisplayClass0_0"))
        .expect("old environment");
    assert!(env.method("<F>b__0_0").is_some_and(|m| m.retired));
}
