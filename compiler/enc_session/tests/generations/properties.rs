//! Generated capture sets against session-wide guarantees.

use std::sync::Arc;

use proptest::prelude::*;

use enc_emit::TableIndex;
use enc_ir::{Anchor, CaptureAnalysis, CaptureAnalysisBuilder, StringInterner};
use enc_session::{EditSession, EmitOptions, SemanticEdit};

use crate::common::{cold_build, edit_f, int, nested, one_lambda, program, session};

const LOCALS: [&str; 3] = ["x", "y", "z"];

fn captures(mask: u8) -> Vec<&'static str> {
    LOCALS
        .iter()
        .enumerate()
        .filter(|(i, _)| mask & (1 << i) != 0)
        .map(|(_, name)| *name)
        .collect()
}

/// `F` with `count` locals and no nested functions.
fn plain_body(interner: &StringInterner, count: u32) -> CaptureAnalysis {
    let mut b = CaptureAnalysisBuilder::new(Anchor::new(0));
    for i in 0..count {
        let name = interner.intern(&format!("v{i}"));
        b.local(CaptureAnalysis::ROOT, name, int(), Anchor::new(i + 1));
    }
    b.finish()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        ..ProptestConfig::default()
    })]

    /// Methods without nested functions never produce synthesized types.
    #[test]
    fn prop_no_lambdas_no_synthesized_types(before in 0u32..5, after in 0u32..5) {
        let interner = StringInterner::shared();
        let mut session = session(&interner);
        cold_build(&mut session, Some(plain_body(&interner, before)));

        let output = session
            .apply(&edit_f(&interner, plain_body(&interner, after)))
            .expect("edit");

        prop_assert_eq!(output.delta.added_count(TableIndex::TypeDef), 0);
        prop_assert_eq!(output.delta.added_count(TableIndex::Field), 0);
        prop_assert!(output.manifest.types.iter().all(|t| !t.synthesized));
        prop_assert_eq!(output.delta.updated_methods(), vec![1]);
    }

    /// Preparing the same input twice yields identical deltas, and worker
    /// threads do not change the result.
    #[test]
    fn prop_prepare_is_deterministic(old in 0u8..8, new in 0u8..8) {
        let interner = StringInterner::shared();
        let mut sequential = session(&interner);
        let options = EmitOptions {
            threads: Some(2),
            ..EmitOptions::default()
        };
        let mut parallel = EditSession::new(Arc::clone(&interner), options);
        cold_build(&mut sequential, Some(one_lambda(&interner, &captures(old))));
        cold_build(&mut parallel, Some(one_lambda(&interner, &captures(old))));

        let g = program(&interner).g;
        let input = edit_f(&interner, one_lambda(&interner, &captures(new)))
            .with_edit(SemanticEdit::update(g));
        let first = sequential.prepare(&input).expect("first");
        let second = sequential.prepare(&input).expect("second");
        prop_assert_eq!(&first.delta, &second.delta);
        prop_assert_eq!(first.to_bytes(), second.to_bytes());
        prop_assert_eq!(&first.manifest, &second.manifest);

        let threaded = parallel.prepare(&input).expect("threaded");
        prop_assert_eq!(&first.delta, &threaded.delta);
    }

    /// Growing a capture set keeps every existing synthesized name.
    #[test]
    fn prop_grown_captures_keep_names(base in 1u8..8, extra in 0u8..8) {
        let interner = StringInterner::shared();
        let mut session = session(&interner);
        let before = captures(base);
        let after = captures(base | extra);
        cold_build(&mut session, Some(one_lambda(&interner, &before)));

        let output = session
            .apply(&edit_f(&interner, one_lambda(&interner, &after)))
            .expect("edit");

        let env = output
            .manifest
            .get(&nested("<>c__DisplayClass0_0"))
            .expect("environment keeps its name");
        prop_assert!(!env.retired);
        prop_assert!(env.method("<F>b__0_0").is_some_and(|m| !m.retired));
        let fields: Vec<&str> = env.fields.iter().map(|f| f.name.as_str()).collect();
        prop_assert_eq!(&fields[..before.len()], &before[..]);
        prop_assert_eq!(fields.len(), after.len());
        prop_assert_eq!(output.delta.added_count(TableIndex::TypeDef), 0);
        prop_assert_eq!(output.delta.added_count(TableIndex::MethodDef), 0);
    }
}
