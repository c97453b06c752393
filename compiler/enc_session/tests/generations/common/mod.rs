//! Shared fixture for generation tests.
//!
//! The program under edit is always
//!
//! ```text
//! namespace App {
//!     class Program {
//!         void F() { ... }
//!         static int G() { ... }
//!     }
//! }
//! ```
//!
//! and each test supplies the capture analysis of `F`'s body.

use std::sync::Arc;

use enc_ir::{
    Anchor, BodyRef, CaptureAnalysis, CaptureAnalysisBuilder, DeclTree, DeclTreeBuilder,
    MethodDecl, MethodDeclId, ParamDecl, Primitive, SharedInterner, StringInterner, SyntaxMap,
    TypeDecl, TypeRef,
};
use enc_session::{EditSession, EmitOptions, GenerationInput, GenerationOutput, SemanticEdit};

const ROOT: enc_ir::ScopeId = CaptureAnalysis::ROOT;

pub fn int() -> TypeRef {
    TypeRef::prim(Primitive::I32)
}

/// `App.Program+{name}`.
pub fn nested(name: &str) -> String {
    format!("App.Program+{name}")
}

pub struct Program {
    pub decls: DeclTree,
    pub f: MethodDeclId,
    pub g: MethodDeclId,
}

pub fn program(interner: &StringInterner) -> Program {
    program_variant(interner, None, false)
}

/// The fixture program, optionally deriving from `base` and with an `int a`
/// parameter on `F`.
pub fn program_variant(interner: &StringInterner, base: Option<&str>, f_param: bool) -> Program {
    let app = interner.intern("App");
    let mut b = DeclTreeBuilder::new();
    let mut ty = TypeDecl::class(&[app], interner.intern("Program"));
    if let Some(base) = base {
        ty = ty.with_base(TypeRef::named(&[app], interner.intern(base)));
    }
    let program = b.add_type(ty);

    let mut f_decl =
        MethodDecl::new(interner.intern("F"), TypeRef::prim(Primitive::Void)).with_body(BodyRef(1));
    if f_param {
        f_decl = f_decl.with_param(ParamDecl::new(interner.intern("a"), int()));
    }
    let f = b.add_method(program, f_decl);
    let g = b.add_method(
        program,
        MethodDecl::new(interner.intern("G"), int())
            .with_static()
            .with_body(BodyRef(2)),
    );
    Program {
        decls: b.finish(),
        f,
        g,
    }
}

pub fn session(interner: &SharedInterner) -> EditSession {
    EditSession::new(Arc::clone(interner), EmitOptions::sequential())
}

/// Apply the cold build, with `analysis` as `F`'s body when given.
pub fn cold_build(session: &mut EditSession, analysis: Option<CaptureAnalysis>) -> GenerationOutput {
    let program = program(session.interner());
    let f = program.f;
    let mut input = GenerationInput::cold_build(program.decls);
    if let Some(analysis) = analysis {
        input = input.with_analysis(f, analysis);
    }
    session.apply(&input).expect("cold build")
}

/// An edit of `F`'s body, matched by the symbol matcher.
pub fn edit_f(interner: &StringInterner, analysis: CaptureAnalysis) -> GenerationInput {
    let program = program(interner);
    let f = program.f;
    GenerationInput::new(program.decls)
        .with_edit(SemanticEdit::update(f))
        .with_analysis(f, analysis)
}

/// `F() { int x; int y; int z; () => ... }` with the lambda capturing
/// `captures`. Anchors: root 0, `x` 1, `y` 2, `z` 3, lambda 10, all moved
/// by `shift`.
pub fn one_lambda_at(interner: &StringInterner, captures: &[&str], shift: u32) -> CaptureAnalysis {
    let at = |n: u32| Anchor::new(n + shift);
    let mut b = CaptureAnalysisBuilder::new(at(0));
    let locals = [
        b.local(ROOT, interner.intern("x"), int(), at(1)),
        b.local(ROOT, interner.intern("y"), int(), at(2)),
        b.local(ROOT, interner.intern("z"), int(), at(3)),
    ];
    let lambda = b.lambda(ROOT, at(10), int());
    for (var, name) in locals.into_iter().zip(["x", "y", "z"]) {
        if captures.contains(&name) {
            b.capture(lambda, var);
        }
    }
    b.finish()
}

pub fn one_lambda(interner: &StringInterner, captures: &[&str]) -> CaptureAnalysis {
    one_lambda_at(interner, captures, 0)
}

/// Maps every anchor of [`one_lambda_at`] with `shift` back to the unshifted
/// one.
pub fn shift_map(shift: u32) -> SyntaxMap {
    [0, 1, 2, 3, 10]
        .into_iter()
        .map(|n| (Anchor::new(n + shift), Anchor::new(n)))
        .collect()
}

/// `F() { int x; int y; }` with no nested functions.
pub fn locals_only(interner: &StringInterner) -> CaptureAnalysis {
    let mut b = CaptureAnalysisBuilder::new(Anchor::new(0));
    b.local(ROOT, interner.intern("x"), int(), Anchor::new(1));
    b.local(ROOT, interner.intern("y"), int(), Anchor::new(2));
    b.finish()
}

/// `F() { { int a; () => a; } { int b; () => b; } }`
pub fn siblings(interner: &StringInterner) -> CaptureAnalysis {
    let mut b = CaptureAnalysisBuilder::new(Anchor::new(0));
    let s1 = b.scope(ROOT, Anchor::new(20));
    let a = b.local(s1, interner.intern("a"), int(), Anchor::new(21));
    let l1 = b.lambda(s1, Anchor::new(25), int());
    b.capture(l1, a);
    let s2 = b.scope(ROOT, Anchor::new(30));
    let bv = b.local(s2, interner.intern("b"), int(), Anchor::new(31));
    let l2 = b.lambda(s2, Anchor::new(35), int());
    b.capture(l2, bv);
    b.finish()
}

/// `F() { { int y; { int z; () => z (+ y); } } }`
pub fn nested_scopes(interner: &StringInterner, capture_y: bool) -> CaptureAnalysis {
    let mut b = CaptureAnalysisBuilder::new(Anchor::new(0));
    let outer = b.scope(ROOT, Anchor::new(20));
    let y = b.local(outer, interner.intern("y"), int(), Anchor::new(21));
    let inner = b.scope(outer, Anchor::new(30));
    let z = b.local(inner, interner.intern("z"), int(), Anchor::new(31));
    let lambda = b.lambda(inner, Anchor::new(35), int());
    b.capture(lambda, z);
    if capture_y {
        b.capture(lambda, y);
    }
    b.finish()
}
