//! ENC IR - inputs and identifiers for incremental delta emission
//!
//! This crate contains the data structures shared by every stage of the
//! edit-and-continue pipeline:
//! - Names for interned identifiers (one interner per edit session)
//! - Anchors and spans for stable, method-relative source positions
//! - Generations and debug ids for synthesized-member identity
//! - Declaration trees (types, methods, fields, parameters)
//! - Structural type references
//! - Per-method capture analysis produced by the semantic layer
//! - Syntax maps asserting anchor correspondence between generations
//!
//! # Design Philosophy
//!
//! - **Intern Everything**: identifiers are `Name(u32)`; the interner is shared
//!   by all generations of a session, so `Name` equality holds across them.
//! - **Flatten Everything**: declarations and scopes live in arenas and refer
//!   to each other through `u32` ids, never through pointers.
//! - **Structural Identity**: nothing here carries object identity across
//!   generations; matching is done on keys built from these structures.

mod capture;
mod decl;
mod generation;
mod interner;
mod name;
mod span;
mod syntax_map;
mod types;

pub use capture::{
    CaptureAnalysis, CaptureAnalysisBuilder, FunctionId, FunctionKind, LexicalScope,
    NestedFunction, ScopeId, VarId, Variable, VariableKind,
};
pub use decl::{
    BodyRef, DeclTree, DeclTreeBuilder, FieldDecl, FieldDeclId, MethodDecl, MethodDeclId,
    ParamDecl, TypeDecl, TypeDeclId, TypeKind,
};
pub use generation::{DebugId, Generation};
pub use interner::{InternError, SharedInterner, StringInterner};
pub use name::Name;
pub use span::{Anchor, Span};
pub use syntax_map::SyntaxMap;
pub use types::{Primitive, RefKind, TupleElement, TypeParamOwner, TypeRef};
