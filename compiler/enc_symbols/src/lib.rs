//! Structural symbol matching between two generations.
//!
//! Declarations carry no identity across compilations. Two declarations are
//! the same logical symbol exactly when their keys are equal: container path,
//! name, arity, and lowered signature. Lowering keeps everything that affects
//! the physical representation and drops surface-only annotations.
//!
//! - [`key`]: [`SigType`] lowering and the per-kind key types
//! - [`SymbolMatcher`]: memoized new-to-old mapping over two declaration trees
//! - [`structural`]: name-and-type multiset matching for records that have no
//!   declared name (anonymous records, synthesized environments)
//! - [`declaration_rude_edits`]: shape checks on matched declarations

mod key;
mod matcher;
mod preflight;
pub mod structural;

pub use key::{FieldKey, MethodKey, ParamKey, SigParam, SigType, TypeKey};
pub use matcher::{AnonymousMatch, SymbolMap, SymbolMatcher};
pub use preflight::declaration_rude_edits;
