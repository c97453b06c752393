//! Names of synthesized members.
//!
//! Every name is a pure function of debug ids, so a member that keeps its id
//! keeps its name in every later generation. Ids minted after the cold build
//! render as `ordinal#generation`, which keeps a superseding member from ever
//! spelling the same as the one it replaces.
//!
//! | Member | Name |
//! |---|---|
//! | environment type | `<>c__DisplayClass{method}_{closure}` |
//! | lambda method | `<{F}>b__{method}_{lambda}` |
//! | local function | `<{F}>g__{Name}\|{method}_{lambda}` |
//! | static container | `<>c`, or `<>c#{generation}` after the cold build |
//! | singleton field | `<>9` |
//! | delegate cache field | `<>9__{method}_{lambda}` |
//! | enclosing instance field | `<>4__this` |
//! | parent link field | `<>8__locals{parent}` |

use rustc_hash::FxHashSet;

use enc_diagnostic::EmitError;
use enc_ir::{DebugId, Generation, Name, StringInterner};
use enc_symbols::TypeKey;

pub const STATIC_CONTAINER: &str = "<>c";
pub const SINGLETON_FIELD: &str = "<>9";
pub const THIS_FIELD: &str = "<>4__this";

pub fn display_class_name(method: DebugId, closure: DebugId) -> String {
    format!("<>c__DisplayClass{method}_{closure}")
}

pub fn lambda_method_name(containing: &str, method: DebugId, lambda: DebugId) -> String {
    format!("<{containing}>b__{method}_{lambda}")
}

pub fn local_function_name(
    containing: &str,
    local: &str,
    method: DebugId,
    lambda: DebugId,
) -> String {
    format!("<{containing}>g__{local}|{method}_{lambda}")
}

pub fn lambda_cache_field_name(method: DebugId, lambda: DebugId) -> String {
    format!("{SINGLETON_FIELD}__{method}_{lambda}")
}

pub fn static_container_name(created: Generation) -> String {
    if created.is_initial() {
        STATIC_CONTAINER.to_owned()
    } else {
        format!("{STATIC_CONTAINER}#{created}")
    }
}

pub fn link_field_name(parent: DebugId) -> String {
    format!("<>8__locals{parent}")
}

/// Per-generation registry of minted names.
///
/// Reused members are only interned; a member created in this generation is
/// minted, and minting the same name twice in one container is an internal
/// error.
pub struct NameAllocator<'a> {
    interner: &'a StringInterner,
    generation: Generation,
    minted: FxHashSet<(TypeKey, Name)>,
}

impl<'a> NameAllocator<'a> {
    pub fn new(interner: &'a StringInterner, generation: Generation) -> Self {
        NameAllocator {
            interner,
            generation,
            minted: FxHashSet::default(),
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Name of a member that already exists.
    pub fn existing(&self, name: &str) -> Name {
        self.interner.intern(name)
    }

    /// Name of a member created in this generation inside `container`.
    pub fn mint(&mut self, container: &TypeKey, name: &str) -> Result<Name, EmitError> {
        let interned = self.interner.intern(name);
        if !self.minted.insert((container.clone(), interned)) {
            return Err(EmitError::AllocatorCollision {
                name: format!("{}::{name}", container.qualified_name(self.interner)),
                generation: self.generation,
            });
        }
        tracing::trace!(name, generation = %self.generation, "minted name");
        Ok(interned)
    }

    pub fn minted_count(&self) -> usize {
        self.minted.len()
    }
}
