//! Symbol Matcher.
//!
//! Maps declarations of the edited generation onto the baseline generation by
//! key equality. An unmapped new declaration is an insertion; an unmapped old
//! declaration is simply never referenced again.

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use enc_ir::{DeclTree, FieldDeclId, MethodDeclId, Name, TypeDeclId, TypeRef};

use crate::structural::{match_shapes, RecordShape, ShapeMatch};
use crate::{FieldKey, MethodKey, SigType, TypeKey};

#[derive(Default)]
struct MatchCache {
    types: FxHashMap<TypeDeclId, Option<TypeDeclId>>,
    methods: FxHashMap<MethodDeclId, Option<MethodDeclId>>,
    fields: FxHashMap<FieldDeclId, Option<FieldDeclId>>,
}

/// Pairing of an anonymous record type with its baseline counterpart.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct AnonymousMatch {
    pub new: TypeRef,
    pub old: TypeRef,
    pub renamed: bool,
}

/// Result of matching every declaration of two trees.
#[derive(Clone, Default, Debug)]
pub struct SymbolMap {
    types: FxHashMap<TypeDeclId, TypeDeclId>,
    methods: FxHashMap<MethodDeclId, MethodDeclId>,
    fields: FxHashMap<FieldDeclId, FieldDeclId>,
    pub anonymous: Vec<AnonymousMatch>,
}

impl SymbolMap {
    pub fn get_type(&self, new: TypeDeclId) -> Option<TypeDeclId> {
        self.types.get(&new).copied()
    }

    pub fn get_method(&self, new: MethodDeclId) -> Option<MethodDeclId> {
        self.methods.get(&new).copied()
    }

    pub fn get_field(&self, new: FieldDeclId) -> Option<FieldDeclId> {
        self.fields.get(&new).copied()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

/// Matches one edited tree against its baseline.
///
/// Lookups are memoized and may be issued concurrently from worker threads.
pub struct SymbolMatcher<'a> {
    new: &'a DeclTree,
    old: &'a DeclTree,
    old_types: FxHashMap<TypeKey, TypeDeclId>,
    old_methods: FxHashMap<MethodKey, MethodDeclId>,
    old_fields: FxHashMap<FieldKey, FieldDeclId>,
    cache: RwLock<MatchCache>,
}

impl<'a> SymbolMatcher<'a> {
    pub fn new(new: &'a DeclTree, old: &'a DeclTree) -> Self {
        let mut old_types = FxHashMap::default();
        for id in old.type_ids() {
            old_types.entry(TypeKey::of(old, id)).or_insert(id);
        }
        let mut old_methods = FxHashMap::default();
        for id in old.method_ids() {
            old_methods.entry(MethodKey::of(old, id)).or_insert(id);
        }
        let mut old_fields = FxHashMap::default();
        for id in old.field_ids() {
            old_fields.entry(FieldKey::of(old, id)).or_insert(id);
        }
        SymbolMatcher {
            new,
            old,
            old_types,
            old_methods,
            old_fields,
            cache: RwLock::new(MatchCache::default()),
        }
    }

    pub fn new_tree(&self) -> &'a DeclTree {
        self.new
    }

    pub fn old_tree(&self) -> &'a DeclTree {
        self.old
    }

    pub fn map_type(&self, id: TypeDeclId) -> Option<TypeDeclId> {
        if let Some(&hit) = self.cache.read().types.get(&id) {
            return hit;
        }
        let found = self.old_types.get(&TypeKey::of(self.new, id)).copied();
        self.cache.write().types.insert(id, found);
        found
    }

    pub fn map_method(&self, id: MethodDeclId) -> Option<MethodDeclId> {
        if let Some(&hit) = self.cache.read().methods.get(&id) {
            return hit;
        }
        let found = self.old_methods.get(&MethodKey::of(self.new, id)).copied();
        self.cache.write().methods.insert(id, found);
        found
    }

    pub fn map_field(&self, id: FieldDeclId) -> Option<FieldDeclId> {
        if let Some(&hit) = self.cache.read().fields.get(&id) {
            return hit;
        }
        let found = self.old_fields.get(&FieldKey::of(self.new, id)).copied();
        self.cache.write().fields.insert(id, found);
        found
    }

    /// Look up a baseline method by key.
    pub fn old_method_by_key(&self, key: &MethodKey) -> Option<MethodDeclId> {
        self.old_methods.get(key).copied()
    }

    /// Match every declaration of the new tree.
    ///
    /// The resulting map is injective: when two new declarations share a key,
    /// only the first in declaration order is mapped.
    pub fn match_all(&self) -> SymbolMap {
        let mut map = SymbolMap::default();

        let mut used_types = FxHashSet::default();
        for id in self.new.type_ids() {
            if let Some(old) = self.map_type(id) {
                if used_types.insert(old) {
                    map.types.insert(id, old);
                }
            }
        }
        let mut used_methods = FxHashSet::default();
        for id in self.new.method_ids() {
            if let Some(old) = self.map_method(id) {
                if used_methods.insert(old) {
                    map.methods.insert(id, old);
                }
            }
        }
        let mut used_fields = FxHashSet::default();
        for id in self.new.field_ids() {
            if let Some(old) = self.map_field(id) {
                if used_fields.insert(old) {
                    map.fields.insert(id, old);
                }
            }
        }
        map.anonymous = self.match_anonymous_types();

        tracing::debug!(
            types = map.types.len(),
            methods = map.methods.len(),
            fields = map.fields.len(),
            anonymous = map.anonymous.len(),
            "matched symbols"
        );
        map
    }

    /// Pair the anonymous record types used by the two trees.
    pub fn match_anonymous_types(&self) -> Vec<AnonymousMatch> {
        let new_records = anonymous_types(self.new);
        let old_records = anonymous_types(self.old);
        if new_records.is_empty() || old_records.is_empty() {
            return Vec::new();
        }

        let new_shapes: Vec<RecordShape> = new_records.iter().map(shape_of).collect();
        let old_shapes: Vec<RecordShape> = old_records.iter().map(shape_of).collect();

        match_shapes(&new_shapes, &old_shapes, true)
            .into_iter()
            .enumerate()
            .filter_map(|(i, m)| {
                m.map(|(j, how)| AnonymousMatch {
                    new: new_records[i].clone(),
                    old: old_records[j].clone(),
                    renamed: how == ShapeMatch::Renamed,
                })
            })
            .collect()
    }
}

fn shape_of(record: &TypeRef) -> RecordShape {
    match record {
        TypeRef::Anonymous(elements) => RecordShape::new(
            elements
                .iter()
                .map(|(name, ty)| (*name, SigType::lower(ty)))
                .collect::<Vec<(Name, SigType)>>(),
        ),
        _ => RecordShape::new(Vec::new()),
    }
}

/// Distinct anonymous record types referenced by a tree, in first-use order.
fn anonymous_types(tree: &DeclTree) -> Vec<TypeRef> {
    let mut found: Vec<TypeRef> = Vec::new();
    let mut visit = |ty: &TypeRef| collect_anonymous(ty, &mut found);
    for id in tree.field_ids() {
        visit(&tree.field(id).ty);
    }
    for id in tree.method_ids() {
        let method = tree.method(id);
        for param in &method.params {
            visit(&param.ty);
        }
        visit(&method.ret);
    }
    found
}

fn collect_anonymous(ty: &TypeRef, found: &mut Vec<TypeRef>) {
    match ty {
        TypeRef::Anonymous(elements) => {
            for (_, inner) in elements {
                collect_anonymous(inner, found);
            }
            if !found.contains(ty) {
                found.push(ty.clone());
            }
        }
        TypeRef::Named { args, .. } => {
            for arg in args {
                collect_anonymous(arg, found);
            }
        }
        TypeRef::Tuple(elements) => {
            for element in elements {
                collect_anonymous(&element.ty, found);
            }
        }
        TypeRef::Array { element: inner, .. }
        | TypeRef::Pointer(inner)
        | TypeRef::NullableRef(inner)
        | TypeRef::Modified { inner, .. } => collect_anonymous(inner, found),
        TypeRef::Primitive(_) | TypeRef::TypeParam { .. } => {}
    }
}
