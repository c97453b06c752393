//! Resolved declaration trees.
//!
//! One [`DeclTree`] describes every user-authored type, field, and method of a
//! compiled generation. Declarations live in flat arenas and refer to each
//! other through ids, so a tree can be cloned, shared across worker threads,
//! and snapshotted without pointer fix-ups.

use crate::{Name, RefKind, Span, StringInterner, TypeRef};

macro_rules! decl_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
        #[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn new(index: u32) -> Self {
                $name(index)
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

decl_id!(
    /// Index of a type in its [`DeclTree`].
    TypeDeclId
);
decl_id!(
    /// Index of a method in its [`DeclTree`].
    MethodDeclId
);
decl_id!(
    /// Index of a field in its [`DeclTree`].
    FieldDeclId
);

/// Opaque handle to a compiled method body, owned by the code generator.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct BodyRef(pub u64);

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
}

impl TypeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeKind::Class => "class",
            TypeKind::Struct => "struct",
            TypeKind::Interface => "interface",
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeDecl {
    pub namespace: Vec<Name>,
    pub name: Name,
    /// Generic arity of the type itself, excluding enclosing types.
    pub arity: u16,
    pub kind: TypeKind,
    pub enclosing: Option<TypeDeclId>,
    pub base: Option<TypeRef>,
    pub explicit_layout: bool,
    pub fields: Vec<FieldDeclId>,
    pub methods: Vec<MethodDeclId>,
    pub span: Span,
}

impl TypeDecl {
    pub fn new(namespace: &[Name], name: Name, kind: TypeKind) -> Self {
        TypeDecl {
            namespace: namespace.to_vec(),
            name,
            arity: 0,
            kind,
            enclosing: None,
            base: None,
            explicit_layout: false,
            fields: Vec::new(),
            methods: Vec::new(),
            span: Span::DUMMY,
        }
    }

    pub fn class(namespace: &[Name], name: Name) -> Self {
        Self::new(namespace, name, TypeKind::Class)
    }

    #[must_use]
    pub fn with_arity(mut self, arity: u16) -> Self {
        self.arity = arity;
        self
    }

    #[must_use]
    pub fn with_base(mut self, base: TypeRef) -> Self {
        self.base = Some(base);
        self
    }

    #[must_use]
    pub fn nested_in(mut self, outer: TypeDeclId) -> Self {
        self.enclosing = Some(outer);
        self
    }

    #[must_use]
    pub fn with_explicit_layout(mut self) -> Self {
        self.explicit_layout = true;
        self
    }

    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn is_value_type(&self) -> bool {
        self.kind == TypeKind::Struct
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldDecl {
    pub owner: TypeDeclId,
    pub name: Name,
    pub ty: TypeRef,
    pub is_static: bool,
    pub span: Span,
}

impl FieldDecl {
    /// Instance field. The owner is set when the field is added to a builder.
    pub fn new(name: Name, ty: TypeRef) -> Self {
        FieldDecl {
            owner: TypeDeclId::new(0),
            name,
            ty,
            is_static: false,
            span: Span::DUMMY,
        }
    }

    #[must_use]
    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct ParamDecl {
    pub name: Name,
    pub ty: TypeRef,
    pub ref_kind: RefKind,
}

impl ParamDecl {
    pub fn new(name: Name, ty: TypeRef) -> Self {
        ParamDecl {
            name,
            ty,
            ref_kind: RefKind::None,
        }
    }

    #[must_use]
    pub fn by_ref(mut self, ref_kind: RefKind) -> Self {
        self.ref_kind = ref_kind;
        self
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct MethodDecl {
    pub owner: TypeDeclId,
    pub name: Name,
    /// Generic arity of the method.
    pub arity: u16,
    pub params: Vec<ParamDecl>,
    pub ret: TypeRef,
    pub is_static: bool,
    pub is_virtual: bool,
    /// Compiled body; `None` for abstract and extern methods.
    pub body: Option<BodyRef>,
    pub span: Span,
}

impl MethodDecl {
    /// Instance method. The owner is set when the method is added to a builder.
    pub fn new(name: Name, ret: TypeRef) -> Self {
        MethodDecl {
            owner: TypeDeclId::new(0),
            name,
            arity: 0,
            params: Vec::new(),
            ret,
            is_static: false,
            is_virtual: false,
            body: None,
            span: Span::DUMMY,
        }
    }

    #[must_use]
    pub fn with_param(mut self, param: ParamDecl) -> Self {
        self.params.push(param);
        self
    }

    #[must_use]
    pub fn with_arity(mut self, arity: u16) -> Self {
        self.arity = arity;
        self
    }

    #[must_use]
    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    #[must_use]
    pub fn with_virtual(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: BodyRef) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// Arena of every declaration in one compiled generation.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct DeclTree {
    types: Vec<TypeDecl>,
    fields: Vec<FieldDecl>,
    methods: Vec<MethodDecl>,
}

impl DeclTree {
    /// A tree with no declarations.
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn type_decl(&self, id: TypeDeclId) -> &TypeDecl {
        &self.types[id.index()]
    }

    #[inline]
    pub fn field(&self, id: FieldDeclId) -> &FieldDecl {
        &self.fields[id.index()]
    }

    #[inline]
    pub fn method(&self, id: MethodDeclId) -> &MethodDecl {
        &self.methods[id.index()]
    }

    pub fn get_method(&self, id: MethodDeclId) -> Option<&MethodDecl> {
        self.methods.get(id.index())
    }

    pub fn type_ids(&self) -> impl Iterator<Item = TypeDeclId> + '_ {
        (0..self.types.len()).map(|i| TypeDeclId::new(index_u32(i)))
    }

    pub fn field_ids(&self) -> impl Iterator<Item = FieldDeclId> + '_ {
        (0..self.fields.len()).map(|i| FieldDeclId::new(index_u32(i)))
    }

    pub fn method_ids(&self) -> impl Iterator<Item = MethodDeclId> + '_ {
        (0..self.methods.len()).map(|i| MethodDeclId::new(index_u32(i)))
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// Names of the enclosing types of `id`, outermost first.
    pub fn enclosing_names(&self, id: TypeDeclId) -> Vec<Name> {
        let mut chain = Vec::new();
        let mut current = self.type_decl(id).enclosing;
        while let Some(outer) = current {
            let decl = self.type_decl(outer);
            chain.push(decl.name);
            current = decl.enclosing;
        }
        chain.reverse();
        chain
    }

    /// Position of a method among its owner's methods.
    pub fn method_position(&self, id: MethodDeclId) -> usize {
        let owner = self.type_decl(self.method(id).owner);
        owner.methods.iter().position(|&m| m == id).unwrap_or(0)
    }

    /// Find a top-level or nested type by its simple name.
    pub fn find_type(&self, name: Name) -> Option<TypeDeclId> {
        self.type_ids().find(|&id| self.type_decl(id).name == name)
    }

    /// Find the first method named `name` declared on `owner`.
    pub fn find_method(&self, owner: TypeDeclId, name: Name) -> Option<MethodDeclId> {
        self.type_decl(owner)
            .methods
            .iter()
            .copied()
            .find(|&m| self.method(m).name == name)
    }

    /// `Namespace.Outer+Inner` rendering of a type.
    pub fn qualified_type_name(&self, id: TypeDeclId, interner: &StringInterner) -> String {
        let decl = self.type_decl(id);
        let mut out = String::new();
        for segment in &decl.namespace {
            out.push_str(interner.lookup(*segment));
            out.push('.');
        }
        for outer in self.enclosing_names(id) {
            out.push_str(interner.lookup(outer));
            out.push('+');
        }
        out.push_str(interner.lookup(decl.name));
        out
    }
}

#[inline]
fn index_u32(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

/// Incremental construction of a [`DeclTree`].
#[derive(Default)]
pub struct DeclTreeBuilder {
    tree: DeclTree,
}

impl DeclTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_type(&mut self, decl: TypeDecl) -> TypeDeclId {
        let id = TypeDeclId::new(index_u32(self.tree.types.len()));
        self.tree.types.push(decl);
        id
    }

    pub fn add_field(&mut self, owner: TypeDeclId, mut decl: FieldDecl) -> FieldDeclId {
        let id = FieldDeclId::new(index_u32(self.tree.fields.len()));
        decl.owner = owner;
        self.tree.fields.push(decl);
        self.tree.types[owner.index()].fields.push(id);
        id
    }

    pub fn add_method(&mut self, owner: TypeDeclId, mut decl: MethodDecl) -> MethodDeclId {
        let id = MethodDeclId::new(index_u32(self.tree.methods.len()));
        decl.owner = owner;
        self.tree.methods.push(decl);
        self.tree.types[owner.index()].methods.push(id);
        id
    }

    pub fn method_mut(&mut self, id: MethodDeclId) -> &mut MethodDecl {
        &mut self.tree.methods[id.index()]
    }

    pub fn finish(self) -> DeclTree {
        self.tree
    }
}

#[cfg(test)]
mod tests;
