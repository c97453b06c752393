//! Structural keys.

use std::fmt::Write as _;

use enc_ir::{
    DeclTree, FieldDeclId, MethodDeclId, Name, ParamDecl, Primitive, RefKind, StringInterner,
    TypeDeclId, TypeParamOwner, TypeRef,
};

/// Lowered, layout-relevant form of a [`TypeRef`].
///
/// Nullability annotations are dropped and tuple element names erased.
/// Custom modifiers survive lowering because they are part of the physical
/// signature.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum SigType {
    Primitive(Primitive),
    Named {
        namespace: Vec<Name>,
        enclosing: Vec<Name>,
        name: Name,
        args: Vec<SigType>,
    },
    Array {
        element: Box<SigType>,
        rank: u8,
    },
    Pointer(Box<SigType>),
    TypeParam {
        owner: TypeParamOwner,
        ordinal: u16,
    },
    /// Positional element types of a tuple.
    Tuple(Vec<SigType>),
    /// Element types of an anonymous record, sorted.
    Anonymous(Vec<SigType>),
    Modified {
        modifier: Name,
        required: bool,
        inner: Box<SigType>,
    },
}

impl SigType {
    pub fn lower(ty: &TypeRef) -> Self {
        match ty {
            TypeRef::Primitive(p) => SigType::Primitive(*p),
            TypeRef::Named {
                namespace,
                enclosing,
                name,
                args,
            } => SigType::Named {
                namespace: namespace.clone(),
                enclosing: enclosing.clone(),
                name: *name,
                args: args.iter().map(SigType::lower).collect(),
            },
            TypeRef::Array { element, rank } => SigType::Array {
                element: Box::new(SigType::lower(element)),
                rank: *rank,
            },
            TypeRef::Pointer(inner) => SigType::Pointer(Box::new(SigType::lower(inner))),
            TypeRef::TypeParam { owner, ordinal } => SigType::TypeParam {
                owner: *owner,
                ordinal: *ordinal,
            },
            TypeRef::Tuple(elements) => {
                SigType::Tuple(elements.iter().map(|e| SigType::lower(&e.ty)).collect())
            }
            TypeRef::Anonymous(elements) => {
                let mut types: Vec<SigType> =
                    elements.iter().map(|(_, ty)| SigType::lower(ty)).collect();
                types.sort();
                SigType::Anonymous(types)
            }
            TypeRef::NullableRef(inner) => SigType::lower(inner),
            TypeRef::Modified {
                modifier,
                required,
                inner,
            } => SigType::Modified {
                modifier: *modifier,
                required: *required,
                inner: Box::new(SigType::lower(inner)),
            },
        }
    }

    /// Render as metadata-style signature text.
    pub fn render(&self, interner: &StringInterner) -> String {
        let mut out = String::new();
        self.render_into(interner, &mut out);
        out
    }

    fn render_into(&self, interner: &StringInterner, out: &mut String) {
        match self {
            SigType::Primitive(p) => out.push_str(p.as_str()),
            SigType::Named {
                namespace,
                enclosing,
                name,
                args,
            } => {
                for segment in namespace {
                    out.push_str(interner.lookup(*segment));
                    out.push('.');
                }
                for outer in enclosing {
                    out.push_str(interner.lookup(*outer));
                    out.push('/');
                }
                out.push_str(interner.lookup(*name));
                if !args.is_empty() {
                    out.push('<');
                    render_all(args, interner, out);
                    out.push('>');
                }
            }
            SigType::Array { element, rank } => {
                element.render_into(interner, out);
                out.push('[');
                for _ in 1..*rank {
                    out.push(',');
                }
                out.push(']');
            }
            SigType::Pointer(inner) => {
                inner.render_into(interner, out);
                out.push('*');
            }
            SigType::TypeParam { owner, ordinal } => {
                let sigil = match owner {
                    TypeParamOwner::Type => "!",
                    TypeParamOwner::Method => "!!",
                };
                let _ = write!(out, "{sigil}{ordinal}");
            }
            SigType::Tuple(elements) => {
                let _ = write!(out, "ValueTuple`{}<", elements.len());
                render_all(elements, interner, out);
                out.push('>');
            }
            SigType::Anonymous(elements) => {
                out.push_str("<>f__AnonymousType<");
                render_all(elements, interner, out);
                out.push('>');
            }
            SigType::Modified {
                modifier,
                required,
                inner,
            } => {
                inner.render_into(interner, out);
                let keyword = if *required { "modreq" } else { "modopt" };
                let _ = write!(out, " {keyword}({})", interner.lookup(*modifier));
            }
        }
    }
}

fn render_all(types: &[SigType], interner: &StringInterner, out: &mut String) {
    for (i, ty) in types.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        ty.render_into(interner, out);
    }
}

/// Lowered parameter: passing mode plus lowered type. Names are not part of
/// a signature.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct SigParam {
    pub ref_kind: RefKind,
    pub ty: SigType,
}

impl SigParam {
    pub fn lower(param: &ParamDecl) -> Self {
        SigParam {
            ref_kind: param.ref_kind,
            ty: SigType::lower(&param.ty),
        }
    }

    pub fn render(&self, interner: &StringInterner) -> String {
        format!("{}{}", self.ref_kind.prefix(), self.ty.render(interner))
    }
}

/// Identity of a type: namespace, enclosing type names, name, and arity.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeKey {
    pub namespace: Vec<Name>,
    pub enclosing: Vec<Name>,
    pub name: Name,
    pub arity: u16,
}

impl TypeKey {
    pub fn of(tree: &DeclTree, id: TypeDeclId) -> Self {
        let decl = tree.type_decl(id);
        TypeKey {
            namespace: decl.namespace.clone(),
            enclosing: tree.enclosing_names(id),
            name: decl.name,
            arity: decl.arity,
        }
    }

    /// Key of a non-generic type nested directly in `self`.
    #[must_use]
    pub fn nested(&self, name: Name) -> Self {
        let mut enclosing = self.enclosing.clone();
        enclosing.push(self.name);
        TypeKey {
            namespace: self.namespace.clone(),
            enclosing,
            name,
            arity: 0,
        }
    }

    /// Key of a non-generic top-level type.
    pub fn top_level(namespace: &[Name], name: Name) -> Self {
        TypeKey {
            namespace: namespace.to_vec(),
            enclosing: Vec::new(),
            name,
            arity: 0,
        }
    }

    /// `Namespace.Outer+Inner` rendering.
    pub fn qualified_name(&self, interner: &StringInterner) -> String {
        let mut out = String::new();
        for segment in &self.namespace {
            out.push_str(interner.lookup(*segment));
            out.push('.');
        }
        for outer in &self.enclosing {
            out.push_str(interner.lookup(*outer));
            out.push('+');
        }
        out.push_str(interner.lookup(self.name));
        out
    }

    /// A reference to the keyed type, usable in signatures.
    pub fn to_sig_type(&self) -> SigType {
        SigType::Named {
            namespace: self.namespace.clone(),
            enclosing: self.enclosing.clone(),
            name: self.name,
            args: Vec::new(),
        }
    }
}

/// Identity of a field: container and name.
///
/// The field type is deliberately left out so that a retyped field still
/// matches and can be reported as a rude edit instead of an insertion.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldKey {
    pub container: TypeKey,
    pub name: Name,
}

impl FieldKey {
    pub fn of(tree: &DeclTree, id: FieldDeclId) -> Self {
        let decl = tree.field(id);
        FieldKey {
            container: TypeKey::of(tree, decl.owner),
            name: decl.name,
        }
    }

    pub fn new(container: TypeKey, name: Name) -> Self {
        FieldKey { container, name }
    }
}

/// Identity of a method: container, name, arity, and lowered signature.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct MethodKey {
    pub container: TypeKey,
    pub name: Name,
    pub arity: u16,
    pub params: Vec<SigParam>,
    pub ret: SigType,
}

impl MethodKey {
    pub fn of(tree: &DeclTree, id: MethodDeclId) -> Self {
        let decl = tree.method(id);
        MethodKey {
            container: TypeKey::of(tree, decl.owner),
            name: decl.name,
            arity: decl.arity,
            params: decl.params.iter().map(SigParam::lower).collect(),
            ret: SigType::lower(&decl.ret),
        }
    }

    /// Key of a non-generic synthesized method.
    pub fn synthesized(
        container: TypeKey,
        name: Name,
        params: &[ParamDecl],
        ret: &TypeRef,
    ) -> Self {
        MethodKey {
            container,
            name,
            arity: 0,
            params: params.iter().map(SigParam::lower).collect(),
            ret: SigType::lower(ret),
        }
    }

    /// Same container and name, regardless of signature.
    pub fn same_name(&self, other: &MethodKey) -> bool {
        self.container == other.container && self.name == other.name && self.arity == other.arity
    }

    /// `ret (params)` signature text.
    pub fn signature(&self, interner: &StringInterner) -> String {
        let params: Vec<String> = self.params.iter().map(|p| p.render(interner)).collect();
        format!("{} ({})", self.ret.render(interner), params.join(", "))
    }

    /// `Namespace.Type::Name` rendering.
    pub fn qualified_name(&self, interner: &StringInterner) -> String {
        format!(
            "{}::{}",
            self.container.qualified_name(interner),
            interner.lookup(self.name)
        )
    }
}

/// Identity of a parameter: its method and position.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct ParamKey {
    pub method: MethodKey,
    pub index: u16,
}
