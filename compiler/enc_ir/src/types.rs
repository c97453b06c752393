//! Structural type references.
//!
//! Types are referenced by shape and path, never by declaration id, so a
//! reference written in one generation can be compared with one written in
//! another without any shared object identity.

use std::fmt::Write as _;

use crate::{Name, StringInterner};

/// Built-in types with a fixed physical representation.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Primitive {
    Void,
    Bool,
    Char,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    IntPtr,
    UIntPtr,
    String,
    Object,
}

impl Primitive {
    pub fn as_str(self) -> &'static str {
        match self {
            Primitive::Void => "void",
            Primitive::Bool => "bool",
            Primitive::Char => "char",
            Primitive::I8 => "sbyte",
            Primitive::U8 => "byte",
            Primitive::I16 => "short",
            Primitive::U16 => "ushort",
            Primitive::I32 => "int",
            Primitive::U32 => "uint",
            Primitive::I64 => "long",
            Primitive::U64 => "ulong",
            Primitive::F32 => "float",
            Primitive::F64 => "double",
            Primitive::IntPtr => "nint",
            Primitive::UIntPtr => "nuint",
            Primitive::String => "string",
            Primitive::Object => "object",
        }
    }
}

/// By-reference passing mode of a parameter.
///
/// All three by-ref modes lower to a managed pointer but are distinguished in
/// metadata, so they never compare equal to each other.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum RefKind {
    #[default]
    None,
    Ref,
    Out,
    In,
}

impl RefKind {
    pub fn prefix(self) -> &'static str {
        match self {
            RefKind::None => "",
            RefKind::Ref => "ref ",
            RefKind::Out => "out ",
            RefKind::In => "in ",
        }
    }
}

/// Which declaration a generic type parameter belongs to.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum TypeParamOwner {
    Type,
    Method,
}

/// One element of a tuple type. The name is surface-only.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct TupleElement {
    pub name: Option<Name>,
    pub ty: TypeRef,
}

/// A structural reference to a type.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum TypeRef {
    Primitive(Primitive),
    /// A declared type: namespace path, enclosing type names, own name, and
    /// generic arguments.
    Named {
        namespace: Vec<Name>,
        enclosing: Vec<Name>,
        name: Name,
        args: Vec<TypeRef>,
    },
    Array {
        element: Box<TypeRef>,
        rank: u8,
    },
    Pointer(Box<TypeRef>),
    TypeParam {
        owner: TypeParamOwner,
        ordinal: u16,
    },
    /// Tuple with optional element names; lowers to its element types only.
    Tuple(Vec<TupleElement>),
    /// Inferred anonymous record, elements in declaration order.
    Anonymous(Vec<(Name, TypeRef)>),
    /// Reference-nullability annotation. Does not change the physical type.
    NullableRef(Box<TypeRef>),
    /// Custom modifier (`modopt`/`modreq`). Part of the physical signature.
    Modified {
        modifier: Name,
        required: bool,
        inner: Box<TypeRef>,
    },
}

impl TypeRef {
    pub fn prim(primitive: Primitive) -> Self {
        TypeRef::Primitive(primitive)
    }

    /// Non-generic named type at namespace root or within `namespace`.
    pub fn named(namespace: &[Name], name: Name) -> Self {
        TypeRef::Named {
            namespace: namespace.to_vec(),
            enclosing: Vec::new(),
            name,
            args: Vec::new(),
        }
    }

    /// Wrap in a reference-nullability annotation.
    #[must_use]
    pub fn nullable(self) -> Self {
        TypeRef::NullableRef(Box::new(self))
    }

    #[must_use]
    pub fn array(self, rank: u8) -> Self {
        TypeRef::Array {
            element: Box::new(self),
            rank,
        }
    }

    /// Render the reference as surface syntax.
    pub fn render(&self, interner: &StringInterner) -> String {
        let mut out = String::new();
        self.render_into(interner, &mut out);
        out
    }

    fn render_into(&self, interner: &StringInterner, out: &mut String) {
        match self {
            TypeRef::Primitive(p) => out.push_str(p.as_str()),
            TypeRef::Named {
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
                    out.push('+');
                }
                out.push_str(interner.lookup(*name));
                if !args.is_empty() {
                    out.push('<');
                    render_list(args.iter(), interner, out);
                    out.push('>');
                }
            }
            TypeRef::Array { element, rank } => {
                element.render_into(interner, out);
                out.push('[');
                for _ in 1..*rank {
                    out.push(',');
                }
                out.push(']');
            }
            TypeRef::Pointer(inner) => {
                inner.render_into(interner, out);
                out.push('*');
            }
            TypeRef::TypeParam { owner, ordinal } => {
                let sigil = match owner {
                    TypeParamOwner::Type => "!",
                    TypeParamOwner::Method => "!!",
                };
                let _ = write!(out, "{sigil}{ordinal}");
            }
            TypeRef::Tuple(elements) => {
                out.push('(');
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    element.ty.render_into(interner, out);
                    if let Some(name) = element.name {
                        out.push(' ');
                        out.push_str(interner.lookup(name));
                    }
                }
                out.push(')');
            }
            TypeRef::Anonymous(elements) => {
                out.push_str("<anonymous: ");
                for (i, (name, ty)) in elements.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(interner.lookup(*name));
                    out.push_str(": ");
                    ty.render_into(interner, out);
                }
                out.push('>');
            }
            TypeRef::NullableRef(inner) => {
                inner.render_into(interner, out);
                out.push('?');
            }
            TypeRef::Modified {
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

fn render_list<'a>(
    items: impl Iterator<Item = &'a TypeRef>,
    interner: &StringInterner,
    out: &mut String,
) {
    for (i, item) in items.enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        item.render_into(interner, out);
    }
}
