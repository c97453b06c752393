use pretty_assertions::assert_eq;

use super::*;
use crate::Primitive;

#[test]
fn test_builder_links_members_to_owner() {
    let interner = StringInterner::new();
    let mut builder = DeclTreeBuilder::new();
    let c = builder.add_type(TypeDecl::class(&[], interner.intern("C")));
    let x = builder.add_field(
        c,
        FieldDecl::new(interner.intern("x"), TypeRef::prim(Primitive::I32)),
    );
    let f = builder.add_method(
        c,
        MethodDecl::new(interner.intern("F"), TypeRef::prim(Primitive::Void)),
    );
    let tree = builder.finish();

    assert_eq!(tree.type_decl(c).fields, vec![x]);
    assert_eq!(tree.type_decl(c).methods, vec![f]);
    assert_eq!(tree.field(x).owner, c);
    assert_eq!(tree.method(f).owner, c);
    assert_eq!(tree.find_method(c, interner.intern("F")), Some(f));
}

#[test]
fn test_qualified_name_includes_namespace_and_enclosing() {
    let interner = StringInterner::new();
    let ns = [interner.intern("App"), interner.intern("Core")];
    let mut builder = DeclTreeBuilder::new();
    let outer = builder.add_type(TypeDecl::class(&ns, interner.intern("Outer")));
    let inner = builder.add_type(TypeDecl::class(&ns, interner.intern("Inner")).nested_in(outer));
    let tree = builder.finish();

    assert_eq!(tree.enclosing_names(inner), vec![interner.intern("Outer")]);
    assert_eq!(
        tree.qualified_type_name(inner, &interner),
        "App.Core.Outer+Inner"
    );
}

#[test]
fn test_method_position_follows_declaration_order() {
    let interner = StringInterner::new();
    let void = TypeRef::prim(Primitive::Void);
    let mut builder = DeclTreeBuilder::new();
    let c = builder.add_type(TypeDecl::class(&[], interner.intern("C")));
    let a = builder.add_method(c, MethodDecl::new(interner.intern("A"), void.clone()));
    let b = builder.add_method(c, MethodDecl::new(interner.intern("B"), void));
    let tree = builder.finish();

    assert_eq!(tree.method_position(a), 0);
    assert_eq!(tree.method_position(b), 1);
}
