//! Shape checks on matched declarations.
//!
//! Runs before any closure analysis so that an edit the runtime cannot apply
//! is rejected without doing the expensive per-method work.

use enc_diagnostic::{RudeEdit, RudeEditKind};
use enc_ir::{StringInterner, TypeKind};

use crate::{SigType, SymbolMatcher};

/// Collect the rude edits implied by the declaration trees alone.
pub fn declaration_rude_edits(
    matcher: &SymbolMatcher<'_>,
    interner: &StringInterner,
) -> Vec<RudeEdit> {
    let new = matcher.new_tree();
    let old = matcher.old_tree();
    let mut edits = Vec::new();

    for ty in new.type_ids() {
        let Some(old_ty) = matcher.map_type(ty) else {
            continue;
        };
        let decl = new.type_decl(ty);
        let old_decl = old.type_decl(old_ty);
        let type_name = || new.qualified_type_name(ty, interner);

        if decl.kind != old_decl.kind {
            edits.push(RudeEdit::new(
                RudeEditKind::TypeKindUpdate,
                decl.span,
                type_name(),
            ));
        }
        if decl.base.as_ref().map(SigType::lower) != old_decl.base.as_ref().map(SigType::lower) {
            edits.push(RudeEdit::new(
                RudeEditKind::BaseTypeUpdate,
                decl.span,
                type_name(),
            ));
        }

        for &field in &decl.fields {
            let field_decl = new.field(field);
            let field_name = || format!("{}.{}", type_name(), interner.lookup(field_decl.name));
            match matcher.map_field(field) {
                Some(old_field) => {
                    if SigType::lower(&field_decl.ty) != SigType::lower(&old.field(old_field).ty) {
                        edits.push(RudeEdit::new(
                            RudeEditKind::FieldTypeUpdate,
                            field_decl.span,
                            field_name(),
                        ));
                    }
                }
                None => match decl.kind {
                    TypeKind::Struct if !field_decl.is_static => edits.push(RudeEdit::new(
                        RudeEditKind::InsertIntoStruct,
                        field_decl.span,
                        field_name(),
                    )),
                    TypeKind::Interface => edits.push(RudeEdit::new(
                        RudeEditKind::InsertIntoInterface,
                        field_decl.span,
                        field_name(),
                    )),
                    TypeKind::Struct | TypeKind::Class => {}
                },
            }
        }

        for &method in &decl.methods {
            if matcher.map_method(method).is_some() {
                continue;
            }
            let method_decl = new.method(method);
            let method_name = format!("{}.{}", type_name(), interner.lookup(method_decl.name));
            if decl.kind == TypeKind::Interface {
                edits.push(RudeEdit::new(
                    RudeEditKind::InsertIntoInterface,
                    method_decl.span,
                    method_name,
                ));
            } else if method_decl.is_virtual {
                edits.push(RudeEdit::new(
                    RudeEditKind::InsertVirtual,
                    method_decl.span,
                    method_name,
                ));
            }
        }
    }

    if !edits.is_empty() {
        tracing::debug!(count = edits.len(), "declaration rude edits");
    }
    edits
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use enc_ir::{
        DeclTree, DeclTreeBuilder, FieldDecl, MethodDecl, Primitive, TypeDecl, TypeRef,
    };

    use super::*;

    fn kinds(new: &DeclTree, old: &DeclTree, interner: &StringInterner) -> Vec<RudeEditKind> {
        let matcher = SymbolMatcher::new(new, old);
        declaration_rude_edits(&matcher, interner)
            .into_iter()
            .map(|e| e.kind)
            .collect()
    }

    #[test]
    fn test_field_insert_into_struct_is_rude() {
        let interner = StringInterner::new();
        let s = interner.intern("S");
        let int = TypeRef::prim(Primitive::I32);

        let mut b = DeclTreeBuilder::new();
        b.add_type(TypeDecl::new(&[], s, TypeKind::Struct));
        let old = b.finish();

        let mut b = DeclTreeBuilder::new();
        let ty = b.add_type(TypeDecl::new(&[], s, TypeKind::Struct));
        b.add_field(ty, FieldDecl::new(interner.intern("x"), int));
        let new = b.finish();

        assert_eq!(
            kinds(&new, &old, &interner),
            vec![RudeEditKind::InsertIntoStruct]
        );
    }

    #[test]
    fn test_field_insert_into_class_is_allowed() {
        let interner = StringInterner::new();
        let c = interner.intern("C");

        let mut b = DeclTreeBuilder::new();
        b.add_type(TypeDecl::class(&[], c));
        let old = b.finish();

        let mut b = DeclTreeBuilder::new();
        let ty = b.add_type(TypeDecl::class(&[], c));
        b.add_field(
            ty,
            FieldDecl::new(interner.intern("x"), TypeRef::prim(Primitive::I32)),
        );
        let new = b.finish();

        assert!(kinds(&new, &old, &interner).is_empty());
    }

    #[test]
    fn test_base_kind_and_virtual_changes() {
        let interner = StringInterner::new();
        let c = interner.intern("C");
        let base = TypeRef::named(&[], interner.intern("B"));

        let mut b = DeclTreeBuilder::new();
        b.add_type(TypeDecl::class(&[], c));
        let old = b.finish();

        let mut b = DeclTreeBuilder::new();
        let ty = b.add_type(TypeDecl::new(&[], c, TypeKind::Struct).with_base(base));
        b.add_method(
            ty,
            MethodDecl::new(interner.intern("V"), TypeRef::prim(Primitive::Void)).with_virtual(),
        );
        let new = b.finish();

        assert_eq!(
            kinds(&new, &old, &interner),
            vec![
                RudeEditKind::TypeKindUpdate,
                RudeEditKind::BaseTypeUpdate,
                RudeEditKind::InsertVirtual,
            ]
        );
    }

    #[test]
    fn test_nullable_field_annotation_is_not_a_type_change() {
        let interner = StringInterner::new();
        let c = interner.intern("C");
        let f = interner.intern("f");
        let s = TypeRef::prim(Primitive::String);

        let mut b = DeclTreeBuilder::new();
        let ty = b.add_type(TypeDecl::class(&[], c));
        b.add_field(ty, FieldDecl::new(f, s.clone()));
        let old = b.finish();

        let mut b = DeclTreeBuilder::new();
        let ty = b.add_type(TypeDecl::class(&[], c));
        b.add_field(ty, FieldDecl::new(f, s.nullable()));
        let new = b.finish();

        assert!(kinds(&new, &old, &interner).is_empty());
    }
}
