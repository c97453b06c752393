//! Every row emitted so far.
//!
//! The ledger is part of the baseline: it knows the row of each type, field,
//! and method by structural key, when it was created, and whether anything
//! still references it. Rows are never removed; retiring only flips a flag
//! that the manifest reports.

use rustc_hash::FxHashMap;

use enc_ir::{Generation, TypeKind};
use enc_symbols::{FieldKey, MethodKey, SigType, TypeKey};

use crate::{TableIndex, TableSizes};

#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeEntry {
    pub row: u32,
    pub key: TypeKey,
    pub kind: TypeKind,
    /// Row of the enclosing type.
    pub enclosing: Option<u32>,
    pub synthesized: bool,
    pub created: Generation,
    /// Generation of the last member addition.
    pub shape: Generation,
    pub retired: bool,
}

#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldEntry {
    pub row: u32,
    pub owner: u32,
    pub key: FieldKey,
    pub ty: SigType,
    pub is_static: bool,
    pub created: Generation,
}

#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct MethodEntry {
    pub row: u32,
    pub owner: u32,
    pub key: MethodKey,
    pub is_static: bool,
    pub created: Generation,
    /// Generation of the last body replacement.
    pub updated: Generation,
    pub retired: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Default)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct RowLedger {
    pub(crate) sizes: TableSizes,
    types: Vec<TypeEntry>,
    fields: Vec<FieldEntry>,
    methods: Vec<MethodEntry>,
    type_rows: FxHashMap<TypeKey, u32>,
    field_rows: FxHashMap<FieldKey, u32>,
    method_rows: FxHashMap<MethodKey, u32>,
}

impl RowLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sizes(&self) -> TableSizes {
        self.sizes
    }

    pub fn row_count(&self, table: TableIndex) -> u32 {
        self.sizes.get(table)
    }

    pub fn type_row(&self, key: &TypeKey) -> Option<u32> {
        self.type_rows.get(key).copied()
    }

    pub fn field_row(&self, key: &FieldKey) -> Option<u32> {
        self.field_rows.get(key).copied()
    }

    pub fn method_row(&self, key: &MethodKey) -> Option<u32> {
        self.method_rows.get(key).copied()
    }

    pub fn type_entry(&self, row: u32) -> Option<&TypeEntry> {
        entry(&self.types, row)
    }

    pub fn method_entry(&self, row: u32) -> Option<&MethodEntry> {
        entry(&self.methods, row)
    }

    pub fn types(&self) -> &[TypeEntry] {
        &self.types
    }

    pub fn fields_of(&self, owner: u32) -> impl Iterator<Item = &FieldEntry> + '_ {
        self.fields.iter().filter(move |f| f.owner == owner)
    }

    pub fn methods_of(&self, owner: u32) -> impl Iterator<Item = &MethodEntry> + '_ {
        self.methods.iter().filter(move |m| m.owner == owner)
    }

    pub(crate) fn push_type(&mut self, entry: TypeEntry) {
        self.type_rows.insert(entry.key.clone(), entry.row);
        self.types.push(entry);
    }

    pub(crate) fn push_field(&mut self, entry: FieldEntry) {
        self.field_rows.insert(entry.key.clone(), entry.row);
        self.fields.push(entry);
    }

    pub(crate) fn push_method(&mut self, entry: MethodEntry) {
        self.method_rows.insert(entry.key.clone(), entry.row);
        self.methods.push(entry);
    }

    pub(crate) fn type_mut(&mut self, row: u32) -> Option<&mut TypeEntry> {
        entry_mut(&mut self.types, row)
    }

    pub(crate) fn method_mut(&mut self, row: u32) -> Option<&mut MethodEntry> {
        entry_mut(&mut self.methods, row)
    }
}

fn entry<T>(entries: &[T], row: u32) -> Option<&T> {
    let index = usize::try_from(row.checked_sub(1)?).ok()?;
    entries.get(index)
}

fn entry_mut<T>(entries: &mut [T], row: u32) -> Option<&mut T> {
    let index = usize::try_from(row.checked_sub(1)?).ok()?;
    entries.get_mut(index)
}
