//! Module contents after a delta.
//!
//! Lists every type the ledger knows, user-authored and synthesized, retired
//! ones included, with their fields and methods. A debugger host uses it to
//! resolve breakpoints in synthesized methods and to find the fields live
//! state moved to.

use std::fmt;

use enc_ir::{Generation, StringInterner};

use crate::{DeltaBuilder, RowLedger};

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ManifestMember {
    pub name: String,
    pub signature: String,
    pub row: u32,
    pub created: Generation,
    pub retired: bool,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ManifestType {
    /// `Namespace.Outer+Inner`.
    pub name: String,
    pub row: u32,
    pub synthesized: bool,
    pub created: Generation,
    pub shape: Generation,
    pub retired: bool,
    pub fields: Vec<ManifestMember>,
    pub methods: Vec<ManifestMember>,
}

impl ManifestType {
    pub fn field(&self, name: &str) -> Option<&ManifestMember> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&ManifestMember> {
        self.methods.iter().find(|m| m.name == name)
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct Manifest {
    /// In row order.
    pub types: Vec<ManifestType>,
}

impl Manifest {
    pub fn from_ledger(ledger: &RowLedger, interner: &StringInterner) -> Self {
        let types = ledger
            .types()
            .iter()
            .filter(|t| !(t.row == 1 && interner.lookup(t.key.name) == DeltaBuilder::MODULE_TYPE))
            .map(|t| ManifestType {
                name: t.key.qualified_name(interner),
                row: t.row,
                synthesized: t.synthesized,
                created: t.created,
                shape: t.shape,
                retired: t.retired,
                fields: ledger
                    .fields_of(t.row)
                    .map(|f| ManifestMember {
                        name: interner.lookup(f.key.name).to_owned(),
                        signature: f.ty.render(interner),
                        row: f.row,
                        created: f.created,
                        retired: t.retired,
                    })
                    .collect(),
                methods: ledger
                    .methods_of(t.row)
                    .map(|m| ManifestMember {
                        name: interner.lookup(m.key.name).to_owned(),
                        signature: m.key.signature(interner),
                        row: m.row,
                        created: m.created,
                        retired: t.retired || m.retired,
                    })
                    .collect(),
            })
            .collect();
        Manifest { types }
    }

    pub fn get(&self, name: &str) -> Option<&ManifestType> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn contains_type(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ty in &self.types {
            write!(f, "{} (gen {}", ty.name, ty.created)?;
            if ty.shape != ty.created {
                write!(f, ", shape {}", ty.shape)?;
            }
            if ty.retired {
                f.write_str(", retired")?;
            }
            writeln!(f, ")")?;
            for field in &ty.fields {
                writeln!(f, "  field {} : {}", field.name, field.signature)?;
            }
            for method in &ty.methods {
                let retired = if method.retired { " [retired]" } else { "" };
                writeln!(f, "  method {} : {}{retired}", method.name, method.signature)?;
            }
        }
        Ok(())
    }
}
