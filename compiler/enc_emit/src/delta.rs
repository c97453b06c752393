//! Metadata Delta Emitter.
//!
//! [`DeltaBuilder`] appends rows for one generation on top of a copy of the
//! baseline ledger. Added rows always take the next free row of their table;
//! a replaced method body is a fresh row record for the method's existing
//! row. [`DeltaBuilder::finish`] orders everything into the edit log:
//!
//! 1. Tables in [`TableIndex`] order, rows ascending within a table.
//! 2. An added member is preceded by an attach entry naming its container
//!    row (`AddField`/`AddMethod` on the type, `AddParameter` on the method).
//! 3. Every row record itself is logged with [`RowOperation::Default`].
//!
//! The map lists every token the delta carries, sorted.

use rustc_hash::FxHashMap;

use enc_diagnostic::EmitError;
use enc_ir::{BodyRef, Generation, Name, ParamDecl, StringInterner, TypeKind, TypeRef};
use enc_symbols::{FieldKey, MethodKey, SigParam, SigType, TypeKey};

use crate::ledger::{FieldEntry, MethodEntry, TypeEntry};
use crate::{RowLedger, TableIndex, TableSizes, Token};

/// Edit-and-continue operation of a log entry.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum RowOperation {
    /// A row record, fresh or replacing an existing row's content.
    Default,
    AddMethod { type_def: u32 },
    AddField { type_def: u32 },
    AddParameter { method_def: u32 },
}

impl RowOperation {
    /// Function code written to the log.
    pub const fn code(self) -> u32 {
        match self {
            RowOperation::Default => 0,
            RowOperation::AddMethod { .. } => 1,
            RowOperation::AddField { .. } => 2,
            RowOperation::AddParameter { .. } => 3,
        }
    }

    /// Container row an attach operation names.
    pub fn container(self) -> Option<Token> {
        match self {
            RowOperation::Default => None,
            RowOperation::AddMethod { type_def } | RowOperation::AddField { type_def } => {
                Some(Token::new(TableIndex::TypeDef, type_def))
            }
            RowOperation::AddParameter { method_def } => {
                Some(Token::new(TableIndex::MethodDef, method_def))
            }
        }
    }
}

/// What a method row's body is.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum MethodBody {
    /// Abstract or interface method.
    None,
    Compiled(BodyRef),
    /// Throws the session's sentinel exception with `code`.
    Trap { code: i32 },
    /// Constructor of the sentinel exception type.
    ExceptionConstructor,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum RowData {
    TypeDef {
        namespace: String,
        name: String,
        kind: TypeKind,
        extends: Option<String>,
    },
    Field {
        name: String,
        signature: String,
        is_static: bool,
    },
    MethodDef {
        name: String,
        signature: String,
        is_static: bool,
        body: MethodBody,
    },
    Param {
        name: String,
        sequence: u16,
    },
    NestedClass {
        nested: u32,
        enclosing: u32,
    },
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct DeltaRow {
    pub table: TableIndex,
    pub row: u32,
    /// Attach operation for added members, `Default` otherwise.
    pub operation: RowOperation,
    /// Whether the row is new in this delta.
    pub added: bool,
    pub data: RowData,
}

impl DeltaRow {
    pub fn token(&self) -> Token {
        Token::new(self.table, self.row)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct EncLogEntry {
    pub token: Token,
    pub operation: RowOperation,
}

/// One generation's metadata delta.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct MetadataDelta {
    pub generation: Generation,
    /// Row records sorted by table, then row.
    pub rows: Vec<DeltaRow>,
    pub enc_log: Vec<EncLogEntry>,
    pub enc_map: Vec<Token>,
}

impl MetadataDelta {
    pub fn rows_in(&self, table: TableIndex) -> impl Iterator<Item = &DeltaRow> + '_ {
        self.rows.iter().filter(move |r| r.table == table)
    }

    pub fn added_count(&self, table: TableIndex) -> usize {
        self.rows_in(table).filter(|r| r.added).count()
    }

    /// Existing method rows whose body this delta replaces.
    pub fn updated_methods(&self) -> Vec<u32> {
        self.rows_in(TableIndex::MethodDef)
            .filter(|r| !r.added)
            .map(|r| r.row)
            .collect()
    }

    pub fn row(&self, token: Token) -> Option<&DeltaRow> {
        self.rows.iter().find(|r| r.token() == token)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A type to append.
#[derive(Clone, Debug)]
pub struct NewType {
    pub key: TypeKey,
    pub kind: TypeKind,
    /// Row of the enclosing type; nested types also get a `NestedClass` row.
    pub enclosing: Option<u32>,
    pub extends: Option<String>,
    pub synthesized: bool,
}

/// A field to append to an existing or new type.
#[derive(Clone, Debug)]
pub struct NewField {
    pub name: Name,
    pub ty: SigType,
    pub is_static: bool,
}

/// A method to append, with one `Param` row per parameter.
#[derive(Clone, Debug)]
pub struct NewMethod {
    pub name: Name,
    pub arity: u16,
    pub params: Vec<ParamDecl>,
    pub ret: TypeRef,
    pub is_static: bool,
    pub body: MethodBody,
}

impl NewMethod {
    pub fn key(&self, container: TypeKey) -> MethodKey {
        MethodKey {
            container,
            name: self.name,
            arity: self.arity,
            params: self.params.iter().map(SigParam::lower).collect(),
            ret: SigType::lower(&self.ret),
        }
    }
}

pub struct DeltaBuilder<'a> {
    interner: &'a StringInterner,
    generation: Generation,
    baseline: TableSizes,
    ledger: RowLedger,
    rows: Vec<DeltaRow>,
    /// Method row to index in `rows`, for rows already recorded this delta.
    method_records: FxHashMap<u32, usize>,
}

impl<'a> DeltaBuilder<'a> {
    /// The pseudo type owning global members; always `TypeDef` row 1.
    pub const MODULE_TYPE: &'static str = "<Module>";

    /// Start a delta on top of `baseline`. An empty ledger gets the module
    /// type first.
    pub fn new(baseline: &RowLedger, interner: &'a StringInterner, generation: Generation) -> Self {
        let mut builder = DeltaBuilder {
            interner,
            generation,
            baseline: baseline.sizes(),
            ledger: baseline.clone(),
            rows: Vec::new(),
            method_records: FxHashMap::default(),
        };
        if builder.ledger.row_count(TableIndex::TypeDef) == 0 {
            let row = builder.ledger.sizes.allocate(TableIndex::TypeDef);
            let key = TypeKey::top_level(&[], interner.intern(Self::MODULE_TYPE));
            builder.ledger.push_type(TypeEntry {
                row,
                key,
                kind: TypeKind::Class,
                enclosing: None,
                synthesized: true,
                created: generation,
                shape: generation,
                retired: false,
            });
            builder.rows.push(DeltaRow {
                table: TableIndex::TypeDef,
                row,
                operation: RowOperation::Default,
                added: true,
                data: RowData::TypeDef {
                    namespace: String::new(),
                    name: Self::MODULE_TYPE.to_owned(),
                    kind: TypeKind::Class,
                    extends: None,
                },
            });
        }
        builder
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// The ledger including everything appended so far.
    pub fn ledger(&self) -> &RowLedger {
        &self.ledger
    }

    pub fn add_type(&mut self, new: NewType) -> Result<u32, EmitError> {
        if self.ledger.type_row(&new.key).is_some() {
            return Err(self.collision(new.key.qualified_name(self.interner)));
        }
        let row = self.ledger.sizes.allocate(TableIndex::TypeDef);
        tracing::trace!(row, name = %new.key.qualified_name(self.interner), "add type");

        let namespace = new
            .key
            .namespace
            .iter()
            .map(|&n| self.interner.lookup(n))
            .collect::<Vec<_>>()
            .join(".");
        self.rows.push(DeltaRow {
            table: TableIndex::TypeDef,
            row,
            operation: RowOperation::Default,
            added: true,
            data: RowData::TypeDef {
                namespace: if new.enclosing.is_some() {
                    String::new()
                } else {
                    namespace
                },
                name: self.interner.lookup(new.key.name).to_owned(),
                kind: new.kind,
                extends: new.extends,
            },
        });

        if let Some(enclosing) = new.enclosing {
            let nested_row = self.ledger.sizes.allocate(TableIndex::NestedClass);
            self.rows.push(DeltaRow {
                table: TableIndex::NestedClass,
                row: nested_row,
                operation: RowOperation::Default,
                added: true,
                data: RowData::NestedClass {
                    nested: row,
                    enclosing,
                },
            });
        }

        self.ledger.push_type(TypeEntry {
            row,
            key: new.key,
            kind: new.kind,
            enclosing: new.enclosing,
            synthesized: new.synthesized,
            created: self.generation,
            shape: self.generation,
            retired: false,
        });
        Ok(row)
    }

    pub fn add_field(&mut self, owner: u32, new: NewField) -> Result<u32, EmitError> {
        let container = self.container_key(owner)?;
        let key = FieldKey::new(container, new.name);
        if self.ledger.field_row(&key).is_some() {
            return Err(self.collision(format!(
                "{}::{}",
                key.container.qualified_name(self.interner),
                self.interner.lookup(new.name)
            )));
        }
        let row = self.ledger.sizes.allocate(TableIndex::Field);
        tracing::trace!(row, owner, name = self.interner.lookup(new.name), "add field");

        self.rows.push(DeltaRow {
            table: TableIndex::Field,
            row,
            operation: RowOperation::AddField { type_def: owner },
            added: true,
            data: RowData::Field {
                name: self.interner.lookup(new.name).to_owned(),
                signature: new.ty.render(self.interner),
                is_static: new.is_static,
            },
        });
        self.touch_shape(owner);
        self.ledger.push_field(FieldEntry {
            row,
            owner,
            key,
            ty: new.ty,
            is_static: new.is_static,
            created: self.generation,
        });
        Ok(row)
    }

    pub fn add_method(&mut self, owner: u32, new: NewMethod) -> Result<u32, EmitError> {
        let key = new.key(self.container_key(owner)?);
        if self.ledger.method_row(&key).is_some() {
            return Err(self.collision(key.qualified_name(self.interner)));
        }
        let row = self.ledger.sizes.allocate(TableIndex::MethodDef);
        tracing::trace!(row, owner, name = self.interner.lookup(new.name), "add method");

        self.method_records.insert(row, self.rows.len());
        self.rows.push(DeltaRow {
            table: TableIndex::MethodDef,
            row,
            operation: RowOperation::AddMethod { type_def: owner },
            added: true,
            data: RowData::MethodDef {
                name: self.interner.lookup(new.name).to_owned(),
                signature: key.signature(self.interner),
                is_static: new.is_static,
                body: new.body,
            },
        });
        for (i, param) in new.params.iter().enumerate() {
            let param_row = self.ledger.sizes.allocate(TableIndex::Param);
            self.rows.push(DeltaRow {
                table: TableIndex::Param,
                row: param_row,
                operation: RowOperation::AddParameter { method_def: row },
                added: true,
                data: RowData::Param {
                    name: self.interner.lookup(param.name).to_owned(),
                    sequence: u16::try_from(i + 1).unwrap_or(u16::MAX),
                },
            });
        }
        self.touch_shape(owner);
        self.ledger.push_method(MethodEntry {
            row,
            owner,
            key,
            is_static: new.is_static,
            created: self.generation,
            updated: self.generation,
            retired: false,
        });
        Ok(row)
    }

    /// Replace the body of an existing method. A second replacement in the
    /// same delta overwrites the first.
    pub fn update_method(&mut self, row: u32, body: MethodBody) -> Result<(), EmitError> {
        if let Some(&index) = self.method_records.get(&row) {
            if let RowData::MethodDef { body: slot, .. } = &mut self.rows[index].data {
                *slot = body;
            }
            return Ok(());
        }
        let Some(entry) = self.ledger.method_entry(row) else {
            return Err(EmitError::UnknownMethod(format!("MethodDef row {row}")));
        };
        let data = RowData::MethodDef {
            name: self.interner.lookup(entry.key.name).to_owned(),
            signature: entry.key.signature(self.interner),
            is_static: entry.is_static,
            body,
        };
        tracing::trace!(row, ?body, "update method");

        self.method_records.insert(row, self.rows.len());
        self.rows.push(DeltaRow {
            table: TableIndex::MethodDef,
            row,
            operation: RowOperation::Default,
            added: false,
            data,
        });
        if let Some(entry) = self.ledger.method_mut(row) {
            entry.updated = self.generation;
        }
        Ok(())
    }

    /// Mark a type as no longer referenced. Its rows stay.
    pub fn retire_type(&mut self, row: u32) {
        if let Some(entry) = self.ledger.type_mut(row) {
            entry.retired = true;
        }
    }

    /// Mark a method as no longer referenced. Its rows stay.
    pub fn retire_method(&mut self, row: u32) {
        if let Some(entry) = self.ledger.method_mut(row) {
            entry.retired = true;
        }
    }

    pub fn finish(self) -> Result<(MetadataDelta, RowLedger), EmitError> {
        let DeltaBuilder {
            generation,
            baseline,
            ledger,
            mut rows,
            ..
        } = self;

        for table in TableIndex::ALL {
            let mut previous = baseline.get(table);
            for row in rows.iter().filter(|r| r.table == table && r.added) {
                if row.row != previous + 1 {
                    return Err(EmitError::RowOrderViolation {
                        table: table.as_str(),
                        previous,
                        row: row.row,
                    });
                }
                previous = row.row;
            }
        }

        rows.sort_by_key(|r| (r.table, r.row));

        let mut enc_log = Vec::with_capacity(rows.len() * 2);
        for row in &rows {
            if let Some(container) = row.operation.container() {
                enc_log.push(EncLogEntry {
                    token: container,
                    operation: row.operation,
                });
            }
            enc_log.push(EncLogEntry {
                token: row.token(),
                operation: RowOperation::Default,
            });
        }

        let mut enc_map: Vec<Token> = rows.iter().map(DeltaRow::token).collect();
        enc_map.sort_unstable();
        enc_map.dedup();

        tracing::debug!(
            %generation,
            rows = rows.len(),
            log = enc_log.len(),
            types = rows.iter().filter(|r| r.table == TableIndex::TypeDef && r.added).count(),
            updated = rows.iter().filter(|r| !r.added).count(),
            "finished delta"
        );

        Ok((
            MetadataDelta {
                generation,
                rows,
                enc_log,
                enc_map,
            },
            ledger,
        ))
    }

    fn container_key(&self, owner: u32) -> Result<TypeKey, EmitError> {
        self.ledger
            .type_entry(owner)
            .map(|t| t.key.clone())
            .ok_or_else(|| EmitError::UnknownType(format!("TypeDef row {owner}")))
    }

    fn touch_shape(&mut self, owner: u32) {
        let generation = self.generation;
        if let Some(entry) = self.ledger.type_mut(owner) {
            entry.shape = generation;
        }
    }

    fn collision(&self, name: String) -> EmitError {
        EmitError::AllocatorCollision {
            name,
            generation: self.generation,
        }
    }
}
