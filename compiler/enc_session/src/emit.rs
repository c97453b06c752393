//! Single-threaded merge of analyzed methods into one delta.
//!
//! Runs only after every rude-edit check passed. Owns the generation's
//! [`DeltaBuilder`] and [`NameAllocator`], so rows and names are handed out in
//! a deterministic order: declarations first, then each edited method's
//! closures in edit order.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use enc_closure::{ClosureKind, EnvChange, EnvField, LambdaChange, LambdaRecord, RetireReason};
use enc_closure::{ClosurePlan, Representation};
use enc_diagnostic::EmitError;
use enc_emit::names::{self, SINGLETON_FIELD};
use enc_emit::{DeltaBuilder, Manifest, MetadataDelta, MethodBody, NameAllocator};
use enc_emit::{NewField, NewMethod, NewType};
use enc_ir::{
    CaptureAnalysis, DebugId, DeclTree, FunctionKind, Generation, MethodDeclId, Name, ParamDecl,
    Primitive, RefKind, StringInterner, TypeKind, TypeRef,
};
use enc_symbols::{FieldKey, MethodKey, SigType, TypeKey};

use crate::pipeline::{MethodJob, MethodWork};
use crate::{Baseline, EmitOptions};

/// Namespace of the sentinel exception type.
pub const SENTINEL_NAMESPACE: [&str; 3] = ["System", "Runtime", "CompilerServices"];
pub const SENTINEL_TYPE: &str = "HotReloadException";
/// Trap code of a lambda that no longer exists.
pub const TRAP_DELETED: i32 = -1;
/// Trap code of a lambda that moved to a new method.
pub const TRAP_REHOSTED: i32 = -2;

/// Everything the merge produced.
pub(crate) struct Merged {
    pub delta: MetadataDelta,
    pub manifest: Manifest,
    pub baseline: Baseline,
    /// Qualified environment type names, per edited method.
    pub env_names: FxHashMap<MethodDeclId, FxHashMap<DebugId, String>>,
}

pub(crate) struct Emitter<'a> {
    baseline: &'a Baseline,
    new: &'a DeclTree,
    interner: &'a StringInterner,
    generation: Generation,
    options: EmitOptions,
    builder: DeltaBuilder<'a>,
    names: NameAllocator<'a>,
    method_ids: FxHashMap<MethodKey, DebugId>,
    static_containers: FxHashMap<TypeKey, Generation>,
    env_names: FxHashMap<MethodDeclId, FxHashMap<DebugId, String>>,
}

impl<'a> Emitter<'a> {
    pub fn new(
        baseline: &'a Baseline,
        new: &'a DeclTree,
        interner: &'a StringInterner,
        generation: Generation,
        options: &EmitOptions,
    ) -> Self {
        Emitter {
            baseline,
            new,
            interner,
            generation,
            options: *options,
            builder: DeltaBuilder::new(&baseline.ledger, interner, generation),
            names: NameAllocator::new(interner, generation),
            method_ids: baseline.method_ids.clone(),
            static_containers: baseline.static_containers.clone(),
            env_names: FxHashMap::default(),
        }
    }

    /// Rows for declarations the baseline lacks, and new bodies for edited
    /// methods it has.
    pub fn emit_declarations(&mut self, jobs: &[MethodJob<'_>]) -> Result<(), EmitError> {
        let new = self.new;

        let mut types: Vec<_> = new.type_ids().collect();
        types.sort_by_key(|&t| new.enclosing_names(t).len());
        for ty in types {
            let key = TypeKey::of(new, ty);
            if self.builder.ledger().type_row(&key).is_some() {
                continue;
            }
            let decl = new.type_decl(ty);
            let enclosing = decl
                .enclosing
                .and_then(|outer| self.builder.ledger().type_row(&TypeKey::of(new, outer)));
            self.builder.add_type(NewType {
                key,
                kind: decl.kind,
                enclosing,
                extends: decl.base.as_ref().map(|b| b.render(self.interner)),
                synthesized: false,
            })?;
        }

        for field in new.field_ids() {
            let key = FieldKey::of(new, field);
            if self.builder.ledger().field_row(&key).is_some() {
                continue;
            }
            let decl = new.field(field);
            let owner = self.type_row(&key.container)?;
            self.builder.add_field(
                owner,
                NewField {
                    name: decl.name,
                    ty: SigType::lower(&decl.ty),
                    is_static: decl.is_static,
                },
            )?;
        }

        for method in new.method_ids() {
            let key = MethodKey::of(new, method);
            if self.builder.ledger().method_row(&key).is_some() {
                continue;
            }
            let decl = new.method(method);
            let owner = self.type_row(&key.container)?;
            self.builder.add_method(
                owner,
                NewMethod {
                    name: decl.name,
                    arity: decl.arity,
                    params: decl.params.clone(),
                    ret: decl.ret.clone(),
                    is_static: decl.is_static,
                    body: decl.body.map_or(MethodBody::None, MethodBody::Compiled),
                },
            )?;
            let position = u32::try_from(new.method_position(method)).unwrap_or(u32::MAX);
            self.method_ids
                .insert(key, DebugId::new(position, self.generation));
        }

        for job in jobs {
            let Some(row) = self.baseline.ledger.method_row(&job.key) else {
                continue;
            };
            let body = new
                .method(job.method)
                .body
                .map_or(MethodBody::None, MethodBody::Compiled);
            self.builder.update_method(row, body)?;
        }
        Ok(())
    }

    /// Environment types, their fields, and lambda methods of one method.
    pub fn emit_closures(
        &mut self,
        job: &MethodJob<'_>,
        plan: &ClosurePlan,
        analysis: &CaptureAnalysis,
    ) -> Result<(), EmitError> {
        let method_id = self.method_id(&job.key);
        let container = job.key.container.clone();
        let containing = self.interner.lookup(job.key.name);
        let _span = tracing::debug_span!("closures", method = %job.key.qualified_name(self.interner))
            .entered();

        let mut env_names = FxHashMap::default();
        for env in &plan.envs {
            let name = names::display_class_name(method_id, env.id());
            let key = container.nested(self.interner.intern(&name));
            env_names.insert(env.id(), key.qualified_name(self.interner));

            let existing = self.builder.ledger().type_row(&key);
            let (row, fields) = match (&env.change, existing) {
                (EnvChange::Unchanged, Some(_)) => continue,
                (EnvChange::Extended { .. }, Some(row)) => (row, env.added_fields()),
                _ => {
                    let minted = self.names.mint(&container, &name)?;
                    let row = self.builder.add_type(NewType {
                        key: container.nested(minted),
                        kind: match env.record.representation {
                            Representation::ValueRecord => TypeKind::Struct,
                            Representation::HeapRecord | Representation::None => TypeKind::Class,
                        },
                        enclosing: Some(self.type_row(&container)?),
                        extends: None,
                        synthesized: true,
                    })?;
                    (row, env.record.fields.as_slice())
                }
            };
            for field in fields {
                let (field_name, ty) = self.env_field(method_id, &container, field);
                let name = self.names.mint(&key, &field_name)?;
                self.builder.add_field(
                    row,
                    NewField {
                        name,
                        ty,
                        is_static: false,
                    },
                )?;
            }
            tracing::debug!(environment = %name, change = ?env.change, "environment");
        }

        let old_method_id = job
            .old_key
            .as_ref()
            .and_then(|k| self.baseline.method_id(k))
            .unwrap_or(method_id);
        for retired in &plan.retired_envs {
            let name = names::display_class_name(old_method_id, retired.id);
            let key = container.nested(self.interner.intern(&name));
            if let Some(row) = self.builder.ledger().type_row(&key) {
                self.builder.retire_type(row);
            }
        }

        for lambda in &plan.lambdas {
            let function = analysis.function(lambda.function);
            let (host, is_static) = self.lambda_host(method_id, &container, &lambda.record)?;
            let name = lambda_name(containing, self.interner, method_id, &lambda.record);
            let params = self.lambda_params(method_id, &container, &lambda.record);
            let body = MethodBody::Compiled(function.body);

            match lambda.change {
                LambdaChange::Reused => {
                    let key = MethodKey::synthesized(
                        host.clone(),
                        self.interner.intern(&name),
                        &params,
                        &lambda.record.ret,
                    );
                    let Some(row) = self.builder.ledger().method_row(&key) else {
                        return Err(EmitError::UnknownMethod(key.qualified_name(self.interner)));
                    };
                    self.builder.update_method(row, body)?;
                }
                LambdaChange::New | LambdaChange::Rehosted { .. } => {
                    let host_row = self.type_row(&host)?;
                    let minted = self.names.mint(&host, &name)?;
                    self.builder.add_method(
                        host_row,
                        NewMethod {
                            name: minted,
                            arity: 0,
                            params,
                            ret: lambda.record.ret.clone(),
                            is_static,
                            body,
                        },
                    )?;
                    if lambda.record.kind == ClosureKind::Singleton
                        && lambda.record.function_kind == FunctionKind::Lambda
                    {
                        let cache = names::lambda_cache_field_name(method_id, lambda.id());
                        let cache = self.names.mint(&host, &cache)?;
                        self.builder.add_field(
                            host_row,
                            NewField {
                                name: cache,
                                ty: delegate_type(self.interner),
                                is_static: true,
                            },
                        )?;
                    }
                }
            }
            tracing::debug!(lambda = %name, change = ?lambda.change, "lambda");
        }

        for retired in &plan.retired_lambdas {
            let record = &retired.record;
            let host = self.old_lambda_host(old_method_id, &container, record);
            let name = lambda_name(containing, self.interner, old_method_id, record);
            let params = self.lambda_params(old_method_id, &container, record);
            let key =
                MethodKey::synthesized(host, self.interner.intern(&name), &params, &record.ret);
            let Some(row) = self.builder.ledger().method_row(&key) else {
                tracing::debug!(lambda = %name, "retired lambda has no row");
                continue;
            };
            self.builder.retire_method(row);
            if self.options.emit_traps {
                self.ensure_sentinel()?;
                let code = match retired.reason {
                    RetireReason::Deleted => TRAP_DELETED,
                    RetireReason::Rehosted => TRAP_REHOSTED,
                };
                self.builder.update_method(row, MethodBody::Trap { code })?;
            }
        }

        self.env_names.insert(job.method, env_names);
        Ok(())
    }

    pub fn finish(
        self,
        decls: Arc<DeclTree>,
        jobs: &[MethodJob<'_>],
        works: &[MethodWork],
    ) -> Result<Merged, EmitError> {
        let (delta, ledger) = self.builder.finish()?;

        let mut closures = self.baseline.closures.clone();
        for (job, work) in jobs.iter().zip(works) {
            if let Some(old_key) = &job.old_key {
                closures.remove(old_key);
            }
            if !work.plan.closures.is_empty() {
                closures.insert(job.key.clone(), work.plan.closures.clone());
            }
        }

        let manifest = Manifest::from_ledger(&ledger, self.interner);
        tracing::debug!(
            generation = %self.generation,
            names = self.names.minted_count(),
            types = manifest.len(),
            "delta finished"
        );
        Ok(Merged {
            delta,
            manifest,
            baseline: Baseline {
                generation: Some(self.generation),
                decls,
                ledger,
                method_ids: self.method_ids,
                closures,
                static_containers: self.static_containers,
            },
            env_names: self.env_names,
        })
    }

    fn method_id(&mut self, key: &MethodKey) -> DebugId {
        let generation = self.generation;
        *self
            .method_ids
            .entry(key.clone())
            .or_insert_with(|| DebugId::new(0, generation))
    }

    fn type_row(&self, key: &TypeKey) -> Result<u32, EmitError> {
        self.builder
            .ledger()
            .type_row(key)
            .ok_or_else(|| EmitError::UnknownType(key.qualified_name(self.interner)))
    }

    fn env_key(&self, method_id: DebugId, container: &TypeKey, env: DebugId) -> TypeKey {
        let name = names::display_class_name(method_id, env);
        container.nested(self.interner.intern(&name))
    }

    fn env_field(
        &self,
        method_id: DebugId,
        container: &TypeKey,
        field: &EnvField,
    ) -> (String, SigType) {
        match field {
            EnvField::This { ty } => (names::THIS_FIELD.to_owned(), SigType::lower(ty)),
            EnvField::Variable { name, ty, .. } => {
                (self.interner.lookup(*name).to_owned(), SigType::lower(ty))
            }
            EnvField::Link { parent } => (
                names::link_field_name(*parent),
                self.env_key(method_id, container, *parent).to_sig_type(),
            ),
        }
    }

    /// Type a lambda is emitted on, and whether the method is static.
    fn lambda_host(
        &mut self,
        method_id: DebugId,
        container: &TypeKey,
        record: &LambdaRecord,
    ) -> Result<(TypeKey, bool), EmitError> {
        Ok(match (record.kind, record.host) {
            (ClosureKind::General, Some(env)) => {
                (self.env_key(method_id, container, env), false)
            }
            (ClosureKind::General | ClosureKind::Static, _) => (container.clone(), true),
            (ClosureKind::ThisOnly, _) => (container.clone(), false),
            (ClosureKind::Singleton, _) => (self.ensure_static_container(container)?, false),
        })
    }

    /// Host of a lambda emitted by an earlier generation.
    fn old_lambda_host(
        &self,
        method_id: DebugId,
        container: &TypeKey,
        record: &LambdaRecord,
    ) -> TypeKey {
        match (record.kind, record.host) {
            (ClosureKind::General, Some(env)) => self.env_key(method_id, container, env),
            (ClosureKind::Singleton, _) => {
                let created = self
                    .baseline
                    .static_container(container)
                    .unwrap_or(self.generation);
                let name = names::static_container_name(created);
                container.nested(self.interner.intern(&name))
            }
            _ => container.clone(),
        }
    }

    /// Declared parameters, then one by-reference parameter per value record.
    fn lambda_params(
        &self,
        method_id: DebugId,
        container: &TypeKey,
        record: &LambdaRecord,
    ) -> Vec<ParamDecl> {
        let mut params = record.params.clone();
        for &env in &record.struct_envs {
            let key = self.env_key(method_id, container, env);
            let name = self.interner.intern(&names::link_field_name(env));
            params.push(ParamDecl::new(name, type_ref_of(&key)).by_ref(RefKind::Ref));
        }
        params
    }

    /// The per-type singleton container, created on first use.
    fn ensure_static_container(&mut self, container: &TypeKey) -> Result<TypeKey, EmitError> {
        let created = *self
            .static_containers
            .entry(container.clone())
            .or_insert(self.generation);
        let name = names::static_container_name(created);
        let key = container.nested(self.interner.intern(&name));
        if self.builder.ledger().type_row(&key).is_some() {
            return Ok(key);
        }

        let minted = self.names.mint(container, &name)?;
        let row = self.builder.add_type(NewType {
            key: container.nested(minted),
            kind: TypeKind::Class,
            enclosing: Some(self.type_row(container)?),
            extends: None,
            synthesized: true,
        })?;
        let singleton = self.names.mint(&key, SINGLETON_FIELD)?;
        self.builder.add_field(
            row,
            NewField {
                name: singleton,
                ty: key.to_sig_type(),
                is_static: true,
            },
        )?;
        tracing::debug!(container = %key.qualified_name(self.interner), "static container");
        Ok(key)
    }

    /// The exception type trap bodies throw, created on first use.
    fn ensure_sentinel(&mut self) -> Result<(), EmitError> {
        let key = sentinel_key(self.interner);
        if self.builder.ledger().type_row(&key).is_some() {
            return Ok(());
        }

        let row = self.builder.add_type(NewType {
            key: key.clone(),
            kind: TypeKind::Class,
            enclosing: None,
            extends: Some("System.Exception".to_owned()),
            synthesized: true,
        })?;
        let code = self.names.mint(&key, "Code")?;
        self.builder.add_field(
            row,
            NewField {
                name: code,
                ty: SigType::Primitive(Primitive::I32),
                is_static: false,
            },
        )?;
        let ctor = self.names.mint(&key, ".ctor")?;
        let params = vec![
            ParamDecl::new(
                self.interner.intern("message"),
                TypeRef::prim(Primitive::String),
            ),
            ParamDecl::new(self.interner.intern("code"), TypeRef::prim(Primitive::I32)),
        ];
        self.builder.add_method(
            row,
            NewMethod {
                name: ctor,
                arity: 0,
                params,
                ret: TypeRef::prim(Primitive::Void),
                is_static: false,
                body: MethodBody::ExceptionConstructor,
            },
        )?;
        tracing::debug!("sentinel exception type");
        Ok(())
    }
}

fn lambda_name(
    containing: &str,
    interner: &StringInterner,
    method_id: DebugId,
    record: &LambdaRecord,
) -> String {
    match record.function_kind {
        FunctionKind::Lambda => names::lambda_method_name(containing, method_id, record.id),
        FunctionKind::LocalFunction => names::local_function_name(
            containing,
            interner.lookup(record.local_name),
            method_id,
            record.id,
        ),
    }
}

fn type_ref_of(key: &TypeKey) -> TypeRef {
    TypeRef::Named {
        namespace: key.namespace.clone(),
        enclosing: key.enclosing.clone(),
        name: key.name,
        args: Vec::new(),
    }
}

fn delegate_type(interner: &StringInterner) -> SigType {
    let system: Name = interner.intern("System");
    TypeKey::top_level(&[system], interner.intern("Delegate")).to_sig_type()
}

/// Key of the sentinel exception type.
pub fn sentinel_key(interner: &StringInterner) -> TypeKey {
    let namespace: Vec<Name> = SENTINEL_NAMESPACE
        .iter()
        .map(|s| interner.intern(s))
        .collect();
    TypeKey::top_level(&namespace, interner.intern(SENTINEL_TYPE))
}
