//! Per-method closure records carried from one generation to the next.
//!
//! Everything here is keyed by anchors of the generation that produced it, so
//! the next edit's syntax map can translate into it directly.

use enc_ir::{Anchor, DebugId, FunctionKind, Generation, Name, ParamDecl, TypeRef};
use enc_symbols::SigType;

use crate::{ClosureKind, Representation};

/// One field of an environment record.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum EnvField {
    /// The enclosing instance.
    This { ty: TypeRef },
    /// A captured parameter or local.
    Variable {
        name: Name,
        ty: TypeRef,
        anchor: Anchor,
    },
    /// Reference to the parent environment.
    Link { parent: DebugId },
}

impl EnvField {
    /// Whether two fields occupy the same slot: same variable name and lowered
    /// type, same enclosing-instance type, or same link target.
    pub fn same_slot(&self, other: &EnvField) -> bool {
        match (self, other) {
            (EnvField::This { ty: a }, EnvField::This { ty: b }) => {
                SigType::lower(a) == SigType::lower(b)
            }
            (
                EnvField::Variable { name: na, ty: ta, .. },
                EnvField::Variable { name: nb, ty: tb, .. },
            ) => na == nb && SigType::lower(ta) == SigType::lower(tb),
            (EnvField::Link { parent: a }, EnvField::Link { parent: b }) => a == b,
            _ => false,
        }
    }

    pub fn var_anchor(&self) -> Option<Anchor> {
        match self {
            EnvField::Variable { anchor, .. } => Some(*anchor),
            EnvField::This { .. } | EnvField::Link { .. } => None,
        }
    }
}

/// A synthesized environment type as last emitted.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct EnvRecord {
    /// Anchor of the scope that owns the record.
    pub anchor: Anchor,
    /// Closure ordinal and the generation that minted the type.
    pub id: DebugId,
    pub representation: Representation,
    pub parent: Option<DebugId>,
    /// Fields in emission order.
    pub fields: Vec<EnvField>,
    /// Generation of the last field addition.
    pub shape: Generation,
}

/// A lambda or local function as last emitted.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct LambdaRecord {
    pub anchor: Anchor,
    /// Lambda ordinal and the generation that minted the method.
    pub id: DebugId,
    pub function_kind: FunctionKind,
    /// Source name of a local function.
    pub local_name: Name,
    pub kind: ClosureKind,
    pub host: Option<DebugId>,
    pub struct_envs: Vec<DebugId>,
    pub params: Vec<ParamDecl>,
    pub ret: TypeRef,
}

/// Closure state of one method.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct MethodClosures {
    pub envs: Vec<EnvRecord>,
    pub lambdas: Vec<LambdaRecord>,
    pub next_closure_ordinal: u32,
    pub next_lambda_ordinal: u32,
}

impl MethodClosures {
    pub fn is_empty(&self) -> bool {
        self.envs.is_empty() && self.lambdas.is_empty()
    }

    pub fn env(&self, id: DebugId) -> Option<&EnvRecord> {
        self.envs.iter().find(|e| e.id == id)
    }

    pub fn env_by_anchor(&self, anchor: Anchor) -> Option<&EnvRecord> {
        self.envs.iter().find(|e| e.anchor == anchor)
    }

    pub fn lambda_by_anchor(&self, anchor: Anchor) -> Option<&LambdaRecord> {
        self.lambdas.iter().find(|l| l.anchor == anchor)
    }

    /// Environment holding the variable declared at `anchor`, with the field.
    pub fn field_of_variable(&self, anchor: Anchor) -> Option<(&EnvRecord, &EnvField)> {
        self.envs.iter().find_map(|env| {
            env.fields
                .iter()
                .find(|f| f.var_anchor() == Some(anchor))
                .map(|f| (env, f))
        })
    }
}
