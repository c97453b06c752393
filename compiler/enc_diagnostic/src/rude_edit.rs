//! Edits that cannot be applied to a running module.

use std::fmt;

use enc_ir::Span;

use crate::{Diagnostic, ErrorCode};

/// Closed set of unsupported edit shapes.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum RudeEditKind {
    RenamingCapturedVariable,
    ChangingCapturedVariableType,
    ChangingCapturedVariableScope,
    ChangingLambdaParameters,
    ChangingLambdaReturnType,
    SwitchBetweenLambdaAndLocalFunction,
    ChangingMethodSignature,
    BaseTypeUpdate,
    TypeKindUpdate,
    InsertIntoStruct,
    InsertIntoInterface,
    FieldTypeUpdate,
    InsertVirtual,
}

impl RudeEditKind {
    pub fn code(self) -> ErrorCode {
        match self {
            RudeEditKind::RenamingCapturedVariable => ErrorCode::E0101,
            RudeEditKind::ChangingCapturedVariableType => ErrorCode::E0102,
            RudeEditKind::ChangingCapturedVariableScope => ErrorCode::E0103,
            RudeEditKind::ChangingLambdaParameters => ErrorCode::E0104,
            RudeEditKind::ChangingLambdaReturnType => ErrorCode::E0105,
            RudeEditKind::SwitchBetweenLambdaAndLocalFunction => ErrorCode::E0106,
            RudeEditKind::ChangingMethodSignature => ErrorCode::E0201,
            RudeEditKind::BaseTypeUpdate => ErrorCode::E0202,
            RudeEditKind::TypeKindUpdate => ErrorCode::E0203,
            RudeEditKind::InsertIntoStruct => ErrorCode::E0204,
            RudeEditKind::InsertIntoInterface => ErrorCode::E0205,
            RudeEditKind::FieldTypeUpdate => ErrorCode::E0206,
            RudeEditKind::InsertVirtual => ErrorCode::E0207,
        }
    }

    /// Reason shown to the user, phrased after "cannot apply edit: ".
    pub fn reason(self) -> &'static str {
        match self {
            RudeEditKind::RenamingCapturedVariable => "a captured variable was renamed",
            RudeEditKind::ChangingCapturedVariableType => {
                "the type of a captured variable was changed"
            }
            RudeEditKind::ChangingCapturedVariableScope => {
                "a captured variable was moved to a different scope"
            }
            RudeEditKind::ChangingLambdaParameters => "the parameters of a lambda were changed",
            RudeEditKind::ChangingLambdaReturnType => "the return type of a lambda was changed",
            RudeEditKind::SwitchBetweenLambdaAndLocalFunction => {
                "a lambda was turned into a local function or back"
            }
            RudeEditKind::ChangingMethodSignature => "the signature of a method was changed",
            RudeEditKind::BaseTypeUpdate => "the base type of a type was changed",
            RudeEditKind::TypeKindUpdate => "the kind of a type was changed",
            RudeEditKind::InsertIntoStruct => "a field was added to an existing value type",
            RudeEditKind::InsertIntoInterface => "a member was added to an existing interface",
            RudeEditKind::FieldTypeUpdate => "the type of a field was changed",
            RudeEditKind::InsertVirtual => "a virtual method was added to an existing type",
        }
    }
}

impl fmt::Display for RudeEditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// One unsupported change, located and attributed to a declaration.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct RudeEdit {
    pub kind: RudeEditKind,
    pub span: Span,
    /// Qualified name of the offending declaration.
    pub declaration: String,
}

impl RudeEdit {
    pub fn new(kind: RudeEditKind, span: Span, declaration: impl Into<String>) -> Self {
        RudeEdit {
            kind,
            span,
            declaration: declaration.into(),
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.kind.code())
            .with_message(format!("cannot apply edit: {}", self.kind.reason()))
            .with_label(self.span, format!("in `{}`", self.declaration))
            .with_note("restart the program to apply this change")
    }
}

impl fmt::Display for RudeEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.declaration, self.kind.code(), self.kind)
    }
}
