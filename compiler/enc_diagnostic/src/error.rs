use enc_ir::{Generation, Span};
use thiserror::Error;

use crate::{Diagnostic, ErrorCode, RudeEdit};

/// Failure of a generation's computation.
///
/// Any error aborts the whole generation; the committed baseline is left
/// untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmitError {
    #[error("{} rude edit(s) prevent applying the change", .0.len())]
    RudeEdits(Vec<RudeEdit>),

    #[error("synthesized name `{name}` allocated twice in generation {generation}")]
    AllocatorCollision { name: String, generation: Generation },

    #[error("{table} rows emitted out of order: row {row} after row {previous}")]
    RowOrderViolation {
        table: &'static str,
        previous: u32,
        row: u32,
    },

    #[error("method `{0}` is not present in its declaration tree")]
    UnknownMethod(String),

    #[error("type `{0}` has no row in the ledger")]
    UnknownType(String),

    #[error("generation {found} cannot follow baseline generation {baseline}")]
    GenerationOutOfOrder {
        baseline: Generation,
        found: Generation,
    },
}

impl EmitError {
    /// Code of the first problem this error carries.
    pub fn code(&self) -> ErrorCode {
        match self {
            EmitError::RudeEdits(edits) => edits
                .first()
                .map_or(ErrorCode::E0201, |edit| edit.kind.code()),
            EmitError::AllocatorCollision { .. } => ErrorCode::E9001,
            EmitError::RowOrderViolation { .. } => ErrorCode::E9002,
            EmitError::UnknownMethod(_) => ErrorCode::E9003,
            EmitError::GenerationOutOfOrder { .. } => ErrorCode::E9004,
            EmitError::UnknownType(_) => ErrorCode::E9005,
        }
    }

    pub fn is_rude_edit(&self) -> bool {
        matches!(self, EmitError::RudeEdits(_))
    }

    /// Rude edits carried by this error, empty for internal errors.
    pub fn rude_edits(&self) -> &[RudeEdit] {
        match self {
            EmitError::RudeEdits(edits) => edits,
            _ => &[],
        }
    }

    /// One diagnostic per rude edit, or a single internal-error diagnostic.
    pub fn to_diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            EmitError::RudeEdits(edits) => edits.iter().map(RudeEdit::to_diagnostic).collect(),
            other => vec![Diagnostic::error(other.code())
                .with_message(format!("internal error: {other}"))
                .with_label(Span::DUMMY, "while computing the delta")],
        }
    }
}
