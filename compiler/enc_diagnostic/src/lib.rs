//! Diagnostics for edits that cannot be applied incrementally.
//!
//! - Error codes for searchability (`E0xxx` rude edits, `E9xxx` internal)
//! - [`RudeEdit`]: one unsupported change, naming the declaration and reason
//! - [`Diagnostic`]: the user-facing rendering of a rude edit or error
//! - [`EmitError`]: the failure type of every fallible pipeline entry point

mod diagnostic;
mod error;
mod error_code;
mod rude_edit;

pub use diagnostic::{Diagnostic, Label, Severity};
pub use error::EmitError;
pub use error_code::ErrorCode;
pub use rude_edit::{RudeEdit, RudeEditKind};
