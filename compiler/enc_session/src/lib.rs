//! Edit sessions.
//!
//! An [`EditSession`] holds the committed [`Baseline`] of one running
//! program. Each edit is described by a [`GenerationInput`]: the program's
//! declarations after the edit, the edited methods, and their capture
//! analyses. Preparing it runs the whole pipeline:
//!
//! 1. symbol matching and declaration checks (`enc_symbols`)
//! 2. per-method closure forests, capture checks, and closure matching
//!    (`enc_closure`), in parallel
//! 3. names, rows, and the edit log (`enc_emit`)
//!
//! and yields a [`GenerationOutput`] holding the delta, the manifest, the
//! rebind tables for suspended frames, and the baseline to commit.

mod baseline;
mod emit;
mod input;
mod options;
mod output;
mod pipeline;
mod session;
#[cfg(feature = "cache")]
mod snapshot;
mod trace;

pub use baseline::Baseline;
pub use emit::{
    sentinel_key, SENTINEL_NAMESPACE, SENTINEL_TYPE, TRAP_DELETED, TRAP_REHOSTED,
};
pub use input::{GenerationInput, SemanticEdit};
pub use options::{EmitOptions, OptionOverrides};
pub use output::{GenerationOutput, Rebind};
pub use session::EditSession;
#[cfg(feature = "cache")]
pub use snapshot::{SnapshotError, SNAPSHOT_VERSION};
pub use trace::init_tracing;
