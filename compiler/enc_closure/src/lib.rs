//! Closure conversion analysis for incremental delta emission.
//!
//! For one edited method this crate decides which lexical scopes need a
//! synthesized environment record, how each lambda and local function is
//! hosted, and how the result relates to the environments and lambdas the
//! previous generation already emitted.
//!
//! # Pipeline
//!
//! ```text
//! CaptureAnalysis ─► build_forest ─► ClosureForest
//!                                         │
//!        MethodClosures (baseline) ──► closure_rude_edits ─► Vec<RudeEdit>
//!                                         │
//!                                    match_closures ─► ClosurePlan
//! ```
//!
//! The plan carries debug ids only. Names and rows are assigned later by the
//! emitter, which runs single-threaded over every method's plan.

mod builder;
mod debug_info;
mod matcher;
mod preflight;
mod stack;
mod tree;

pub use builder::build_forest;
pub use debug_info::{EnvField, EnvRecord, LambdaRecord, MethodClosures};
pub use matcher::{
    match_closures, ClosurePlan, EnvChange, EnvPlan, LambdaChange, LambdaPlan, RetireReason,
    RetiredLambda,
};
pub use preflight::closure_rude_edits;
pub use tree::{ClosureForest, ClosureKind, ClosureScope, LambdaTarget, Representation};
