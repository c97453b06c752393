#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

//! Multi-generation session tests.
//!
//! Every test drives a real [`enc_session::EditSession`] through a cold build
//! and one or more edits of a small program, then inspects the delta, the
//! manifest, and the committed baseline.
//!
//! - `common/` - the program fixture and capture-analysis shapes
//! - `scenarios` - environment creation, supersession, flattening, elision
//! - `rude` - rejected generations leave the baseline untouched
//! - `traps` - retired lambdas and the sentinel exception type
//! - `rebind` - where suspended-frame variables live after a delta
//! - `properties` - idempotence and name stability
//!
//! ```bash
//! cargo test -p enc_session --test generations
//! ```

#[path = "generations/common/mod.rs"]
mod common;

#[path = "generations/scenarios.rs"]
mod scenarios;

#[path = "generations/rude.rs"]
mod rude;

#[path = "generations/traps.rs"]
mod traps;

#[path = "generations/rebind.rs"]
mod rebind;

#[path = "generations/properties.rs"]
mod properties;
