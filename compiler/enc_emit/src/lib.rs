//! Metadata delta emission.
//!
//! Turns closure plans and declaration changes into the rows a running
//! module can absorb. Deltas only ever append: an existing row is never
//! rewritten, a changed body is expressed as a fresh row for the same token,
//! and a member added to an existing type is introduced by an attach entry
//! naming the container's row.
//!
//! - [`names`]: generation-stable names for synthesized members
//! - [`RowLedger`]: every row emitted so far, carried in the baseline
//! - [`DeltaBuilder`]: appends rows for one generation and orders the log
//! - [`MetadataDelta::to_bytes`]: the binary wire form
//! - [`Manifest`]: the module's members after a delta, grouped by container

mod delta;
mod encode;
mod ledger;
mod manifest;
pub mod names;
mod table;

pub use delta::{
    DeltaBuilder, DeltaRow, EncLogEntry, MetadataDelta, MethodBody, NewField, NewMethod, NewType,
    RowData, RowOperation,
};
pub use encode::{FORMAT_VERSION, MAGIC};
pub use ledger::{FieldEntry, MethodEntry, RowLedger, TypeEntry};
pub use manifest::{Manifest, ManifestMember, ManifestType};
pub use names::NameAllocator;
pub use table::{TableIndex, TableSizes, Token};
