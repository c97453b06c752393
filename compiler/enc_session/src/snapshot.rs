//! Bincode snapshots of a committed baseline.
//!
//! A snapshot stores the interner's string table next to the baseline, since
//! every `Name` inside the baseline is an index into that table. Loading
//! rebuilds the interner first and so restores the same indices.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use enc_closure::MethodClosures;
use enc_emit::RowLedger;
use enc_ir::{DebugId, DeclTree, Generation, InternError, StringInterner};
use enc_symbols::{MethodKey, TypeKey};

use crate::Baseline;

/// Bumped whenever the snapshot layout changes.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to encode baseline snapshot: {0}")]
    Encode(#[source] bincode::Error),

    #[error("failed to decode baseline snapshot: {0}")]
    Decode(#[source] bincode::Error),

    #[error("snapshot version {found} is not supported (expected {SNAPSHOT_VERSION})")]
    Version { found: u32 },

    #[error(transparent)]
    Interner(#[from] InternError),
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    strings: Vec<String>,
    generation: Option<Generation>,
    decls: &'a DeclTree,
    ledger: &'a RowLedger,
    method_ids: &'a FxHashMap<MethodKey, DebugId>,
    closures: &'a FxHashMap<MethodKey, MethodClosures>,
    static_containers: &'a FxHashMap<TypeKey, Generation>,
}

#[derive(Deserialize)]
struct SnapshotOwned {
    version: u32,
    strings: Vec<String>,
    generation: Option<Generation>,
    decls: DeclTree,
    ledger: RowLedger,
    method_ids: FxHashMap<MethodKey, DebugId>,
    closures: FxHashMap<MethodKey, MethodClosures>,
    static_containers: FxHashMap<TypeKey, Generation>,
}

impl Baseline {
    /// Encode the baseline together with `interner`'s strings.
    ///
    /// # Errors
    ///
    /// [`SnapshotError::Encode`] if bincode fails.
    pub fn to_snapshot(&self, interner: &StringInterner) -> Result<Vec<u8>, SnapshotError> {
        let snapshot = SnapshotRef {
            version: SNAPSHOT_VERSION,
            strings: interner.strings(),
            generation: self.generation,
            decls: &self.decls,
            ledger: &self.ledger,
            method_ids: &self.method_ids,
            closures: &self.closures,
            static_containers: &self.static_containers,
        };
        let bytes = bincode::serialize(&snapshot).map_err(SnapshotError::Encode)?;
        tracing::debug!(bytes = bytes.len(), generation = ?self.generation, "baseline snapshot");
        Ok(bytes)
    }

    /// Decode a snapshot into a baseline and the interner its names refer to.
    ///
    /// # Errors
    ///
    /// [`SnapshotError::Decode`] on malformed input, [`SnapshotError::Version`]
    /// for a snapshot written by another layout version.
    pub fn from_snapshot(bytes: &[u8]) -> Result<(Baseline, StringInterner), SnapshotError> {
        let snapshot: SnapshotOwned = bincode::deserialize(bytes).map_err(SnapshotError::Decode)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::Version {
                found: snapshot.version,
            });
        }
        let interner = StringInterner::from_strings(&snapshot.strings)?;
        let baseline = Baseline {
            generation: snapshot.generation,
            decls: Arc::new(snapshot.decls),
            ledger: snapshot.ledger,
            method_ids: snapshot.method_ids,
            closures: snapshot.closures,
            static_containers: snapshot.static_containers,
        };
        Ok((baseline, interner))
    }
}

#[cfg(test)]
mod tests {
    use enc_ir::{DeclTreeBuilder, MethodDecl, Primitive, TypeDecl, TypeRef};

    use super::*;
    use crate::{EditSession, EmitOptions, GenerationInput};

    #[test]
    fn test_snapshot_restores_baseline_and_names() {
        let interner = StringInterner::shared();
        let mut b = DeclTreeBuilder::new();
        let program = b.add_type(TypeDecl::class(&[interner.intern("App")], interner.intern("Program")));
        b.add_method(
            program,
            MethodDecl::new(interner.intern("Main"), TypeRef::prim(Primitive::Void)).with_static(),
        );

        let mut session = EditSession::new(Arc::clone(&interner), EmitOptions::sequential());
        if let Err(e) = session.apply(&GenerationInput::cold_build(b.finish())) {
            panic!("cold build failed: {e}");
        }

        let bytes = match session.baseline().to_snapshot(&interner) {
            Ok(bytes) => bytes,
            Err(e) => panic!("snapshot failed: {e}"),
        };
        let (restored, restored_interner) = match Baseline::from_snapshot(&bytes) {
            Ok(pair) => pair,
            Err(e) => panic!("restore failed: {e}"),
        };

        assert_eq!(restored.generation(), Some(Generation::INITIAL));
        assert_eq!(restored.ledger(), session.baseline().ledger());
        assert_eq!(
            restored.manifest(&restored_interner).to_string(),
            session.baseline().manifest(&interner).to_string()
        );
    }

    #[test]
    fn test_snapshot_rejects_garbage() {
        assert!(matches!(
            Baseline::from_snapshot(&[1, 2, 3]),
            Err(SnapshotError::Decode(_))
        ));
    }
}
