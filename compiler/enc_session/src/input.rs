//! What the semantic layer hands over for one generation.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use enc_ir::{CaptureAnalysis, DeclTree, MethodDeclId, SyntaxMap};

/// An edited top-level method.
#[derive(Clone, Debug)]
pub enum SemanticEdit {
    /// The body of an existing method changed.
    ///
    /// `old` asserts the baseline method it updates; without it the symbol
    /// matcher looks for a counterpart, and an update without one is an
    /// insertion. `syntax_map` translates the method's anchors into the
    /// baseline's; without it anchors are assumed stable.
    Update {
        method: MethodDeclId,
        old: Option<MethodDeclId>,
        syntax_map: Option<SyntaxMap>,
    },
    Insert { method: MethodDeclId },
}

impl SemanticEdit {
    pub fn update(method: MethodDeclId) -> Self {
        SemanticEdit::Update {
            method,
            old: None,
            syntax_map: None,
        }
    }

    pub fn update_of(method: MethodDeclId, old: MethodDeclId, syntax_map: SyntaxMap) -> Self {
        SemanticEdit::Update {
            method,
            old: Some(old),
            syntax_map: Some(syntax_map),
        }
    }

    pub fn insert(method: MethodDeclId) -> Self {
        SemanticEdit::Insert { method }
    }

    /// The method in the new declaration tree.
    pub fn method(&self) -> MethodDeclId {
        match self {
            SemanticEdit::Update { method, .. } | SemanticEdit::Insert { method } => *method,
        }
    }
}

/// One generation's input.
#[derive(Clone, Debug)]
pub struct GenerationInput {
    /// Every declaration of the program after the edit.
    pub decls: Arc<DeclTree>,
    pub edits: Vec<SemanticEdit>,
    /// Capture analysis of each edited method with nested functions.
    pub analyses: FxHashMap<MethodDeclId, CaptureAnalysis>,
}

impl GenerationInput {
    pub fn new(decls: DeclTree) -> Self {
        GenerationInput {
            decls: Arc::new(decls),
            edits: Vec::new(),
            analyses: FxHashMap::default(),
        }
    }

    /// Input for the cold build: every method is an insertion.
    pub fn cold_build(decls: DeclTree) -> Self {
        let edits = decls.method_ids().map(SemanticEdit::insert).collect();
        GenerationInput {
            edits,
            ..Self::new(decls)
        }
    }

    #[must_use]
    pub fn with_edit(mut self, edit: SemanticEdit) -> Self {
        self.edits.push(edit);
        self
    }

    #[must_use]
    pub fn with_analysis(mut self, method: MethodDeclId, analysis: CaptureAnalysis) -> Self {
        self.analyses.insert(method, analysis);
        self
    }
}
