//! Per-method capture analysis.
//!
//! The semantic layer reports, for each method body it compiles, the lexical
//! scopes of the body, the variables they declare, and every lambda or local
//! function together with the outer variables it reads or writes. Closure
//! conversion works entirely from this summary.

use crate::{Anchor, BodyRef, Name, ParamDecl, TypeRef};

macro_rules! capture_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
        #[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn new(index: u32) -> Self {
                $name(index)
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

capture_id!(
    /// Index of a lexical scope within one method's analysis.
    ScopeId
);
capture_id!(
    /// Index of a variable within one method's analysis.
    VarId
);
capture_id!(
    /// Index of a lambda or local function within one method's analysis.
    FunctionId
);

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum VariableKind {
    Parameter,
    Local,
    /// The enclosing instance reference.
    This,
}

#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Variable {
    pub name: Name,
    pub scope: ScopeId,
    pub kind: VariableKind,
    pub ty: TypeRef,
    pub anchor: Anchor,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct LexicalScope {
    pub anchor: Anchor,
    pub parent: Option<ScopeId>,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum FunctionKind {
    Lambda,
    LocalFunction,
}

/// A lambda or named local function.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct NestedFunction {
    /// Source name of a local function; empty for lambdas.
    pub name: Name,
    pub kind: FunctionKind,
    pub anchor: Anchor,
    /// Scope the function is declared in.
    pub scope: ScopeId,
    /// Scope of the function's own body.
    pub body_scope: ScopeId,
    /// Innermost nested function whose body contains this one.
    pub parent: Option<FunctionId>,
    /// Outer variables the body references directly.
    pub captures: Vec<VarId>,
    /// Converted to a delegate, so it may outlive the declaring frame.
    /// Always true for lambdas.
    pub converted: bool,
    pub params: Vec<ParamDecl>,
    pub ret: TypeRef,
    pub body: BodyRef,
}

/// Scopes, variables, and nested functions of one method body.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct CaptureAnalysis {
    scopes: Vec<LexicalScope>,
    variables: Vec<Variable>,
    functions: Vec<NestedFunction>,
}

impl CaptureAnalysis {
    /// The outermost scope of the method body, where parameters live.
    pub const ROOT: ScopeId = ScopeId(0);

    /// Analysis of a body with no nested functions and no variables.
    pub fn empty(root_anchor: Anchor) -> Self {
        CaptureAnalysisBuilder::new(root_anchor).finish()
    }

    #[inline]
    pub fn scope(&self, id: ScopeId) -> &LexicalScope {
        &self.scopes[id.index()]
    }

    #[inline]
    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.index()]
    }

    #[inline]
    pub fn function(&self, id: FunctionId) -> &NestedFunction {
        &self.functions[id.index()]
    }

    pub fn scope_ids(&self) -> impl Iterator<Item = ScopeId> + '_ {
        (0..self.scopes.len()).map(|i| ScopeId::new(index_u32(i)))
    }

    pub fn var_ids(&self) -> impl Iterator<Item = VarId> + '_ {
        (0..self.variables.len()).map(|i| VarId::new(index_u32(i)))
    }

    pub fn function_ids(&self) -> impl Iterator<Item = FunctionId> + '_ {
        (0..self.functions.len()).map(|i| FunctionId::new(index_u32(i)))
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn has_functions(&self) -> bool {
        !self.functions.is_empty()
    }

    /// Whether `scope` is `ancestor` or nested (transitively) inside it.
    pub fn is_within(&self, scope: ScopeId, ancestor: ScopeId) -> bool {
        let mut current = Some(scope);
        while let Some(s) = current {
            if s == ancestor {
                return true;
            }
            current = self.scope(s).parent;
        }
        false
    }

    /// Number of parent links between `scope` and the root.
    pub fn depth(&self, scope: ScopeId) -> usize {
        let mut depth = 0;
        let mut current = self.scope(scope).parent;
        while let Some(s) = current {
            depth += 1;
            current = self.scope(s).parent;
        }
        depth
    }

    /// The enclosing-instance variable, if the method has one.
    pub fn this_var(&self) -> Option<VarId> {
        self.var_ids()
            .find(|&v| self.variable(v).kind == VariableKind::This)
    }

    pub fn find_variable_by_anchor(&self, anchor: Anchor) -> Option<VarId> {
        self.var_ids().find(|&v| self.variable(v).anchor == anchor)
    }

    pub fn find_function_by_anchor(&self, anchor: Anchor) -> Option<FunctionId> {
        self.function_ids()
            .find(|&f| self.function(f).anchor == anchor)
    }

    /// Whether `var` is declared inside the body of `function`.
    pub fn declared_inside(&self, var: VarId, function: FunctionId) -> bool {
        self.is_within(self.variable(var).scope, self.function(function).body_scope)
    }
}

#[inline]
fn index_u32(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

/// Incremental construction of a [`CaptureAnalysis`].
///
/// Function parents are derived in [`finish`](Self::finish) from scope
/// containment, so functions may be added in any order.
pub struct CaptureAnalysisBuilder {
    analysis: CaptureAnalysis,
}

impl CaptureAnalysisBuilder {
    /// Start an analysis whose root scope sits at `root_anchor`.
    pub fn new(root_anchor: Anchor) -> Self {
        CaptureAnalysisBuilder {
            analysis: CaptureAnalysis {
                scopes: vec![LexicalScope {
                    anchor: root_anchor,
                    parent: None,
                }],
                variables: Vec::new(),
                functions: Vec::new(),
            },
        }
    }

    pub fn scope(&mut self, parent: ScopeId, anchor: Anchor) -> ScopeId {
        let id = ScopeId::new(index_u32(self.analysis.scopes.len()));
        self.analysis.scopes.push(LexicalScope {
            anchor,
            parent: Some(parent),
        });
        id
    }

    pub fn variable(
        &mut self,
        scope: ScopeId,
        name: Name,
        kind: VariableKind,
        ty: TypeRef,
        anchor: Anchor,
    ) -> VarId {
        let id = VarId::new(index_u32(self.analysis.variables.len()));
        self.analysis.variables.push(Variable {
            name,
            scope,
            kind,
            ty,
            anchor,
        });
        id
    }

    pub fn local(&mut self, scope: ScopeId, name: Name, ty: TypeRef, anchor: Anchor) -> VarId {
        self.variable(scope, name, VariableKind::Local, ty, anchor)
    }

    pub fn parameter(&mut self, name: Name, ty: TypeRef, anchor: Anchor) -> VarId {
        self.variable(
            CaptureAnalysis::ROOT,
            name,
            VariableKind::Parameter,
            ty,
            anchor,
        )
    }

    /// Declare the enclosing-instance reference in the root scope.
    pub fn this(&mut self, ty: TypeRef, anchor: Anchor) -> VarId {
        self.variable(
            CaptureAnalysis::ROOT,
            Name::EMPTY,
            VariableKind::This,
            ty,
            anchor,
        )
    }

    /// Add a lambda declared in `scope`. Its body scope shares its anchor.
    pub fn lambda(&mut self, scope: ScopeId, anchor: Anchor, ret: TypeRef) -> FunctionId {
        self.function(scope, Name::EMPTY, FunctionKind::Lambda, anchor, ret, true)
    }

    /// Add a named local function declared in `scope`.
    pub fn local_function(
        &mut self,
        scope: ScopeId,
        name: Name,
        anchor: Anchor,
        ret: TypeRef,
    ) -> FunctionId {
        self.function(
            scope,
            name,
            FunctionKind::LocalFunction,
            anchor,
            ret,
            false,
        )
    }

    fn function(
        &mut self,
        scope: ScopeId,
        name: Name,
        kind: FunctionKind,
        anchor: Anchor,
        ret: TypeRef,
        converted: bool,
    ) -> FunctionId {
        let body_scope = self.scope(scope, anchor);
        let id = FunctionId::new(index_u32(self.analysis.functions.len()));
        self.analysis.functions.push(NestedFunction {
            name,
            kind,
            anchor,
            scope,
            body_scope,
            parent: None,
            captures: Vec::new(),
            converted,
            params: Vec::new(),
            ret,
            body: BodyRef(u64::from(anchor.offset())),
        });
        id
    }

    /// Scope of a function's body, for declaring its own locals and nested
    /// functions.
    pub fn body_scope(&self, function: FunctionId) -> ScopeId {
        self.analysis.functions[function.index()].body_scope
    }

    /// Record that `function` references `var` directly.
    pub fn capture(&mut self, function: FunctionId, var: VarId) -> &mut Self {
        let captures = &mut self.analysis.functions[function.index()].captures;
        if !captures.contains(&var) {
            captures.push(var);
        }
        self
    }

    /// Record that a local function is converted to a delegate.
    pub fn converted(&mut self, function: FunctionId) -> &mut Self {
        self.analysis.functions[function.index()].converted = true;
        self
    }

    pub fn param(&mut self, function: FunctionId, param: ParamDecl) -> &mut Self {
        self.analysis.functions[function.index()].params.push(param);
        self
    }

    pub fn body(&mut self, function: FunctionId, body: BodyRef) -> &mut Self {
        self.analysis.functions[function.index()].body = body;
        self
    }

    pub fn finish(mut self) -> CaptureAnalysis {
        let parents: Vec<Option<FunctionId>> = self
            .analysis
            .function_ids()
            .map(|f| self.enclosing_function(f))
            .collect();
        for (function, parent) in self.analysis.functions.iter_mut().zip(parents) {
            function.parent = parent;
            function.captures.sort();
        }
        self.analysis
    }

    fn enclosing_function(&self, function: FunctionId) -> Option<FunctionId> {
        let analysis = &self.analysis;
        let mut current = Some(analysis.function(function).scope);
        while let Some(scope) = current {
            if let Some(owner) = analysis
                .function_ids()
                .find(|&g| analysis.function(g).body_scope == scope)
            {
                return Some(owner);
            }
            current = analysis.scope(scope).parent;
        }
        None
    }
}
