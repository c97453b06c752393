//! Matching of records identified only by their shape.
//!
//! Anonymous records and synthesized environments have no user-visible
//! name. Across generations they are paired by the multiset of their
//! elements: an exact `(name, type)` multiset match wins; otherwise, when
//! renames are tolerated, a unique candidate with the same type multiset is
//! accepted. A changed element type never matches.

use enc_ir::Name;

use crate::SigType;

/// Elements of a shape-identified record, in declaration order.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct RecordShape {
    pub elements: Vec<(Name, SigType)>,
}

impl RecordShape {
    pub fn new(elements: Vec<(Name, SigType)>) -> Self {
        RecordShape { elements }
    }

    fn named_multiset(&self) -> Vec<(Name, SigType)> {
        let mut elements = self.elements.clone();
        elements.sort();
        elements
    }

    fn type_multiset(&self) -> Vec<SigType> {
        let mut types: Vec<SigType> = self.elements.iter().map(|(_, ty)| ty.clone()).collect();
        types.sort();
        types
    }
}

/// How a new record was paired with an old one.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ShapeMatch {
    /// Same names and types.
    Exact,
    /// Same types, at least one element renamed.
    Renamed,
}

/// Pair `new` records with `old` ones.
///
/// Both slices must be in declaration order; among equal candidates the
/// earliest unclaimed old record wins. The result is indexed like `new` and
/// never pairs two new records with the same old one.
pub fn match_shapes(
    new: &[RecordShape],
    old: &[RecordShape],
    tolerate_renames: bool,
) -> Vec<Option<(usize, ShapeMatch)>> {
    let mut result = vec![None; new.len()];
    let mut claimed = vec![false; old.len()];

    let old_named: Vec<_> = old.iter().map(RecordShape::named_multiset).collect();
    for (i, shape) in new.iter().enumerate() {
        let named = shape.named_multiset();
        if let Some(j) = (0..old.len()).find(|&j| !claimed[j] && old_named[j] == named) {
            claimed[j] = true;
            result[i] = Some((j, ShapeMatch::Exact));
        }
    }

    if !tolerate_renames {
        return result;
    }

    let old_types: Vec<_> = old.iter().map(RecordShape::type_multiset).collect();
    for (i, shape) in new.iter().enumerate() {
        if result[i].is_some() {
            continue;
        }
        let types = shape.type_multiset();
        let mut candidates = (0..old.len()).filter(|&j| !claimed[j] && old_types[j] == types);
        if let (Some(j), None) = (candidates.next(), candidates.next()) {
            claimed[j] = true;
            result[i] = Some((j, ShapeMatch::Renamed));
        }
    }

    result
}
