//! Generations and generation-qualified ordinals.

use std::fmt;

/// One edit-compile-apply cycle of a live session.
///
/// Generation 0 is the cold build the running program was loaded from; each
/// applied delta produces the next generation.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct Generation(u32);

impl Generation {
    /// The cold build.
    pub const INITIAL: Generation = Generation(0);

    #[inline]
    pub const fn new(ordinal: u32) -> Self {
        Generation(ordinal)
    }

    #[inline]
    pub const fn ordinal(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_initial(self) -> bool {
        self.0 == 0
    }

    /// The generation that follows this one.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl fmt::Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen{}", self.0)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Positional ordinal qualified by the generation that introduced it.
///
/// Used for method ids, closure ids, and lambda ids. Rendered as `ordinal`
/// for the cold build and `ordinal#generation` afterwards, so an id minted in
/// a later generation can never spell the same as one minted earlier.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct DebugId {
    pub ordinal: u32,
    pub generation: Generation,
}

impl DebugId {
    #[inline]
    pub const fn new(ordinal: u32, generation: Generation) -> Self {
        DebugId {
            ordinal,
            generation,
        }
    }
}

impl fmt::Display for DebugId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generation.is_initial() {
            write!(f, "{}", self.ordinal)
        } else {
            write!(f, "{}#{}", self.ordinal, self.generation)
        }
    }
}
