//! Session-wide string interner.
//!
//! Every generation of an edit session interns into the same table, so names
//! coming from the baseline and from the edited program can be compared
//! directly. Reads vastly outnumber writes once the initial declaration tree
//! is interned, so a single `RwLock` is enough.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::Name;

/// Error when interning a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternError {
    /// The table exceeded `u32::MAX` entries.
    Overflow { count: usize },
}

impl std::fmt::Display for InternError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InternError::Overflow { count } => write!(
                f,
                "interner exceeded capacity: {count} strings, max is {}",
                u32::MAX
            ),
        }
    }
}

impl std::error::Error for InternError {}

struct InternTable {
    map: FxHashMap<&'static str, u32>,
    strings: Vec<&'static str>,
}

impl InternTable {
    fn with_empty() -> Self {
        let empty: &'static str = "";
        let mut map = FxHashMap::default();
        map.insert(empty, 0);
        InternTable {
            map,
            strings: vec![empty],
        }
    }
}

/// Thread-safe string interner.
///
/// Strings are leaked to obtain `'static` lifetimes; an interner lives as long
/// as its edit session, which is the lifetime of the host process.
pub struct StringInterner {
    table: RwLock<InternTable>,
}

/// Interner shared between the session and its worker threads.
pub type SharedInterner = Arc<StringInterner>;

impl StringInterner {
    /// Create an interner holding only the empty string.
    pub fn new() -> Self {
        StringInterner {
            table: RwLock::new(InternTable::with_empty()),
        }
    }

    /// Create a shared interner.
    pub fn shared() -> SharedInterner {
        Arc::new(Self::new())
    }

    /// Rebuild an interner from a snapshot produced by [`Self::strings`].
    ///
    /// Strings are re-interned in table order, so every `Name` issued by the
    /// original interner resolves to the same text in the rebuilt one.
    pub fn from_strings<I, S>(strings: I) -> Result<Self, InternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let interner = Self::new();
        for s in strings {
            interner.try_intern(s.as_ref())?;
        }
        Ok(interner)
    }

    /// Try to intern a string, returning its Name or an error on overflow.
    pub fn try_intern(&self, s: &str) -> Result<Name, InternError> {
        {
            let guard = self.table.read();
            if let Some(&index) = guard.map.get(s) {
                return Ok(Name::from_raw(index));
            }
        }

        let mut guard = self.table.write();
        // Double-check after acquiring the write lock.
        if let Some(&index) = guard.map.get(s) {
            return Ok(Name::from_raw(index));
        }

        let index = u32::try_from(guard.strings.len()).map_err(|_| InternError::Overflow {
            count: guard.strings.len(),
        })?;
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        guard.strings.push(leaked);
        guard.map.insert(leaked, index);
        Ok(Name::from_raw(index))
    }

    /// Intern a string, returning its Name.
    ///
    /// # Panics
    /// Panics if the interner exceeds `u32::MAX` strings.
    pub fn intern(&self, s: &str) -> Name {
        self.try_intern(s).unwrap_or_else(|e| panic!("{}", e))
    }

    /// Look up the string for a Name.
    ///
    /// Unknown names resolve to the empty string.
    pub fn lookup(&self, name: Name) -> &'static str {
        let guard = self.table.read();
        guard.strings.get(name.index()).copied().unwrap_or("")
    }

    /// Number of interned strings, including the empty string.
    pub fn len(&self) -> usize {
        self.table.read().strings.len()
    }

    /// Always false: the empty string is pre-interned.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Snapshot of the string table in index order.
    pub fn strings(&self) -> Vec<String> {
        self.table
            .read()
            .strings
            .iter()
            .map(|s| (*s).to_owned())
            .collect()
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StringInterner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StringInterner")
            .field("len", &self.len())
            .finish()
    }
}
