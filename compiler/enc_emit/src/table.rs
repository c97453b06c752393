//! Tables, tokens, and row counts.

use std::fmt;

/// A metadata table a delta can touch.
///
/// Variant order is the order tables appear in the edit log.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum TableIndex {
    TypeDef,
    Field,
    MethodDef,
    Param,
    NestedClass,
}

impl TableIndex {
    pub const ALL: [TableIndex; 5] = [
        TableIndex::TypeDef,
        TableIndex::Field,
        TableIndex::MethodDef,
        TableIndex::Param,
        TableIndex::NestedClass,
    ];

    /// Table number as it appears in the high byte of a token.
    pub const fn code(self) -> u8 {
        match self {
            TableIndex::TypeDef => 0x02,
            TableIndex::Field => 0x04,
            TableIndex::MethodDef => 0x06,
            TableIndex::Param => 0x08,
            TableIndex::NestedClass => 0x29,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TableIndex::TypeDef => "TypeDef",
            TableIndex::Field => "Field",
            TableIndex::MethodDef => "MethodDef",
            TableIndex::Param => "Param",
            TableIndex::NestedClass => "NestedClass",
        }
    }

    #[inline]
    const fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for TableIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Table code in the high byte, 1-based row in the low three bytes.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct Token(u32);

impl Token {
    const ROW_MASK: u32 = 0x00FF_FFFF;

    #[inline]
    pub const fn new(table: TableIndex, row: u32) -> Self {
        Token(((table.code() as u32) << 24) | (row & Self::ROW_MASK))
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn row(self) -> u32 {
        self.0 & Self::ROW_MASK
    }

    pub fn table(self) -> Option<TableIndex> {
        TableIndex::from_code(self.0.to_be_bytes()[0])
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:#010x})", self.0)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Row count of each table; the last row emitted so far.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct TableSizes {
    rows: [u32; 5],
}

impl TableSizes {
    #[inline]
    pub fn get(&self, table: TableIndex) -> u32 {
        self.rows[table.slot()]
    }

    /// Reserve the next row of `table`.
    pub(crate) fn allocate(&mut self, table: TableIndex) -> u32 {
        let slot = &mut self.rows[table.slot()];
        *slot += 1;
        *slot
    }
}
