use std::fmt;

/// Error codes for edit-and-continue diagnostics.
///
/// Format: E#### where the first digit indicates the class:
/// - E01xx: Capture and nested-function edits
/// - E02xx: Declaration shape edits
/// - E9xxx: Internal errors
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    // Capture edits (E01xx)
    /// Captured variable renamed
    E0101,
    /// Captured variable type changed
    E0102,
    /// Captured variable moved to a different scope
    E0103,
    /// Lambda parameters changed
    E0104,
    /// Lambda return type changed
    E0105,
    /// Lambda turned into local function or back
    E0106,

    // Declaration edits (E02xx)
    /// Signature of an updated method changed
    E0201,
    /// Base type changed
    E0202,
    /// Type kind changed
    E0203,
    /// Field added to a value type
    E0204,
    /// Member added to an interface
    E0205,
    /// Field type changed
    E0206,
    /// Virtual method added
    E0207,

    // Internal errors (E9xxx)
    /// Two synthesized members allocated the same name
    E9001,
    /// Delta rows emitted out of ascending order
    E9002,
    /// Edit names a method absent from its declaration tree
    E9003,
    /// Generation applied against the wrong baseline
    E9004,
    /// Member emitted into a type that has no row
    E9005,
}

impl ErrorCode {
    /// Check if this is an internal error (a bug, never a user condition).
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            ErrorCode::E9001
                | ErrorCode::E9002
                | ErrorCode::E9003
                | ErrorCode::E9004
                | ErrorCode::E9005
        )
    }

    /// Get the string representation of this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E0101 => "E0101",
            ErrorCode::E0102 => "E0102",
            ErrorCode::E0103 => "E0103",
            ErrorCode::E0104 => "E0104",
            ErrorCode::E0105 => "E0105",
            ErrorCode::E0106 => "E0106",
            ErrorCode::E0201 => "E0201",
            ErrorCode::E0202 => "E0202",
            ErrorCode::E0203 => "E0203",
            ErrorCode::E0204 => "E0204",
            ErrorCode::E0205 => "E0205",
            ErrorCode::E0206 => "E0206",
            ErrorCode::E0207 => "E0207",
            ErrorCode::E9001 => "E9001",
            ErrorCode::E9002 => "E9002",
            ErrorCode::E9003 => "E9003",
            ErrorCode::E9004 => "E9004",
            ErrorCode::E9005 => "E9005",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_classification() {
        assert!(ErrorCode::E9001.is_internal());
        assert!(!ErrorCode::E0101.is_internal());
        assert_eq!(ErrorCode::E0204.to_string(), "E0204");
    }
}
