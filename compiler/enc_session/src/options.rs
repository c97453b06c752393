//! Emission options.

/// Configuration for computing generations.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct EmitOptions {
    /// Analyze edited methods on worker threads.
    pub parallel: bool,
    /// Worker count; `None` lets the pool decide.
    pub threads: Option<usize>,
    /// Give retired lambdas a body that throws the session's sentinel
    /// exception.
    pub emit_traps: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions {
            parallel: true,
            threads: None,
            emit_traps: true,
        }
    }
}

impl EmitOptions {
    /// Defaults overridden by `ENC_PARALLEL`, `ENC_THREADS`, and `ENC_TRAPS`.
    pub fn from_env() -> Self {
        Self::default().merge(OptionOverrides::from_env())
    }

    #[must_use]
    pub fn merge(self, overrides: OptionOverrides) -> Self {
        EmitOptions {
            parallel: overrides.parallel.unwrap_or(self.parallel),
            threads: overrides.threads.or(self.threads),
            emit_traps: overrides.emit_traps.unwrap_or(self.emit_traps),
        }
    }

    /// Options for a single-threaded run.
    #[must_use]
    pub fn sequential() -> Self {
        EmitOptions {
            parallel: false,
            ..Self::default()
        }
    }
}

/// Partial options, typically read from the environment.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct OptionOverrides {
    pub parallel: Option<bool>,
    pub threads: Option<usize>,
    pub emit_traps: Option<bool>,
}

impl OptionOverrides {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`. Unparsable values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        OptionOverrides {
            parallel: lookup("ENC_PARALLEL").and_then(|v| parse_flag(&v)),
            threads: lookup("ENC_THREADS")
                .and_then(|v| v.trim().parse().ok())
                .filter(|&n: &usize| n > 0),
            emit_traps: lookup("ENC_TRAPS").and_then(|v| parse_flag(&v)),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "true" | "on" => Some(true),
        "0" | "false" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_overrides_from_lookup() {
        let overrides = OptionOverrides::from_lookup(|key| match key {
            "ENC_PARALLEL" => Some("0".to_owned()),
            "ENC_THREADS" => Some(" 4 ".to_owned()),
            "ENC_TRAPS" => Some("maybe".to_owned()),
            _ => None,
        });
        assert_eq!(
            overrides,
            OptionOverrides {
                parallel: Some(false),
                threads: Some(4),
                emit_traps: None,
            }
        );

        let options = EmitOptions::default().merge(overrides);
        assert!(!options.parallel);
        assert_eq!(options.threads, Some(4));
        assert!(options.emit_traps);
    }

    #[test]
    fn test_zero_threads_is_ignored() {
        let overrides = OptionOverrides::from_lookup(|key| {
            (key == "ENC_THREADS").then(|| "0".to_owned())
        });
        assert_eq!(overrides.threads, None);
        assert_eq!(EmitOptions::default().merge(overrides), EmitOptions::default());
    }
}
