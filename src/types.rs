use std::fmt;

use serde::Serialize;

/// Which lifecycle phase first assigned a setting's value.
///
/// Precedence is decided by phase order alone: whichever source writes a
/// setting first keeps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Never written, or only holding a fallback.
    #[default]
    Unset,
    /// Declared default value, applied in the set-defaults phase.
    Default,
    /// Command-line argument.
    CommandLine,
    /// Prefixed environment variable.
    Environment,
    /// Config file entry.
    Config,
}

impl Provenance {
    pub fn is_set(self) -> bool {
        self != Provenance::Unset
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Unset => "unset",
            Provenance::Default => "default",
            Provenance::CommandLine => "command line",
            Provenance::Environment => "environment",
            Provenance::Config => "config file",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a write that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The value was stored and the provenance recorded.
    Stored,
    /// An earlier phase already set the value; nothing changed.
    AlreadySet,
}

impl Applied {
    pub fn was_stored(self) -> bool {
        self == Applied::Stored
    }
}
