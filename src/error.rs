use std::path::PathBuf;

use thiserror::Error;

use crate::fsm::Phase;
use crate::types::Provenance;

#[derive(Debug, Error)]
pub enum PhasefigError {
    #[error("Invalid value for '{option}' from {origin}: {reason}")]
    Conversion {
        option: String,
        origin: Provenance,
        reason: String,
    },

    #[error("Value '{value}' for '{option}' from {origin} does not match pattern '{pattern}'")]
    PatternMismatch {
        option: String,
        origin: Provenance,
        value: String,
        pattern: String,
    },

    #[error("Invalid values")]
    InvalidValues(Vec<PhasefigError>),

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("Cannot store a {found} value from {origin} in '{option}' ({expected})")]
    KindMismatch {
        option: String,
        origin: Provenance,
        expected: &'static str,
        found: &'static str,
    },

    #[error("The config path option must be a path, not a {found}")]
    ConfigOptionNotPath { found: &'static str },

    #[error("Option '{0}' is declared more than once")]
    DuplicateOption(String),

    #[error("Short flag '-{flag}' is declared by both '{first}' and '{second}'")]
    DuplicateShortFlag {
        flag: char,
        first: String,
        second: String,
    },

    #[error("Invalid option name '{name}': {reason}")]
    InvalidOptionName { name: String, reason: &'static str },

    #[error("Invalid short flag '{flag}' for '{option}'")]
    InvalidShortFlag { option: String, flag: char },

    #[error("Config file {path} does not exist")]
    MissingConfigFile { path: PathBuf },

    #[error("Unknown key '{key}' in {path} (line {line})")]
    UnknownKey {
        key: String,
        path: PathBuf,
        line: usize,
    },

    #[error("Unknown keys in config file")]
    UnknownKeys(Vec<PhasefigError>),

    #[error("Failed to parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{message}")]
    CommandLine { message: String, status: i32 },

    /// `--help` was given; the help text has already been printed.
    #[error("Help requested")]
    HelpDisplayed,

    #[error("A run handler is required — call .run() on the lifecycle builder")]
    RunHandlerRequired,

    #[error("{phase} exited with status {status}")]
    ExitStatus { phase: Phase, status: i32 },
}

impl PhasefigError {
    /// Process exit status reported when this error ends a run.
    pub fn exit_code(&self) -> i32 {
        match self {
            PhasefigError::ExitStatus { status, .. } => *status,
            PhasefigError::CommandLine { status, .. } => *status,
            PhasefigError::HelpDisplayed => 0,
            _ => 1,
        }
    }

    /// Whether this error ends the run early without counting as a failure.
    pub fn is_early_exit(&self) -> bool {
        matches!(self, PhasefigError::HelpDisplayed)
    }
}
