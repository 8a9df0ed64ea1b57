//! Typed, write-once setting cells.
//!
//! A [`Setting`] holds one value of a declared [`SettingKind`] together with
//! the [`Provenance`] of the phase that wrote it. The first successful write
//! wins: once a setting is set, later writes report [`Applied::AlreadySet`]
//! and leave the cell untouched. Validation failures (a kind mismatch or a
//! value rejected by a pattern) are errors and leave the cell unset.
//!
//! Reading an unset setting is not an error; it yields the kind's zero value
//! (empty string, empty path, `false`, `0`).

use std::fmt;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Serialize;

use crate::error::PhasefigError;
use crate::types::{Applied, Provenance};

/// A typed setting value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Path(PathBuf),
    Bool(bool),
    UInt16(u16),
    Port(u16),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Path(_) => "path",
            Value::Bool(_) => "bool",
            Value::UInt16(_) => "uint16",
            Value::Port(_) => "port",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Value::Path(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view shared by `uint16` and `port` values.
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Value::UInt16(n) | Value::Port(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s:?}"),
            Value::Path(p) => write!(f, "{:?}", p.display().to_string()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::UInt16(n) | Value::Port(n) => write!(f, "{n}"),
        }
    }
}

/// The declared kind of a setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingKind {
    String,
    /// A string that must match the given regular expression.
    Regex(String),
    Path,
    Bool,
    UInt16,
    Port,
}

impl SettingKind {
    pub fn name(&self) -> &'static str {
        match self {
            SettingKind::String => "string",
            SettingKind::Regex(_) => "validated string",
            SettingKind::Path => "path",
            SettingKind::Bool => "bool",
            SettingKind::UInt16 => "uint16",
            SettingKind::Port => "port",
        }
    }

    /// The value an unset setting of this kind reads as.
    pub fn zero(&self) -> Value {
        match self {
            SettingKind::String | SettingKind::Regex(_) => Value::String(String::new()),
            SettingKind::Path => Value::Path(PathBuf::new()),
            SettingKind::Bool => Value::Bool(false),
            SettingKind::UInt16 => Value::UInt16(0),
            SettingKind::Port => Value::Port(0),
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (SettingKind::String | SettingKind::Regex(_), Value::String(_))
                | (SettingKind::Path, Value::Path(_))
                | (SettingKind::Bool, Value::Bool(_))
                | (SettingKind::UInt16, Value::UInt16(_))
                | (SettingKind::Port, Value::Port(_))
        )
    }
}

/// A write-once value cell.
#[derive(Debug, Clone)]
pub struct Setting {
    name: String,
    kind: SettingKind,
    pattern: Option<Regex>,
    value: Value,
    provenance: Provenance,
    destroyed: bool,
}

impl Setting {
    /// Create an unset setting of `kind`.
    ///
    /// Fails with [`PhasefigError::InvalidPattern`] when a `Regex` kind carries a
    /// pattern that does not compile.
    pub fn new(kind: SettingKind) -> Result<Self, PhasefigError> {
        let pattern = match &kind {
            SettingKind::Regex(p) => {
                Some(Regex::new(p).map_err(|e| PhasefigError::InvalidPattern {
                    pattern: p.clone(),
                    source: e,
                })?)
            }
            _ => None,
        };
        Ok(Self {
            name: String::new(),
            value: kind.zero(),
            kind,
            pattern,
            provenance: Provenance::Unset,
            destroyed: false,
        })
    }

    fn of(kind: SettingKind) -> Self {
        Self {
            name: String::new(),
            value: kind.zero(),
            kind,
            pattern: None,
            provenance: Provenance::Unset,
            destroyed: false,
        }
    }

    pub fn string() -> Self {
        Self::of(SettingKind::String)
    }

    pub fn path() -> Self {
        Self::of(SettingKind::Path)
    }

    pub fn flag() -> Self {
        Self::of(SettingKind::Bool)
    }

    pub fn uint16() -> Self {
        Self::of(SettingKind::UInt16)
    }

    pub fn port() -> Self {
        Self::of(SettingKind::Port)
    }

    pub fn regex(pattern: &str) -> Result<Self, PhasefigError> {
        Self::new(SettingKind::Regex(pattern.to_string()))
    }

    /// Attach the option name used in validation errors.
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &SettingKind {
        &self.kind
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn is_set(&self) -> bool {
        self.provenance.is_set()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// The current value, or the kind's zero value when nothing was stored.
    pub fn get(&self) -> &Value {
        &self.value
    }

    /// Store `value` if no earlier phase has set this setting.
    ///
    /// Writing with [`Provenance::Unset`] behaves like [`set_fallback`](Self::set_fallback).
    pub fn set(&mut self, value: Value, provenance: Provenance) -> Result<Applied, PhasefigError> {
        self.set_with(value, provenance)
    }

    /// Store a lowest-precedence value that stays visible through [`get`](Self::get)
    /// without marking the setting as set. Any later [`set`](Self::set) replaces it.
    pub fn set_fallback(&mut self, value: Value) -> Result<Applied, PhasefigError> {
        self.set_with(value, Provenance::Unset)
    }

    fn set_with(&mut self, value: Value, provenance: Provenance) -> Result<Applied, PhasefigError> {
        if self.provenance.is_set() || self.destroyed {
            return Ok(Applied::AlreadySet);
        }
        self.value = self.validate(value, provenance)?;
        self.provenance = provenance;
        Ok(Applied::Stored)
    }

    fn validate(&self, value: Value, origin: Provenance) -> Result<Value, PhasefigError> {
        if !self.kind.accepts(&value) {
            return Err(PhasefigError::KindMismatch {
                option: self.name.clone(),
                origin,
                expected: self.kind.name(),
                found: value.kind_name(),
            });
        }
        match value {
            Value::String(s) => {
                if let Some(re) = &self.pattern
                    && !re.is_match(&s)
                {
                    return Err(PhasefigError::PatternMismatch {
                        option: self.name.clone(),
                        origin,
                        value: s,
                        pattern: re.as_str().to_string(),
                    });
                }
                Ok(Value::String(s))
            }
            Value::Path(p) => Ok(Value::Path(expand_home(&p))),
            other => Ok(other),
        }
    }

    /// Release the stored value. Returns `false` when the setting was already
    /// destroyed; a destroyed setting reads as zero and ignores writes.
    pub fn destroy(&mut self) -> bool {
        if self.destroyed {
            return false;
        }
        self.value = self.kind.zero();
        self.provenance = Provenance::Unset;
        self.destroyed = true;
        true
    }
}

/// Expand a leading `~` component to the user's home directory.
fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match directories::UserDirs::new() {
        Some(user) => user.home_dir().join(rest),
        None => path.to_path_buf(),
    }
}
