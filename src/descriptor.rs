//! Option descriptors: one declaration per configurable option.
//!
//! A descriptor names the option and says where each source finds it:
//!
//! | Source        | Key                                   |
//! |---------------|---------------------------------------|
//! | Command line  | `--{name}` and optional `-{short}`    |
//! | Environment   | `{PREFIX}{env_suffix}`                |
//! | Config file   | dotted `config_key`                   |
//! | Defaults      | raw `default_value`                   |
//!
//! It also carries the conversion functions that turn raw input into a typed
//! [`Value`]. The kind constructors ([`string`](OptionDescriptor::string),
//! [`port`](OptionDescriptor::port), ...) install the standard converters;
//! [`from_string`](OptionDescriptor::from_string) and
//! [`from_config`](OptionDescriptor::from_config) replace them.

use std::path::PathBuf;

use crate::error::PhasefigError;
use crate::setting::{Setting, SettingKind, Value};
use crate::types::{Applied, Provenance};

/// Converts a raw string (command line, environment, default) to a value.
pub type StringConverter = fn(&str) -> Result<Value, String>;
/// Converts a config file leaf to a value.
pub type ConfigConverter = fn(&toml::Value) -> Result<Value, String>;
/// Writes a converted value into a setting.
pub type ApplyFn = fn(&mut Setting, Value, Provenance) -> Result<Applied, PhasefigError>;

/// Static declaration of one configurable option.
#[derive(Debug, Clone)]
pub struct OptionDescriptor {
    name: String,
    kind: SettingKind,
    takes_value: bool,
    short: Option<char>,
    env_suffix: Option<String>,
    config_key: Option<String>,
    default_value: Option<String>,
    from_string: StringConverter,
    from_config: ConfigConverter,
    apply: ApplyFn,
}

impl OptionDescriptor {
    fn new(name: &str, kind: SettingKind, from_string: StringConverter, from_config: ConfigConverter) -> Self {
        Self {
            name: name.to_string(),
            takes_value: kind != SettingKind::Bool,
            kind,
            short: None,
            env_suffix: None,
            config_key: None,
            default_value: None,
            from_string,
            from_config,
            apply: Setting::set,
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, SettingKind::String, string_from_string, string_from_config)
    }

    /// A string option whose values must match `pattern`.
    ///
    /// The pattern is compiled when the owning settings are built.
    pub fn regex(name: &str, pattern: &str) -> Self {
        Self::new(
            name,
            SettingKind::Regex(pattern.to_string()),
            string_from_string,
            string_from_config,
        )
    }

    pub fn path(name: &str) -> Self {
        Self::new(name, SettingKind::Path, path_from_string, path_from_config)
    }

    /// A boolean option. On the command line it is a bare flag.
    pub fn flag(name: &str) -> Self {
        Self::new(name, SettingKind::Bool, flag_from_string, flag_from_config)
    }

    pub fn uint16(name: &str) -> Self {
        Self::new(name, SettingKind::UInt16, uint16_from_string, uint16_from_config)
    }

    pub fn port(name: &str) -> Self {
        Self::new(name, SettingKind::Port, port_from_string, port_from_config)
    }

    pub fn short(mut self, c: char) -> Self {
        self.short = Some(c);
        self
    }

    /// Environment variable name, without the settings' prefix.
    pub fn env(mut self, suffix: &str) -> Self {
        self.env_suffix = Some(suffix.to_string());
        self
    }

    /// Dotted key path in the config file (e.g. `"server.port"`).
    pub fn config_key(mut self, key: &str) -> Self {
        self.config_key = Some(key.to_string());
        self
    }

    /// Raw default, converted with the string converter in the set-defaults phase.
    pub fn default_value(mut self, raw: &str) -> Self {
        self.default_value = Some(raw.to_string());
        self
    }

    /// Whether the command-line form takes an argument. Flags default to `false`,
    /// every other kind to `true`.
    pub fn takes_value(mut self, takes_value: bool) -> Self {
        self.takes_value = takes_value;
        self
    }

    pub fn from_string(mut self, f: StringConverter) -> Self {
        self.from_string = f;
        self
    }

    pub fn from_config(mut self, f: ConfigConverter) -> Self {
        self.from_config = f;
        self
    }

    pub fn apply_with(mut self, f: ApplyFn) -> Self {
        self.apply = f;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &SettingKind {
        &self.kind
    }

    pub fn is_value_option(&self) -> bool {
        self.takes_value
    }

    pub fn short_flag(&self) -> Option<char> {
        self.short
    }

    pub fn env_suffix(&self) -> Option<&str> {
        self.env_suffix.as_deref()
    }

    pub fn config_key_path(&self) -> Option<&str> {
        self.config_key.as_deref()
    }

    pub fn default_raw(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub fn convert_string(&self, raw: &str) -> Result<Value, String> {
        (self.from_string)(raw)
    }

    pub fn convert_config(&self, leaf: &toml::Value) -> Result<Value, String> {
        (self.from_config)(leaf)
    }

    pub fn apply(&self, setting: &mut Setting, value: Value, provenance: Provenance) -> Result<Applied, PhasefigError> {
        (self.apply)(setting, value, provenance)
    }

    /// The same declaration under another name.
    pub(crate) fn renamed(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Build the unset setting cell this descriptor writes into.
    pub fn create_setting(&self) -> Result<Setting, PhasefigError> {
        Ok(Setting::new(self.kind.clone())?.named(&self.name))
    }
}

// -- Standard converters ------------------------------------------------------

pub fn string_from_string(raw: &str) -> Result<Value, String> {
    Ok(Value::String(raw.to_string()))
}

pub fn path_from_string(raw: &str) -> Result<Value, String> {
    if raw.is_empty() {
        return Err("path must not be empty".into());
    }
    Ok(Value::Path(PathBuf::from(raw)))
}

/// Flags accept the usual spellings; an empty string means "present".
pub fn flag_from_string(raw: &str) -> Result<Value, String> {
    let b = match raw.trim().to_ascii_lowercase().as_str() {
        "" | "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        other => return Err(format!("'{other}' is not a boolean")),
    };
    Ok(Value::Bool(b))
}

fn parse_u16(raw: &str) -> Result<u16, String> {
    let trimmed = raw.trim();
    let n: i64 = trimmed
        .parse()
        .map_err(|_| format!("'{trimmed}' is not a number"))?;
    u16::try_from(n).map_err(|_| format!("{n} is out of range (0..=65535)"))
}

pub fn uint16_from_string(raw: &str) -> Result<Value, String> {
    parse_u16(raw).map(Value::UInt16)
}

pub fn port_from_string(raw: &str) -> Result<Value, String> {
    parse_u16(raw).map(Value::Port)
}

pub fn string_from_config(leaf: &toml::Value) -> Result<Value, String> {
    match leaf {
        toml::Value::String(s) => Ok(Value::String(s.clone())),
        other => Err(format!("expected a string, found {}", other.type_str())),
    }
}

pub fn path_from_config(leaf: &toml::Value) -> Result<Value, String> {
    match leaf {
        toml::Value::String(s) => path_from_string(s),
        other => Err(format!("expected a path string, found {}", other.type_str())),
    }
}

/// Config booleans may also be written as integers (`0` is false).
pub fn flag_from_config(leaf: &toml::Value) -> Result<Value, String> {
    match leaf {
        toml::Value::Boolean(b) => Ok(Value::Bool(*b)),
        toml::Value::Integer(i) => Ok(Value::Bool(*i != 0)),
        other => Err(format!("expected a boolean, found {}", other.type_str())),
    }
}

fn u16_from_config(leaf: &toml::Value) -> Result<u16, String> {
    match leaf {
        toml::Value::Integer(i) => {
            u16::try_from(*i).map_err(|_| format!("{i} is out of range (0..=65535)"))
        }
        other => Err(format!("expected an integer, found {}", other.type_str())),
    }
}

pub fn uint16_from_config(leaf: &toml::Value) -> Result<Value, String> {
    u16_from_config(leaf).map(Value::UInt16)
}

pub fn port_from_config(leaf: &toml::Value) -> Result<Value, String> {
    u16_from_config(leaf).map(Value::Port)
}
