//! Application settings: the record the lifecycle threads through its phases.
//!
//! Any type implementing [`AppSettings`] can ride through a
//! [`Lifecycle`](crate::Lifecycle); the only thing the framework needs from it
//! is the reserved `config_path` setting. [`OptionSettings`] is the
//! descriptor-table implementation the default adapters work against: one
//! [`OptionDescriptor`] per option, each paired with the [`Setting`] it writes.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::descriptor::OptionDescriptor;
use crate::error::PhasefigError;
use crate::setting::{Setting, SettingKind, Value};
use crate::types::Provenance;

/// Name of the reserved config path option.
pub const CONFIG_OPTION: &str = "config";
/// Name no option may use; the command line reserves `--help`.
pub const HELP_OPTION: &str = "help";

/// Settings the lifecycle can manage.
pub trait AppSettings {
    /// The reserved setting naming the config file to read.
    fn config_path(&self) -> &Setting;
    fn config_path_mut(&mut self) -> &mut Setting;
}

/// A descriptor and the setting it targets.
#[derive(Debug, Clone)]
pub(crate) struct OptionEntry {
    pub(crate) descriptor: OptionDescriptor,
    pub(crate) setting: Setting,
}

/// Settings declared through a table of [`OptionDescriptor`]s.
///
/// The first entry is always the reserved config path option (`--config`,
/// `-c`, `{PREFIX}CONFIG` by default); see [`OptionSettingsBuilder::config_option`].
#[derive(Debug, Clone)]
pub struct OptionSettings {
    entries: Vec<OptionEntry>,
    env_prefix: String,
    strict: bool,
}

impl OptionSettings {
    pub fn builder(env_prefix: &str) -> OptionSettingsBuilder {
        OptionSettingsBuilder::new(env_prefix)
    }

    pub fn env_prefix(&self) -> &str {
        &self.env_prefix
    }

    /// Whether unknown config file keys are rejected.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &OptionDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [OptionEntry] {
        &mut self.entries
    }

    pub fn setting(&self, name: &str) -> Option<&Setting> {
        self.entries
            .iter()
            .find(|e| e.descriptor.name() == name)
            .map(|e| &e.setting)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.setting(name).map(Setting::get)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_path(&self, name: &str) -> Option<&Path> {
        self.get(name).and_then(Value::as_path)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn get_u16(&self, name: &str) -> Option<u16> {
        self.get(name).and_then(Value::as_u16)
    }

    /// Every option with its current value and provenance, in declaration order.
    pub fn list(&self) -> Listing {
        let entries = self
            .entries
            .iter()
            .map(|e| SettingEntry {
                name: e.descriptor.name().to_string(),
                value: e.setting.get().clone(),
                provenance: e.setting.provenance(),
            })
            .collect();
        Listing { entries }
    }

    /// Destroy every setting. Safe to call more than once.
    pub fn destroy(&mut self) {
        for entry in &mut self.entries {
            entry.setting.destroy();
        }
    }
}

impl AppSettings for OptionSettings {
    fn config_path(&self) -> &Setting {
        &self.entries[0].setting
    }

    fn config_path_mut(&mut self) -> &mut Setting {
        &mut self.entries[0].setting
    }
}

/// One row of [`OptionSettings::list`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingEntry {
    pub name: String,
    pub value: Value,
    pub provenance: Provenance,
}

/// All settings with their provenance, for display or serialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub entries: Vec<SettingEntry>,
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            if entry.provenance.is_set() {
                write!(f, "{} = {} ({})", entry.name, entry.value, entry.provenance)?;
            } else {
                write!(f, "{} = <not set>", entry.name)?;
            }
        }
        Ok(())
    }
}

/// Builder for [`OptionSettings`].
pub struct OptionSettingsBuilder {
    env_prefix: String,
    config_option: OptionDescriptor,
    options: Vec<OptionDescriptor>,
    strict: bool,
}

impl OptionSettingsBuilder {
    fn new(env_prefix: &str) -> Self {
        Self {
            env_prefix: env_prefix.to_string(),
            config_option: OptionDescriptor::path(CONFIG_OPTION).short('c').env("CONFIG"),
            options: Vec::new(),
            strict: false,
        }
    }

    /// Replace the declaration of the reserved config path option.
    ///
    /// The descriptor is renamed to [`CONFIG_OPTION`] and must be path-typed; use
    /// this to change its short flag or environment suffix.
    pub fn config_option(mut self, descriptor: OptionDescriptor) -> Self {
        self.config_option = descriptor;
        self
    }

    pub fn option(mut self, descriptor: OptionDescriptor) -> Self {
        self.options.push(descriptor);
        self
    }

    /// Reject config file keys that no option declares (default: `false`).
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Create every setting, compiling patterns and checking names and short
    /// flags for clashes.
    pub fn build(self) -> Result<OptionSettings, PhasefigError> {
        let config = config_option(self.config_option)?;

        let mut names = HashSet::new();
        let mut shorts: HashMap<char, String> = HashMap::new();
        let mut entries = Vec::with_capacity(self.options.len() + 1);
        for descriptor in std::iter::once(config).chain(self.options) {
            let name = descriptor.name();
            check_name(name)?;
            if !names.insert(name.to_string()) {
                return Err(PhasefigError::DuplicateOption(name.to_string()));
            }
            if let Some(flag) = descriptor.short_flag() {
                if !flag.is_alphanumeric() {
                    return Err(PhasefigError::InvalidShortFlag {
                        option: name.to_string(),
                        flag,
                    });
                }
                if let Some(first) = shorts.insert(flag, name.to_string()) {
                    return Err(PhasefigError::DuplicateShortFlag {
                        flag,
                        first,
                        second: name.to_string(),
                    });
                }
            }
            let setting = descriptor.create_setting()?;
            entries.push(OptionEntry { descriptor, setting });
        }

        Ok(OptionSettings {
            entries,
            env_prefix: self.env_prefix,
            strict: self.strict,
        })
    }
}

/// Option names become `--{name}` on the command line; `--help` is taken.
fn check_name(name: &str) -> Result<(), PhasefigError> {
    let reason = if name.is_empty() {
        "must not be empty"
    } else if name.starts_with('-') {
        "must not start with '-'"
    } else if name.contains(|c: char| c == '=' || c.is_whitespace()) {
        "must not contain '=' or whitespace"
    } else if name == HELP_OPTION {
        "reserved for the help flag"
    } else {
        return Ok(());
    };
    Err(PhasefigError::InvalidOptionName {
        name: name.to_string(),
        reason,
    })
}

fn config_option(descriptor: OptionDescriptor) -> Result<OptionDescriptor, PhasefigError> {
    if *descriptor.kind() != SettingKind::Path {
        return Err(PhasefigError::ConfigOptionNotPath {
            found: descriptor.kind().name(),
        });
    }
    Ok(descriptor.renamed(CONFIG_OPTION))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::server_settings;

    #[test]
    fn config_option_is_first_and_reserved() {
        let settings = server_settings();
        let first = settings.descriptors().next().unwrap();
        assert_eq!(first.name(), CONFIG_OPTION);
        assert_eq!(first.short_flag(), Some('c'));
        assert_eq!(first.env_suffix(), Some("CONFIG"));
        assert!(!settings.config_path().is_set());
    }

    #[test]
    fn typed_getters_read_zero_values_when_unset() {
        let settings = server_settings();
        assert_eq!(settings.get_u16("port"), Some(0));
        assert_eq!(settings.get_str("host"), Some(""));
        assert_eq!(settings.get_bool("verbose"), Some(false));
        assert_eq!(settings.get_u16("missing"), None);
    }

    #[test]
    fn duplicate_option_is_rejected() {
        let err = OptionSettings::builder("APP_")
            .option(OptionDescriptor::string("host"))
            .option(OptionDescriptor::string("host"))
            .build()
            .unwrap_err();
        assert!(matches!(err, PhasefigError::DuplicateOption(name) if name == "host"));
    }

    #[test]
    fn invalid_pattern_fails_build() {
        let err = OptionSettings::builder("APP_")
            .option(OptionDescriptor::regex("user", "[unclosed"))
            .build()
            .unwrap_err();
        assert!(matches!(err, PhasefigError::InvalidPattern { .. }));
    }

    #[test]
    fn custom_config_option_is_renamed() {
        let settings = OptionSettings::builder("APP_")
            .config_option(OptionDescriptor::path("cfg").short('f').env("CFG_FILE"))
            .build()
            .unwrap();
        let first = settings.descriptors().next().unwrap();
        assert_eq!(first.name(), CONFIG_OPTION);
        assert_eq!(first.short_flag(), Some('f'));
        assert_eq!(first.env_suffix(), Some("CFG_FILE"));
    }

    #[test]
    fn custom_config_option_keeps_its_converter() {
        let settings = OptionSettings::builder("APP_")
            .config_option(
                OptionDescriptor::path("cfg")
                    .from_string(|raw| Ok(Value::Path(Path::new(raw).join("app.toml")))),
            )
            .build()
            .unwrap();
        let first = settings.descriptors().next().unwrap();
        assert_eq!(
            first.convert_string("/etc/app"),
            Ok(Value::Path("/etc/app/app.toml".into()))
        );
    }

    #[test]
    fn shared_short_flag_is_rejected() {
        let err = OptionSettings::builder("APP_")
            .option(OptionDescriptor::string("host").short('x'))
            .option(OptionDescriptor::string("exec").short('x'))
            .build()
            .unwrap_err();
        match err {
            PhasefigError::DuplicateShortFlag {
                flag,
                first,
                second,
            } => {
                assert_eq!(flag, 'x');
                assert_eq!(first, "host");
                assert_eq!(second, "exec");
            }
            other => panic!("Expected DuplicateShortFlag, got: {other:?}"),
        }
    }

    #[test]
    fn short_flag_clashing_with_config_option_is_rejected() {
        let err = OptionSettings::builder("APP_")
            .option(OptionDescriptor::uint16("count").short('c'))
            .build()
            .unwrap_err();
        assert!(matches!(err, PhasefigError::DuplicateShortFlag { flag: 'c', .. }));
    }

    #[test]
    fn help_name_is_reserved() {
        let err = OptionSettings::builder("APP_")
            .option(OptionDescriptor::flag("help"))
            .build()
            .unwrap_err();
        assert!(matches!(err, PhasefigError::InvalidOptionName { name, .. } if name == "help"));
    }

    #[test]
    fn malformed_names_and_flags_are_rejected() {
        for name in ["", "--port", "a b", "k=v"] {
            let result = OptionSettings::builder("APP_")
                .option(OptionDescriptor::string(name))
                .build();
            assert!(
                matches!(result, Err(PhasefigError::InvalidOptionName { .. })),
                "name {name:?}"
            );
        }
        let result = OptionSettings::builder("APP_")
            .option(OptionDescriptor::string("dash").short('-'))
            .build();
        assert!(matches!(result, Err(PhasefigError::InvalidShortFlag { flag: '-', .. })));
    }

    #[test]
    fn config_option_must_be_a_path() {
        let err = OptionSettings::builder("APP_")
            .config_option(OptionDescriptor::string("config"))
            .build()
            .unwrap_err();
        assert!(matches!(err, PhasefigError::ConfigOptionNotPath { found: "string" }));
    }

    #[test]
    fn listing_shows_provenance() {
        let mut settings = server_settings();
        let entry = &mut settings.entries_mut()[1];
        entry
            .setting
            .set(Value::String("0.0.0.0".into()), Provenance::Environment)
            .unwrap();

        let listing = settings.list();
        assert_eq!(listing.entries[1].name, "host");
        assert_eq!(listing.entries[1].provenance, Provenance::Environment);

        let text = listing.to_string();
        assert!(text.contains("host = \"0.0.0.0\" (environment)"));
        assert!(text.contains("port = <not set>"));
    }

    #[test]
    fn destroy_all_is_idempotent() {
        let mut settings = server_settings();
        settings.destroy();
        settings.destroy();
        assert!(settings.config_path().is_destroyed());
    }
}
