//! The config file adapter.
//!
//! The file to read is whatever the reserved `config_path` setting holds when
//! the read-config phase starts: a path from the command line or environment,
//! or the process-supplied fallback. The two cases differ only in how a
//! missing file is treated:
//!
//! - `config_path` **set** (the user asked for this file): a missing file is
//!   [`PhasefigError::MissingConfigFile`].
//! - `config_path` holding only the **fallback**: a missing file is skipped.
//!
//! Other I/O errors (permissions, etc.) and TOML syntax errors always fail.
//! The file is read into memory and closed before any value is applied.
//!
//! Each option with a `config_key` looks up its dotted path in the parsed
//! table (`"server.port"` reads `port` from the `[server]` section). In strict
//! mode, leaf keys that no option declares are reported with their line
//! number.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use toml::{Table, Value};
use tracing::debug;

use crate::apply::{ApplyReport, apply_config};
use crate::error::PhasefigError;
use crate::settings::{AppSettings, OptionSettings};
use crate::types::Provenance;

/// Read the config file named by `config_path` and apply the values it declares.
pub fn read_config(settings: &mut OptionSettings) -> Result<ApplyReport, PhasefigError> {
    let config_path = settings.config_path();
    let path = match config_path.get().as_path() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => {
            debug!("no config path, skipping config file");
            return Ok(ApplyReport::default());
        }
    };
    let required = config_path.is_set();

    let Some(content) = load_config_file(&path, required)? else {
        return Ok(ApplyReport::default());
    };

    let table: Table = toml::from_str(&content).map_err(|e| PhasefigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let leaves = leaves(&table);

    if settings.is_strict() {
        reject_unknown_keys(settings, &leaves, &content, &path)?;
    }

    debug!(path = %path.display(), keys = leaves.len(), "applying config file");
    Ok(apply_leaves(settings, &leaves))
}

/// Read `path` into memory.
///
/// A missing file yields `Ok(None)` unless `required`, in which case it is
/// [`PhasefigError::MissingConfigFile`].
pub fn load_config_file(path: &Path, required: bool) -> Result<Option<String>, PhasefigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if required {
                Err(PhasefigError::MissingConfigFile {
                    path: path.to_path_buf(),
                })
            } else {
                debug!(path = %path.display(), "fallback config file not found, skipping");
                Ok(None)
            }
        }
        Err(e) => Err(PhasefigError::IoError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Every non-table value of a parsed file, keyed by dotted path
/// (`[server]` / `port = 1` yields `"server.port"`).
pub fn leaves(table: &Table) -> BTreeMap<String, &Value> {
    let mut out = BTreeMap::new();
    let mut pending = vec![(String::new(), table)];
    while let Some((prefix, tbl)) = pending.pop() {
        for (key, value) in tbl {
            let dotted = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            match value {
                Value::Table(sub) => pending.push((dotted, sub)),
                leaf => {
                    out.insert(dotted, leaf);
                }
            }
        }
    }
    out
}

/// Apply every option whose `config_key` names one of `leaves`.
pub fn apply_leaves(settings: &mut OptionSettings, leaves: &BTreeMap<String, &Value>) -> ApplyReport {
    let mut report = ApplyReport::default();
    for entry in settings.entries_mut() {
        let Some(leaf) = entry.descriptor.config_key_path().and_then(|k| leaves.get(k)) else {
            continue;
        };
        let outcome = apply_config(&entry.descriptor, &mut entry.setting, leaf, Provenance::Config);
        report.record(entry.descriptor.name(), outcome);
    }
    report
}

/// Platform config file location, e.g. `~/.config/{app_name}/{file_name}` on Linux.
///
/// Suitable as the fallback config path handed to
/// [`Application::default_config_path`](crate::Application::default_config_path).
pub fn platform_config_path(app_name: &str, file_name: &str) -> Option<PathBuf> {
    let proj = directories::ProjectDirs::from("", "", app_name)?;
    Some(proj.config_dir().join(file_name))
}

/// Fail with [`PhasefigError::UnknownKeys`] when a leaf matches no option's `config_key`.
fn reject_unknown_keys(
    settings: &OptionSettings,
    leaves: &BTreeMap<String, &Value>,
    content: &str,
    path: &Path,
) -> Result<(), PhasefigError> {
    let known: HashSet<&str> = settings
        .descriptors()
        .filter_map(|d| d.config_key_path())
        .collect();
    let unknown: Vec<&String> = leaves
        .keys()
        .filter(|key| !known.contains(key.as_str()))
        .collect();
    if unknown.is_empty() {
        return Ok(());
    }

    let lines = key_lines(content);
    let errors = unknown
        .into_iter()
        .map(|key| PhasefigError::UnknownKey {
            key: key.clone(),
            path: path.to_path_buf(),
            line: lines.get(key.as_str()).copied().unwrap_or(0),
        })
        .collect();
    Err(PhasefigError::UnknownKeys(errors))
}

/// Map each `key = value` line to its dotted path and 1-based line number.
///
/// Follows `[section]` headers and dotted keys; quoted segments are unquoted.
/// Keys inside inline tables and arrays of tables are not indexed.
fn key_lines(content: &str) -> HashMap<String, usize> {
    let mut lines = HashMap::new();
    let mut section: Vec<String> = Vec::new();

    for (n, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(header) = line.strip_prefix('[') {
            section = if header.starts_with('[') {
                Vec::new()
            } else {
                dotted_segments(header.split(']').next().unwrap_or_default())
            };
            continue;
        }
        let Some((key, _)) = line.split_once('=') else {
            continue;
        };
        let mut segments = section.clone();
        segments.extend(dotted_segments(key));
        lines.entry(segments.join(".")).or_insert(n + 1);
    }
    lines
}

fn dotted_segments(key: &str) -> Vec<String> {
    key.split('.')
        .map(|segment| segment.trim().trim_matches(|c: char| c == '"' || c == '\'').to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{server_builder, server_settings};
    use crate::setting::Value as SettingValue;
    use std::fs;
    use tempfile::TempDir;

    fn settings_with_config(path: &Path, explicit: bool) -> OptionSettings {
        let mut settings = server_settings();
        let value = SettingValue::Path(path.to_path_buf());
        if explicit {
            settings
                .config_path_mut()
                .set(value, Provenance::CommandLine)
                .unwrap();
        } else {
            settings.config_path_mut().set_fallback(value).unwrap();
        }
        settings
    }

    const SAMPLE: &str = r#"
verbose = 1
user = "deploy"
workers = 16

[server]
host = "0.0.0.0"
port = 9000

[log]
dir = "/var/log/app"
"#;

    #[test]
    fn values_are_applied_with_config_provenance() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.toml");
        fs::write(&path, SAMPLE).unwrap();

        let mut settings = settings_with_config(&path, true);
        let report = read_config(&mut settings).unwrap();

        assert!(report.is_clean());
        assert_eq!(settings.get_str("host"), Some("0.0.0.0"));
        assert_eq!(settings.get_u16("port"), Some(9000));
        assert_eq!(settings.get_bool("verbose"), Some(true));
        assert_eq!(settings.get_str("user"), Some("deploy"));
        assert_eq!(settings.get_u16("workers"), Some(16));
        assert_eq!(settings.get_path("log-dir"), Some(Path::new("/var/log/app")));
        assert_eq!(
            settings.setting("port").unwrap().provenance(),
            Provenance::Config
        );
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.toml");
        let mut settings = settings_with_config(&path, true);

        let err = read_config(&mut settings).unwrap_err();
        assert!(matches!(err, PhasefigError::MissingConfigFile { path: p } if p == path));
    }

    #[test]
    fn missing_fallback_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.toml");
        let mut settings = settings_with_config(&path, false);

        let report = read_config(&mut settings).unwrap();
        assert!(report.applied.is_empty());
    }

    #[test]
    fn no_config_path_is_skipped() {
        let mut settings = server_settings();
        let report = read_config(&mut settings).unwrap();
        assert!(report.applied.is_empty());
    }

    #[test]
    fn parse_error_names_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "port = = 3\n").unwrap();
        let mut settings = settings_with_config(&path, false);

        let err = read_config(&mut settings).unwrap_err();
        assert!(matches!(err, PhasefigError::ParseError { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_file_returns_io_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.toml");
        fs::write(&path, "workers = 1\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();

        // root can read anything; nothing to check in that case
        if fs::read_to_string(&path).is_ok() {
            return;
        }

        let result = load_config_file(&path, false);
        assert!(matches!(result, Err(PhasefigError::IoError { .. })));

        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
    }

    #[test]
    fn config_does_not_overwrite_environment() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.toml");
        fs::write(&path, "[server]\nport = 9000\n").unwrap();

        let mut settings = settings_with_config(&path, false);
        crate::env::read_env_vars(&mut settings, ["APP_PORT=7000"]);
        let report = read_config(&mut settings).unwrap();

        assert_eq!(report.already_set, vec!["port"]);
        assert_eq!(settings.get_u16("port"), Some(7000));
    }

    #[test]
    fn bad_values_are_reported_and_others_applied() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.toml");
        fs::write(&path, "workers = 70000\nuser = \"Root User\"\n[server]\nhost = \"h\"\n").unwrap();

        let mut settings = settings_with_config(&path, true);
        let report = read_config(&mut settings).unwrap();

        assert_eq!(report.applied, vec!["host"]);
        assert_eq!(report.errors.len(), 2);
        assert!(!settings.setting("workers").unwrap().is_set());
    }

    #[test]
    fn strict_mode_reports_unknown_keys_with_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.toml");
        fs::write(&path, "workers = 2\ntypo = 1\n\n[server]\nprot = 80\n").unwrap();

        let mut settings = server_builder().strict(true).build().unwrap();
        settings
            .config_path_mut()
            .set(SettingValue::Path(path.clone()), Provenance::CommandLine)
            .unwrap();

        let err = read_config(&mut settings).unwrap_err();
        match err {
            PhasefigError::UnknownKeys(keys) => {
                let found: Vec<(String, usize)> = keys
                    .into_iter()
                    .map(|k| match k {
                        PhasefigError::UnknownKey { key, line, .. } => (key, line),
                        other => panic!("Expected UnknownKey, got: {other:?}"),
                    })
                    .collect();
                assert!(found.contains(&("typo".to_string(), 2)));
                assert!(found.contains(&("server.prot".to_string(), 5)));
            }
            other => panic!("Expected UnknownKeys, got: {other:?}"),
        }
        assert!(!settings.setting("workers").unwrap().is_set());
    }

    #[test]
    fn lenient_mode_ignores_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.toml");
        fs::write(&path, "workers = 2\ntypo = 1\n").unwrap();

        let mut settings = settings_with_config(&path, true);
        let report = read_config(&mut settings).unwrap();
        assert_eq!(report.applied, vec!["workers"]);
    }

    #[test]
    fn leaves_are_keyed_by_dotted_path() {
        let table: Table = "top = true\n[a]\n[a.b]\nc = 1\nlist = [1, 2]\n".parse().unwrap();
        let leaves = leaves(&table);
        let keys: Vec<&str> = leaves.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a.b.c", "a.b.list", "top"]);
        assert_eq!(leaves["a.b.c"].as_integer(), Some(1));
    }

    #[test]
    fn key_lines_follow_sections_and_dotted_keys() {
        let content = "# comment = 1\nname = \"x\"\n\n[server]\nport = 1\nlimits.max = 2\n[ \"log\" ]\ndir = \"/tmp\"\n";
        let lines = key_lines(content);
        assert_eq!(lines.get("name"), Some(&2));
        assert_eq!(lines.get("server.port"), Some(&5));
        assert_eq!(lines.get("server.limits.max"), Some(&6));
        assert_eq!(lines.get("log.dir"), Some(&8));
        assert!(!lines.keys().any(|k| k.contains("comment")));
    }

    #[test]
    fn platform_config_path_ends_with_file_name() {
        if let Some(path) = platform_config_path("phasefig-test", "app.toml") {
            assert!(path.ends_with("app.toml"));
        }
    }
}
