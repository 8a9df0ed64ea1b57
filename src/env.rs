use tracing::trace;

use crate::apply::{ApplyReport, apply_raw};
use crate::settings::OptionSettings;
use crate::types::Provenance;

/// Apply `{PREFIX}{SUFFIX}=value` entries to the options declaring `SUFFIX`.
///
/// `vars` is an ordered snapshot of `KEY=VALUE` strings. The value is
/// everything after the first `=`. Entries without `=`, outside the prefix,
/// or naming no declared suffix are skipped. When a variable appears twice the
/// first one wins, like any other source.
///
/// Takes an iterator so tests can pass synthetic data instead of the process
/// environment.
pub fn read_env_vars<I, S>(settings: &mut OptionSettings, vars: I) -> ApplyReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let prefix = settings.env_prefix().to_string();
    let mut report = ApplyReport::default();

    for var in vars {
        let var = var.as_ref();
        let Some((key, value)) = var.split_once('=') else {
            continue;
        };
        let Some(suffix) = key.strip_prefix(&prefix) else {
            continue;
        };

        let mut matched = false;
        for entry in settings.entries_mut() {
            if entry.descriptor.env_suffix() == Some(suffix) {
                matched = true;
                let outcome = apply_raw(
                    &entry.descriptor,
                    &mut entry.setting,
                    value,
                    Provenance::Environment,
                );
                report.record(entry.descriptor.name(), outcome);
            }
        }
        if !matched {
            trace!(key, "no option declares this environment variable");
        }
    }

    report
}
