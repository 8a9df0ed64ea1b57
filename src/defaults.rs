use crate::apply::{ApplyReport, apply_raw};
use crate::settings::OptionSettings;
use crate::types::Provenance;

/// Apply every declared default to the options no earlier phase has set.
pub fn set_defaults(settings: &mut OptionSettings) -> ApplyReport {
    let mut report = ApplyReport::default();
    for entry in settings.entries_mut() {
        let Some(raw) = entry.descriptor.default_raw() else {
            continue;
        };
        let outcome = apply_raw(&entry.descriptor, &mut entry.setting, raw, Provenance::Default);
        report.record(entry.descriptor.name(), outcome);
    }
    report
}
