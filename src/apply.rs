//! The setting applier: convert a raw value and write it into its setting.
//!
//! Every adapter funnels its `(descriptor, raw value)` pairs through
//! [`apply_raw`] or [`apply_config`]. Conversion and validation errors are
//! recorded in an [`ApplyReport`] instead of aborting, so a single bad key
//! does not hide problems with the keys after it.

use tracing::{debug, trace};

use crate::descriptor::OptionDescriptor;
use crate::error::PhasefigError;
use crate::setting::Setting;
use crate::types::{Applied, Provenance};

/// Convert `raw` with the descriptor's string converter and apply it.
pub fn apply_raw(
    descriptor: &OptionDescriptor,
    setting: &mut Setting,
    raw: &str,
    provenance: Provenance,
) -> Result<Applied, PhasefigError> {
    let value = descriptor
        .convert_string(raw)
        .map_err(|reason| conversion_error(descriptor, provenance, reason))?;
    descriptor.apply(setting, value, provenance)
}

/// Convert a config file leaf with the descriptor's config converter and apply it.
pub fn apply_config(
    descriptor: &OptionDescriptor,
    setting: &mut Setting,
    leaf: &toml::Value,
    provenance: Provenance,
) -> Result<Applied, PhasefigError> {
    let value = descriptor
        .convert_config(leaf)
        .map_err(|reason| conversion_error(descriptor, provenance, reason))?;
    descriptor.apply(setting, value, provenance)
}

fn conversion_error(descriptor: &OptionDescriptor, origin: Provenance, reason: String) -> PhasefigError {
    PhasefigError::Conversion {
        option: descriptor.name().to_string(),
        origin,
        reason,
    }
}

/// What one adapter pass did to the settings.
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Options whose value was stored by this pass.
    pub applied: Vec<String>,
    /// Options an earlier phase had already set.
    pub already_set: Vec<String>,
    /// Conversion and validation failures, in scan order.
    pub errors: Vec<PhasefigError>,
}

impl ApplyReport {
    /// Record the outcome of one apply call.
    pub fn record(&mut self, option: &str, outcome: Result<Applied, PhasefigError>) {
        match outcome {
            Ok(Applied::Stored) => {
                debug!(option, "setting applied");
                self.applied.push(option.to_string());
            }
            Ok(Applied::AlreadySet) => {
                trace!(option, "setting already set, ignored");
                self.already_set.push(option.to_string());
            }
            Err(e) => {
                debug!(option, error = %e, "setting rejected");
                self.errors.push(e);
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Fold accumulated errors into a single [`PhasefigError::InvalidValues`].
    pub fn into_result(self) -> Result<ApplyReport, PhasefigError> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(PhasefigError::InvalidValues(self.errors))
        }
    }
}
