//! Clap adapter: the command-line source.
//!
//! This module is compiled only when the `clap` Cargo feature is enabled (on
//! by default). It builds a [`clap::Command`] at runtime from the option
//! table, so the command line always matches the declared options:
//!
//! - every option gets `--{name}`, plus `-{short}` when declared;
//! - value options take one argument, flags take none.
//!
//! Parsing errors (unknown flags, missing arguments, stray positionals) come
//! back as [`PhasefigError::CommandLine`] carrying clap's rendered message and
//! exit status. `--help` prints the help text to stdout and returns
//! [`PhasefigError::HelpDisplayed`], which ends the run early without failing
//! it. When an option is repeated, the first occurrence wins, the same rule
//! every other source follows.
//!
//! `--help` is always present; `-h` is added only when no option claims it.

use clap::error::ErrorKind;
use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::warn;

use crate::apply::{ApplyReport, apply_raw};
use crate::error::PhasefigError;
use crate::settings::{HELP_OPTION, OptionSettings};
use crate::types::Provenance;

/// Build the clap command for the declared options.
pub fn command_for(settings: &OptionSettings, bin_name: &str) -> Command {
    let mut help = Arg::new(HELP_OPTION)
        .long(HELP_OPTION)
        .action(ArgAction::Help)
        .help("Print help");
    if settings.descriptors().all(|d| d.short_flag() != Some('h')) {
        help = help.short('h');
    }

    let mut cmd = Command::new(bin_name.to_string())
        .disable_version_flag(true)
        .disable_help_flag(true)
        .arg(help);
    for descriptor in settings.descriptors() {
        let mut arg = Arg::new(descriptor.name().to_string()).long(descriptor.name().to_string());
        if let Some(c) = descriptor.short_flag() {
            arg = arg.short(c);
        }
        arg = if descriptor.is_value_option() {
            arg.action(ArgAction::Append).num_args(1).value_name("VALUE")
        } else {
            arg.action(ArgAction::Count)
        };
        cmd = cmd.arg(arg);
    }
    cmd
}

/// Parse `args` (program name first) and apply every option present.
///
/// Fails only when clap rejects the command line; conversion errors are
/// collected in the returned report.
pub fn parse_command_line<S: AsRef<str>>(
    settings: &mut OptionSettings,
    args: &[S],
) -> Result<ApplyReport, PhasefigError> {
    let bin_name = args.first().map(|a| a.as_ref()).unwrap_or_default();
    let matches = command_for(settings, bin_name)
        .try_get_matches_from(args.iter().map(|a| a.as_ref()))
        .map_err(command_line_error)?;

    let mut report = ApplyReport::default();
    for entry in settings.entries_mut() {
        let Some(raw) = raw_value(&matches, entry.descriptor.name(), entry.descriptor.is_value_option())
        else {
            continue;
        };
        let outcome = apply_raw(
            &entry.descriptor,
            &mut entry.setting,
            &raw,
            Provenance::CommandLine,
        );
        report.record(entry.descriptor.name(), outcome);
    }
    Ok(report)
}

fn command_line_error(e: clap::Error) -> PhasefigError {
    if e.kind() == ErrorKind::DisplayHelp {
        if let Err(io) = e.print() {
            warn!(error = %io, "failed to print help");
        }
        return PhasefigError::HelpDisplayed;
    }
    PhasefigError::CommandLine {
        message: e.render().to_string(),
        status: e.exit_code(),
    }
}

fn raw_value(matches: &ArgMatches, id: &str, takes_value: bool) -> Option<String> {
    if takes_value {
        matches
            .get_many::<String>(id)
            .and_then(|mut values| values.next())
            .cloned()
    } else if matches.get_count(id) > 0 {
        Some("true".to_string())
    } else {
        None
    }
}
