//! Write-once layered settings and a fixed application lifecycle.
//!
//! Phasefig runs an application through a fixed sequence of phases. Each
//! phase may have a handler; the source phases fill a settings record from
//! the command line, environment, config file and declared defaults, then the
//! run phase does the work and the remaining phases tear everything down.
//!
//! ```ignore
//! fn main() -> ExitCode {
//!     let lifecycle = Lifecycle::builder(|_| server_options().build())
//!         .default_handlers()
//!         .run(|settings| serve(settings));
//!
//!     match Application::from_env("myapp").platform_config().run(lifecycle) {
//!         Ok(report) => report.exit_code(),
//!         Err(e) => {
//!             eprintln!("{e}");
//!             ExitCode::FAILURE
//!         }
//!     }
//! }
//! ```
//!
//! [`RunReport::exit_code`] clamps statuses outside `0..=255` to 1, so a large
//! status never wraps around to success.
//!
//! # Phases
//!
//! ```text
//! CREATE_SETTINGS → PARSE_COMMAND_LINE → READ_ENV_VARS → READ_CONFIG
//!   → SET_DEFAULTS → RUN → CLEANUP → DESTROY_SETTINGS → EXIT
//! ```
//!
//! A phase fails when its handler returns `Err`. The machine then drains
//! forward instead of stopping: a failure anywhere from `PARSE_COMMAND_LINE`
//! to `RUN` skips to `CLEANUP`, and every path ends in exactly one
//! `DESTROY_SETTINGS`. A `CREATE_SETTINGS` failure skips straight to
//! `DESTROY_SETTINGS`, which has nothing to destroy. The [`fsm`] module holds
//! the transition table.
//!
//! The first failure decides the exit status reported by [`RunReport`]. The
//! run handler returns a status of its own; anything other than 0 counts as a
//! `RUN` failure with that status. `--help` prints the help text and ends the
//! run early: `RUN` is skipped, cleanup still runs and the status is 0.
//!
//! # First writer wins
//!
//! Every [`Setting`] accepts exactly one value. Once a phase has stored one,
//! later writes are ignored and report [`Applied::AlreadySet`]. Precedence
//! therefore falls out of phase order:
//!
//! ```text
//! command line  >  environment  >  config file  >  defaults
//! ```
//!
//! Each setting remembers which source stored its value ([`Provenance`]);
//! [`OptionSettings::list`] shows value and source for every option.
//!
//! # Options
//!
//! [`OptionSettings`] is built from a table of [`OptionDescriptor`]s. A
//! descriptor names the option and its kind, and optionally a short flag, an
//! environment suffix, a dotted config key and a default:
//!
//! ```ignore
//! OptionSettings::builder("MYAPP_")
//!     .option(OptionDescriptor::port("port").short('p').env("PORT")
//!         .config_key("server.port").default_value("8080"))
//!     .option(OptionDescriptor::regex("user", "^[a-z_][a-z0-9_]*$").env("USER"))
//!     .build()?;
//! ```
//!
//! Kinds are string, regex-validated string, path (with `~` expansion), flag,
//! `u16` and port. Every option can swap in its own converters or apply
//! function. Conversion failures are collected per phase and reported together
//! as [`PhasefigError::InvalidValues`]; the offending settings stay unset.
//!
//! # The config path
//!
//! Every settings type carries a reserved `config_path` setting
//! ([`AppSettings`]). It is an ordinary option (`--config`, `-c`,
//! `{PREFIX}CONFIG`), so the command line and environment can set it before
//! `READ_CONFIG` runs. When neither does, the application's default config
//! path is used as a fallback. A file the user named must exist; a missing
//! fallback file is skipped.
//!
//! # Sources
//!
//! The built-in handlers ([`LifecycleBuilder::default_handlers`]) are thin
//! wrappers over adapters usable on their own:
//!
//! - the `cli` module (behind the `clap` Cargo feature, on by default) builds
//!   a [clap](https://docs.rs/clap) command from the option table;
//! - `env` reads `{PREFIX}{SUFFIX}=value` entries from an environment snapshot;
//! - `file` reads a TOML file, optionally rejecting unknown keys with their
//!   line number (strict mode);
//! - `defaults` applies declared defaults.
//!
//! Handlers read arguments and environment from the [`RunContext`], never
//! from the process, so tests can drive a full lifecycle with synthetic input.
//!
//! # Error handling
//!
//! All fallible operations return [`PhasefigError`]. Every variant maps to a
//! process status through [`PhasefigError::exit_code`]. Phase entry, stored
//! values and failures are logged through [`tracing`](https://docs.rs/tracing).

pub mod error;
pub mod fsm;
pub mod types;

mod application;
mod apply;
#[cfg(feature = "clap")]
mod cli;
mod defaults;
mod descriptor;
mod env;
mod file;
mod lifecycle;
mod setting;
mod settings;

#[cfg(test)]
mod fixtures;

pub use application::{Application, RunContext};
pub use apply::{ApplyReport, apply_config, apply_raw};
#[cfg(feature = "clap")]
pub use cli::{command_for, parse_command_line};
pub use defaults::set_defaults;
pub use descriptor::{
    ApplyFn, ConfigConverter, OptionDescriptor, StringConverter, flag_from_config,
    flag_from_string, path_from_config, path_from_string, port_from_config, port_from_string,
    string_from_config, string_from_string, uint16_from_config, uint16_from_string,
};
pub use env::read_env_vars;
pub use error::PhasefigError;
pub use file::{load_config_file, platform_config_path, read_config};
pub use fsm::{Phase, State};
pub use lifecycle::{Lifecycle, LifecycleBuilder, RunReport};
pub use setting::{Setting, SettingKind, Value};
pub use settings::{
    AppSettings, CONFIG_OPTION, Listing, OptionSettings, OptionSettingsBuilder, SettingEntry,
};
pub use types::{Applied, Provenance};
