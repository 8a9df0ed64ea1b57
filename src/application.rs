//! Application identity and the entry point that runs a lifecycle.

use std::path::PathBuf;

use tracing::{debug, info_span};

use crate::error::PhasefigError;
use crate::file::platform_config_path;
use crate::lifecycle::{LifecycleBuilder, RunReport};
use crate::settings::AppSettings;

/// What a lifecycle run sees of the outside world.
///
/// Handlers read the argument vector and environment from here rather than
/// from the process, so a run is fully determined by its context.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub name: String,
    /// Program name first.
    pub args: Vec<String>,
    /// `KEY=VALUE` entries.
    pub env_vars: Vec<String>,
    /// Offered to `config_path` as a fallback before `READ_CONFIG`.
    pub default_config_path: Option<PathBuf>,
}

/// An application: a name, its inputs and an optional default config file.
///
/// ```ignore
/// fn main() -> ExitCode {
///     let lifecycle = Lifecycle::builder(create).default_handlers().run(body);
///     match Application::from_env("myapp").platform_config().run(lifecycle) {
///         Ok(report) => report.exit_code(),
///         Err(e) => {
///             eprintln!("{e}");
///             ExitCode::FAILURE
///         }
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Application {
    ctx: RunContext,
}

impl Application {
    /// An application with an empty argument vector and environment.
    pub fn new(name: &str) -> Self {
        Self {
            ctx: RunContext {
                name: name.to_string(),
                args: vec![name.to_string()],
                env_vars: Vec::new(),
                default_config_path: None,
            },
        }
    }

    /// An application reading the current process's arguments and environment.
    ///
    /// Both are captured once, here. Non-UTF-8 content is converted lossily.
    pub fn from_env(name: &str) -> Self {
        let args = std::env::args_os().map(|a| a.to_string_lossy().into_owned());
        let vars = std::env::vars_os().map(|(k, v)| {
            format!("{}={}", k.to_string_lossy(), v.to_string_lossy())
        });
        Self::new(name).args(args).env_vars(vars)
    }

    pub fn name(&self) -> &str {
        &self.ctx.name
    }

    /// Replace the argument vector. The first element is the program name.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ctx.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the environment snapshot with `KEY=VALUE` entries.
    pub fn env_vars<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ctx.env_vars = vars.into_iter().map(Into::into).collect();
        self
    }

    /// Config file read when no source sets `config_path`. A missing file at
    /// this path is not an error.
    pub fn default_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ctx.default_config_path = Some(path.into());
        self
    }

    /// Use `<platform config dir>/<name>.toml` as the default config path.
    ///
    /// Leaves the default unchanged when the platform has no config directory.
    pub fn platform_config(mut self) -> Self {
        let file_name = format!("{}.toml", self.ctx.name);
        if let Some(path) = platform_config_path(&self.ctx.name, &file_name) {
            self.ctx.default_config_path = Some(path);
        }
        self
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Build `lifecycle` and run it to completion.
    ///
    /// Returns an error only when the lifecycle cannot be built; in that case
    /// no phase runs. Phase failures are reported in the [`RunReport`].
    pub fn run<S>(self, lifecycle: LifecycleBuilder<S>) -> Result<RunReport, PhasefigError>
    where
        S: AppSettings + 'static,
    {
        let lifecycle = lifecycle.build()?;
        let span = info_span!("application", name = %self.ctx.name);
        let _guard = span.enter();
        debug!(args = self.ctx.args.len(), env_vars = self.ctx.env_vars.len(), "starting lifecycle");
        Ok(lifecycle.execute(&self.ctx))
    }
}
