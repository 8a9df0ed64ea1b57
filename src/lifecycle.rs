//! Phase handlers and the loop that drives them through the state machine.
//!
//! A [`Lifecycle`] holds at most one handler per [`Phase`]. Handlers are
//! registered on a [`LifecycleBuilder`]; phases without a handler pass
//! immediately, except `RUN`, which must be registered before
//! [`build`](LifecycleBuilder::build) succeeds.
//!
//! Handlers report pass/fail through `Result`. The driver never inspects the
//! error beyond recording it: a failed phase moves the machine to its error
//! state and on through cleanup to `DESTROY_SETTINGS` (see [`fsm`](crate::fsm)).
//! The first failure decides the run's exit status; later failures while
//! draining are logged and kept in the [`RunReport`].
//!
//! An early exit ([`PhasefigError::is_early_exit`], e.g. after `--help`)
//! drains the same way but is not a failure: the run reports status 0.

use std::process::ExitCode;

use tracing::{debug, warn};

use crate::application::RunContext;
use crate::apply::ApplyReport;
use crate::error::PhasefigError;
use crate::fsm::{Outcome, Phase, State};
use crate::setting::Value;
use crate::settings::{AppSettings, OptionSettings};

pub type CreateFn<S> = Box<dyn FnOnce(&RunContext) -> Result<S, PhasefigError>>;
/// Handler receiving a slice of strings: the argument vector or the environment snapshot.
pub type SourceFn<S> = Box<dyn FnOnce(&mut S, &[String]) -> Result<(), PhasefigError>>;
pub type PhaseFn<S> = Box<dyn FnOnce(&mut S) -> Result<(), PhasefigError>>;
/// The run handler returns a process status; anything but 0 fails the phase.
pub type RunFn<S> = Box<dyn FnOnce(&mut S) -> Result<i32, PhasefigError>>;
pub type DestroyFn<S> = Box<dyn FnOnce(S) -> Result<(), PhasefigError>>;

/// Registered handlers for one application run.
pub struct Lifecycle<S> {
    create_settings: Option<CreateFn<S>>,
    parse_command_line: Option<SourceFn<S>>,
    read_env_vars: Option<SourceFn<S>>,
    read_config: Option<PhaseFn<S>>,
    set_defaults: Option<PhaseFn<S>>,
    run: Option<RunFn<S>>,
    cleanup: Option<PhaseFn<S>>,
    destroy_settings: Option<DestroyFn<S>>,
}

impl<S: AppSettings + 'static> Lifecycle<S> {
    /// Start a lifecycle whose settings are produced by `create_settings`.
    pub fn builder<F>(create_settings: F) -> LifecycleBuilder<S>
    where
        F: FnOnce(&RunContext) -> Result<S, PhasefigError> + 'static,
    {
        LifecycleBuilder {
            inner: Lifecycle {
                create_settings: Some(Box::new(create_settings)),
                parse_command_line: None,
                read_env_vars: None,
                read_config: None,
                set_defaults: None,
                run: None,
                cleanup: None,
                destroy_settings: None,
            },
        }
    }

    /// Drive every phase from `INIT` to `EXIT`.
    pub fn execute(mut self, ctx: &RunContext) -> RunReport {
        let mut settings: Option<S> = None;
        let mut report = RunReport::default();
        let mut state = State::Init;

        loop {
            let outcome = match state {
                State::Exit => break,
                State::Phase(phase) => {
                    debug!(app = %ctx.name, phase = %phase, "entering phase");
                    report.visited.push(phase);
                    match self.run_phase(phase, ctx, &mut settings) {
                        Ok(()) => Outcome::Passed,
                        Err(e) if e.is_early_exit() && report.failure.is_none() => {
                            debug!(app = %ctx.name, phase = %phase, "run finished early");
                            report.finished_early = Some(phase);
                            Outcome::Failed
                        }
                        Err(e) => {
                            report.record_failure(phase, e);
                            Outcome::Failed
                        }
                    }
                }
                State::Init | State::Error(_) => Outcome::Passed,
            };
            state = state.next(outcome);
        }

        debug!(app = %ctx.name, status = report.status(), "lifecycle finished");
        report
    }

    fn run_phase(
        &mut self,
        phase: Phase,
        ctx: &RunContext,
        settings: &mut Option<S>,
    ) -> Result<(), PhasefigError> {
        if phase == Phase::CreateSettings {
            if let Some(create) = self.create_settings.take() {
                *settings = Some(create(ctx)?);
            }
            return Ok(());
        }
        if phase == Phase::DestroySettings {
            return self.destroy(settings.take());
        }

        let Some(s) = settings.as_mut() else {
            return Ok(());
        };
        match phase {
            Phase::ParseCommandLine => match self.parse_command_line.take() {
                Some(f) => f(s, &ctx.args),
                None => Ok(()),
            },
            Phase::ReadEnvVars => match self.read_env_vars.take() {
                Some(f) => f(s, &ctx.env_vars),
                None => Ok(()),
            },
            Phase::ReadConfig => match self.read_config.take() {
                Some(f) => {
                    if let Some(path) = &ctx.default_config_path {
                        s.config_path_mut().set_fallback(Value::Path(path.clone()))?;
                    }
                    f(s)
                }
                None => Ok(()),
            },
            Phase::SetDefaults => match self.set_defaults.take() {
                Some(f) => f(s),
                None => Ok(()),
            },
            Phase::Run => {
                let run = self.run.take().ok_or(PhasefigError::RunHandlerRequired)?;
                match run(s)? {
                    0 => Ok(()),
                    status => Err(PhasefigError::ExitStatus { phase, status }),
                }
            }
            Phase::Cleanup => match self.cleanup.take() {
                Some(f) => f(s),
                None => Ok(()),
            },
            Phase::CreateSettings | Phase::DestroySettings => Ok(()),
        }
    }

    fn destroy(&mut self, settings: Option<S>) -> Result<(), PhasefigError> {
        let Some(mut settings) = settings else {
            return Ok(());
        };
        settings.config_path_mut().destroy();
        match self.destroy_settings.take() {
            Some(f) => f(settings),
            None => Ok(()),
        }
    }
}

/// Builder for [`Lifecycle`]: one optional setter per phase.
pub struct LifecycleBuilder<S> {
    inner: Lifecycle<S>,
}

impl<S: AppSettings + 'static> LifecycleBuilder<S> {
    /// Handler for `PARSE_COMMAND_LINE`; receives the argument vector, program name first.
    pub fn parse_command_line<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut S, &[String]) -> Result<(), PhasefigError> + 'static,
    {
        self.inner.parse_command_line = Some(Box::new(f));
        self
    }

    /// Handler for `READ_ENV_VARS`; receives the `KEY=VALUE` environment snapshot.
    pub fn read_env_vars<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut S, &[String]) -> Result<(), PhasefigError> + 'static,
    {
        self.inner.read_env_vars = Some(Box::new(f));
        self
    }

    /// Handler for `READ_CONFIG`. Before it runs, the application's default config
    /// path is offered to `config_path` as a fallback.
    pub fn read_config<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut S) -> Result<(), PhasefigError> + 'static,
    {
        self.inner.read_config = Some(Box::new(f));
        self
    }

    pub fn set_defaults<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut S) -> Result<(), PhasefigError> + 'static,
    {
        self.inner.set_defaults = Some(Box::new(f));
        self
    }

    /// The application body. Required.
    pub fn run<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut S) -> Result<i32, PhasefigError> + 'static,
    {
        self.inner.run = Some(Box::new(f));
        self
    }

    pub fn cleanup<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut S) -> Result<(), PhasefigError> + 'static,
    {
        self.inner.cleanup = Some(Box::new(f));
        self
    }

    /// Settings destructor. Without one, the settings are dropped.
    pub fn destroy_settings<F>(mut self, f: F) -> Self
    where
        F: FnOnce(S) -> Result<(), PhasefigError> + 'static,
    {
        self.inner.destroy_settings = Some(Box::new(f));
        self
    }

    pub fn build(self) -> Result<Lifecycle<S>, PhasefigError> {
        if self.inner.run.is_none() {
            return Err(PhasefigError::RunHandlerRequired);
        }
        Ok(self.inner)
    }
}

impl LifecycleBuilder<OptionSettings> {
    /// Register the built-in adapters for the command line (with the `clap`
    /// feature), environment, config file and defaults phases.
    pub fn default_handlers(self) -> Self {
        #[cfg(feature = "clap")]
        let this = self.parse_command_line(default_parse_command_line);
        #[cfg(not(feature = "clap"))]
        let this = self;
        this.read_env_vars(default_read_env_vars)
            .read_config(default_read_config)
            .set_defaults(default_set_defaults)
    }
}

fn settle(report: ApplyReport) -> Result<(), PhasefigError> {
    report.into_result().map(drop)
}

#[cfg(feature = "clap")]
fn default_parse_command_line(settings: &mut OptionSettings, args: &[String]) -> Result<(), PhasefigError> {
    settle(crate::cli::parse_command_line(settings, args)?)
}

fn default_read_env_vars(settings: &mut OptionSettings, vars: &[String]) -> Result<(), PhasefigError> {
    settle(crate::env::read_env_vars(settings, vars))
}

fn default_read_config(settings: &mut OptionSettings) -> Result<(), PhasefigError> {
    settle(crate::file::read_config(settings)?)
}

fn default_set_defaults(settings: &mut OptionSettings) -> Result<(), PhasefigError> {
    settle(crate::defaults::set_defaults(settings))
}

/// What happened during one lifecycle run.
#[derive(Debug, Default)]
pub struct RunReport {
    visited: Vec<Phase>,
    failure: Option<(Phase, PhasefigError)>,
    drain_failures: Vec<(Phase, PhasefigError)>,
    finished_early: Option<Phase>,
}

impl RunReport {
    fn record_failure(&mut self, phase: Phase, error: PhasefigError) {
        if self.failure.is_none() {
            warn!(phase = %phase, error = %error, "phase failed");
            self.failure = Some((phase, error));
        } else {
            warn!(phase = %phase, error = %error, "phase failed while draining");
            self.drain_failures.push((phase, error));
        }
    }

    /// Phases that ran, in order.
    pub fn visited(&self) -> &[Phase] {
        &self.visited
    }

    /// The first failing phase and its error.
    pub fn failure(&self) -> Option<(Phase, &PhasefigError)> {
        self.failure.as_ref().map(|(p, e)| (*p, e))
    }

    /// Failures in cleanup or destroy after the first failure.
    pub fn drain_failures(&self) -> &[(Phase, PhasefigError)] {
        &self.drain_failures
    }

    /// The phase that ended the run early, skipping the phases up to cleanup.
    pub fn finished_early(&self) -> Option<Phase> {
        self.finished_early
    }

    /// No phase failed. An early exit still counts as success.
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// 0 on success, otherwise the first failure's status. A failure never
    /// reports 0.
    pub fn status(&self) -> i32 {
        match &self.failure {
            None => 0,
            Some((_, e)) => match e.exit_code() {
                0 => 1,
                status => status,
            },
        }
    }

    /// The status as a process exit code; values outside `0..=255` map to 1.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_byte())
    }

    fn exit_byte(&self) -> u8 {
        u8::try_from(self.status()).unwrap_or(1)
    }

    pub fn into_result(self) -> Result<(), PhasefigError> {
        match self.failure {
            Some((_, e)) => Err(e),
            None => Ok(()),
        }
    }
}
