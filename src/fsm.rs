//! The lifecycle state machine.
//!
//! ```text
//! Init → CreateSettings → ParseCommandLine → ReadEnvVars → ReadConfig
//!      → SetDefaults → Run → Cleanup → DestroySettings → Exit
//! ```
//!
//! Every phase has an error state. Error states drain forward so that
//! `DestroySettings` runs exactly once on every path:
//!
//! | Failed phase                         | Next states                       |
//! |--------------------------------------|-----------------------------------|
//! | `CreateSettings`                     | `DestroySettings` → `Exit`        |
//! | `ParseCommandLine` ..= `Run`         | `Cleanup` → `DestroySettings` → `Exit` |
//! | `Cleanup`                            | `DestroySettings` → `Exit`        |
//! | `DestroySettings`                    | `Exit`                            |
//!
//! A failure while draining moves to that phase's error state as usual; the
//! table above already converges on `DestroySettings`, so no phase repeats.

use std::fmt;

use serde::Serialize;

/// One named step of the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    CreateSettings,
    ParseCommandLine,
    ReadEnvVars,
    ReadConfig,
    SetDefaults,
    Run,
    Cleanup,
    DestroySettings,
}

impl Phase {
    /// All phases in execution order.
    pub const ALL: [Phase; 8] = [
        Phase::CreateSettings,
        Phase::ParseCommandLine,
        Phase::ReadEnvVars,
        Phase::ReadConfig,
        Phase::SetDefaults,
        Phase::Run,
        Phase::Cleanup,
        Phase::DestroySettings,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::CreateSettings => "CREATE_SETTINGS",
            Phase::ParseCommandLine => "PARSE_COMMAND_LINE",
            Phase::ReadEnvVars => "READ_ENV_VARS",
            Phase::ReadConfig => "READ_CONFIG",
            Phase::SetDefaults => "SET_DEFAULTS",
            Phase::Run => "RUN",
            Phase::Cleanup => "CLEANUP",
            Phase::DestroySettings => "DESTROY_SETTINGS",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Init,
    Phase(Phase),
    Error(Phase),
    Exit,
}

/// Result of running a phase, as seen by the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed,
}

impl State {
    /// The state that follows `self` given the outcome of the phase just run.
    ///
    /// `outcome` is ignored for `Init`, error states and `Exit`, which run no
    /// handler. `Exit` is absorbing.
    pub fn next(self, outcome: Outcome) -> State {
        match self {
            State::Init => State::Phase(Phase::CreateSettings),
            State::Phase(phase) => match outcome {
                Outcome::Passed => match phase {
                    Phase::CreateSettings => State::Phase(Phase::ParseCommandLine),
                    Phase::ParseCommandLine => State::Phase(Phase::ReadEnvVars),
                    Phase::ReadEnvVars => State::Phase(Phase::ReadConfig),
                    Phase::ReadConfig => State::Phase(Phase::SetDefaults),
                    Phase::SetDefaults => State::Phase(Phase::Run),
                    Phase::Run => State::Phase(Phase::Cleanup),
                    Phase::Cleanup => State::Phase(Phase::DestroySettings),
                    Phase::DestroySettings => State::Exit,
                },
                Outcome::Failed => State::Error(phase),
            },
            State::Error(phase) => match phase {
                Phase::CreateSettings | Phase::Cleanup => State::Phase(Phase::DestroySettings),
                Phase::ParseCommandLine
                | Phase::ReadEnvVars
                | Phase::ReadConfig
                | Phase::SetDefaults
                | Phase::Run => State::Phase(Phase::Cleanup),
                Phase::DestroySettings => State::Exit,
            },
            State::Exit => State::Exit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Walk the machine, failing the phases in `failing`, and return the phases run.
    fn walk(failing: &[Phase]) -> Vec<Phase> {
        let mut state = State::Init;
        let mut visited = Vec::new();
        for _ in 0..64 {
            let outcome = match state {
                State::Phase(phase) => {
                    visited.push(phase);
                    if failing.contains(&phase) {
                        Outcome::Failed
                    } else {
                        Outcome::Passed
                    }
                }
                State::Exit => return visited,
                _ => Outcome::Passed,
            };
            state = state.next(outcome);
        }
        panic!("machine did not reach Exit");
    }

    #[test]
    fn happy_path_runs_every_phase_in_order() {
        assert_eq!(walk(&[]), Phase::ALL.to_vec());
    }

    #[test]
    fn every_single_failure_reaches_destroy_settings_once() {
        for failing in Phase::ALL {
            let visited = walk(&[failing]);
            let destroys = visited
                .iter()
                .filter(|p| **p == Phase::DestroySettings)
                .count();
            assert_eq!(destroys, 1, "failing {failing} visited {visited:?}");
            assert_eq!(visited.last(), Some(&Phase::DestroySettings));
        }
    }

    #[test]
    fn read_config_failure_skips_to_cleanup() {
        assert_eq!(
            walk(&[Phase::ReadConfig]),
            vec![
                Phase::CreateSettings,
                Phase::ParseCommandLine,
                Phase::ReadEnvVars,
                Phase::ReadConfig,
                Phase::Cleanup,
                Phase::DestroySettings,
            ]
        );
    }

    #[test]
    fn create_settings_failure_skips_cleanup() {
        assert_eq!(
            walk(&[Phase::CreateSettings]),
            vec![Phase::CreateSettings, Phase::DestroySettings]
        );
    }

    #[test]
    fn failures_while_draining_still_terminate() {
        let visited = walk(&[Phase::Run, Phase::Cleanup, Phase::DestroySettings]);
        assert_eq!(
            &visited[visited.len() - 3..],
            &[Phase::Run, Phase::Cleanup, Phase::DestroySettings]
        );
    }

    #[test]
    fn exit_is_absorbing() {
        assert_eq!(State::Exit.next(Outcome::Failed), State::Exit);
    }
}
