//! Ordered, fail-fast step execution.
//!
//! A [`PipelineRun`] executes its steps strictly in order and stops at the
//! first failure. Nothing is rolled back; the returned error records which
//! step failed and which steps had already completed.

use serde::Serialize;
use std::path::PathBuf;

use crate::error::{Error, Result, StepFailedDetails};
use crate::executor::{CommandOutput, CommandRunner, CommandSpec};
use crate::ssh::{RemoteCommand, RemoteHost};

/// In-process step body.
pub type ActionFn<'a> = Box<dyn FnOnce() -> Result<()> + 'a>;

pub enum StepAction<'a> {
    /// Local external command.
    Command(CommandSpec),
    /// One ssh invocation on the remote host.
    Remote {
        host: RemoteHost,
        command: RemoteCommand,
    },
    /// Local file streamed to a remote path.
    Upload {
        host: RemoteHost,
        local: PathBuf,
        remote: String,
    },
    Action(ActionFn<'a>),
}

pub struct Step<'a> {
    pub name: String,
    pub action: StepAction<'a>,
    /// Host mutated by this step; failures are reported as remote failures.
    pub target_host: Option<String>,
}

impl<'a> Step<'a> {
    pub fn command(name: impl Into<String>, spec: CommandSpec) -> Self {
        Self {
            name: name.into(),
            action: StepAction::Command(spec),
            target_host: None,
        }
    }

    pub fn remote(name: impl Into<String>, host: &RemoteHost, command: RemoteCommand) -> Self {
        Self {
            name: name.into(),
            target_host: Some(host.host.clone()),
            action: StepAction::Remote {
                host: host.clone(),
                command,
            },
        }
    }

    pub fn upload(
        name: impl Into<String>,
        host: &RemoteHost,
        local: impl Into<PathBuf>,
        remote: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target_host: Some(host.host.clone()),
            action: StepAction::Upload {
                host: host.clone(),
                local: local.into(),
                remote: remote.into(),
            },
        }
    }

    pub fn action(name: impl Into<String>, action: impl FnOnce() -> Result<()> + 'a) -> Self {
        Self {
            name: name.into(),
            action: StepAction::Action(Box::new(action)),
            target_host: None,
        }
    }

    /// Mark a local command that writes to `host` (e.g. rsync).
    pub fn targets(mut self, host: &RemoteHost) -> Self {
        self.target_host = Some(host.host.clone());
        self
    }

    /// The command this step would run, if it is an external command.
    pub fn command_spec(&self) -> Option<CommandSpec> {
        match &self.action {
            StepAction::Command(spec) => Some(spec.clone()),
            StepAction::Remote { host, command } => Some(host.command(command)),
            StepAction::Upload {
                host,
                local,
                remote,
            } => Some(host.upload(local, remote)),
            StepAction::Action(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub workflow: String,
    pub steps_total: usize,
    pub completed: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
}

impl PipelineReport {
    /// Append a closing status message.
    pub fn conclude(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        log_status!("pipeline", "{}", message);
        self.messages.push(message);
        self
    }
}

pub struct PipelineRun<'a> {
    workflow: String,
    steps: Vec<Step<'a>>,
    current_index: usize,
    completed: Vec<String>,
    messages: Vec<String>,
}

impl<'a> PipelineRun<'a> {
    pub fn new(workflow: impl Into<String>) -> Self {
        Self {
            workflow: workflow.into(),
            steps: Vec::new(),
            current_index: 0,
            completed: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn step(mut self, step: Step<'a>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(mut self, steps: impl IntoIterator<Item = Step<'a>>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Record an operator-facing status message.
    pub fn say(&mut self, message: impl Into<String>) {
        let message = message.into();
        log_status!("pipeline", "{}", message);
        self.messages.push(message);
    }

    /// Execute every step in order, stopping at the first failure.
    pub fn run(mut self, runner: &dyn CommandRunner) -> Result<PipelineReport> {
        let steps = std::mem::take(&mut self.steps);
        let total = steps.len();

        for (index, step) in steps.into_iter().enumerate() {
            self.current_index = index;
            log_status!(
                "pipeline",
                "{} ({}/{}): {}",
                self.workflow,
                index + 1,
                total,
                step.name
            );

            self.execute(step, runner)?;
        }

        self.current_index = total;
        log_status!("pipeline", "{} finished ({} steps)", self.workflow, total);

        Ok(PipelineReport {
            workflow: self.workflow,
            steps_total: total,
            completed: self.completed,
            messages: self.messages,
        })
    }

    fn execute(&mut self, step: Step<'a>, runner: &dyn CommandRunner) -> Result<()> {
        let spec = step.command_spec();
        let Step {
            name,
            action,
            target_host,
        } = step;

        let outcome = match (action, spec) {
            (StepAction::Action(body), _) => body().map_err(|e| {
                self.failure(&name, None, None, target_host.clone(), Some(describe(&e)))
            }),
            (_, Some(spec)) => {
                let output = runner.run(&spec);
                if output.success {
                    Ok(())
                } else {
                    Err(self.failure(
                        &name,
                        Some(&spec),
                        Some(&output),
                        target_host.clone(),
                        None,
                    ))
                }
            }
            (_, None) => Err(Error::internal_unexpected(format!(
                "Step '{}' has nothing to run",
                name
            ))),
        };

        match outcome {
            Ok(()) => {
                self.say(format!("{}: done", name));
                self.completed.push(name);
                Ok(())
            }
            Err(e) => {
                log_status!(
                    "pipeline",
                    "{} stopped at step {} ({}); {} step(s) completed",
                    self.workflow,
                    self.current_index + 1,
                    name,
                    self.completed.len()
                );
                Err(e)
            }
        }
    }

    fn failure(
        &self,
        step: &str,
        spec: Option<&CommandSpec>,
        output: Option<&CommandOutput>,
        host: Option<String>,
        error: Option<String>,
    ) -> Error {
        let error = error.or_else(|| {
            output
                .map(CommandOutput::error_text)
                .filter(|text| !text.is_empty())
        });

        let details = StepFailedDetails {
            workflow: self.workflow.clone(),
            step: step.to_string(),
            step_index: self.current_index,
            completed_steps: self.completed.clone(),
            command: spec.map(CommandSpec::display),
            exit_code: output.map(|o| o.exit_code),
            host,
            error,
        };

        if details.host.is_some() {
            Error::remote_command_failed(details)
        } else {
            Error::step_failed(details)
        }
    }
}

fn describe(error: &Error) -> String {
    format!("{}: {}", error.code.as_str(), error.message)
}
